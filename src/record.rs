//! Core data types for the collection pipeline.
//!
//! - [`RawRecord`]: one row of `slow_log_backup` as returned by the server
//! - [`FieldValue`]: canonical typed value after normalization
//! - [`NormalizedEvent`]: one emitted event with an epoch-second timestamp
//! - [`Batch`]: the ordered events of one server for one cycle

use std::collections::BTreeMap;

use serde::Serialize;

/// Timestamp column of the slow log.
pub const START_TIME: &str = "start_time";
/// Client host identifier column.
pub const USER_HOST: &str = "user_host";
/// Database name column.
pub const DB: &str = "db";
/// Query text column.
pub const SQL_TEXT: &str = "sql_text";

/// Duration columns, parsed into microseconds.
pub const DURATION_FIELDS: [&str; 2] = ["query_time", "lock_time"];

/// Integer-valued columns.
pub const INTEGER_FIELDS: [&str; 7] = [
    "rows_sent",
    "rows_examined",
    "last_insert_id",
    "insert_id",
    "server_id",
    "thread_id",
    "rows_affected",
];

/// One raw row: column name to raw bytes, `None` for SQL NULL.
///
/// The fetch query is `SELECT *`, so columns beyond the ones the normalizer
/// recognizes may be present; they pass through untouched. Values are kept as
/// bytes because the charset they carry is only decided by configuration.
pub type RawRecord = BTreeMap<String, Option<Vec<u8>>>;

/// A canonical field value in a normalized event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Textual value (UTF-8, already decoded per the charset policy).
    Text(String),
    /// Integer value (durations in microseconds, row counts, ids).
    Int(i64),
    /// SQL NULL, or an empty string nulled by `null_empty_string`.
    Null,
}

impl FieldValue {
    /// Whether this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

/// One normalized slow-log entry.
///
/// Produced exactly once per [`RawRecord`] and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedEvent {
    /// Event time as whole seconds since the Unix epoch.
    pub timestamp: i64,
    /// Canonical field mapping.
    pub fields: BTreeMap<String, FieldValue>,
}

/// The events of one server for one cycle, forwarded as a single unit.
///
/// Batches from different servers or cycles are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// Routing tag, composed once at configuration time.
    pub tag: String,
    /// Events in the row order returned by the fetch query.
    pub events: Vec<NormalizedEvent>,
}

impl Batch {
    /// Create a batch for `tag` holding `events`.
    pub fn new(tag: impl Into<String>, events: Vec<NormalizedEvent>) -> Self {
        Self {
            tag: tag.into(),
            events,
        }
    }

    /// Number of events in the batch.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the batch holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
