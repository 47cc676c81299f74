//! Record normalizer: converts one raw slow-log row into one canonical event.
//!
//! Pure data in/out, no I/O. The pipeline applies, in order: timestamp parsing
//! with timezone conversion, the string null/charset policy, duration parsing
//! into microseconds, lenient integer coercion, and event-time extraction.

use std::collections::BTreeMap;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use encoding_rs::Encoding;
use thiserror::Error;

use crate::record::{
    FieldValue, NormalizedEvent, RawRecord, DB, DURATION_FIELDS, INTEGER_FIELDS, SQL_TEXT,
    START_TIME, USER_HOST,
};

/// Fixed textual format of `start_time` (microsecond precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Errors that make a single row unusable.
///
/// These are per-row failures: the session propagates them to the
/// orchestrator's per-server isolation, they never abort other servers.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// `start_time` did not match the fixed timestamp format.
    #[error("invalid start_time {value:?}")]
    InvalidTimestamp {
        /// Raw text of the rejected value.
        value: String,
    },

    /// `start_time` falls into a DST gap of the configured timezone.
    #[error("start_time {value:?} does not exist in timezone {timezone}")]
    NonexistentLocalTime {
        /// Raw text of the rejected value.
        value: String,
        /// The configured source timezone.
        timezone: Tz,
    },

    /// A duration column did not match `HH:MM:SS.ffffff`.
    #[error("invalid duration {value:?} in column {column}")]
    InvalidDuration {
        /// Column the value came from.
        column: String,
        /// Raw text of the rejected value.
        value: String,
    },
}

/// Normalization policy resolved from the configuration at startup.
///
/// Immutable for the process lifetime; shared read-only by every cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    /// Source timezone for `start_time`; `None` means the values are UTC.
    pub timezone: Option<Tz>,
    /// Destination charset for string fields; `None` means no conversion.
    pub encoding: Option<&'static Encoding>,
    /// Source charset for `sql_text` only. Requires `encoding`.
    pub from_encoding: Option<&'static Encoding>,
    /// Retain `start_time` in the emitted fields.
    pub keep_time_key: bool,
    /// Convert empty string fields to NULL.
    pub null_empty_string: bool,
}

impl Normalizer {
    /// Normalize one raw row into one event.
    ///
    /// Unrecognized columns pass through as text. The event timestamp comes
    /// from `start_time`, falling back to the current wall clock when the
    /// column is absent or NULL.
    pub fn normalize(&self, record: RawRecord) -> Result<NormalizedEvent, NormalizeError> {
        let mut fields = BTreeMap::new();
        let mut event_time: Option<DateTime<Utc>> = None;

        for (column, value) in record {
            let normalized = match column.as_str() {
                START_TIME => match value {
                    None => self.keep_time_key.then_some(FieldValue::Null),
                    Some(bytes) => {
                        let instant = self.parse_timestamp(&bytes)?;
                        event_time = Some(instant);
                        self.keep_time_key.then(|| {
                            FieldValue::Text(instant.format(TIMESTAMP_FORMAT).to_string())
                        })
                    }
                },
                USER_HOST | DB => Some(self.normalize_string(value, self.encoding)),
                SQL_TEXT => {
                    let charset = self.from_encoding.or(self.encoding);
                    Some(self.normalize_string(value, charset))
                }
                name if DURATION_FIELDS.contains(&name) => match value {
                    None => Some(FieldValue::Null),
                    Some(bytes) => Some(FieldValue::Int(duration_micros(&column, &bytes)?)),
                },
                name if INTEGER_FIELDS.contains(&name) => {
                    Some(value.map_or(FieldValue::Null, |bytes| FieldValue::Int(coerce_int(&bytes))))
                }
                _ => Some(value.map_or(FieldValue::Null, |bytes| {
                    FieldValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                })),
            };

            if let Some(normalized) = normalized {
                fields.insert(column, normalized);
            }
        }

        let timestamp = event_time.unwrap_or_else(Utc::now).timestamp();
        Ok(NormalizedEvent { timestamp, fields })
    }

    /// Parse `start_time` and convert it from the source timezone to UTC.
    fn parse_timestamp(&self, bytes: &[u8]) -> Result<DateTime<Utc>, NormalizeError> {
        let invalid = || NormalizeError::InvalidTimestamp {
            value: String::from_utf8_lossy(bytes).into_owned(),
        };
        let text = std::str::from_utf8(bytes).map_err(|_| invalid())?;
        let naive =
            NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT).map_err(|_| invalid())?;

        match self.timezone {
            None => Ok(Utc.from_utc_datetime(&naive)),
            Some(tz) => match tz.from_local_datetime(&naive) {
                LocalResult::Single(instant) => Ok(instant.with_timezone(&Utc)),
                // DST fold: the earlier of the two instants wins.
                LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
                LocalResult::None => Err(NormalizeError::NonexistentLocalTime {
                    value: text.trim().to_string(),
                    timezone: tz,
                }),
            },
        }
    }

    /// Apply the null-empty-string and charset policies to one string field.
    fn normalize_string(
        &self,
        value: Option<Vec<u8>>,
        charset: Option<&'static Encoding>,
    ) -> FieldValue {
        let bytes = match value {
            None => return FieldValue::Null,
            Some(bytes) => bytes,
        };
        if self.null_empty_string && bytes.is_empty() {
            return FieldValue::Null;
        }
        let text = match charset {
            Some(charset) => charset.decode(&bytes).0.into_owned(),
            None => String::from_utf8_lossy(&bytes).into_owned(),
        };
        FieldValue::Text(text)
    }
}

/// Parse `HH:MM:SS.ffffff` into a microsecond count.
fn duration_micros(column: &str, bytes: &[u8]) -> Result<i64, NormalizeError> {
    let invalid = || NormalizeError::InvalidDuration {
        column: column.to_string(),
        value: String::from_utf8_lossy(bytes).into_owned(),
    };
    let text = std::str::from_utf8(bytes).map_err(|_| invalid())?.trim();

    let (clock, fraction) = text.split_once('.').ok_or_else(invalid)?;
    let mut parts = clock.splitn(3, ':');
    let mut next = || -> Result<i64, NormalizeError> {
        parts
            .next()
            .and_then(|p| p.parse::<i64>().ok())
            .ok_or_else(invalid)
    };
    let hours = next()?;
    let minutes = next()?;
    let seconds = next()?;
    let micros: i64 = fraction.parse().map_err(|_| invalid())?;

    Ok(hours * 3_600_000_000 + minutes * 60_000_000 + seconds * 1_000_000 + micros)
}

/// Lenient string-to-integer coercion: optional sign plus leading digits,
/// anything else yields 0. Saturates at the i64 range.
fn coerce_int(bytes: &[u8]) -> i64 {
    let text = String::from_utf8_lossy(bytes);
    let mut chars = text.trim_start().chars().peekable();

    let negative = match chars.peek() {
        Some('-') => {
            chars.next();
            true
        }
        Some('+') => {
            chars.next();
            false
        }
        _ => false,
    };

    let mut value: i128 = 0;
    for c in chars {
        let Some(digit) = c.to_digit(10) else { break };
        value = (value * 10 + i128::from(digit)).min(i128::from(i64::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
