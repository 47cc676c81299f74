//! Slow-query log collector for managed MySQL servers.
//!
//! This crate periodically rotates each configured server's slow-query log
//! into its readable backup table, fetches the captured rows, normalizes them
//! into structured events with canonical types, and forwards them downstream
//! in per-server batches. It can be embedded as a library or run as the
//! `slowlog-collector` binary.
//!
//! # Architecture
//!
//! - **Normalizer**: pure per-row conversion to canonical types
//! - **Server Session**: connect → rotate → fetch → normalize, per server
//! - **Orchestrator**: sequential fan-out with per-server failure isolation
//! - **Scheduler**: fixed-interval cycles on one dedicated worker thread
//! - **Sink**: the downstream hand-off, one ordered batch per server per cycle
//!
//! # Example
//!
//! ```rust,no_run
//! use slowlog_collector::{Collector, CollectorConfig, JsonLinesSink, ServerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CollectorConfig {
//!     database_timezone: None,
//!     emit_interval: 10,
//!     encoding: None,
//!     from_encoding: None,
//!     keep_time_key: false,
//!     null_empty_string: false,
//!     tag_prefix: Some("app".to_string()),
//!     servers: vec![ServerConfig::new("db1.example.com", "db1")],
//! };
//! let handle = Collector::new(config, JsonLinesSink)?.start()?;
//! // ... run until shutdown ...
//! handle.stop();
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod normalize;
pub mod record;
pub mod session;
pub mod sink;

pub use collector::{Collector, CollectorHandle};
pub use config::{CollectorConfig, ConfigError, ServerConfig};
pub use normalize::{NormalizeError, Normalizer};
pub use record::{Batch, FieldValue, NormalizedEvent, RawRecord};
pub use session::{
    ClientError, ClientFactory, MysqlClientFactory, SessionError, SlowLogClient,
};
pub use sink::{EventSink, JsonLinesSink, SinkError};
