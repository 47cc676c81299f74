//! Configuration module for the slow-log collector.
//!
//! Provides YAML-based configuration loading and fail-fast validation for:
//! - Normalization options (timezone, charsets, null handling, time key)
//! - The collection interval and tag prefix
//! - One block per monitored server (host, port, credentials, tag)

mod settings;
mod validation;

pub use settings::{CollectorConfig, ServerConfig};
pub use validation::ConfigError;

// Re-export constants
pub use settings::{DEFAULT_EMIT_INTERVAL_SECS, DEFAULT_MYSQL_PORT};
