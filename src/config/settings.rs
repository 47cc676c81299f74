//! Configuration structures for the collector and its servers.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::normalize::Normalizer;

use super::validation::{parse_encoding, parse_timezone, ConfigError};

// =============================================================================
// Constants
// =============================================================================

/// Default interval between collection cycles, in seconds.
pub const DEFAULT_EMIT_INTERVAL_SECS: u64 = 10;

/// Default MySQL server port.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

fn default_emit_interval() -> u64 {
    DEFAULT_EMIT_INTERVAL_SECS
}

fn default_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

// =============================================================================
// Server Configuration
// =============================================================================

/// One monitored MySQL server.
///
/// Immutable after configuration; the server set is fixed for the process
/// lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname of the server.
    pub host: String,

    /// The port number of the server (default: 3306).
    #[serde(default = "default_port")]
    pub port: u16,

    /// The username to use when connecting to the server.
    #[serde(default)]
    pub username: Option<String>,

    /// The password to use when connecting to the server.
    #[serde(default)]
    pub password: Option<String>,

    /// The tag of the emitted events.
    pub tag: String,
}

impl ServerConfig {
    /// Create a server entry with the default port and no credentials.
    pub fn new(host: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_MYSQL_PORT,
            username: None,
            password: None,
            tag: tag.into(),
        }
    }

    /// Set the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connection credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

// =============================================================================
// Collector Configuration
// =============================================================================

/// Top-level collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Source timezone of `start_time` values; default: treat as UTC.
    #[serde(default)]
    pub database_timezone: Option<String>,

    /// Seconds between collection cycles (default: 10).
    #[serde(default = "default_emit_interval")]
    pub emit_interval: u64,

    /// Destination charset for string fields; default: no conversion.
    #[serde(default)]
    pub encoding: Option<String>,

    /// Source charset of `sql_text`; requires `encoding`.
    #[serde(default)]
    pub from_encoding: Option<String>,

    /// Keep the `start_time` field in emitted events (default: false).
    #[serde(default)]
    pub keep_time_key: bool,

    /// Convert empty string fields to null (default: false).
    #[serde(default)]
    pub null_empty_string: bool,

    /// Optional prefix prepended to each server tag, joined with `.`.
    #[serde(default)]
    pub tag_prefix: Option<String>,

    /// The monitored servers, processed in this order each cycle.
    pub servers: Vec<ServerConfig>,
}

impl CollectorConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// The interval between collection cycles.
    pub fn emit_interval(&self) -> Duration {
        Duration::from_secs(self.emit_interval)
    }

    /// Routing tag for one server: `prefix.tag` when a prefix is configured,
    /// the server tag verbatim otherwise.
    pub fn tag_for(&self, server: &ServerConfig) -> String {
        match &self.tag_prefix {
            Some(prefix) => format!("{}.{}", prefix, server.tag),
            None => server.tag.clone(),
        }
    }

    /// Validate all options and resolve the normalization policy.
    ///
    /// Fails fast on unknown timezone or charset identifiers, on
    /// `from_encoding` without `encoding`, and on malformed server blocks,
    /// preventing the collector from entering the running state.
    pub fn validate(&self) -> Result<Normalizer, ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one server block is required".to_string(),
            ));
        }

        let mut seen_tags = HashSet::new();
        for server in &self.servers {
            if server.host.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "server '{}': host cannot be empty",
                    server.tag
                )));
            }
            if server.tag.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "server '{}': tag cannot be empty",
                    server.host
                )));
            }
            if !seen_tags.insert(&server.tag) {
                return Err(ConfigError::Validation(format!(
                    "duplicate server tag: '{}'",
                    server.tag
                )));
            }
        }

        if self.from_encoding.is_some() && self.encoding.is_none() {
            return Err(ConfigError::FromEncodingWithoutEncoding);
        }

        Ok(Normalizer {
            timezone: self
                .database_timezone
                .as_deref()
                .map(parse_timezone)
                .transpose()?,
            encoding: self.encoding.as_deref().map(parse_encoding).transpose()?,
            from_encoding: self
                .from_encoding
                .as_deref()
                .map(parse_encoding)
                .transpose()?,
            keep_time_key: self.keep_time_key,
            null_empty_string: self.null_empty_string,
        })
    }
}
