//! Configuration validation utilities.
//!
//! Identifier resolution happens here so every invalid option is rejected at
//! startup, before the collector enters the running state.

use std::str::FromStr;

use chrono_tz::Tz;
use encoding_rs::Encoding;
use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// `database_timezone` is not a known IANA timezone identifier.
    #[error("unknown timezone identifier '{0}'")]
    UnknownTimezone(String),

    /// `encoding` or `from_encoding` is not a known charset label.
    #[error("unknown encoding name '{0}'")]
    UnknownEncoding(String),

    /// `from_encoding` only makes sense together with `encoding`.
    #[error("'from_encoding' parameter must be specified with 'encoding' parameter")]
    FromEncodingWithoutEncoding,

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Resolve an IANA timezone identifier.
pub(crate) fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    Tz::from_str(name).map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}

/// Resolve a charset label (WHATWG labels, e.g. `utf-8`, `shift_jis`).
pub(crate) fn parse_encoding(label: &str) -> Result<&'static Encoding, ConfigError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ConfigError::UnknownEncoding(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timezone_valid() {
        assert_eq!(parse_timezone("Asia/Tokyo").unwrap(), chrono_tz::Asia::Tokyo);
        assert_eq!(parse_timezone("UTC").unwrap(), chrono_tz::UTC);
    }

    #[test]
    fn test_parse_timezone_invalid() {
        let err = parse_timezone("Mars/Olympus").unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn test_parse_encoding_valid() {
        assert_eq!(parse_encoding("utf-8").unwrap(), encoding_rs::UTF_8);
        assert_eq!(parse_encoding("shift_jis").unwrap(), encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn test_parse_encoding_invalid() {
        let err = parse_encoding("klingon-1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEncoding(_)));
    }
}
