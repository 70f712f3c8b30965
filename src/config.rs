//! Tunables for request parsing and response serving.
//!
//! All fields have defaults, so a partial JSON document is enough:
//!
//! ```
//! use wirecore::config::Config;
//!
//! let config = Config::from_json(r#"{ "response_timeout_secs": 60 }"#).unwrap();
//! assert_eq!(config.response_timeout().as_secs(), 60);
//! assert_eq!(config.max_headers, 64);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of header lines accepted in one request head.
    pub max_headers: usize,

    /// Seconds a response may stay in flight before the timeout monitor
    /// flags it.
    pub response_timeout_secs: u64,

    /// A `Range` header naming more specs than this is ignored as a whole.
    pub max_ranges: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_headers: 64,
            response_timeout_secs: 300,
            max_ranges: crate::http::range::DEFAULT_MAX_RANGES,
        }
    }
}

impl Config {
    /// Parses and validates a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make every request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_headers == 0 {
            return Err(ConfigError::Zero { field: "max_headers" });
        }
        if self.max_ranges == 0 {
            return Err(ConfigError::Zero { field: "max_ranges" });
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = Config::from_json(r#"{ "max_headers": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Zero { field: "max_headers" }));
        assert!(Config::from_json(r#"{ "max_ranges": 0 }"#).is_err());
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(Config::from_json("{ nope"), Err(ConfigError::Json(_))));
    }
}
