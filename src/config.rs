//! Configuration Module - GC Tuning Parameters
//!
//! Stores all parameters affecting collector behavior. Most have sensible
//! defaults; `validate()` rejects combinations that would corrupt heap state.

use serde::{Deserialize, Serialize};

/// Configuration for the managed heap and its background collector.
///
/// # Examples
///
/// ```
/// use zmanaged::GcConfig;
///
/// let config = GcConfig::default();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcConfig {
    /// Page size in bytes. Must be a power of two; default 2 MiB, matching
    /// the colored-pointer address mask (low 60 bits).
    pub page_size: usize,

    /// Thread-local allocation buffer size in bytes. Default 32 KiB.
    pub tlab_size: usize,

    /// Background collector cycle interval in milliseconds. Default 100ms.
    pub background_interval_ms: u64,

    /// Emit a log record for every cycle phase transition.
    pub verbose: bool,

    /// Collect lightweight cycle statistics (duration, objects marked/relocated).
    pub stats_enabled: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            page_size: 2 * MB,
            tlab_size: 32 * KB,
            background_interval_ms: 100,
            verbose: false,
            stats_enabled: true,
        }
    }
}

impl GcConfig {
    /// Validate configuration, returning an error describing the first
    /// violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(ConfigError::InvalidPageSize(
                "page_size must be a power of two".to_string(),
            ));
        }

        if self.tlab_size == 0 {
            return Err(ConfigError::InvalidTlabSize(
                "tlab_size must be > 0".to_string(),
            ));
        }

        if self.tlab_size > self.page_size {
            return Err(ConfigError::InvalidTlabSize(
                "tlab_size must not exceed page_size".to_string(),
            ));
        }

        if self.background_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval(
                "background_interval_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables, overriding defaults:
    /// `ZGC_PAGE_SIZE`, `ZGC_TLAB_SIZE`, `ZGC_BACKGROUND_INTERVAL_MS`, `ZGC_VERBOSE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ZGC_PAGE_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.page_size = size;
            }
        }

        if let Ok(val) = std::env::var("ZGC_TLAB_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.tlab_size = size;
            }
        }

        if let Ok(val) = std::env::var("ZGC_BACKGROUND_INTERVAL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.background_interval_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("ZGC_VERBOSE") {
            config.verbose = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config
    }

    /// Serialize to pretty-printed JSON, for config files or diagnostics.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON produced by [`GcConfig::to_json`].
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Error type for invalid `GcConfig` values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid page size: {0}")]
    InvalidPageSize(String),

    #[error("invalid TLAB size: {0}")]
    InvalidTlabSize(String),

    #[error("invalid background interval: {0}")]
    InvalidInterval(String),
}

const KB: usize = 1024;
const MB: usize = 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GcConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, 2 * MB);
    }

    #[test]
    fn test_invalid_page_size() {
        let config = GcConfig {
            page_size: 3, // not a power of two
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tlab_larger_than_page() {
        let config = GcConfig {
            tlab_size: 4 * MB,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn json_roundtrip_preserves_values() {
        let config = GcConfig {
            tlab_size: 64 * 1024,
            background_interval_ms: 250,
            verbose: true,
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        let restored = GcConfig::from_json(&json).unwrap();
        assert_eq!(restored.tlab_size, 64 * 1024);
        assert_eq!(restored.background_interval_ms, 250);
        assert!(restored.verbose);
    }
}
