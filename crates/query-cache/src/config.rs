//! Cache configuration options

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the query cache
///
/// Serialized with the short option names `timeout` (milliseconds), `max`
/// and `enabled`:
///
/// ```json
/// { "timeout": 10000, "max": 100 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// How long a finished entry stays valid, measured from its creation
    #[serde(rename = "timeout", with = "duration_ms")]
    pub ttl: Duration,
    /// Soft bound on stored entries; pending entries are never evicted
    #[serde(rename = "max")]
    pub max_entries: usize,
    /// Whether caching is enabled
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(10_000),
            max_entries: 100,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom settings
    pub fn new(max_entries: usize, ttl_ms: u64) -> Self {
        Self {
            ttl: Duration::from_millis(ttl_ms),
            max_entries,
            enabled: true,
        }
    }

    /// Create a disabled cache configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the maximum number of entries
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the TTL duration
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enable or disable the cache
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Parse a configuration from JSON. Missing options keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheError;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 100);
        assert_eq!(config.ttl, Duration::from_secs(10));
        assert!(config.enabled);
    }

    #[test]
    fn test_disabled_config() {
        let config = CacheConfig::disabled();
        assert!(!config.enabled);
        assert_eq!(config.max_entries, 100);
    }

    #[test]
    fn test_builder_pattern() {
        let config = CacheConfig::default()
            .with_max_entries(500)
            .with_ttl(Duration::from_secs(60))
            .with_enabled(true);

        assert_eq!(config.max_entries, 500);
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert!(config.enabled);
    }

    #[test]
    fn test_from_json_partial() {
        let config = CacheConfig::from_json(r#"{ "timeout": 1 }"#).unwrap();
        assert_eq!(config.ttl, Duration::from_millis(1));
        assert_eq!(config.max_entries, 100);

        let config = CacheConfig::from_json("{}").unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_from_json_rejects_unknown_option() {
        let err = CacheConfig::from_json(r#"{ "maxEntries": 3 }"#).unwrap_err();
        assert!(matches!(err, CacheError::InvalidConfig(_)));
    }

    #[test]
    fn test_json_uses_short_names() {
        let json = serde_json::to_value(CacheConfig::new(7, 250)).unwrap();
        assert_eq!(json["timeout"], 250);
        assert_eq!(json["max"], 7);
        assert_eq!(json["enabled"], true);
    }

    #[test]
    fn test_from_missing_file() {
        let err = CacheConfig::from_file(Path::new("/nonexistent/query-cache.json")).unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
