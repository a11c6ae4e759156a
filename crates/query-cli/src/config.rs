use anyhow::{Context, Result};
use query_cache::CacheConfig;
use std::path::Path;
use std::time::Duration;

/// Command-line overrides applied on top of the configuration file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub timeout_ms: Option<u64>,
    pub max: Option<usize>,
    pub disable: bool,
}

/// Build the effective cache configuration
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<CacheConfig> {
    let mut config = match path {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CacheConfig::default(),
    };

    if let Some(timeout_ms) = overrides.timeout_ms {
        config = config.with_ttl(Duration::from_millis(timeout_ms));
    }
    if let Some(max) = overrides.max {
        config = config.with_max_entries(max);
    }
    if overrides.disable {
        config = config.with_enabled(false);
    }
    Ok(config)
}

pub fn save(config: &CacheConfig, path: &Path) -> Result<()> {
    let contents = serde_json::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = load(None, &Overrides::default()).unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_overrides_win() {
        let overrides = Overrides {
            timeout_ms: Some(250),
            max: Some(1),
            disable: true,
        };
        let config = load(None, &overrides).unwrap();
        assert_eq!(config.ttl, Duration::from_millis(250));
        assert_eq!(config.max_entries, 1);
        assert!(!config.enabled);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qc.json");
        save(&CacheConfig::new(3, 1500), &path).unwrap();

        let overrides = Overrides {
            max: Some(9),
            ..Default::default()
        };
        let config = load(Some(&path), &overrides).unwrap();

        assert_eq!(config.ttl, Duration::from_millis(1500));
        assert_eq!(config.max_entries, 9);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/qc.json")), &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/qc.json"));
    }
}
