use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use subvc_diff::DiffConfig;
use subvc_graph::GraphConfig;
use subvc_store::CompressionConfig;

use crate::error::{SdkError, SdkResult};

/// Repository configuration, stored as `.subvc/config.toml`.
///
/// ```toml
/// snapshot_interval = 10
/// lock_timeout_ms = 10000
///
/// [diff]
/// max_file_bytes = 10485760
/// timeout_ms = 2000
///
/// [compression]
/// enabled = true
/// min_size_bytes = 4096
/// level = 3
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionControlConfig {
    pub snapshot_interval: u32,
    /// How long a mutation waits for another writer's repository lock.
    pub lock_timeout_ms: u64,
    pub diff: DiffConfig,
    pub compression: CompressionConfig,
}

impl Default for VersionControlConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: GraphConfig::DEFAULT_SNAPSHOT_INTERVAL,
            lock_timeout_ms: 10_000,
            diff: DiffConfig::default(),
            compression: CompressionConfig::default(),
        }
    }
}

impl VersionControlConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))?;
        config.graph_config()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> SdkResult<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Validated version-graph settings.
    pub fn graph_config(&self) -> SdkResult<GraphConfig> {
        GraphConfig::new(self.snapshot_interval).map_err(|e| SdkError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = VersionControlConfig::default();
        assert_eq!(c.snapshot_interval, 10);
        assert_eq!(c.lock_timeout(), Duration::from_secs(10));
        assert_eq!(c.diff.max_file_bytes, 10 * 1024 * 1024);
        assert!(c.diff.timeout_ms.is_none());
        assert!(!c.compression.enabled);
        assert_eq!(c.compression.min_size_bytes, 4096);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(
            VersionControlConfig::from_toml_str("").unwrap(),
            VersionControlConfig::default()
        );
    }

    #[test]
    fn partial_toml_overrides() {
        let c = VersionControlConfig::from_toml_str(
            "snapshot_interval = 5\n[compression]\nenabled = true\n[diff]\ntimeout_ms = 100\n",
        )
        .unwrap();
        assert_eq!(c.snapshot_interval, 5);
        assert!(c.compression.enabled);
        assert_eq!(c.compression.level, 3);
        assert_eq!(c.diff.timeout_ms, Some(100));
        assert_eq!(c.diff.max_file_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(
            VersionControlConfig::from_toml_str("snapshot_interval = 0"),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(VersionControlConfig::from_toml_str("snapshot_interval = \"ten\"").is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let mut c = VersionControlConfig::default();
        c.snapshot_interval = 3;
        c.diff.timeout_ms = Some(50);
        let text = c.to_toml_string().unwrap();
        assert_eq!(VersionControlConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let c = VersionControlConfig {
            snapshot_interval: 7,
            ..Default::default()
        };
        c.save(&path).unwrap();
        assert_eq!(VersionControlConfig::load(&path).unwrap(), c);
    }
}
