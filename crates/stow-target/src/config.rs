use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stow_lock::LockConfig;
use stow_provenance::ProvenanceConfig;

use crate::error::{TargetError, TargetResult};
use crate::logging::LogFormat;

/// Default fragment ceiling for large tables: 64 MiB.
pub const DEFAULT_CHUNK_MAX_BYTES: u64 = 1 << 26;

/// Settings for large-table targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Soft ceiling on the estimated size of one fragment.
    pub max_bytes: u64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_CHUNK_MAX_BYTES,
        }
    }
}

/// Top-level stow configuration, usually read from `stow.toml`.
///
/// Every section is optional; missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StowConfig {
    /// Root under which model targets create scratch directories.
    pub scratch_root: PathBuf,
    pub log_format: LogFormat,
    pub lock: LockConfig,
    pub provenance: ProvenanceConfig,
    pub chunking: ChunkingConfig,
}

impl Default for StowConfig {
    fn default() -> Self {
        Self {
            scratch_root: PathBuf::from(".stow/tmp"),
            log_format: LogFormat::default(),
            lock: LockConfig::default(),
            provenance: ProvenanceConfig::default(),
            chunking: ChunkingConfig::default(),
        }
    }
}

impl StowConfig {
    pub fn from_toml_str(s: &str) -> TargetResult<Self> {
        toml::from_str(s).map_err(|e| TargetError::Configuration(format!("invalid config: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> TargetResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            TargetError::Configuration(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> TargetResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TargetError::Configuration(format!("cannot encode config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stow_lock::{DumpPolicy, LockProviderKind};

    #[test]
    fn empty_config_uses_defaults() {
        let config = StowConfig::from_toml_str("").unwrap();
        assert_eq!(config, StowConfig::default());
        assert_eq!(config.chunking.max_bytes, DEFAULT_CHUNK_MAX_BYTES);
        assert_eq!(config.provenance.max_metadata_bytes, 8192);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.scratch_root, PathBuf::from(".stow/tmp"));
    }

    #[test]
    fn parses_every_section() {
        let config = StowConfig::from_toml_str(
            r#"
            scratch_root = "/var/tmp/stow"
            log_format = "text"

            [lock]
            provider = "in_process"
            timeout_ms = 500
            dump_policy = "overwrite"

            [provenance]
            max_metadata_bytes = 1024

            [chunking]
            max_bytes = 4096
            "#,
        )
        .unwrap();
        assert_eq!(config.scratch_root, PathBuf::from("/var/tmp/stow"));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.lock.provider, LockProviderKind::InProcess);
        assert_eq!(config.lock.timeout_ms, 500);
        assert_eq!(config.lock.dump_policy, DumpPolicy::Overwrite);
        assert_eq!(config.provenance.max_metadata_bytes, 1024);
        assert_eq!(config.chunking.max_bytes, 4096);
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        let err = StowConfig::from_toml_str("[lock]\nprovider = \"redis\"\n").unwrap_err();
        assert!(err.is_configuration());
        assert!(StowConfig::load("/nonexistent/stow.toml").unwrap_err().is_configuration());
    }

    #[test]
    fn load_reads_file_and_survives_reencoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stow.toml");
        let mut config = StowConfig::default();
        config.chunking.max_bytes = 10;
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(StowConfig::load(&path).unwrap(), config);
    }
}
