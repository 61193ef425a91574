use serde::Deserialize;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse error in {path}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub pool_pages: NonZeroUsize,
    pub shards: NonZeroU32,
}

impl EngineConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        let config: EngineConfig =
            toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
                path: path.clone(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults for running the engine out of the current directory.
    pub fn local_defaults() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: PathBuf::from("./data"),
                logs_dir: PathBuf::from("./logs"),
                pool_pages: NonZeroUsize::new(64).unwrap(),
                shards: NonZeroU32::new(2).unwrap(),
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // pool_pages and shards are non-zero by type; only the paths need a
        // semantic check.
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                message: "storage.data_dir must not be empty".to_string(),
            });
        }
        if self.storage.logs_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                message: "storage.logs_dir must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            r#"
[storage]
data_dir = "/tmp/hazel/data"
logs_dir = "/tmp/hazel/logs"
pool_pages = 128
shards = 4
"#,
        )
        .unwrap();

        let config = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.storage.pool_pages.get(), 128);
        assert_eq!(config.storage.shards.get(), 4);
    }

    #[test]
    fn zero_pool_pages_is_rejected_by_the_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            r#"
[storage]
data_dir = "/tmp/hazel/data"
logs_dir = "/tmp/hazel/logs"
pool_pages = 0
shards = 1
"#,
        )
        .unwrap();

        assert!(matches!(
            EngineConfig::load_from_file(&path),
            Err(ConfigError::ParseToml { .. })
        ));
    }

    #[test]
    fn empty_data_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            r#"
[storage]
data_dir = ""
logs_dir = "/tmp/hazel/logs"
pool_pages = 16
shards = 1
"#,
        )
        .unwrap();

        assert!(matches!(
            EngineConfig::load_from_file(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        assert!(matches!(
            EngineConfig::load_from_file("/nonexistent/engine.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
