use crate::{env_or_default, ConfigError, FromEnv};
use std::path::PathBuf;

/// Blob storage configuration.
///
/// The API stores uploaded user images as files under `root`. The
/// directory is created on startup if it does not exist.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl StorageConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FromEnv for StorageConfig {
    /// Reads from environment variables:
    /// - STORAGE_ROOT: defaults to "data/storage"
    fn from_env() -> Result<Self, ConfigError> {
        let root = env_or_default("STORAGE_ROOT", "data/storage");
        Ok(Self { root: PathBuf::from(root) })
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/storage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_from_env_default() {
        temp_env::with_var_unset("STORAGE_ROOT", || {
            let config = StorageConfig::from_env().unwrap();
            assert_eq!(config.root, PathBuf::from("data/storage"));
        });
    }

    #[test]
    fn test_storage_config_from_env_custom_root() {
        temp_env::with_var("STORAGE_ROOT", Some("/var/lib/users/blobs"), || {
            let config = StorageConfig::from_env().unwrap();
            assert_eq!(config.root, PathBuf::from("/var/lib/users/blobs"));
        });
    }
}
