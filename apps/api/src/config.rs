use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig, storage::StorageConfig};

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `core_config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8000
        let storage = StorageConfig::from_env()?; // Uses default: STORAGE_ROOT=data/storage

        Ok(Self {
            app: app_info!(),
            server,
            storage,
            environment,
        })
    }
}
