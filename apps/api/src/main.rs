use axum_helpers::server::{create_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::{FsBlobStore, InMemoryUserRepository};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing with ErrorLayer for span trace capture
    init_tracing(&config.environment);

    // Prepare the blob store root before accepting traffic
    let storage = FsBlobStore::new(config.storage.root.clone());
    storage
        .ensure_root()
        .await
        .map_err(|e| eyre::eyre!("Failed to prepare storage root: {}", e))?;
    info!("Blob storage rooted at {}", storage.root().display());

    let repository = InMemoryUserRepository::new();

    let state = AppState {
        config,
        repository,
        storage,
    };

    // Build router with API routes (pass reference, not ownership!)
    let api_routes = api::routes(&state);

    // create_router adds docs/middleware to our composed routes
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;

    // Merge health endpoints into the app
    // - /health: liveness check with app name/version
    // - /ready: readiness check probing the blob-store root
    let app = router
        .merge(health_router(state.config.app.clone()))
        .merge(api::ready_router(state.clone()));

    create_app(app, &state.config.server)
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("users API shutdown complete");
    Ok(())
}
