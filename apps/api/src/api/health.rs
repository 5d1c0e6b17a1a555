use axum::{extract::State, response::IntoResponse};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};

use crate::state::AppState;

/// Readiness probe: verifies the blob-store root is reachable and writable.
pub async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    let storage = state.storage.clone();
    let checks: Vec<(&str, HealthCheckFuture)> = vec![(
        "storage",
        Box::pin(async move { storage.ensure_root().await.map_err(|e| e.to_string()) }),
    )];

    match run_health_checks(checks).await {
        Ok(ok) => ok.into_response(),
        Err(err) => err.into_response(),
    }
}
