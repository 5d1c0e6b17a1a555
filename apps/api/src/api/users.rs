use axum::Router;
use domain_users::{UserService, handlers};

pub fn router(state: &crate::state::AppState) -> Router {
    let service = UserService::new(state.repository.clone(), state.storage.clone());
    handlers::router(service)
}
