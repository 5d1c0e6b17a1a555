use crate::config::Config;
use domain_users::{FsBlobStore, InMemoryUserRepository};

/// Shared application state: configuration plus the collaborators the
/// users domain is wired with.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub repository: InMemoryUserRepository,
    pub storage: FsBlobStore,
}
