use crate::config::ServerConfig;
use crate::store::RepositoryStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared state handed to every request handler.
///
/// Owns the repository store for the lifetime of the server; nothing outside
/// this struct holds the collection.
pub struct AppState {
    config: Arc<ServerConfig>,
    store: RepositoryStore,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let store = RepositoryStore::new(config.update_mode);
        Self {
            config,
            store,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn store(&self) -> &RepositoryStore {
        &self.store
    }

    /// Token cancelled once the server starts shutting down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
