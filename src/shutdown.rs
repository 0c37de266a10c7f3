//! Graceful shutdown coordination.
//!
//! The coordinator waits for SIGINT/SIGTERM and cancels a shared
//! [`CancellationToken`]. `axum::serve` stops accepting connections and drains
//! in-flight requests when the token fires; afterwards the registered
//! [`ShutdownHandler`]s run under a total timeout.
//!
//! Repository state is process-local and is not persisted; the store handler
//! only reports final statistics.

use crate::state::AppState;
use anyhow::Result;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time for all shutdown handlers together
    pub total_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_secs(10),
        }
    }
}

impl ShutdownConfig {
    pub fn with_total_timeout(mut self, timeout_secs: u64) -> Self {
        self.total_timeout = Duration::from_secs(timeout_secs);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    /// Listener closed, handlers running
    Draining,
    Complete,
    /// Handlers exceeded the total timeout
    Forced,
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownPhase::Running => write!(f, "running"),
            ShutdownPhase::Draining => write!(f, "draining"),
            ShutdownPhase::Complete => write!(f, "complete"),
            ShutdownPhase::Forced => write!(f, "forced"),
        }
    }
}

pub struct ShutdownCoordinator {
    config: ShutdownConfig,
    phase: RwLock<ShutdownPhase>,
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(config: ShutdownConfig, token: CancellationToken) -> Self {
        Self {
            config,
            phase: RwLock::new(ShutdownPhase::Running),
            token,
        }
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.phase.read()
    }

    /// Cancels the token without waiting for a signal.
    pub fn initiate(&self) {
        if !self.token.is_cancelled() {
            info!("shutdown initiated");
            self.token.cancel();
        }
    }

    /// Resolves once SIGINT or SIGTERM arrives, or the token is cancelled
    /// some other way, and leaves the token cancelled.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!("failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("received SIGINT (Ctrl+C), initiating graceful shutdown");
            },
            _ = terminate => {
                info!("received SIGTERM, initiating graceful shutdown");
            },
            _ = self.token.cancelled() => {}
        }
        self.initiate();
    }

    /// Runs `handler` under the configured total timeout.
    pub async fn shutdown(&self, handler: &dyn ShutdownHandler) -> Result<()> {
        *self.phase.write() = ShutdownPhase::Draining;
        self.initiate();

        match timeout(self.config.total_timeout, handler.shutdown()).await {
            Ok(result) => {
                *self.phase.write() = ShutdownPhase::Complete;
                info!("graceful shutdown completed");
                result
            }
            Err(_) => {
                *self.phase.write() = ShutdownPhase::Forced;
                warn!(
                    timeout_secs = self.config.total_timeout.as_secs(),
                    "shutdown handlers exceeded total timeout"
                );
                Ok(())
            }
        }
    }
}

/// Trait for components that need graceful shutdown
#[async_trait::async_trait]
pub trait ShutdownHandler: Send + Sync {
    async fn shutdown(&self) -> Result<()>;
}

/// Logs what the in-memory store held when the server stopped.
pub struct StoreShutdownHandler {
    state: Arc<AppState>,
}

impl StoreShutdownHandler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait::async_trait]
impl ShutdownHandler for StoreShutdownHandler {
    async fn shutdown(&self) -> Result<()> {
        let stats = self.state.store().stats();
        info!(
            records = stats.records,
            total_likes = stats.total_likes,
            created = stats.created,
            updated = stats.updated,
            deleted = stats.deleted,
            liked = stats.liked,
            "discarding in-memory repositories"
        );
        Ok(())
    }
}

/// Runs multiple handlers in sequence; one failing does not stop the rest.
#[derive(Default)]
pub struct CompositeShutdownHandler {
    handlers: Vec<Box<dyn ShutdownHandler>>,
}

impl CompositeShutdownHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, handler: Box<dyn ShutdownHandler>) {
        self.handlers.push(handler);
    }
}

#[async_trait::async_trait]
impl ShutdownHandler for CompositeShutdownHandler {
    async fn shutdown(&self) -> Result<()> {
        for (idx, handler) in self.handlers.iter().enumerate() {
            if let Err(e) = handler.shutdown().await {
                error!(handler_index = idx, "shutdown handler error: {}", e);
            }
        }
        Ok(())
    }
}
