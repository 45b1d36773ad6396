//! API server using Axum
//!
//! Serves read-only views of the result sets. Handlers only ever read the
//! published snapshot; the pipeline is never blocked by a request.

use std::net::SocketAddr;
use std::time::Instant;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::ApiServerConfig;
use crate::error::{GuardError, Result};
use crate::guard::ResultStore;
use crate::models::GuardStatus;

use super::routes;

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub store: ResultStore,
    pub status: watch::Receiver<GuardStatus>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: ResultStore, status: watch::Receiver<GuardStatus>) -> Self {
        Self {
            store,
            status,
            started_at: Instant::now(),
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: ApiServerConfig,
        store: ResultStore,
        status: watch::Receiver<GuardStatus>,
    ) -> Self {
        Self {
            config,
            state: AppState::new(store, status),
        }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                GuardError::InvalidConfig(format!(
                    "Invalid API server address {}:{}",
                    self.config.host, self.config.port
                ))
            })?;

        let router = self.build_router();

        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| GuardError::Internal(e.to_string()))?;

        info!("API server shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_bind_address() {
        let (_status_tx, status_rx) = watch::channel(GuardStatus::default());
        let server = ApiServer::new(
            ApiServerConfig {
                enabled: true,
                host: "not a host".to_string(),
                port: 5000,
            },
            ResultStore::new(),
            status_rx,
        );
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let err = server.run(shutdown_rx).await.unwrap_err();
        assert!(matches!(err, GuardError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let (_status_tx, status_rx) = watch::channel(GuardStatus::default());
        let server = ApiServer::new(
            ApiServerConfig {
                enabled: true,
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            ResultStore::new(),
            status_rx,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move { server.run(shutdown_rx).await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("API server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
