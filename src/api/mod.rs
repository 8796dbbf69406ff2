//! HTTP API server for SecondEye

pub mod health;
pub mod process;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::orchestrator::Orchestrator;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// HTTP server exposing the pipeline
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server for `orchestrator` on `port`
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, port: u16) -> Self {
        Self {
            state: Arc::new(ApiState { orchestrator }),
            port,
        }
    }

    /// Build the router with all routes and middleware
    #[must_use]
    pub fn router(&self) -> Router {
        let router = Router::new()
            .merge(health::router())
            .merge(process::router(self.state.clone()));

        // CORS layer for cross-origin requests from the capture client
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}
