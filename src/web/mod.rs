//! Web server module.

mod handlers;

use crate::config::ServerConfig;
use crate::notifier::Notifier;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub notifier: Notifier,
}

/// Web server for upwatch.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, notifier: Notifier) -> Self {
        Self {
            state: AppState { config, notifier },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            // Pull fallback
            .route("/status", get(handlers::handle_status))
            .route("/urls", get(handlers::handle_urls))
            .route("/api/summary", get(handlers::handle_summary))
            // Push subscription
            .route("/ws", get(handlers::handle_ws))
            // Static assets
            .fallback_service(ServeDir::new(&self.state.config.public_dir))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
