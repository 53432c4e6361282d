//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request tracing)
//! - Bind server to listener, stop on shutdown signal
//! - Select a backend per request and forward to it

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::client::{build_client, UpstreamClient};
use crate::http::forward::forward;
use crate::load_balancer::{BackendRegistry, ConfigurationError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BackendRegistry>,
    pub client: UpstreamClient,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    registry: Arc<BackendRegistry>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails if the backend list cannot be turned into a registry.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigurationError> {
        let registry = Arc::new(BackendRegistry::new(&config.backends)?);

        for (position, target) in registry.targets().enumerate() {
            tracing::info!(position, backend = %target, "Backend registered");
        }

        let state = AppState {
            registry: registry.clone(),
            client: build_client(&config.timeouts),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            registry,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The request-handling service, for hosts that run their own listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal arrives on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.registry.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Get the backend registry.
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }
}

/// Main proxy handler.
/// Selects the next backend and forwards the request to it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    // Selection is a single atomic step; nothing is held across the forward.
    let target = state.registry.select_next();

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(
        backend = %target,
        method = %method,
        path = %path,
        "Proxying request"
    );

    match forward(&state.client, &target, request).await {
        Ok(response) => {
            tracing::debug!(
                backend = %target,
                status = %response.status(),
                "Backend responded"
            );
            response
        }
        Err(e) => {
            tracing::warn!(
                backend = %target,
                method = %method,
                path = %path,
                error = %e,
                "Upstream error"
            );
            e.into_response()
        }
    }
}
