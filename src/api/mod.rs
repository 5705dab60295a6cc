//! HTTP API server for the ALEX gateway
//!
//! Three stateless proxies around the inference gateway, plus health checks
//! and an optional static web UI.

pub mod ask;
pub mod error;
pub mod health;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::gateway::{InferenceGateway, OpenAiGateway};
use crate::knowledge::KnowledgeSource;
use crate::{Config, Result};
use error::ApiError;

/// Message returned by every proxy when the credential is missing
const MISSING_CREDENTIAL: &str = "Missing OPENAI_API_KEY";

/// Shared state for API handlers
pub struct ApiState {
    /// Inference gateway; `None` when no credential is configured
    pub gateway: Option<Arc<dyn InferenceGateway>>,
    /// Knowledge document read on every answer request
    pub knowledge: KnowledgeSource,
}

impl ApiState {
    /// Gateway for a proxy call, or the uniform service-unavailable error
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` when no credential was configured
    pub fn require_gateway(&self) -> std::result::Result<&Arc<dyn InferenceGateway>, ApiError> {
        self.gateway
            .as_ref()
            .ok_or(ApiError::NotConfigured(MISSING_CREDENTIAL))
    }
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    knowledge: KnowledgeSource,
    port: u16,
    gateway: Option<Arc<dyn InferenceGateway>>,
    static_dir: Option<PathBuf>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(knowledge: KnowledgeSource, port: u16) -> Self {
        Self {
            knowledge,
            port,
            gateway: None,
            static_dir: None,
        }
    }

    /// Builder populated from loaded configuration
    ///
    /// The `OpenAI` gateway is attached only when a credential is present.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let builder = Self::new(
            KnowledgeSource::new(config.server.knowledge_path.clone()),
            config.server.port,
        )
        .static_dir(config.server.static_dir.clone());

        match config.credential() {
            Some(key) => builder.gateway(Arc::new(OpenAiGateway::new(key, config.models.clone()))),
            None => builder,
        }
    }

    /// Set the inference gateway
    #[must_use]
    pub fn gateway(mut self, gateway: Arc<dyn InferenceGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set the static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            gateway: self.gateway,
            knowledge: self.knowledge,
        });

        ApiServer {
            state,
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest(
                "/api",
                ask::router(self.state.clone()).merge(voice::router(self.state.clone())),
            )
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server on the configured port
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        self.serve(listener).await
    }

    /// Run the API server on an already-bound listener
    ///
    /// # Errors
    ///
    /// Returns error if the server fails while running
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        if self.state.gateway.is_none() {
            tracing::warn!("no inference credential configured - proxies will return 503");
        }

        let port = listener.local_addr().map(|a| a.port()).unwrap_or(self.port);
        tracing::info!(
            port,
            knowledge = %self.state.knowledge.path().display(),
            "API server listening"
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
