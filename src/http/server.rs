//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the kernel endpoints
//! - Wrap it in the security gateway stages
//! - Wire up middleware (request ID and tracing outside the gateway, timeout
//!   and concurrency limit inside it)
//! - Serve with client addresses attached and graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{limit::GlobalConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::KernelConfig;
use crate::http::handlers;
use crate::http::request::{make_span, MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::Kernel;
use crate::modules::ModuleRegistry;
use crate::observability::StatsReporter;
use crate::security::SecurityGateway;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModuleRegistry>,
    pub gateway: Arc<SecurityGateway>,
    pub stats: StatsReporter,
}

/// HTTP server for the kernel.
pub struct HttpServer {
    router: Router,
    config: KernelConfig,
}

impl HttpServer {
    /// Create a new HTTP server over a started kernel.
    pub fn new(config: KernelConfig, kernel: &Kernel) -> Self {
        let state = AppState {
            registry: kernel.registry().clone(),
            gateway: kernel.gateway().clone(),
            stats: kernel.stats().clone(),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &KernelConfig, state: AppState) -> Router {
        let gateway = state.gateway.clone();

        let api = Router::new()
            .route("/health", get(handlers::get_health))
            .route("/api/modules", get(handlers::get_modules))
            .route("/api/modules/{name}/status", get(handlers::get_module_status))
            .route("/api/modules/{name}/health", get(handlers::get_module_health))
            .route("/api/csrf-token", get(handlers::issue_csrf_token))
            .route("/api/stats", get(handlers::get_stats))
            .with_state(state);

        Self::layer_routes(config, &gateway, api)
    }

    /// Outside in: request id → trace → gateway → timeout → concurrency
    /// limit → routes.
    ///
    /// Timeouts sit inside the gateway so a 408 still carries the hardening
    /// and RateLimit headers. The deadline starts once a request is admitted;
    /// buffering an undeclared body during validation is not counted.
    #[allow(deprecated)]
    fn layer_routes(config: &KernelConfig, gateway: &Arc<SecurityGateway>, api: Router) -> Router {
        let api = api.layer(
            ServiceBuilder::new()
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.timeouts.request_secs,
                )))
                .layer(GlobalConcurrencyLimitLayer::new(
                    config.listener.max_connections,
                )),
        );

        gateway.apply(api).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(make_span::<axum::body::Body>))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_connections = self.config.listener.max_connections,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }
}
