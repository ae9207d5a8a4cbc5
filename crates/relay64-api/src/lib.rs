pub mod handlers;
pub mod models;
pub mod update;

use axum::{
    routing::{get, post},
    Router,
};
use relay64_server_tcp::TunnelHealthChecker;
use relay64_store::AddressStore;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;

pub use update::{UpdateError, UpdateHandler};

/// Application state shared across handlers
pub struct AppState {
    pub update_handler: UpdateHandler,
    pub health_checker: TunnelHealthChecker,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "relay64 API",
        description = "Destination address updates and tunnel health for the IPv4 to IPv6 relay"
    ),
    paths(handlers::update_address, handlers::health_check),
    components(schemas(models::TunnelStatus)),
    tags(
        (name = "address", description = "Destination address updates"),
        (name = "system", description = "Tunnel health")
    )
)]
pub struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Secret expected in `Authorization: Bearer <token>` on updates
    pub webhook_token: String,
    /// Connect timeout for each health check connection
    pub health_timeout: Duration,
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, store: Arc<AddressStore>) -> Self {
        let state = Arc::new(AppState {
            update_handler: UpdateHandler::new(config.webhook_token.clone(), store.clone()),
            health_checker: TunnelHealthChecker::new(store).with_timeout(config.health_timeout),
        });

        Self { config, state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/update", post(handlers::update_address))
            .route("/health", get(handlers::health_check))
            .route("/api-docs/openapi.json", get(handlers::openapi_json))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting webhook server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api-docs/openapi.json",
            self.config.bind_addr
        );

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}
