//! HTTP gateway for subserver.
//!
//! Exposes system endpoints plus the route groups from [`groups`]:
//! chat with MCP tool use through the main server, and text embeddings
//! with similarity search.
//!
//! Built on Axum.

pub mod error;
pub mod groups;
pub mod langchain;
pub mod state;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_support;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{Router, extract::State, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use subserver_config::{AppConfig, CorsConfig};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use groups::{ApiGroup, ApiGroupInfo};
pub use state::{AppState, SharedState};

/// Build the router: system routes, enabled groups and middleware.
///
/// Layers, outermost first:
/// - HTTP trace logging
/// - CORS from `cors.origins`
/// - gzip compression (SSE responses are left alone)
/// - request body size limit
pub fn build_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/", get(root_handler))
        // GET routes also answer HEAD.
        .route("/health", get(health_handler))
        .route("/api/list", get(api_list_handler));

    for group in groups::enabled(&state.config.api) {
        info!(group = group.name, routes = group.routes.len(), "Mounting API group");
        router = router.merge((group.router)());
    }

    let body_limit = state.config.server.body_limit;
    let cors = cors_layer(&state.config.cors);

    router
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state: SharedState = Arc::new(AppState::from_config(config)?);

    tokio::spawn(warmup(state.clone()));

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "subserver listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("subserver stopped");
    Ok(())
}

/// Load the embedding model and the tool catalog in the background so the
/// first requests do not pay for it. Failures are only logged.
pub async fn warmup(state: SharedState) {
    let vector = async {
        if !state.config.api.is_enabled("vector-service") {
            return;
        }
        match state.vector.model().ensure_loaded().await {
            Ok(dimension) => info!(model = state.vector.model().name(), dimension, "Embedding model warmed up"),
            Err(e) => warn!(error = %e, "Embedding model warmup failed"),
        }
    };
    let tools = async {
        if !state.config.api.is_enabled("langchain-service") {
            return;
        }
        match state.tools.list_tools().await {
            Ok(tools) => info!(count = tools.len(), "MCP tools warmed up"),
            Err(e) => warn!(error = %e, "MCP tool warmup failed"),
        }
    };
    tokio::join!(vector, tools);
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// --- Handlers ---

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
    status: &'static str,
    started_at: String,
}

async fn root_handler(State(state): State<SharedState>) -> Json<RootResponse> {
    Json(RootResponse {
        name: "subserver",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        started_at: state.started_at.to_rfc3339(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

#[derive(Serialize)]
struct ApiListResponse {
    apis: Vec<ApiGroupInfo>,
    count: usize,
}

async fn api_list_handler(State(state): State<SharedState>) -> Json<ApiListResponse> {
    let apis = groups::registered(&state.config.api);
    Json(ApiListResponse {
        count: apis.len(),
        apis,
    })
}
