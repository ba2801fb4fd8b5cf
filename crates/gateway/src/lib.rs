//! HTTP gateway for Toolweave.
//!
//! Exposes a health check and the v1 API: conversation turns streamed as
//! AI SDK UI message events over SSE, tool confirmation, scheduled tasks,
//! and read access to stored conversations.
//!
//! Built on Axum.

pub mod api_v1;

use axum::{Router, http::Method, http::header, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use toolweave_agent::ChatAgent;
use toolweave_config::AppConfig;
use toolweave_store::InMemoryStore;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<ChatAgent>,
    /// The same store the agent writes to, for listing and clearing.
    pub store: InMemoryStore,
    /// Whether an API key is configured for the default provider.
    pub provider_configured: bool,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router: `/health` plus the v1 API nested under `/v1`.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Builds the provider, tool registry, store and agent once and shares them
/// across all requests.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let router = toolweave_providers::build_from_config(&config);
    let provider = router
        .default()
        .ok_or("No default provider configured, run `toolweave onboard`")?;
    let tools = Arc::new(toolweave_tools::default_registry(&config.tools));
    let store = InMemoryStore::new();
    let agent = ChatAgent::new(provider, tools, Arc::new(store.clone()), &config)?;

    let state = Arc::new(GatewayState {
        agent: Arc::new(agent),
        store,
        provider_configured: config.has_api_key(),
        start_time: chrono::Utc::now(),
    });

    let app = build_router(state);

    info!(
        addr = %addr,
        provider = %config.default_provider,
        model = %config.default_model,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(api_v1::tests::test_state());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
    }

    #[tokio::test]
    async fn v1_is_nested() {
        let app = build_router(api_v1::tests::test_state());

        let req = Request::builder()
            .uri("/v1/tools")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
