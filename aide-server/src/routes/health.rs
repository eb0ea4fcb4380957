//! Health / heartbeat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthResponse)))]
pub struct HealthApi;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
    /// Whether replies come from the hosted LLM rather than the placeholder.
    pub anthropic_configured: bool,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint; always 200.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_owned(),
        message: "AI Assistant Backend is running".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        anthropic_configured: state.llm.is_some(),
    })
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use crate::assistant::testing::StubModel;
    use crate::routes::testing::{TestApp, send};

    #[tokio::test]
    async fn reports_unconfigured_llm() {
        let app = TestApp::new().await;
        let (status, body) = send(&app.router, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["anthropic_configured"], false);
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn reports_configured_llm() {
        let app = TestApp::with_model(Arc::new(StubModel::replying("hi"))).await;
        let (_, body) = send(&app.router, "GET", "/api/health", None).await;
        assert_eq!(body["anthropic_configured"], true);
    }
}
