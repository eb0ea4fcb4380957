//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - REST resources under `/api`
//! - the OpenAPI document (disable with `AIDE_ENABLE_DOCS=false`)
//! - a JSON 404 for everything else
//! - CORS and per-request trace-id layers

mod browsing;
mod conversations;
mod data_sources;
pub mod doc;
mod health;
mod tasks;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde_json::json;
use tower::ServiceBuilder;

use crate::error::ServerError;
use crate::middleware::{cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .merge(tasks::router())
        .merge(conversations::router())
        .merge(data_sources::router())
        .merge(browsing::router());

    let mut app = Router::new().nest("/api", api_router).fallback(not_found);

    if state.config.enable_docs {
        let api_doc = doc::get_docs();
        app = app.route(
            "/api-docs/openapi.json",
            get(move || {
                let api_doc = api_doc.clone();
                async move { Json(api_doc) }
            }),
        );
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn_with_state(state.clone(), trace::trace_middleware))
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Resource not found" })))
}

/// Trimmed-non-empty text, or `400` with `message`.
pub(crate) fn required_text(value: Option<String>, message: &str) -> Result<String, ServerError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ServerError::BadRequest(message.to_owned())),
    }
}
