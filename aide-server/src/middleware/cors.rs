use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::state::AppState;

/// CORS for the browser SPA. `*` (or an empty list) allows any origin.
pub fn cors_layer(state: Arc<AppState>) -> CorsLayer {
    let configured = &state.config.cors_allowed_origins;
    let base = CorsLayer::new().allow_headers(Any).allow_methods(Any);

    if configured.is_empty() || configured.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() { base.allow_origin(Any) } else { base.allow_origin(origins) }
}
