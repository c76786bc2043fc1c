//! CORS Middleware Configuration
//!
//! Browsers reach the REST surface and the `/gateway` upgrade from the web
//! client origins. An empty list or a `*` entry allows any origin.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::CorsSettings;

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Create CORS layer from settings
pub fn create_cors_layer(settings: &CorsSettings) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match allowed_origins(settings) {
        Some(origins) => layer
            .allow_origin(AllowOrigin::list(origins))
            .max_age(PREFLIGHT_MAX_AGE),
        None => layer.allow_origin(Any),
    }
}

/// Parsed origin allow-list, `None` when every origin is accepted.
fn allowed_origins(settings: &CorsSettings) -> Option<Vec<HeaderValue>> {
    if settings.allowed_origins.iter().any(|o| o.trim() == "*") {
        return None;
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|o| match o.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    (!origins.is_empty()).then_some(origins)
}
