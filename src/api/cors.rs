use axum::http::{header, HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

/// Allows the frontend origin, with credentials, to call the API and load uploads.
pub fn create_cors_layer(frontend_base_url: &str) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origin(frontend_base_url))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn allowed_origin(frontend_base_url: &str) -> AllowOrigin {
    let origin = frontend_base_url.trim().trim_end_matches('/');
    match origin.parse::<HeaderValue>() {
        Ok(value) => {
            info!("CORS: allowing origin {}", origin);
            AllowOrigin::exact(value)
        }
        Err(e) => {
            // Credentials forbid a wildcard origin, so fall back to mirroring.
            warn!("CORS: invalid frontend origin '{}': {}, mirroring request origin", origin, e);
            AllowOrigin::mirror_request()
        }
    }
}
