use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;

const DEFAULT_ORIGINS: &str = "http://localhost:3000";

/// Build a CORS layer from the `BENTO_CORS_ORIGINS` env var.
///
/// The mobile client does not need CORS; this exists for the web preview
/// and Swagger UI. Only GET/POST with a JSON body are allowed.
pub fn build_cors_layer() -> CorsLayer {
    let raw = std::env::var("BENTO_CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());

    CorsLayer::new()
        .allow_origin(parse_origins(&raw))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    let mut origins: Vec<HeaderValue> = Vec::new();
    for candidate in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Ok(value) = candidate.parse::<HeaderValue>() else {
            tracing::warn!(origin = candidate, "Ignoring unparsable CORS origin");
            continue;
        };
        if !origins.contains(&value) {
            origins.push(value);
        }
    }
    origins
}
