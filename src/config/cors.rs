use axum::http::{header, HeaderName, HeaderValue, Method};
use std::env;
use tower_http::cors::{AllowOrigin, CorsLayer};

// Vite dev server and the deployed dashboard origin are the defaults;
// production sets CORS_ALLOWED_ORIGINS explicitly.
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:4173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 3600;

pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins_from_env())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-user-role"),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn allowed_origins_from_env() -> AllowOrigin {
    let origins_str =
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string());

    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .filter_map(|origin| {
            let trimmed = origin.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("CORS: invalid origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS: no valid origins configured, falling back to defaults");
        AllowOrigin::list(
            DEFAULT_ALLOWED_ORIGINS
                .split(',')
                .map(|origin| origin.parse().expect("default origin is valid")),
        )
    } else {
        tracing::info!("CORS: configured with {} allowed origin(s)", origins.len());
        AllowOrigin::list(origins)
    }
}
