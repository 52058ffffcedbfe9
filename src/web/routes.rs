//! Web API router construction.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
};
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::middleware::security_headers::SecurityHeadersLayer;
use crate::web::{plan, sessions, status, transcript};

/// Transcript photos from phones routinely exceed axum's 2MB default.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Router-level options that come from configuration.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub request_timeout: Duration,
    pub cors_origin: Option<String>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(90),
            cors_origin: None,
        }
    }
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Creates the web server router
pub fn create_router(app_state: AppState, options: RouterOptions) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/transcript/analyze", post(transcript::analyze))
        .route("/transcript/upload", post(transcript::upload))
        .route("/generate-plan", post(plan::generate_plan))
        .route("/review", post(plan::review))
        .route("/day-by-day", get(plan::day_by_day))
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/{id}", get(sessions::get_session))
        .route(
            "/sessions/{id}/transcript",
            post(sessions::upload_transcript),
        )
        .route("/sessions/{id}/plan", post(sessions::generate_session_plan))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        SecurityHeadersLayer,
        cors_layer(options.cors_origin.as_deref()),
        CompressionLayer::new()
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, options.request_timeout),
    ))
}
