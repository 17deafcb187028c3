use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::state::AppState;

/// Builds the public router: OTP login endpoints, the internal access-check
/// endpoint, and a liveness probe.
pub(crate) fn build_router(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);
    if let Some(origin) = cors_origin {
        cors = cors.allow_origin(origin);
    }

    Router::new()
        .route("/auth/otp/send", post(auth::send_otp_handler))
        .route("/auth/otp/verify", post(auth::verify_otp_handler))
        .route(
            "/access/students/check",
            post(auth::student_access_check_handler),
        )
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}
