pub mod auth;
pub mod chat;
pub mod companies;
pub mod events;
pub mod extract;
pub mod state;
pub mod submissions;

pub use state::AppState;

use axum::{
    http::StatusCode,
    Router,
    routing::{get, post, put},
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
    timeout::TimeoutLayer,
};
use std::time::Duration;
use serde::Serialize;

use crate::error::AppError;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        // Health check
        .route("/api/health", get(health))

        // Credentials
        .route("/companies/register", post(auth::register).fallback(method_not_allowed))
        .route("/companies/login", put(auth::login).fallback(method_not_allowed))
        .route("/companies/machine-access", put(auth::machine_access).fallback(method_not_allowed))
        .route("/companies/signout", put(auth::signout).fallback(method_not_allowed))

        // Company resources (token-gated)
        .route(
            "/companies/events",
            put(events::list_events).post(events::save_event).fallback(method_not_allowed),
        )
        .route(
            "/companies/submissions",
            put(submissions::list_submissions)
                .delete(submissions::delete_submission)
                .fallback(method_not_allowed),
        )
        .route("/companies/companies", post(companies::update_company).fallback(method_not_allowed))

        // Conversational challenge drafting
        .route("/companies/challenge-generator", post(chat::challenge_generator).fallback(method_not_allowed))

        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn method_not_allowed() -> AppError {
    AppError::InvalidMethod
}

async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
