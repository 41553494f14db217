//! HTTP surface.
//!
//! - `POST /debate`                     — create (safety-gated)
//! - `GET  /debate/{id}`                — public projection
//! - `POST /debate/{id}/engine`         — start the orchestrator loop
//! - `POST /debate/{id}/engine/control` — pause / resume / end
//! - `GET  /debate/{id}/events`         — SSE stream with replay
//! - `GET  /debate/{id}/summary`        — transcript + statistics
//! - `GET  /debate/{id}/judge`          — judge analysis
//! - `GET|POST /debate/{id}/share`      — short-code mapping
//! - `GET  /s/{code}`                   — redirect to the debate

pub mod debates;
pub mod engine;
pub mod events;
pub mod judge;
pub mod share;
pub mod summary;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use da_domain::error::Error;
use da_domain::ids;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/debate", post(debates::create))
        .route("/debate/:id", get(debates::get_debate))
        .route("/debate/:id/engine", post(engine::start))
        .route("/debate/:id/engine/control", post(engine::control))
        .route("/debate/:id/events", get(events::stream))
        .route("/debate/:id/summary", get(summary::summary))
        .route("/debate/:id/judge", get(judge::analysis))
        .route(
            "/debate/:id/share",
            get(share::get_code).post(share::create_code),
        )
        .route("/s/:code", get(share::redirect))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness + configured-provider report.
async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "providers": state.providers.configured(),
    }))
    .into_response()
}

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Map a domain error onto the wire.
pub(crate) fn domain_error(err: Error) -> Response {
    match err {
        Error::ValidationBlocked { reason, errors } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "errors": errors,
                "blocked": true,
                "blockReason": reason,
            })),
        )
            .into_response(),
        Error::ValidationRejected { errors } => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "errors": errors,
                "blocked": false,
            })),
        )
            .into_response(),
        Error::SessionNotFound(_) | Error::SessionExpired(_) | Error::SessionCorrupted(_) => {
            api_error(StatusCode::NOT_FOUND, "debate not found")
        }
        Error::AlreadyRunning(_) => {
            api_error(StatusCode::CONFLICT, "debate engine is already running")
        }
        Error::BudgetDenied { reason } | Error::BudgetExhausted { reason } => {
            api_error(StatusCode::CONFLICT, reason)
        }
        Error::Other(message) => api_error(StatusCode::CONFLICT, message),
        other => {
            tracing::error!(error = %other, "unhandled API error");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// Validate a path debate ID, mapping malformed IDs to 400.
pub(crate) fn require_valid_id(id: &str) -> Result<(), Response> {
    if ids::is_valid_debate_id(id) {
        Ok(())
    } else {
        Err(api_error(StatusCode::BAD_REQUEST, "malformed debate id"))
    }
}
