//! Debate creation and lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Duration;
use serde::Deserialize;

use da_domain::ids::generate_debate_id;
use da_domain::session::{DebateFormat, DebateSession};

use crate::api::{domain_error, require_valid_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateDebateRequest {
    pub topic: String,
    pub turns: u8,
    #[serde(default)]
    pub format: DebateFormat,
    #[serde(default, rename = "customRules")]
    pub custom_rules: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /debate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateDebateRequest>,
) -> Response {
    // Safety pipeline first; no session is persisted for blocked or
    // rejected input.
    let spec = match state
        .safety
        .validate_create(&body.topic, body.turns, &body.custom_rules)
        .await
    {
        Ok(spec) => spec,
        Err(e) => return domain_error(e),
    };

    let session = DebateSession::new(
        generate_debate_id(),
        spec.topic,
        body.turns,
        body.format,
        spec.custom_rules,
        Duration::seconds(state.config.session_ttl_secs as i64),
    );

    if let Err(e) = state.store.put_session(&session).await {
        return domain_error(e);
    }

    tracing::info!(
        debate_id = %session.id,
        turns = session.turn_count,
        format = session.format.as_str(),
        "debate created"
    );

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "debateId": session.id,
            "session": state.store.to_public(&session),
        })),
    )
        .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /debate/{id}
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_debate(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Err(resp) = require_valid_id(&id) {
        return resp;
    }

    match state.store.get_session(&id).await {
        Ok(Some(session)) => Json(state.store.to_public(&session)).into_response(),
        Ok(None) => crate::api::api_error(StatusCode::NOT_FOUND, "debate not found"),
        Err(e) => domain_error(e),
    }
}
