//! Engine lifecycle endpoints: start and control.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use da_domain::state::EngineStatus;

use crate::api::{api_error, domain_error, require_valid_id};
use crate::runtime::orchestrator;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /debate/{id}/engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn start(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Err(resp) = require_valid_id(&id) {
        return resp;
    }

    match orchestrator::start(&state, &id).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "debateId": id, "status": "running" })),
        )
            .into_response(),
        Err(e) => domain_error(e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /debate/{id}/engine/control
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ControlRequestBody {
    pub action: ControlAction,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Pause,
    Resume,
    End,
}

pub async fn control(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ControlRequestBody>,
) -> Response {
    if let Err(resp) = require_valid_id(&id) {
        return resp;
    }

    let engine = match state.store.get_engine_state(&id).await {
        Ok(Some(engine)) => engine,
        Ok(None) => return api_error(StatusCode::CONFLICT, "debate engine has not started"),
        Err(e) => return domain_error(e),
    };

    match body.action {
        ControlAction::Pause => {
            if engine.status != EngineStatus::InProgress || !state.debate_locks.is_running(&id) {
                return api_error(StatusCode::CONFLICT, "debate is not running");
            }
            state.controls.request_pause(&id);
            accepted(&id, "pausing")
        }

        ControlAction::Resume => match orchestrator::resume(&state, &id).await {
            Ok(()) => accepted(&id, "running"),
            Err(e) => domain_error(e),
        },

        ControlAction::End => {
            let reason = body
                .reason
                .unwrap_or_else(|| "ended by user request".into());
            if state.debate_locks.is_running(&id) {
                state.controls.request_end(&id, reason);
                accepted(&id, "ending")
            } else if engine.status.is_terminal() {
                api_error(StatusCode::CONFLICT, "debate already finished")
            } else {
                match orchestrator::end_idle(&state, &id, &reason).await {
                    Ok(()) => accepted(&id, "ended"),
                    Err(e) => domain_error(e),
                }
            }
        }
    }
}

fn accepted(id: &str, status: &str) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "debateId": id, "status": status })),
    )
        .into_response()
}
