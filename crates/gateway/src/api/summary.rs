//! Transcript and statistics, with the assignment revealed only after
//! completion.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use da_domain::session::SessionStatus;
use da_domain::turn::Turn;

use crate::api::{api_error, domain_error, require_valid_id};
use crate::state::AppState;

#[derive(Serialize)]
struct TranscriptTurn {
    turn_number: usize,
    turn_type: da_domain::turn::TurnType,
    speaker: da_domain::turn::Speaker,
    label: String,
    content: String,
    token_count: u32,
    /// Present only once the debate has completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'static str>,
}

fn transcript_turn(turn: &Turn, completed: bool, session: &da_domain::session::DebateSession) -> TranscriptTurn {
    let model = (completed && turn.speaker.is_debater())
        .then(|| session.assignment.model_for(turn.speaker).display_name());
    TranscriptTurn {
        turn_number: turn.config.index + 1,
        turn_type: turn.config.turn_type,
        speaker: turn.speaker,
        label: turn.config.label.clone(),
        content: turn.content.clone(),
        token_count: turn.token_count,
        model,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /debate/{id}/summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn summary(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Err(resp) = require_valid_id(&id) {
        return resp;
    }

    let session = match state.store.get_session(&id).await {
        Ok(Some(session)) => session,
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "debate not found"),
        Err(e) => return domain_error(e),
    };

    let engine = match state.store.get_engine_state(&id).await {
        Ok(engine) => engine,
        Err(e) => return domain_error(e),
    };
    let usage = match state.store.get_usage(&id).await {
        Ok(usage) => usage,
        Err(e) => return domain_error(e),
    };

    let completed = session.status == SessionStatus::Completed;
    let transcript: Vec<TranscriptTurn> = engine
        .as_ref()
        .map(|e| {
            e.completed_turns
                .iter()
                .map(|t| transcript_turn(t, completed, &session))
                .collect()
        })
        .unwrap_or_default();

    let statistics = usage.map(|u| {
        serde_json::json!({
            "inputTokens": u.input_tokens,
            "outputTokens": u.output_tokens,
            "totalTokens": u.total_tokens,
            "costUsd": u.cost_usd,
            "budgetTokens": u.budget_tokens,
            "budgetRemainingTokens": u.remaining_tokens(),
            "budgetUtilizationPercent": u.utilization_percent(),
        })
    });

    let mut body = serde_json::json!({
        "session": state.store.to_public(&session),
        "engineStatus": engine.as_ref().map(|e| e.status),
        "transcript": transcript,
        "statistics": statistics,
    });

    // The hidden assignment appears only once the debate is complete.
    if let Some(assignment) = session.revealed_assignment() {
        body["assignment"] = serde_json::json!({
            "forPosition": assignment.for_position,
            "againstPosition": assignment.against_position,
            "forModel": assignment.for_position.display_name(),
            "againstModel": assignment.against_position.display_name(),
        });
    }

    Json(body).into_response()
}
