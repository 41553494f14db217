//! Short share codes.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use da_domain::ids;

use crate::api::{api_error, domain_error, require_valid_id};
use crate::state::AppState;

/// Collision retries when minting a fresh code.
const MINT_ATTEMPTS: usize = 8;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /debate/{id}/share
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn create_code(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Err(resp) = require_valid_id(&id) {
        return resp;
    }
    let session = match state.store.get_session(&id).await {
        Ok(Some(session)) => session,
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "debate not found"),
        Err(e) => return domain_error(e),
    };

    // Idempotent: an existing mapping is returned as-is.
    match state.store.get_share_code(&id).await {
        Ok(Some(code)) => return share_body(&id, &code),
        Ok(None) => {}
        Err(e) => return domain_error(e),
    }

    for _ in 0..MINT_ATTEMPTS {
        let code = ids::generate_share_code(ids::SHARE_CODE_DEFAULT_LEN);
        match state.store.get_share(&code).await {
            Ok(Some(_)) => continue, // collision; mint again
            Ok(None) => {}
            Err(e) => return domain_error(e),
        }
        if let Err(e) = state.store.put_share(&code, &id, session.expires_at).await {
            return domain_error(e);
        }
        return share_body(&id, &code);
    }

    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "could not mint a unique share code",
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /debate/{id}/share
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_code(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if let Err(resp) = require_valid_id(&id) {
        return resp;
    }
    match state.store.get_share_code(&id).await {
        Ok(Some(code)) => share_body(&id, &code),
        Ok(None) => api_error(StatusCode::NOT_FOUND, "no share code for this debate"),
        Err(e) => domain_error(e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /s/{code}
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn redirect(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    if !ids::is_valid_share_code(&code) {
        return api_error(StatusCode::BAD_REQUEST, "malformed share code");
    }
    match state.store.get_share(&code).await {
        Ok(Some(debate_id)) => (
            StatusCode::FOUND,
            [(header::LOCATION, format!("/debate/{debate_id}"))],
        )
            .into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, "share code not found"),
        Err(e) => domain_error(e),
    }
}

fn share_body(debate_id: &str, code: &str) -> Response {
    Json(serde_json::json!({
        "debateId": debate_id,
        "shortCode": code,
        "path": format!("/s/{code}"),
    }))
    .into_response()
}
