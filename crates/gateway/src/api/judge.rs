//! Judge analysis endpoint.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::api::{domain_error, require_valid_id};
use crate::runtime::orchestrator;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JudgeQuery {
    /// Bypass the per-debate cache and re-run the analysis.
    #[serde(default)]
    pub force: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /debate/{id}/judge
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<JudgeQuery>,
) -> Response {
    if let Err(resp) = require_valid_id(&id) {
        return resp;
    }

    match orchestrator::compute_judge_analysis(&state, &id, query.force).await {
        Ok(analysis) => Json(&*analysis).into_response(),
        Err(e) => domain_error(e),
    }
}
