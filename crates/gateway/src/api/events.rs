//! The per-debate SSE stream.
//!
//! Wire format: `event: <type>\ndata: <JSON envelope>\n\n`, with
//! comment keep-alives. A `since` ISO timestamp query parameter
//! replays only retained events strictly after that instant, so
//! reconnecting subscribers catch up without duplicates.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use da_domain::events::BusEvent;

use crate::api::{api_error, domain_error, require_valid_id};
use crate::state::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Replay cursor: only events strictly after this instant.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

fn to_sse(event: &BusEvent) -> Event {
    Event::default()
        .event(event.event.event_type())
        .data(serde_json::to_string(event).unwrap_or_default())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /debate/{id}/events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Response {
    if let Err(resp) = require_valid_id(&id) {
        return resp;
    }
    match state.store.get_session(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "debate not found"),
        Err(e) => return domain_error(e),
    }

    let (replay, mut rx) = state.bus.subscribe(&id, query.since);
    tracing::debug!(debate_id = %id, replayed = replay.len(), "event subscriber attached");

    let stream = async_stream::stream! {
        for event in &replay {
            yield Ok::<_, Infallible>(to_sse(event));
        }
        loop {
            match rx.recv().await {
                Ok(event) => yield Ok(to_sse(&event)),
                // A slow subscriber lost its place; it keeps receiving
                // from here and can reconnect with `since` for the gap.
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(debate_id = %id, skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
        .into_response()
}
