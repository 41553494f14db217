//! Pending control requests for running debates.
//!
//! `pause` and `end` must not race the orchestrator's own state
//! writes, so the control endpoint records the request here and the
//! loop applies it at the next turn boundary.

use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    Pause,
    End { reason: String },
}

#[derive(Default)]
pub struct ControlMap {
    pending: Mutex<HashMap<String, ControlRequest>>,
}

impl ControlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a pause. An `End` already pending wins and is kept.
    pub fn request_pause(&self, debate_id: &str) {
        let mut pending = self.pending.lock();
        pending
            .entry(debate_id.to_string())
            .or_insert(ControlRequest::Pause);
    }

    /// Request a graceful end. Overrides a pending pause.
    pub fn request_end(&self, debate_id: &str, reason: impl Into<String>) {
        self.pending.lock().insert(
            debate_id.to_string(),
            ControlRequest::End {
                reason: reason.into(),
            },
        );
    }

    /// Take the pending request, if any (consumed once).
    pub fn take(&self, debate_id: &str) -> Option<ControlRequest> {
        self.pending.lock().remove(debate_id)
    }

    /// Drop a stale request without applying it.
    pub fn clear(&self, debate_id: &str) {
        self.pending.lock().remove(debate_id);
    }
}
