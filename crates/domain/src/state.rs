//! The orchestrator-owned engine-state projection.
//!
//! Serialization of this type is the crash-recovery format: all dates
//! become ISO strings via chrono's serde impls, everything else survives
//! round-trip unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::turn::{Turn, TurnConfig};

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Initialized,
    InProgress,
    Paused,
    Completed,
    Cancelled,
    Error,
}

impl EngineStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EngineStatus::Completed | EngineStatus::Cancelled | EngineStatus::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineStatus::Initialized => "initialized",
            EngineStatus::InProgress => "in_progress",
            EngineStatus::Paused => "paused",
            EngineStatus::Completed => "completed",
            EngineStatus::Cancelled => "cancelled",
            EngineStatus::Error => "error",
        }
    }
}

/// Persistent state of one debate's turn progression.
///
/// Invariant: `completed_turns.len() == current_turn_index` at every
/// externally observable point. Interventions are the one exception to
/// "append means advance": they append without moving the index, so the
/// invariant is stated over scheduled turns only — see
/// [`EngineState::scheduled_completed_count`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    pub session_id: String,
    pub current_turn_index: usize,
    pub turn_sequence: Vec<TurnConfig>,
    pub completed_turns: Vec<Turn>,
    pub status: EngineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}

impl EngineState {
    pub fn new(session_id: impl Into<String>, turn_sequence: Vec<TurnConfig>) -> Self {
        Self {
            session_id: session_id.into(),
            current_turn_index: 0,
            turn_sequence,
            completed_turns: Vec::new(),
            status: EngineStatus::Initialized,
            started_at: None,
            completed_at: None,
            error: None,
            cancel_reason: None,
        }
    }

    /// Completed turns that occupy a slot in the schedule (interventions
    /// excluded).
    pub fn scheduled_completed_count(&self) -> usize {
        self.completed_turns
            .iter()
            .filter(|t| t.config.turn_type != crate::turn::TurnType::ModeratorIntervention)
            .count()
    }

    /// The turn the orchestrator should generate next, if any.
    pub fn current_turn(&self) -> Option<&TurnConfig> {
        self.turn_sequence.get(self.current_turn_index)
    }

    /// Preview of the turn after the current one.
    pub fn next_turn(&self) -> Option<&TurnConfig> {
        self.turn_sequence.get(self.current_turn_index + 1)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
