//! Debate lifecycle and streaming events published to the event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderType;
use crate::turn::{Speaker, TurnType, ViolationSeverity};

/// Budget warning level reported post-turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    None,
    Warning,
    Critical,
}

/// Events emitted during a debate (provider-agnostic).
///
/// The wire shape is a tagged union; the envelope ([`BusEvent`]) adds
/// the debate ID and an ISO timestamp to every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    DebateStarted {
        topic: String,
        format: String,
        turn_count: u8,
        total_turns: usize,
    },

    TurnStarted {
        turn_number: usize,
        turn_type: TurnType,
        speaker: Speaker,
        speaker_label: String,
        provider: ProviderType,
    },

    /// One streamed content delta.
    TurnStreaming {
        turn_number: usize,
        delta: String,
        content_length: usize,
    },

    TurnCompleted {
        turn_number: usize,
        turn_type: TurnType,
        speaker: Speaker,
        content: String,
        token_count: u32,
        latency_ms: u64,
    },

    TurnError {
        turn_number: usize,
        message: String,
        recoverable: bool,
    },

    ViolationDetected {
        turn_number: usize,
        rule: String,
        severity: ViolationSeverity,
        detail: String,
    },

    /// A moderator intervention was injected into the debate.
    Intervention {
        turn_number: usize,
        content: String,
    },

    ProgressUpdate {
        completed_turns: usize,
        total_turns: usize,
        percent: f64,
    },

    BudgetWarning {
        level: WarningLevel,
        tokens_used: u64,
        tokens_remaining: u64,
        utilization_percent: f64,
    },

    BudgetExceeded {
        tokens_used: u64,
        budget_tokens: u64,
        reason: String,
    },

    DebatePaused,

    DebateResumed,

    DebateCompleted {
        total_turns: usize,
        total_tokens: u64,
        cost_usd: f64,
    },

    DebateCancelled {
        reason: String,
        completed_turns: usize,
    },

    DebateError {
        message: String,
    },

    Heartbeat,
}

impl DebateEvent {
    /// The SSE `event:` name for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            DebateEvent::DebateStarted { .. } => "debate_started",
            DebateEvent::TurnStarted { .. } => "turn_started",
            DebateEvent::TurnStreaming { .. } => "turn_streaming",
            DebateEvent::TurnCompleted { .. } => "turn_completed",
            DebateEvent::TurnError { .. } => "turn_error",
            DebateEvent::ViolationDetected { .. } => "violation_detected",
            DebateEvent::Intervention { .. } => "intervention",
            DebateEvent::ProgressUpdate { .. } => "progress_update",
            DebateEvent::BudgetWarning { .. } => "budget_warning",
            DebateEvent::BudgetExceeded { .. } => "budget_exceeded",
            DebateEvent::DebatePaused => "debate_paused",
            DebateEvent::DebateResumed => "debate_resumed",
            DebateEvent::DebateCompleted { .. } => "debate_completed",
            DebateEvent::DebateCancelled { .. } => "debate_cancelled",
            DebateEvent::DebateError { .. } => "debate_error",
            DebateEvent::Heartbeat => "heartbeat",
        }
    }
}

/// Envelope carried on the bus and over SSE: the tagged event plus the
/// debate ID and emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    #[serde(flatten)]
    pub event: DebateEvent,
    pub debate_id: String,
    pub timestamp: DateTime<Utc>,
}

impl BusEvent {
    pub fn new(debate_id: impl Into<String>, event: DebateEvent) -> Self {
        Self {
            event,
            debate_id: debate_id.into(),
            timestamp: Utc::now(),
        }
    }
}
