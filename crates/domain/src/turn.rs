//! Turn descriptors and completed turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProviderType;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The role addressed by a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    For,
    Against,
    Moderator,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::For => "for",
            Speaker::Against => "against",
            Speaker::Moderator => "moderator",
        }
    }

    pub fn is_debater(self) -> bool {
        !matches!(self, Speaker::Moderator)
    }

    /// The opposing debater seat. Moderator has no opponent.
    pub fn opponent(self) -> Option<Speaker> {
        match self {
            Speaker::For => Some(Speaker::Against),
            Speaker::Against => Some(Speaker::For),
            Speaker::Moderator => None,
        }
    }
}

/// The kind of contribution a turn makes to the debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnType {
    Opening,
    Constructive,
    Rebuttal,
    CrossExamination,
    Closing,
    ModeratorIntro,
    ModeratorTransition,
    ModeratorIntervention,
    ModeratorSummary,
}

impl TurnType {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnType::Opening => "opening",
            TurnType::Constructive => "constructive",
            TurnType::Rebuttal => "rebuttal",
            TurnType::CrossExamination => "cross_examination",
            TurnType::Closing => "closing",
            TurnType::ModeratorIntro => "moderator_intro",
            TurnType::ModeratorTransition => "moderator_transition",
            TurnType::ModeratorIntervention => "moderator_intervention",
            TurnType::ModeratorSummary => "moderator_summary",
        }
    }

    pub fn is_moderator(self) -> bool {
        matches!(
            self,
            TurnType::ModeratorIntro
                | TurnType::ModeratorTransition
                | TurnType::ModeratorIntervention
                | TurnType::ModeratorSummary
        )
    }

    pub fn is_debater(self) -> bool {
        !self.is_moderator()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scheduled and completed turns
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Immutable descriptor of one scheduled turn, derived deterministically
/// from (format, turn-count).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnConfig {
    pub index: usize,
    pub turn_type: TurnType,
    pub speaker: Speaker,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tokens: Option<u32>,
    pub label: String,
    pub description: String,
}

/// Severity of a rule violation found in a debater turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Minor,
    Moderate,
    Severe,
}

/// A rule violation attached to a completed turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub detail: String,
}

/// A completed turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub session_id: String,
    pub config: TurnConfig,
    pub speaker: Speaker,
    pub provider: ProviderType,
    pub content: String,
    pub token_count: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl Turn {
    pub fn new(
        session_id: impl Into<String>,
        config: TurnConfig,
        provider: ProviderType,
        content: impl Into<String>,
        token_count: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        let speaker = config.speaker;
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            config,
            speaker,
            provider,
            content: content.into(),
            token_count,
            started_at,
            completed_at: Utc::now(),
            violations: Vec::new(),
        }
    }
}
