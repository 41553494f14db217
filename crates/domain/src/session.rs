//! The authoritative debate record and its public projection.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ProviderType;
use crate::turn::Speaker;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Debater model assignment
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One of the two model families a debater seat can be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebaterModel {
    ChatgptModel,
    GrokModel,
}

impl DebaterModel {
    pub fn provider(self) -> ProviderType {
        match self {
            DebaterModel::ChatgptModel => ProviderType::Openai,
            DebaterModel::GrokModel => ProviderType::Xai,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DebaterModel::ChatgptModel => "ChatGPT",
            DebaterModel::GrokModel => "Grok",
        }
    }
}

/// The hidden FOR/AGAINST model mapping.
///
/// Never serialized into any pre-completion client response; the public
/// projection strips it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenAssignment {
    pub for_position: DebaterModel,
    pub against_position: DebaterModel,
}

impl HiddenAssignment {
    /// Coin-flip assignment. The two positions are always distinct.
    pub fn random() -> Self {
        if rand::thread_rng().gen_bool(0.5) {
            Self {
                for_position: DebaterModel::ChatgptModel,
                against_position: DebaterModel::GrokModel,
            }
        } else {
            Self {
                for_position: DebaterModel::GrokModel,
                against_position: DebaterModel::ChatgptModel,
            }
        }
    }

    /// The model seated for the given debater speaker.
    ///
    /// Panics if called with [`Speaker::Moderator`]; the moderator is
    /// not part of the assignment.
    pub fn model_for(&self, speaker: Speaker) -> DebaterModel {
        match speaker {
            Speaker::For => self.for_position,
            Speaker::Against => self.against_position,
            Speaker::Moderator => unreachable!("moderator has no hidden assignment"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Debate format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DebateFormat {
    #[default]
    Standard,
    Oxford,
    LincolnDouglas,
}

impl DebateFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DebateFormat::Standard => "standard",
            DebateFormat::Oxford => "oxford",
            DebateFormat::LincolnDouglas => "lincoln-douglas",
        }
    }
}

/// Client-visible session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ready,
    Active,
    Paused,
    Completed,
    Error,
}

/// The authoritative debate record, exclusively owned by the session
/// store and mutated only through compare-and-set updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    pub id: String,
    pub topic: String,
    /// Number of debater turns: even, 2..=10.
    pub turn_count: u8,
    pub format: DebateFormat,
    /// Ordered, at most five.
    #[serde(default)]
    pub custom_rules: Vec<String>,
    pub assignment: HiddenAssignment,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DebateSession {
    pub fn new(
        id: String,
        topic: String,
        turn_count: u8,
        format: DebateFormat,
        custom_rules: Vec<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            topic,
            turn_count,
            format,
            custom_rules,
            assignment: HiddenAssignment::random(),
            status: SessionStatus::Ready,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// The only shape that may appear in a pre-completion client
    /// response: no assignment, no internal timestamps.
    pub fn to_public(&self) -> PublicSession {
        PublicSession {
            id: self.id.clone(),
            topic: self.topic.clone(),
            turn_count: self.turn_count,
            format: self.format,
            custom_rules: self.custom_rules.clone(),
            status: self.status,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    /// The revealed assignment, available only once the debate is done.
    pub fn revealed_assignment(&self) -> Option<&HiddenAssignment> {
        match self.status {
            SessionStatus::Completed => Some(&self.assignment),
            _ => None,
        }
    }
}

/// Client-facing projection of a [`DebateSession`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSession {
    pub id: String,
    pub topic: String,
    pub turn_count: u8,
    pub format: DebateFormat,
    pub custom_rules: Vec<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
