//! Token and cost accounting for one debate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProviderType;

/// Usage recorded for a single completed turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnUsage {
    pub turn_id: Uuid,
    pub provider: ProviderType,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Running budget tally for one debate.
///
/// Mutated only by the budget manager; everything else reads snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateUsage {
    pub session_id: String,
    pub turns: Vec<TurnUsage>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
    pub budget_tokens: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DebateUsage {
    pub fn new(session_id: impl Into<String>, budget_tokens: u64) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            cost_usd: 0.0,
            budget_tokens,
            created_at: now,
            updated_at: now,
        }
    }

    /// Tokens left in the budget (never negative).
    pub fn remaining_tokens(&self) -> u64 {
        self.budget_tokens.saturating_sub(self.total_tokens)
    }

    /// Budget utilization in percent, 0.0 for a zero budget.
    pub fn utilization_percent(&self) -> f64 {
        if self.budget_tokens == 0 {
            return 0.0;
        }
        (self.total_tokens as f64 / self.budget_tokens as f64) * 100.0
    }

    /// Fold one turn's actual usage into the totals.
    pub fn record(&mut self, turn: TurnUsage) {
        self.input_tokens += turn.input_tokens;
        self.output_tokens += turn.output_tokens;
        self.total_tokens += turn.input_tokens + turn.output_tokens;
        self.cost_usd += turn.cost_usd;
        self.updated_at = turn.recorded_at;
        self.turns.push(turn);
    }
}
