//! Environment-driven configuration.
//!
//! The orchestrator is configured entirely through environment
//! variables (see the deployment docs for the full list). `from_env`
//! reads and parses them once at startup; `validate` reports issues
//! with a severity so the binary can warn-and-continue or refuse to
//! boot.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-layer safety toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    pub patterns_enabled: bool,
    pub moderation_enabled: bool,
    pub semantic_enabled: bool,
    /// Strict mode escalates high-severity pattern findings to blocks.
    pub strict_mode: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            patterns_enabled: true,
            moderation_enabled: true,
            semantic_enabled: true,
            strict_mode: false,
        }
    }
}

/// Budget knobs, all env-overridable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Overrides the turn-count-derived default when set.
    pub token_budget_per_debate: Option<u64>,
    pub max_tokens_per_turn: Option<u32>,
    /// Fraction of the budget at which a warning is emitted.
    pub warning_threshold: f64,
    /// When on, admission denies turns whose estimate exceeds remaining.
    pub hard_limit: bool,
    pub cost_limit_usd: Option<f64>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            token_budget_per_debate: None,
            max_tokens_per_turn: None,
            warning_threshold: 0.8,
            hard_limit: true,
            cost_limit_usd: None,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Process secret for the encrypted session store. Required, and at
    /// least 32 bytes.
    pub session_secret: String,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub xai_api_key: Option<String>,
    pub budget: BudgetConfig,
    pub safety: SafetyConfig,
    /// Socket address the gateway binds.
    pub bind_addr: String,
    /// Session TTL in seconds.
    pub session_ttl_secs: u64,
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// Fails only when SESSION_SECRET is absent; everything else has a
    /// default or degrades a feature (missing provider keys disable that
    /// provider, missing OpenAI key degrades moderation/semantic safety
    /// layers to pass-through).
    pub fn from_env() -> Result<Self> {
        let session_secret = std::env::var("SESSION_SECRET")
            .map_err(|_| Error::Config("SESSION_SECRET is required".into()))?;

        Ok(Self {
            session_secret,
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            xai_api_key: env_opt("XAI_API_KEY"),
            budget: BudgetConfig {
                token_budget_per_debate: env_parse("TOKEN_BUDGET_PER_DEBATE")?,
                max_tokens_per_turn: env_parse("MAX_TOKENS_PER_TURN")?,
                warning_threshold: env_parse("BUDGET_WARNING_THRESHOLD")?.unwrap_or(0.8),
                hard_limit: env_bool("BUDGET_HARD_LIMIT").unwrap_or(true),
                cost_limit_usd: env_parse("COST_LIMIT_USD")?,
            },
            safety: SafetyConfig {
                patterns_enabled: env_bool("SAFETY_PATTERNS_ENABLED").unwrap_or(true),
                moderation_enabled: env_bool("SAFETY_MODERATION_ENABLED").unwrap_or(true),
                semantic_enabled: env_bool("SAFETY_SEMANTIC_ENABLED").unwrap_or(true),
                strict_mode: env_bool("SAFETY_STRICT_MODE").unwrap_or(false),
            },
            bind_addr: env_opt("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into()),
            session_ttl_secs: env_parse("SESSION_TTL_SECS")?.unwrap_or(86_400),
        })
    }

    /// Report configuration issues for startup logging.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.session_secret.len() < 32 {
            issues.push(ConfigIssue::error(
                "SESSION_SECRET must be at least 32 bytes",
            ));
        }
        if self.anthropic_api_key.is_none() {
            issues.push(ConfigIssue::error(
                "ANTHROPIC_API_KEY missing: moderator and judge turns cannot run",
            ));
        }
        if self.openai_api_key.is_none() {
            issues.push(ConfigIssue::warning(
                "OPENAI_API_KEY missing: ChatGPT debater unavailable, moderation and \
                 semantic safety layers degrade to pass-through",
            ));
        }
        if self.xai_api_key.is_none() {
            issues.push(ConfigIssue::warning(
                "XAI_API_KEY missing: Grok debater unavailable",
            ));
        }
        if !(0.0..=1.0).contains(&self.budget.warning_threshold) {
            issues.push(ConfigIssue::error(
                "BUDGET_WARNING_THRESHOLD must be within 0.0..=1.0",
            ));
        }
        if self.session_ttl_secs == 0 {
            issues.push(ConfigIssue::error("SESSION_TTL_SECS must be positive"));
        }

        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation issues
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl ConfigIssue {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Env helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_opt(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{name} has an unparseable value: {raw:?}"))),
    }
}

fn env_bool(name: &str) -> Option<bool> {
    env_opt(name).map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "on"))
}
