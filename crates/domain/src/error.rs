//! Shared error type used across all debate-arena crates.

use serde::{Deserialize, Serialize};

use crate::turn::Speaker;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The three upstream vendors the orchestrator can generate with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Openai,
    Anthropic,
    Xai,
}

impl ProviderType {
    pub const ALL: [ProviderType; 3] = [
        ProviderType::Openai,
        ProviderType::Anthropic,
        ProviderType::Xai,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::Openai => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Xai => "xai",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Normalized provider errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Classification of an upstream failure, normalized across vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    RateLimit,
    AuthError,
    InvalidRequest,
    ContextLength,
    ContentFilter,
    ServerError,
    NetworkError,
    Timeout,
    Unknown,
}

impl ProviderErrorKind {
    /// Whether an error of this kind is retryable by default.
    pub fn default_retryable(self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimit
                | ProviderErrorKind::ServerError
                | ProviderErrorKind::NetworkError
                | ProviderErrorKind::Timeout
        )
    }
}

/// A normalized upstream error.
///
/// Every vendor-specific failure is mapped into this shape before it
/// leaves the provider crate, so the retry wrapper and the orchestrator
/// never see raw HTTP or SDK errors.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("provider {provider} {kind:?}: {message}")]
pub struct ProviderError {
    pub provider: ProviderType,
    pub kind: ProviderErrorKind,
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
    pub retryable: bool,
    /// Vendor-supplied retry delay, when present.
    pub retry_after_ms: Option<u64>,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: ProviderType, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            status: None,
            retryable: kind.default_retryable(),
            retry_after_ms: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_retry_after_ms(mut self, ms: u64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Safety block reasons
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why the safety pipeline refused an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    PromptInjection,
    HarmfulContent,
    Manipulation,
    Profanity,
    SensitiveTopic,
    ContentPolicy,
}

impl BlockReason {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockReason::PromptInjection => "prompt_injection",
            BlockReason::HarmfulContent => "harmful_content",
            BlockReason::Manipulation => "manipulation",
            BlockReason::Profanity => "profanity",
            BlockReason::SensitiveTopic => "sensitive_topic",
            BlockReason::ContentPolicy => "content_policy",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error taxonomy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Input refused by a safety layer.
    #[error("input blocked: {reason:?}")]
    ValidationBlocked {
        reason: BlockReason,
        errors: Vec<String>,
    },

    /// Input failed a non-safety shape or length check.
    #[error("input rejected: {}", errors.join("; "))]
    ValidationRejected { errors: Vec<String> },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session expired: {0}")]
    SessionExpired(String),

    /// Decryption or deserialization of a stored record failed.
    #[error("session corrupted: {0}")]
    SessionCorrupted(String),

    #[error("budget denied: {reason}")]
    BudgetDenied { reason: String },

    #[error("budget exhausted: {reason}")]
    BudgetExhausted { reason: String },

    /// Programmer error: the sequencer was driven with an action its
    /// current state does not permit.
    #[error("illegal transition: {action} from {from}")]
    IllegalTransition { from: String, action: String },

    /// Programmer error: a recorded turn's speaker does not match the
    /// scheduled turn's speaker.
    #[error("speaker mismatch: expected {expected:?}, got {got:?}")]
    SpeakerMismatch { expected: Speaker, got: Speaker },

    #[error("debate already running: {0}")]
    AlreadyRunning(String),

    #[error("no current turn for debate {0}")]
    NoCurrentTurn(String),

    #[error("crypto: {0}")]
    Crypto(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error should be treated as absent-record on read.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::SessionNotFound(_) | Error::SessionExpired(_) | Error::SessionCorrupted(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
