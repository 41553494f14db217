//! Multi-layer input safety: pattern screen, external moderation,
//! embedding-based semantic filter, and the context-aware sanitizer.

pub mod moderation;
pub mod patterns;
pub mod pipeline;
pub mod sanitize;
pub mod semantic;

pub use pipeline::{SafetyPipeline, SanitizedDebateSpec};
pub use sanitize::{sanitize, SanitizeContext, Sanitized};
