//! Token estimation.
//!
//! No vendor tokenizer is linked, so counts are the byte heuristic
//! `ceil(bytes / 4)`. Estimates feed budget admission and rate-limiter
//! reservations; actual usage from the vendor response replaces them
//! after each call.

/// Bytes-per-token divisor for the fallback estimator.
const BYTES_PER_TOKEN: usize = 4;

/// Fixed overhead added per message for role/wrapping tokens.
pub const MESSAGE_OVERHEAD_TOKENS: u32 = 4;

/// Estimate the token count of a raw string: `ceil(bytes / 4)`.
pub fn estimate_tokens(text: &str) -> u32 {
    text.len().div_ceil(BYTES_PER_TOKEN) as u32
}

/// Estimate a system + user prompt pair, with per-message overhead.
pub fn estimate_message_tokens(system: &str, user: &str) -> u32 {
    estimate_tokens(system) + estimate_tokens(user) + 2 * MESSAGE_OVERHEAD_TOKENS
}
