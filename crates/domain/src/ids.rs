//! Debate IDs and share codes.
//!
//! Debate IDs are `db_` plus 16 base64url characters minted from 12
//! cryptographically random bytes. Share codes come from an unambiguous
//! alphabet (no `0`, `O`, `I`, `l`, `1`) and are 6–12 characters long.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use regex::Regex;
use std::sync::OnceLock;

/// Number of random bytes behind a debate ID (16 base64url chars).
const DEBATE_ID_BYTES: usize = 12;

/// Characters allowed in a share code. Omits visually ambiguous glyphs.
pub const SHARE_ALPHABET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

pub const SHARE_CODE_MIN_LEN: usize = 6;
pub const SHARE_CODE_MAX_LEN: usize = 12;

/// Default length for freshly minted share codes.
pub const SHARE_CODE_DEFAULT_LEN: usize = 8;

fn debate_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^db_[A-Za-z0-9_-]{16}$").expect("static regex"))
}

/// Mint a fresh debate ID.
pub fn generate_debate_id() -> String {
    let mut bytes = [0u8; DEBATE_ID_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("db_{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Validate a debate ID against `^db_[A-Za-z0-9_-]{16}$`.
pub fn is_valid_debate_id(id: &str) -> bool {
    debate_id_re().is_match(id)
}

/// Mint a share code of the given length (clamped to the valid range).
pub fn generate_share_code(len: usize) -> String {
    let len = len.clamp(SHARE_CODE_MIN_LEN, SHARE_CODE_MAX_LEN);
    let mut rng = rand::rngs::OsRng;
    (0..len)
        .map(|_| {
            let idx = (rng.next_u32() as usize) % SHARE_ALPHABET.len();
            SHARE_ALPHABET[idx] as char
        })
        .collect()
}

/// Validate a share code: length 6–12, every character in the alphabet.
pub fn is_valid_share_code(code: &str) -> bool {
    (SHARE_CODE_MIN_LEN..=SHARE_CODE_MAX_LEN).contains(&code.len())
        && code.bytes().all(|b| SHARE_ALPHABET.contains(&b))
}
