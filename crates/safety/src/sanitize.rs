//! Context-aware sanitization.
//!
//! Runs after the safety layers pass. Each context has its own
//! transformation set and maximum length; the caller learns whether
//! anything was changed via the `modified` flag.

use std::sync::OnceLock;

use regex::Regex;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Contexts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeContext {
    /// Persisted values: HTML stripped, control characters dropped.
    Storage,
    /// Values embedded in prompts: as storage, plus injection-pattern
    /// neutralization.
    Llm,
    /// Values echoed to clients: HTML-escaped.
    Display,
}

impl SanitizeContext {
    fn max_len(self) -> usize {
        match self {
            SanitizeContext::Storage => 10_000,
            SanitizeContext::Llm => 8_000,
            SanitizeContext::Display => 20_000,
        }
    }
}

/// A sanitized value plus whether sanitization changed anything.
#[derive(Debug, Clone)]
pub struct Sanitized {
    pub value: String,
    pub modified: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Neutralization catalogue (LLM context)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const NEUTRALIZED: &str = "[filtered]";

fn injection_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Instruction overrides.
            r"(?i)(ignore|disregard|forget)\s+(all\s+|any\s+)?(previous|prior|above)\s+\w+",
            // Role-swap prefixes at line starts.
            r"(?im)^\s*(system|assistant|user)\s*:",
            // Chat template + instruction markers.
            r"(?i)(<\|im_(start|end)\|>|\[/?INST\]|<<SYS>>|\[/?SYSTEM\])",
            // Template expansion.
            r"\{\{[^}]*\}\}",
            r"\$\{[^}]*\}",
            // Encoded payload smuggling.
            r"(?i)data:[a-z]+/[a-z0-9.+-]+;base64,[A-Za-z0-9+/=]{16,}",
            r"(?i)\b(decode|execute)\s+(this\s+)?base64\b",
        ]
        .iter()
        .map(|re| Regex::new(re).expect("static sanitizer pattern"))
        .collect()
    })
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sanitizer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Sanitize `input` for the given context.
pub fn sanitize(input: &str, ctx: SanitizeContext) -> Sanitized {
    let mut value = normalize_line_endings(input);

    match ctx {
        SanitizeContext::Storage => {
            value = strip_html(&value);
            value = strip_control_chars(&value);
        }
        SanitizeContext::Llm => {
            value = strip_html(&value);
            value = strip_control_chars(&value);
            for re in injection_patterns() {
                value = re.replace_all(&value, NEUTRALIZED).into_owned();
            }
        }
        SanitizeContext::Display => {
            value = strip_control_chars(&value);
            value = escape_html(&value);
        }
    }

    let max = ctx.max_len();
    if value.chars().count() > max {
        value = value.chars().take(max).collect();
    }

    Sanitized {
        modified: value != input,
        value,
    }
}

/// CRLF and bare CR become LF; NUL bytes are dropped outright.
fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n").replace('\0', "")
}

/// Drop control characters except LF.
fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c == '\n' || !c.is_control())
        .collect()
}

fn strip_html(input: &str) -> String {
    html_tag_re().replace_all(input, "").into_owned()
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
