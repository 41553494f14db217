//! Mid-debate violation scanning.
//!
//! After each debater turn the content gets a non-blocking pattern
//! screen; findings at medium severity or above become a violation
//! record that triggers a moderator intervention. This never blocks or
//! rewrites the turn itself.

use da_domain::turn::{Turn, Violation, ViolationSeverity};
use da_safety::patterns::{self, PatternSeverity};

fn map_severity(severity: PatternSeverity) -> ViolationSeverity {
    match severity {
        PatternSeverity::Low => ViolationSeverity::Minor,
        PatternSeverity::Medium => ViolationSeverity::Moderate,
        PatternSeverity::High => ViolationSeverity::Moderate,
        PatternSeverity::Critical => ViolationSeverity::Severe,
    }
}

/// Scan a completed debater turn for content violations.
///
/// Returns the worst finding at medium severity or above, mapped into
/// a violation record for the intervention compiler.
pub fn scan(turn: &Turn) -> Option<Violation> {
    if !turn.speaker.is_debater() {
        return None;
    }

    let result = patterns::screen(&turn.content, false);
    let worst = result
        .findings
        .iter()
        .filter(|f| f.severity >= PatternSeverity::Medium)
        .max_by_key(|f| f.severity)?;

    Some(Violation {
        rule: worst.name.to_string(),
        severity: map_severity(worst.severity),
        detail: format!("matched \"{}\"", worst.matched),
    })
}
