//! The judge analyzer.
//!
//! After a debate completes, the moderator model is asked for a strict
//! JSON evaluation of both sides against a fixed rubric. Model output
//! is parsed defensively: fences stripped, the first balanced object
//! extracted, missing fields defaulted, and scores clamped to their
//! category caps.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use da_domain::session::DebateSession;
use da_domain::turn::{Turn, TurnType};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rubric
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// (category key, maximum score). Totals cap at 100 per side.
pub const RUBRIC: [(&str, f64); 5] = [
    ("argument_quality", 25.0),
    ("evidence_use", 20.0),
    ("rebuttal_effectiveness", 20.0),
    ("clarity_organization", 20.0),
    ("rule_adherence", 15.0),
];

pub const JUDGE_MAX_TOKENS: u32 = 2_000;
pub const JUDGE_TEMPERATURE: f32 = 0.3;

const DISCLAIMER: &str = "This is an AI-generated evaluation of argument craft, not a \
verdict on the underlying truth of the topic.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Result types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: f64,
    pub max_score: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideEvaluation {
    /// Keyed by rubric category.
    pub scores: HashMap<String, CategoryScore>,
    pub total: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeAnalysis {
    pub debate_id: String,
    pub for_side: SideEvaluation,
    pub against_side: SideEvaluation,
    pub clash_points: Vec<String>,
    pub turning_moments: Vec<String>,
    pub disclaimer: String,
    pub generated_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompt
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the (system, user) prompt pair for the judge call.
///
/// Runs post-completion only, so the model assignment is revealed in
/// the transcript headings.
pub fn build_judge_prompt(session: &DebateSession, turns: &[Turn]) -> (String, String) {
    let system = "You are an impartial debate judge. You evaluate argument craft only — \
        never which side of the topic is actually right. You respond with a single strict \
        JSON object and nothing else: no prose, no code fences."
        .to_string();

    let for_model = session.assignment.for_position.display_name();
    let against_model = session.assignment.against_position.display_name();

    let transcript = turns
        .iter()
        .filter(|t| {
            t.speaker.is_debater() || t.config.turn_type == TurnType::ModeratorIntervention
        })
        .map(|t| {
            let heading = match t.config.turn_type {
                TurnType::ModeratorIntervention => "MODERATOR INTERVENTION".to_string(),
                _ => {
                    let model = match t.speaker {
                        da_domain::turn::Speaker::For => for_model,
                        _ => against_model,
                    };
                    format!("{} ({model}) — {}", t.speaker.as_str().to_uppercase(), t.config.label)
                }
            };
            format!("[{heading}]\n{}\n", t.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let rubric_lines = RUBRIC
        .iter()
        .map(|(key, max)| format!("  - {key}: 0 to {max}"))
        .collect::<Vec<_>>()
        .join("\n");

    let rules = if session.custom_rules.is_empty() {
        "none".to_string()
    } else {
        session.custom_rules.join("; ")
    };

    let user = format!(
        "Evaluate this completed debate.\n\n\
         Topic: {topic}\n\
         Format: {format}\n\
         FOR was argued by {for_model}; AGAINST was argued by {against_model}.\n\
         Custom rules: {rules}\n\n\
         Transcript:\n{transcript}\n\
         Score each side on this rubric (maximum 100 per side):\n{rubric_lines}\n\n\
         Respond with exactly this JSON shape:\n\
         {{\n\
           \"for\": {{ \"scores\": {{ \"<category>\": {{ \"score\": <number>, \"rationale\": \"...\" }} }}, \
           \"strengths\": [\"...\"], \"weaknesses\": [\"...\"] }},\n\
           \"against\": {{ ... same shape ... }},\n\
           \"clash_points\": [\"...\"],\n\
           \"turning_moments\": [\"...\"],\n\
           \"disclaimer\": \"...\"\n\
         }}",
        topic = session.topic,
        format = session.format.as_str(),
    );

    (system, user)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Defensive parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Strip surrounding markdown code fences, if present.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}

/// Extract the first balanced `{...}` object, string-aware.
fn first_balanced_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Coerce one side's evaluation out of the raw JSON, defaulting and
/// clamping as needed.
fn parse_side(value: Option<&Value>) -> SideEvaluation {
    let scores_value = value.and_then(|v| v.get("scores"));

    let mut scores = HashMap::new();
    let mut total = 0.0;
    for (key, max) in RUBRIC {
        let entry = scores_value.and_then(|s| s.get(key));
        // Accept both {"score": n, "rationale": "..."} and a bare number.
        let raw_score = entry
            .and_then(|e| e.get("score").or(Some(e)))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let score = raw_score.clamp(0.0, max);
        let rationale = entry
            .and_then(|e| e.get("rationale"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        total += score;
        scores.insert(
            key.to_string(),
            CategoryScore {
                score,
                max_score: max,
                rationale,
            },
        );
    }

    SideEvaluation {
        scores,
        total,
        strengths: string_list(value.and_then(|v| v.get("strengths"))),
        weaknesses: string_list(value.and_then(|v| v.get("weaknesses"))),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a judge response into an analysis, never failing: unusable
/// output degrades to zeroed scores with the standard disclaimer.
pub fn parse_judge_response(debate_id: &str, raw: &str) -> JudgeAnalysis {
    let cleaned = strip_fences(raw);
    let object = first_balanced_object(cleaned).unwrap_or("{}");
    let value: Value = serde_json::from_str(object).unwrap_or_else(|e| {
        tracing::warn!(debate_id, error = %e, "judge output was not valid JSON");
        Value::Object(Default::default())
    });

    let disclaimer = value
        .get("disclaimer")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DISCLAIMER)
        .to_string();

    JudgeAnalysis {
        debate_id: debate_id.to_string(),
        for_side: parse_side(value.get("for")),
        against_side: parse_side(value.get("against")),
        clash_points: string_list(value.get("clash_points")),
        turning_moments: string_list(value.get("turning_moments")),
        disclaimer,
        generated_at: Utc::now(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cache
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-debate analysis cache; a force flag at the call site bypasses it.
#[derive(Default)]
pub struct JudgeCache {
    entries: RwLock<HashMap<String, Arc<JudgeAnalysis>>>,
}

impl JudgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, debate_id: &str) -> Option<Arc<JudgeAnalysis>> {
        self.entries.read().get(debate_id).cloned()
    }

    pub fn insert(&self, analysis: JudgeAnalysis) -> Arc<JudgeAnalysis> {
        let arc = Arc::new(analysis);
        self.entries
            .write()
            .insert(arc.debate_id.clone(), arc.clone());
        arc
    }

    pub fn invalidate(&self, debate_id: &str) {
        self.entries.write().remove(debate_id);
    }
}
