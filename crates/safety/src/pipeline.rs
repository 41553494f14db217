//! The full input-safety pipeline for debate creation.
//!
//! Three layers run strictly in order over the ORIGINAL input —
//! pattern screen, external moderation, semantic filter — each
//! short-circuiting on a block. Only after all three pass does the
//! sanitizer run. Shape failures (turn counts, lengths, rule counts)
//! are rejections, not safety blocks.

use da_domain::config::SafetyConfig;
use da_domain::error::{BlockReason, Error, Result};

use crate::moderation::ModerationClient;
use crate::patterns;
use crate::sanitize::{sanitize, SanitizeContext};
use crate::semantic::SemanticFilter;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation limits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const TOPIC_MIN_LEN: usize = 10;
pub const TOPIC_MAX_LEN: usize = 500;
pub const MAX_CUSTOM_RULES: usize = 5;
pub const RULE_MIN_LEN: usize = 5;
pub const RULE_MAX_LEN: usize = 200;
pub const VALID_TURN_COUNTS: [u8; 5] = [2, 4, 6, 8, 10];

/// The validated, sanitized output of the pipeline.
#[derive(Debug, Clone)]
pub struct SanitizedDebateSpec {
    pub topic: String,
    pub custom_rules: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SafetyPipeline {
    config: SafetyConfig,
    moderation: Option<ModerationClient>,
    semantic: Option<SemanticFilter>,
}

impl SafetyPipeline {
    pub fn new(
        config: SafetyConfig,
        moderation: Option<ModerationClient>,
        semantic: Option<SemanticFilter>,
    ) -> Self {
        Self {
            config,
            moderation,
            semantic,
        }
    }

    /// Pipeline with every layer off; shape validation still applies.
    pub fn disabled() -> Self {
        Self {
            config: SafetyConfig {
                patterns_enabled: false,
                moderation_enabled: false,
                semantic_enabled: false,
                strict_mode: false,
            },
            moderation: None,
            semantic: None,
        }
    }

    /// Validate and sanitize a debate-creation request.
    ///
    /// Fails with [`Error::ValidationBlocked`] for safety refusals and
    /// [`Error::ValidationRejected`] for shape failures. On success no
    /// original (unsanitized) text survives into the returned spec.
    pub async fn validate_create(
        &self,
        topic: &str,
        turns: u8,
        custom_rules: &[String],
    ) -> Result<SanitizedDebateSpec> {
        // Shape checks that need no safety verdict.
        let mut shape_errors = Vec::new();
        if !VALID_TURN_COUNTS.contains(&turns) {
            shape_errors.push(format!(
                "turn count must be one of {VALID_TURN_COUNTS:?}, got {turns}"
            ));
        }
        if custom_rules.len() > MAX_CUSTOM_RULES {
            shape_errors.push(format!(
                "at most {MAX_CUSTOM_RULES} custom rules allowed, got {}",
                custom_rules.len()
            ));
        }
        if !shape_errors.is_empty() {
            return Err(Error::ValidationRejected {
                errors: shape_errors,
            });
        }

        // Safety layers over the original inputs.
        let screened_topic = self.check_text(topic).await?;
        let mut screened_rules = Vec::with_capacity(custom_rules.len());
        for rule in custom_rules {
            screened_rules.push(self.check_text(rule).await?);
        }

        // Sanitize, then apply post-sanitization length bounds.
        let topic = sanitize(&screened_topic, SanitizeContext::Storage).value;
        let topic_len = topic.trim().chars().count();
        let mut errors = Vec::new();
        if !(TOPIC_MIN_LEN..=TOPIC_MAX_LEN).contains(&topic_len) {
            errors.push(format!(
                "topic must be {TOPIC_MIN_LEN}–{TOPIC_MAX_LEN} characters after sanitization, \
                 got {topic_len}"
            ));
        }

        let mut rules = Vec::with_capacity(screened_rules.len());
        for (i, rule) in screened_rules.iter().enumerate() {
            let clean = sanitize(rule, SanitizeContext::Storage).value;
            let len = clean.trim().chars().count();
            if !(RULE_MIN_LEN..=RULE_MAX_LEN).contains(&len) {
                errors.push(format!(
                    "custom rule {} must be {RULE_MIN_LEN}–{RULE_MAX_LEN} characters, got {len}",
                    i + 1
                ));
            }
            rules.push(clean.trim().to_string());
        }

        if !errors.is_empty() {
            return Err(Error::ValidationRejected { errors });
        }

        Ok(SanitizedDebateSpec {
            topic: topic.trim().to_string(),
            custom_rules: rules,
        })
    }

    /// Run the three safety layers over one original input.
    ///
    /// Returns the input to carry forward (masked when the pattern
    /// screen masked profanity). An outage in an external layer
    /// degrades that layer to a pass-through; only a definite flag
    /// blocks.
    async fn check_text(&self, input: &str) -> Result<String> {
        let mut carried = input.to_string();

        // 1. Pattern screen.
        if self.config.patterns_enabled {
            let result = patterns::screen(input, self.config.strict_mode);
            if result.should_block {
                return Err(blocked(
                    result.block_reason.unwrap_or(BlockReason::ContentPolicy),
                    result
                        .findings
                        .iter()
                        .map(|f| format!("pattern {} matched", f.name))
                        .collect(),
                ));
            }
            if let Some(masked) = result.masked {
                carried = masked;
            }
        }

        // 2. External moderation.
        if self.config.moderation_enabled {
            if let Some(client) = &self.moderation {
                match client.check(input).await {
                    Ok(verdict) if verdict.flagged => {
                        let (category, score) =
                            verdict.category.unwrap_or_default();
                        return Err(blocked(
                            verdict.reason.unwrap_or(BlockReason::ContentPolicy),
                            vec![format!(
                                "moderation flagged category {category} at {score:.2}"
                            )],
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "moderation layer unavailable, passing through");
                    }
                }
            }
        }

        // 3. Semantic filter.
        if self.config.semantic_enabled {
            if let Some(filter) = &self.semantic {
                match filter.check(input).await {
                    Ok(verdict) if verdict.flagged => {
                        return Err(blocked(
                            verdict.reason.unwrap_or(BlockReason::ContentPolicy),
                            vec![format!(
                                "semantically similar to {} ({:.2})",
                                verdict.matched_concept.unwrap_or("reference concept"),
                                verdict.similarity
                            )],
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "semantic layer unavailable, passing through");
                    }
                }
            }
        }

        Ok(carried)
    }
}

fn blocked(reason: BlockReason, errors: Vec<String>) -> Error {
    Error::ValidationBlocked { reason, errors }
}
