//! Layer two: the external moderation call-out.
//!
//! Sends the original input to the OpenAI moderation endpoint and
//! applies thresholds stricter than the vendor defaults. Without a
//! credential the layer silently degrades to a pass-through.

use serde_json::Value;

use da_domain::error::{BlockReason, Error, Result};

const MODERATION_URL: &str = "https://api.openai.com/v1/moderations";
const MODERATION_MODEL: &str = "omni-moderation-latest";
const REQUEST_TIMEOUT_SECS: u64 = 10;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Thresholds
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Custom per-category score threshold, stricter than vendor defaults.
fn threshold_for(category: &str) -> f64 {
    match category {
        c if c.starts_with("sexual/minors") => 0.1,
        c if c.starts_with("self-harm") => 0.3,
        c if c.starts_with("violence") => 0.5,
        c if c.starts_with("hate") => 0.5,
        c if c.starts_with("sexual") => 0.6,
        c if c.starts_with("harassment") => 0.6,
        _ => 0.7,
    }
}

/// Map a flagged vendor category onto a block reason.
fn reason_for(category: &str) -> BlockReason {
    match category {
        c if c.starts_with("violence") || c.starts_with("hate") || c.starts_with("harassment") => {
            BlockReason::HarmfulContent
        }
        c if c.starts_with("sexual") || c.starts_with("self-harm") => BlockReason::SensitiveTopic,
        _ => BlockReason::ContentPolicy,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Verdict from the moderation layer.
#[derive(Debug, Clone)]
pub struct ModerationVerdict {
    pub flagged: bool,
    pub reason: Option<BlockReason>,
    /// Category that tripped, with its score.
    pub category: Option<(String, f64)>,
}

impl ModerationVerdict {
    fn pass() -> Self {
        Self {
            flagged: false,
            reason: None,
            category: None,
        }
    }
}

pub struct ModerationClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl ModerationClient {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self { client, api_key }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Check one input. Pass-through when no credential is configured.
    pub async fn check(&self, input: &str) -> Result<ModerationVerdict> {
        let Some(key) = self.api_key.as_deref() else {
            tracing::debug!("moderation layer has no credential, passing through");
            return Ok(ModerationVerdict::pass());
        };

        let body = serde_json::json!({
            "model": MODERATION_MODEL,
            "input": input,
        });

        let resp = self
            .client
            .post(MODERATION_URL)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Http(format!(
                "moderation endpoint returned {status}: {text}"
            )));
        }

        let json: Value = serde_json::from_str(&text)?;
        Ok(evaluate_response(&json))
    }
}

/// Apply the custom thresholds to a moderation response.
fn evaluate_response(json: &Value) -> ModerationVerdict {
    let Some(result) = json
        .get("results")
        .and_then(|r| r.as_array())
        .and_then(|a| a.first())
    else {
        return ModerationVerdict::pass();
    };

    let scores = result
        .get("category_scores")
        .and_then(|s| s.as_object())
        .cloned()
        .unwrap_or_default();

    // Worst offender above its custom threshold wins.
    let mut tripped: Option<(String, f64)> = None;
    for (category, score) in &scores {
        let score = score.as_f64().unwrap_or(0.0);
        if score >= threshold_for(category)
            && tripped.as_ref().map(|(_, s)| score > *s).unwrap_or(true)
        {
            tripped = Some((category.clone(), score));
        }
    }

    match tripped {
        Some((category, score)) => {
            tracing::warn!(category = %category, score, "moderation layer flagged input");
            let reason = reason_for(&category);
            ModerationVerdict {
                flagged: true,
                reason: Some(reason),
                category: Some((category, score)),
            }
        }
        None => ModerationVerdict::pass(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_credential_passes_through() {
        let client = ModerationClient::new(None);
        let verdict = client.check("anything at all").await.unwrap();
        assert!(!verdict.flagged);
    }

    #[test]
    fn thresholds_are_stricter_for_minors() {
        assert!(threshold_for("sexual/minors") < threshold_for("sexual"));
        assert!(threshold_for("violence") <= 0.5);
        assert!(threshold_for("hate/threatening") <= 0.5);
    }

    #[test]
    fn evaluate_flags_above_threshold() {
        let json = serde_json::json!({
            "results": [{
                "flagged": true,
                "category_scores": {
                    "violence": 0.62,
                    "sexual": 0.01,
                }
            }]
        });
        let verdict = evaluate_response(&json);
        assert!(verdict.flagged);
        assert_eq!(verdict.reason, Some(BlockReason::HarmfulContent));
        assert_eq!(verdict.category.unwrap().0, "violence");
    }

    #[test]
    fn evaluate_passes_below_thresholds() {
        let json = serde_json::json!({
            "results": [{
                "flagged": false,
                "category_scores": {
                    "violence": 0.2,
                    "sexual": 0.1,
                    "harassment": 0.3,
                }
            }]
        });
        assert!(!evaluate_response(&json).flagged);
    }

    #[test]
    fn minors_category_trips_at_low_score() {
        let json = serde_json::json!({
            "results": [{
                "category_scores": { "sexual/minors": 0.15 }
            }]
        });
        let verdict = evaluate_response(&json);
        assert!(verdict.flagged);
        assert_eq!(verdict.reason, Some(BlockReason::SensitiveTopic));
    }

    #[test]
    fn empty_results_pass() {
        assert!(!evaluate_response(&serde_json::json!({"results": []})).flagged);
        assert!(!evaluate_response(&serde_json::json!({})).flagged);
    }
}
