//! Anthropic-native adapter.
//!
//! Implements the Messages API for moderator and judge generations:
//! system prompt in the top-level `system` field, streaming over SSE
//! with `content_block_delta` text deltas and usage split across
//! `message_start` / `message_delta` events.

use da_domain::error::{ProviderError, ProviderErrorKind, ProviderType, Result};
use da_domain::stream::{BoxStream, FinishReason, StreamChunk, Usage};
use serde_json::Value;

use crate::classify::{from_http_status, from_reqwest};
use crate::openai_compat::parse_retry_after_header;
use crate::traits::{DebateProvider, GenerateParams, GenerateResult, ProviderInfo};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const REQUEST_TIMEOUT_SECS: u64 = 120;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Adapter for the Anthropic Messages API.
pub struct AnthropicProvider {
    info: ProviderInfo,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest client construction cannot fail with static options");

        Self {
            info: ProviderInfo {
                provider: ProviderType::Anthropic,
                model: DEFAULT_MODEL.to_string(),
                display_name: "Claude".to_string(),
            },
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_key,
            client,
        }
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::new(
                ProviderType::Anthropic,
                ProviderErrorKind::AuthError,
                "no API key configured",
            )
            .into()
        })
    }

    fn authed_post(&self, url: &str) -> Result<reqwest::RequestBuilder> {
        Ok(self
            .client
            .post(url)
            .header("x-api-key", self.key()?)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json"))
    }

    fn build_messages_body(&self, params: &GenerateParams, stream: bool) -> Value {
        serde_json::json!({
            "model": self.info.model,
            "system": params.system_prompt,
            "messages": [
                { "role": "user", "content": params.user_prompt },
            ],
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "stream": stream,
        })
    }

    async fn send_checked(&self, body: &Value) -> Result<reqwest::Response> {
        let url = format!("{}/v1/messages", self.base_url);
        let resp = self
            .authed_post(&url)?
            .json(body)
            .send()
            .await
            .map_err(|e| from_reqwest(ProviderType::Anthropic, e))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after_header(&resp);
            let text = resp
                .text()
                .await
                .map_err(|e| from_reqwest(ProviderType::Anthropic, e))?;
            return Err(from_http_status(
                ProviderType::Anthropic,
                status.as_u16(),
                &text,
                retry_after,
            )
            .into());
        }
        Ok(resp)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn map_stop_reason(raw: &str) -> FinishReason {
    match raw {
        "max_tokens" => FinishReason::MaxTokens,
        _ => FinishReason::Stop,
    }
}

fn parse_usage(v: &Value) -> Option<Usage> {
    let input = v.get("input_tokens")?.as_u64()?;
    let output = v.get("output_tokens")?.as_u64()?;
    Some(Usage::new(input, output))
}

fn parse_messages_response(body: &Value) -> Result<GenerateResult> {
    let content = body
        .get("content")
        .and_then(|c| c.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| {
                    (b.get("type").and_then(|t| t.as_str()) == Some("text"))
                        .then(|| b.get("text").and_then(|t| t.as_str()))
                        .flatten()
                })
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let finish_reason = body
        .get("stop_reason")
        .and_then(|v| v.as_str())
        .map(map_stop_reason)
        .unwrap_or(FinishReason::Stop);

    let usage = body
        .get("usage")
        .and_then(parse_usage)
        .unwrap_or_else(|| Usage::new(0, crate::tokens::estimate_tokens(&content) as u64));

    Ok(GenerateResult {
        content,
        usage,
        finish_reason,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming parser
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Usage and stop-reason assembly across Anthropic stream events.
#[derive(Default)]
struct StreamState {
    input_tokens: u64,
    done_emitted: bool,
}

fn parse_stream_payload(data: &str, state: &mut StreamState) -> Vec<Result<StreamChunk>> {
    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![Err(e.into())],
    };

    match v.get("type").and_then(|t| t.as_str()).unwrap_or("") {
        "message_start" => {
            if let Some(usage) = v
                .get("message")
                .and_then(|m| m.get("usage"))
                .and_then(|u| u.get("input_tokens"))
                .and_then(|t| t.as_u64())
            {
                state.input_tokens = usage;
            }
            Vec::new()
        }

        "content_block_delta" => {
            let text = v
                .get("delta")
                .filter(|d| d.get("type").and_then(|t| t.as_str()) == Some("text_delta"))
                .and_then(|d| d.get("text"))
                .and_then(|t| t.as_str())
                .unwrap_or("");
            if text.is_empty() {
                Vec::new()
            } else {
                vec![Ok(StreamChunk::Delta {
                    text: text.to_string(),
                })]
            }
        }

        "message_delta" => {
            let output = v
                .get("usage")
                .and_then(|u| u.get("output_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0);
            let stop = v
                .get("delta")
                .and_then(|d| d.get("stop_reason"))
                .and_then(|s| s.as_str());
            match stop {
                Some(reason) => {
                    state.done_emitted = true;
                    vec![Ok(StreamChunk::Done {
                        finish_reason: map_stop_reason(reason),
                        usage: Some(Usage::new(state.input_tokens, output)),
                    })]
                }
                None => Vec::new(),
            }
        }

        "message_stop" => {
            if state.done_emitted {
                Vec::new()
            } else {
                state.done_emitted = true;
                vec![Ok(StreamChunk::Done {
                    finish_reason: FinishReason::Stop,
                    usage: Some(Usage::new(state.input_tokens, 0)),
                })]
            }
        }

        "error" => {
            let message = v
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown stream error");
            vec![Err(ProviderError::new(
                ProviderType::Anthropic,
                ProviderErrorKind::ServerError,
                message,
            )
            .into())]
        }

        // ping and anything unrecognized.
        _ => Vec::new(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl DebateProvider for AnthropicProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, params: &GenerateParams) -> Result<GenerateResult> {
        let body = self.build_messages_body(params, false);

        tracing::debug!(provider = "anthropic", model = %self.info.model, "messages request");

        let resp = self.send_checked(&body).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| from_reqwest(ProviderType::Anthropic, e))?;
        let json: Value = serde_json::from_str(&text)?;
        parse_messages_response(&json)
    }

    async fn generate_stream(
        &self,
        params: &GenerateParams,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let body = self.build_messages_body(params, true);

        tracing::debug!(provider = "anthropic", model = %self.info.model, "stream request");

        let resp = self.send_checked(&body).await?;
        let mut state = StreamState::default();
        Ok(crate::sse::chunk_stream(
            ProviderType::Anthropic,
            resp,
            move |data| parse_stream_payload(data, &mut state),
        ))
    }

    async fn check_health(&self) -> Result<()> {
        // A minimal one-token request; Anthropic has no cheap list
        // endpoint usable with API keys alone.
        let body = serde_json::json!({
            "model": self.info.model,
            "max_tokens": 1,
            "messages": [{ "role": "user", "content": "ping" }],
        });
        self.send_checked(&body).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_places_system_at_top_level() {
        let provider = AnthropicProvider::new(Some("key".into()));
        let body = provider.build_messages_body(
            &GenerateParams {
                system_prompt: "neutral moderator".into(),
                user_prompt: "introduce the debate".into(),
                max_tokens: 400,
                temperature: 0.7,
            },
            false,
        );
        assert_eq!(body["system"], "neutral moderator");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 400);
    }

    #[test]
    fn parses_text_blocks_and_stop_reason() {
        let body = serde_json::json!({
            "content": [
                { "type": "text", "text": "Welcome " },
                { "type": "text", "text": "everyone." },
            ],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 20, "output_tokens": 4 },
        });
        let result = parse_messages_response(&body).unwrap();
        assert_eq!(result.content, "Welcome everyone.");
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert_eq!(result.usage.input_tokens, 20);
    }

    #[test]
    fn stream_assembles_usage_across_events() {
        let mut state = StreamState::default();

        let start = r#"{"type":"message_start","message":{"usage":{"input_tokens":30,"output_tokens":0}}}"#;
        assert!(parse_stream_payload(start, &mut state).is_empty());

        let delta = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        let chunks = parse_stream_payload(delta, &mut state);
        assert!(matches!(
            chunks.as_slice(),
            [Ok(StreamChunk::Delta { text })] if text == "Hi"
        ));

        let done = r#"{"type":"message_delta","delta":{"stop_reason":"max_tokens"},"usage":{"output_tokens":9}}"#;
        match parse_stream_payload(done, &mut state).as_slice() {
            [Ok(StreamChunk::Done {
                finish_reason,
                usage: Some(u),
            })] => {
                assert_eq!(*finish_reason, FinishReason::MaxTokens);
                assert_eq!(u.input_tokens, 30);
                assert_eq!(u.output_tokens, 9);
            }
            other => panic!("unexpected chunks: {other:?}"),
        }

        // message_stop after an emitted Done is silent.
        let stop = r#"{"type":"message_stop"}"#;
        assert!(parse_stream_payload(stop, &mut state).is_empty());
    }

    #[test]
    fn stream_error_event_surfaces_as_error() {
        let mut state = StreamState::default();
        let payload = r#"{"type":"error","error":{"message":"overloaded"}}"#;
        let chunks = parse_stream_payload(payload, &mut state);
        assert!(matches!(chunks.as_slice(), [Err(_)]));
    }

    #[test]
    fn ping_events_are_ignored() {
        let mut state = StreamState::default();
        assert!(parse_stream_payload(r#"{"type":"ping"}"#, &mut state).is_empty());
    }
}
