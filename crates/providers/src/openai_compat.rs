//! OpenAI-compatible adapter.
//!
//! Covers both debater vendors that follow the chat-completions
//! contract: OpenAI itself and xAI, which serves Grok over the same
//! wire format on a different base URL.

use da_domain::error::{
    ProviderError, ProviderErrorKind, ProviderType, Result,
};
use da_domain::stream::{BoxStream, FinishReason, StreamChunk, Usage};
use serde_json::Value;

use crate::classify::{from_http_status, from_reqwest};
use crate::traits::{DebateProvider, Embedder, GenerateParams, GenerateResult, ProviderInfo};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const XAI_BASE_URL: &str = "https://api.x.ai/v1";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o";
const XAI_DEFAULT_MODEL: &str = "grok-3";
const EMBEDDING_MODEL: &str = "text-embedding-3-small";
const REQUEST_TIMEOUT_SECS: u64 = 120;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Adapter for any endpoint following the OpenAI chat-completions
/// contract. Instantiated once per vendor via [`Self::openai`] and
/// [`Self::xai`].
pub struct OpenAiCompatProvider {
    info: ProviderInfo,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn openai(api_key: Option<String>) -> Self {
        Self::new(
            ProviderType::Openai,
            OPENAI_BASE_URL,
            OPENAI_DEFAULT_MODEL,
            "ChatGPT",
            api_key,
        )
    }

    pub fn xai(api_key: Option<String>) -> Self {
        Self::new(
            ProviderType::Xai,
            XAI_BASE_URL,
            XAI_DEFAULT_MODEL,
            "Grok",
            api_key,
        )
    }

    fn new(
        provider: ProviderType,
        base_url: &str,
        model: &str,
        display_name: &str,
        api_key: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest client construction cannot fail with static options");

        Self {
            info: ProviderInfo {
                provider,
                model: model.to_string(),
                display_name: display_name.to_string(),
            },
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::new(
                self.info.provider,
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
            .bearer_auth(self.key()?)
            .header("Content-Type", "application/json"))
    }

    fn build_chat_body(&self, params: &GenerateParams, stream: bool) -> Value {
        let mut body = serde_json::json!({
            "model": self.info.model,
            "messages": [
                { "role": "system", "content": params.system_prompt },
                { "role": "user", "content": params.user_prompt },
            ],
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "stream": stream,
        });
        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        body
    }

    /// Send, check the status, and classify failures.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let resp = self
            .authed_post(url)?
            .json(body)
            .send()
            .await
            .map_err(|e| from_reqwest(self.info.provider, e))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after_header(&resp);
            let text = resp
                .text()
                .await
                .map_err(|e| from_reqwest(self.info.provider, e))?;
            return Err(
                from_http_status(self.info.provider, status.as_u16(), &text, retry_after).into(),
            );
        }

        let text = resp
            .text()
            .await
            .map_err(|e| from_reqwest(self.info.provider, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Read a `Retry-After` header (seconds) into milliseconds.
pub(crate) fn parse_retry_after_header(resp: &reqwest::Response) -> Option<u64> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs * 1_000)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn map_finish_reason(raw: &str) -> FinishReason {
    match raw {
        "length" | "max_tokens" => FinishReason::MaxTokens,
        _ => FinishReason::Stop,
    }
}

fn parse_usage(v: &Value) -> Option<Usage> {
    let input = v.get("prompt_tokens")?.as_u64()?;
    let output = v.get("completion_tokens")?.as_u64()?;
    Some(Usage::new(input, output))
}

fn parse_chat_response(provider: ProviderType, body: &Value) -> Result<GenerateResult> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| {
            ProviderError::new(
                provider,
                ProviderErrorKind::Unknown,
                "no choices in response",
            )
        })?;

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .map(map_finish_reason)
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

/// State carried across stream payloads.
///
/// The vendor reports `finish_reason` and usage in separate trailing
/// chunks; `Done` is emitted once both (or the `[DONE]` sentinel)
/// arrive.
#[derive(Default)]
struct StreamState {
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    done_emitted: bool,
}

fn parse_stream_payload(data: &str, state: &mut StreamState) -> Vec<Result<StreamChunk>> {
    if data.trim() == "[DONE]" {
        if state.done_emitted {
            return Vec::new();
        }
        state.done_emitted = true;
        return vec![Ok(StreamChunk::Done {
            finish_reason: state.finish_reason.unwrap_or(FinishReason::Stop),
            usage: state.usage,
        })];
    }

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![Err(e.into())],
    };

    let choice = v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first());

    // Usage-only trailing chunk (stream_options.include_usage).
    if choice.is_none() {
        if let Some(usage) = v.get("usage").and_then(parse_usage) {
            state.usage = Some(usage);
        }
        return Vec::new();
    }
    let choice = choice.expect("checked above");

    if let Some(fr) = choice.get("finish_reason").and_then(|f| f.as_str()) {
        state.finish_reason = Some(map_finish_reason(fr));
        if let Some(usage) = v.get("usage").and_then(parse_usage) {
            state.usage = Some(usage);
        }
        return Vec::new();
    }

    let text = choice
        .get("delta")
        .and_then(|d| d.get("content"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if text.is_empty() {
        return Vec::new();
    }

    vec![Ok(StreamChunk::Delta {
        text: text.to_string(),
    })]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl DebateProvider for OpenAiCompatProvider {
    fn provider_type(&self) -> ProviderType {
        self.info.provider
    }

    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, params: &GenerateParams) -> Result<GenerateResult> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(params, false);

        tracing::debug!(provider = %self.info.provider, model = %self.info.model, "chat request");

        let resp = self.post_json(&url, &body).await?;
        parse_chat_response(self.info.provider, &resp)
    }

    async fn generate_stream(
        &self,
        params: &GenerateParams,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(params, true);
        let provider = self.info.provider;

        tracing::debug!(provider = %provider, model = %self.info.model, "stream request");

        let resp = self
            .authed_post(&url)?
            .json(&body)
            .send()
            .await
            .map_err(|e| from_reqwest(provider, e))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after_header(&resp);
            let text = resp.text().await.map_err(|e| from_reqwest(provider, e))?;
            return Err(from_http_status(provider, status.as_u16(), &text, retry_after).into());
        }

        let mut state = StreamState::default();
        Ok(crate::sse::chunk_stream(provider, resp, move |data| {
            parse_stream_payload(data, &mut state)
        }))
    }

    async fn check_health(&self) -> Result<()> {
        let url = format!("{}/models", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(self.key()?)
            .send()
            .await
            .map_err(|e| from_reqwest(self.info.provider, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .map_err(|e| from_reqwest(self.info.provider, e))?;
            return Err(from_http_status(self.info.provider, status.as_u16(), &text, None).into());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAiCompatProvider {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": EMBEDDING_MODEL,
            "input": inputs,
        });

        let resp = self.post_json(&url, &body).await?;
        let data = resp
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| {
                ProviderError::new(
                    self.info.provider,
                    ProviderErrorKind::Unknown,
                    "missing 'data' array in embeddings response",
                )
            })?;

        Ok(data
            .iter()
            .filter_map(|item| {
                let embedding = item.get("embedding")?.as_array()?;
                Some(
                    embedding
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect(),
                )
            })
            .collect())
    }
}
