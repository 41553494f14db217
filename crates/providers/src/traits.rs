use da_domain::error::{ProviderType, Result};
use da_domain::stream::{BoxStream, FinishReason, StreamChunk, Usage};
use serde::Serialize;

use crate::tokens;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic text generation request.
///
/// Debate turns are single system + single user prompt pairs; the
/// prompt compiler bakes all history into the user prompt, so there is
/// no multi-message conversation state at this layer.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
}

/// A completed, non-streaming generation.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub content: String,
    pub usage: Usage,
    pub finish_reason: FinishReason,
}

/// Static identity of a provider instance.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub provider: ProviderType,
    pub model: String,
    pub display_name: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every vendor adapter implements.
///
/// Concrete adapters translate between these types and each vendor's
/// HTTP wire format; everything above this trait is vendor-blind.
#[async_trait::async_trait]
pub trait DebateProvider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    fn info(&self) -> &ProviderInfo;

    /// Whether credentials for this provider are present.
    fn is_configured(&self) -> bool;

    /// Estimate the token count of a raw string.
    ///
    /// No vendor tokenizer is linked; every adapter uses the byte
    /// heuristic unless it overrides this with something better.
    fn count_tokens(&self, text: &str) -> u32 {
        tokens::estimate_tokens(text)
    }

    /// Estimate the token count of a system + user prompt pair,
    /// including per-message wrapping overhead.
    fn count_message_tokens(&self, system: &str, user: &str) -> u32 {
        tokens::estimate_message_tokens(system, user)
    }

    /// Generate a completion and wait for the full response.
    async fn generate(&self, params: &GenerateParams) -> Result<GenerateResult>;

    /// Generate a completion as a lazy finite sequence of chunks
    /// terminated by exactly one [`StreamChunk::Done`]. Not restartable.
    async fn generate_stream(
        &self,
        params: &GenerateParams,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>>;

    /// Cheap upstream reachability probe.
    async fn check_health(&self) -> Result<()>;
}

/// Text embedding capability, used by the semantic safety filter.
///
/// Kept separate from [`DebateProvider`]: only the OpenAI-compatible
/// adapter implements it, and the safety pipeline is its only consumer.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Collect a full stream into a [`GenerateResult`].
///
/// Convenience for non-streaming callers layered on a streaming
/// adapter, and for tests.
pub async fn collect_stream(
    mut stream: BoxStream<'static, Result<StreamChunk>>,
    fallback_input_tokens: u64,
) -> Result<GenerateResult> {
    use futures_util::StreamExt;

    let mut content = String::new();
    let mut finish_reason = FinishReason::Stop;
    let mut usage = None;

    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::Delta { text } => content.push_str(&text),
            StreamChunk::Done {
                finish_reason: fr,
                usage: u,
            } => {
                finish_reason = fr;
                usage = u;
            }
        }
    }

    let usage = usage.unwrap_or_else(|| {
        Usage::new(fallback_input_tokens, tokens::estimate_tokens(&content) as u64)
    });

    Ok(GenerateResult {
        content,
        usage,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_stream_accumulates_content_and_usage() {
        let chunks: Vec<Result<StreamChunk>> = vec![
            Ok(StreamChunk::Delta { text: "a".into() }),
            Ok(StreamChunk::Delta { text: "b".into() }),
            Ok(StreamChunk::Done {
                finish_reason: FinishReason::MaxTokens,
                usage: Some(Usage::new(10, 2)),
            }),
        ];
        let stream: BoxStream<'static, Result<StreamChunk>> =
            Box::pin(futures_util::stream::iter(chunks));

        let result = collect_stream(stream, 0).await.unwrap();
        assert_eq!(result.content, "ab");
        assert_eq!(result.finish_reason, FinishReason::MaxTokens);
        assert_eq!(result.usage.total_tokens, 12);
    }

    #[tokio::test]
    async fn collect_stream_falls_back_to_estimates() {
        let chunks: Vec<Result<StreamChunk>> = vec![
            Ok(StreamChunk::Delta {
                text: "12345678".into(),
            }),
            Ok(StreamChunk::Done {
                finish_reason: FinishReason::Stop,
                usage: None,
            }),
        ];
        let stream: BoxStream<'static, Result<StreamChunk>> =
            Box::pin(futures_util::stream::iter(chunks));

        let result = collect_stream(stream, 7).await.unwrap();
        assert_eq!(result.usage.input_tokens, 7);
        assert_eq!(result.usage.output_tokens, 2); // ceil(8 bytes / 4)
    }
}
