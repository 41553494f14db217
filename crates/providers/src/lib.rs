//! Provider-agnostic LLM invocation: vendor adapters, shared SSE
//! plumbing, retries, rate limiting, pricing, and the registry.

pub mod anthropic;
pub mod classify;
pub mod openai_compat;
pub mod pricing;
pub mod rate_limit;
pub mod registry;
pub mod retry;
pub mod sse;
pub mod tokens;
pub mod traits;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use rate_limit::RateLimiter;
pub use registry::ProviderRegistry;
pub use retry::{with_retry, RetryPolicy};
pub use traits::{DebateProvider, Embedder, GenerateParams, GenerateResult, ProviderInfo};
