use std::sync::Arc;

use da_domain::config::Config;
use da_engine::budget::BudgetManager;
use da_engine::judge::JudgeCache;
use da_providers::rate_limit::RateLimiter;
use da_providers::registry::ProviderRegistry;
use da_providers::retry::RetryPolicy;
use da_safety::SafetyPipeline;
use da_sessions::SessionStore;

use crate::runtime::bus::EventBus;
use crate::runtime::control::ControlMap;
use crate::runtime::debate_lock::DebateLockMap;

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services** — config, store, providers, safety
/// - **Runtime** — event bus, run locks, control requests, rate limiter
/// - **Engine** — budget manager, retry policy, judge cache
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub store: Arc<SessionStore>,
    pub providers: Arc<ProviderRegistry>,
    pub safety: Arc<SafetyPipeline>,

    // ── Runtime ───────────────────────────────────────────────────────
    pub bus: Arc<EventBus>,
    pub debate_locks: Arc<DebateLockMap>,
    pub controls: Arc<ControlMap>,
    pub rate_limiter: Arc<RateLimiter>,

    // ── Engine ────────────────────────────────────────────────────────
    pub budget: Arc<BudgetManager>,
    pub retry: Arc<RetryPolicy>,
    pub judge_cache: Arc<JudgeCache>,
}
