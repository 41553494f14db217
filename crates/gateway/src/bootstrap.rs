//! Construction of the shared application state and background
//! housekeeping.

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio::task::JoinHandle;

use da_domain::config::Config;
use da_domain::error::Result;
use da_domain::events::DebateEvent;
use da_engine::budget::BudgetManager;
use da_engine::judge::JudgeCache;
use da_providers::rate_limit::RateLimiter;
use da_providers::registry::ProviderRegistry;
use da_providers::retry::RetryPolicy;
use da_safety::moderation::ModerationClient;
use da_safety::semantic::SemanticFilter;
use da_safety::SafetyPipeline;
use da_sessions::SessionStore;

use crate::runtime::bus::EventBus;
use crate::runtime::control::ControlMap;
use crate::runtime::debate_lock::DebateLockMap;
use crate::state::AppState;

/// Cadence of the heartbeat tick.
const HEARTBEAT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Bus channels and idle locks older than this are reaped.
const CHANNEL_MAX_AGE_MINUTES: i64 = 60;

/// Build the full application state from configuration.
///
/// Missing credentials degrade features rather than failing here: an
/// absent OpenAI key leaves the moderation and semantic layers as
/// pass-throughs, an absent debater key surfaces when that provider is
/// first invoked.
pub fn build_state(config: Config) -> Result<AppState> {
    let config = Arc::new(config);
    let store = Arc::new(SessionStore::in_memory(&config.session_secret)?);
    let providers = Arc::new(ProviderRegistry::from_config(&config));

    let moderation = config
        .safety
        .moderation_enabled
        .then(|| ModerationClient::new(config.openai_api_key.clone()));
    let semantic = if config.safety.semantic_enabled {
        providers.embedder().map(SemanticFilter::new)
    } else {
        None
    };
    let safety = Arc::new(SafetyPipeline::new(
        config.safety.clone(),
        moderation,
        semantic,
    ));

    Ok(AppState {
        config: config.clone(),
        store,
        providers,
        safety,
        bus: Arc::new(EventBus::new()),
        debate_locks: Arc::new(DebateLockMap::new()),
        controls: Arc::new(ControlMap::new()),
        rate_limiter: Arc::new(RateLimiter::new()),
        budget: Arc::new(BudgetManager::new(config.budget.clone())),
        retry: Arc::new(RetryPolicy::default()),
        judge_cache: Arc::new(JudgeCache::new()),
    })
}

/// Periodic housekeeping: heartbeats to channels with live
/// subscribers, bus history cleanup, and idle-lock pruning.
pub fn spawn_housekeeping(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(HEARTBEAT_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut ticks: u64 = 0;

        loop {
            tick.tick().await;
            ticks += 1;

            for debate_id in state.bus.active_debates() {
                state.bus.emit(&debate_id, DebateEvent::Heartbeat);
            }

            // Heavier sweep every ~5 minutes.
            if ticks % 10 == 0 {
                let dropped = state
                    .bus
                    .cleanup(ChronoDuration::minutes(CHANNEL_MAX_AGE_MINUTES));
                state.debate_locks.prune_idle();
                if dropped > 0 {
                    tracing::debug!(dropped, "event bus channels reaped");
                }
            }
        }
    })
}
