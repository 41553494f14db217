//! End-to-end orchestrator scenarios over scripted providers.
//!
//! Every test runs on a paused tokio clock, so retry backoffs and the
//! inter-turn yield advance instantly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use parking_lot::Mutex;

use da_domain::config::{BudgetConfig, Config, SafetyConfig};
use da_domain::error::{Error, ProviderError, ProviderErrorKind, ProviderType, Result};
use da_domain::events::{BusEvent, DebateEvent};
use da_domain::session::{DebateFormat, DebateSession, SessionStatus};
use da_domain::state::EngineStatus;
use da_domain::stream::{BoxStream, FinishReason, StreamChunk, Usage};
use da_domain::turn::{Speaker, Turn};
use da_engine::budget::BudgetManager;
use da_engine::judge::JudgeCache;
use da_engine::sequencer::TurnSequencer;
use da_providers::rate_limit::{ProviderQuota, RateLimiter};
use da_providers::registry::ProviderRegistry;
use da_providers::retry::RetryPolicy;
use da_providers::traits::{DebateProvider, GenerateParams, GenerateResult, ProviderInfo};
use da_safety::SafetyPipeline;
use da_sessions::SessionStore;

use da_gateway::runtime::bus::EventBus;
use da_gateway::runtime::control::ControlMap;
use da_gateway::runtime::debate_lock::DebateLockMap;
use da_gateway::runtime::orchestrator;
use da_gateway::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scripted provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const TURN_USAGE: (u64, u64) = (50, 20);

struct ScriptedProvider {
    info: ProviderInfo,
    /// Errors returned (in order) before generations start succeeding.
    failures: Mutex<VecDeque<ProviderError>>,
    content: String,
    /// (input, output) tokens reported per generation.
    usage: Mutex<(u64, u64)>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(provider: ProviderType) -> Arc<Self> {
        Self::with_content(
            provider,
            "On balance the evidence favors this side of the motion.",
        )
    }

    fn with_content(provider: ProviderType, content: &str) -> Arc<Self> {
        Arc::new(Self {
            info: ProviderInfo {
                provider,
                model: format!("scripted-{provider}"),
                display_name: format!("Scripted {provider}"),
            },
            failures: Mutex::new(VecDeque::new()),
            content: content.to_string(),
            usage: Mutex::new(TURN_USAGE),
            calls: AtomicUsize::new(0),
        })
    }

    fn push_failures(&self, count: usize, kind: ProviderErrorKind) {
        let mut failures = self.failures.lock();
        for _ in 0..count {
            failures.push_back(ProviderError::new(
                self.info.provider,
                kind,
                "injected failure",
            ));
        }
    }

    fn set_usage(&self, input: u64, output: u64) {
        *self.usage.lock() = (input, output);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_result(&self) -> Result<GenerateResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err.into());
        }
        let (input, output) = *self.usage.lock();
        Ok(GenerateResult {
            content: self.content.clone(),
            usage: Usage::new(input, output),
            finish_reason: FinishReason::Stop,
        })
    }
}

#[async_trait::async_trait]
impl DebateProvider for ScriptedProvider {
    fn provider_type(&self) -> ProviderType {
        self.info.provider
    }

    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, _params: &GenerateParams) -> Result<GenerateResult> {
        self.next_result()
    }

    async fn generate_stream(
        &self,
        _params: &GenerateParams,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let result = self.next_result()?;
        let mid = result.content.len() / 2;
        let chunks: Vec<Result<StreamChunk>> = vec![
            Ok(StreamChunk::Delta {
                text: result.content[..mid].to_string(),
            }),
            Ok(StreamChunk::Delta {
                text: result.content[mid..].to_string(),
            }),
            Ok(StreamChunk::Done {
                finish_reason: result.finish_reason,
                usage: Some(result.usage),
            }),
        ];
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }

    async fn check_health(&self) -> Result<()> {
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Harness {
    state: AppState,
    openai: Arc<ScriptedProvider>,
    anthropic: Arc<ScriptedProvider>,
    xai: Arc<ScriptedProvider>,
}

fn harness(budget: BudgetConfig) -> Harness {
    harness_with(budget, ScriptedProvider::new(ProviderType::Openai))
}

fn harness_with(budget: BudgetConfig, openai: Arc<ScriptedProvider>) -> Harness {
    let anthropic = ScriptedProvider::new(ProviderType::Anthropic);
    let xai = ScriptedProvider::new(ProviderType::Xai);

    let registry = ProviderRegistry::empty()
        .with_provider(openai.clone())
        .with_provider(anthropic.clone())
        .with_provider(xai.clone());

    let config = Config {
        session_secret: "integration-test-secret-0123456789ab".into(),
        anthropic_api_key: None,
        openai_api_key: None,
        xai_api_key: None,
        budget: budget.clone(),
        safety: SafetyConfig::default(),
        bind_addr: "127.0.0.1:0".into(),
        session_ttl_secs: 3_600,
    };

    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(
            SessionStore::in_memory("integration-test-secret-0123456789ab").unwrap(),
        ),
        providers: Arc::new(registry),
        safety: Arc::new(SafetyPipeline::disabled()),
        bus: Arc::new(EventBus::new()),
        debate_locks: Arc::new(DebateLockMap::new()),
        controls: Arc::new(ControlMap::new()),
        rate_limiter: Arc::new(RateLimiter::with_quotas(|_| ProviderQuota {
            tokens_per_minute: 100_000_000,
            requests_per_minute: 1_000_000,
        })),
        budget: Arc::new(BudgetManager::new(budget)),
        retry: Arc::new(RetryPolicy {
            initial_delay: std::time::Duration::from_millis(5),
            max_delay: std::time::Duration::from_millis(50),
            ..Default::default()
        }),
        judge_cache: Arc::new(JudgeCache::new()),
    };

    Harness {
        state,
        openai,
        anthropic,
        xai,
    }
}

async fn create_session(state: &AppState, turns: u8) -> DebateSession {
    let session = DebateSession::new(
        da_domain::ids::generate_debate_id(),
        "Should social media companies be held liable for user content?".into(),
        turns,
        DebateFormat::Standard,
        vec![],
        ChronoDuration::hours(1),
    );
    state.store.put_session(&session).await.unwrap();
    session
}

/// Poll until the session reaches a status (paused clock advances fast).
async fn wait_for_status(state: &AppState, id: &str, status: SessionStatus) {
    for _ in 0..5_000 {
        let session = state.store.get_session(id).await.unwrap().unwrap();
        if session.status == status {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("debate {id} never reached {status:?}");
}

fn event_types(events: &[BusEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.event.event_type()).collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario: happy path, N = 4, standard format
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn happy_path_runs_the_full_schedule_in_order() {
    let h = harness(BudgetConfig::default());
    let session = create_session(&h.state, 4).await;

    orchestrator::start(&h.state, &session.id).await.unwrap();
    wait_for_status(&h.state, &session.id, SessionStatus::Completed).await;

    let events = h.state.bus.recent(&session.id, None);
    let types = event_types(&events);

    assert_eq!(types.first(), Some(&"debate_started"));
    assert!(types.contains(&"debate_completed"));

    // 9 scheduled turns for N=4: intro + 4 debater + 3 transitions + summary.
    let started: Vec<(usize, Speaker)> = events
        .iter()
        .filter_map(|e| match &e.event {
            DebateEvent::TurnStarted {
                turn_number,
                speaker,
                ..
            } => Some((*turn_number, *speaker)),
            _ => None,
        })
        .collect();
    assert_eq!(started.len(), 9);
    let speakers: Vec<Speaker> = started.iter().map(|(_, s)| *s).collect();
    assert_eq!(
        speakers,
        vec![
            Speaker::Moderator,
            Speaker::For,
            Speaker::Moderator,
            Speaker::Against,
            Speaker::Moderator,
            Speaker::For,
            Speaker::Moderator,
            Speaker::Against,
            Speaker::Moderator,
        ]
    );

    // Every turn_started has a matching turn_completed, streaming in between.
    let completed = types.iter().filter(|t| **t == "turn_completed").count();
    assert_eq!(completed, 9);
    assert!(types.iter().filter(|t| **t == "turn_streaming").count() >= 9);

    // The engine state holds the full transcript and the invariant.
    let engine = h
        .state
        .store
        .get_engine_state(&session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(engine.status, EngineStatus::Completed);
    assert_eq!(engine.completed_turns.len(), 9);
    assert_eq!(engine.current_turn_index, 9);
    for turn in &engine.completed_turns {
        assert_eq!(turn.speaker, turn.config.speaker);
    }

    // Completion makes the assignment revealable.
    let session = h
        .state
        .store
        .get_session(&session.id)
        .await
        .unwrap()
        .unwrap();
    assert!(session.revealed_assignment().is_some());

    // Debater turns used the hidden-assignment providers.
    let for_provider = session.assignment.for_position.provider();
    let for_turn = engine
        .completed_turns
        .iter()
        .find(|t| t.speaker == Speaker::For)
        .unwrap();
    assert_eq!(for_turn.provider, for_provider);
}

#[tokio::test(start_paused = true)]
async fn second_start_observes_already_running() {
    let h = harness(BudgetConfig::default());
    let session = create_session(&h.state, 2).await;

    orchestrator::start(&h.state, &session.id).await.unwrap();
    let err = orchestrator::start(&h.state, &session.id).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyRunning(_)));

    wait_for_status(&h.state, &session.id, SessionStatus::Completed).await;

    // Exactly one debate_started despite the second call.
    let events = h.state.bus.recent(&session.id, None);
    let starts = event_types(&events)
        .iter()
        .filter(|t| **t == "debate_started")
        .count();
    assert_eq!(starts, 1);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario: pause / resume
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn pause_stops_the_stream_and_resume_continues_it() {
    let h = harness(BudgetConfig::default());
    let session = create_session(&h.state, 4).await;

    orchestrator::start(&h.state, &session.id).await.unwrap();

    // Let a few turns land, then request a pause at the boundary.
    for _ in 0..5_000 {
        let engine = h
            .state
            .store
            .get_engine_state(&session.id)
            .await
            .unwrap()
            .unwrap();
        if engine.current_turn_index >= 3 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    h.state.controls.request_pause(&session.id);
    wait_for_status(&h.state, &session.id, SessionStatus::Paused).await;

    let paused_events = h.state.bus.recent(&session.id, None);
    assert_eq!(
        event_types(&paused_events).last(),
        Some(&"debate_paused")
    );
    let count_at_pause = paused_events.len();

    // While paused, nothing new is emitted.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    assert_eq!(h.state.bus.recent(&session.id, None).len(), count_at_pause);

    // Resume and run to completion.
    orchestrator::resume(&h.state, &session.id).await.unwrap();
    wait_for_status(&h.state, &session.id, SessionStatus::Completed).await;

    let events = h.state.bus.recent(&session.id, None);
    let types = event_types(&events);
    assert!(types.contains(&"debate_resumed"));
    assert!(types.contains(&"debate_completed"));

    let engine = h
        .state
        .store
        .get_engine_state(&session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(engine.status, EngineStatus::Completed);
    assert_eq!(engine.current_turn_index, engine.turn_sequence.len());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario: budget exhaustion
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn token_budget_exhaustion_warns_then_cancels() {
    // 70 tokens land per turn against a 300-token budget: the warning
    // fires once pre-turn utilization crosses the threshold, and the
    // post-turn check cancels when fewer than 100 tokens remain.
    // Soft limit so admission never denies outright.
    let h = harness(BudgetConfig {
        token_budget_per_debate: Some(300),
        warning_threshold: 0.4,
        hard_limit: false,
        ..Default::default()
    });
    let session = create_session(&h.state, 4).await;

    orchestrator::start(&h.state, &session.id).await.unwrap();
    wait_for_status(&h.state, &session.id, SessionStatus::Completed).await;

    let events = h.state.bus.recent(&session.id, None);
    let types = event_types(&events);
    assert!(types.contains(&"budget_warning"));
    assert!(types.contains(&"budget_exceeded"));
    assert!(types.contains(&"debate_cancelled"));
    assert!(!types.contains(&"debate_completed"));

    let engine = h
        .state
        .store
        .get_engine_state(&session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(engine.status, EngineStatus::Cancelled);
    assert!(engine
        .cancel_reason
        .as_deref()
        .unwrap()
        .contains("token budget"));
}

#[tokio::test(start_paused = true)]
async fn cost_limit_cancels_with_a_cost_reason() {
    // Heavy per-turn usage so cumulative actual cost crosses the
    // limit within a few turns, while single-turn estimates stay
    // under it (admission keeps passing; the post-turn check cancels).
    let h = harness(BudgetConfig {
        cost_limit_usd: Some(0.2),
        ..Default::default()
    });
    h.openai.set_usage(5_000, 2_000);
    h.anthropic.set_usage(5_000, 2_000);
    h.xai.set_usage(5_000, 2_000);
    let session = create_session(&h.state, 4).await;

    orchestrator::start(&h.state, &session.id).await.unwrap();
    wait_for_status(&h.state, &session.id, SessionStatus::Completed).await;

    let engine = h
        .state
        .store
        .get_engine_state(&session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(engine.status, EngineStatus::Cancelled);
    assert!(engine.cancel_reason.as_deref().unwrap().contains("cost"));

    let types = event_types(&h.state.bus.recent(&session.id, None));
    assert!(types.contains(&"budget_exceeded"));
    assert!(types.contains(&"debate_cancelled"));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario: provider flakiness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn transient_rate_limits_are_absorbed_by_retries() {
    let h = harness(BudgetConfig::default());
    let session = create_session(&h.state, 2).await;

    // Whichever provider argues FOR fails twice before succeeding.
    let for_provider = match session.assignment.for_position.provider() {
        ProviderType::Openai => h.openai.clone(),
        ProviderType::Xai => h.xai.clone(),
        ProviderType::Anthropic => unreachable!("debaters are never anthropic"),
    };
    for_provider.push_failures(2, ProviderErrorKind::RateLimit);

    orchestrator::start(&h.state, &session.id).await.unwrap();
    wait_for_status(&h.state, &session.id, SessionStatus::Completed).await;

    // Three attempts total for that provider's single turn.
    assert_eq!(for_provider.calls(), 3);

    // Exactly one turn_completed for the FOR turn despite retries.
    let events = h.state.bus.recent(&session.id, None);
    let for_completions = events
        .iter()
        .filter(|e| {
            matches!(
                &e.event,
                DebateEvent::TurnCompleted {
                    speaker: Speaker::For,
                    ..
                }
            )
        })
        .count();
    assert_eq!(for_completions, 1);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_failure_errors_the_debate() {
    let h = harness(BudgetConfig::default());
    let session = create_session(&h.state, 2).await;
    h.anthropic.push_failures(1, ProviderErrorKind::AuthError);

    orchestrator::start(&h.state, &session.id).await.unwrap();
    wait_for_status(&h.state, &session.id, SessionStatus::Error).await;

    let engine = h
        .state
        .store
        .get_engine_state(&session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(engine.status, EngineStatus::Error);

    let types = event_types(&h.state.bus.recent(&session.id, None));
    assert!(types.contains(&"turn_error"));
    assert!(types.contains(&"debate_error"));
    // Only one attempt: auth errors never retry.
    assert_eq!(h.anthropic.calls(), 1);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario: crash recovery
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn crash_recovery_resumes_from_the_next_unstarted_turn() {
    let h = harness(BudgetConfig::default());
    let session = create_session(&h.state, 4).await;

    // Simulate a prior process that completed three turns, persisted,
    // and then died mid-run.
    let mut sequencer =
        TurnSequencer::new(session.id.clone(), session.format, session.turn_count).unwrap();
    sequencer.start().unwrap();
    for _ in 0..3 {
        let config = sequencer.current_turn().unwrap().clone();
        let provider = match config.speaker {
            Speaker::Moderator => ProviderType::Anthropic,
            s => session.assignment.model_for(s).provider(),
        };
        let turn = Turn::new(
            session.id.clone(),
            config,
            provider,
            "recovered content",
            60,
            chrono::Utc::now(),
        );
        sequencer.record_turn(turn).unwrap();
    }
    h.state
        .store
        .put_engine_state(sequencer.state(), session.expires_at)
        .await
        .unwrap();
    h.state
        .store
        .put_usage(
            &da_domain::usage::DebateUsage::new(session.id.clone(), 130_000),
            session.expires_at,
        )
        .await
        .unwrap();

    // Relaunch: the loop picks up at turn 4.
    orchestrator::start(&h.state, &session.id).await.unwrap();
    wait_for_status(&h.state, &session.id, SessionStatus::Completed).await;

    let events = h.state.bus.recent(&session.id, None);
    let started_numbers: Vec<usize> = events
        .iter()
        .filter_map(|e| match &e.event {
            DebateEvent::TurnStarted { turn_number, .. } => Some(*turn_number),
            _ => None,
        })
        .collect();

    // Historical turns (1..=3) are not re-emitted.
    assert_eq!(started_numbers.first(), Some(&4));
    assert!(started_numbers.iter().all(|n| *n >= 4));

    let engine = h
        .state
        .store
        .get_engine_state(&session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(engine.status, EngineStatus::Completed);
    assert_eq!(engine.completed_turns.len(), 9);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Violations and interventions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn profane_debater_turn_triggers_an_intervention() {
    let foul = ScriptedProvider::with_content(
        ProviderType::Openai,
        "Frankly my opponent's position is complete shit and everyone knows it.",
    );
    let h = harness_with(BudgetConfig::default(), foul);
    // Pin the assignment so the scripted provider argues FOR.
    let mut session = create_session(&h.state, 2).await;
    session.assignment = da_domain::session::HiddenAssignment {
        for_position: da_domain::session::DebaterModel::ChatgptModel,
        against_position: da_domain::session::DebaterModel::GrokModel,
    };
    h.state.store.put_session(&session).await.unwrap();

    orchestrator::start(&h.state, &session.id).await.unwrap();
    wait_for_status(&h.state, &session.id, SessionStatus::Completed).await;

    let events = h.state.bus.recent(&session.id, None);
    let types = event_types(&events);
    assert!(types.contains(&"violation_detected"));
    assert!(types.contains(&"intervention"));

    // The intervention is in the transcript without consuming a
    // scheduled slot.
    let engine = h
        .state
        .store
        .get_engine_state(&session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(engine.status, EngineStatus::Completed);
    assert_eq!(engine.turn_sequence.len(), 5);
    assert_eq!(engine.completed_turns.len(), 6);
    assert_eq!(engine.scheduled_completed_count(), 5);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Judge
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn judge_runs_after_completion_and_caches() {
    let h = harness(BudgetConfig::default());
    let session = create_session(&h.state, 2).await;

    orchestrator::start(&h.state, &session.id).await.unwrap();
    wait_for_status(&h.state, &session.id, SessionStatus::Completed).await;

    // Let the eager background judge run settle before probing the cache.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let analysis = orchestrator::compute_judge_analysis(&h.state, &session.id, false)
        .await
        .unwrap();
    assert_eq!(analysis.debate_id, session.id);
    // Scripted moderator output is not JSON, so scores degrade to the
    // defensive defaults with the full rubric present.
    assert_eq!(analysis.for_side.scores.len(), 5);

    let calls_before = h.anthropic.calls();
    let cached = orchestrator::compute_judge_analysis(&h.state, &session.id, false)
        .await
        .unwrap();
    assert_eq!(h.anthropic.calls(), calls_before);
    assert!(Arc::ptr_eq(&analysis, &cached));

    // Force bypasses the cache and re-invokes the model.
    let _forced = orchestrator::compute_judge_analysis(&h.state, &session.id, true)
        .await
        .unwrap();
    assert_eq!(h.anthropic.calls(), calls_before + 1);
}

#[tokio::test]
async fn judge_refuses_unfinished_debates() {
    let h = harness(BudgetConfig::default());
    let session = create_session(&h.state, 2).await;

    let err = orchestrator::compute_judge_analysis(&h.state, &session.id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Other(_)));
}
