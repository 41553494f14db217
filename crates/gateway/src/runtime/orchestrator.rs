//! The orchestrator loop.
//!
//! Drives one debate through its schedule: re-hydrate state, compile
//! prompts, admit against the budget, wait for rate-limit capacity,
//! stream the generation (publishing every chunk), record the turn and
//! its usage, persist, and repeat until the sequencer goes terminal.
//! Engine state and usage are persisted after every recorded turn, so
//! re-invoking the loop after a crash resumes at the next unstarted
//! turn; interrupted partial turns are simply regenerated.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::OwnedSemaphorePermit;

use da_domain::error::{Error, Result};
use da_domain::events::{DebateEvent, WarningLevel};
use da_domain::session::{DebateSession, SessionStatus};
use da_domain::state::{EngineState, EngineStatus};
use da_domain::stream::{FinishReason, StreamChunk, Usage};
use da_domain::turn::{Speaker, Turn, TurnConfig, TurnType, Violation};
use da_domain::usage::DebateUsage;
use da_engine::judge::{self, JudgeAnalysis};
use da_engine::prompts::{self, PromptContext};
use da_engine::sequencer::TurnSequencer;
use da_providers::retry::with_retry;
use da_providers::tokens::estimate_tokens;
use da_providers::traits::{DebateProvider, GenerateParams, GenerateResult};

use crate::runtime::bus::EventBus;
use crate::runtime::control::ControlRequest;
use crate::runtime::violations;
use crate::state::AppState;

/// Inter-turn scheduler yield.
const INTER_TURN_DELAY: Duration = Duration::from_millis(100);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lifecycle entry points
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Ensure engine state and usage exist for a session, creating and
/// persisting both on first touch.
pub async fn initialize(state: &AppState, session: &DebateSession) -> Result<EngineState> {
    let engine = match state.store.get_engine_state(&session.id).await? {
        Some(existing) => existing,
        None => {
            let sequencer =
                TurnSequencer::new(session.id.clone(), session.format, session.turn_count)?;
            let fresh = sequencer.into_state();
            state
                .store
                .put_engine_state(&fresh, session.expires_at)
                .await?;
            fresh
        }
    };

    if state.store.get_usage(&session.id).await?.is_none() {
        let budget = state.budget.budget_for(session.turn_count);
        let usage = DebateUsage::new(session.id.clone(), budget);
        state.store.put_usage(&usage, session.expires_at).await?;
    }

    Ok(engine)
}

/// Start (or crash-resume) the orchestrator loop for a debate.
///
/// A second caller while a run is in flight observes
/// [`Error::AlreadyRunning`] and nothing advances.
pub async fn start(state: &AppState, debate_id: &str) -> Result<()> {
    let session = state
        .store
        .get_session(debate_id)
        .await?
        .ok_or_else(|| Error::SessionNotFound(debate_id.to_string()))?;

    let Some(permit) = state.debate_locks.try_acquire(debate_id) else {
        return Err(Error::AlreadyRunning(debate_id.to_string()));
    };

    let engine = initialize(state, &session).await?;
    match engine.status {
        EngineStatus::Initialized | EngineStatus::InProgress => {}
        EngineStatus::Paused => {
            return Err(Error::Other(
                "debate is paused; use the resume control".into(),
            ));
        }
        terminal => {
            return Err(Error::Other(format!(
                "debate is not runnable from state {}",
                terminal.as_str()
            )));
        }
    }

    state
        .store
        .update_session(debate_id, |s| s.status = SessionStatus::Active)
        .await?;

    spawn_run(state.clone(), debate_id.to_string(), permit);
    Ok(())
}

/// Resume a paused debate: flip the sequencer, announce, and relaunch
/// the loop.
pub async fn resume(state: &AppState, debate_id: &str) -> Result<()> {
    let session = state
        .store
        .get_session(debate_id)
        .await?
        .ok_or_else(|| Error::SessionNotFound(debate_id.to_string()))?;

    let Some(permit) = state.debate_locks.try_acquire(debate_id) else {
        return Err(Error::AlreadyRunning(debate_id.to_string()));
    };

    let engine = initialize(state, &session).await?;
    let mut sequencer = TurnSequencer::from_state(engine);
    sequencer.resume()?;
    state
        .store
        .put_engine_state(sequencer.state(), session.expires_at)
        .await?;
    state
        .store
        .update_session(debate_id, |s| s.status = SessionStatus::Active)
        .await?;
    state.bus.emit(debate_id, DebateEvent::DebateResumed);

    spawn_run(state.clone(), debate_id.to_string(), permit);
    Ok(())
}

/// Cancel a debate that has no loop in flight (paused or never started).
pub async fn end_idle(state: &AppState, debate_id: &str, reason: &str) -> Result<()> {
    let session = state
        .store
        .get_session(debate_id)
        .await?
        .ok_or_else(|| Error::SessionNotFound(debate_id.to_string()))?;

    let engine = initialize(state, &session).await?;
    let mut sequencer = TurnSequencer::from_state(engine);
    sequencer.cancel(reason)?;
    state
        .store
        .put_engine_state(sequencer.state(), session.expires_at)
        .await?;

    finalize(state, debate_id, sequencer.state()).await
}

fn spawn_run(state: AppState, debate_id: String, permit: OwnedSemaphorePermit) {
    let span = tracing::info_span!("debate_run", debate_id = %debate_id);
    tokio::spawn(tracing::Instrument::instrument(
        async move {
            let result = run_inner(&state, &debate_id).await;
            // Stale control requests must not leak into a later run.
            state.controls.clear(&debate_id);
            if let Err(e) = result {
                tracing::error!(error = %e, "orchestrator loop failed");
                fail_debate(&state, &debate_id, &e.to_string()).await;
            }
            drop(permit);
        },
        span,
    ));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// The loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn run_inner(state: &AppState, debate_id: &str) -> Result<()> {
    loop {
        // 1. Re-hydrate everything from the store.
        let session = state
            .store
            .get_session(debate_id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(debate_id.to_string()))?;
        let engine = state
            .store
            .get_engine_state(debate_id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(debate_id.to_string()))?;
        let mut sequencer = TurnSequencer::from_state(engine);
        let mut usage = state
            .store
            .get_usage(debate_id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(debate_id.to_string()))?;

        // 2. Apply any pending control request at the turn boundary.
        if let Some(request) = state.controls.take(debate_id) {
            match request {
                ControlRequest::Pause => {
                    sequencer.pause()?;
                    state
                        .store
                        .put_engine_state(sequencer.state(), session.expires_at)
                        .await?;
                    state
                        .store
                        .update_session(debate_id, |s| s.status = SessionStatus::Paused)
                        .await?;
                    state.bus.emit(debate_id, DebateEvent::DebatePaused);
                    return Ok(());
                }
                ControlRequest::End { reason } => {
                    sequencer.cancel(&reason)?;
                    state
                        .store
                        .put_engine_state(sequencer.state(), session.expires_at)
                        .await?;
                    return finalize(state, debate_id, sequencer.state()).await;
                }
            }
        }

        // 3. Dispatch on the sequencer state.
        match sequencer.status() {
            EngineStatus::Initialized => {
                sequencer.start()?;
                state
                    .store
                    .put_engine_state(sequencer.state(), session.expires_at)
                    .await?;
                state.bus.emit(
                    debate_id,
                    DebateEvent::DebateStarted {
                        topic: session.topic.clone(),
                        format: session.format.as_str().to_string(),
                        turn_count: session.turn_count,
                        total_turns: sequencer.state().turn_sequence.len(),
                    },
                );
                continue;
            }
            EngineStatus::InProgress => {}
            EngineStatus::Paused => return Ok(()),
            EngineStatus::Completed | EngineStatus::Cancelled | EngineStatus::Error => {
                return finalize(state, debate_id, sequencer.state()).await;
            }
        }

        let Some(current) = sequencer.current_turn().cloned() else {
            return Err(Error::NoCurrentTurn(debate_id.to_string()));
        };
        let next = sequencer.next_turn().cloned();
        let turn_number = current.index + 1;

        // 4. Compile prompts and check budget admission.
        let compiled = prompts::compile(&PromptContext {
            session: &session,
            completed_turns: &sequencer.state().completed_turns,
            current: &current,
            next: next.as_ref(),
            violation: None,
        })?;
        let max_output = capped_max_tokens(state, compiled.max_tokens);

        let provider = provider_for(state, &session, current.speaker)?;
        let provider_type = provider.provider_type();
        let estimated_input =
            provider.count_message_tokens(&compiled.system_prompt, &compiled.user_prompt) as u64;

        let check =
            state
                .budget
                .check_budget(&usage, provider_type, estimated_input, max_output as u64);
        if !check.admitted {
            let message = check
                .reason
                .unwrap_or_else(|| "budget admission denied".into());
            state.bus.emit(
                debate_id,
                DebateEvent::TurnError {
                    turn_number,
                    message: message.clone(),
                    recoverable: false,
                },
            );
            state
                .bus
                .emit(debate_id, DebateEvent::DebateError { message: message.clone() });
            sequencer.set_error(&message)?;
            state
                .store
                .put_engine_state(sequencer.state(), session.expires_at)
                .await?;
            return finalize(state, debate_id, sequencer.state()).await;
        }

        // 5. Budget warning, when the tally is running hot.
        if check.warning_level != WarningLevel::None {
            state.bus.emit(
                debate_id,
                DebateEvent::BudgetWarning {
                    level: check.warning_level,
                    tokens_used: usage.total_tokens,
                    tokens_remaining: usage.remaining_tokens(),
                    utilization_percent: usage.utilization_percent(),
                },
            );
        }

        // 6. Rate-limit admission, then open the stream.
        let reserved = estimated_input + max_output as u64;
        state
            .rate_limiter
            .wait_for_capacity(provider_type, reserved)
            .await;

        // 7. Announce the turn.
        state.bus.emit(
            debate_id,
            DebateEvent::TurnStarted {
                turn_number,
                turn_type: current.turn_type,
                speaker: current.speaker,
                speaker_label: current.label.clone(),
                provider: provider_type,
            },
        );

        // 8/9. Stream with retries; discard partials on retryable
        // failure and regenerate.
        let params = GenerateParams {
            system_prompt: compiled.system_prompt.clone(),
            user_prompt: compiled.user_prompt.clone(),
            max_tokens: max_output,
            temperature: compiled.temperature,
        };
        let started_at = Utc::now();
        let generated = with_retry(&state.retry, |_attempt| {
            stream_turn_once(
                &state.bus,
                debate_id,
                provider.as_ref(),
                &params,
                turn_number,
                estimated_input,
            )
        })
        .await;

        let result = match generated {
            Ok(result) => result,
            Err(e) => {
                let message = e.to_string();
                state.bus.emit(
                    debate_id,
                    DebateEvent::TurnError {
                        turn_number,
                        message: message.clone(),
                        recoverable: false,
                    },
                );
                state
                    .bus
                    .emit(debate_id, DebateEvent::DebateError { message: message.clone() });
                sequencer.set_error(&message)?;
                state
                    .store
                    .put_engine_state(sequencer.state(), session.expires_at)
                    .await?;
                return finalize(state, debate_id, sequencer.state()).await;
            }
        };

        state
            .rate_limiter
            .consume_capacity(provider_type, reserved, result.usage.total_tokens);

        let latency_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        state.bus.emit(
            debate_id,
            DebateEvent::TurnCompleted {
                turn_number,
                turn_type: current.turn_type,
                speaker: current.speaker,
                content: result.content.clone(),
                token_count: result.usage.output_tokens as u32,
                latency_ms,
            },
        );

        // Record through the sequencer, then fold usage; both persist
        // before anything else can happen to this debate.
        let turn = Turn::new(
            debate_id,
            current.clone(),
            provider_type,
            result.content,
            result.usage.output_tokens as u32,
            started_at,
        );
        let turn_id = turn.id;
        let content_violation = violations::scan(&turn);
        sequencer.record_turn(turn)?;
        state
            .store
            .put_engine_state(sequencer.state(), session.expires_at)
            .await?;
        state
            .budget
            .record_usage(&mut usage, turn_id, provider_type, result.usage);
        state.store.put_usage(&usage, session.expires_at).await?;

        // Content violations in debater turns trigger a moderator
        // intervention before the next scheduled turn.
        if let Some(violation) = content_violation {
            state.bus.emit(
                debate_id,
                DebateEvent::ViolationDetected {
                    turn_number,
                    rule: violation.rule.clone(),
                    severity: violation.severity,
                    detail: violation.detail.clone(),
                },
            );
            if let Err(e) = run_intervention(
                state,
                &session,
                &mut sequencer,
                &mut usage,
                &violation,
            )
            .await
            {
                tracing::warn!(error = %e, "intervention generation failed, continuing");
            }
        }

        // Post-turn budget verdict.
        if state.budget.should_end_due_to_budget(&usage) {
            let cost_limit_hit = state
                .config
                .budget
                .cost_limit_usd
                .map(|limit| usage.cost_usd >= limit)
                .unwrap_or(false);
            let reason = if cost_limit_hit {
                format!(
                    "cost limit reached: spent ${:.4} of the ${:.2} allowance",
                    usage.cost_usd,
                    state.config.budget.cost_limit_usd.unwrap_or_default()
                )
            } else {
                format!(
                    "token budget exhausted after {} of {} tokens",
                    usage.total_tokens, usage.budget_tokens
                )
            };
            state.bus.emit(
                debate_id,
                DebateEvent::BudgetExceeded {
                    tokens_used: usage.total_tokens,
                    budget_tokens: usage.budget_tokens,
                    reason: reason.clone(),
                },
            );
            if !sequencer.state().is_terminal() {
                sequencer.cancel(&reason)?;
            }
            state
                .store
                .put_engine_state(sequencer.state(), session.expires_at)
                .await?;
            return finalize(state, debate_id, sequencer.state()).await;
        }

        // 10. Progress.
        let total = sequencer.state().turn_sequence.len();
        let completed = sequencer.state().scheduled_completed_count();
        state.bus.emit(
            debate_id,
            DebateEvent::ProgressUpdate {
                completed_turns: completed,
                total_turns: total,
                percent: (completed as f64 / total as f64) * 100.0,
            },
        );

        // 11. Yield briefly between turns.
        tokio::time::sleep(INTER_TURN_DELAY).await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// One generation attempt
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Open the stream and consume it fully, publishing each delta.
///
/// One retry attempt = one whole generation; a mid-stream failure
/// discards the partial content and the retry wrapper regenerates.
async fn stream_turn_once(
    bus: &EventBus,
    debate_id: &str,
    provider: &dyn DebateProvider,
    params: &GenerateParams,
    turn_number: usize,
    estimated_input: u64,
) -> Result<GenerateResult> {
    let mut stream = provider.generate_stream(params).await?;
    let mut content = String::new();
    let mut finish_reason = FinishReason::Stop;
    let mut usage: Option<Usage> = None;

    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::Delta { text } => {
                content.push_str(&text);
                bus.emit(
                    debate_id,
                    DebateEvent::TurnStreaming {
                        turn_number,
                        delta: text,
                        content_length: content.len(),
                    },
                );
            }
            StreamChunk::Done {
                finish_reason: fr,
                usage: u,
            } => {
                finish_reason = fr;
                usage = u;
            }
        }
    }

    let usage = usage
        .unwrap_or_else(|| Usage::new(estimated_input, estimate_tokens(&content) as u64));

    Ok(GenerateResult {
        content,
        usage,
        finish_reason,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Interventions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate and inject a moderator intervention without advancing the
/// schedule index.
async fn run_intervention(
    state: &AppState,
    session: &DebateSession,
    sequencer: &mut TurnSequencer,
    usage: &mut DebateUsage,
    violation: &Violation,
) -> Result<()> {
    let config = TurnConfig {
        index: sequencer.state().current_turn_index,
        turn_type: TurnType::ModeratorIntervention,
        speaker: Speaker::Moderator,
        max_tokens: 120,
        min_tokens: None,
        label: "Moderator Intervention".into(),
        description: "The moderator addresses a rule violation and redirects the debate".into(),
    };
    let compiled = prompts::compile(&PromptContext {
        session,
        completed_turns: &sequencer.state().completed_turns,
        current: &config,
        next: sequencer.current_turn(),
        violation: Some(violation),
    })?;

    let provider = state.providers.moderator()?;
    let provider_type = provider.provider_type();
    let estimated_input =
        provider.count_message_tokens(&compiled.system_prompt, &compiled.user_prompt) as u64;
    let reserved = estimated_input + compiled.max_tokens as u64;
    state
        .rate_limiter
        .wait_for_capacity(provider_type, reserved)
        .await;

    let params = GenerateParams {
        system_prompt: compiled.system_prompt,
        user_prompt: compiled.user_prompt,
        max_tokens: compiled.max_tokens,
        temperature: compiled.temperature,
    };
    let result = with_retry(&state.retry, |_attempt| provider.generate(&params)).await?;
    state
        .rate_limiter
        .consume_capacity(provider_type, reserved, result.usage.total_tokens);

    let turn = Turn::new(
        session.id.clone(),
        config.clone(),
        provider_type,
        result.content.clone(),
        result.usage.output_tokens as u32,
        Utc::now(),
    );
    let turn_id = turn.id;
    sequencer.insert_intervention(turn)?;
    state
        .store
        .put_engine_state(sequencer.state(), session.expires_at)
        .await?;
    state
        .budget
        .record_usage(usage, turn_id, provider_type, result.usage);
    state.store.put_usage(usage, session.expires_at).await?;

    state.bus.emit(
        &session.id,
        DebateEvent::Intervention {
            turn_number: config.index + 1,
            content: result.content,
        },
    );
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Completion and failure paths
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Emit the terminal event, flip the session status, and kick off the
/// judge for completed debates.
async fn finalize(state: &AppState, debate_id: &str, engine: &EngineState) -> Result<()> {
    let usage = state.store.get_usage(debate_id).await?.unwrap_or_else(|| {
        DebateUsage::new(debate_id.to_string(), 0)
    });

    match engine.status {
        EngineStatus::Completed => {
            state
                .store
                .update_session(debate_id, |s| s.status = SessionStatus::Completed)
                .await?;
            state.bus.emit(
                debate_id,
                DebateEvent::DebateCompleted {
                    total_turns: engine.completed_turns.len(),
                    total_tokens: usage.total_tokens,
                    cost_usd: usage.cost_usd,
                },
            );

            // Judge eagerly in the background; failures only log.
            let state = state.clone();
            let debate_id = debate_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = compute_judge_analysis(&state, &debate_id, false).await {
                    tracing::warn!(debate_id = %debate_id, error = %e, "background judge run failed");
                }
            });
        }
        EngineStatus::Cancelled => {
            // A cancelled debate is over; the record completes so the
            // transcript and assignment become visible.
            state
                .store
                .update_session(debate_id, |s| s.status = SessionStatus::Completed)
                .await?;
            state.bus.emit(
                debate_id,
                DebateEvent::DebateCancelled {
                    reason: engine
                        .cancel_reason
                        .clone()
                        .unwrap_or_else(|| "cancelled".into()),
                    completed_turns: engine.completed_turns.len(),
                },
            );
        }
        EngineStatus::Error => {
            state
                .store
                .update_session(debate_id, |s| s.status = SessionStatus::Error)
                .await?;
        }
        other => {
            tracing::warn!(status = other.as_str(), "finalize called on non-terminal state");
        }
    }
    Ok(())
}

/// Last-resort failure path for loop errors that escaped the per-turn
/// handling (store outages, programmer errors).
async fn fail_debate(state: &AppState, debate_id: &str, message: &str) {
    state
        .bus
        .emit(debate_id, DebateEvent::DebateError {
            message: message.to_string(),
        });

    let flip = async {
        let session = state.store.get_session(debate_id).await?;
        let Some(session) = session else {
            return Ok::<_, Error>(());
        };
        if let Some(engine) = state.store.get_engine_state(debate_id).await? {
            let mut sequencer = TurnSequencer::from_state(engine);
            if !sequencer.state().is_terminal() {
                sequencer.set_error(message)?;
                state
                    .store
                    .put_engine_state(sequencer.state(), session.expires_at)
                    .await?;
            }
        }
        state
            .store
            .update_session(debate_id, |s| s.status = SessionStatus::Error)
            .await?;
        Ok(())
    };
    if let Err(e) = flip.await {
        tracing::error!(error = %e, "failed to mark debate errored");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Judge
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute (or fetch) the judge analysis for a completed debate.
pub async fn compute_judge_analysis(
    state: &AppState,
    debate_id: &str,
    force: bool,
) -> Result<Arc<JudgeAnalysis>> {
    if !force {
        if let Some(cached) = state.judge_cache.get(debate_id) {
            return Ok(cached);
        }
    }

    let session = state
        .store
        .get_session(debate_id)
        .await?
        .ok_or_else(|| Error::SessionNotFound(debate_id.to_string()))?;
    if session.status != SessionStatus::Completed {
        return Err(Error::Other(
            "judge analysis is only available once the debate completes".into(),
        ));
    }
    let engine = state
        .store
        .get_engine_state(debate_id)
        .await?
        .ok_or_else(|| Error::SessionNotFound(debate_id.to_string()))?;

    let (system_prompt, user_prompt) = judge::build_judge_prompt(&session, &engine.completed_turns);
    let provider = state.providers.moderator()?;
    let provider_type = provider.provider_type();
    let estimated_input = provider.count_message_tokens(&system_prompt, &user_prompt) as u64;
    let reserved = estimated_input + judge::JUDGE_MAX_TOKENS as u64;
    state
        .rate_limiter
        .wait_for_capacity(provider_type, reserved)
        .await;

    let params = GenerateParams {
        system_prompt,
        user_prompt,
        max_tokens: judge::JUDGE_MAX_TOKENS,
        temperature: judge::JUDGE_TEMPERATURE,
    };
    let result = with_retry(&state.retry, |_attempt| provider.generate(&params)).await?;
    state
        .rate_limiter
        .consume_capacity(provider_type, reserved, result.usage.total_tokens);

    let analysis = judge::parse_judge_response(debate_id, &result.content);
    Ok(state.judge_cache.insert(analysis))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The provider for a speaker: Anthropic moderates; debaters use the
/// hidden-assignment model.
fn provider_for(
    state: &AppState,
    session: &DebateSession,
    speaker: Speaker,
) -> Result<Arc<dyn DebateProvider>> {
    match speaker {
        Speaker::Moderator => state.providers.moderator(),
        debater => state
            .providers
            .get(session.assignment.model_for(debater).provider()),
    }
}

/// Apply the configured per-turn output cap, when set.
fn capped_max_tokens(state: &AppState, compiled_max: u32) -> u32 {
    match state.config.budget.max_tokens_per_turn {
        Some(cap) => compiled_max.min(cap),
        None => compiled_max,
    }
}
