//! The turn sequencer: schedule generation plus the finite-state
//! machine that advances a debate through it.
//!
//! The schedule is a pure function of (format, debater turn count).
//! The FSM's alphabet is start / record_turn / insert_intervention /
//! pause / resume / cancel / set_error; its state is the persistent
//! [`EngineState`], so serializing the sequencer is serializing its
//! state.

use chrono::Utc;

use da_domain::error::{Error, Result};
use da_domain::session::DebateFormat;
use da_domain::state::{EngineState, EngineStatus};
use da_domain::turn::{Speaker, Turn, TurnConfig, TurnType, Violation, ViolationSeverity};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Schedule generation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-type output budget in tokens.
fn default_max_tokens(turn_type: TurnType) -> u32 {
    match turn_type {
        TurnType::Opening => 700,
        TurnType::Constructive => 800,
        TurnType::Rebuttal => 700,
        TurnType::CrossExamination => 500,
        TurnType::Closing => 600,
        TurnType::ModeratorIntro => 400,
        TurnType::ModeratorTransition => 150,
        TurnType::ModeratorIntervention => 120,
        TurnType::ModeratorSummary => 500,
    }
}

fn min_tokens(turn_type: TurnType) -> Option<u32> {
    turn_type.is_debater().then_some(50)
}

fn label_for(turn_type: TurnType, speaker: Speaker) -> String {
    match speaker {
        Speaker::Moderator => match turn_type {
            TurnType::ModeratorIntro => "Moderator Introduction".into(),
            TurnType::ModeratorTransition => "Moderator Transition".into(),
            TurnType::ModeratorIntervention => "Moderator Intervention".into(),
            TurnType::ModeratorSummary => "Moderator Summary".into(),
            other => format!("Moderator {}", other.as_str()),
        },
        debater => {
            let side = match debater {
                Speaker::For => "FOR",
                Speaker::Against => "AGAINST",
                Speaker::Moderator => unreachable!(),
            };
            let kind = match turn_type {
                TurnType::Opening => "Opening Statement",
                TurnType::Constructive => "Constructive Argument",
                TurnType::Rebuttal => "Rebuttal",
                TurnType::CrossExamination => "Cross-Examination",
                TurnType::Closing => "Closing Statement",
                other => other.as_str(),
            };
            format!("{kind} ({side})")
        }
    }
}

fn description_for(turn_type: TurnType, speaker: Speaker) -> String {
    match turn_type {
        TurnType::ModeratorIntro => "The moderator opens the debate and frames the topic".into(),
        TurnType::ModeratorTransition => "The moderator hands the floor to the next speaker".into(),
        TurnType::ModeratorIntervention => {
            "The moderator addresses a rule violation and redirects the debate".into()
        }
        TurnType::ModeratorSummary => "The moderator recaps both sides without judging".into(),
        debater_type => {
            let side = if speaker == Speaker::For {
                "FOR"
            } else {
                "AGAINST"
            };
            match debater_type {
                TurnType::Opening => format!("The {side} side presents its position"),
                TurnType::Constructive => format!("The {side} side builds out its case"),
                TurnType::Rebuttal => format!("The {side} side answers the opposing arguments"),
                TurnType::CrossExamination => {
                    format!("The {side} side probes the opposing case directly")
                }
                TurnType::Closing => format!("The {side} side makes its final appeal"),
                _ => unreachable!("moderator types handled above"),
            }
        }
    }
}

/// Debater turn types for a given count, before format adjustments.
fn debater_types(n: u8) -> Vec<TurnType> {
    use TurnType::*;
    match n {
        2 => vec![Opening, Opening],
        4 => vec![Opening, Opening, Closing, Closing],
        6 => vec![Opening, Opening, Rebuttal, Rebuttal, Closing, Closing],
        8 => vec![
            Opening,
            Opening,
            Constructive,
            Constructive,
            Rebuttal,
            Rebuttal,
            Closing,
            Closing,
        ],
        10 => vec![
            Opening,
            Opening,
            Constructive,
            Constructive,
            Rebuttal,
            Rebuttal,
            Rebuttal,
            Rebuttal,
            Closing,
            Closing,
        ],
        _ => unreachable!("turn count validated before schedule generation"),
    }
}

/// Generate the full ordered schedule for a debate.
///
/// Layout: moderator intro, then the debater turns (FOR on even debater
/// index, AGAINST on odd) with a moderator transition before every
/// debater turn after the first, then the moderator summary.
///
/// The Oxford format swaps the first rebuttal pair for a
/// cross-examination pair (it follows the first constructive pair, and
/// keeps the debater turn count at exactly `n`). Lincoln–Douglas uses
/// the standard layout; its character lives in the prompts.
pub fn generate_turn_sequence(format: DebateFormat, n: u8) -> Result<Vec<TurnConfig>> {
    if !matches!(n, 2 | 4 | 6 | 8 | 10) {
        return Err(Error::ValidationRejected {
            errors: vec![format!("turn count must be one of [2, 4, 6, 8, 10], got {n}")],
        });
    }

    let mut types = debater_types(n);
    if format == DebateFormat::Oxford && n >= 8 {
        // The rebuttal pair right after the constructives becomes the
        // cross-examination pair.
        let first_rebuttal = types
            .iter()
            .position(|t| *t == TurnType::Rebuttal)
            .expect("n >= 8 schedules contain rebuttals");
        types[first_rebuttal] = TurnType::CrossExamination;
        types[first_rebuttal + 1] = TurnType::CrossExamination;
    }

    let mut sequence = Vec::with_capacity(types.len() * 2 + 2);
    let mut push = |seq: &mut Vec<TurnConfig>, turn_type: TurnType, speaker: Speaker| {
        let index = seq.len();
        seq.push(TurnConfig {
            index,
            turn_type,
            speaker,
            max_tokens: default_max_tokens(turn_type),
            min_tokens: min_tokens(turn_type),
            label: label_for(turn_type, speaker),
            description: description_for(turn_type, speaker),
        });
    };

    push(&mut sequence, TurnType::ModeratorIntro, Speaker::Moderator);
    for (i, turn_type) in types.into_iter().enumerate() {
        if i > 0 {
            push(
                &mut sequence,
                TurnType::ModeratorTransition,
                Speaker::Moderator,
            );
        }
        let speaker = if i % 2 == 0 {
            Speaker::For
        } else {
            Speaker::Against
        };
        push(&mut sequence, turn_type, speaker);
    }
    push(&mut sequence, TurnType::ModeratorSummary, Speaker::Moderator);

    Ok(sequence)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sequencer FSM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct TurnSequencer {
    state: EngineState,
}

impl TurnSequencer {
    /// Fresh sequencer with a newly generated schedule.
    pub fn new(session_id: impl Into<String>, format: DebateFormat, n: u8) -> Result<Self> {
        let sequence = generate_turn_sequence(format, n)?;
        Ok(Self {
            state: EngineState::new(session_id, sequence),
        })
    }

    /// Re-hydrate from persisted state (crash recovery / resume).
    pub fn from_state(state: EngineState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn into_state(self) -> EngineState {
        self.state
    }

    pub fn status(&self) -> EngineStatus {
        self.state.status
    }

    pub fn current_turn(&self) -> Option<&TurnConfig> {
        self.state.current_turn()
    }

    pub fn next_turn(&self) -> Option<&TurnConfig> {
        self.state.next_turn()
    }

    fn illegal(&self, action: &str) -> Error {
        Error::IllegalTransition {
            from: self.state.status.as_str().to_string(),
            action: action.to_string(),
        }
    }

    /// initialized → in_progress.
    pub fn start(&mut self) -> Result<()> {
        match self.state.status {
            EngineStatus::Initialized => {
                self.state.status = EngineStatus::InProgress;
                self.state.started_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(self.illegal("start")),
        }
    }

    /// Record a completed scheduled turn and advance the index.
    ///
    /// Token-count violations against the config's bounds are attached
    /// to the stored turn as warnings (returned for event emission),
    /// never blockers. Reaching the end of the schedule transitions to
    /// completed.
    pub fn record_turn(&mut self, mut turn: Turn) -> Result<Vec<Violation>> {
        if self.state.status != EngineStatus::InProgress {
            return Err(self.illegal("record_turn"));
        }
        let Some(current) = self.state.current_turn() else {
            return Err(Error::NoCurrentTurn(self.state.session_id.clone()));
        };
        if turn.speaker != current.speaker {
            return Err(Error::SpeakerMismatch {
                expected: current.speaker,
                got: turn.speaker,
            });
        }

        let warnings = token_violations(&turn, current);
        turn.violations.extend(warnings.iter().cloned());

        self.state.completed_turns.push(turn);
        self.state.current_turn_index += 1;

        if self.state.current_turn_index == self.state.turn_sequence.len() {
            self.state.status = EngineStatus::Completed;
            self.state.completed_at = Some(Utc::now());
        }

        Ok(warnings)
    }

    /// Inject a moderator intervention between scheduled turns without
    /// advancing the index.
    pub fn insert_intervention(&mut self, turn: Turn) -> Result<()> {
        if self.state.status != EngineStatus::InProgress {
            return Err(self.illegal("insert_intervention"));
        }
        if turn.config.turn_type != TurnType::ModeratorIntervention {
            return Err(Error::IllegalTransition {
                from: self.state.status.as_str().to_string(),
                action: format!(
                    "insert_intervention with turn type {}",
                    turn.config.turn_type.as_str()
                ),
            });
        }
        self.state.completed_turns.push(turn);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        match self.state.status {
            EngineStatus::InProgress => {
                self.state.status = EngineStatus::Paused;
                Ok(())
            }
            _ => Err(self.illegal("pause")),
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        match self.state.status {
            EngineStatus::Paused => {
                self.state.status = EngineStatus::InProgress;
                Ok(())
            }
            _ => Err(self.illegal("resume")),
        }
    }

    /// Terminal from any non-terminal state.
    pub fn cancel(&mut self, reason: &str) -> Result<()> {
        if self.state.status.is_terminal() {
            return Err(self.illegal("cancel"));
        }
        self.state.status = EngineStatus::Cancelled;
        self.state.cancel_reason = Some(reason.to_string());
        self.state.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Terminal from any non-terminal state.
    pub fn set_error(&mut self, message: &str) -> Result<()> {
        if self.state.status.is_terminal() {
            return Err(self.illegal("set_error"));
        }
        self.state.status = EngineStatus::Error;
        self.state.error = Some(message.to_string());
        self.state.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Token-count warnings against the scheduled bounds.
fn token_violations(turn: &Turn, config: &TurnConfig) -> Vec<Violation> {
    let mut violations = Vec::new();
    if turn.token_count > config.max_tokens {
        violations.push(Violation {
            rule: "max_tokens".into(),
            severity: ViolationSeverity::Minor,
            detail: format!(
                "turn produced {} tokens, budget was {}",
                turn.token_count, config.max_tokens
            ),
        });
    }
    if let Some(min) = config.min_tokens {
        if turn.token_count < min {
            violations.push(Violation {
                rule: "min_tokens".into(),
                severity: ViolationSeverity::Minor,
                detail: format!(
                    "turn produced {} tokens, minimum was {}",
                    turn.token_count, min
                ),
            });
        }
    }
    violations
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
