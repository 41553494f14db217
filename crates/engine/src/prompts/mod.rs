//! The prompt compiler.
//!
//! Shapes role-specific system and user prompts from the current
//! debate state. Pure over its inputs; the orchestrator hands it the
//! session, the history, the current turn, a next-turn preview, and
//! any triggering violation.

mod debater;
mod moderator;

use da_domain::error::{Error, Result};
use da_domain::session::DebateSession;
use da_domain::turn::{Speaker, Turn, TurnConfig, TurnType, Violation};

/// A ready-to-send prompt pair with its sampling parameters.
#[derive(Debug, Clone)]
pub struct CompiledPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Everything the compiler reads.
pub struct PromptContext<'a> {
    pub session: &'a DebateSession,
    pub completed_turns: &'a [Turn],
    pub current: &'a TurnConfig,
    pub next: Option<&'a TurnConfig>,
    /// The violation that triggered a moderator intervention, when
    /// compiling one.
    pub violation: Option<&'a Violation>,
}

/// Compile the prompt for the current turn.
pub fn compile(ctx: &PromptContext<'_>) -> Result<CompiledPrompt> {
    match ctx.current.turn_type {
        TurnType::ModeratorIntro => Ok(moderator::intro(ctx)),
        TurnType::ModeratorTransition => Ok(moderator::transition(ctx)),
        TurnType::ModeratorIntervention => Ok(moderator::intervention(ctx)),
        TurnType::ModeratorSummary => Ok(moderator::summary(ctx)),
        _ => match ctx.current.speaker {
            Speaker::Moderator => Err(Error::Other(format!(
                "moderator scheduled for debater turn type {}",
                ctx.current.turn_type.as_str()
            ))),
            _ => Ok(debater::compile(ctx)),
        },
    }
}

/// Speaker label used across prompts: the side, never the model.
pub(crate) fn side_label(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::For => "FOR",
        Speaker::Against => "AGAINST",
        Speaker::Moderator => "MODERATOR",
    }
}

/// Human name of a turn type for prose.
pub(crate) fn type_label(turn_type: TurnType) -> &'static str {
    match turn_type {
        TurnType::Opening => "opening statement",
        TurnType::Constructive => "constructive argument",
        TurnType::Rebuttal => "rebuttal",
        TurnType::CrossExamination => "cross-examination",
        TurnType::Closing => "closing statement",
        TurnType::ModeratorIntro => "introduction",
        TurnType::ModeratorTransition => "transition",
        TurnType::ModeratorIntervention => "intervention",
        TurnType::ModeratorSummary => "summary",
    }
}

/// The custom-rules block, or an empty string when there are none.
pub(crate) fn custom_rules_block(session: &DebateSession) -> String {
    if session.custom_rules.is_empty() {
        return String::new();
    }
    let mut block = String::from("\nCustom rules for this debate:\n");
    for (i, rule) in session.custom_rules.iter().enumerate() {
        block.push_str(&format!("{}. {rule}\n", i + 1));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use da_domain::error::ProviderType;
    use da_domain::session::DebateFormat;
    use da_domain::turn::ViolationSeverity;

    use crate::sequencer::generate_turn_sequence;

    fn session() -> DebateSession {
        DebateSession::new(
            "db_AAAAAAAAAAAAAAAA".into(),
            "Should homework be abolished in primary schools?".into(),
            4,
            DebateFormat::Standard,
            vec!["Cite at least one study".into()],
            Duration::hours(24),
        )
    }

    fn turn(config: &TurnConfig, content: &str) -> Turn {
        Turn::new(
            "db_AAAAAAAAAAAAAAAA",
            config.clone(),
            ProviderType::Anthropic,
            content,
            50,
            Utc::now(),
        )
    }

    #[test]
    fn intro_prompt_states_topic_format_and_first_speaker() {
        let session = session();
        let sequence = generate_turn_sequence(session.format, session.turn_count).unwrap();
        let compiled = compile(&PromptContext {
            session: &session,
            completed_turns: &[],
            current: &sequence[0],
            next: sequence.get(1),
            violation: None,
        })
        .unwrap();

        assert!(compiled.system_prompt.contains("neutral"));
        assert!(compiled.user_prompt.contains(&session.topic));
        assert!(compiled.user_prompt.contains("standard"));
        assert!(compiled.user_prompt.contains("4 debater turns"));
        assert!(compiled.user_prompt.contains("FOR"));
        assert!(compiled.user_prompt.contains("Cite at least one study"));
        assert_eq!(compiled.max_tokens, 400);
        assert!((compiled.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn transition_names_previous_and_next_and_limits_length() {
        let session = session();
        let sequence = generate_turn_sequence(session.format, session.turn_count).unwrap();
        // sequence[2] is the first transition; previous = opening(FOR),
        // next = opening(AGAINST).
        let history = vec![
            turn(&sequence[0], "Welcome to the debate."),
            turn(&sequence[1], "I argue in favor."),
        ];
        let compiled = compile(&PromptContext {
            session: &session,
            completed_turns: &history,
            current: &sequence[2],
            next: Some(&sequence[3]),
            violation: None,
        })
        .unwrap();

        assert!(compiled.user_prompt.contains("FOR"));
        assert!(compiled.user_prompt.contains("AGAINST"));
        assert!(compiled.user_prompt.contains("50 words"));
        assert!(compiled.user_prompt.contains("Do not evaluate"));
        assert_eq!(compiled.max_tokens, 150);
        assert!((compiled.temperature - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn intervention_identifies_the_rule() {
        let session = session();
        let violation = Violation {
            rule: "Cite at least one study".into(),
            severity: ViolationSeverity::Moderate,
            detail: "no sources in the last turn".into(),
        };
        let config = TurnConfig {
            index: 3,
            turn_type: TurnType::ModeratorIntervention,
            speaker: Speaker::Moderator,
            max_tokens: 120,
            min_tokens: None,
            label: "Moderator Intervention".into(),
            description: String::new(),
        };
        let compiled = compile(&PromptContext {
            session: &session,
            completed_turns: &[],
            current: &config,
            next: None,
            violation: Some(&violation),
        })
        .unwrap();

        assert!(compiled.user_prompt.contains("Cite at least one study"));
        assert!((compiled.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(compiled.max_tokens, 120);
    }

    #[test]
    fn summary_forbids_declaring_a_winner() {
        let session = session();
        let sequence = generate_turn_sequence(session.format, session.turn_count).unwrap();
        let summary_config = sequence.last().unwrap();
        let compiled = compile(&PromptContext {
            session: &session,
            completed_turns: &[],
            current: summary_config,
            next: None,
            violation: None,
        })
        .unwrap();

        assert!(compiled.user_prompt.to_lowercase().contains("do not declare a winner"));
        assert_eq!(compiled.max_tokens, 500);
    }

    #[test]
    fn debater_history_elides_moderator_framing_but_keeps_interventions() {
        let session = session();
        let sequence = generate_turn_sequence(session.format, session.turn_count).unwrap();

        let intervention_config = TurnConfig {
            index: 2,
            turn_type: TurnType::ModeratorIntervention,
            speaker: Speaker::Moderator,
            max_tokens: 120,
            min_tokens: None,
            label: "Moderator Intervention".into(),
            description: String::new(),
        };
        let history = vec![
            turn(&sequence[0], "MODERATOR-INTRO-TEXT"),
            turn(&sequence[1], "FOR-OPENING-TEXT"),
            turn(&sequence[2], "MODERATOR-TRANSITION-TEXT"),
            turn(&intervention_config, "INTERVENTION-TEXT"),
        ];

        // Compile for the AGAINST opening (sequence[3]).
        let compiled = compile(&PromptContext {
            session: &session,
            completed_turns: &history,
            current: &sequence[3],
            next: sequence.get(4),
            violation: None,
        })
        .unwrap();

        assert!(compiled.user_prompt.contains("FOR-OPENING-TEXT"));
        assert!(compiled.user_prompt.contains("INTERVENTION-TEXT"));
        assert!(!compiled.user_prompt.contains("MODERATOR-INTRO-TEXT"));
        assert!(!compiled.user_prompt.contains("MODERATOR-TRANSITION-TEXT"));
    }

    #[test]
    fn debater_system_prompt_pins_side_and_topic() {
        let session = session();
        let sequence = generate_turn_sequence(session.format, session.turn_count).unwrap();
        let compiled = compile(&PromptContext {
            session: &session,
            completed_turns: &[],
            current: &sequence[1],
            next: sequence.get(2),
            violation: None,
        })
        .unwrap();

        assert!(compiled.system_prompt.contains("FOR"));
        assert!(compiled.system_prompt.contains(&session.topic));
        assert!(compiled.user_prompt.contains("words"));
        assert!(compiled.temperature >= 0.7 && compiled.temperature <= 0.8);
    }

    #[test]
    fn prompts_never_mention_model_identities() {
        let session = session();
        let sequence = generate_turn_sequence(session.format, session.turn_count).unwrap();
        for config in &sequence {
            let compiled = compile(&PromptContext {
                session: &session,
                completed_turns: &[],
                current: config,
                next: None,
                violation: None,
            })
            .unwrap();
            for text in [&compiled.system_prompt, &compiled.user_prompt] {
                let lower = text.to_lowercase();
                assert!(!lower.contains("chatgpt"));
                assert!(!lower.contains("grok"));
                assert!(!lower.contains("claude"));
            }
        }
    }
}
