//! Moderator prompt variants: intro, transition, intervention, summary.

use da_domain::turn::ViolationSeverity;

use super::{custom_rules_block, side_label, type_label, CompiledPrompt, PromptContext};

const MODERATOR_SYSTEM: &str = "You are the neutral moderator of a structured debate between \
two AI debaters arguing opposite sides of a topic. You never take a position, never evaluate \
argument quality, and never hint at which side is stronger. You keep the debate orderly, \
courteous, and on topic.";

/// The debate-opening introduction.
pub(super) fn intro(ctx: &PromptContext<'_>) -> CompiledPrompt {
    let session = ctx.session;
    let structure = describe_structure(ctx);
    let first_speaker = side_label(
        ctx.next
            .map(|n| n.speaker)
            .unwrap_or(da_domain::turn::Speaker::For),
    );

    let user_prompt = format!(
        "Open a debate on the topic: \"{topic}\"\n\n\
         Format: {format}. There will be {n} debater turns in total.\n\
         Turn structure: {structure}.\n\
         {rules}\n\
         Welcome the audience, restate the topic in your own words, explain the format and \
         turn structure briefly, and state that the {first_speaker} side speaks first. \
         End with a complete closing sentence inviting the {first_speaker} side to begin.",
        topic = session.topic,
        format = session.format.as_str(),
        n = session.turn_count,
        structure = structure,
        rules = custom_rules_block(session),
        first_speaker = first_speaker,
    );

    CompiledPrompt {
        system_prompt: MODERATOR_SYSTEM.to_string(),
        user_prompt,
        max_tokens: ctx.current.max_tokens,
        temperature: 0.7,
    }
}

/// The hand-off between debater turns.
pub(super) fn transition(ctx: &PromptContext<'_>) -> CompiledPrompt {
    let previous = ctx
        .completed_turns
        .iter()
        .rev()
        .find(|t| t.speaker.is_debater());
    let (prev_side, prev_type) = previous
        .map(|t| (side_label(t.speaker), type_label(t.config.turn_type)))
        .unwrap_or(("FOR", "opening statement"));

    let (next_side, next_type) = ctx
        .next
        .map(|n| (side_label(n.speaker), type_label(n.turn_type)))
        .unwrap_or(("AGAINST", "opening statement"));

    let user_prompt = format!(
        "The {prev_side} side has just finished its {prev_type}. \
         Hand the floor to the {next_side} side for its {next_type}. \
         Do not evaluate, praise, or criticize what was said. \
         Keep it to at most 50 words.",
    );

    CompiledPrompt {
        system_prompt: MODERATOR_SYSTEM.to_string(),
        user_prompt,
        max_tokens: ctx.current.max_tokens,
        temperature: 0.5,
    }
}

/// The rule-violation intervention.
pub(super) fn intervention(ctx: &PromptContext<'_>) -> CompiledPrompt {
    let (rule, severity, detail) = ctx
        .violation
        .map(|v| (v.rule.as_str(), v.severity, v.detail.as_str()))
        .unwrap_or(("debate decorum", ViolationSeverity::Minor, "a rule was bent"));

    let tone = match severity {
        ViolationSeverity::Minor => "Gently remind the speakers of the rule",
        ViolationSeverity::Moderate => "Firmly restate the rule and ask for a correction",
        ViolationSeverity::Severe => {
            "Sternly name the rule, make clear it must not happen again"
        }
    };

    let user_prompt = format!(
        "A debate rule was violated: \"{rule}\" ({detail}). \
         {tone}, then redirect the debate back to the topic. \
         Stay strictly neutral between the two sides and do not assign blame beyond \
         what the violation requires.",
    );

    CompiledPrompt {
        system_prompt: MODERATOR_SYSTEM.to_string(),
        user_prompt,
        max_tokens: ctx.current.max_tokens,
        temperature: 0.4,
    }
}

/// The closing summary.
pub(super) fn summary(ctx: &PromptContext<'_>) -> CompiledPrompt {
    let transcript = ctx
        .completed_turns
        .iter()
        .filter(|t| t.speaker.is_debater())
        .map(|t| {
            format!(
                "[{} — {}]\n{}\n",
                side_label(t.speaker),
                type_label(t.config.turn_type),
                t.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let user_prompt = format!(
        "The debate on \"{topic}\" has concluded. Here are the debater turns:\n\n{transcript}\n\
         Give a closing summary that recaps the main arguments of each side, devoting equal \
         attention to both. Do not declare a winner, do not score the sides, and do not state \
         or imply which case was stronger. Thank the participants and close the debate.",
        topic = ctx.session.topic,
    );

    CompiledPrompt {
        system_prompt: MODERATOR_SYSTEM.to_string(),
        user_prompt,
        max_tokens: ctx.current.max_tokens,
        temperature: 0.5,
    }
}

/// One-line description of the debater turn structure for the intro.
fn describe_structure(ctx: &PromptContext<'_>) -> String {
    // The intro compiler runs with the full schedule reachable via the
    // session turn count; describe the canonical phases by count.
    let phases: &[&str] = match ctx.session.turn_count {
        2 => &["opening statements"],
        4 => &["opening statements", "closing statements"],
        6 => &["opening statements", "rebuttals", "closing statements"],
        _ => &[
            "opening statements",
            "constructive arguments",
            "rebuttals",
            "closing statements",
        ],
    };
    phases.join(", then ")
}
