//! Prompt assembly — validated variable substitution and situational context.
//!
//! Templates reference variables as `{name}`. The variable set is closed and
//! enumerable ([`PROMPT_VARIABLES`]); validation collects every unbound name
//! before any substitution happens, so a misconfigured template fails with
//! the complete list rather than the first lookup miss.

use serde::{Deserialize, Serialize};

use crate::error::DiscussionError;
use crate::state::Turn;

/// The closed set of variable names a prompt template may reference.
pub const PROMPT_VARIABLES: &[&str] = &[
    "topic",
    "current_round",
    "max_rounds",
    "style",
    "rationality",
    "opponent_reply",
    "context",
];

/// Default template for speaker A. Overridable via configuration; any
/// replacement must draw its placeholders from [`PROMPT_VARIABLES`].
pub const DEFAULT_TEMPLATE_A: &str = "\
You are AI-A, one of two debaters in a structured discussion.

Topic: {topic}
Your speaking style: {style}
Rationality level: {rationality}/10
Round: {current_round}/{max_rounds}

Rules:
1. Keep each reply to two or three sentences.
2. Argue at the requested rationality level; higher means more objective.
3. Do not repeat points you have already made.
4. If you cannot keep arguing effectively, say \"I concede\" to end the discussion.

{context}

Your reply:";

/// Default template for speaker B.
pub const DEFAULT_TEMPLATE_B: &str = "\
You are AI-B, one of two debaters in a structured discussion.

Topic: {topic}
Your speaking style: {style}
Rationality level: {rationality}/10
Round: {current_round}/{max_rounds}

Rules:
1. Keep each reply to two or three sentences.
2. Argue at the requested rationality level; higher means more objective.
3. Do not repeat points you have already made.
4. If you cannot keep arguing effectively, say \"I concede\" to end the discussion.

{context}

Your reply:";

/// A bound mapping from variable names to values.
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    values: Vec<(&'static str, String)>,
}

impl PromptVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`. Names must come from [`PROMPT_VARIABLES`].
    pub fn set(mut self, name: &'static str, value: impl Into<String>) -> Self {
        debug_assert!(PROMPT_VARIABLES.contains(&name), "unknown variable {name}");
        self.values.retain(|(existing, _)| *existing != name);
        self.values.push((name, value.into()));
        self
    }

    /// Look up a bound value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A prompt template with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate {
    text: String,
}

/// One scanned piece of a template: literal text or a `{name}` reference.
enum Piece<'a> {
    Literal(&'a str),
    Var(&'a str),
}

fn is_var_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn pieces(text: &str) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        if open > 0 {
            out.push(Piece::Literal(&rest[..open]));
        }
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_var_name(&after[..close]) => {
                out.push(Piece::Var(&after[..close]));
                rest = &after[close + 1..];
            }
            _ => {
                // A brace that opens no well-formed placeholder is literal.
                out.push(Piece::Literal(&rest[open..=open]));
                rest = &rest[open + 1..];
            }
        }
    }
    if !rest.is_empty() {
        out.push(Piece::Literal(rest));
    }
    out
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Placeholder names referenced by the template, in order of first
    /// appearance, deduplicated.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for piece in pieces(&self.text) {
            if let Piece::Var(name) = piece {
                if !seen.contains(&name) {
                    seen.push(name);
                }
            }
        }
        seen
    }

    /// Check that every referenced placeholder belongs to the closed
    /// variable set. Collects all offenders.
    pub fn validate_names(&self) -> Result<(), DiscussionError> {
        let missing: Vec<String> = self
            .placeholders()
            .into_iter()
            .filter(|name| !PROMPT_VARIABLES.contains(name))
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DiscussionError::MissingVariables { missing })
        }
    }

    /// Check that every referenced placeholder is bound in `vars`.
    /// Collects all unbound names.
    pub fn validate(&self, vars: &PromptVars) -> Result<(), DiscussionError> {
        let missing: Vec<String> = self
            .placeholders()
            .into_iter()
            .filter(|name| vars.get(name).is_none())
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DiscussionError::MissingVariables { missing })
        }
    }

    /// Render the template. Validation runs first, so a partial result is
    /// never produced.
    pub fn render(&self, vars: &PromptVars) -> Result<String, DiscussionError> {
        self.validate(vars)?;
        let mut out = String::with_capacity(self.text.len());
        for piece in pieces(&self.text) {
            match piece {
                Piece::Literal(literal) => out.push_str(literal),
                // validated above, so the lookup cannot miss
                Piece::Var(name) => out.push_str(vars.get(name).unwrap_or_default()),
            }
        }
        Ok(out)
    }
}

/// Coarse phase label for a round: opening exchanges, the middle game, or
/// the late phase where repetition becomes a risk.
pub fn phase_label(round: u32) -> &'static str {
    match round {
        0..=2 => "early",
        3..=4 => "mid",
        _ => "late",
    }
}

/// Build the free-text situational block for a turn.
///
/// Round 1 gets a fixed opener; later rounds quote the opponent's latest
/// reply and restate the ways the speaker may respond.
pub fn situational_context(round: u32, last_turn: Option<&Turn>) -> String {
    match last_turn {
        Some(turn) if round >= 2 => format!(
            "This is round {round} of the discussion ({} phase).\n\n\
             Your opponent {} replied:\n{}\n\n\
             Respond to their argument. You may rebut it, bring new evidence, \
             or point out flaws in their logic. If you cannot keep arguing \
             effectively, concede.",
            phase_label(round),
            turn.speaker,
            turn.text,
        ),
        _ => "This is the beginning of the discussion. Open with your position on the topic."
            .to_string(),
    }
}
