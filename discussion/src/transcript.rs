//! Transcript rendering and parsing.
//!
//! The transcript is a plain-text document: a header with the session
//! parameters, one `Round N - AI-x:` block per turn in round order, and a
//! trailing summary block. `parse_rounds` recovers the ordered
//! `(round, speaker, text)` tuples from a rendered transcript.

use std::fmt::Write as _;

use crate::engine::DiscussionConfig;
use crate::state::{DiscussionState, Speaker};
use crate::summary::DiscussionSummary;

const RULE: &str = "==================================================";

/// Render a terminal discussion into the transcript format.
pub fn render(
    config: &DiscussionConfig,
    state: &DiscussionState,
    summary: &DiscussionSummary,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "AI Discussion Transcript");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Topic: {}", config.topic);
    let _ = writeln!(out, "Rationality: {}/10", config.rationality);
    let _ = writeln!(out, "AI-A style: {}", config.style_a);
    let _ = writeln!(out, "AI-B style: {}", config.style_b);
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);

    for turn in state.turns() {
        let _ = writeln!(out, "Round {} - {}:", turn.round, turn.speaker);
        let _ = writeln!(out, "{}", turn.text);
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "Total rounds: {}", summary.total_rounds);
    let _ = writeln!(out, "End reason: {}", summary.end_reason);
    if let Some(winner) = summary.winner {
        let _ = writeln!(out, "Winner: {winner}");
    }
    let _ = writeln!(out, "Responder calls: {}", summary.responder_calls);
    out
}

fn parse_header(line: &str) -> Option<(u32, Speaker)> {
    let rest = line.strip_prefix("Round ")?;
    let (number, rest) = rest.split_once(" - ")?;
    let round = number.parse().ok()?;
    let speaker = match rest.strip_suffix(':')? {
        "AI-A" => Speaker::A,
        "AI-B" => Speaker::B,
        _ => return None,
    };
    Some((round, speaker))
}

/// Recover the ordered `(round, speaker, text)` tuples from a transcript.
///
/// Lines outside round blocks (the header and summary sections) are
/// ignored; a separator rule ends the block list.
pub fn parse_rounds(transcript: &str) -> Vec<(u32, Speaker, String)> {
    fn flush(
        current: &mut Option<(u32, Speaker, Vec<&str>)>,
        rounds: &mut Vec<(u32, Speaker, String)>,
    ) {
        if let Some((round, speaker, lines)) = current.take() {
            let text = lines.join("\n").trim_end().to_string();
            rounds.push((round, speaker, text));
        }
    }

    let mut rounds = Vec::new();
    let mut current: Option<(u32, Speaker, Vec<&str>)> = None;

    for line in transcript.lines() {
        if let Some((round, speaker)) = parse_header(line) {
            flush(&mut current, &mut rounds);
            current = Some((round, speaker, Vec::new()));
        } else if !line.is_empty() && line.chars().all(|c| c == '=') {
            flush(&mut current, &mut rounds);
        } else if let Some((_, _, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    flush(&mut current, &mut rounds);
    rounds
}
