//! End-of-discussion statistics.

use std::time::Duration;

use crate::state::{DiscussionState, Speaker};

/// Statistics derived from a terminal discussion state.
#[derive(Debug, Clone)]
pub struct DiscussionSummary {
    /// Number of recorded turns.
    pub total_rounds: u32,
    /// Human-readable end reason.
    pub end_reason: String,
    /// Winning speaker, set only on concession.
    pub winner: Option<Speaker>,
    /// Wall-clock span between the first and last recorded turn.
    pub duration: Duration,
    /// Generation calls made by the responder over the session.
    pub responder_calls: u64,
}

impl DiscussionSummary {
    /// Compact one-line form for logs.
    pub fn summary_line(&self) -> String {
        let outcome = match self.winner {
            Some(winner) => format!("winner {winner}"),
            None => "no winner".to_string(),
        };
        format!(
            "[{}] {} rounds | {} | {} responder calls",
            self.end_reason, self.total_rounds, outcome, self.responder_calls
        )
    }
}

/// Compute statistics for an ended discussion.
///
/// Duration is floored at zero: an empty history yields `Duration::ZERO`.
pub fn summarize(state: &DiscussionState, responder_calls: u64) -> DiscussionSummary {
    let turns = state.turns();
    let duration = match (turns.first(), turns.last()) {
        (Some(first), Some(last)) => last
            .recorded_at
            .saturating_duration_since(first.recorded_at),
        _ => Duration::ZERO,
    };
    DiscussionSummary {
        total_rounds: turns.len() as u32,
        end_reason: state
            .end_reason()
            .map(|reason| reason.to_string())
            .unwrap_or_default(),
        winner: state.winner(),
        duration,
        responder_calls,
    }
}
