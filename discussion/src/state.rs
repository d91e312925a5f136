//! Discussion state — speakers, turns, phases, and the session record.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// One of the two debaters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    A,
    B,
}

impl Speaker {
    /// The opposing debater.
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Speaker for a given round: odd rounds belong to A, even rounds to B.
    pub fn for_round(round: u32) -> Self {
        if round % 2 == 0 {
            Self::B
        } else {
            Self::A
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "AI-A"),
            Self::B => write!(f, "AI-B"),
        }
    }
}

/// One recorded reply by one speaker in a given round.
///
/// Immutable once recorded and owned exclusively by the session history.
/// The timestamp is a monotonic instant so elapsed-time math is immune to
/// wall-clock adjustments.
#[derive(Debug, Clone)]
pub struct Turn {
    /// Round number, 1-indexed.
    pub round: u32,
    /// Who spoke.
    pub speaker: Speaker,
    /// The reply text, after the length policy was applied.
    pub text: String,
    /// When the turn was recorded.
    pub recorded_at: Instant,
}

/// Phase of a discussion session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionPhase {
    /// Session created but not started.
    #[default]
    NotStarted,
    /// Turns are being produced.
    Running,
    /// An end condition fired — terminal.
    Ended,
}

impl DiscussionPhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended)
    }

    /// Valid transitions from this phase. `Running` self-loops on each turn
    /// without an explicit transition.
    pub fn valid_transitions(self) -> &'static [DiscussionPhase] {
        match self {
            Self::NotStarted => &[Self::Running],
            Self::Running => &[Self::Ended],
            Self::Ended => &[],
        }
    }
}

impl fmt::Display for DiscussionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Running => write!(f, "running"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Why a discussion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// A speaker yielded the debate.
    Concession {
        /// The speaker who conceded. The opponent wins.
        by: Speaker,
    },
    /// The configured round limit was reached.
    RoundLimit,
    /// Recent turns repeated too much content.
    Stalemate,
    /// The responder failed mid-session.
    Failure(String),
    /// Cooperative cancellation between turns.
    Cancelled,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concession { by } => write!(f, "{by} conceded"),
            Self::RoundLimit => write!(f, "round limit reached"),
            Self::Stalemate => write!(f, "stalemate: repeated content"),
            Self::Failure(cause) => write!(f, "discussion failed: {cause}"),
            Self::Cancelled => write!(f, "cancelled by user"),
        }
    }
}

/// Error for invalid phase transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: DiscussionPhase,
    pub to: DiscussionPhase,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transition {} → {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

/// A discussion session: phase, ordered append-only history, and outcome.
///
/// Only the engine mutates this; external readers either borrow the
/// immutable turn slice or take a [`snapshot`](Self::snapshot) to carry
/// across threads.
#[derive(Debug, Clone, Default)]
pub struct DiscussionState {
    phase: DiscussionPhase,
    history: Vec<Turn>,
    current_round: u32,
    winner: Option<Speaker>,
    end_reason: Option<EndReason>,
}

impl DiscussionState {
    /// Create an empty session in `NotStarted`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> DiscussionPhase {
        self.phase
    }

    /// Whether the session has ended.
    pub fn is_ended(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Round number of the most recent turn (0 before round 1).
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// The winning speaker, set only on concession.
    pub fn winner(&self) -> Option<Speaker> {
        self.winner
    }

    /// Why the session ended, once terminal.
    pub fn end_reason(&self) -> Option<&EndReason> {
        self.end_reason.as_ref()
    }

    /// Borrow the recorded turns in round order.
    pub fn turns(&self) -> &[Turn] {
        &self.history
    }

    /// The most recently recorded turn.
    pub fn last_turn(&self) -> Option<&Turn> {
        self.history.last()
    }

    /// Owned copy of the history for readers outside the engine's thread.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.history.clone()
    }

    /// Attempt a phase transition, rejecting edges not in the table.
    pub fn transition(&mut self, to: DiscussionPhase) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
            });
        }
        tracing::debug!(from = %self.phase, to = %to, "phase transition");
        self.phase = to;
        Ok(())
    }

    /// Append a fully built turn. Rounds must arrive in order.
    pub(crate) fn record(&mut self, turn: Turn) {
        debug_assert_eq!(turn.round, self.current_round + 1);
        self.current_round = turn.round;
        self.history.push(turn);
    }

    /// Set the terminal outcome. Must follow a transition to `Ended`.
    pub(crate) fn set_outcome(&mut self, reason: EndReason, winner: Option<Speaker>) {
        self.end_reason = Some(reason);
        self.winner = winner;
    }
}
