//! End-condition policies — concession detection, round limits, and
//! repetition-based stalemate analysis.
//!
//! Both matchers are deliberately simple pattern checks, not NLP. The
//! phrase set, inspection window, ratio threshold, and sentence-terminator
//! characters are all tunable so deployments can adjust them (including
//! for other locales) without touching the engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::state::{EndReason, Turn};

/// Detects an utterance that yields the debate.
///
/// Matches any configured phrase as a case-insensitive substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcessionPolicy {
    /// Phrases interpreted as giving up.
    pub phrases: Vec<String>,
}

impl Default for ConcessionPolicy {
    fn default() -> Self {
        Self {
            phrases: [
                "I lose",
                "I concede",
                "I admit",
                "you are right",
                "I cannot refute",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ConcessionPolicy {
    /// Whether `text` contains any concession phrase.
    pub fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.phrases
            .iter()
            .any(|phrase| lowered.contains(&phrase.to_lowercase()))
    }
}

/// Flags a stalemate when recent turns keep repeating the same sentences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepetitionPolicy {
    /// How many of the most recent turns to inspect. The policy stays
    /// silent until the history holds at least this many turns.
    pub window: usize,
    /// Repetition ratio above which the discussion is a stalemate.
    pub threshold: f64,
    /// Characters treated as sentence terminators when segmenting replies.
    pub terminators: String,
}

impl Default for RepetitionPolicy {
    fn default() -> Self {
        Self {
            window: 6,
            threshold: 0.5,
            terminators: ".!?。！？".to_string(),
        }
    }
}

impl RepetitionPolicy {
    /// Split a reply into trimmed, non-empty sentence-like segments.
    fn segments<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        text.split(|c: char| self.terminators.contains(c))
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
    }

    /// Fraction of duplicated segments across `texts`: `1 - distinct/total`.
    /// Zero when no segments are found.
    pub fn repetition_ratio<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> f64 {
        let mut total = 0usize;
        let mut distinct: HashSet<&str> = HashSet::new();
        for text in texts {
            for segment in self.segments(text) {
                total += 1;
                distinct.insert(segment);
            }
        }
        if total == 0 {
            0.0
        } else {
            1.0 - (distinct.len() as f64 / total as f64)
        }
    }

    /// Whether the most recent turns constitute a stalemate.
    pub fn is_stalemate(&self, history: &[Turn]) -> bool {
        if history.len() < self.window {
            return false;
        }
        let recent = &history[history.len() - self.window..];
        self.repetition_ratio(recent.iter().map(|turn| turn.text.as_str())) > self.threshold
    }
}

/// Priority-ordered end-condition evaluation applied after every turn.
///
/// First match wins: concession, then the round limit, then repetition.
/// Later conditions are not checked once an earlier one fires.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndConditions {
    pub concession: ConcessionPolicy,
    pub repetition: RepetitionPolicy,
}

impl EndConditions {
    /// Evaluate after the last turn in `history` was recorded.
    pub fn evaluate(&self, history: &[Turn], max_rounds: u32) -> Option<EndReason> {
        let turn = history.last()?;
        if self.concession.matches(&turn.text) {
            return Some(EndReason::Concession { by: turn.speaker });
        }
        if turn.round >= max_rounds {
            return Some(EndReason::RoundLimit);
        }
        if self.repetition.is_stalemate(history) {
            return Some(EndReason::Stalemate);
        }
        None
    }
}
