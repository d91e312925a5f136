//! Discussion engine — drives the alternating turn loop end-to-end.
//!
//! Ties together the session state, end-condition policies, prompt
//! assembly, and the responder seam. The loop is strictly sequential:
//! each turn's prompt depends on the previous turn's recorded text, so
//! there is never more than one responder call in flight.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DiscussionError;
use crate::policy::EndConditions;
use crate::prompt::{self, PromptTemplate, PromptVars, DEFAULT_TEMPLATE_A, DEFAULT_TEMPLATE_B};
use crate::responder::Responder;
use crate::state::{DiscussionPhase, DiscussionState, EndReason, Speaker, Turn};
use crate::summary::{self, DiscussionSummary};

/// Bounds applied to every responder reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyLimits {
    /// Hard cap in characters; longer replies are truncated with a
    /// trailing ellipsis.
    pub max_chars: usize,
    /// Replies shorter than this are logged but kept.
    pub min_chars: usize,
}

impl Default for ReplyLimits {
    fn default() -> Self {
        Self {
            max_chars: 480,
            min_chars: 20,
        }
    }
}

/// Immutable session configuration, constructed once per run and handed
/// to the engine at creation. Reconfiguration means building a new engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionConfig {
    /// What the debate is about.
    pub topic: String,
    /// Speaking style for AI-A.
    pub style_a: String,
    /// Speaking style for AI-B.
    pub style_b: String,
    /// 1–10; higher means more objective argumentation.
    pub rationality: u8,
    /// Upper bound on rounds; must be positive.
    pub max_rounds: u32,
    /// Reply length bounds.
    pub limits: ReplyLimits,
    /// Prompt template for AI-A.
    pub template_a: PromptTemplate,
    /// Prompt template for AI-B.
    pub template_b: PromptTemplate,
}

impl Default for DiscussionConfig {
    fn default() -> Self {
        Self {
            topic: "Will artificial intelligence replace human jobs?".to_string(),
            style_a: "rational and objective, leans on data".to_string(),
            style_b: "intuitive and empathetic, focused on the human side".to_string(),
            rationality: 7,
            max_rounds: 10,
            limits: ReplyLimits::default(),
            template_a: PromptTemplate::new(DEFAULT_TEMPLATE_A),
            template_b: PromptTemplate::new(DEFAULT_TEMPLATE_B),
        }
    }
}

impl DiscussionConfig {
    /// Check session parameters before any responder call.
    pub fn validate(&self) -> Result<(), DiscussionError> {
        if !(1..=10).contains(&self.rationality) {
            return Err(DiscussionError::Configuration(
                "rationality must be between 1 and 10".to_string(),
            ));
        }
        if self.max_rounds == 0 {
            return Err(DiscussionError::Configuration(
                "max rounds must be greater than zero".to_string(),
            ));
        }
        if self.topic.trim().is_empty() {
            return Err(DiscussionError::Configuration(
                "topic must not be empty".to_string(),
            ));
        }
        if self.limits.max_chars == 0 {
            return Err(DiscussionError::Configuration(
                "maximum reply length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn style_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::A => &self.style_a,
            Speaker::B => &self.style_b,
        }
    }

    fn template_for(&self, speaker: Speaker) -> &PromptTemplate {
        match speaker {
            Speaker::A => &self.template_a,
            Speaker::B => &self.template_b,
        }
    }
}

/// Build the full prompt for one turn. Pure: same inputs, same prompt.
pub fn build_prompt(
    config: &DiscussionConfig,
    speaker: Speaker,
    round: u32,
    last_turn: Option<&Turn>,
) -> Result<String, DiscussionError> {
    let context = prompt::situational_context(round, last_turn);
    let opponent_reply = last_turn.map(|turn| turn.text.clone()).unwrap_or_default();
    let vars = PromptVars::new()
        .set("topic", &config.topic)
        .set("current_round", round.to_string())
        .set("max_rounds", config.max_rounds.to_string())
        .set("style", config.style_for(speaker))
        .set("rationality", config.rationality.to_string())
        .set("opponent_reply", opponent_reply)
        .set("context", context);
    config.template_for(speaker).render(&vars)
}

/// The discussion engine.
///
/// Usage:
/// 1. Create with [`new`](Self::new) or
///    [`with_conditions`](Self::with_conditions).
/// 2. Call [`start`](Self::start) — validates, probes the responder, and
///    produces round 1.
/// 3. Call [`advance`](Self::advance) until it returns `false`.
/// 4. Read [`summary`](Self::summary) for the terminal statistics.
pub struct DiscussionEngine<R: Responder> {
    config: DiscussionConfig,
    conditions: EndConditions,
    responder: R,
    state: DiscussionState,
}

impl<R: Responder> DiscussionEngine<R> {
    /// Create an engine with default end-condition policies.
    pub fn new(config: DiscussionConfig, responder: R) -> Self {
        Self::with_conditions(config, EndConditions::default(), responder)
    }

    /// Create an engine with custom end-condition policies.
    pub fn with_conditions(
        config: DiscussionConfig,
        conditions: EndConditions,
        responder: R,
    ) -> Self {
        Self {
            config,
            conditions,
            responder,
            state: DiscussionState::new(),
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &DiscussionConfig {
        &self.config
    }

    /// The current session state (read-only).
    pub fn state(&self) -> &DiscussionState {
        &self.state
    }

    /// The responder collaborator (read-only).
    pub fn responder(&self) -> &R {
        &self.responder
    }

    /// Whether the session has ended.
    pub fn is_ended(&self) -> bool {
        self.state.is_ended()
    }

    /// Validate the configuration and templates, probe the responder, and
    /// produce round 1 with speaker A.
    ///
    /// Pre-flight failures leave the session in `NotStarted`. Once the
    /// probe passes, a responder failure on round 1 ends the session
    /// gracefully instead of surfacing as an error.
    pub async fn start(&mut self) -> Result<(), DiscussionError> {
        if self.state.phase() != DiscussionPhase::NotStarted {
            return Err(DiscussionError::Configuration(
                "session already started".to_string(),
            ));
        }
        self.config.validate()?;
        self.config.template_a.validate_names()?;
        self.config.template_b.validate_names()?;
        self.responder
            .probe()
            .await
            .map_err(|e| DiscussionError::ResponderUnavailable(e.to_string()))?;

        info!(
            topic = %self.config.topic,
            rationality = self.config.rationality,
            max_rounds = self.config.max_rounds,
            "discussion starting"
        );
        self.state
            .transition(DiscussionPhase::Running)
            .map_err(|e| DiscussionError::Configuration(e.to_string()))?;
        self.take_turn(1).await;
        Ok(())
    }

    /// Produce the next turn. Returns `true` while the discussion is
    /// still running; a no-op returning `false` once ended.
    pub async fn advance(&mut self) -> bool {
        if self.state.phase() != DiscussionPhase::Running {
            return false;
        }
        let round = self.state.current_round();
        if round >= self.config.max_rounds {
            self.finish(EndReason::RoundLimit, None);
            return false;
        }
        self.take_turn(round + 1).await;
        !self.state.is_ended()
    }

    /// Cooperative cancellation between turns. Returns `true` if the
    /// session was running and is now ended; history stays as collected.
    pub fn cancel(&mut self) -> bool {
        if self.state.phase() != DiscussionPhase::Running {
            return false;
        }
        self.finish(EndReason::Cancelled, None);
        true
    }

    /// Terminal statistics, or `None` while the session is still running.
    pub fn summary(&self) -> Option<DiscussionSummary> {
        if !self.state.is_ended() {
            return None;
        }
        Some(summary::summarize(&self.state, self.responder.call_count()))
    }

    async fn take_turn(&mut self, round: u32) {
        let speaker = Speaker::for_round(round);
        let prompt = match build_prompt(&self.config, speaker, round, self.state.last_turn()) {
            Ok(prompt) => prompt,
            Err(e) => {
                // unreachable after start()'s template validation
                self.finish(EndReason::Failure(e.to_string()), None);
                return;
            }
        };

        match self.responder.respond(&prompt).await {
            Ok(raw) => {
                let text = self.apply_limits(raw, round, speaker);
                self.state.record(Turn {
                    round,
                    speaker,
                    text,
                    recorded_at: Instant::now(),
                });
                info!(round, speaker = %speaker, "turn recorded");
                self.evaluate_end();
            }
            Err(e) => {
                warn!(round, speaker = %speaker, error = %e, "responder failed, ending discussion");
                self.finish(EndReason::Failure(e.to_string()), None);
            }
        }
    }

    /// Truncate over-long replies and log suspiciously short ones.
    fn apply_limits(&self, raw: String, round: u32, speaker: Speaker) -> String {
        let trimmed = raw.trim();
        let count = trimmed.chars().count();
        if count > self.config.limits.max_chars {
            warn!(
                round,
                speaker = %speaker,
                chars = count,
                max = self.config.limits.max_chars,
                "reply truncated"
            );
            let mut text: String = trimmed.chars().take(self.config.limits.max_chars).collect();
            text.push_str("...");
            return text;
        }
        if count < self.config.limits.min_chars {
            warn!(
                round,
                speaker = %speaker,
                chars = count,
                min = self.config.limits.min_chars,
                "reply shorter than configured minimum"
            );
        }
        trimmed.to_string()
    }

    fn evaluate_end(&mut self) {
        let reason = self
            .conditions
            .evaluate(self.state.turns(), self.config.max_rounds);
        if let Some(reason) = reason {
            let winner = match &reason {
                EndReason::Concession { by } => Some(by.other()),
                _ => None,
            };
            self.finish(reason, winner);
        }
    }

    fn finish(&mut self, reason: EndReason, winner: Option<Speaker>) {
        if self.state.is_ended() {
            return;
        }
        if let Err(e) = self.state.transition(DiscussionPhase::Ended) {
            warn!(error = %e, "cannot end a session that never ran");
            return;
        }
        info!(reason = %reason, winner = ?winner, "discussion ended");
        self.state.set_outcome(reason, winner);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::responder::{MockResponder, ResponderError};

    fn live_mock() -> MockResponder {
        let mut mock = MockResponder::new();
        mock.expect_probe().returning(|| Ok(()));
        mock.expect_call_count().return_const(0u64);
        mock
    }

    /// Mock whose replies are numbered and never repeat or concede.
    fn scripted_mock() -> MockResponder {
        let mut mock = live_mock();
        let counter = Arc::new(AtomicU32::new(0));
        mock.expect_respond().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!(
                "Argument number {n} about productivity. Detail {n} backs it up."
            ))
        });
        mock
    }

    fn config(max_rounds: u32) -> DiscussionConfig {
        DiscussionConfig {
            max_rounds,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_produces_one_turn_for_a() {
        let mut engine = DiscussionEngine::new(config(5), scripted_mock());
        engine.start().await.unwrap();
        let turns = engine.state().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].round, 1);
        assert_eq!(turns[0].speaker, Speaker::A);
        assert_eq!(engine.state().phase(), DiscussionPhase::Running);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let mut engine = DiscussionEngine::new(config(5), scripted_mock());
        engine.start().await.unwrap();
        let err = engine.start().await.unwrap_err();
        assert!(matches!(err, DiscussionError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_invalid_rationality_rejected() {
        for rationality in [0u8, 11] {
            let mut cfg = config(5);
            cfg.rationality = rationality;
            let mut engine = DiscussionEngine::new(cfg, MockResponder::new());
            let err = engine.start().await.unwrap_err();
            assert!(matches!(err, DiscussionError::Configuration(_)));
            assert_eq!(engine.state().phase(), DiscussionPhase::NotStarted);
        }
    }

    #[tokio::test]
    async fn test_zero_max_rounds_rejected() {
        let mut engine = DiscussionEngine::new(config(0), MockResponder::new());
        assert!(matches!(
            engine.start().await,
            Err(DiscussionError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_topic_rejected() {
        let mut cfg = config(5);
        cfg.topic = "   ".to_string();
        let mut engine = DiscussionEngine::new(cfg, MockResponder::new());
        assert!(matches!(
            engine.start().await,
            Err(DiscussionError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_session_unstarted() {
        let mut mock = MockResponder::new();
        mock.expect_probe()
            .returning(|| Err(ResponderError::Transport("connection refused".into())));
        let mut engine = DiscussionEngine::new(config(5), mock);
        let err = engine.start().await.unwrap_err();
        assert!(matches!(err, DiscussionError::ResponderUnavailable(_)));
        assert_eq!(engine.state().phase(), DiscussionPhase::NotStarted);
        assert!(engine.state().turns().is_empty());
    }

    #[tokio::test]
    async fn test_template_with_unknown_variable_fails_preflight() {
        let mut cfg = config(5);
        cfg.template_a = PromptTemplate::new("{topic} {verdict} {mood}");
        let mut engine = DiscussionEngine::new(cfg, MockResponder::new());
        match engine.start().await.unwrap_err() {
            DiscussionError::MissingVariables { missing } => {
                assert_eq!(missing, vec!["verdict", "mood"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_alternation_across_advances() {
        let mut engine = DiscussionEngine::new(config(6), scripted_mock());
        engine.start().await.unwrap();
        while engine.advance().await {}
        for turn in engine.state().turns() {
            assert_eq!(turn.speaker, Speaker::for_round(turn.round));
            assert_eq!(
                turn.speaker,
                if turn.round % 2 == 1 {
                    Speaker::A
                } else {
                    Speaker::B
                }
            );
        }
    }

    #[tokio::test]
    async fn test_round_limit_after_exactly_max_rounds() {
        let mut engine = DiscussionEngine::new(config(3), scripted_mock());
        engine.start().await.unwrap();
        assert!(engine.advance().await);
        assert!(!engine.advance().await);
        assert_eq!(engine.state().turns().len(), 3);
        assert_eq!(engine.state().current_round(), 3);
        assert_eq!(engine.state().end_reason(), Some(&EndReason::RoundLimit));
        assert!(engine.state().winner().is_none());
    }

    #[tokio::test]
    async fn test_advance_is_noop_once_ended() {
        let mut engine = DiscussionEngine::new(config(3), scripted_mock());
        engine.start().await.unwrap();
        while engine.advance().await {}
        let turns_before = engine.state().turns().len();
        let reason_before = engine.state().end_reason().cloned();
        assert!(!engine.advance().await);
        assert!(!engine.advance().await);
        assert_eq!(engine.state().turns().len(), turns_before);
        assert_eq!(engine.state().end_reason().cloned(), reason_before);
        assert!(engine.state().winner().is_none());
    }

    #[tokio::test]
    async fn test_concession_awards_opponent() {
        let mut mock = live_mock();
        let counter = Arc::new(AtomicU32::new(0));
        mock.expect_respond().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 2 {
                Ok("You make a fair case. I concede.".to_string())
            } else {
                Ok(format!("Argument {n} about the topic. Detail {n}."))
            }
        });
        let mut engine = DiscussionEngine::new(config(10), mock);
        engine.start().await.unwrap();
        assert!(!engine.advance().await);
        assert!(engine.is_ended());
        let reason = engine.state().end_reason().unwrap().to_string();
        assert!(reason.contains("conceded"));
        // round 2 speaker is B, so A wins
        assert_eq!(engine.state().winner(), Some(Speaker::A));
    }

    #[tokio::test]
    async fn test_responder_failure_ends_gracefully() {
        let mut mock = live_mock();
        let counter = Arc::new(AtomicU32::new(0));
        mock.expect_respond().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 2 {
                Err(ResponderError::Timeout(30))
            } else {
                Ok(format!("Argument {n}. Detail {n}."))
            }
        });
        let mut engine = DiscussionEngine::new(config(10), mock);
        engine.start().await.unwrap();
        assert!(!engine.advance().await);
        assert!(engine.is_ended());
        let reason = engine.state().end_reason().unwrap().to_string();
        assert!(reason.contains("discussion failed"));
        assert!(reason.contains("timed out"));
        assert!(engine.state().winner().is_none());
        // the failed turn was never recorded
        assert_eq!(engine.state().turns().len(), 1);
    }

    #[tokio::test]
    async fn test_reply_truncated_with_ellipsis() {
        let mut cfg = config(5);
        cfg.limits.max_chars = 10;
        let mut mock = live_mock();
        mock.expect_respond()
            .returning(|_| Ok("abcdefghijKLMNOP".to_string()));
        let mut engine = DiscussionEngine::new(cfg, mock);
        engine.start().await.unwrap();
        assert_eq!(engine.state().turns()[0].text, "abcdefghij...");
    }

    #[tokio::test]
    async fn test_short_reply_kept() {
        let mut mock = live_mock();
        mock.expect_respond().returning(|_| Ok("ok".to_string()));
        let mut engine = DiscussionEngine::new(config(5), mock);
        engine.start().await.unwrap();
        assert_eq!(engine.state().turns()[0].text, "ok");
    }

    #[tokio::test]
    async fn test_cancel_between_turns() {
        let mut engine = DiscussionEngine::new(config(10), scripted_mock());
        engine.start().await.unwrap();
        assert!(engine.cancel());
        assert!(engine.is_ended());
        assert_eq!(engine.state().end_reason(), Some(&EndReason::Cancelled));
        assert_eq!(engine.state().turns().len(), 1);
        assert!(!engine.cancel());
        assert!(!engine.advance().await);
    }

    #[tokio::test]
    async fn test_summary_none_while_running() {
        let mut engine = DiscussionEngine::new(config(10), scripted_mock());
        engine.start().await.unwrap();
        assert!(engine.summary().is_none());
    }

    #[tokio::test]
    async fn test_summary_after_round_limit() {
        let mut mock = MockResponder::new();
        mock.expect_probe().returning(|| Ok(()));
        mock.expect_call_count().return_const(3u64);
        let counter = Arc::new(AtomicU32::new(0));
        mock.expect_respond().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("Argument {n}. Detail {n}."))
        });
        let mut engine = DiscussionEngine::new(config(3), mock);
        engine.start().await.unwrap();
        while engine.advance().await {}
        let summary = engine.summary().unwrap();
        assert_eq!(summary.total_rounds, 3);
        assert_eq!(summary.end_reason, "round limit reached");
        assert!(summary.winner.is_none());
        assert_eq!(summary.responder_calls, 3);
    }

    #[tokio::test]
    async fn test_stalemate_on_repetitive_mock() {
        let mut mock = live_mock();
        mock.expect_respond()
            .returning(|_| Ok("The same old point. Nothing new here.".to_string()));
        let mut engine = DiscussionEngine::new(config(20), mock);
        engine.start().await.unwrap();
        while engine.advance().await {}
        assert_eq!(engine.state().turns().len(), 6);
        assert_eq!(engine.state().end_reason(), Some(&EndReason::Stalemate));
        assert!(engine.state().winner().is_none());
    }

    #[test]
    fn test_build_prompt_round_one_has_empty_opponent_reply() {
        let cfg = config(5);
        let prompt = build_prompt(&cfg, Speaker::A, 1, None).unwrap();
        assert!(prompt.contains("You are AI-A"));
        assert!(prompt.contains(&cfg.topic));
        assert!(prompt.contains("Round: 1/5"));
        assert!(prompt.contains("beginning of the discussion"));
    }

    #[test]
    fn test_build_prompt_later_round_quotes_opponent() {
        let cfg = config(5);
        let last = Turn {
            round: 1,
            speaker: Speaker::A,
            text: "Opening statement.".to_string(),
            recorded_at: Instant::now(),
        };
        let prompt = build_prompt(&cfg, Speaker::B, 2, Some(&last)).unwrap();
        assert!(prompt.contains("You are AI-B"));
        assert!(prompt.contains("Opening statement."));
        assert!(prompt.contains("Round: 2/5"));
    }

    #[test]
    fn test_config_validate_ok() {
        assert!(DiscussionConfig::default().validate().is_ok());
    }
}
