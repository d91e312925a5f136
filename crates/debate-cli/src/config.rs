//! Configuration file loading, defaults, and environment overrides.
//!
//! Everything lives in one TOML file (`debate.toml` by default). A default
//! file is written when none exists so a first run leaves a template the
//! user can edit. `DEBATE_API_URL`, `DEBATE_API_KEY`, and `DEBATE_MODEL`
//! override the file for the endpoint settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use discussion::prompt::{DEFAULT_TEMPLATE_A, DEFAULT_TEMPLATE_B};
use discussion::{
    ConcessionPolicy, DiscussionConfig, EndConditions, PromptTemplate, RepetitionPolicy,
    ReplyLimits,
};

/// Model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// OpenAI-compatible base URL, e.g. `http://localhost:8080/v1`.
    pub base_url: String,
    /// Bearer token; empty means no auth header.
    pub api_key: String,
    /// Model name passed through in the request body.
    pub model: String,
    /// Per-request timeout.
    pub timeout_seconds: u64,
    /// Completion token cap per turn.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 30,
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

/// Session parameters for one debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub topic: String,
    pub style_a: String,
    pub style_b: String,
    /// 1–10; higher means more objective argumentation.
    pub rationality: u8,
    pub max_rounds: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = DiscussionConfig::default();
        Self {
            topic: defaults.topic,
            style_a: defaults.style_a,
            style_b: defaults.style_b,
            rationality: defaults.rationality,
            max_rounds: defaults.max_rounds,
        }
    }
}

/// Reply length bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    pub max_reply_chars: usize,
    pub min_reply_chars: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        let defaults = ReplyLimits::default();
        Self {
            max_reply_chars: defaults.max_chars,
            min_reply_chars: defaults.min_chars,
        }
    }
}

/// End-condition policy tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Phrases interpreted as conceding, matched case-insensitively.
    pub concession_phrases: Vec<String>,
    /// Turns inspected by the repetition check.
    pub repetition_window: usize,
    /// Repetition ratio above which the session is a stalemate.
    pub repetition_threshold: f64,
    /// Characters treated as sentence terminators when segmenting replies.
    pub sentence_terminators: String,
}

impl Default for PolicySection {
    fn default() -> Self {
        let concession = ConcessionPolicy::default();
        let repetition = RepetitionPolicy::default();
        Self {
            concession_phrases: concession.phrases,
            repetition_window: repetition.window,
            repetition_threshold: repetition.threshold,
            sentence_terminators: repetition.terminators,
        }
    }
}

/// Per-speaker prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsSection {
    pub template_a: String,
    pub template_b: String,
}

impl Default for PromptsSection {
    fn default() -> Self {
        Self {
            template_a: DEFAULT_TEMPLATE_A.to_string(),
            template_b: DEFAULT_TEMPLATE_B.to_string(),
        }
    }
}

/// Transcript output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub save_transcript: bool,
    pub transcript_dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            save_transcript: true,
            transcript_dir: PathBuf::from("."),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    pub api: ApiSection,
    pub session: SessionSection,
    pub limits: LimitsSection,
    pub policy: PolicySection,
    pub prompts: PromptsSection,
    pub output: OutputSection,
}

impl DebateConfig {
    /// Load from `path`, writing a default file first when none exists.
    /// Environment overrides are applied in both cases.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        } else {
            let config = Self::default();
            let rendered =
                toml::to_string_pretty(&config).context("serializing default configuration")?;
            std::fs::write(path, rendered)
                .with_context(|| format!("writing default configuration to {}", path.display()))?;
            info!(path = %path.display(), "wrote default configuration");
            config
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DEBATE_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(key) = std::env::var("DEBATE_API_KEY") {
            self.api.api_key = key;
        }
        if let Ok(model) = std::env::var("DEBATE_MODEL") {
            self.api.model = model;
        }
    }

    /// Project the file sections into the engine's immutable session config.
    pub fn discussion_config(&self) -> DiscussionConfig {
        DiscussionConfig {
            topic: self.session.topic.clone(),
            style_a: self.session.style_a.clone(),
            style_b: self.session.style_b.clone(),
            rationality: self.session.rationality,
            max_rounds: self.session.max_rounds,
            limits: ReplyLimits {
                max_chars: self.limits.max_reply_chars,
                min_chars: self.limits.min_reply_chars,
            },
            template_a: PromptTemplate::new(&self.prompts.template_a),
            template_b: PromptTemplate::new(&self.prompts.template_b),
        }
    }

    /// Build the end-condition policies from the `[policy]` section.
    pub fn end_conditions(&self) -> EndConditions {
        EndConditions {
            concession: ConcessionPolicy {
                phrases: self.policy.concession_phrases.clone(),
            },
            repetition: RepetitionPolicy {
                window: self.policy.repetition_window,
                threshold: self.policy.repetition_threshold,
                terminators: self.policy.sentence_terminators.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DebateConfig::default();
        config.discussion_config().validate().unwrap();
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.policy.repetition_window, 6);
        assert!(config.output.save_transcript);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: DebateConfig = toml::from_str(
            r#"
            [session]
            topic = "Is nuclear power the fastest path to decarbonization?"
            max_rounds = 4

            [api]
            base_url = "http://inference:9000/v1"
            "#,
        )
        .unwrap();
        assert_eq!(config.session.max_rounds, 4);
        assert_eq!(config.session.rationality, 7);
        assert_eq!(config.api.base_url, "http://inference:9000/v1");
        assert_eq!(config.api.model, "gpt-4o-mini");
        assert_eq!(config.limits.min_reply_chars, 20);
    }

    #[test]
    fn test_load_writes_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debate.toml");
        let config = DebateConfig::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.session.rationality, 7);

        // the written file parses back to the same session settings
        let reloaded = DebateConfig::load(&path).unwrap();
        assert_eq!(reloaded.session.topic, config.session.topic);
        assert_eq!(reloaded.prompts.template_a, config.prompts.template_a);
    }

    #[test]
    fn test_env_overrides_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debate.toml");
        std::env::set_var("DEBATE_API_URL", "http://override:1234/v1");
        std::env::set_var("DEBATE_MODEL", "qwen2.5-14b");
        let config = DebateConfig::load(&path).unwrap();
        std::env::remove_var("DEBATE_API_URL");
        std::env::remove_var("DEBATE_MODEL");
        assert_eq!(config.api.base_url, "http://override:1234/v1");
        assert_eq!(config.api.model, "qwen2.5-14b");
    }

    #[test]
    fn test_policy_section_feeds_end_conditions() {
        let config: DebateConfig = toml::from_str(
            r#"
            [policy]
            concession_phrases = ["je capitule"]
            repetition_window = 4
            repetition_threshold = 0.3
            sentence_terminators = ".;"
            "#,
        )
        .unwrap();
        let conditions = config.end_conditions();
        assert_eq!(conditions.concession.phrases, vec!["je capitule"]);
        assert_eq!(conditions.repetition.window, 4);
        assert!((conditions.repetition.threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(conditions.repetition.terminators, ".;");
    }

    #[test]
    fn test_discussion_config_projection() {
        let mut config = DebateConfig::default();
        config.session.topic = "Should homework be abolished?".to_string();
        config.limits.max_reply_chars = 200;
        let discussion = config.discussion_config();
        assert_eq!(discussion.topic, "Should homework be abolished?");
        assert_eq!(discussion.limits.max_chars, 200);
        assert_eq!(
            discussion.template_a.text(),
            DEFAULT_TEMPLATE_A
        );
    }
}
