//! OpenAI-compatible HTTP responder.
//!
//! One chat-completion request per turn, no retries — the engine converts
//! failures into a graceful session end. The liveness probe hits the
//! endpoint's `/models` route before a session starts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use discussion::{Responder, ResponderError};

use crate::config::ApiSection;

/// Talks to an OpenAI-compatible chat-completions endpoint.
pub struct HttpResponder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout_seconds: u64,
    calls: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl HttpResponder {
    pub fn new(api: &ApiSection) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_seconds))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key: api.api_key.clone(),
            model: api.model.clone(),
            max_tokens: api.max_tokens,
            temperature: api.temperature,
            timeout_seconds: api.timeout_seconds,
            calls: AtomicU64::new(0),
        })
    }

    fn completion_request(&self, prompt: &str) -> reqwest::RequestBuilder {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "system", "content": prompt }],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        let mut request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        request
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn respond(&self, prompt: &str) -> Result<String, ResponderError> {
        let request_number = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(request = request_number, "sending completion request");

        let response = self.completion_request(prompt).send().await.map_err(|e| {
            if e.is_timeout() {
                ResponderError::Timeout(self.timeout_seconds)
            } else {
                ResponderError::Transport(e.to_string())
            }
        })?;
        if !response.status().is_success() {
            return Err(ResponderError::Transport(format!(
                "HTTP {} from completion endpoint",
                response.status()
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| ResponderError::Transport(e.to_string()))?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(ResponderError::EmptyReply);
        }
        debug!(request = request_number, chars = text.chars().count(), "completion received");
        Ok(text)
    }

    async fn probe(&self) -> Result<(), ResponderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ResponderError::Transport(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ResponderError::Transport(format!(
                "HTTP {} from {url}",
                response.status()
            )))
        }
    }

    fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn api_for(server: &MockServer) -> ApiSection {
        ApiSection {
            base_url: format!("{}/v1", server.uri()),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            timeout_seconds: 5,
            max_tokens: 150,
            temperature: 0.7,
        }
    }

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    #[tokio::test]
    async fn respond_returns_trimmed_content_and_counts_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "model": "test-model" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_body("  A solid opener.  ")),
            )
            .mount(&server)
            .await;

        let responder = HttpResponder::new(&api_for(&server)).unwrap();
        let text = responder.respond("prompt").await.unwrap();
        assert_eq!(text, "A solid opener.");
        assert_eq!(responder.call_count(), 1);

        responder.respond("prompt").await.unwrap();
        assert_eq!(responder.call_count(), 2);
    }

    #[tokio::test]
    async fn respond_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let responder = HttpResponder::new(&api_for(&server)).unwrap();
        let err = responder.respond("prompt").await.unwrap_err();
        assert!(matches!(err, ResponderError::Transport(_)));
        assert!(err.to_string().contains("502"));
        // failed calls still count
        assert_eq!(responder.call_count(), 1);
    }

    #[tokio::test]
    async fn respond_rejects_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("   ")))
            .mount(&server)
            .await;

        let responder = HttpResponder::new(&api_for(&server)).unwrap();
        let err = responder.respond("prompt").await.unwrap_err();
        assert_eq!(err, ResponderError::EmptyReply);
    }

    #[tokio::test]
    async fn probe_checks_models_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let responder = HttpResponder::new(&api_for(&server)).unwrap();
        responder.probe().await.unwrap();
        // probing does not count as a generation call
        assert_eq!(responder.call_count(), 0);
    }

    #[tokio::test]
    async fn probe_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let responder = HttpResponder::new(&api_for(&server)).unwrap();
        let err = responder.probe().await.unwrap_err();
        assert!(matches!(err, ResponderError::Transport(_)));
    }
}
