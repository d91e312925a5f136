//! The responder seam — the external text-generation capability.

use async_trait::async_trait;
use thiserror::Error;

/// Error from the external language-model capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponderError {
    /// Transport, protocol, or model-side failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not complete within the configured timeout.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// The model returned no usable text.
    #[error("empty reply")]
    EmptyReply,
}

/// A text-generation capability: given a prompt, produce a reply.
///
/// Implementations own their timeout and transport details; the engine
/// never retries a failed call. The call counter is monotonic and owned
/// by the implementation — the core only reads it for the session summary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply for `prompt`.
    async fn respond(&self, prompt: &str) -> Result<String, ResponderError>;

    /// Cheap liveness check performed before a session starts.
    async fn probe(&self) -> Result<(), ResponderError>;

    /// Total generation calls made through this responder.
    fn call_count(&self) -> u64;
}
