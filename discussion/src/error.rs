//! Error taxonomy for the discussion engine.
//!
//! Pre-flight failures (`Configuration`, `ResponderUnavailable`,
//! `MissingVariables`) surface as `Err` before any turn is produced.
//! Once a session runs, responder failures are converted by the engine
//! into a graceful terminal end — callers never see a raw transport fault
//! after start.

use thiserror::Error;

use crate::responder::ResponderError;

/// Unified error type for session setup and prompt validation.
#[derive(Debug, Error)]
pub enum DiscussionError {
    /// Invalid session parameters — fatal, raised before any responder call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The pre-flight liveness probe failed — the session never starts.
    #[error("responder unavailable: {0}")]
    ResponderUnavailable(String),

    /// A responder call failed.
    #[error("responder error: {0}")]
    Responder(#[from] ResponderError),

    /// A prompt template references variables outside the bound set.
    /// Every unbound name is listed, not just the first.
    #[error("prompt template references unbound variables: {}", .missing.join(", "))]
    MissingVariables { missing: Vec<String> },
}
