//! Turn-based dual-AI discussion engine.
//!
//! Two independently prompted language-model debaters alternate turns on a
//! topic until one concedes, the round limit is hit, or repetition analysis
//! flags a stalemate. This crate owns the state machine, the end-condition
//! policies, prompt assembly, the transcript format, and session
//! statistics; the language-model call itself sits behind the [`Responder`]
//! trait so front-ends choose the transport.
//!
//! # Flow
//!
//! ```text
//! NotStarted → Running → Ended
//!     │           │
//!     │           └─ advance(): build prompt → respond → record turn
//!     │                        → concession? round limit? stalemate?
//!     └─ start(): validate config + templates, probe responder,
//!                 produce round 1 (speaker A)
//! ```

pub mod engine;
pub mod error;
pub mod policy;
pub mod prompt;
pub mod responder;
pub mod state;
pub mod summary;
pub mod transcript;

pub use engine::{build_prompt, DiscussionConfig, DiscussionEngine, ReplyLimits};
pub use error::DiscussionError;
pub use policy::{ConcessionPolicy, EndConditions, RepetitionPolicy};
pub use prompt::{PromptTemplate, PromptVars, PROMPT_VARIABLES};
pub use responder::{Responder, ResponderError};
pub use state::{DiscussionPhase, DiscussionState, EndReason, Speaker, TransitionError, Turn};
pub use summary::DiscussionSummary;
