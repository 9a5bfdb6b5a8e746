//! restyle-pipeline: photo-to-hairstyles workflow orchestration.
//!
//! Given one source photo the workflow:
//!
//! 1. describes the subject's facial features,
//! 2. suggests several named hairstyles for them,
//! 3. renders a front-view preview of every suggestion in parallel,
//! 4. waits for the caller to select one candidate,
//! 5. re-describes the selected preview as it actually rendered, and
//! 6. renders the back and both side views in parallel, publishing all
//!    four views in a fixed order.
//!
//! Every model call goes through the [`GenerationClient`] trait; this
//! crate has **no HTTP dependencies**. The concrete Gemini client lives in
//! `restyle-gemini`.
//!
//! The [`Orchestrator`] is the only writer of the [`WorkflowState`];
//! presentation layers read immutable snapshots from
//! [`Orchestrator::subscribe`].

pub mod client;
pub mod codec;
pub mod orchestrator;
pub mod prompt;
pub mod stage;
pub mod state;
pub mod store;
pub mod types;

pub use client::GenerationClient;
pub use orchestrator::Orchestrator;
pub use stage::{ViewLabel, WorkflowStage};
pub use state::WorkflowState;
pub use store::WorkflowStore;
pub use types::{
    CodecError, ConfigError, EncodedImage, ErrorDescriptor, ErrorKind, GenerationError,
    OrchestratorConfig, RunId, SourcePhoto, StyleCandidate, StyleSuggestion, TransitionError,
    ViewResult,
};
