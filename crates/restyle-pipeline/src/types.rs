//! Shared types for the restyle workflow.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stage::{ViewLabel, WorkflowStage};

/// An image in transport form: a MIME type plus standard base64 data.
///
/// Both fields are reference counted so that state snapshots holding
/// several rendered images stay cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    mime_type: Arc<str>,
    data: Arc<str>,
}

impl EncodedImage {
    /// Wrap an already-encoded base64 payload.
    ///
    /// No validation is performed; use [`crate::codec::encode`] to build
    /// a payload from raw bytes.
    #[must_use]
    pub fn new(mime_type: impl Into<Arc<str>>, data: impl Into<Arc<str>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// MIME type of the encoded image (e.g. `image/png`).
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Standard base64 image data, without any `data:` prefix.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Decode the base64 payload back into raw image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Base64`] if the payload is not valid base64.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        crate::codec::payload_bytes(self)
    }

    /// File extension matching the MIME type, falling back to `bin`.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match &*self.mime_type {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            _ => "bin",
        }
    }
}

/// The uploaded photo: raw bytes plus their transport encoding.
///
/// Immutable once captured. A new upload replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePhoto {
    bytes: Arc<[u8]>,
    encoded: EncodedImage,
}

impl SourcePhoto {
    /// Capture raw image bytes, validating and encoding them.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if `bytes` cannot be read as an image.
    pub fn capture(bytes: Vec<u8>) -> Result<Self, CodecError> {
        let encoded = crate::codec::encode(&bytes)?;
        Ok(Self {
            bytes: bytes.into(),
            encoded,
        })
    }

    /// The raw uploaded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The transport-ready payload sent to the generation client.
    #[must_use]
    pub const fn encoded(&self) -> &EncodedImage {
        &self.encoded
    }
}

/// A hairstyle idea as returned by the suggestion call, before rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSuggestion {
    /// Short label, unique within one run.
    pub name: String,
    /// Free-text description of the style.
    pub description: String,
}

/// A suggestion paired with its rendered front-view preview.
///
/// `name` is the identity key used by selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleCandidate {
    /// Short label, unique within one run.
    pub name: String,
    /// The original suggestion text.
    pub description: String,
    /// Rendered front view of the style applied to the source photo.
    pub preview: EncodedImage,
}

impl StyleCandidate {
    /// Attach a rendered preview to a suggestion.
    #[must_use]
    pub fn from_suggestion(suggestion: StyleSuggestion, preview: EncodedImage) -> Self {
        Self {
            name: suggestion.name,
            description: suggestion.description,
            preview,
        }
    }
}

/// One rendered viewing angle of the selected style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewResult {
    /// Which angle this image shows.
    pub label: ViewLabel,
    /// The rendered image.
    pub image: EncodedImage,
}

/// Identifier of one workflow run.
///
/// Bumped on every upload or reset. Background work tagged with an
/// older run is stale and its results are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RunId(u64);

impl RunId {
    /// The run that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the workflow orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How many style candidates to request and render. The run fails
    /// unless exactly this many are available.
    pub candidate_count: usize,

    /// Upper bound, in seconds, on every individual generation call.
    /// A call exceeding it fails as an upstream error.
    pub call_timeout_secs: u64,
}

impl OrchestratorConfig {
    /// Default number of style candidates.
    pub const DEFAULT_CANDIDATE_COUNT: usize = 4;

    /// Default per-call timeout in seconds.
    pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 120;

    /// The per-call timeout as a [`Duration`].
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCandidates`] if `candidate_count` is 0
    /// and [`ConfigError::ZeroTimeout`] if `call_timeout_secs` is 0.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.candidate_count == 0 {
            return Err(ConfigError::ZeroCandidates);
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            candidate_count: Self::DEFAULT_CANDIDATE_COUNT,
            call_timeout_secs: Self::DEFAULT_CALL_TIMEOUT_SECS,
        }
    }
}

/// Errors from converting between raw image bytes and transport payloads.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The bytes do not start with a known image signature.
    #[error("unrecognized image format")]
    UnrecognizedFormat,

    /// The format was recognized but the image failed to decode.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The payload was not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Errors reported by a [`GenerationClient`](crate::client::GenerationClient).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Transport, HTTP, model, or timeout failure.
    #[error("{0}")]
    Upstream(String),

    /// The suggestion call returned fewer styles than requested.
    #[error("expected {requested} hairstyle suggestions but received {received}")]
    InsufficientResults {
        /// How many were asked for.
        requested: usize,
        /// How many came back.
        received: usize,
    },

    /// The render call returned no image payload.
    #[error("image generation failed: no image was returned")]
    NoImageProduced,

    /// The response could not be interpreted.
    #[error("invalid response from model: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Whether this error means the collaborator broke its contract
    /// rather than failing transiently.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        !matches!(self, Self::Upstream(_))
    }

    /// The published classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Upstream(_) => ErrorKind::Upstream,
            Self::InsufficientResults { .. } => ErrorKind::InsufficientResults,
            Self::NoImageProduced => ErrorKind::NoImageProduced,
            Self::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }
}

/// Reasons an inbound workflow operation was rejected.
///
/// A rejected operation never mutates the workflow state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// A run can only start from [`WorkflowStage::Idle`].
    #[error("cannot start a new run while {0}")]
    NotIdle(WorkflowStage),

    /// No photo has been uploaded for the current run.
    #[error("please upload an image first")]
    NoPhoto,

    /// Selection is only possible while candidates are on offer.
    #[error("cannot select a style while {0}")]
    NotAwaitingSelection(WorkflowStage),

    /// The named candidate is not part of the current run.
    #[error("no style named {0:?} in the current run")]
    UnknownCandidate(String),

    /// Going back is only possible from a completed view set.
    #[error("cannot go back while {0}")]
    NotComplete(WorkflowStage),
}

/// Invalid [`OrchestratorConfig`] values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// At least one candidate must be requested.
    #[error("candidate count must be at least 1")]
    ZeroCandidates,

    /// A zero timeout would fail every call.
    #[error("call timeout must be at least 1 second")]
    ZeroTimeout,
}

/// Classification of a published error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Transport or model failure.
    Upstream,
    /// Too few suggestions returned.
    InsufficientResults,
    /// A render returned no image.
    NoImageProduced,
    /// Unreadable model response.
    InvalidResponse,
}

/// A stage failure as published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl From<&GenerationError> for ErrorDescriptor {
    fn from(err: &GenerationError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
