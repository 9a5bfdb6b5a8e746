//! The generation client boundary.
//!
//! The orchestrator only sees this trait. Concrete clients live in their
//! own crates (see `restyle-gemini`); tests use scripted in-memory ones.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{EncodedImage, GenerationError, StyleSuggestion};

/// The four model capabilities the workflow is built from.
///
/// Each method is a single request/response call with no internal retry.
/// Implementations must be safe to call concurrently: the orchestrator
/// issues several [`render_image`](Self::render_image) calls at once.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Describe the subject's facial attributes relevant to choosing a
    /// hairstyle.
    async fn analyze_features(&self, image: &EncodedImage) -> Result<String, GenerationError>;

    /// Suggest `count` named hairstyles for the given feature summary.
    ///
    /// Implementations must return [`GenerationError::InsufficientResults`]
    /// when fewer than `count` styles come back.
    async fn suggest_styles(
        &self,
        feature_summary: &str,
        count: usize,
    ) -> Result<Vec<StyleSuggestion>, GenerationError>;

    /// Describe the hairstyle visible in an image in enough detail to
    /// recreate it from other angles.
    async fn describe_image(&self, image: &EncodedImage) -> Result<String, GenerationError>;

    /// Render `prompt` applied to `source`.
    ///
    /// Implementations must return [`GenerationError::NoImageProduced`]
    /// when the response carries no image.
    async fn render_image(
        &self,
        prompt: &str,
        source: &EncodedImage,
    ) -> Result<EncodedImage, GenerationError>;
}

#[async_trait]
impl<C: GenerationClient + ?Sized> GenerationClient for Arc<C> {
    async fn analyze_features(&self, image: &EncodedImage) -> Result<String, GenerationError> {
        (**self).analyze_features(image).await
    }

    async fn suggest_styles(
        &self,
        feature_summary: &str,
        count: usize,
    ) -> Result<Vec<StyleSuggestion>, GenerationError> {
        (**self).suggest_styles(feature_summary, count).await
    }

    async fn describe_image(&self, image: &EncodedImage) -> Result<String, GenerationError> {
        (**self).describe_image(image).await
    }

    async fn render_image(
        &self,
        prompt: &str,
        source: &EncodedImage,
    ) -> Result<EncodedImage, GenerationError> {
        (**self).render_image(prompt, source).await
    }
}
