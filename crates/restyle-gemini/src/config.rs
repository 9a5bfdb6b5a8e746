//! Gemini client configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Environment variables consulted by [`GeminiConfig::from_env`], in order.
pub const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

/// Connection and model settings for [`GeminiClient`](crate::GeminiClient).
///
/// The API key is never serialized and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key sent as the `key` query parameter.
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// REST endpoint root, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used to describe facial features.
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,

    /// Model used to suggest hairstyles.
    #[serde(default = "default_suggestion_model")]
    pub suggestion_model: String,

    /// Model used to re-describe a rendered preview.
    #[serde(default = "default_description_model")]
    pub description_model: String,

    /// Model used for every image render.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Reasoning token budget for the suggestion call.
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: u32,
}

fn default_base_url() -> String {
    GeminiConfig::DEFAULT_BASE_URL.to_owned()
}

fn default_analysis_model() -> String {
    GeminiConfig::DEFAULT_ANALYSIS_MODEL.to_owned()
}

fn default_suggestion_model() -> String {
    GeminiConfig::DEFAULT_SUGGESTION_MODEL.to_owned()
}

fn default_description_model() -> String {
    GeminiConfig::DEFAULT_DESCRIPTION_MODEL.to_owned()
}

fn default_image_model() -> String {
    GeminiConfig::DEFAULT_IMAGE_MODEL.to_owned()
}

const fn default_thinking_budget() -> u32 {
    GeminiConfig::DEFAULT_THINKING_BUDGET
}

impl GeminiConfig {
    /// Public Gemini REST endpoint root.
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    /// Default model for facial feature analysis.
    pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-flash";
    /// Default model for hairstyle suggestions.
    pub const DEFAULT_SUGGESTION_MODEL: &str = "gemini-2.5-pro";
    /// Default model for describing a rendered preview.
    pub const DEFAULT_DESCRIPTION_MODEL: &str = "gemini-2.5-flash";
    /// Default image generation model.
    pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
    /// Default reasoning token budget for suggestions.
    pub const DEFAULT_THINKING_BUDGET: u32 = 32_768;

    /// Default settings with an explicit API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            analysis_model: default_analysis_model(),
            suggestion_model: default_suggestion_model(),
            description_model: default_description_model(),
            image_model: default_image_model(),
            thinking_budget: Self::DEFAULT_THINKING_BUDGET,
        }
    }

    /// Default settings with the key taken from the first of
    /// [`API_KEY_VARS`] that is set and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if none is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|key| !key.trim().is_empty())
            .map(Self::new)
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Point the client at a different endpoint root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("analysis_model", &self.analysis_model)
            .field("suggestion_model", &self.suggestion_model)
            .field("description_model", &self.description_model)
            .field("image_model", &self.image_model)
            .field("thinking_budget", &self.thinking_budget)
            .finish()
    }
}

/// Errors building a [`GeminiClient`](crate::GeminiClient).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No API key was supplied or found in the environment.
    #[error("no API key: set GEMINI_API_KEY, GOOGLE_API_KEY, or API_KEY")]
    MissingApiKey,

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
