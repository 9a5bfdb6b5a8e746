//! [`GenerationClient`] implementation over the Gemini REST API.

use async_trait::async_trait;
use restyle_pipeline::{EncodedImage, GenerationClient, GenerationError, StyleSuggestion};

use crate::config::{ConfigError, GeminiConfig};
use crate::wire::{
    GenerateRequest, GenerateResponse, GenerationConfig, SuggestionItem, ThinkingConfig,
    suggestion_schema,
};

const ANALYSIS_PROMPT: &str = "Analyze the person in this photo. Describe their facial \
     structure, skin tone, current hair color, and estimated age. Be concise and focus on \
     features relevant for choosing a new hairstyle.";

const DESCRIPTION_PROMPT: &str = "Describe only the hairstyle of the person in this image. \
     Be extremely detailed about the style, cut, length on top, fade on the sides, texture, \
     and how it's styled. This description will be used to re-create the exact same \
     hairstyle from different angles.";

/// MIME type assumed when a rendered image part does not declare one.
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

fn suggestion_prompt(feature_summary: &str, count: usize) -> String {
    format!(
        "You are an expert barber and hairstylist. Based on the following facial features: \
         \"{feature_summary}\", suggest {count} distinct, cohesive and stylish new hairstyles. \
         For each, give a short style name and a single, detailed description that can be \
         used to generate it from multiple angles (front, back, sides)."
    )
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Build a client from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if the key is blank and
    /// [`ConfigError::HttpClient`] if the HTTP stack fails to initialize.
    pub fn new(config: GeminiConfig) -> Result<Self, ConfigError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// Default models against a custom endpoint root.
    ///
    /// # Errors
    ///
    /// See [`GeminiClient::new`].
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::new(GeminiConfig::new(api_key).with_base_url(base_url))
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<GenerateResponse, GenerationError> {
        let url = format!("{}/models/{model}:generateContent", self.config.base_url);
        tracing::debug!(model, "generateContent");

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream(format!("{status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.without_url().to_string()))
    }

    async fn generate_text(
        &self,
        model: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<String, GenerationError> {
        let text = self.generate(model, request).await?.text();
        if text.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(format!(
                "{model} returned no text"
            )));
        }
        Ok(text)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn analyze_features(&self, image: &EncodedImage) -> Result<String, GenerationError> {
        let request = GenerateRequest::new(Some(image), ANALYSIS_PROMPT);
        self.generate_text(&self.config.analysis_model, &request)
            .await
    }

    async fn suggest_styles(
        &self,
        feature_summary: &str,
        count: usize,
    ) -> Result<Vec<StyleSuggestion>, GenerationError> {
        let prompt = suggestion_prompt(feature_summary, count);
        let request = GenerateRequest::new(None, &prompt).with_config(GenerationConfig {
            response_mime_type: Some("application/json"),
            response_schema: Some(suggestion_schema()),
            thinking_config: Some(ThinkingConfig {
                thinking_budget: self.config.thinking_budget,
            }),
            ..GenerationConfig::default()
        });
        let text = self
            .generate_text(&self.config.suggestion_model, &request)
            .await?;

        let items: Vec<SuggestionItem> = serde_json::from_str(text.trim())
            .map_err(|e| GenerationError::InvalidResponse(format!("suggestions: {e}")))?;
        if items.len() < count {
            return Err(GenerationError::InsufficientResults {
                requested: count,
                received: items.len(),
            });
        }
        Ok(items
            .into_iter()
            .take(count)
            .map(|item| StyleSuggestion {
                name: item.style_name.trim().to_owned(),
                description: item.description,
            })
            .collect())
    }

    async fn describe_image(&self, image: &EncodedImage) -> Result<String, GenerationError> {
        let request = GenerateRequest::new(Some(image), DESCRIPTION_PROMPT);
        self.generate_text(&self.config.description_model, &request)
            .await
    }

    async fn render_image(
        &self,
        prompt: &str,
        source: &EncodedImage,
    ) -> Result<EncodedImage, GenerationError> {
        let request = GenerateRequest::new(Some(source), prompt).with_config(GenerationConfig {
            response_modalities: Some(&["IMAGE"]),
            ..GenerationConfig::default()
        });
        let response = self.generate(&self.config.image_model, &request).await?;
        let image = response
            .first_image()
            .ok_or(GenerationError::NoImageProduced)?;
        let mime_type = image
            .mime_type
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME);
        Ok(EncodedImage::new(mime_type, image.data.as_str()))
    }
}
