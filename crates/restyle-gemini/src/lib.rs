//! restyle-gemini: the Gemini-backed [`GenerationClient`] for
//! `restyle-pipeline`.
//!
//! Every operation is a single `POST {base_url}/models/{model}:generateContent`
//! call. Image inputs travel as `inlineData` parts ahead of the prompt.
//! The API key is always injected explicitly through [`GeminiConfig`];
//! [`GeminiConfig::from_env`] is a convenience for binaries.
//!
//! [`GenerationClient`]: restyle_pipeline::GenerationClient

pub mod client;
pub mod config;
mod wire;

pub use client::GeminiClient;
pub use config::{API_KEY_VARS, ConfigError, GeminiConfig};
