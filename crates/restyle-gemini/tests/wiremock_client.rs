//! Gemini client behavior against a mocked `generateContent` endpoint.

#![allow(clippy::unwrap_used, clippy::panic)]

use restyle_gemini::{GeminiClient, GeminiConfig};
use restyle_pipeline::{EncodedImage, GenerationClient, GenerationError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::with_base_url(KEY, server.uri()).unwrap()
}

fn photo() -> EncodedImage {
    EncodedImage::new("image/png", "iVBORw0KGgo=")
}

fn endpoint(model: &str) -> String {
    format!("/models/{model}:generateContent")
}

fn text_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    }))
}

fn suggestions(count: usize) -> String {
    let items: Vec<_> = (0..count)
        .map(|i| json!({ "styleName": format!("Style {i}"), "description": format!("look {i}") }))
        .collect();
    serde_json::to_string(&items).unwrap()
}

#[tokio::test]
async fn analyze_sends_image_before_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(endpoint(GeminiConfig::DEFAULT_ANALYSIS_MODEL)))
        .and(query_param("key", KEY))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } },
                {}
            ] }]
        })))
        .respond_with(text_response("oval face, light skin, ~30yo"))
        .expect(1)
        .mount(&server)
        .await;

    let features = client(&server).analyze_features(&photo()).await.unwrap();
    assert_eq!(features, "oval face, light skin, ~30yo");
}

#[tokio::test]
async fn describe_uses_description_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(endpoint(GeminiConfig::DEFAULT_DESCRIPTION_MODEL)))
        .respond_with(text_response("textured crop, 4cm on top"))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server).describe_image(&photo()).await.unwrap();
    assert_eq!(text, "textured crop, 4cm on top");
}

#[tokio::test]
async fn empty_text_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(text_response("   "))
        .mount(&server)
        .await;

    let err = client(&server).analyze_features(&photo()).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse(_)), "{err:?}");
}

#[tokio::test]
async fn http_error_is_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model overloaded"))
        .mount(&server)
        .await;

    let err = client(&server).describe_image(&photo()).await.unwrap_err();
    let message = match err {
        GenerationError::Upstream(message) => message,
        other => panic!("expected upstream error, got {other:?}"),
    };
    assert!(message.starts_with("503"), "{message}");
    assert!(message.contains("model overloaded"), "{message}");
    assert!(!message.contains(KEY));
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).analyze_features(&photo()).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse(_)), "{err:?}");
}

#[tokio::test]
async fn suggest_requests_structured_output() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(endpoint(GeminiConfig::DEFAULT_SUGGESTION_MODEL)))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseMimeType": "application/json",
                "thinkingConfig": { "thinkingBudget": 32768 },
                "responseSchema": { "type": "ARRAY" }
            }
        })))
        .respond_with(text_response(&suggestions(4)))
        .expect(1)
        .mount(&server)
        .await;

    let styles = client(&server)
        .suggest_styles("oval face", 4)
        .await
        .unwrap();
    let names: Vec<_> = styles.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Style 0", "Style 1", "Style 2", "Style 3"]);
    assert_eq!(styles[2].description, "look 2");
}

#[tokio::test]
async fn surplus_suggestions_are_truncated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(text_response(&suggestions(6)))
        .mount(&server)
        .await;

    let styles = client(&server)
        .suggest_styles("oval face", 4)
        .await
        .unwrap();
    assert_eq!(styles.len(), 4);
    assert_eq!(styles[3].name, "Style 3");
}

#[tokio::test]
async fn too_few_suggestions_are_insufficient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(text_response(&suggestions(3)))
        .mount(&server)
        .await;

    let err = client(&server)
        .suggest_styles("oval face", 4)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GenerationError::InsufficientResults {
            requested: 4,
            received: 3
        }
    );
    assert!(err.is_contract_violation());
}

#[tokio::test]
async fn unparseable_suggestions_are_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(text_response("Here are some ideas: a bob, a pixie"))
        .mount(&server)
        .await;

    let err = client(&server)
        .suggest_styles("oval face", 4)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse(_)), "{err:?}");
}

#[tokio::test]
async fn render_returns_first_inline_image() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(endpoint(GeminiConfig::DEFAULT_IMAGE_MODEL)))
        .and(body_partial_json(json!({
            "generationConfig": { "responseModalities": ["IMAGE"] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here is the hairstyle." },
                { "inlineData": { "mimeType": "image/png", "data": "Zmlyc3Q=" } },
                { "inlineData": { "mimeType": "image/png", "data": "c2Vjb25k" } }
            ] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let image = client(&server)
        .render_image("front view", &photo())
        .await
        .unwrap();
    assert_eq!(image, EncodedImage::new("image/png", "Zmlyc3Q="));
}

#[tokio::test]
async fn render_defaults_to_jpeg() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "data": "/9j/4AAQ" } }
            ] } }]
        })))
        .mount(&server)
        .await;

    let image = client(&server)
        .render_image("back view", &photo())
        .await
        .unwrap();
    assert_eq!(image.mime_type(), "image/jpeg");
    assert_eq!(image.data(), "/9j/4AAQ");
}

#[tokio::test]
async fn render_without_image_is_no_image_produced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(text_response("I can't help with that."))
        .mount(&server)
        .await;

    let err = client(&server)
        .render_image("left side", &photo())
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::NoImageProduced);
}

#[tokio::test]
async fn render_with_empty_image_data_is_no_image_produced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "" } }
            ] } }]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .render_image("right side", &photo())
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::NoImageProduced);
}
