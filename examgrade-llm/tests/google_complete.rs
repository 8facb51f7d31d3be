#![cfg(feature = "google")]

use examgrade_core::{ChatLlm, GradeError, LlmRequest, Message};
use examgrade_llm::GeminiClient;
use httpmock::prelude::*;
use serde_json::json;

fn request() -> LlmRequest {
    LlmRequest {
        model: String::new(),
        messages: vec![Message::system("Copy verbatim."), Message::user("hi")],
        temperature: Some(0.0),
        max_output_tokens: Some(8192),
        json_response: true,
    }
}

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::new("test-key", "gemini-2.0-flash")
        .unwrap()
        .with_base_url(server.url(""))
}

#[tokio::test]
async fn gemini_sends_generation_config_and_relaxed_safety() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.0-flash:generateContent")
            .query_param("key", "test-key")
            .json_body(json!({
                "systemInstruction": {"parts": [{"text": "Copy verbatim."}]},
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
                "generationConfig": {
                    "temperature": 0.0,
                    "maxOutputTokens": 8192,
                    "responseMimeType": "application/json"
                },
                "safetySettings": [
                    {"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE"},
                    {"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE"},
                    {"category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE"},
                    {"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE"}
                ]
            }));
        then.status(200).json_body(json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"questions\": "}, {"text": "[]}"}]},
                "finishReason": "STOP"
            }]
        }));
    });

    let response = client(&server).complete(request()).await.unwrap();
    assert_eq!(response.content, "{\"questions\": []}");
    assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    mock.assert();
}

#[tokio::test]
async fn gemini_request_model_overrides_default_and_strips_prefix() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}}]
        }));
    });

    let mut req = request();
    req.model = "models/gemini-2.5-flash".to_string();
    let response = client(&server).complete(req).await.unwrap();
    assert_eq!(response.content, "ok");
    mock.assert();
}

#[tokio::test]
async fn gemini_maps_429_to_rate_limited() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(429).json_body(json!({
            "error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED"}
        }));
    });

    let err = client(&server).complete(request()).await.unwrap_err();
    assert!(err.is_rate_limited());
    match err {
        GradeError::RateLimited { status, message } => {
            assert_eq!(status, Some(429));
            assert!(message.contains("exhausted"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn gemini_reports_other_http_errors_as_provider_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(500).body("upstream exploded");
    });

    let err = client(&server).complete(request()).await.unwrap_err();
    match err {
        GradeError::LlmProvider(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn gemini_blocked_generation_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }));
    });

    let err = client(&server).complete(request()).await.unwrap_err();
    assert!(err.to_string().contains("Generation blocked: SAFETY"));
}

#[tokio::test]
async fn gemini_without_candidates_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(json!({}));
    });

    let err = client(&server).complete(request()).await.unwrap_err();
    assert!(err.to_string().contains("No candidates"));
}
