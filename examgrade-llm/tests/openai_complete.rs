#![cfg(feature = "openai")]

use examgrade_core::{ChatLlm, GradeError, LlmRequest, Message};
use examgrade_llm::OpenAiCompatibleClient;
use httpmock::prelude::*;
use serde_json::json;

fn request(json_response: bool) -> LlmRequest {
    LlmRequest {
        model: String::new(),
        messages: vec![Message::system("Grade fairly."), Message::user("Q1")],
        temperature: Some(0.0),
        max_output_tokens: Some(256),
        json_response,
    }
}

#[tokio::test]
async fn openai_posts_chat_completion_with_bearer_auth() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer sk-test")
            .json_body(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "Grade fairly."},
                    {"role": "user", "content": "Q1"}
                ],
                "temperature": 0.0,
                "max_tokens": 256,
                "response_format": {"type": "json_object"},
                "stream": false
            }));
        then.status(200).json_body(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"score\": 8}"},
                "finish_reason": "stop"
            }]
        }));
    });

    let client =
        OpenAiCompatibleClient::new(&server.url("/v1"), "sk-test", "gpt-4o-mini").unwrap();
    let response = client.complete(request(true)).await.unwrap();
    assert_eq!(response.content, "{\"score\": 8}");
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    mock.assert();
}

#[tokio::test]
async fn openai_omits_response_format_for_plain_text() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .matches(|req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body.as_deref().unwrap_or_default()).unwrap();
                body.get("response_format").is_none()
            });
        then.status(200).json_body(json!({
            "choices": [{"message": {"content": "Merhaba"}, "finish_reason": "stop"}]
        }));
    });

    let client = OpenAiCompatibleClient::new(&server.url(""), "sk-test", "gpt-4o-mini").unwrap();
    let response = client.complete(request(false)).await.unwrap();
    assert_eq!(response.content, "Merhaba");
    mock.assert();
}

#[tokio::test]
async fn openai_maps_rate_limit_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST);
        then.status(429).json_body(json!({
            "error": {"message": "You exceeded your current quota", "type": "insufficient_quota"}
        }));
    });

    let client = OpenAiCompatibleClient::new(&server.url(""), "sk-test", "gpt-4o-mini").unwrap();
    let err = client.complete(request(true)).await.unwrap_err();
    assert!(matches!(err, GradeError::RateLimited { status: Some(429), .. }));
}

#[test]
fn openai_rejects_invalid_base_url() {
    let err = OpenAiCompatibleClient::new("not a url", "k", "m").unwrap_err();
    assert!(matches!(err, GradeError::InvalidConfig(_)));
}
