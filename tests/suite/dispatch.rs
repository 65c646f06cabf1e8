//! Dispatcher against mock Gemini and OpenAI servers.

use kxpert_engine::{EMPTY_RESPONSE_MESSAGE, FailureKind, Outcome, VIDEO_PROMPT_SUFFIX};
use kxpert_providers::ImageAttachment;
use kxpert_types::{MediaKind, Provider, ProviderConfig};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use crate::common::{
    GEMINI_CHAT_PATH, MockConnector, OPENAI_TEST_KEY, dispatcher, forbid_requests, gemini_config,
    mount_error, mount_gemini_blocked, mount_gemini_reply, mount_openai_image, mount_openai_reply,
    openai_config,
};

#[tokio::test]
async fn gemini_chat_reply() {
    let server = MockServer::start().await;
    mount_gemini_reply(&server, "Hi! How can I help?").await;
    let connector = MockConnector::new(Some(&server), None);

    let outcome = dispatcher(&connector, &gemini_config())
        .handle_turn("hello", None)
        .await;

    assert_eq!(
        outcome,
        Outcome::ChatReply {
            text: "Hi! How can I help?".to_string()
        }
    );
}

#[tokio::test]
async fn gemini_receives_inline_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_CHAT_PATH))
        .and(body_partial_json(json!({
            "contents": [{
                "parts": [
                    { "text": "what is this?" },
                    { "inline_data": { "mime_type": "image/png", "data": "iVBORw0KGgo=" } }
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "A tiny PNG." }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let connector = MockConnector::new(Some(&server), None);
    let image = ImageAttachment::parse_data_uri("data:image/png;base64,iVBORw0KGgo=").unwrap();

    let outcome = dispatcher(&connector, &gemini_config())
        .handle_turn("what is this?", Some(&image))
        .await;

    assert_eq!(
        outcome,
        Outcome::ChatReply {
            text: "A tiny PNG.".to_string()
        }
    );
}

#[tokio::test]
async fn gemini_safety_block_is_soft_failure() {
    let server = MockServer::start().await;
    mount_gemini_blocked(&server).await;
    let connector = MockConnector::new(Some(&server), None);

    let outcome = dispatcher(&connector, &gemini_config())
        .handle_turn("something borderline", None)
        .await;

    assert_eq!(
        outcome,
        Outcome::Failure {
            kind: FailureKind::EmptyResponse,
            message: EMPTY_RESPONSE_MESSAGE.to_string(),
        }
    );
}

#[tokio::test]
async fn gemini_image_uses_proxy_without_network() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;
    let connector = MockConnector::new(Some(&server), None);

    let outcome = dispatcher(&connector, &gemini_config())
        .handle_turn("draw a picture of a red fox", None)
        .await;

    assert_eq!(
        outcome,
        Outcome::MediaReply {
            url: "https://image.pollinations.ai/prompt/a%20red%20fox".to_string(),
            kind: MediaKind::GeneratedImage,
        }
    );
}

#[tokio::test]
async fn video_on_gemini_makes_no_request() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;
    let connector = MockConnector::new(Some(&server), None);

    let outcome = dispatcher(&connector, &gemini_config())
        .handle_turn("create a video of a cat dancing", None)
        .await;

    let Outcome::Failure { kind, message } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(kind, FailureKind::Capability);
    assert!(message.contains("OpenAI"));
}

#[tokio::test]
async fn openai_chat_with_image_sends_content_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(|request: &Request| {
            let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
                return false;
            };
            body.pointer("/messages/1/content/1/image_url/url")
                .and_then(Value::as_str)
                == Some("data:image/jpeg;base64,/9j/4AAQ")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "A photo." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let connector = MockConnector::new(None, Some(&server));
    let image = ImageAttachment::parse_data_uri("data:image/jpeg;base64,/9j/4AAQ").unwrap();

    let outcome = dispatcher(&connector, &openai_config())
        .handle_turn("describe this", Some(&image))
        .await;

    assert_eq!(
        outcome,
        Outcome::ChatReply {
            text: "A photo.".to_string()
        }
    );
}

#[tokio::test]
async fn openai_image_request_sends_cleaned_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(body_partial_json(json!({ "model": "dall-e-3", "prompt": "a cat", "n": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "url": "https://cdn.example/cat.png" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let connector = MockConnector::new(None, Some(&server));

    let outcome = dispatcher(&connector, &openai_config())
        .handle_turn("generate an image of a cat", None)
        .await;

    assert_eq!(
        outcome,
        Outcome::MediaReply {
            url: "https://cdn.example/cat.png".to_string(),
            kind: MediaKind::GeneratedImage,
        }
    );
}

#[tokio::test]
async fn openai_video_request_is_a_cinematic_still() {
    let server = MockServer::start().await;
    let expected_prompt = format!("a cat dancing{VIDEO_PROMPT_SUFFIX}");
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(body_partial_json(json!({ "prompt": expected_prompt })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "url": "https://cdn.example/still.png" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let connector = MockConnector::new(None, Some(&server));

    let outcome = dispatcher(&connector, &openai_config())
        .handle_turn("create a video of a cat dancing", None)
        .await;

    assert_eq!(
        outcome,
        Outcome::MediaReply {
            url: "https://cdn.example/still.png".to_string(),
            kind: MediaKind::GeneratedVideo,
        }
    );
}

#[tokio::test]
async fn missing_key_fails_before_network() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;
    let connector = MockConnector::new(Some(&server), Some(&server));

    for provider in Provider::all() {
        let config = ProviderConfig::new(*provider, None);
        let outcome = dispatcher(&connector, &config).handle_turn("hello", None).await;
        assert!(
            matches!(outcome, Outcome::Failure { kind: FailureKind::Auth, .. }),
            "{provider}: {outcome:?}"
        );
    }
}

#[tokio::test]
async fn rejected_key_is_auth_failure_with_redacted_message() {
    let server = MockServer::start().await;
    mount_error(
        &server,
        "/chat/completions",
        401,
        &format!("Incorrect API key provided: {OPENAI_TEST_KEY}."),
    )
    .await;
    let connector = MockConnector::new(None, Some(&server));

    let outcome = dispatcher(&connector, &openai_config())
        .handle_turn("hello", None)
        .await;

    let Outcome::Failure { kind, message } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(kind, FailureKind::Auth);
    assert!(message.starts_with("Incorrect API key provided"));
    assert!(!message.contains(OPENAI_TEST_KEY));
}

#[tokio::test]
async fn upstream_error_message_is_passed_through() {
    let server = MockServer::start().await;
    mount_error(&server, "/chat/completions", 400, "Invalid 'max_tokens': too large").await;
    let connector = MockConnector::new(None, Some(&server));

    let outcome = dispatcher(&connector, &openai_config())
        .handle_turn("hello", None)
        .await;

    assert_eq!(
        outcome,
        Outcome::Failure {
            kind: FailureKind::Provider,
            message: "I encountered an error: Invalid 'max_tokens': too large".to_string(),
        }
    );
}

#[tokio::test]
async fn openai_chat_reply() {
    let server = MockServer::start().await;
    mount_openai_reply(&server, "```rust\nfn main() {}\n```").await;
    mount_openai_image(&server, "https://unused.example").await;
    let connector = MockConnector::new(None, Some(&server));

    let outcome = dispatcher(&connector, &openai_config())
        .handle_turn("write a rust hello world", None)
        .await;

    assert_eq!(
        outcome,
        Outcome::ChatReply {
            text: "```rust\nfn main() {}\n```".to_string()
        }
    );
}
