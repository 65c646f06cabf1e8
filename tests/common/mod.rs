//! Shared test utilities and fixtures.
//!
//! Mock Gemini and OpenAI servers, and a connector that points real provider
//! clients at them over plain HTTP with retries disabled.

#![allow(dead_code)]

use kxpert_engine::{ConnectProvider, Dispatcher, SessionState};
use kxpert_providers::retry::RetryConfig;
use kxpert_providers::{GeminiSettings, OpenAISettings, ProviderClient, ProviderSettings};
use kxpert_types::{Provider, ProviderConfig, Theme};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GEMINI_TEST_KEY: &str = "AIzaTestKey0123456789";
pub const OPENAI_TEST_KEY: &str = "sk-test-0123456789abcdefghijklmn";

pub const GEMINI_CHAT_PATH: &str = "/models/gemini-1.5-flash:generateContent";

/// Real provider clients aimed at mock servers.
#[derive(Clone)]
pub struct MockConnector {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl MockConnector {
    pub fn new(gemini: Option<&MockServer>, openai: Option<&MockServer>) -> Self {
        let mut settings = ProviderSettings::default();
        if let Some(server) = gemini {
            settings.gemini = GeminiSettings {
                base_url: server.uri(),
                ..GeminiSettings::default()
            };
        }
        if let Some(server) = openai {
            settings.openai = OpenAISettings {
                base_url: server.uri(),
                ..OpenAISettings::default()
            };
        }
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }
}

impl ConnectProvider for MockConnector {
    type Provider = ProviderClient;

    fn connect(&self, config: &ProviderConfig) -> ProviderClient {
        ProviderClient::from_config(config, &self.settings)
            .with_http_client(self.client.clone())
            .with_retry(RetryConfig::none())
    }
}

pub fn gemini_config() -> ProviderConfig {
    ProviderConfig::from_raw(Provider::Gemini, GEMINI_TEST_KEY)
}

pub fn openai_config() -> ProviderConfig {
    ProviderConfig::from_raw(Provider::OpenAI, OPENAI_TEST_KEY)
}

pub fn dispatcher(connector: &MockConnector, config: &ProviderConfig) -> Dispatcher<ProviderClient> {
    Dispatcher::new(connector.connect(config))
}

pub fn session(connector: MockConnector, config: ProviderConfig) -> SessionState<MockConnector> {
    SessionState::new(connector, config, Theme::Light)
}

/// Gemini `generateContent` answering with `text`.
pub async fn mount_gemini_reply(server: &MockServer, text: &str) {
    let body = json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    });
    Mock::given(method("POST"))
        .and(path(GEMINI_CHAT_PATH))
        .and(header("x-goog-api-key", GEMINI_TEST_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Gemini response with no candidates, as after a safety block.
pub async fn mount_gemini_blocked(server: &MockServer) {
    let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
    Mock::given(method("POST"))
        .and(path(GEMINI_CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// OpenAI Chat Completions answering with `text`.
pub async fn mount_openai_reply(server: &MockServer, text: &str) {
    let body = json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }]
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", format!("Bearer {OPENAI_TEST_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// OpenAI Images API answering with `url`.
pub async fn mount_openai_image(server: &MockServer, url: &str) {
    let body = json!({ "created": 1_700_000_000, "data": [{ "url": url }] });
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Any POST to `route` fails with `status` and an OpenAI-style error body.
pub async fn mount_error(server: &MockServer, route: &str, status: u16, message: &str) {
    let body = json!({ "error": { "message": message, "type": "invalid_request_error" } });
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Fails verification if anything reaches the server.
pub async fn forbid_requests(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}
