//! Upstream provider clients.
//!
//! # Architecture
//!
//! Both providers sit behind the [`ChatProvider`] capability trait:
//!
//! - [`gemini`] - Google Gemini `generateContent` for chat; images come from a
//!   public text-to-image proxy, so image generation needs no network call here
//! - [`openai`] - OpenAI Chat Completions for chat and the Images API for generation
//!
//! [`ProviderClient`] holds exactly one of them, selected from configuration.
//! Callers never branch on the provider name.
//!
//! # Error Handling
//!
//! Every failure is a [`ProviderError`]. Upstream messages are passed through
//! (after API-key redaction) so the user sees why a request was rejected.

#![allow(clippy::missing_errors_doc)]

pub mod attachment;
pub mod gemini;
pub mod openai;
pub mod retry;

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

pub use attachment::{AttachmentError, ImageAttachment};
pub use gemini::{GeminiProvider, GeminiSettings};
pub use kxpert_types;
pub use openai::{OpenAIProvider, OpenAISettings};

use kxpert_types::{ApiKey, Provider, ProviderConfig};
use serde_json::Value;

const CONNECT_TIMEOUT_SECS: u64 = 30;
/// Whole-request timeout. Image generation is the slow path.
const REQUEST_TIMEOUT_SECS: u64 = 120;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Shared HTTPS-only client.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().build().unwrap_or_else(|e| {
            tracing::error!("Failed to build hardened HTTP client: {e}. Using defaults.");
            reqwest::Client::new()
        })
    })
}

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .https_only(true)
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .user_agent(concat!("kxpert/", env!("CARGO_PKG_VERSION")))
}

/// Failure taxonomy for upstream calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Missing key, or the upstream rejected it (401/403).
    #[error("{0}")]
    Auth(String),
    /// Upstream returned a non-success status.
    #[error("{message}")]
    Upstream { status: u16, message: String },
    /// Upstream succeeded but produced no usable content.
    #[error("the response contained no content")]
    EmptyResponse,
    /// A success response whose body did not have the expected shape.
    #[error("unexpected response from provider: {0}")]
    Malformed(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    pub(crate) fn missing_key(provider: Provider) -> Self {
        ProviderError::Auth(format!(
            "{} API key not configured. Please go to settings and enter your API key.",
            provider.short_name()
        ))
    }
}

/// The capability interface both upstreams implement.
pub trait ChatProvider: Send + Sync {
    fn provider(&self) -> Provider;

    fn has_credentials(&self) -> bool;

    /// Whether emulated video generation is offered.
    fn supports_video(&self) -> bool {
        self.provider().supports_video()
    }

    /// Answer `prompt`, optionally looking at an attached image.
    fn chat_complete(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;

    /// Produce a resolvable URL for an image matching `prompt`.
    fn image_generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Endpoint and model settings for both providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub gemini: GeminiSettings,
    pub openai: OpenAISettings,
}

/// The active provider, selected by configuration.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    Gemini(GeminiProvider),
    OpenAI(OpenAIProvider),
}

impl ProviderClient {
    #[must_use]
    pub fn from_config(config: &ProviderConfig, settings: &ProviderSettings) -> Self {
        let key = config.api_key().cloned();
        match config.provider() {
            Provider::Gemini => Self::Gemini(GeminiProvider::new(key, settings.gemini.clone())),
            Provider::OpenAI => Self::OpenAI(OpenAIProvider::new(key, settings.openai.clone())),
        }
    }

    /// Replace the HTTP client (tests point this at a plain-HTTP mock server).
    #[must_use]
    pub fn with_http_client(self, client: reqwest::Client) -> Self {
        match self {
            Self::Gemini(p) => Self::Gemini(p.with_client(client)),
            Self::OpenAI(p) => Self::OpenAI(p.with_client(client)),
        }
    }

    #[must_use]
    pub fn with_retry(self, retry: retry::RetryConfig) -> Self {
        match self {
            Self::Gemini(p) => Self::Gemini(p.with_retry(retry)),
            Self::OpenAI(p) => Self::OpenAI(p.with_retry(retry)),
        }
    }
}

impl ChatProvider for ProviderClient {
    fn provider(&self) -> Provider {
        match self {
            Self::Gemini(p) => p.provider(),
            Self::OpenAI(p) => p.provider(),
        }
    }

    fn has_credentials(&self) -> bool {
        match self {
            Self::Gemini(p) => p.has_credentials(),
            Self::OpenAI(p) => p.has_credentials(),
        }
    }

    async fn chat_complete(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String, ProviderError> {
        match self {
            Self::Gemini(p) => p.chat_complete(prompt, image).await,
            Self::OpenAI(p) => p.chat_complete(prompt, image).await,
        }
    }

    async fn image_generate(&self, prompt: &str) -> Result<String, ProviderError> {
        match self {
            Self::Gemini(p) => p.image_generate(prompt).await,
            Self::OpenAI(p) => p.image_generate(prompt).await,
        }
    }
}

pub(crate) fn require_key(key: Option<&ApiKey>, provider: Provider) -> Result<&ApiKey, ProviderError> {
    key.ok_or_else(|| ProviderError::missing_key(provider))
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// `error.message` from a JSON error body, else the trimmed body, else the status text.
fn upstream_message(body: &str, status: reqwest::StatusCode) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        json.pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    let message = match from_json {
        Some(message) if !message.trim().is_empty() => message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => format!(
            "API error: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string(),
    };
    kxpert_utils::redact_api_keys(&message)
}

/// Send a JSON request with retries and decode the JSON response.
pub(crate) async fn send_json<F>(
    build_request: F,
    retry: &retry::RetryConfig,
) -> Result<Value, ProviderError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = match retry::send_with_retry(build_request, retry).await {
        retry::RetryOutcome::Success(response) => response,
        retry::RetryOutcome::HttpError(response) => {
            let status = response.status();
            let body = read_capped_error_body(response).await;
            let message = upstream_message(&body, status);
            tracing::warn!(status = status.as_u16(), "Provider returned error status");
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::Auth(message),
                code => ProviderError::Upstream {
                    status: code,
                    message,
                },
            });
        }
        retry::RetryOutcome::ConnectionError { attempts, source } => {
            let detail = kxpert_utils::redact_api_keys(&source.to_string());
            return Err(ProviderError::Transport(format!(
                "request failed after {attempts} attempt{}: {detail}",
                if attempts == 1 { "" } else { "s" }
            )));
        }
    };

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::Malformed(format!("invalid JSON body: {e}")))
}
