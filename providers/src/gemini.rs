//! Google Gemini client.
//!
//! Chat goes through `models/{model}:generateContent`. Gemini has no image
//! generation endpoint in this setup, so [`GeminiProvider::image_generate`]
//! builds a URL on a public text-to-image proxy; the URL itself is the result.

use kxpert_types::{ApiKey, Provider};
use serde_json::{Value, json};

use crate::retry::RetryConfig;
use crate::{ChatProvider, ImageAttachment, ProviderError, http_client, require_key, send_json};

pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_IMAGE_PROXY_URL: &str = "https://image.pollinations.ai/prompt";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub model: String,
    pub base_url: String,
    pub image_proxy_url: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_API_BASE_URL.to_string(),
            image_proxy_url: DEFAULT_IMAGE_PROXY_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: Option<ApiKey>,
    settings: GeminiSettings,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl GeminiProvider {
    #[must_use]
    pub fn new(api_key: Option<ApiKey>, settings: GeminiSettings) -> Self {
        Self {
            api_key,
            settings,
            client: http_client().clone(),
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

impl ChatProvider for GeminiProvider {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn chat_complete(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String, ProviderError> {
        let key = require_key(self.api_key.as_ref(), Provider::Gemini)?;
        let url = self.generate_url();
        let body = build_request_body(prompt, image)?;

        tracing::debug!(model = %self.settings.model, with_image = image.is_some(), "Gemini generateContent");
        let response = send_json(
            || {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", key.expose_secret())
                    .json(&body)
            },
            &self.retry,
        )
        .await?;

        extract_text(&response)
    }

    async fn image_generate(&self, prompt: &str) -> Result<String, ProviderError> {
        proxy_image_url(&self.settings.image_proxy_url, prompt)
    }
}

fn build_request_body(prompt: &str, image: Option<&ImageAttachment>) -> Result<Value, ProviderError> {
    let mut parts = Vec::new();
    if !prompt.is_empty() {
        parts.push(json!({ "text": prompt }));
    }
    if let Some(image) = image {
        parts.push(json!({
            "inline_data": {
                "mime_type": image.mime_type(),
                "data": image.base64_data(),
            }
        }));
    }
    if parts.is_empty() {
        return Err(ProviderError::InvalidRequest(
            "a message needs text or an image".to_string(),
        ));
    }
    Ok(json!({ "contents": [{ "parts": parts }] }))
}

/// Concatenated text of the first candidate.
fn extract_text(response: &Value) -> Result<String, ProviderError> {
    let Some(candidate) = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
    else {
        if let Some(reason) = response.pointer("/promptFeedback/blockReason").and_then(Value::as_str) {
            tracing::info!(reason, "Gemini blocked the prompt");
        }
        return Err(ProviderError::EmptyResponse);
    };

    let parts = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .ok_or(ProviderError::EmptyResponse)?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
}

fn proxy_image_url(base: &str, prompt: &str) -> Result<String, ProviderError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ProviderError::InvalidRequest(
            "image prompt is empty".to_string(),
        ));
    }
    let mut url = url::Url::parse(base)
        .map_err(|e| ProviderError::InvalidRequest(format!("bad image proxy URL {base:?}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ProviderError::InvalidRequest(format!("image proxy URL {base:?} cannot take a path")))?
        .pop_if_empty()
        .push(prompt);
    Ok(url.into())
}
