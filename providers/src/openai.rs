//! OpenAI client: Chat Completions for conversation, Images API for generation.

use kxpert_types::{ApiKey, Provider};
use serde_json::{Value, json};

use crate::retry::RetryConfig;
use crate::{ChatProvider, ImageAttachment, ProviderError, http_client, require_key, send_json};

pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";
pub const DEFAULT_MAX_TOKENS: u32 = 1500;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are K-XpertAI, an intelligent assistant built by kingxTech. \
You are helpful and knowledgeable. Answer clearly, use markdown for structure, and put code in fenced blocks with a language tag.";

#[derive(Debug, Clone)]
pub struct OpenAISettings {
    pub model: String,
    pub base_url: String,
    pub image_model: String,
    pub image_size: String,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: OPENAI_API_BASE_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    api_key: Option<ApiKey>,
    settings: OpenAISettings,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl OpenAIProvider {
    #[must_use]
    pub fn new(api_key: Option<ApiKey>, settings: OpenAISettings) -> Self {
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

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.settings.base_url.trim_end_matches('/'))
    }

    async fn post(&self, key: &ApiKey, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let url = self.endpoint(path);
        let auth_header = format!("Bearer {}", key.expose_secret());
        send_json(
            || {
                self.client
                    .post(&url)
                    .header("Authorization", &auth_header)
                    .json(body)
            },
            &self.retry,
        )
        .await
    }
}

impl ChatProvider for OpenAIProvider {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn chat_complete(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String, ProviderError> {
        let key = require_key(self.api_key.as_ref(), Provider::OpenAI)?;
        let body = build_chat_body(&self.settings, prompt, image)?;

        tracing::debug!(model = %self.settings.model, with_image = image.is_some(), "OpenAI chat completion");
        let response = self.post(key, "chat/completions", &body).await?;
        extract_message(&response)
    }

    async fn image_generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let key = require_key(self.api_key.as_ref(), Provider::OpenAI)?;
        if prompt.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "image prompt is empty".to_string(),
            ));
        }
        let body = json!({
            "model": self.settings.image_model,
            "prompt": prompt.trim(),
            "n": 1,
            "size": self.settings.image_size,
            "quality": "standard",
        });

        tracing::debug!(model = %self.settings.image_model, "OpenAI image generation");
        let response = self.post(key, "images/generations", &body).await?;
        extract_image_url(&response)
    }
}

fn build_chat_body(
    settings: &OpenAISettings,
    prompt: &str,
    image: Option<&ImageAttachment>,
) -> Result<Value, ProviderError> {
    if prompt.is_empty() && image.is_none() {
        return Err(ProviderError::InvalidRequest(
            "a message needs text or an image".to_string(),
        ));
    }

    let mut messages = Vec::new();
    if let Some(system) = settings.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
        messages.push(json!({ "role": "system", "content": system }));
    }

    let user_content = match image {
        Some(image) => json!([
            { "type": "text", "text": prompt },
            { "type": "image_url", "image_url": { "url": image.to_data_uri() } },
        ]),
        None => Value::String(prompt.to_string()),
    };
    messages.push(json!({ "role": "user", "content": user_content }));

    Ok(json!({
        "model": settings.model,
        "messages": messages,
        "max_tokens": settings.max_tokens,
    }))
}

fn extract_message(response: &Value) -> Result<String, ProviderError> {
    let choice = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or(ProviderError::EmptyResponse)?;

    if let Some(refusal) = choice.pointer("/message/refusal").and_then(Value::as_str)
        && !refusal.trim().is_empty()
    {
        return Ok(refusal.to_string());
    }

    match choice.pointer("/message/content") {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
        Some(Value::String(_) | Value::Null) | None => Err(ProviderError::EmptyResponse),
        Some(other) => Err(ProviderError::Malformed(format!(
            "message content is not text: {other}"
        ))),
    }
}

fn extract_image_url(response: &Value) -> Result<String, ProviderError> {
    let first = response
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
        .ok_or(ProviderError::EmptyResponse)?;

    if let Some(url) = first.get("url").and_then(Value::as_str) {
        return Ok(url.to_string());
    }
    if let Some(b64) = first.get("b64_json").and_then(Value::as_str) {
        return Ok(format!("data:image/png;base64,{b64}"));
    }
    Err(ProviderError::Malformed(
        "image response has neither url nor b64_json".to_string(),
    ))
}
