//! Core domain types for K-Xpert.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod chat;
mod outcome;

pub use chat::{ChatHistory, ChatTurn, MediaAttachment, MediaKind, Sender};
pub use outcome::{ClassificationResult, FailureKind, Outcome};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Provider Types
// ============================================================================

/// Supported upstream providers.
///
/// Gemini handles text and vision. OpenAI additionally handles image generation
/// through its images endpoint, which is also what emulated video generation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    OpenAI,
}

#[derive(Debug, Error)]
#[error("unknown provider: {0:?} (expected \"gemini\" or \"openai\")")]
pub struct ProviderParseError(pub String);

impl Provider {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
        }
    }

    /// Short label used by the API status indicator.
    #[must_use]
    pub const fn short_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::OpenAI => "OpenAI",
        }
    }

    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Google Gemini",
            Provider::OpenAI => "OpenAI GPT",
        }
    }

    #[must_use]
    pub const fn env_var(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// Whether emulated video generation is available on this provider.
    #[must_use]
    pub const fn supports_video(&self) -> bool {
        matches!(self, Provider::OpenAI)
    }

    /// Human-readable capability list used in the setup greeting.
    #[must_use]
    pub const fn capabilities(&self) -> &'static str {
        match self {
            Provider::Gemini => "conversations, code analysis, and image processing!",
            Provider::OpenAI => {
                "conversations, code analysis, image processing, and image generation using DALL-E!"
            }
        }
    }

    /// Parse provider from string.
    pub fn parse(s: &str) -> Result<Self, ProviderParseError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" | "gpt" | "chatgpt" => Ok(Provider::OpenAI),
            _ => Err(ProviderParseError(s.to_string())),
        }
    }

    #[must_use]
    pub fn all() -> &'static [Provider] {
        &[Provider::Gemini, Provider::OpenAI]
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// API Key Types
// ============================================================================

/// A non-empty API credential.
///
/// Note: `Debug` is manually implemented to redact the key value, preventing accidental
/// credential disclosure in logs or error messages.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKey(String);

#[derive(Debug, Error)]
#[error("API key must not be empty")]
pub struct EmptyApiKeyError;

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyApiKeyError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(EmptyApiKeyError);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl TryFrom<String> for ApiKey {
    type Error = EmptyApiKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiKey> for String {
    fn from(value: ApiKey) -> Self {
        value.0
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// The provider selection plus its credential.
///
/// Set once at setup or settings-save and read on every turn. A missing key is
/// representable because the user may skip setup; dispatching without a key
/// fails with an auth error before any network call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    provider: Provider,
    #[serde(default)]
    api_key: Option<ApiKey>,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(provider: Provider, api_key: Option<ApiKey>) -> Self {
        Self { provider, api_key }
    }

    /// Build from a raw key string; blank input means "no key".
    #[must_use]
    pub fn from_raw(provider: Provider, raw_key: &str) -> Self {
        Self::new(provider, ApiKey::new(raw_key).ok())
    }

    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    #[must_use]
    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Label shown by the API status indicator: the provider name, or `No Key`.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        if self.has_key() {
            self.provider.short_name()
        } else {
            "No Key"
        }
    }
}

// ============================================================================
// Theme
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}
