//! Turns one user message into exactly one [`Outcome`].
//!
//! Order of checks: classify, refuse video on providers that cannot emulate
//! it, refuse anything without a credential, then call upstream. The first
//! two never touch the network.

use kxpert_providers::{ChatProvider, ImageAttachment, ProviderError};
use kxpert_types::{ClassificationResult, FailureKind, MediaKind, Outcome};
use kxpert_utils::SecretRedactor;

use crate::classifier::classify;

/// Appended to video prompts so the single generated frame reads as a film still.
pub const VIDEO_PROMPT_SUFFIX: &str =
    ", cinematic film still, dramatic lighting, motion blur, widescreen";

pub const EMPTY_RESPONSE_MESSAGE: &str = "I received a response, but it was empty. \
The model may have refused to answer due to its safety settings. Please try rephrasing your prompt.";

const PROVIDER_ERROR_PREFIX: &str = "I encountered an error: ";

pub struct Dispatcher<P> {
    provider: P,
    redactor: SecretRedactor,
}

impl<P: ChatProvider> Dispatcher<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            redactor: SecretRedactor::default(),
        }
    }

    /// Scrub these secrets from every failure message, on top of pattern redaction.
    #[must_use]
    pub fn with_redactor(mut self, redactor: SecretRedactor) -> Self {
        self.redactor = redactor;
        self
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Never panics and never returns an error: every failure is an `Outcome::Failure`.
    pub async fn handle_turn(&self, raw: &str, image: Option<&ImageAttachment>) -> Outcome {
        let classification = classify(raw);
        tracing::debug!(
            provider = %self.provider.provider(),
            media = classification.is_media(),
            with_image = image.is_some(),
            "Dispatching turn"
        );

        match classification {
            ClassificationResult::VideoRequest { cleaned_prompt } => {
                if !self.provider.supports_video() {
                    return Outcome::Failure {
                        kind: FailureKind::Capability,
                        message: format!(
                            "Video generation needs OpenAI. You're using {}. \
                             Switch provider in settings to use this feature.",
                            self.provider.provider().short_name()
                        ),
                    };
                }
                if let Some(failure) = self.missing_credentials() {
                    return failure;
                }
                let prompt = format!("{cleaned_prompt}{VIDEO_PROMPT_SUFFIX}");
                self.generate(&prompt, MediaKind::GeneratedVideo).await
            }
            ClassificationResult::ImageRequest { cleaned_prompt } => {
                if let Some(failure) = self.missing_credentials() {
                    return failure;
                }
                self.generate(&cleaned_prompt, MediaKind::GeneratedImage)
                    .await
            }
            ClassificationResult::PlainChat => {
                if let Some(failure) = self.missing_credentials() {
                    return failure;
                }
                match self.provider.chat_complete(raw, image).await {
                    Ok(text) => Outcome::ChatReply { text },
                    Err(error) => self.failure(error),
                }
            }
        }
    }

    async fn generate(&self, prompt: &str, kind: MediaKind) -> Outcome {
        match self.provider.image_generate(prompt).await {
            Ok(url) => Outcome::MediaReply { url, kind },
            Err(error) => self.failure(error),
        }
    }

    fn missing_credentials(&self) -> Option<Outcome> {
        if self.provider.has_credentials() {
            return None;
        }
        Some(Outcome::Failure {
            kind: FailureKind::Auth,
            message: format!(
                "{} API key not configured. Please go to settings and enter your API key.",
                self.provider.provider().short_name()
            ),
        })
    }

    fn failure(&self, error: ProviderError) -> Outcome {
        tracing::warn!(provider = %self.provider.provider(), "Turn failed: {error}");
        let (kind, message) = match error {
            ProviderError::Auth(message) => (FailureKind::Auth, message),
            ProviderError::EmptyResponse => {
                (FailureKind::EmptyResponse, EMPTY_RESPONSE_MESSAGE.to_string())
            }
            ProviderError::Upstream { message, .. } => {
                (FailureKind::Provider, format!("{PROVIDER_ERROR_PREFIX}{message}"))
            }
            other @ (ProviderError::Malformed(_)
            | ProviderError::Transport(_)
            | ProviderError::InvalidRequest(_)) => {
                (FailureKind::Provider, format!("{PROVIDER_ERROR_PREFIX}{other}"))
            }
        };
        Outcome::Failure {
            kind,
            message: self.redactor.redact(&message),
        }
    }
}
