//! Session state: the provider selection, theme and chat history of one user.
//!
//! Created at startup (optionally restored from a [`SessionStore`]) and
//! changed only through the named operations below. Every mutation is written
//! back to the store when one is attached.

use kxpert_providers::{ChatProvider, ImageAttachment, ProviderClient, ProviderSettings};
use kxpert_types::{ApiKey, ChatHistory, ChatTurn, MediaKind, Outcome, Provider, ProviderConfig, Theme};
use kxpert_utils::SecretRedactor;

use crate::dispatcher::Dispatcher;
use crate::store::{PersistedSession, SessionStore};

pub const IMAGE_REPLY_TEXT: &str = "Here's your generated image based on your prompt:";
pub const VIDEO_REPLY_TEXT: &str =
    "Here's a cinematic still generated for your video request:";

const SKIP_SETUP_WELCOME: &str = "Welcome! To start our conversation, please go to settings and enter your API key. \
Note: video generation is only available with OpenAI API keys.";

const NO_KEY_GREETING: &str =
    "Hello! To start our conversation, please go to settings and enter your API key.";

/// Builds the provider a session dispatches to from its current configuration.
pub trait ConnectProvider {
    type Provider: ChatProvider;

    fn connect(&self, config: &ProviderConfig) -> Self::Provider;
}

impl ConnectProvider for ProviderSettings {
    type Provider = ProviderClient;

    fn connect(&self, config: &ProviderConfig) -> ProviderClient {
        ProviderClient::from_config(config, self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Please enter an API key.")]
    EmptyApiKey,
}

pub struct SessionState<C: ConnectProvider = ProviderSettings> {
    connector: C,
    dispatcher: Dispatcher<C::Provider>,
    provider_config: ProviderConfig,
    theme: Theme,
    setup_complete: bool,
    history: ChatHistory,
    /// Whether failed turns are kept in history (they are always displayed).
    persist_failures: bool,
    store: Option<SessionStore>,
}

impl<C: ConnectProvider> SessionState<C> {
    /// Fresh in-memory session; setup has not happened yet.
    pub fn new(connector: C, provider_config: ProviderConfig, theme: Theme) -> Self {
        let dispatcher = build_dispatcher(&connector, &provider_config);
        Self {
            connector,
            dispatcher,
            provider_config,
            theme,
            setup_complete: false,
            history: ChatHistory::new(),
            persist_failures: true,
            store: None,
        }
    }

    /// Resume from `store`, falling back to the given defaults.
    ///
    /// A stored session without a key picks up the default key when it is
    /// for the same provider, so keys supplied through the environment keep
    /// working after setup was skipped.
    pub fn restore(
        connector: C,
        store: SessionStore,
        default_config: ProviderConfig,
        default_theme: Theme,
    ) -> Self {
        let persisted = match store.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!("Failed to load session, starting fresh: {e}");
                None
            }
        };

        let Some(persisted) = persisted else {
            let mut session = Self::new(connector, default_config, default_theme);
            session.store = Some(store);
            return session;
        };

        let provider_config = if !persisted.provider_config.has_key()
            && default_config.provider() == persisted.provider_config.provider()
        {
            default_config
        } else {
            persisted.provider_config
        };

        tracing::info!(
            provider = %provider_config.provider(),
            turns = persisted.history.len(),
            "Restored session"
        );
        let mut session = Self::new(connector, provider_config, persisted.theme);
        session.setup_complete = persisted.setup_complete;
        session.history = persisted.history;
        session.store = Some(store);
        session
    }

    #[must_use]
    pub fn with_persist_failures(mut self, persist_failures: bool) -> Self {
        self.persist_failures = persist_failures;
        self
    }

    #[must_use]
    pub fn provider_config(&self) -> &ProviderConfig {
        &self.provider_config
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider_config.provider()
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    #[must_use]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    #[must_use]
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete
    }

    #[must_use]
    pub fn persist_failures(&self) -> bool {
        self.persist_failures
    }

    /// `Gemini`, `OpenAI` or `No Key`.
    #[must_use]
    pub fn api_status(&self) -> &'static str {
        self.provider_config.status_label()
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher<C::Provider> {
        &self.dispatcher
    }

    /// Finish first-run setup. A blank key is accepted and means "no key yet".
    pub fn complete_setup(&mut self, provider: Provider, raw_key: &str) {
        self.reconfigure(ProviderConfig::from_raw(provider, raw_key));
        self.setup_complete = true;

        let greeting = if self.provider_config.has_key() {
            format!(
                "Great! I'm now connected using {}. I'm ready to help with {}",
                provider.display_name(),
                provider.capabilities()
            )
        } else {
            NO_KEY_GREETING.to_string()
        };
        self.history.push(ChatTurn::assistant(greeting));
        tracing::info!(provider = %provider, has_key = self.provider_config.has_key(), "Setup complete");
        self.persist();
    }

    /// Skip setup: Gemini without a key, plus a pointer to settings.
    pub fn skip_setup(&mut self) {
        self.reconfigure(ProviderConfig::new(Provider::Gemini, None));
        self.setup_complete = true;
        self.history.push(ChatTurn::assistant(SKIP_SETUP_WELCOME));
        tracing::info!("Setup skipped");
        self.persist();
    }

    /// Replace provider, key and theme together. Nothing changes on error.
    pub fn save_settings(
        &mut self,
        provider: Provider,
        raw_key: &str,
        theme: Theme,
    ) -> Result<(), SettingsError> {
        let key = ApiKey::new(raw_key).map_err(|_| SettingsError::EmptyApiKey)?;
        self.reconfigure(ProviderConfig::new(provider, Some(key)));
        self.theme = theme;
        tracing::info!(provider = %provider, theme = theme.as_str(), "Settings saved");
        self.persist();
        Ok(())
    }

    /// Switch provider, keeping the current key.
    pub fn set_provider(&mut self, provider: Provider) {
        let key = self.provider_config.api_key().cloned();
        self.reconfigure(ProviderConfig::new(provider, key));
        self.persist();
    }

    /// Set or, with blank input, remove the key.
    pub fn set_api_key(&mut self, raw_key: &str) {
        self.reconfigure(ProviderConfig::from_raw(self.provider(), raw_key));
        self.persist();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.persist();
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    /// Empty the history. The only non-append change it ever sees.
    pub fn clear(&mut self) {
        self.history.clear();
        tracing::info!("Chat cleared");
        self.persist();
    }

    /// Handle one user submission.
    ///
    /// Returns `None` (recording nothing) for blank text without an image.
    /// Otherwise the user turn is appended, the dispatcher runs, and the
    /// reply is appended; a failure is appended only when failures persist.
    /// The returned outcome is always shown to the user.
    pub async fn submit_turn(
        &mut self,
        text: &str,
        image: Option<ImageAttachment>,
    ) -> Option<Outcome> {
        let text = text.trim();
        if text.is_empty() && image.is_none() {
            return None;
        }

        let upload = image.as_ref().map(ImageAttachment::to_data_uri);
        self.history.push(ChatTurn::user(text, upload));
        self.persist();

        let outcome = self.dispatcher.handle_turn(text, image.as_ref()).await;

        match &outcome {
            Outcome::ChatReply { text } => self.history.push(ChatTurn::assistant(text.clone())),
            Outcome::MediaReply { url, kind } => {
                let caption = match kind {
                    MediaKind::GeneratedVideo => VIDEO_REPLY_TEXT,
                    MediaKind::GeneratedImage | MediaKind::UserUpload => IMAGE_REPLY_TEXT,
                };
                self.history
                    .push(ChatTurn::assistant_with_media(caption, url.clone(), *kind));
            }
            Outcome::Failure { kind, message } => {
                tracing::debug!(kind = ?kind, persisted = self.persist_failures, "Turn failed");
                if self.persist_failures {
                    self.history.push(ChatTurn::assistant(message.clone()));
                }
            }
        }
        self.persist();
        Some(outcome)
    }

    fn reconfigure(&mut self, provider_config: ProviderConfig) {
        self.dispatcher = build_dispatcher(&self.connector, &provider_config);
        self.provider_config = provider_config;
    }

    fn snapshot(&self) -> PersistedSession {
        PersistedSession {
            provider_config: self.provider_config.clone(),
            theme: self.theme,
            setup_complete: self.setup_complete,
            history: self.history.clone(),
            version: PersistedSession::CURRENT_VERSION,
        }
    }

    fn persist(&self) {
        let Some(store) = &self.store else { return };
        if let Err(e) = store.save(&self.snapshot()) {
            tracing::warn!("Failed to save session: {e}");
        }
    }
}

fn build_dispatcher<C: ConnectProvider>(
    connector: &C,
    config: &ProviderConfig,
) -> Dispatcher<C::Provider> {
    let redactor = SecretRedactor::new(config.api_key().map(ApiKey::expose_secret));
    Dispatcher::new(connector.connect(config)).with_redactor(redactor)
}
