//! Configuration for K-Xpert.
//!
//! Lives at `~/.kxpert/config.toml`. Every section and field is optional;
//! a missing file means defaults throughout.
//!
//! ```toml
//! [app]
//! provider = "openai"
//! theme = "dark"
//! code_preview_lines = 15
//! persist_failures = true
//!
//! [api_keys]
//! gemini = "${GEMINI_API_KEY}"
//! openai = "${OPENAI_API_KEY}"
//!
//! [gemini]
//! model = "gemini-1.5-flash"
//!
//! [openai]
//! model = "gpt-4o"
//! max_tokens = 1500
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use kxpert_providers::{GeminiSettings, OpenAISettings, ProviderSettings};
use kxpert_types::{ApiKey, Provider, ProviderConfig, Theme};
use serde::Deserialize;

const CONFIG_DIR: &str = ".kxpert";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_CODE_PREVIEW_LINES: usize = 15;

#[derive(Debug, Default, Deserialize)]
#[allow(clippy::unsafe_derive_deserialize)] // unsafe is for Unix ownership checks, unrelated to serde
pub struct KxpertConfig {
    pub app: Option<AppConfig>,
    pub api_keys: Option<ApiKeys>,
    pub gemini: Option<GeminiConfig>,
    pub openai: Option<OpenAIConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    pub provider: Option<String>,
    pub theme: Option<String>,
    /// Code lines shown before a block collapses.
    pub code_preview_lines: Option<usize>,
    /// Append failed turns to history. Defaults to true.
    pub persist_failures: Option<bool>,
}

#[derive(Default, Deserialize)]
pub struct ApiKeys {
    pub gemini: Option<String>,
    pub openai: Option<String>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(opt: Option<&String>) -> &'static str {
            if opt.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("ApiKeys")
            .field("gemini", &mask(self.gemini.as_ref()))
            .field("openai", &mask(self.openai.as_ref()))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GeminiConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub image_proxy_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenAIConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub image_model: Option<String>,
    pub image_size: Option<String>,
    pub max_tokens: Option<u32>,
    /// Empty string disables the system message.
    pub system_prompt: Option<String>,
}

/// Replace `${VAR}` references with `lookup` values (missing = empty).
fn expand_env_vars_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        if !name.is_empty() {
            out.push_str(&lookup(name).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    out
}

impl KxpertConfig {
    /// Load from the default location. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        toml::from_str(&content).map(Some).map_err(|source| {
            tracing::warn!("Failed to parse config at {}: {source}", path.display());
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Configured provider; unknown names fall back to Gemini.
    #[must_use]
    pub fn provider(&self) -> Provider {
        let Some(raw) = self.app.as_ref().and_then(|app| app.provider.as_deref()) else {
            return Provider::default();
        };
        Provider::parse(raw).unwrap_or_else(|e| {
            tracing::warn!("{e}; using {}", Provider::default());
            Provider::default()
        })
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.app
            .as_ref()
            .and_then(|app| app.theme.as_deref())
            .and_then(Theme::parse)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn code_preview_lines(&self) -> usize {
        self.app
            .as_ref()
            .and_then(|app| app.code_preview_lines)
            .unwrap_or(DEFAULT_CODE_PREVIEW_LINES)
    }

    #[must_use]
    pub fn persist_failures(&self) -> bool {
        self.app
            .as_ref()
            .and_then(|app| app.persist_failures)
            .unwrap_or(true)
    }

    /// Key for `provider`: the `[api_keys]` entry (env-expanded), else the
    /// provider's standard environment variable.
    #[must_use]
    pub fn api_key(&self, provider: Provider) -> Option<ApiKey> {
        self.api_key_with(provider, |name| env::var(name).ok())
    }

    fn api_key_with(&self, provider: Provider, lookup: impl Fn(&str) -> Option<String>) -> Option<ApiKey> {
        let configured = self.api_keys.as_ref().and_then(|keys| match provider {
            Provider::Gemini => keys.gemini.as_deref(),
            Provider::OpenAI => keys.openai.as_deref(),
        });
        configured
            .map(|raw| expand_env_vars_with(raw, &lookup))
            .and_then(|value| ApiKey::new(value).ok())
            .or_else(|| lookup(provider.env_var()).and_then(|value| ApiKey::new(value).ok()))
    }

    #[must_use]
    pub fn provider_config(&self) -> ProviderConfig {
        let provider = self.provider();
        ProviderConfig::new(provider, self.api_key(provider))
    }

    /// Endpoint/model settings, with defaults for anything unset.
    #[must_use]
    pub fn provider_settings(&self) -> ProviderSettings {
        let mut settings = ProviderSettings::default();
        if let Some(gemini) = &self.gemini {
            apply_gemini(&mut settings.gemini, gemini);
        }
        if let Some(openai) = &self.openai {
            apply_openai(&mut settings.openai, openai);
        }
        settings
    }

    /// Persist the provider choice, preserving comments and formatting.
    pub fn persist_provider(provider: Provider) -> std::io::Result<()> {
        persist_app_value(&require_config_path()?, "provider", provider.as_str())
    }

    pub fn persist_theme(theme: Theme) -> std::io::Result<()> {
        persist_app_value(&require_config_path()?, "theme", theme.as_str())
    }
}

fn apply_gemini(target: &mut GeminiSettings, source: &GeminiConfig) {
    if let Some(model) = &source.model {
        target.model.clone_from(model);
    }
    if let Some(base_url) = &source.base_url {
        target.base_url.clone_from(base_url);
    }
    if let Some(proxy) = &source.image_proxy_url {
        target.image_proxy_url.clone_from(proxy);
    }
}

fn apply_openai(target: &mut OpenAISettings, source: &OpenAIConfig) {
    if let Some(model) = &source.model {
        target.model.clone_from(model);
    }
    if let Some(base_url) = &source.base_url {
        target.base_url.clone_from(base_url);
    }
    if let Some(image_model) = &source.image_model {
        target.image_model.clone_from(image_model);
    }
    if let Some(image_size) = &source.image_size {
        target.image_size.clone_from(image_size);
    }
    if let Some(max_tokens) = source.max_tokens {
        target.max_tokens = max_tokens;
    }
    if let Some(prompt) = &source.system_prompt {
        target.system_prompt = (!prompt.trim().is_empty()).then(|| prompt.clone());
    }
}

fn require_config_path() -> std::io::Result<PathBuf> {
    config_path().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine config path",
        )
    })
}

/// Set `[app].<key>` in the file at `path`, creating file and table as needed.
fn persist_app_value(path: &Path, key: &str, value: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        tighten_owned_permissions(parent, 0o700)?;
    }

    let content = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };

    let updated = set_app_value(&content, key, value)?;
    kxpert_utils::atomic_write(path, updated.as_bytes())?;
    tracing::info!(key, value, path = %path.display(), "Persisted config value");
    Ok(())
}

fn set_app_value(content: &str, key: &str, value: &str) -> std::io::Result<String> {
    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let app = doc
        .entry("app")
        .or_insert_with(|| toml_edit::Item::Table(toml_edit::Table::new()))
        .as_table_like_mut()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "`app` in config.toml is not a table",
            )
        })?;
    app.insert(key, toml_edit::value(value));
    Ok(doc.to_string())
}

/// Clear group/other bits on a path we own.
#[cfg(unix)]
fn tighten_owned_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    let metadata = fs::metadata(path)?;
    // SAFETY: getuid has no preconditions and cannot fail.
    let our_uid = unsafe { libc::getuid() };
    if metadata.uid() == our_uid && metadata.permissions().mode() & 0o077 != 0 {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    Ok(())
}

/// `~/.kxpert`, home of the config, session and logs.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(CONFIG_FILE))
}
