//! Session persistence.
//!
//! The whole session (provider selection, key, theme, setup flag and chat
//! history) is written to `session.json` in the data directory after every
//! mutation, so a restart resumes where the user left off.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use kxpert_types::{ChatHistory, ProviderConfig, Theme};
use serde::{Deserialize, Serialize};

/// Snapshot of a session as stored on disk.
///
/// # Version Compatibility
///
/// A file written with a different `version` is ignored and the session
/// starts fresh.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub provider_config: ProviderConfig,
    #[serde(default)]
    pub theme: Theme,
    /// Whether the first-run setup dialog has been completed or skipped.
    #[serde(default)]
    pub setup_complete: bool,
    #[serde(default)]
    pub history: ChatHistory,
    pub version: u32,
}

impl PersistedSession {
    pub const CURRENT_VERSION: u32 = 1;

    pub const FILENAME: &'static str = "session.json";

    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.version == Self::CURRENT_VERSION
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access session file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session file {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and writes one session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.kxpert/session.json`, if a home directory exists.
    #[must_use]
    pub fn default_location() -> Option<Self> {
        kxpert_config::data_dir().map(|dir| Self::new(dir.join(PersistedSession::FILENAME)))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when there is no file or it was written by another schema version.
    pub fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let session: PersistedSession =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;

        if !session.is_compatible() {
            tracing::info!(
                found = session.version,
                expected = PersistedSession::CURRENT_VERSION,
                "Ignoring session file from another version"
            );
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Owner-only atomic write; the file holds the API key.
    pub fn save(&self, session: &PersistedSession) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(session).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        kxpert_utils::atomic_write(&self.path, &json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
