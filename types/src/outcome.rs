//! Request classification and per-turn outcomes.

use serde::{Deserialize, Serialize};

use crate::MediaKind;

/// What the user is asking for, derived deterministically from their text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult {
    PlainChat,
    ImageRequest { cleaned_prompt: String },
    VideoRequest { cleaned_prompt: String },
}

impl ClassificationResult {
    #[must_use]
    pub fn cleaned_prompt(&self) -> Option<&str> {
        match self {
            Self::PlainChat => None,
            Self::ImageRequest { cleaned_prompt } | Self::VideoRequest { cleaned_prompt } => {
                Some(cleaned_prompt)
            }
        }
    }

    #[must_use]
    pub const fn is_media(&self) -> bool {
        !matches!(self, Self::PlainChat)
    }
}

/// Failure taxonomy surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing or rejected credential. Fix: settings.
    Auth,
    /// The active provider cannot serve this request. Fix: switch provider.
    Capability,
    /// Upstream rejected the request or the exchange broke down.
    Provider,
    /// Upstream succeeded but produced nothing usable.
    EmptyResponse,
}

impl FailureKind {
    /// Soft failures get a retry suggestion rather than an error badge.
    #[must_use]
    pub const fn is_soft(self) -> bool {
        matches!(self, FailureKind::EmptyResponse)
    }
}

/// Result of handling one turn. The dispatcher always resolves to one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    ChatReply { text: String },
    MediaReply { url: String, kind: MediaKind },
    Failure { kind: FailureKind, message: String },
}

impl Outcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }
}
