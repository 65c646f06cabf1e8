//! Conversation turns and the append-only history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// An image the user attached to their turn.
    UserUpload,
    GeneratedImage,
    /// Emulated video: a still produced by the image generator.
    GeneratedVideo,
}

impl MediaKind {
    #[must_use]
    pub const fn is_generated(self) -> bool {
        matches!(self, MediaKind::GeneratedImage | MediaKind::GeneratedVideo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    pub kind: MediaKind,
}

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaAttachment>,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    #[must_use]
    pub fn user(text: impl Into<String>, upload_url: Option<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            media: upload_url.map(|url| MediaAttachment {
                url,
                kind: MediaKind::UserUpload,
            }),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            media: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn assistant_with_media(text: impl Into<String>, url: String, kind: MediaKind) -> Self {
        Self {
            media: Some(MediaAttachment { url, kind }),
            ..Self::assistant(text)
        }
    }
}

/// Append-only conversation log.
///
/// Ordering is insertion order. Entries are never reordered or deduplicated;
/// the only removal is [`ChatHistory::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    #[must_use]
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatTurn> {
        self.turns.iter()
    }
}

impl<'a> IntoIterator for &'a ChatHistory {
    type Item = &'a ChatTurn;
    type IntoIter = std::slice::Iter<'a, ChatTurn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
