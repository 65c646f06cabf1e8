//! Turn handling for K-Xpert.
//!
//! - [`classifier`] decides whether a message asks for chat, an image or a video
//! - [`Dispatcher`] runs one turn against the configured provider and always
//!   resolves to an [`Outcome`]
//! - [`SessionState`] owns provider selection, theme and history, and is the
//!   only place they change
//! - [`SessionStore`] keeps the session on disk between runs

pub mod classifier;
mod dispatcher;
mod session;
mod store;

pub use classifier::{RequestClassifier, classify};
pub use dispatcher::{Dispatcher, EMPTY_RESPONSE_MESSAGE, VIDEO_PROMPT_SUFFIX};
pub use kxpert_types::{ClassificationResult, FailureKind, Outcome};
pub use session::{
    ConnectProvider, IMAGE_REPLY_TEXT, SessionState, SettingsError, VIDEO_REPLY_TEXT,
};
pub use store::{PersistedSession, SessionStore, StoreError};
