//! Shared infrastructure utilities for K-Xpert.
//!
//! - **`atomic_write`**: crash-safe file persistence (temp + rename)
//! - **`security`**: API key redaction for error text and logs

pub mod atomic_write;
pub mod security;

pub use atomic_write::{PersistMode, atomic_write, atomic_write_with_mode};
pub use security::{SecretRedactor, redact_api_keys};
