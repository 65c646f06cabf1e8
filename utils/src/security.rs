//! Redaction of credentials from text that may be shown or logged.
//!
//! Two layers: pattern-based redaction for well-known key formats
//! ([`redact_api_keys`]), and value-based redaction for the exact keys the
//! session is configured with ([`SecretRedactor`]). Provider error bodies
//! pass through both before they reach the chat history.

use std::borrow::Cow;
use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::Regex;

/// Keys shorter than this are not treated as secrets by value.
const MIN_SECRET_LENGTH: usize = 8;

static OPENAI_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sk-(?:proj-)?[A-Za-z0-9_-]{20,}").expect("valid OpenAI API key regex")
});
static GEMINI_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AIza[0-9A-Za-z_-]{8,}").expect("valid Gemini API key regex"));
static BEARER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(Bearer)(\s+)[A-Za-z0-9._~+/=-]{8,}").expect("valid Bearer token regex")
});
static KEY_QUERY_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([?&](?:key|api_key|apikey)=)[^&\s#]+").expect("valid key query regex")
});

/// Redact well-known credential formats.
///
/// - OpenAI: `sk-...` → `sk-***`
/// - Gemini: `AIza...` → `AIza***`
/// - `Bearer <token>` → `Bearer [REDACTED]`
/// - `?key=...` query parameters → `?key=[REDACTED]`
#[must_use]
pub fn redact_api_keys(raw: &str) -> String {
    let mut output = raw.to_string();
    apply_if_match(&BEARER, "$1$2[REDACTED]", &mut output);
    apply_if_match(&KEY_QUERY_PARAM, "$1[REDACTED]", &mut output);
    apply_if_match(&OPENAI_KEY, "sk-***", &mut output);
    apply_if_match(&GEMINI_KEY, "AIza***", &mut output);
    output
}

fn apply_if_match(re: &Regex, replacement: &str, output: &mut String) {
    if let Cow::Owned(replaced) = re.replace_all(output, replacement) {
        *output = replaced;
    }
}

/// Value-based redactor for the keys a session actually holds.
///
/// Secrets are never exposed via `Debug`.
pub struct SecretRedactor {
    secret_count: usize,
    automaton: Option<AhoCorasick>,
}

impl std::fmt::Debug for SecretRedactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRedactor")
            .field("secret_count", &self.secret_count)
            .finish_non_exhaustive()
    }
}

/// Pattern redaction only.
impl Default for SecretRedactor {
    fn default() -> Self {
        Self {
            secret_count: 0,
            automaton: None,
        }
    }
}

impl SecretRedactor {
    #[must_use]
    pub fn new<'a>(secrets: impl IntoIterator<Item = &'a str>) -> Self {
        let mut secrets: Vec<&str> = secrets
            .into_iter()
            .map(str::trim)
            .filter(|s| s.len() >= MIN_SECRET_LENGTH)
            .collect();
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();

        let automaton = if secrets.is_empty() {
            None
        } else {
            match AhoCorasickBuilder::new()
                .match_kind(MatchKind::LeftmostLongest)
                .build(&secrets)
            {
                Ok(ac) => Some(ac),
                Err(e) => {
                    tracing::warn!(secret_count = secrets.len(), "Secret automaton build failed: {e}");
                    None
                }
            }
        };
        Self {
            secret_count: secrets.len(),
            automaton,
        }
    }

    /// Replace every configured secret, then every well-known key pattern.
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let by_value = match &self.automaton {
            Some(ac) => {
                let mut result = String::with_capacity(input.len());
                ac.replace_all_with(input, &mut result, |_, _, dst| {
                    dst.push_str("[REDACTED]");
                    true
                });
                result
            }
            None => input.to_string(),
        };
        redact_api_keys(&by_value)
    }
}
