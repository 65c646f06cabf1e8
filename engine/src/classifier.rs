//! Keyword classifier deciding whether a turn asks for generated media.
//!
//! Runs before any network call, so it is a fixed phrase scan rather than a
//! model: video phrases win outright; an image request needs both an action
//! phrase and a subject noun.

use std::ops::Range;
use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use kxpert_types::ClassificationResult;

const VIDEO_PHRASES: &[&str] = &[
    "video of",
    "generate a video",
    "create a video",
    "make a video",
    "animate",
];

const ACTION_PHRASES: &[&str] = &[
    "generate",
    "create",
    "make",
    "draw",
    "show me",
    "give me",
    "i need",
    "image of",
    "picture of",
    "photo of",
    "drawing of",
    "painting of",
    "render of",
    "visualize",
];

const SUBJECT_WORDS: &[&str] = &[
    "image", "picture", "photo", "drawing", "painting", "render", "art",
];

const ARTICLES: &[&str] = &["a", "an", "the"];

/// Dangling words left at the front once triggers are gone ("... of a cat").
const LEADING_CONNECTORS: &[&str] = &["of", "for", "me", "about"];

static SHARED: LazyLock<RequestClassifier> = LazyLock::new(RequestClassifier::new);

/// Classify with the shared classifier.
#[must_use]
pub fn classify(raw: &str) -> ClassificationResult {
    SHARED.classify(raw)
}

/// One phrase list compiled into a case-insensitive automaton.
struct TriggerSet {
    automaton: AhoCorasick,
}

impl TriggerSet {
    fn new(phrases: &[&str]) -> Self {
        let automaton = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(phrases)
            .expect("trigger phrases form a valid automaton");
        Self { automaton }
    }

    /// Byte ranges of every match, left to right. Matches may sit inside a
    /// longer word ("photograph", "reanimated").
    fn matches(&self, text: &str) -> Vec<Range<usize>> {
        self.automaton.find_iter(text).map(|m| m.range()).collect()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub struct RequestClassifier {
    video: TriggerSet,
    action: TriggerSet,
    subject: TriggerSet,
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            video: TriggerSet::new(VIDEO_PHRASES),
            action: TriggerSet::new(ACTION_PHRASES),
            subject: TriggerSet::new(SUBJECT_WORDS),
        }
    }

    /// Total and deterministic; the empty string is `PlainChat`.
    #[must_use]
    pub fn classify(&self, raw: &str) -> ClassificationResult {
        let video = self.video.matches(raw);
        if !video.is_empty() {
            return ClassificationResult::VideoRequest {
                cleaned_prompt: clean_prompt(raw, video),
            };
        }

        let actions = self.action.matches(raw);
        if actions.is_empty() {
            return ClassificationResult::PlainChat;
        }
        let subjects = self.subject.matches(raw);
        if subjects.is_empty() {
            return ClassificationResult::PlainChat;
        }

        let mut triggers = actions;
        triggers.extend(subjects);
        ClassificationResult::ImageRequest {
            cleaned_prompt: clean_prompt(raw, triggers),
        }
    }
}

/// Remove the words holding each trigger (and articles that introduced
/// them) from `raw`.
fn clean_prompt(raw: &str, mut triggers: Vec<Range<usize>>) -> String {
    for range in &mut triggers {
        range.end = word_end(raw, range.end);
        range.start = article_start(raw, word_start(raw, range.start));
    }
    triggers.sort_by_key(|range| range.start);

    let mut kept = String::with_capacity(raw.len());
    let mut cursor = 0;
    for range in triggers {
        if range.start > cursor {
            kept.push_str(&raw[cursor..range.start]);
            kept.push(' ');
        }
        cursor = cursor.max(range.end);
    }
    kept.push_str(&raw[cursor..]);

    let words: Vec<&str> = kept
        .split_whitespace()
        .skip_while(|word| {
            !word.chars().any(char::is_alphanumeric)
                || LEADING_CONNECTORS.iter().any(|c| c.eq_ignore_ascii_case(word))
        })
        .collect();

    if words.is_empty() {
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        words.join(" ")
    }
}

fn word_start(text: &str, start: usize) -> usize {
    text[..start]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map_or(start, |(i, _)| i)
}

fn word_end(text: &str, mut end: usize) -> usize {
    while let Some(c) = text[end..].chars().next() {
        if !is_word_char(c) {
            break;
        }
        end += c.len_utf8();
    }
    end
}

/// Start of an article immediately before `start`, else `start`.
fn article_start(text: &str, start: usize) -> usize {
    let before = text[..start].trim_end();
    if before.len() == start {
        return start;
    }
    let word_begin = word_start(before, before.len());
    let word = &before[word_begin..];
    if ARTICLES.iter().any(|a| a.eq_ignore_ascii_case(word)) {
        word_begin
    } else {
        start
    }
}
