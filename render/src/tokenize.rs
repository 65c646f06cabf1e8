//! Staged tokenizer for assistant text.
//!
//! Each stage consumes its matches entirely and hands only the unmatched
//! remainder to the next stage, so a later rule can never re-match inside
//! an earlier rule's output:
//!
//! 1. fenced code blocks
//! 2. line classification (headings, list items, paragraph lines)
//! 3. inline spans, in order: code, bold, italic

use std::sync::LazyLock;

use regex::Regex;

use crate::block::{CodeBlock, CodeBlockId, InlineSpan, RenderBlock};

/// Opening fence at line start, optional language tag, body, closing fence.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^```([\w+#.-]+)?[ \t]*\r?\n((?s:.*?))```").expect("valid fence regex")
});

const DEFAULT_LANGUAGE: &str = "plaintext";

pub(crate) struct Tokenizer<'s> {
    scope: Option<&'s str>,
    threshold: usize,
    next_ordinal: usize,
    blocks: Vec<RenderBlock>,
}

impl<'s> Tokenizer<'s> {
    pub(crate) fn new(scope: Option<&'s str>, threshold: usize) -> Self {
        Self {
            scope,
            threshold,
            next_ordinal: 1,
            blocks: Vec::new(),
        }
    }

    pub(crate) fn run(mut self, raw: &str) -> Vec<RenderBlock> {
        let mut cursor = 0;
        for captures in FENCE.captures_iter(raw) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            self.push_text(&raw[cursor..whole.start()]);

            let language = captures
                .get(1)
                .map_or(DEFAULT_LANGUAGE, |m| m.as_str())
                .to_string();
            let body = captures.get(2).map_or("", |m| m.as_str());
            self.push_code(language, trim_code_body(body));

            cursor = whole.end();
        }
        self.push_text(&raw[cursor..]);
        self.blocks
    }

    fn push_code(&mut self, language: String, source: &str) {
        let id = CodeBlockId::new(self.scope, self.next_ordinal);
        self.next_ordinal += 1;
        self.blocks.push(RenderBlock::CodeBlock(CodeBlock::new(
            id,
            language,
            source.to_string(),
            self.threshold,
        )));
    }

    fn push_text(&mut self, text: &str) {
        let mut paragraph: Vec<&str> = Vec::new();
        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some((level, heading)) = heading_line(line) {
                self.flush_paragraph(&mut paragraph);
                self.blocks.push(RenderBlock::Heading {
                    level,
                    spans: inline_spans(heading.trim()),
                });
            } else if let Some(item) = list_item_line(line) {
                self.flush_paragraph(&mut paragraph);
                self.blocks.push(RenderBlock::ListItem {
                    spans: inline_spans(item),
                });
            } else {
                paragraph.push(line);
            }
        }
        self.flush_paragraph(&mut paragraph);
    }

    fn flush_paragraph(&mut self, lines: &mut Vec<&str>) {
        let first = lines.iter().position(|l| !l.trim().is_empty());
        let last = lines.iter().rposition(|l| !l.trim().is_empty());
        if let (Some(first), Some(last)) = (first, last) {
            // Inline spans may cross lines, so split plain text only afterwards.
            let joined = lines[first..=last].join("\n");
            let mut spans = Vec::new();
            for span in inline_spans(&joined) {
                let InlineSpan::PlainText(text) = span else {
                    spans.push(span);
                    continue;
                };
                for (index, piece) in text.split('\n').enumerate() {
                    if index > 0 {
                        spans.push(InlineSpan::LineBreak);
                    }
                    if !piece.is_empty() {
                        spans.push(InlineSpan::PlainText(piece.to_string()));
                    }
                }
            }
            self.blocks.push(RenderBlock::Paragraph { spans });
        }
        lines.clear();
    }
}

/// Drop blank lines around the body and trailing whitespace; keep the first
/// line's indentation.
fn trim_code_body(body: &str) -> &str {
    let body = body.trim_end();
    let mut start = 0;
    for line in body.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    &body[start..]
}

fn heading_line(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    line[hashes..]
        .strip_prefix(' ')
        .map(|rest| (hashes as u8, rest))
}

fn list_item_line(line: &str) -> Option<&str> {
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))
}

/// Piece of a line after one inline stage.
enum Piece<'a> {
    Unmatched(&'a str),
    Matched(&'a str),
}

/// Split `text` on `delim`-wrapped runs that contain no `delim` character.
///
/// Mirrors a global left-to-right `delim([^c]+)delim` scan: an opening
/// delimiter that cannot be closed is kept as literal text and the scan
/// resumes one character later.
fn split_delimited<'a>(text: &'a str, delim: &str) -> Vec<Piece<'a>> {
    let stop = delim.chars().next().unwrap_or('`');
    let mut pieces = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(delim) {
        let open = cursor + offset;
        let body_start = open + delim.len();
        let body_len = text[body_start..]
            .find(stop)
            .unwrap_or(text.len() - body_start);
        let body_end = body_start + body_len;

        if body_len > 0 && text[body_end..].starts_with(delim) {
            if literal_start < open {
                pieces.push(Piece::Unmatched(&text[literal_start..open]));
            }
            pieces.push(Piece::Matched(&text[body_start..body_end]));
            cursor = body_end + delim.len();
            literal_start = cursor;
        } else {
            // Delimiters are ASCII, so one byte forward is a char boundary.
            cursor = open + 1;
        }
    }

    if literal_start < text.len() {
        pieces.push(Piece::Unmatched(&text[literal_start..]));
    }
    pieces
}

pub(crate) fn inline_spans(text: &str) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    for code in split_delimited(text, "`") {
        match code {
            Piece::Matched(body) => spans.push(InlineSpan::InlineCode(body.to_string())),
            Piece::Unmatched(rest) => {
                for bold in split_delimited(rest, "**") {
                    match bold {
                        Piece::Matched(body) => spans.push(InlineSpan::Bold(body.to_string())),
                        Piece::Unmatched(rest) => {
                            for italic in split_delimited(rest, "*") {
                                spans.push(match italic {
                                    Piece::Matched(body) => InlineSpan::Italic(body.to_string()),
                                    Piece::Unmatched(plain) => {
                                        InlineSpan::PlainText(plain.to_string())
                                    }
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    merge_plain(spans)
}

fn merge_plain(spans: Vec<InlineSpan>) -> Vec<InlineSpan> {
    let mut merged: Vec<InlineSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if let (Some(InlineSpan::PlainText(prev)), InlineSpan::PlainText(next)) =
            (merged.last_mut(), &span)
        {
            prev.push_str(next);
            continue;
        }
        merged.push(span);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> InlineSpan {
        InlineSpan::PlainText(s.to_string())
    }

    #[test]
    fn inline_code_wins_over_emphasis() {
        assert_eq!(
            inline_spans("use `**kwargs` here"),
            vec![
                plain("use "),
                InlineSpan::InlineCode("**kwargs".into()),
                plain(" here"),
            ]
        );
    }

    #[test]
    fn bold_before_italic() {
        assert_eq!(
            inline_spans("**strong** and *soft*"),
            vec![
                InlineSpan::Bold("strong".into()),
                plain(" and "),
                InlineSpan::Italic("soft".into()),
            ]
        );
    }

    #[test]
    fn unclosed_delimiters_stay_literal() {
        assert_eq!(inline_spans("2 * 3 = 6"), vec![plain("2 * 3 = 6")]);
        assert_eq!(inline_spans("a `b"), vec![plain("a `b")]);
        assert_eq!(inline_spans("``"), vec![plain("``")]);
    }

    #[test]
    fn bold_with_inner_star_falls_back_to_italic() {
        assert_eq!(
            inline_spans("**a*b**"),
            vec![plain("*"), InlineSpan::Italic("a".into()), plain("b**")]
        );
    }

    #[test]
    fn emphasis_may_span_lines() {
        assert_eq!(
            inline_spans("**bold\nacross** then `a\nb`"),
            vec![
                InlineSpan::Bold("bold\nacross".into()),
                plain(" then "),
                InlineSpan::InlineCode("a\nb".into()),
            ]
        );
    }

    #[test]
    fn heading_levels() {
        assert_eq!(heading_line("# Title"), Some((1, "Title")));
        assert_eq!(heading_line("### Deep"), Some((3, "Deep")));
        assert_eq!(heading_line("#### Too deep"), None);
        assert_eq!(heading_line("#NoSpace"), None);
    }

    #[test]
    fn list_markers() {
        assert_eq!(list_item_line("- one"), Some("one"));
        assert_eq!(list_item_line("* two"), Some("two"));
        assert_eq!(list_item_line("*emphasis*"), None);
        assert_eq!(list_item_line(" - indented"), None);
    }

    #[test]
    fn code_body_keeps_first_line_indent() {
        assert_eq!(trim_code_body("\n\n    indented\nnext\n\n"), "    indented\nnext");
        assert_eq!(trim_code_body("   \n"), "");
    }
}
