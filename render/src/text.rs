//! Terminal materialization.
//!
//! Model text is sanitized before any styling escapes of our own are added,
//! so the only control sequences in the output are the ones written here.

use crate::block::{CodeBlock, InlineSpan, RenderBlock};
use crate::escape::sanitize_terminal_text;
use crate::expand::{CodeViewState, Expansion};

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalStyle {
    /// Markers only, no escape sequences.
    #[default]
    Plain,
    Ansi,
}

impl TerminalStyle {
    fn wrap(self, style: &str, text: &str) -> String {
        match self {
            TerminalStyle::Plain => text.to_string(),
            TerminalStyle::Ansi => format!("{style}{text}{RESET}"),
        }
    }
}

#[must_use]
pub fn to_terminal(blocks: &[RenderBlock], view: &CodeViewState, style: TerminalStyle) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_was_item = false;

    for block in blocks {
        let is_item = matches!(block, RenderBlock::ListItem { .. });
        if !lines.is_empty() && !(is_item && previous_was_item) {
            lines.push(String::new());
        }
        previous_was_item = is_item;

        match block {
            RenderBlock::Heading { level, spans } => {
                let marker = "#".repeat(usize::from(*level));
                let text = spans_text(spans, style);
                lines.push(style.wrap(BOLD, &format!("{marker} {text}")));
            }
            RenderBlock::Paragraph { spans } => {
                lines.extend(spans_text(spans, style).split('\n').map(str::to_string));
            }
            RenderBlock::ListItem { spans } => {
                lines.push(format!("  • {}", spans_text(spans, style)));
            }
            RenderBlock::CodeBlock(code) => push_code_block(&mut lines, code, view, style),
        }
    }
    lines.join("\n")
}

fn spans_text(spans: &[InlineSpan], style: TerminalStyle) -> String {
    let mut out = String::new();
    for span in spans {
        let text = sanitize_terminal_text(span.text());
        match span {
            InlineSpan::PlainText(_) | InlineSpan::LineBreak => out.push_str(&text),
            InlineSpan::Bold(_) => out.push_str(&style.wrap(BOLD, &text)),
            InlineSpan::Italic(_) => out.push_str(&style.wrap(ITALIC, &text)),
            InlineSpan::InlineCode(_) => match style {
                TerminalStyle::Plain => {
                    out.push('`');
                    out.push_str(&text);
                    out.push('`');
                }
                TerminalStyle::Ansi => out.push_str(&style.wrap(CYAN, &text)),
            },
        }
    }
    out
}

fn push_code_block(
    lines: &mut Vec<String>,
    code: &CodeBlock,
    view: &CodeViewState,
    style: TerminalStyle,
) {
    let header = format!(
        "┌─ {} [{}]",
        sanitize_terminal_text(code.language()),
        code.id()
    );
    lines.push(style.wrap(DIM, &header));
    for line in view.presented_source(code).lines() {
        lines.push(format!("│ {}", sanitize_terminal_text(line)));
    }
    let footer = match (code.truncated(), view.expansion(code.id())) {
        (true, Expansion::Collapsed) => {
            let hidden = code.hidden_line_count();
            format!(
                "└─ {hidden} more line{} (/expand {})",
                if hidden == 1 { "" } else { "s" },
                code.id()
            )
        }
        (true, Expansion::Expanded) => format!("└─ (/expand {} to collapse)", code.id()),
        (false, _) => "└─".to_string(),
    };
    lines.push(style.wrap(DIM, &footer));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render;

    #[test]
    fn plain_output_keeps_structure() {
        let blocks = render("# Title\nSome *text* with `code`.\n- one\n- two");
        let out = to_terminal(&blocks, &CodeViewState::new(), TerminalStyle::Plain);
        assert_eq!(out, "# Title\n\nSome text with `code`.\n\n  • one\n  • two");
    }

    #[test]
    fn model_escape_sequences_are_stripped() {
        let blocks = render("hi \x1b]52;c;cGF5bG9hZA==\x07there\x1b[2J");
        let out = to_terminal(&blocks, &CodeViewState::new(), TerminalStyle::Ansi);
        assert!(!out.contains("\x1b]"));
        assert!(!out.contains("\x1b[2J"));
        assert!(out.contains("hi there"));
    }

    #[test]
    fn collapsed_block_names_hidden_lines() {
        let source = (1..=17).map(|n| format!("l{n}")).collect::<Vec<_>>().join("\n");
        let blocks = render(&format!("```rust\n{source}\n```"));
        let out = to_terminal(&blocks, &CodeViewState::new(), TerminalStyle::Plain);
        assert!(out.starts_with("┌─ rust [code-1]"));
        assert!(out.contains("│ l15"));
        assert!(!out.contains("│ l16"));
        assert!(out.ends_with("└─ 2 more lines (/expand code-1)"));
    }
}
