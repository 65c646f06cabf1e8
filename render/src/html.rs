//! HTML materialization.
//!
//! Every literal that originated in the raw text goes through
//! [`escape_html`] here; this is the only place markup is produced.

use std::fmt::Write as _;

use crate::block::{CodeBlock, InlineSpan, RenderBlock};
use crate::escape::escape_html;
use crate::expand::{CodeViewState, Expansion};

/// Materialize blocks as an HTML fragment. Adjacent list items share one `<ul>`.
#[must_use]
pub fn to_html(blocks: &[RenderBlock], view: &CodeViewState) -> String {
    let mut out = String::new();
    let mut in_list = false;

    for block in blocks {
        let is_item = matches!(block, RenderBlock::ListItem { .. });
        if in_list && !is_item {
            out.push_str("</ul>\n");
        } else if !in_list && is_item {
            out.push_str("<ul>\n");
        }
        in_list = is_item;

        match block {
            RenderBlock::Heading { level, spans } => {
                let _ = write!(out, "<h{level}>");
                push_spans(&mut out, spans);
                let _ = writeln!(out, "</h{level}>");
            }
            RenderBlock::Paragraph { spans } => {
                out.push_str("<p>");
                push_spans(&mut out, spans);
                out.push_str("</p>\n");
            }
            RenderBlock::ListItem { spans } => {
                out.push_str("<li>");
                push_spans(&mut out, spans);
                out.push_str("</li>\n");
            }
            RenderBlock::CodeBlock(code) => push_code_block(&mut out, code, view),
        }
    }
    if in_list {
        out.push_str("</ul>\n");
    }
    out
}

fn push_spans(out: &mut String, spans: &[InlineSpan]) {
    for span in spans {
        match span {
            InlineSpan::PlainText(text) => out.push_str(&escape_html(text)),
            InlineSpan::Bold(text) => {
                let _ = write!(out, "<strong>{}</strong>", escape_with_breaks(text));
            }
            InlineSpan::Italic(text) => {
                let _ = write!(out, "<em>{}</em>", escape_with_breaks(text));
            }
            InlineSpan::InlineCode(text) => {
                let _ = write!(
                    out,
                    "<code class=\"inline-code\">{}</code>",
                    escape_with_breaks(text)
                );
            }
            InlineSpan::LineBreak => out.push_str("<br>"),
        }
    }
}

fn escape_with_breaks(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

fn push_code_block(out: &mut String, code: &CodeBlock, view: &CodeViewState) {
    let id = escape_html(code.id().as_str());
    let language = escape_html(code.language());
    let expansion = view.expansion(code.id());

    let _ = writeln!(out, "<div class=\"code-block\" data-block=\"{id}\">");
    let _ = writeln!(
        out,
        "<div class=\"code-header\"><span class=\"code-language\">{language}</span>\
         <button class=\"copy-btn\" data-target=\"{id}\">Copy</button></div>"
    );
    let _ = writeln!(
        out,
        "<div class=\"code-content\"><pre id=\"{id}\"><code class=\"language-{language}\">{}</code></pre></div>",
        escape_html(view.presented_source(code))
    );
    if code.truncated() {
        let label = match expansion {
            Expansion::Collapsed => {
                let hidden = code.hidden_line_count();
                format!("Show {hidden} more line{}", if hidden == 1 { "" } else { "s" })
            }
            Expansion::Expanded => "Show less".to_string(),
        };
        let state = match expansion {
            Expansion::Collapsed => "collapsed",
            Expansion::Expanded => "expanded",
        };
        let _ = writeln!(
            out,
            "<button class=\"expand-btn\" data-target=\"{id}\" data-state=\"{state}\">{label}</button>"
        );
    }
    out.push_str("</div>\n");
}
