//! Rendering properties over representative assistant replies.

use kxpert_render::{
    CodeBlock, CodeViewState, ContentRenderer, DEFAULT_VISIBLE_LINES, Expansion, InlineSpan, RenderBlock,
    TerminalStyle, render, to_html, to_terminal,
};

const PROSE_SAMPLES: &[&str] = &[
    "",
    "Just one line.",
    "# Title\n\nSome **bold** and *italic* text with `code`.",
    "- one\n- two\n* three\n\nAfter the list.",
    "Line one\nLine two\n\n\nNew paragraph",
    "Stray ``` inside a sentence is not a fence",
    "<b>not html</b> & friends",
];

fn code_blocks(blocks: &[RenderBlock]) -> Vec<&CodeBlock> {
    blocks.iter().filter_map(RenderBlock::as_code_block).collect()
}

fn fenced(language: &str, lines: usize) -> (String, String) {
    let source: Vec<String> = (1..=lines).map(|n| format!("let x{n} = {n};")).collect();
    let source = source.join("\n");
    (format!("Intro\n```{language}\n{source}\n```\nOutro"), source)
}

#[test]
fn prose_never_yields_code_blocks() {
    for sample in PROSE_SAMPLES {
        assert!(code_blocks(&render(sample)).is_empty(), "{sample:?}");
    }
}

#[test]
fn fenced_source_is_preserved_exactly() {
    for lines in [1, 2, 15, 16, 40] {
        let (raw, source) = fenced("rust", lines);
        let blocks = render(&raw);
        let code = code_blocks(&blocks);
        assert_eq!(code.len(), 1);
        assert_eq!(code[0].full_source(), source);
        assert_eq!(code[0].copy_text(), source);
        assert_eq!(code[0].language(), "rust");
    }
}

#[test]
fn truncation_follows_line_count() {
    for lines in [1, 14, 15, 16, 17, 60] {
        let (raw, _) = fenced("js", lines);
        let blocks = render(&raw);
        let code = code_blocks(&blocks)[0];
        assert_eq!(code.truncated(), lines > DEFAULT_VISIBLE_LINES, "{lines} lines");
        assert_eq!(code.visible_line_count(), lines.min(DEFAULT_VISIBLE_LINES));
    }
}

#[test]
fn custom_threshold_is_respected() {
    let (raw, _) = fenced("go", 6);
    let blocks = ContentRenderer::new(5).render(&raw);
    let code = code_blocks(&blocks)[0];
    assert!(code.truncated());
    assert_eq!(code.visible_line_count(), 5);
    assert_eq!(code.hidden_line_count(), 1);
}

#[test]
fn untagged_fence_is_plaintext() {
    let blocks = render("```\nplain\n```");
    assert_eq!(code_blocks(&blocks)[0].language(), "plaintext");
}

#[test]
fn code_block_ids_are_unique_per_pass() {
    let raw = "```a\n1\n```\ntext\n```b\n2\n```\n```c\n3\n```";
    let blocks = render(raw);
    let mut ids: Vec<_> = code_blocks(&blocks).iter().map(|c| c.id().clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[test]
fn script_tags_are_escaped_in_html() {
    let blocks = render("<script>alert(1)</script>");
    let html = to_html(&blocks, &CodeViewState::new());
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
}

#[test]
fn script_inside_code_and_language_is_escaped() {
    let raw = "```html\"><script>\n<script>alert(1)</script>\n```";
    let html = to_html(&render(raw), &CodeViewState::new());
    assert!(!html.contains("<script>"));
}

#[test]
fn expansion_changes_presentation_only() {
    let (raw, source) = fenced("py", 20);
    let blocks = render(&raw);
    let code = code_blocks(&blocks)[0].clone();
    let mut view = CodeViewState::new();

    let collapsed = to_html(&blocks, &view);
    assert!(collapsed.contains("Show 5 more lines"));
    assert!(!collapsed.contains("let x20 = 20;"));

    assert_eq!(view.toggle(code.id()), Expansion::Expanded);
    assert_eq!(view.presented_source(&code), source);
    let expanded = to_html(&blocks, &view);
    assert!(expanded.contains("let x20 = 20;"));
    assert!(expanded.contains("Show less"));

    assert_eq!(view.toggle(code.id()), Expansion::Collapsed);
    assert_eq!(to_html(&blocks, &view), collapsed);
    assert_eq!(code_blocks(&blocks)[0], &code);
}

#[test]
fn paragraph_newlines_become_line_breaks() {
    let blocks = render("first\nsecond");
    let RenderBlock::Paragraph { spans } = &blocks[0] else {
        panic!("expected paragraph, got {blocks:?}");
    };
    assert_eq!(
        spans,
        &vec![
            InlineSpan::PlainText("first".to_string()),
            InlineSpan::LineBreak,
            InlineSpan::PlainText("second".to_string()),
        ]
    );
}

#[test]
fn terminal_output_strips_control_sequences() {
    let blocks = render("Hello \x1b]0;pwned\x07**world**");
    let out = to_terminal(&blocks, &CodeViewState::new(), TerminalStyle::Plain);
    assert!(!out.contains('\x1b'));
    assert!(!out.contains('\x07'));
    assert!(out.contains("world"));
}

#[test]
fn rendering_is_deterministic() {
    for sample in PROSE_SAMPLES {
        assert_eq!(render(sample), render(sample));
    }
}

#[test]
fn heading_markup_becomes_spans() {
    let blocks = render("## **Overview** of `foo`");
    assert_eq!(
        blocks,
        vec![RenderBlock::Heading {
            level: 2,
            spans: vec![
                InlineSpan::Bold("Overview".to_string()),
                InlineSpan::PlainText(" of ".to_string()),
                InlineSpan::InlineCode("foo".to_string()),
            ],
        }]
    );
}
