//! Render block value types.

/// Number of code lines shown before a block is collapsed behind an expand control.
pub const DEFAULT_VISIBLE_LINES: usize = 15;

/// Opaque handle binding copy/expand actions to one code block.
///
/// Unique within a single render pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeBlockId(String);

impl CodeBlockId {
    pub(crate) fn new(scope: Option<&str>, ordinal: usize) -> Self {
        match scope {
            Some(scope) => Self(format!("{scope}-code-{ordinal}")),
            None => Self(format!("code-{ordinal}")),
        }
    }

    /// Rebuild an id from user input (e.g. a `/expand code-2` command).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CodeBlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Leaf inline content. No nesting.
///
/// Text is stored raw; escaping happens when a block is materialized. Bold,
/// italic and inline code may carry a newline when they span paragraph lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineSpan {
    PlainText(String),
    Bold(String),
    Italic(String),
    InlineCode(String),
    /// A literal newline inside a paragraph.
    LineBreak,
}

impl InlineSpan {
    /// The literal text carried by the span (`"\n"` for a line break).
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            InlineSpan::PlainText(text)
            | InlineSpan::Bold(text)
            | InlineSpan::Italic(text)
            | InlineSpan::InlineCode(text) => text,
            InlineSpan::LineBreak => "\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBlock {
    Heading { level: u8, spans: Vec<InlineSpan> },
    Paragraph { spans: Vec<InlineSpan> },
    /// Adjacent list items in the block sequence belong to the same list.
    ListItem { spans: Vec<InlineSpan> },
    CodeBlock(CodeBlock),
}

impl RenderBlock {
    #[must_use]
    pub fn as_code_block(&self) -> Option<&CodeBlock> {
        match self {
            RenderBlock::CodeBlock(block) => Some(block),
            _ => None,
        }
    }
}

/// A fenced code block.
///
/// `truncated` holds iff the source has more lines than the threshold it was
/// built with, and `visible_line_count == min(line_count, threshold)`.
/// `full_source` is never shortened, so copy and expand are lossless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    id: CodeBlockId,
    language: String,
    full_source: String,
    visible_line_count: usize,
    truncated: bool,
}

impl CodeBlock {
    #[must_use]
    pub fn new(id: CodeBlockId, language: String, full_source: String, threshold: usize) -> Self {
        let line_count = full_source.lines().count();
        Self {
            id,
            language,
            full_source,
            visible_line_count: line_count.min(threshold),
            truncated: line_count > threshold,
        }
    }

    #[must_use]
    pub fn id(&self) -> &CodeBlockId {
        &self.id
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn full_source(&self) -> &str {
        &self.full_source
    }

    #[must_use]
    pub const fn visible_line_count(&self) -> usize {
        self.visible_line_count
    }

    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.truncated
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.full_source.lines().count()
    }

    #[must_use]
    pub fn hidden_line_count(&self) -> usize {
        self.line_count() - self.visible_line_count
    }

    /// Prefix of the source holding only the visible lines.
    #[must_use]
    pub fn visible_source(&self) -> &str {
        if !self.truncated {
            return &self.full_source;
        }
        match self
            .full_source
            .match_indices('\n')
            .nth(self.visible_line_count.saturating_sub(1))
        {
            Some((end, _)) if self.visible_line_count > 0 => &self.full_source[..end],
            _ => "",
        }
    }

    /// Text placed on the clipboard by the copy action.
    #[must_use]
    pub fn copy_text(&self) -> &str {
        &self.full_source
    }
}
