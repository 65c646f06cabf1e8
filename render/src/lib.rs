//! Assistant message rendering.
//!
//! Raw assistant text is parsed once into [`RenderBlock`]s by a staged
//! tokenizer. The blocks hold raw text; the materializers ([`to_html`],
//! [`to_terminal`]) are responsible for escaping.
//!
//! ```
//! use kxpert_render::{render, RenderBlock};
//!
//! let blocks = render("# Hi\n```rust\nfn main() {}\n```");
//! assert!(matches!(blocks[0], RenderBlock::Heading { level: 1, .. }));
//! assert_eq!(blocks[1].as_code_block().unwrap().full_source(), "fn main() {}");
//! ```

mod block;
mod escape;
mod expand;
mod html;
mod text;
mod tokenize;

pub use block::{CodeBlock, CodeBlockId, DEFAULT_VISIBLE_LINES, InlineSpan, RenderBlock};
pub use escape::{escape_html, sanitize_terminal_text};
pub use expand::{CodeViewState, Expansion};
pub use html::to_html;
pub use text::{TerminalStyle, to_terminal};

/// Render with the default visible-line threshold and unscoped ids.
///
/// Total over all input: the empty string yields no blocks.
#[must_use]
pub fn render(raw: &str) -> Vec<RenderBlock> {
    ContentRenderer::default().render(raw)
}

/// Renderer settings. Cheap to construct; holds no state between calls.
#[derive(Debug, Clone)]
pub struct ContentRenderer {
    threshold: usize,
    scope: Option<String>,
}

impl Default for ContentRenderer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_VISIBLE_LINES,
            scope: None,
        }
    }
}

impl ContentRenderer {
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            scope: None,
        }
    }

    /// Prefix code block ids so blocks from different messages never collide.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn render(&self, raw: &str) -> Vec<RenderBlock> {
        tokenize::Tokenizer::new(self.scope.as_deref(), self.threshold).run(raw)
    }
}
