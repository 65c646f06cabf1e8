//! Terminal presentation of chat turns.
//!
//! Each assistant turn is rendered with its own id scope (`m<index>`), so a
//! code block id names exactly one block in the whole transcript.

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use kxpert_render::{
    CodeBlock, CodeBlockId, CodeViewState, ContentRenderer, Expansion, RenderBlock, TerminalStyle,
    sanitize_terminal_text, to_terminal,
};
use kxpert_types::{ChatTurn, FailureKind, MediaKind, Sender, Theme};

const ASSISTANT_NAME: &str = "K-Xpert";
const RESET: &str = "\x1b[0m";

pub struct Transcript {
    threshold: usize,
    style: TerminalStyle,
    view: CodeViewState,
    /// Code blocks rendered so far, with the index of the turn that owns them.
    blocks: HashMap<CodeBlockId, (usize, CodeBlock)>,
}

impl Transcript {
    pub fn new(threshold: usize, style: TerminalStyle) -> Self {
        Self {
            threshold,
            style,
            view: CodeViewState::new(),
            blocks: HashMap::new(),
        }
    }

    pub fn render_turn(&mut self, index: usize, turn: &ChatTurn, theme: Theme) -> String {
        let (name, color) = match turn.sender {
            Sender::User => ("You", user_color(theme)),
            Sender::Assistant => (ASSISTANT_NAME, assistant_color(theme)),
        };
        let header = format!("[{}] {name}", local_time(turn.timestamp));
        let mut out = self.paint(color, &header);
        out.push('\n');

        match turn.sender {
            Sender::User => out.push_str(&sanitize_terminal_text(&turn.text)),
            Sender::Assistant => {
                let blocks = ContentRenderer::new(self.threshold)
                    .with_scope(format!("m{index}"))
                    .render(&turn.text);
                for block in blocks.iter().filter_map(RenderBlock::as_code_block) {
                    self.blocks.insert(block.id().clone(), (index, block.clone()));
                }
                out.push_str(&to_terminal(&blocks, &self.view, self.style));
            }
        }

        if let Some(media) = &turn.media {
            let label = match media.kind {
                MediaKind::UserUpload => "[image attached]".to_string(),
                MediaKind::GeneratedImage => format!("Generated image: {}", media.url),
                MediaKind::GeneratedVideo => format!("Generated video still: {}", media.url),
            };
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&sanitize_terminal_text(&label));
        }
        out
    }

    /// Failure that was not kept in history; shown once.
    pub fn render_failure(&self, kind: FailureKind, message: &str) -> String {
        let marker = if kind.is_soft() { "!" } else { "x" };
        self.paint("\x1b[31m", &format!("[{marker}] {}", sanitize_terminal_text(message)))
    }

    /// Flip a block; returns the owning turn so the caller can redraw it.
    pub fn toggle(&mut self, id: &CodeBlockId) -> Option<(usize, Expansion)> {
        let (index, block) = self.blocks.get(id)?;
        if !block.truncated() {
            return None;
        }
        let index = *index;
        Some((index, self.view.toggle(id)))
    }

    pub fn copy_text(&self, id: &CodeBlockId) -> Option<&str> {
        self.blocks.get(id).map(|(_, block)| block.copy_text())
    }

    pub fn reset(&mut self) {
        self.blocks.clear();
        self.view.collapse_all();
    }

    fn paint(&self, color: &str, text: &str) -> String {
        match self.style {
            TerminalStyle::Plain => text.to_string(),
            TerminalStyle::Ansi => format!("{color}{text}{RESET}"),
        }
    }
}

fn user_color(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "\x1b[34m",
        Theme::Dark => "\x1b[94m",
    }
}

fn assistant_color(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "\x1b[35m",
        Theme::Dark => "\x1b[95m",
    }
}

fn local_time(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}
