//! Expand/collapse state for truncated code blocks.
//!
//! Toggling never re-parses anything; it only changes which prefix of a
//! block's `full_source` is presented.

use std::collections::HashSet;

use crate::block::{CodeBlock, CodeBlockId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expansion {
    #[default]
    Collapsed,
    Expanded,
}

impl Expansion {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Expansion::Collapsed => Expansion::Expanded,
            Expansion::Expanded => Expansion::Collapsed,
        }
    }
}

/// Per-view expansion state keyed by block id. Absent ids are collapsed.
#[derive(Debug, Clone, Default)]
pub struct CodeViewState {
    expanded: HashSet<CodeBlockId>,
}

impl CodeViewState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn expansion(&self, id: &CodeBlockId) -> Expansion {
        if self.expanded.contains(id) {
            Expansion::Expanded
        } else {
            Expansion::Collapsed
        }
    }

    /// Flip one block and return its new state.
    pub fn toggle(&mut self, id: &CodeBlockId) -> Expansion {
        let next = self.expansion(id).toggled();
        match next {
            Expansion::Expanded => {
                self.expanded.insert(id.clone());
            }
            Expansion::Collapsed => {
                self.expanded.remove(id);
            }
        }
        next
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Source currently on screen for `block`.
    #[must_use]
    pub fn presented_source<'a>(&self, block: &'a CodeBlock) -> &'a str {
        if block.truncated() && self.expansion(block.id()) == Expansion::Collapsed {
            block.visible_source()
        } else {
            block.full_source()
        }
    }
}
