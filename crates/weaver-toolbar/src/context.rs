//! The normalized cursor context both surfaces reduce to.
//!
//! A `CursorContext` is an immutable snapshot rebuilt on every
//! classification. The classifier and the enable rules only ever see this
//! type, never surface internals.

use std::collections::BTreeSet;

use serde::Serialize;
use smol_str::SmolStr;

use crate::marks::{FormatRange, MarkKind};
use crate::types::{Selection, TextRange};

/// How a generic insertion popup should present itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextMode {
    Format,
    #[default]
    Insert,
    InsertBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlockInfo {
    pub language: Option<SmolStr>,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MathBlockInfo {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub from: usize,
    pub to: usize,
    /// Zero-based row of the cursor. The header row is 0.
    pub row: usize,
    /// Zero-based column of the cursor.
    pub column: usize,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListKind {
    Bullet,
    Ordered,
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListInfo {
    pub kind: ListKind,
    /// Nesting depth, 0 for a top-level item.
    pub depth: usize,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockquoteInfo {
    pub depth: usize,
    pub from: usize,
    pub to: usize,
}

/// The single exclusive block construct around the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BlockContext {
    CodeBlock(CodeBlockInfo),
    MathBlock(MathBlockInfo),
    Table(TableInfo),
    List(ListInfo),
    Blockquote(BlockquoteInfo),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingInfo {
    pub level: u8,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkInfo {
    pub href: SmolStr,
    pub from: usize,
    pub to: usize,
    pub text_from: usize,
    pub text_to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub src: SmolStr,
    pub alt: SmolStr,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineMathInfo {
    pub from: usize,
    pub to: usize,
    pub content_from: usize,
    pub content_to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FootnoteInfo {
    pub label: SmolStr,
    pub from: usize,
    pub to: usize,
    pub label_from: usize,
    pub label_to: usize,
}

/// Snapshot of everything the classifier needs to know about the cursor.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CursorContext {
    pub block: Option<BlockContext>,
    pub in_heading: Option<HeadingInfo>,
    pub in_link: Option<LinkInfo>,
    pub in_image: Option<ImageInfo>,
    pub in_inline_math: Option<InlineMathInfo>,
    pub in_footnote: Option<FootnoteInfo>,
    pub active_formats: BTreeSet<MarkKind>,
    pub format_ranges: Vec<FormatRange>,
    pub innermost_format: Option<FormatRange>,
    pub at_line_start: bool,
    pub at_blank_line: bool,
    pub in_word: Option<TextRange>,
    pub context_mode: ContextMode,
    pub has_selection: bool,
    pub selection_from: usize,
    pub selection_to: usize,
}

impl CursorContext {
    pub fn in_code_block(&self) -> Option<&CodeBlockInfo> {
        match &self.block {
            Some(BlockContext::CodeBlock(info)) => Some(info),
            _ => None,
        }
    }

    pub fn in_block_math(&self) -> Option<&MathBlockInfo> {
        match &self.block {
            Some(BlockContext::MathBlock(info)) => Some(info),
            _ => None,
        }
    }

    pub fn in_table(&self) -> Option<&TableInfo> {
        match &self.block {
            Some(BlockContext::Table(info)) => Some(info),
            _ => None,
        }
    }

    pub fn in_list(&self) -> Option<&ListInfo> {
        match &self.block {
            Some(BlockContext::List(info)) => Some(info),
            _ => None,
        }
    }

    pub fn in_blockquote(&self) -> Option<&BlockquoteInfo> {
        match &self.block {
            Some(BlockContext::Blockquote(info)) => Some(info),
            _ => None,
        }
    }

    /// The cursor position before any auto-select (the selection head side
    /// is irrelevant once collapsed).
    pub fn cursor(&self) -> usize {
        self.selection_from
    }

    pub fn selection_range(&self) -> TextRange {
        TextRange::new(self.selection_from, self.selection_to)
    }
}

/// Assembles a [`CursorContext`] from surface findings.
///
/// Both adapters feed the same builder so the derived fields
/// (`innermost_format`, `active_formats`, `context_mode`) follow one set of
/// rules regardless of surface.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    ctx: CursorContext,
}

impl ContextBuilder {
    pub fn new(selection: Selection) -> Self {
        let ctx = CursorContext {
            has_selection: !selection.is_collapsed(),
            selection_from: selection.start(),
            selection_to: selection.end(),
            ..Default::default()
        };
        Self { ctx }
    }

    /// A whole-node selection (an image atom): keeps the selected range but
    /// is not a text selection.
    pub fn node_selection(selection: Selection) -> Self {
        let mut builder = Self::new(selection);
        builder.ctx.has_selection = false;
        builder
    }

    pub fn has_selection(&self) -> bool {
        self.ctx.has_selection
    }

    pub fn block(mut self, block: Option<BlockContext>) -> Self {
        self.ctx.block = block;
        self
    }

    pub fn heading(mut self, heading: Option<HeadingInfo>) -> Self {
        self.ctx.in_heading = heading;
        self
    }

    pub fn link(mut self, link: Option<LinkInfo>) -> Self {
        self.ctx.in_link = link;
        self
    }

    pub fn image(mut self, image: Option<ImageInfo>) -> Self {
        self.ctx.in_image = image;
        self
    }

    pub fn inline_math(mut self, math: Option<InlineMathInfo>) -> Self {
        self.ctx.in_inline_math = math;
        self
    }

    pub fn footnote(mut self, footnote: Option<FootnoteInfo>) -> Self {
        self.ctx.in_footnote = footnote;
        self
    }

    /// Candidate format ranges found around the cursor or selection.
    ///
    /// With a selection only ranges whose content covers the whole
    /// selection are kept. With a collapsed cursor, ranges must hold the
    /// cursor strictly inside their outer span.
    pub fn formats(mut self, candidates: impl IntoIterator<Item = FormatRange>) -> Self {
        let sel = self.ctx.selection_range();
        let has_selection = self.ctx.has_selection;
        let ranges: Vec<FormatRange> = candidates
            .into_iter()
            .filter(FormatRange::is_valid)
            .filter(|r| {
                if has_selection {
                    r.content().covers(sel)
                } else {
                    r.range().strictly_contains(sel.from)
                }
            })
            .collect();

        self.ctx.innermost_format = if has_selection {
            None
        } else {
            ranges
                .iter()
                .filter(|r| r.contains_content(sel.from))
                .fold(None, |best: Option<FormatRange>, r| match best {
                    Some(b) if b.span() <= r.span() => Some(b),
                    _ => Some(*r),
                })
        };
        self.ctx.active_formats = ranges.iter().map(|r| r.kind).collect();
        self.ctx.format_ranges = ranges;
        self
    }

    pub fn line_start(mut self, at_line_start: bool) -> Self {
        self.ctx.at_line_start = at_line_start;
        self
    }

    pub fn blank_line(mut self, at_blank_line: bool) -> Self {
        self.ctx.at_blank_line = at_blank_line;
        self
    }

    /// Only recorded for a collapsed cursor.
    pub fn word(mut self, word: Option<TextRange>) -> Self {
        if !self.ctx.has_selection {
            self.ctx.in_word = word;
        }
        self
    }

    pub fn build(mut self) -> CursorContext {
        let ctx = &mut self.ctx;
        ctx.context_mode = if ctx.has_selection
            || ctx.innermost_format.is_some()
            || ctx.in_word.is_some()
        {
            ContextMode::Format
        } else if ctx.at_blank_line && ctx.block.is_none() {
            ContextMode::InsertBlock
        } else {
            ContextMode::Insert
        };
        self.ctx
    }
}

/// Last computed context, keyed by document revision.
///
/// Only for continuous enable/active polling. A popup-opening decision must
/// never read from here: after a document is reopened the cached snapshot
/// can describe content that no longer exists.
#[derive(Debug, Default)]
pub struct ContextCache {
    entry: Option<(u64, CursorContext)>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, revision: u64, ctx: CursorContext) {
        self.entry = Some((revision, ctx));
    }

    /// The cached context if it was computed for `revision`.
    pub fn get(&self, revision: u64) -> Option<&CursorContext> {
        match &self.entry {
            Some((rev, ctx)) if *rev == revision => Some(ctx),
            _ => None,
        }
    }

    /// Drop everything, e.g. when a different document is loaded.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
