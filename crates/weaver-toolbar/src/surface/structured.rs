//! Structured (node/mark tree) surface.
//!
//! Block constructs come from the resolved position's ancestor chain,
//! innermost first. Inline marks come from the enclosing textblock's run
//! sequence through the mark resolver. Delimiters are invisible here, so
//! every format range is bare (`content_* == from/to`).

use tracing::trace;

use super::{Geometry, MarkQuery, SurfaceAdapter, rect_via_geometry};
use crate::context::{
    BlockContext, BlockquoteInfo, CodeBlockInfo, ContextBuilder, CursorContext, FootnoteInfo,
    HeadingInfo, ImageInfo, InlineMathInfo, LinkInfo, ListInfo, ListKind, MathBlockInfo,
    TableInfo,
};
use crate::error::SurfaceError;
use crate::marks::{
    FormatRange, Mark, MarkKind, TextRun, mark_range_covering, marks_across,
    resolve_any_mark_range_where, resolve_mark_range,
};
use crate::tree::{
    Inline, InlineSpan, Node, NodeKind, PathStep, ResolvedPos, leaf_text, runs_of,
    textblock_spans,
};
use crate::types::{LineCol, Rect, Selection, SurfaceKind, TextRange};
use crate::word::WordBoundaryResolver;

/// WYSIWYG editing surface over a [`Node`] document.
pub struct StructuredSurface {
    doc: Node,
    selection: Selection,
    words: WordBoundaryResolver,
    geometry: Option<Box<dyn Geometry>>,
    mounted: bool,
}

impl std::fmt::Debug for StructuredSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredSurface")
            .field("size", &self.doc.content_size())
            .field("selection", &self.selection)
            .field("words", &self.words)
            .field("mounted", &self.mounted)
            .finish()
    }
}

impl StructuredSurface {
    /// Cursor starts at the beginning of the first textblock.
    pub fn new(doc: Node) -> Self {
        let start = doc.textblocks().first().map(|(start, _)| *start).unwrap_or(0);
        Self {
            doc,
            selection: Selection::collapsed(start),
            words: WordBoundaryResolver::default(),
            geometry: None,
            mounted: true,
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_words(mut self, words: WordBoundaryResolver) -> Self {
        self.words = words;
        self
    }

    pub fn with_geometry(mut self, geometry: impl Geometry + 'static) -> Self {
        self.geometry = Some(Box::new(geometry));
        self
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// Replace the document (reopen, external reload). The selection is
    /// clamped to the new document.
    pub fn set_doc(&mut self, doc: Node) {
        let size = doc.content_size();
        self.doc = doc;
        self.selection = Selection::new(self.selection.anchor.min(size), self.selection.head.min(size));
    }

    pub fn set_mounted(&mut self, mounted: bool) {
        self.mounted = mounted;
    }

    /// Textblock step and run sequence around the selection start.
    fn textblock_runs(&self) -> Option<(usize, Vec<TextRun>)> {
        let rp = self.doc.resolve(self.selection.start())?;
        let tb = rp.textblock()?;
        let spans = textblock_spans(tb.node, tb.content_start);
        Some((tb.content_start, runs_of(&spans)))
    }

    /// An image atom selected as a node: the selection spans exactly it.
    fn selected_image(&self, sel: Selection) -> Option<ImageInfo> {
        if sel.len() != 1 {
            return None;
        }
        let rp = self.doc.resolve(sel.start())?;
        let tb = rp.textblock()?;
        textblock_spans(tb.node, tb.content_start)
            .iter()
            .find(|span| span.from == sel.start() && span.to == sel.end())
            .and_then(image_info)
    }
}

fn image_info(span: &InlineSpan<'_>) -> Option<ImageInfo> {
    match span.item {
        Inline::Image { src, alt, .. } => Some(ImageInfo {
            src: src.clone(),
            alt: alt.clone(),
            from: span.from,
            to: span.to,
        }),
        _ => None,
    }
}

fn list_kind(list: &NodeKind, item: &NodeKind) -> ListKind {
    match (list, item) {
        (_, NodeKind::ListItem { checked: Some(_) }) => ListKind::Task,
        (NodeKind::OrderedList, _) => ListKind::Ordered,
        _ => ListKind::Bullet,
    }
}

fn table_info(path: &[PathStep<'_>], cell_depth: usize) -> Option<TableInfo> {
    let table_depth = cell_depth.checked_sub(2)?;
    let table = path.get(table_depth)?;
    let row = path.get(table_depth + 1)?;
    if table.node.kind != NodeKind::Table || row.node.kind != NodeKind::TableRow {
        return None;
    }
    Some(TableInfo {
        from: table.from(),
        to: table.to(),
        row: table.index,
        column: row.index,
        rows: table.node.children().len(),
        columns: row.node.children().len(),
    })
}

/// First block construct found walking outward from the innermost node.
fn block_context(rp: &ResolvedPos<'_>) -> Option<BlockContext> {
    for (depth, step) in rp.path.iter().enumerate().skip(1).rev() {
        let (from, to) = (step.from(), step.to());
        match &step.node.kind {
            NodeKind::CodeBlock { language } => {
                return Some(BlockContext::CodeBlock(CodeBlockInfo {
                    language: language.clone(),
                    from,
                    to,
                }));
            }
            NodeKind::MathBlock => {
                return Some(BlockContext::MathBlock(MathBlockInfo { from, to }));
            }
            NodeKind::ListItem { .. } => {
                let list = &rp.path[depth - 1].node.kind;
                let nesting = rp.path[..depth]
                    .iter()
                    .filter(|s| matches!(s.node.kind, NodeKind::BulletList | NodeKind::OrderedList))
                    .count();
                return Some(BlockContext::List(ListInfo {
                    kind: list_kind(list, &step.node.kind),
                    depth: nesting.saturating_sub(1),
                    from,
                    to,
                }));
            }
            NodeKind::TableCell { .. } => {
                if let Some(table) = table_info(&rp.path, depth) {
                    return Some(BlockContext::Table(table));
                }
            }
            NodeKind::Blockquote => {
                let nesting = rp.path[..=depth]
                    .iter()
                    .filter(|s| s.node.kind == NodeKind::Blockquote)
                    .count();
                return Some(BlockContext::Blockquote(BlockquoteInfo {
                    depth: nesting,
                    from,
                    to,
                }));
            }
            _ => {}
        }
    }
    None
}

/// Non-link format ranges around a cursor or covering a selection.
fn format_candidates(runs: &[TextRun], sel: TextRange, has_selection: bool) -> Vec<FormatRange> {
    let marks: Vec<Mark> = if has_selection {
        marks_across(runs, sel.from, sel.to)
    } else {
        let mut marks: Vec<Mark> = Vec::new();
        for run in runs.iter().filter(|r| r.from <= sel.from && sel.from <= r.to) {
            for mark in &run.marks {
                if !marks.contains(mark) {
                    marks.push(mark.clone());
                }
            }
        }
        marks
    };

    marks
        .iter()
        .filter(|mark| !mark.is_link())
        .filter_map(|mark| {
            let range = if has_selection {
                mark_range_covering(runs, sel.from, sel.to, mark)
            } else {
                resolve_mark_range(sel.from, runs, mark)
            }?;
            Some(FormatRange::bare(mark.kind(), range))
        })
        .collect()
}

/// Link mark range around a cursor (strict) or covering a selection.
fn link_info(runs: &[TextRun], sel: TextRange, has_selection: bool) -> Option<LinkInfo> {
    let (mark, range) = if has_selection {
        marks_across(runs, sel.from, sel.to)
            .into_iter()
            .filter(Mark::is_link)
            .find_map(|mark| {
                let range = mark_range_covering(runs, sel.from, sel.to, &mark)?;
                Some((mark, range))
            })?
    } else {
        let found = resolve_any_mark_range_where(sel.from, runs, Mark::is_link)?;
        (found.mark, found.range)
    };
    let Mark::Link { href } = mark else {
        return None;
    };
    Some(LinkInfo {
        href,
        from: range.from,
        to: range.to,
        text_from: range.from,
        text_to: range.to,
    })
}

fn hits(span: &InlineSpan<'_>, sel: TextRange, has_selection: bool) -> bool {
    let outer = TextRange::new(span.from, span.to);
    if has_selection {
        outer.covers(sel)
    } else {
        outer.strictly_contains(sel.from)
    }
}

impl SurfaceAdapter for StructuredSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Structured
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) -> Result<(), SurfaceError> {
        if !self.mounted {
            return Err(SurfaceError::NotMounted);
        }
        let len = self.doc.content_size();
        if selection.end() > len {
            return Err(SurfaceError::PositionOutOfRange {
                pos: selection.end(),
                len,
            });
        }
        self.selection = selection;
        Ok(())
    }

    fn context(&self) -> CursorContext {
        let sel = self.selection;
        let node_image = self.selected_image(sel);
        let builder = if node_image.is_some() {
            ContextBuilder::node_selection(sel)
        } else {
            ContextBuilder::new(sel)
        };
        if sel.end() > self.doc.content_size() {
            trace!(from = sel.start(), to = sel.end(), "selection out of range");
            return builder.build();
        }
        let Some(rp) = self.doc.resolve(sel.start()) else {
            return builder.build();
        };

        let block = block_context(&rp);
        let Some(tb) = rp.textblock() else {
            // Between blocks: only the block construct applies.
            return builder.block(block).build();
        };
        if matches!(tb.node.kind, NodeKind::CodeBlock { .. } | NodeKind::MathBlock) {
            return builder.block(block).build();
        }

        let has_selection = builder.has_selection();
        let range = TextRange::new(sel.start(), sel.end());
        let heading = match tb.node.kind {
            NodeKind::Heading { level } => Some(HeadingInfo {
                level,
                from: tb.from(),
                to: tb.to(),
            }),
            _ => None,
        };

        let spans = textblock_spans(tb.node, tb.content_start);
        let runs = runs_of(&spans);
        let link = link_info(&runs, range, has_selection);
        let formats = format_candidates(&runs, range, has_selection);

        let math = spans.iter().find_map(|span| match span.item {
            Inline::Math { .. } if hits(span, range, has_selection) => Some(InlineMathInfo {
                from: span.from,
                to: span.to,
                content_from: span.from + 1,
                content_to: span.to - 1,
            }),
            _ => None,
        });
        let footnote = spans.iter().find_map(|span| match span.item {
            Inline::FootnoteRef { label, .. } if hits(span, range, has_selection) => {
                Some(FootnoteInfo {
                    label: label.clone(),
                    from: span.from,
                    to: span.to,
                    label_from: span.from + 1,
                    label_to: span.to - 1,
                })
            }
            _ => None,
        });

        let text = leaf_text(tb.node);
        let offset = sel.start() - tb.content_start;
        let before: String = text.chars().take(offset).collect();
        let blank = text.trim().is_empty();
        let at_line_start = tb.node.kind == NodeKind::Paragraph
            && block.is_none()
            && before.trim().is_empty()
            && !blank;
        let word = self
            .words
            .word_at(&text, offset)
            .map(|w| TextRange::new(w.from + tb.content_start, w.to + tb.content_start));

        trace!(pos = sel.start(), depth = rp.depth(), "structured context");
        builder
            .block(block)
            .heading(heading)
            .link(link)
            .image(node_image)
            .inline_math(math)
            .footnote(footnote)
            .formats(formats)
            .line_start(at_line_start)
            .blank_line(blank)
            .word(word)
            .build()
    }

    fn pos_to_line_col(&self, pos: usize) -> Option<LineCol> {
        self.doc
            .textblocks()
            .into_iter()
            .enumerate()
            .find(|(_, (start, node))| *start <= pos && pos <= start + node.content_size())
            .map(|(line, (start, _))| LineCol::new(line, pos - start))
    }

    fn line_col_to_pos(&self, line_col: LineCol) -> Option<usize> {
        let blocks = self.doc.textblocks();
        let (start, node) = blocks.get(line_col.line)?;
        (line_col.column <= node.content_size()).then_some(start + line_col.column)
    }

    fn range_rect(&self, from: usize, to: usize) -> Option<Rect> {
        rect_via_geometry(self, self.geometry.as_deref(), from, to)
    }

    fn mark_query(&self) -> Option<&dyn MarkQuery> {
        Some(self)
    }
}

impl MarkQuery for StructuredSurface {
    /// Collapsed: the marks a typed char would get (the run before the
    /// cursor, or after it at the start of the block). Range: every run
    /// overlapping the selection carries the mark.
    fn mark_active(&self, kind: MarkKind) -> bool {
        let Some((content_start, runs)) = self.textblock_runs() else {
            return false;
        };
        let sel = self.selection;
        if sel.is_collapsed() {
            let pos = sel.start();
            let run = if pos == content_start {
                runs.iter().find(|r| r.from == pos)
            } else {
                runs.iter().find(|r| r.from < pos && pos <= r.to)
            };
            run.is_some_and(|r| r.marks.iter().any(|m| m.kind() == kind))
        } else {
            marks_across(&runs, sel.start(), sel.end())
                .iter()
                .any(|m| m.kind() == kind)
        }
    }
}
