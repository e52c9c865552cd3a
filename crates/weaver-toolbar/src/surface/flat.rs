//! Flat-text (markdown source) surface.
//!
//! There is no node tree here, so block constructs come from line scans and
//! inline constructs from the cursor's line. Positions are char offsets into
//! the buffer.

use tracing::trace;

use super::markdown::{self, FenceKind, InlineMatch};
use super::{Geometry, SurfaceAdapter, rect_via_geometry};
use crate::context::{
    BlockContext, BlockquoteInfo, CodeBlockInfo, ContextBuilder, CursorContext, FootnoteInfo,
    HeadingInfo, ImageInfo, InlineMathInfo, LinkInfo, ListInfo, MathBlockInfo,
};
use crate::error::SurfaceError;
use crate::text::{EditorRope, TextBuffer};
use crate::types::{LineCol, Rect, Selection, SurfaceKind, TextRange};
use crate::word::WordBoundaryResolver;

/// Markdown source editing surface over an [`EditorRope`].
pub struct FlatTextSurface {
    buffer: EditorRope,
    selection: Selection,
    words: WordBoundaryResolver,
    geometry: Option<Box<dyn Geometry>>,
    mounted: bool,
}

impl std::fmt::Debug for FlatTextSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatTextSurface")
            .field("len_chars", &self.buffer.len_chars())
            .field("selection", &self.selection)
            .field("words", &self.words)
            .field("mounted", &self.mounted)
            .finish()
    }
}

impl FlatTextSurface {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: EditorRope::from_str(text),
            selection: Selection::default(),
            words: WordBoundaryResolver::default(),
            geometry: None,
            mounted: true,
        }
    }

    /// Builder-style initial selection. Not validated; out-of-range
    /// selections degrade to an empty context.
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

    pub fn buffer(&self) -> &EditorRope {
        &self.buffer
    }

    /// Content edits go through here (typing, composition cleanup).
    pub fn buffer_mut(&mut self) -> &mut EditorRope {
        &mut self.buffer
    }

    pub fn set_mounted(&mut self, mounted: bool) {
        self.mounted = mounted;
    }

    fn block_span(&self, start_line: usize, end_line: usize) -> Option<(usize, usize)> {
        let from = self.buffer.line_to_char(start_line)?;
        let to = self.buffer.line_range(end_line)?.end;
        Some((from, to))
    }

    fn fenced_block(&self, line: usize) -> Option<BlockContext> {
        let region = markdown::fence_regions(&self.buffer)
            .into_iter()
            .find(|r| r.start_line <= line && line <= r.end_line)?;
        let (from, to) = self.block_span(region.start_line, region.end_line)?;
        Some(match region.kind {
            FenceKind::Code { language } => {
                BlockContext::CodeBlock(CodeBlockInfo { language, from, to })
            }
            FenceKind::Math => BlockContext::MathBlock(MathBlockInfo { from, to }),
        })
    }
}

/// Strict membership for a cursor, coverage for a selection.
fn hits(outer: TextRange, inner: TextRange, cursor: usize, selection: Option<TextRange>) -> bool {
    match selection {
        Some(sel) => inner.covers(sel),
        None => outer.strictly_contains(cursor),
    }
}

fn shift(range: TextRange, by: usize) -> TextRange {
    TextRange::new(range.from + by, range.to + by)
}

fn find_hit(
    found: Vec<InlineMatch>,
    cursor: usize,
    selection: Option<TextRange>,
    cover_outer: bool,
) -> Option<InlineMatch> {
    found.into_iter().find(|m| {
        let inner = if cover_outer { m.range } else { m.inner };
        hits(m.range, inner, cursor, selection)
    })
}

impl SurfaceAdapter for FlatTextSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::FlatText
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
        let len = self.buffer.len_chars();
        if selection.end() > len {
            return Err(SurfaceError::PositionOutOfRange {
                pos: selection.end(),
                len,
            });
        }
        self.selection = selection;
        Ok(())
    }

    fn text_buffer_mut(&mut self) -> Option<&mut dyn TextBuffer> {
        Some(&mut self.buffer)
    }

    fn context(&self) -> CursorContext {
        let sel = self.selection;
        let builder = ContextBuilder::new(sel);
        if sel.end() > self.buffer.len_chars() {
            trace!(from = sel.start(), to = sel.end(), "selection out of range");
            return builder.build();
        }

        let pos = sel.start();
        let Some(line) = self.buffer.char_to_line(pos) else {
            return builder.build();
        };
        let (Some(bounds), Some(text)) = (self.buffer.line_range(line), self.buffer.line_text(line))
        else {
            return builder.build();
        };
        let line_start = bounds.start;
        let column = (pos - line_start).min(text.chars().count());

        if let Some(block) = self.fenced_block(line) {
            trace!(line, "cursor in fenced block");
            return builder.block(Some(block)).build();
        }

        // Line-relative views of the cursor and selection.
        let selection = builder
            .has_selection()
            .then(|| TextRange::new(column, sel.end() - line_start));

        let (quote_depth, unquoted) = markdown::strip_quote_prefixes(&text);
        let block = markdown::table_at(&self.buffer, line, column)
            .map(BlockContext::Table)
            .or_else(|| {
                markdown::list_marker(unquoted).map(|(kind, depth)| {
                    BlockContext::List(ListInfo {
                        kind,
                        depth,
                        from: bounds.start,
                        to: bounds.end,
                    })
                })
            })
            .or_else(|| {
                (quote_depth > 0).then(|| {
                    BlockContext::Blockquote(BlockquoteInfo {
                        depth: quote_depth,
                        from: bounds.start,
                        to: bounds.end,
                    })
                })
            });

        let heading = match block {
            Some(BlockContext::Table(_)) => None,
            _ => markdown::heading_level(unquoted).map(|level| HeadingInfo {
                level,
                from: bounds.start,
                to: bounds.end,
            }),
        };

        let link = find_hit(markdown::links(&text), column, selection, false).map(|m| {
            let text_range = shift(m.inner, line_start);
            LinkInfo {
                href: m.target,
                from: m.range.from + line_start,
                to: m.range.to + line_start,
                text_from: text_range.from,
                text_to: text_range.to,
            }
        });
        let image = find_hit(markdown::images(&text), column, selection, true).map(|m| ImageInfo {
            src: m.target,
            alt: m.inner_text,
            from: m.range.from + line_start,
            to: m.range.to + line_start,
        });
        let math = find_hit(markdown::inline_math(&text), column, selection, true).map(|m| {
            InlineMathInfo {
                from: m.range.from + line_start,
                to: m.range.to + line_start,
                content_from: m.inner.from + line_start,
                content_to: m.inner.to + line_start,
            }
        });
        let footnote =
            find_hit(markdown::footnote_refs(&text), column, selection, true).map(|m| {
                FootnoteInfo {
                    label: m.inner_text,
                    from: m.range.from + line_start,
                    to: m.range.to + line_start,
                    label_from: m.inner.from + line_start,
                    label_to: m.inner.to + line_start,
                }
            });

        let formats = markdown::format_ranges(&text).into_iter().map(|mut r| {
            r.from += line_start;
            r.to += line_start;
            r.content_from += line_start;
            r.content_to += line_start;
            r
        });

        let before: String = text.chars().take(column).collect();
        let blank = text.trim().is_empty();
        let at_line_start =
            before.trim().is_empty() && !blank && block.is_none() && heading.is_none();
        let word = self
            .words
            .word_at(&text, column)
            .map(|w| shift(w, line_start));

        trace!(pos, line, column, "flat context");
        builder
            .block(block)
            .heading(heading)
            .link(link)
            .image(image)
            .inline_math(math)
            .footnote(footnote)
            .formats(formats)
            .line_start(at_line_start)
            .blank_line(blank)
            .word(word)
            .build()
    }

    fn pos_to_line_col(&self, pos: usize) -> Option<LineCol> {
        let line = self.buffer.char_to_line(pos)?;
        let start = self.buffer.line_to_char(line)?;
        Some(LineCol::new(line, pos - start))
    }

    fn line_col_to_pos(&self, line_col: LineCol) -> Option<usize> {
        let bounds = self.buffer.line_range(line_col.line)?;
        let pos = bounds.start + line_col.column;
        (pos <= bounds.end).then_some(pos)
    }

    fn range_rect(&self, from: usize, to: usize) -> Option<Rect> {
        rect_via_geometry(self, self.geometry.as_deref(), from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextMode, ListKind};
    use crate::marks::MarkKind;

    fn ctx_at(text: &str, pos: usize) -> CursorContext {
        FlatTextSurface::new(text)
            .with_selection(Selection::collapsed(pos))
            .context()
    }

    fn ctx_sel(text: &str, from: usize, to: usize) -> CursorContext {
        FlatTextSurface::new(text)
            .with_selection(Selection::new(from, to))
            .context()
    }

    #[test]
    fn test_emphasis_innermost() {
        let ctx = ctx_at("Check *this* out", 8);
        let inner = ctx.innermost_format.unwrap();
        assert_eq!(inner.kind, MarkKind::Emphasis);
        assert_eq!(inner.content(), TextRange::new(7, 11));
        assert!(ctx.active_formats.contains(&MarkKind::Emphasis));
    }

    #[test]
    fn test_delimiter_positions_not_inside_content() {
        let ctx = ctx_at("**bold**", 2);
        assert!(ctx.innermost_format.is_none());
        let ctx = ctx_at("**bold**", 6);
        assert!(ctx.innermost_format.is_none());
        let ctx = ctx_at("**bold**", 3);
        assert_eq!(ctx.innermost_format.unwrap().content(), TextRange::new(2, 6));
    }

    #[test]
    fn test_code_fence() {
        let text = "intro\n```rust\nfn main() {}\n```\nafter";
        let ctx = ctx_at(text, 16);
        let code = ctx.in_code_block().unwrap();
        assert_eq!(code.language.as_deref(), Some("rust"));
        assert_eq!(code.from, 6);
        assert_eq!(code.to, 30);
        assert!(ctx.in_word.is_none());

        assert!(ctx_at(text, 33).in_code_block().is_none());
    }

    #[test]
    fn test_math_fence() {
        let ctx = ctx_at("$$\nx^2\n$$", 4);
        assert!(ctx.in_block_math().is_some());
    }

    #[test]
    fn test_table_with_selection() {
        let text = "a | b\n---|---\n1 | 2";
        let ctx = ctx_sel(text, 14, 15);
        let table = ctx.in_table().unwrap();
        assert_eq!(table.columns, 2);
        assert_eq!((table.row, table.column), (1, 0));
        assert!(ctx.has_selection);
    }

    #[test]
    fn test_quoted_list_is_list() {
        let ctx = ctx_at("> - item", 6);
        let list = ctx.in_list().unwrap();
        assert_eq!(list.kind, ListKind::Bullet);
        assert_eq!(list.depth, 0);

        let ctx = ctx_at("> > quoted", 6);
        assert_eq!(ctx.in_blockquote().unwrap().depth, 2);
    }

    #[test]
    fn test_heading() {
        let ctx = ctx_at("## Title", 4);
        assert_eq!(ctx.in_heading.as_ref().unwrap().level, 2);
        assert!(!ctx.at_line_start);
    }

    #[test]
    fn test_link_and_image() {
        let text = "a [site](https://example.com) ![pic](p.png)";
        let ctx = ctx_at(text, 4);
        let link = ctx.in_link.unwrap();
        assert_eq!(link.href, "https://example.com");
        assert_eq!((link.text_from, link.text_to), (3, 7));
        assert!(ctx.in_image.is_none());

        let ctx = ctx_at(text, 34);
        assert_eq!(ctx.in_image.unwrap().alt, "pic");
        assert!(ctx.in_link.is_none());
    }

    #[test]
    fn test_link_edges_are_outside() {
        let ctx = ctx_at("[a](b)", 0);
        assert!(ctx.in_link.is_none());
        let ctx = ctx_at("[a](b)", 6);
        assert!(ctx.in_link.is_none());
    }

    #[test]
    fn test_selection_inside_link_text() {
        let ctx = ctx_sel("[site](u)", 1, 5);
        assert!(ctx.in_link.is_some());
    }

    #[test]
    fn test_footnote_and_inline_math() {
        let ctx = ctx_at("claim[^n1] here", 8);
        let note = ctx.in_footnote.unwrap();
        assert_eq!(note.label, "n1");
        assert_eq!((note.label_from, note.label_to), (7, 9));

        let ctx = ctx_at("so $a+b$ ok", 5);
        let math = ctx.in_inline_math.unwrap();
        assert_eq!((math.content_from, math.content_to), (4, 7));
    }

    #[test]
    fn test_line_start_and_blank() {
        let ctx = ctx_at("first\nsecond", 6);
        assert!(ctx.at_line_start);
        assert!(!ctx.at_blank_line);

        let ctx = ctx_at("first\n\nthird", 6);
        assert!(!ctx.at_line_start);
        assert!(ctx.at_blank_line);
        assert_eq!(ctx.context_mode, ContextMode::InsertBlock);

        let ctx = ctx_at("- item", 0);
        assert!(!ctx.at_line_start);
    }

    #[cfg(feature = "unicode-words")]
    #[test]
    fn test_word_on_second_line() {
        let ctx = ctx_at("x\nthe cat sat", 7);
        assert_eq!(ctx.in_word, Some(TextRange::new(6, 9)));
        assert_eq!(ctx.context_mode, ContextMode::Format);
    }

    #[test]
    fn test_words_disabled() {
        let ctx = FlatTextSurface::new("the cat sat")
            .with_words(WordBoundaryResolver::disabled())
            .with_selection(Selection::collapsed(5))
            .context();
        assert!(ctx.in_word.is_none());
    }

    #[test]
    fn test_out_of_range_selection_degrades() {
        let ctx = ctx_at("abc", 10);
        assert!(ctx.block.is_none());
        assert!(ctx.in_word.is_none());
    }

    #[test]
    fn test_set_selection_validates() {
        let mut surface = FlatTextSurface::new("abc");
        assert!(surface.set_selection(Selection::new(1, 3)).is_ok());
        assert_eq!(
            surface.set_selection(Selection::collapsed(4)),
            Err(SurfaceError::PositionOutOfRange { pos: 4, len: 3 })
        );
        surface.set_mounted(false);
        assert_eq!(
            surface.set_selection(Selection::collapsed(0)),
            Err(SurfaceError::NotMounted)
        );
    }

    #[test]
    fn test_line_col_round_trip() {
        let surface = FlatTextSurface::new("ab\ncde");
        assert_eq!(surface.pos_to_line_col(4), Some(LineCol::new(1, 1)));
        assert_eq!(surface.line_col_to_pos(LineCol::new(1, 1)), Some(4));
        assert_eq!(surface.line_col_to_pos(LineCol::new(0, 5)), None);
    }

    #[test]
    fn test_range_rect_needs_geometry() {
        let surface = FlatTextSurface::new("ab\ncde");
        assert!(surface.range_rect(0, 2).is_none());

        let surface = surface.with_geometry(crate::surface::MonospaceGeometry {
            origin_x: 0.0,
            origin_y: 0.0,
            char_width: 10.0,
            line_height: 20.0,
        });
        let rect = surface.range_rect(3, 5).unwrap();
        assert_eq!(rect.y, 20.0);
        assert_eq!(rect.width, 20.0);
    }
}
