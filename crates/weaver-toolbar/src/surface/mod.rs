//! Surface abstraction: the two editing surfaces behind one interface.
//!
//! Each adapter reduces its native cursor/selection state to a
//! [`CursorContext`]. The classifier depends only on this trait, so the
//! structured and flat-text surfaces must agree field for field on what a
//! context means.

pub mod flat;
pub(crate) mod markdown;
pub mod structured;

pub use flat::FlatTextSurface;
pub use structured::StructuredSurface;

use crate::context::CursorContext;
use crate::error::SurfaceError;
use crate::marks::MarkKind;
use crate::text::TextBuffer;
use crate::types::{LineCol, Rect, Selection, SurfaceKind};

/// A live editing surface as seen by the toolbar core.
pub trait SurfaceAdapter {
    fn kind(&self) -> SurfaceKind;

    /// False during the mount/teardown window.
    fn is_mounted(&self) -> bool {
        true
    }

    /// Current selection, in this surface's positions.
    fn selection(&self) -> Selection;

    /// Selection-only mutation; never edits content.
    fn set_selection(&mut self, selection: Selection) -> Result<(), SurfaceError>;

    /// Fresh snapshot of the cursor context.
    fn context(&self) -> CursorContext;

    fn pos_to_line_col(&self, pos: usize) -> Option<LineCol>;

    fn line_col_to_pos(&self, line_col: LineCol) -> Option<usize>;

    /// Pixel rectangle covering `[from, to)`, for popup positioning.
    fn range_rect(&self, from: usize, to: usize) -> Option<Rect>;

    /// The surface's own mark registry, when it has one.
    fn mark_query(&self) -> Option<&dyn MarkQuery> {
        None
    }

    /// Raw text storage, for surfaces that edit a flat buffer directly.
    fn text_buffer_mut(&mut self) -> Option<&mut dyn TextBuffer> {
        None
    }
}

/// Answers whether a mark is applied across the effective selection.
pub trait MarkQuery {
    fn mark_active(&self, kind: MarkKind) -> bool;
}

/// Pixel geometry provider used by `range_rect`.
pub trait Geometry {
    /// Rectangle from the start of `from` to the end of `to`.
    fn rect(&self, from: LineCol, to: LineCol) -> Option<Rect>;
}

/// Fixed-pitch geometry: every char is `char_width` wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceGeometry {
    pub origin_x: f32,
    pub origin_y: f32,
    pub char_width: f32,
    pub line_height: f32,
}

impl Geometry for MonospaceGeometry {
    fn rect(&self, from: LineCol, to: LineCol) -> Option<Rect> {
        if (to.line, to.column) < (from.line, from.column) {
            return None;
        }
        let y = self.origin_y + from.line as f32 * self.line_height;
        let height = (to.line - from.line + 1) as f32 * self.line_height;
        let (x, width) = if from.line == to.line {
            (
                self.origin_x + from.column as f32 * self.char_width,
                (to.column - from.column) as f32 * self.char_width,
            )
        } else {
            // Multi-line ranges report the full width of the widest edge.
            let right = from.column.max(to.column) as f32 * self.char_width;
            (self.origin_x, right)
        };
        Some(Rect {
            x,
            y,
            width,
            height,
        })
    }
}

/// Shared `range_rect` implementation over line/column conversion.
pub(crate) fn rect_via_geometry(
    surface: &dyn SurfaceAdapter,
    geometry: Option<&dyn Geometry>,
    from: usize,
    to: usize,
) -> Option<Rect> {
    let geometry = geometry?;
    let start = surface.pos_to_line_col(from.min(to))?;
    let end = surface.pos_to_line_col(from.max(to))?;
    geometry.rect(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> MonospaceGeometry {
        MonospaceGeometry {
            origin_x: 10.0,
            origin_y: 20.0,
            char_width: 8.0,
            line_height: 16.0,
        }
    }

    #[test]
    fn test_single_line_rect() {
        let rect = geometry()
            .rect(LineCol::new(2, 3), LineCol::new(2, 7))
            .unwrap();
        assert_eq!(rect.x, 34.0);
        assert_eq!(rect.y, 52.0);
        assert_eq!(rect.width, 32.0);
        assert_eq!(rect.height, 16.0);
    }

    #[test]
    fn test_multi_line_rect() {
        let rect = geometry()
            .rect(LineCol::new(0, 4), LineCol::new(1, 2))
            .unwrap();
        assert_eq!(rect.x, 10.0);
        assert_eq!(rect.height, 32.0);
        assert_eq!(rect.width, 32.0);
    }

    #[test]
    fn test_inverted_rect() {
        assert!(geometry()
            .rect(LineCol::new(1, 0), LineCol::new(0, 0))
            .is_none());
    }
}
