//! Core value types: selection, ranges, surface identity, geometry.
//!
//! These types are shared by both editing surfaces and carry no surface
//! specific meaning beyond "a position is a `usize`".

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Which editing surface a context or action refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceKind {
    /// Typed node/mark tree (WYSIWYG).
    Structured,
    /// Flat character buffer (markdown source).
    FlatText,
}

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Where selection started
    pub anchor: usize,
    /// Where cursor is now
    pub head: usize,
}

impl Selection {
    /// Create a new selection.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Check if the selection is collapsed (empty, cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Get the selection length.
    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    /// Check if empty (same as is_collapsed).
    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    /// Convert to a Range<usize> (ordered).
    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Check if the selection is backwards (head before anchor).
    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }
}

impl From<TextRange> for Selection {
    fn from(range: TextRange) -> Self {
        Self::new(range.from, range.to)
    }
}

/// A half-open `[from, to)` span of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub from: usize,
    pub to: usize,
}

impl TextRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered and non-inverted.
    pub fn is_valid(&self) -> bool {
        self.from <= self.to
    }

    /// Strict interior membership: the edges are not inside.
    pub fn strictly_contains(&self, pos: usize) -> bool {
        self.from < pos && pos < self.to
    }

    /// Whether `other` lies entirely within this range (edges inclusive).
    pub fn covers(&self, other: TextRange) -> bool {
        self.from <= other.from && other.to <= self.to
    }
}

impl From<Range<usize>> for TextRange {
    fn from(r: Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

impl From<TextRange> for Range<usize> {
    fn from(r: TextRange) -> Self {
        r.from..r.to
    }
}

/// Zero-based line and column of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

impl LineCol {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Pixel rectangle, relative to the editor container.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// IME composition state (for international text input).
///
/// During IME composition, the user is building up a string of characters
/// that hasn't been committed yet. This tracks where that composition
/// started and what text is currently being composed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositionState {
    /// Character offset where composition started
    pub start_offset: usize,
    /// Current composition text (uncommitted)
    pub text: String,
}

impl CompositionState {
    /// Create a new composition state.
    pub fn new(start_offset: usize, text: String) -> Self {
        Self { start_offset, text }
    }

    /// Get the end offset of the composition.
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.text.chars().count()
    }
}
