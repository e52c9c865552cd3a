//! Text buffer abstraction for the flat-text surface.
//!
//! The `TextBuffer` trait is the read/line-lookup interface the source
//! surface is built on, plus the two content edits the composition cleanup
//! needs. `EditorRope` is the ropey-backed implementation.

use std::ops::Range;

use smol_str::{SmolStr, ToSmolStr};

/// A text buffer with char-offset addressing and line lookup.
///
/// All offsets are in Unicode scalar values (chars), not bytes or UTF-16.
pub trait TextBuffer {
    /// Total length in chars (Unicode scalar values).
    fn len_chars(&self) -> usize;

    /// Check if empty.
    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert text at char offset.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Delete char range.
    fn delete(&mut self, char_range: Range<usize>);

    /// Get a slice as SmolStr. Returns None if range is invalid.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    /// Get character at offset. Returns None if out of bounds.
    fn char_at(&self, char_offset: usize) -> Option<char>;

    /// Convert entire buffer to String.
    fn to_string(&self) -> String;

    /// Number of lines. An empty buffer has one (empty) line.
    fn len_lines(&self) -> usize;

    /// Line index containing the char offset. `None` past the end.
    fn char_to_line(&self, char_offset: usize) -> Option<usize>;

    /// Char offset of the first char of a line. `None` past the last line.
    fn line_to_char(&self, line: usize) -> Option<usize>;

    /// Char range of a line, excluding its line terminator.
    fn line_range(&self, line: usize) -> Option<Range<usize>> {
        let start = self.line_to_char(line)?;
        let end = match self.line_to_char(line + 1) {
            Some(next) => next - 1,
            None => self.len_chars(),
        };
        // CRLF: drop the \r as well.
        let end = if end > start && self.char_at(end - 1) == Some('\r') {
            end - 1
        } else {
            end
        };
        Some(start..end.max(start))
    }

    /// Text of a line, excluding its line terminator.
    fn line_text(&self, line: usize) -> Option<SmolStr> {
        self.slice(self.line_range(line)?)
    }
}

/// Ropey-backed text buffer.
///
/// Provides O(log n) editing operations and line lookups.
#[derive(Clone, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    /// Create a new empty rope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from string.
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }

    /// Get a reference to the underlying rope (for advanced operations).
    pub fn rope(&self) -> &ropey::Rope {
        &self.rope
    }
}

impl TextBuffer for EditorRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        let offset = char_offset.min(self.rope.len_chars());
        self.rope.insert(offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        let len = self.rope.len_chars();
        let start = char_range.start.min(len);
        let end = char_range.end.min(len);
        if start < end {
            self.rope.remove(start..end);
        }
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        if char_offset >= self.len_chars() {
            return None;
        }
        Some(self.rope.char(char_offset))
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }

    fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    fn char_to_line(&self, char_offset: usize) -> Option<usize> {
        if char_offset > self.rope.len_chars() {
            return None;
        }
        Some(self.rope.char_to_line(char_offset))
    }

    fn line_to_char(&self, line: usize) -> Option<usize> {
        if line >= self.rope.len_lines() {
            return None;
        }
        Some(self.rope.line_to_char(line))
    }
}

impl From<&str> for EditorRope {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for EditorRope {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}
