//! Word span lookup for auto-selecting the word under the cursor.
//!
//! Segmentation is delegated to a [`WordSegmenter`]. The default one is
//! built lazily once per process; when it is unavailable (feature
//! `unicode-words` disabled) every lookup returns `None`. There is no
//! fallback heuristic.

use std::sync::OnceLock;

use crate::types::TextRange;

/// One segment produced by a word segmenter, in char offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSegment {
    pub start: usize,
    pub end: usize,
    /// Not punctuation or whitespace.
    pub word_like: bool,
}

/// A word segmentation capability.
pub trait WordSegmenter: Send + Sync {
    /// Segments covering all of `text`, in order, as char offsets.
    fn segments(&self, text: &str) -> Vec<WordSegment>;
}

/// UAX #29 word boundaries via `unicode-segmentation`.
#[cfg(feature = "unicode-words")]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeWordSegmenter;

#[cfg(feature = "unicode-words")]
impl WordSegmenter for UnicodeWordSegmenter {
    fn segments(&self, text: &str) -> Vec<WordSegment> {
        use unicode_segmentation::UnicodeSegmentation;

        let mut out = Vec::new();
        let mut char_pos = 0;
        for (_, part) in text.split_word_bound_indices() {
            let len = part.chars().count();
            out.push(WordSegment {
                start: char_pos,
                end: char_pos + len,
                word_like: part.chars().any(char::is_alphanumeric),
            });
            char_pos += len;
        }
        out
    }
}

static DEFAULT_SEGMENTER: OnceLock<Option<&'static dyn WordSegmenter>> = OnceLock::new();

/// The process-wide segmenter, detected on first use.
pub fn default_segmenter() -> Option<&'static dyn WordSegmenter> {
    *DEFAULT_SEGMENTER.get_or_init(detect_segmenter)
}

#[cfg(feature = "unicode-words")]
fn detect_segmenter() -> Option<&'static dyn WordSegmenter> {
    static SEGMENTER: UnicodeWordSegmenter = UnicodeWordSegmenter;
    tracing::trace!("word segmenter available");
    Some(&SEGMENTER)
}

#[cfg(not(feature = "unicode-words"))]
fn detect_segmenter() -> Option<&'static dyn WordSegmenter> {
    tracing::debug!("no word segmenter; word auto-select disabled");
    None
}

/// Finds the word span around an offset inside a block's text.
#[derive(Clone, Copy)]
pub struct WordBoundaryResolver {
    segmenter: Option<&'static dyn WordSegmenter>,
}

impl std::fmt::Debug for WordBoundaryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordBoundaryResolver")
            .field("available", &self.segmenter.is_some())
            .finish()
    }
}

impl Default for WordBoundaryResolver {
    fn default() -> Self {
        Self::with_default()
    }
}

impl WordBoundaryResolver {
    pub fn new(segmenter: Option<&'static dyn WordSegmenter>) -> Self {
        Self { segmenter }
    }

    /// Uses the cached process-wide segmenter.
    pub fn with_default() -> Self {
        Self::new(default_segmenter())
    }

    /// Never finds a word.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_available(&self) -> bool {
        self.segmenter.is_some()
    }

    /// Word span strictly around `offset` (char offset into `text`).
    ///
    /// An offset exactly at a word edge yields `None`, as does a segment
    /// made of punctuation or whitespace.
    pub fn word_at(&self, text: &str, offset: usize) -> Option<TextRange> {
        let segmenter = self.segmenter?;
        segmenter
            .segments(text)
            .into_iter()
            .find(|seg| seg.start <= offset && offset < seg.end)
            .filter(|seg| seg.start < offset && seg.word_like)
            .map(|seg| TextRange::new(seg.start, seg.end))
    }
}

#[cfg(all(test, feature = "unicode-words"))]
mod tests {
    use super::*;

    #[test]
    fn test_word_inside() {
        let words = WordBoundaryResolver::with_default();
        assert_eq!(words.word_at("the cat sat", 5), Some(TextRange::new(4, 7)));
        assert_eq!(words.word_at("the cat sat", 6), Some(TextRange::new(4, 7)));
    }

    #[test]
    fn test_word_edges() {
        let words = WordBoundaryResolver::with_default();
        assert_eq!(words.word_at("the cat sat", 4), None);
        assert_eq!(words.word_at("the cat sat", 7), None);
        assert_eq!(words.word_at("the cat sat", 0), None);
        assert_eq!(words.word_at("the cat sat", 11), None);
    }

    #[test]
    fn test_punctuation_is_not_a_word() {
        let words = WordBoundaryResolver::with_default();
        assert_eq!(words.word_at("wait...what", 5), None);
        assert_eq!(words.word_at("a    b", 3), None);
    }

    #[test]
    fn test_non_ascii_offsets_are_chars() {
        let words = WordBoundaryResolver::with_default();
        assert_eq!(words.word_at("ça va bien", 7), Some(TextRange::new(6, 10)));
    }

    #[test]
    fn test_disabled() {
        let words = WordBoundaryResolver::disabled();
        assert!(!words.is_available());
        assert_eq!(words.word_at("the cat sat", 5), None);
    }
}
