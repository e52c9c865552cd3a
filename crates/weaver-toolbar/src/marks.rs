//! Inline marks and contiguous mark-range resolution.
//!
//! A block's inline content is seen as an ordered sequence of [`TextRun`]s,
//! each carrying the set of marks active on it. The resolvers here find the
//! maximal contiguous span of a mark that contains a position.
//!
//! Membership is exclusive: a position exactly at a span's `from` or `to` is
//! not inside it.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::types::TextRange;

/// Kind of inline formatting, without attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkKind {
    Strong,
    Emphasis,
    Strike,
    Code,
    Underline,
    Highlight,
    Subscript,
    Superscript,
    Link,
}

impl MarkKind {
    /// Width in chars of each delimiter on the flat-text surface.
    ///
    /// Links have no symmetric delimiter; they are resolved as inline
    /// elements instead.
    pub fn delimiter_len(self) -> usize {
        match self {
            MarkKind::Strong
            | MarkKind::Strike
            | MarkKind::Underline
            | MarkKind::Highlight => 2,
            MarkKind::Emphasis
            | MarkKind::Code
            | MarkKind::Subscript
            | MarkKind::Superscript => 1,
            MarkKind::Link => 0,
        }
    }
}

/// An inline mark with its attributes.
///
/// Equality includes attributes: two links with different targets are
/// different marks, so adjacent links never merge into one range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Mark {
    Strong,
    Emphasis,
    Strike,
    Code,
    Underline,
    Highlight,
    Subscript,
    Superscript,
    Link { href: SmolStr },
}

impl Mark {
    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Strong => MarkKind::Strong,
            Mark::Emphasis => MarkKind::Emphasis,
            Mark::Strike => MarkKind::Strike,
            Mark::Code => MarkKind::Code,
            Mark::Underline => MarkKind::Underline,
            Mark::Highlight => MarkKind::Highlight,
            Mark::Subscript => MarkKind::Subscript,
            Mark::Superscript => MarkKind::Superscript,
            Mark::Link { .. } => MarkKind::Link,
        }
    }

    pub fn link(href: impl Into<SmolStr>) -> Self {
        Mark::Link { href: href.into() }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Mark::Link { .. })
    }
}

/// A run of inline content with a uniform mark set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub from: usize,
    pub to: usize,
    pub marks: Vec<Mark>,
}

impl TextRun {
    pub fn new(from: usize, to: usize, marks: Vec<Mark>) -> Self {
        Self { from, to, marks }
    }

    pub fn has(&self, mark: &Mark) -> bool {
        self.marks.contains(mark)
    }
}

/// A formatted span, with and without its delimiters.
///
/// Invariant: `from <= content_from <= content_to <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRange {
    pub kind: MarkKind,
    pub from: usize,
    pub to: usize,
    pub content_from: usize,
    pub content_to: usize,
}

impl FormatRange {
    /// A range whose delimiters are invisible (structured surface).
    pub fn bare(kind: MarkKind, range: TextRange) -> Self {
        Self {
            kind,
            from: range.from,
            to: range.to,
            content_from: range.from,
            content_to: range.to,
        }
    }

    /// A range with `delimiter_len()` chars of syntax on each side.
    pub fn delimited(kind: MarkKind, from: usize, to: usize) -> Self {
        let width = kind.delimiter_len();
        Self {
            kind,
            from,
            to,
            content_from: from + width,
            content_to: to.saturating_sub(width),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.from <= self.content_from
            && self.content_from <= self.content_to
            && self.content_to <= self.to
    }

    pub fn span(&self) -> usize {
        self.to - self.from
    }

    pub fn range(&self) -> TextRange {
        TextRange::new(self.from, self.to)
    }

    pub fn content(&self) -> TextRange {
        TextRange::new(self.content_from, self.content_to)
    }

    /// Strictly inside the content: delimiter edges are excluded.
    pub fn contains_content(&self, pos: usize) -> bool {
        self.content_from < pos && pos < self.content_to
    }
}

/// Result of the "any mark" resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyMarkRange {
    pub range: TextRange,
    pub mark: Mark,
    pub is_link: bool,
}

/// Maximal contiguous range of `mark` containing `pos`.
///
/// Single left-to-right pass over the runs: accumulate while the mark is
/// present, and on a gap check whether the closed range held the position.
pub fn resolve_mark_range(pos: usize, runs: &[TextRun], mark: &Mark) -> Option<TextRange> {
    let mut acc: Option<TextRange> = None;

    for run in runs {
        if run.has(mark) {
            acc = Some(match acc {
                Some(open) if open.to == run.from => TextRange::new(open.from, run.to),
                Some(open) => {
                    // Runs are not adjacent: the open range is closed here.
                    if open.strictly_contains(pos) {
                        return Some(open);
                    }
                    TextRange::new(run.from, run.to)
                }
                None => TextRange::new(run.from, run.to),
            });
        } else if let Some(open) = acc.take() {
            if open.strictly_contains(pos) {
                return Some(open);
            }
            if open.from > pos {
                return None;
            }
        }
    }

    acc.filter(|open| open.strictly_contains(pos))
}

/// Smallest mark range containing `pos`, over every mark on the run(s)
/// touching the position.
///
/// Ties keep the first mark found, in run order.
pub fn resolve_any_mark_range(pos: usize, runs: &[TextRun]) -> Option<AnyMarkRange> {
    resolve_any_mark_range_where(pos, runs, |_| true)
}

/// [`resolve_any_mark_range`] restricted to marks accepted by `filter`.
pub fn resolve_any_mark_range_where(
    pos: usize,
    runs: &[TextRun],
    filter: impl Fn(&Mark) -> bool,
) -> Option<AnyMarkRange> {
    let mut best: Option<AnyMarkRange> = None;

    for mark in candidate_marks(pos, runs) {
        if !filter(mark) {
            continue;
        }
        let Some(range) = resolve_mark_range(pos, runs, mark) else {
            continue;
        };
        let smaller = best
            .as_ref()
            .map(|current| range.len() < current.range.len())
            .unwrap_or(true);
        if smaller {
            best = Some(AnyMarkRange {
                range,
                mark: mark.clone(),
                is_link: mark.is_link(),
            });
        }
    }

    best
}

/// All distinct marks on the runs whose span touches `pos`.
fn candidate_marks(pos: usize, runs: &[TextRun]) -> Vec<&Mark> {
    let mut marks: Vec<&Mark> = Vec::new();
    for run in runs.iter().filter(|r| r.from <= pos && pos <= r.to) {
        for mark in &run.marks {
            if !marks.contains(&mark) {
                marks.push(mark);
            }
        }
    }
    marks
}

/// The contiguous range of `mark` that covers all of `[from, to)`.
///
/// Used for non-empty selections, where the strict interior rule would
/// reject a selection starting exactly at the mark edge.
pub fn mark_range_covering(
    runs: &[TextRun],
    from: usize,
    to: usize,
    mark: &Mark,
) -> Option<TextRange> {
    let target = TextRange::new(from, to);
    let mut acc: Option<TextRange> = None;

    for run in runs {
        if run.has(mark) {
            acc = match acc {
                Some(open) if open.to == run.from => Some(TextRange::new(open.from, run.to)),
                Some(open) if open.covers(target) => return Some(open),
                _ => Some(TextRange::new(run.from, run.to)),
            };
        } else if let Some(open) = acc.take() {
            if open.covers(target) {
                return Some(open);
            }
        }
    }

    acc.filter(|open| open.covers(target))
}

/// Marks present on every run overlapping `[from, to)`.
pub fn marks_across(runs: &[TextRun], from: usize, to: usize) -> Vec<Mark> {
    let mut overlapping = runs
        .iter()
        .filter(|r| r.from < to && from < r.to && r.from < r.to);
    let Some(first) = overlapping.next() else {
        return Vec::new();
    };
    let mut common = first.marks.clone();
    for run in overlapping {
        common.retain(|m| run.has(m));
    }
    common
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(from: usize, to: usize, marks: &[Mark]) -> TextRun {
        TextRun::new(from, to, marks.to_vec())
    }

    /// "plain " + strong("bold " + em("both")) + " tail"
    fn sample_runs() -> Vec<TextRun> {
        vec![
            run(0, 6, &[]),
            run(6, 11, &[Mark::Strong]),
            run(11, 15, &[Mark::Strong, Mark::Emphasis]),
            run(15, 20, &[]),
        ]
    }

    #[test]
    fn test_maximal_range_across_runs() {
        let runs = sample_runs();
        assert_eq!(
            resolve_mark_range(8, &runs, &Mark::Strong),
            Some(TextRange::new(6, 15))
        );
        assert_eq!(
            resolve_mark_range(12, &runs, &Mark::Strong),
            Some(TextRange::new(6, 15))
        );
    }

    #[test]
    fn test_idempotent_inside_range() {
        let runs = sample_runs();
        let first = resolve_mark_range(7, &runs, &Mark::Strong).unwrap();
        for pos in first.from + 1..first.to {
            assert_eq!(resolve_mark_range(pos, &runs, &Mark::Strong), Some(first));
        }
    }

    #[test]
    fn test_edges_are_exclusive() {
        let runs = sample_runs();
        assert_eq!(resolve_mark_range(6, &runs, &Mark::Strong), None);
        assert_eq!(resolve_mark_range(15, &runs, &Mark::Strong), None);
        assert_eq!(resolve_mark_range(3, &runs, &Mark::Strong), None);
    }

    #[test]
    fn test_second_occurrence() {
        let runs = vec![
            run(0, 3, &[Mark::Code]),
            run(3, 5, &[]),
            run(5, 9, &[Mark::Code]),
        ];
        assert_eq!(
            resolve_mark_range(7, &runs, &Mark::Code),
            Some(TextRange::new(5, 9))
        );
        assert_eq!(
            resolve_mark_range(1, &runs, &Mark::Code),
            Some(TextRange::new(0, 3))
        );
    }

    #[test]
    fn test_any_prefers_smallest() {
        let runs = sample_runs();
        let any = resolve_any_mark_range(13, &runs).unwrap();
        assert_eq!(any.mark, Mark::Emphasis);
        assert_eq!(any.range, TextRange::new(11, 15));
        assert!(!any.is_link);

        let any = resolve_any_mark_range(8, &runs).unwrap();
        assert_eq!(any.mark, Mark::Strong);
    }

    #[test]
    fn test_any_marks_links() {
        let runs = vec![
            run(0, 4, &[]),
            run(4, 9, &[Mark::link("https://a.example")]),
            run(9, 12, &[]),
        ];
        let any = resolve_any_mark_range(6, &runs).unwrap();
        assert!(any.is_link);
        assert_eq!(any.range, TextRange::new(4, 9));

        assert!(resolve_any_mark_range_where(6, &runs, |m| !m.is_link()).is_none());
    }

    #[test]
    fn test_adjacent_links_do_not_merge() {
        let runs = vec![
            run(0, 4, &[Mark::link("a")]),
            run(4, 8, &[Mark::link("b")]),
        ];
        assert_eq!(
            resolve_mark_range(2, &runs, &Mark::link("a")),
            Some(TextRange::new(0, 4))
        );
        assert_eq!(
            resolve_mark_range(6, &runs, &Mark::link("b")),
            Some(TextRange::new(4, 8))
        );
    }

    #[test]
    fn test_covering_selection_at_edge() {
        let runs = sample_runs();
        assert_eq!(
            mark_range_covering(&runs, 6, 15, &Mark::Strong),
            Some(TextRange::new(6, 15))
        );
        assert_eq!(
            mark_range_covering(&runs, 6, 9, &Mark::Strong),
            Some(TextRange::new(6, 15))
        );
        assert_eq!(mark_range_covering(&runs, 4, 9, &Mark::Strong), None);
    }

    #[test]
    fn test_marks_across_selection() {
        let runs = sample_runs();
        assert_eq!(marks_across(&runs, 7, 14), vec![Mark::Strong]);
        assert_eq!(
            marks_across(&runs, 12, 14),
            vec![Mark::Strong, Mark::Emphasis]
        );
        assert!(marks_across(&runs, 2, 8).is_empty());
    }

    #[test]
    fn test_delimited_content() {
        let range = FormatRange::delimited(MarkKind::Strong, 0, 8);
        assert_eq!(range.content(), TextRange::new(2, 6));
        assert!(range.is_valid());
        assert!(!range.contains_content(2));
        assert!(range.contains_content(3));
        assert!(!range.contains_content(6));
    }
}
