//! Markdown source detectors for the flat-text surface.
//!
//! The flat surface has no node tree, so block constructs are re-derived
//! from lines and inline constructs from the current line's text. All
//! offsets returned here are char offsets; line-relative unless a buffer
//! is involved.

use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;

use crate::context::{ListKind, TableInfo};
use crate::marks::{FormatRange, MarkKind};
use crate::text::TextBuffer;
use crate::types::TextRange;

static HEADING: LazyLock<Regex> = LazyLock::new(|| compile(r"^(#{1,6})\s"));
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^ {0,3}(`{3,}|~{3,})[ \t]*([^`\s]*)"));
static MATH_FENCE: LazyLock<Regex> = LazyLock::new(|| compile(r"^ {0,3}\$\$"));
static TABLE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| compile(r"^\|[\s|:-]+\|?$"));
static TABLE_SEPARATOR_BARE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*:?-+:?\s*(\|\s*:?-+:?\s*)+\|?\s*$"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^([ \t]*)([-*+]|\d{1,9}[.)])(?:[ \t]+|$)(\[[ xX]\](?:\s|$))?"));
static QUOTE_PREFIX: LazyLock<Regex> = LazyLock::new(|| compile(r"^ {0,3}>[ \t]?"));
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"!\[([^\]]*)\]\(([^)\s]*)(?:\s+"[^"]*")?\)"#));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"\[([^\]]*)\]\(([^)\s]*)(?:\s+"[^"]*")?\)"#));
static INLINE_MATH: LazyLock<Regex> = LazyLock::new(|| compile(r"\$([^$\n]+)\$"));
static FOOTNOTE_REF: LazyLock<Regex> = LazyLock::new(|| compile(r"\[\^([^\]\s]+)\]"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid built-in markdown regex")
}

/// Char offset of a byte offset within `s`.
fn char_offset(s: &str, byte: usize) -> usize {
    s[..byte].chars().count()
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(b, _)| b).unwrap_or(s.len())
}

/// Heading level of a line (`^#{1,6}\s`).
pub fn heading_level(line: &str) -> Option<u8> {
    HEADING
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().len() as u8)
}

/// Number of leading `>` markers and the line with them stripped.
pub fn strip_quote_prefixes(line: &str) -> (usize, &str) {
    let mut depth = 0;
    let mut rest = line;
    while let Some(m) = QUOTE_PREFIX.find(rest) {
        depth += 1;
        rest = &rest[m.end()..];
    }
    (depth, rest)
}

/// List marker at the start of a (quote-stripped) line.
pub fn list_marker(line: &str) -> Option<(ListKind, usize)> {
    let caps = LIST_ITEM.captures(line)?;
    let indent = caps
        .get(1)
        .map(|m| m.as_str().chars().map(|c| if c == '\t' { 4 } else { 1 }).sum::<usize>())
        .unwrap_or(0);
    let marker = caps.get(2)?.as_str();
    let kind = if caps.get(3).is_some() {
        ListKind::Task
    } else if marker.starts_with(|c: char| c.is_ascii_digit()) {
        ListKind::Ordered
    } else {
        ListKind::Bullet
    };
    Some((kind, indent / 2))
}

pub fn is_table_separator(line: &str) -> bool {
    let line = line.trim_end();
    line.contains('-')
        && line.contains('|')
        && (TABLE_SEPARATOR.is_match(line) || TABLE_SEPARATOR_BARE.is_match(line))
}

fn table_cells(line: &str) -> usize {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').count()
}

/// Kind of fenced region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenceKind {
    Code { language: Option<SmolStr> },
    Math,
}

/// A fenced region, fence lines included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceRegion {
    pub kind: FenceKind,
    pub start_line: usize,
    pub end_line: usize,
}

enum OpenFence {
    Code {
        start: usize,
        ch: char,
        len: usize,
        language: Option<SmolStr>,
    },
    Math {
        start: usize,
    },
}

/// All fenced code and math regions in the buffer.
///
/// An unclosed fence runs to the end of the document.
pub fn fence_regions<B: TextBuffer + ?Sized>(buffer: &B) -> Vec<FenceRegion> {
    let mut regions = Vec::new();
    let mut open: Option<OpenFence> = None;
    let last_line = buffer.len_lines().saturating_sub(1);

    for line_idx in 0..buffer.len_lines() {
        let Some(line) = buffer.line_text(line_idx) else {
            break;
        };
        match &open {
            None => {
                if let Some(caps) = CODE_FENCE.captures(&line) {
                    let Some(fence) = caps.get(1) else { continue };
                    let fence = fence.as_str();
                    let language = caps
                        .get(2)
                        .map(|m| m.as_str())
                        .filter(|s| !s.is_empty())
                        .map(SmolStr::new);
                    open = Some(OpenFence::Code {
                        start: line_idx,
                        ch: fence.chars().next().unwrap_or('`'),
                        len: fence.chars().count(),
                        language,
                    });
                } else if MATH_FENCE.is_match(&line) {
                    let body = line.trim();
                    if body.len() > 4 && body.ends_with("$$") {
                        // `$$x$$` on one line.
                        regions.push(FenceRegion {
                            kind: FenceKind::Math,
                            start_line: line_idx,
                            end_line: line_idx,
                        });
                    } else {
                        open = Some(OpenFence::Math { start: line_idx });
                    }
                }
            }
            Some(OpenFence::Code {
                start,
                ch,
                len,
                language,
            }) => {
                let trimmed = line.trim();
                let run = trimmed.chars().take_while(|c| c == ch).count();
                if run >= *len && run == trimmed.chars().count() {
                    regions.push(FenceRegion {
                        kind: FenceKind::Code {
                            language: language.clone(),
                        },
                        start_line: *start,
                        end_line: line_idx,
                    });
                    open = None;
                }
            }
            Some(OpenFence::Math { start }) => {
                if line.trim_end().ends_with("$$") {
                    regions.push(FenceRegion {
                        kind: FenceKind::Math,
                        start_line: *start,
                        end_line: line_idx,
                    });
                    open = None;
                }
            }
        }
    }

    match open {
        Some(OpenFence::Code {
            start, language, ..
        }) => regions.push(FenceRegion {
            kind: FenceKind::Code { language },
            start_line: start,
            end_line: last_line,
        }),
        Some(OpenFence::Math { start }) => regions.push(FenceRegion {
            kind: FenceKind::Math,
            start_line: start,
            end_line: last_line,
        }),
        None => {}
    }

    regions
}

/// Table containing `line`, with the cursor's cell coordinates.
///
/// The header is the nearest pipe line at or above the cursor that is
/// directly followed by a separator row. The table runs from the header down
/// to the first line without a pipe. Pipe lines above the header are prose.
pub fn table_at<B: TextBuffer + ?Sized>(
    buffer: &B,
    line: usize,
    column: usize,
) -> Option<TableInfo> {
    let is_row = |idx: usize| {
        buffer
            .line_text(idx)
            .map(|text| text.contains('|') && !text.trim().is_empty())
            .unwrap_or(false)
    };
    let is_separator = |idx: usize| {
        buffer
            .line_text(idx)
            .map(|text| is_table_separator(&text))
            .unwrap_or(false)
    };
    if !is_row(line) {
        return None;
    }

    let mut header = line;
    loop {
        if header + 1 < buffer.len_lines() && is_separator(header + 1) && !is_separator(header) {
            break;
        }
        if header == 0 || !is_row(header - 1) {
            return None;
        }
        header -= 1;
    }
    let separator = header + 1;
    let mut bottom = separator.max(line);
    while bottom + 1 < buffer.len_lines() && is_row(bottom + 1) {
        bottom += 1;
    }
    let separator_text = buffer.line_text(separator)?;

    let columns = table_cells(&separator_text);
    let cursor_text = buffer.line_text(line)?;
    let before = &cursor_text[..byte_offset(&cursor_text, column)];
    let pipes_before = before.matches('|').count();
    let leading_pipe = cursor_text.trim_start().starts_with('|');
    let cell = if leading_pipe {
        pipes_before.saturating_sub(1)
    } else {
        pipes_before
    };

    let row = if line > separator {
        line - header - 1
    } else {
        0
    };

    Some(TableInfo {
        from: buffer.line_to_char(header)?,
        to: buffer.line_range(bottom)?.end,
        row,
        column: cell.min(columns.saturating_sub(1)),
        rows: bottom - header,
        columns,
    })
}

/// An inline element found on a line, in line-relative char offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMatch {
    pub range: TextRange,
    /// Link text, image alt, math content or footnote label.
    pub inner: TextRange,
    pub inner_text: SmolStr,
    /// Link href or image src.
    pub target: SmolStr,
}

fn matches_of(re: &Regex, line: &str, skip_after_bang: bool) -> Vec<InlineMatch> {
    re.captures_iter(line)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if skip_after_bang && line[..whole.start()].ends_with('!') {
                return None;
            }
            let inner = caps.get(1)?;
            let target = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            Some(InlineMatch {
                range: TextRange::new(
                    char_offset(line, whole.start()),
                    char_offset(line, whole.end()),
                ),
                inner: TextRange::new(
                    char_offset(line, inner.start()),
                    char_offset(line, inner.end()),
                ),
                inner_text: SmolStr::new(inner.as_str()),
                target: SmolStr::new(target),
            })
        })
        .collect()
}

pub fn images(line: &str) -> Vec<InlineMatch> {
    matches_of(&IMAGE, line, false)
}

/// Links, excluding image syntax (a link preceded by `!`).
pub fn links(line: &str) -> Vec<InlineMatch> {
    matches_of(&LINK, line, true)
}

pub fn inline_math(line: &str) -> Vec<InlineMatch> {
    matches_of(&INLINE_MATH, line, false)
}

pub fn footnote_refs(line: &str) -> Vec<InlineMatch> {
    matches_of(&FOOTNOTE_REF, line, false)
}

/// A run of identical delimiter chars.
#[derive(Debug, Clone, Copy)]
struct DelimRun {
    ch: char,
    start: usize,
    len: usize,
    can_open: bool,
    can_close: bool,
}

fn delimiter_kinds(ch: char, len: usize) -> &'static [MarkKind] {
    match (ch, len) {
        ('*' | '_', 1) => &[MarkKind::Emphasis],
        ('*' | '_', 2) => &[MarkKind::Strong],
        ('*' | '_', 3) => &[MarkKind::Strong, MarkKind::Emphasis],
        ('~', 1) => &[MarkKind::Subscript],
        ('~', 2) => &[MarkKind::Strike],
        ('=', 2) => &[MarkKind::Highlight],
        ('+', 2) => &[MarkKind::Underline],
        ('^', 1) => &[MarkKind::Superscript],
        _ => &[],
    }
}

/// Code spans of a line: `(outer, content)` pairs.
fn code_spans(chars: &[char]) -> Vec<(TextRange, TextRange)> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '`' {
            i += 1;
            continue;
        }
        let open = i;
        while i < chars.len() && chars[i] == '`' {
            i += 1;
        }
        let len = i - open;
        // Look for a closing run of exactly the same length.
        let mut j = i;
        let mut closed = None;
        while j < chars.len() {
            if chars[j] != '`' {
                j += 1;
                continue;
            }
            let run_start = j;
            while j < chars.len() && chars[j] == '`' {
                j += 1;
            }
            if j - run_start == len {
                closed = Some(run_start);
                break;
            }
        }
        if let Some(close) = closed {
            spans.push((
                TextRange::new(open, close + len),
                TextRange::new(open + len, close),
            ));
            i = close + len;
        }
    }
    spans
}

/// Delimited format ranges on a line, in line-relative char offsets.
///
/// Code spans, link/image targets and inline math are raw zones: no
/// delimiter inside them counts.
pub fn format_ranges(line: &str) -> Vec<FormatRange> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = Vec::new();
    let mut raw: Vec<TextRange> = Vec::new();

    for (outer, content) in code_spans(&chars) {
        out.push(FormatRange {
            kind: MarkKind::Code,
            from: outer.from,
            to: outer.to,
            content_from: content.from,
            content_to: content.to,
        });
        raw.push(outer);
    }
    for m in images(line).into_iter().chain(links(line)) {
        // Only the target part is raw; link text may carry formatting.
        raw.push(TextRange::new(m.inner.to, m.range.to));
    }
    for m in inline_math(line).into_iter().chain(footnote_refs(line)) {
        raw.push(m.range);
    }
    let is_raw = |pos: usize| raw.iter().any(|r| r.from <= pos && pos < r.to);

    let mut runs = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if !matches!(ch, '*' | '_' | '~' | '=' | '+' | '^') || is_raw(i) {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i] == ch && !is_raw(i) {
            i += 1;
        }
        let before = start.checked_sub(1).map(|p| chars[p]);
        let after = chars.get(i).copied();
        let mut can_open = after.is_some_and(|c| !c.is_whitespace());
        let mut can_close = before.is_some_and(|c| !c.is_whitespace());
        if ch == '_' {
            // No intraword underscore emphasis.
            can_open &= !before.is_some_and(char::is_alphanumeric);
            can_close &= !after.is_some_and(char::is_alphanumeric);
        }
        runs.push(DelimRun {
            ch,
            start,
            len: i - start,
            can_open,
            can_close,
        });
    }

    let mut openers: Vec<DelimRun> = Vec::new();
    for run in runs {
        let kinds = delimiter_kinds(run.ch, run.len);
        if kinds.is_empty() {
            continue;
        }
        if run.can_close {
            if let Some(idx) = openers
                .iter()
                .rposition(|o| o.ch == run.ch && o.len == run.len)
            {
                let opener = openers[idx];
                openers.truncate(idx);
                let (from, to) = (opener.start, run.start + run.len);
                let mut inset = 0;
                for kind in kinds {
                    let width = kind.delimiter_len();
                    out.push(FormatRange {
                        kind: *kind,
                        from: from + inset,
                        to: to - inset,
                        content_from: from + inset + width,
                        content_to: to - inset - width,
                    });
                    inset += width;
                }
                continue;
            }
        }
        if run.can_open {
            openers.push(run);
        }
    }

    out.retain(FormatRange::is_valid);
    out
}
