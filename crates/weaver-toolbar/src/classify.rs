//! Context classification: one [`CursorContext`] in, one [`Intent`] out.
//!
//! `classify` is a pure priority list. Each step validates the payload it
//! needs and falls through on anything inconsistent, so a half-populated
//! context never opens a broken popup.

use serde::Serialize;
use smol_str::SmolStr;
use tracing::debug;

use crate::context::{BlockquoteInfo, ContextMode, CursorContext, ListInfo, TableInfo};
use crate::state::ToolbarState;
use crate::types::TextRange;

/// Which popup an intent opens, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PopupMode {
    Code,
    MathBlock,
    Table,
    List,
    Blockquote,
    Format,
    Link,
    Image,
    Heading,
    Footnote,
    Insert,
}

/// The decided outcome, with the payload its popup needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum IntentKind {
    Code {
        language: Option<SmolStr>,
        pos: usize,
    },
    MathBlock {
        from: usize,
        to: usize,
    },
    /// Table controls merged with format controls for `selection`.
    Table {
        table: TableInfo,
        selection: Option<TextRange>,
    },
    List(ListInfo),
    Blockquote(BlockquoteInfo),
    Format {
        from: usize,
        to: usize,
    },
    /// Edit-link popup (click path only).
    Link {
        href: SmolStr,
        from: usize,
        to: usize,
    },
    /// Image popup (click path only).
    Image {
        src: SmolStr,
        alt: SmolStr,
        from: usize,
        to: usize,
    },
    /// Level 0 means "convert this paragraph".
    Heading {
        level: u8,
        from: usize,
        to: usize,
    },
    Footnote {
        label: SmolStr,
        from: usize,
        to: usize,
    },
    Insert {
        mode: ContextMode,
    },
    /// Nothing to open. `close` is set when an open popup is being toggled
    /// shut, `restore_to` when that close owes a cursor restore.
    Skip {
        close: bool,
        restore_to: Option<usize>,
    },
}

impl IntentKind {
    pub fn mode(&self) -> Option<PopupMode> {
        Some(match self {
            IntentKind::Code { .. } => PopupMode::Code,
            IntentKind::MathBlock { .. } => PopupMode::MathBlock,
            IntentKind::Table { .. } => PopupMode::Table,
            IntentKind::List(_) => PopupMode::List,
            IntentKind::Blockquote(_) => PopupMode::Blockquote,
            IntentKind::Format { .. } => PopupMode::Format,
            IntentKind::Link { .. } => PopupMode::Link,
            IntentKind::Image { .. } => PopupMode::Image,
            IntentKind::Heading { .. } => PopupMode::Heading,
            IntentKind::Footnote { .. } => PopupMode::Footnote,
            IntentKind::Insert { .. } => PopupMode::Insert,
            IntentKind::Skip { .. } => return None,
        })
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, IntentKind::Skip { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    pub kind: IntentKind,
    /// The selection was moved to an implicit target.
    pub auto_selected: bool,
    /// Cursor before the auto-select, restored on cancel.
    pub original_cursor_pos: Option<usize>,
    /// Selection the router must apply before opening.
    pub select: Option<TextRange>,
}

impl Intent {
    /// Opens as-is, no selection change.
    pub fn open(kind: IntentKind) -> Self {
        Self {
            kind,
            auto_selected: false,
            original_cursor_pos: None,
            select: None,
        }
    }

    /// Selects `target` first and remembers `cursor` for the restore.
    pub fn auto_select(kind: IntentKind, target: TextRange, cursor: usize) -> Self {
        Self {
            kind,
            auto_selected: true,
            original_cursor_pos: Some(cursor),
            select: Some(target),
        }
    }

    pub fn skip() -> Self {
        Self::open(IntentKind::Skip {
            close: false,
            restore_to: None,
        })
    }
}

/// Sub-range strictly usable for an auto-select inside `outer`.
fn inner_target(outer: TextRange, inner: TextRange) -> Option<TextRange> {
    (outer.is_valid() && inner.is_valid() && !inner.is_empty() && outer.covers(inner))
        .then_some(inner)
}

// === Block constructs ===

fn step_code(ctx: &CursorContext) -> Option<Intent> {
    let code = ctx.in_code_block()?;
    let range = TextRange::new(code.from, code.to);
    if !range.is_valid() || !(code.from..=code.to).contains(&ctx.cursor()) {
        return None;
    }
    Some(Intent::open(IntentKind::Code {
        language: code.language.clone(),
        pos: ctx.cursor(),
    }))
}

fn step_math_block(ctx: &CursorContext) -> Option<Intent> {
    let math = ctx.in_block_math()?;
    (math.from <= math.to).then(|| {
        Intent::open(IntentKind::MathBlock {
            from: math.from,
            to: math.to,
        })
    })
}

fn step_table(ctx: &CursorContext) -> Option<Intent> {
    let table = ctx.in_table()?;
    let shaped = table.rows > 0
        && table.columns > 0
        && table.row < table.rows
        && table.column < table.columns
        && table.from <= table.to;
    if !shaped {
        return None;
    }
    let selection = ctx.has_selection.then(|| ctx.selection_range());
    Some(Intent::open(IntentKind::Table {
        table: table.clone(),
        selection,
    }))
}

fn step_list(ctx: &CursorContext) -> Option<Intent> {
    let list = ctx.in_list()?;
    (list.from <= list.to).then(|| Intent::open(IntentKind::List(list.clone())))
}

fn step_blockquote(ctx: &CursorContext) -> Option<Intent> {
    let quote = ctx.in_blockquote()?;
    (quote.from <= quote.to && quote.depth > 0)
        .then(|| Intent::open(IntentKind::Blockquote(quote.clone())))
}

// === Selection and inline inference ===

fn step_selection(ctx: &CursorContext) -> Option<Intent> {
    let range = ctx.selection_range();
    (ctx.has_selection && range.from < range.to).then(|| {
        Intent::open(IntentKind::Format {
            from: range.from,
            to: range.to,
        })
    })
}

fn format_at(target: TextRange, cursor: usize) -> Intent {
    Intent::auto_select(
        IntentKind::Format {
            from: target.from,
            to: target.to,
        },
        target,
        cursor,
    )
}

fn step_innermost_format(ctx: &CursorContext) -> Option<Intent> {
    let format = ctx.innermost_format.as_ref()?;
    if !format.is_valid() || !format.contains_content(ctx.cursor()) {
        return None;
    }
    Some(format_at(format.content(), ctx.cursor()))
}

fn step_image(ctx: &CursorContext) -> Option<Intent> {
    // Images own a click-triggered popup.
    ctx.in_image.as_ref().map(|_| Intent::skip())
}

fn step_footnote(ctx: &CursorContext) -> Option<Intent> {
    let note = ctx.in_footnote.as_ref()?;
    let target = inner_target(
        TextRange::new(note.from, note.to),
        TextRange::new(note.label_from, note.label_to),
    )?;
    Some(Intent::auto_select(
        IntentKind::Footnote {
            label: note.label.clone(),
            from: target.from,
            to: target.to,
        },
        target,
        ctx.cursor(),
    ))
}

fn step_link(ctx: &CursorContext) -> Option<Intent> {
    let link = ctx.in_link.as_ref()?;
    let target = inner_target(
        TextRange::new(link.from, link.to),
        TextRange::new(link.text_from, link.text_to),
    )?;
    Some(format_at(target, ctx.cursor()))
}

fn step_inline_math(ctx: &CursorContext) -> Option<Intent> {
    let math = ctx.in_inline_math.as_ref()?;
    let target = inner_target(
        TextRange::new(math.from, math.to),
        TextRange::new(math.content_from, math.content_to),
    )?;
    Some(format_at(target, ctx.cursor()))
}

fn step_heading(ctx: &CursorContext) -> Option<Intent> {
    let heading = ctx.in_heading.as_ref()?;
    ((1..=6).contains(&heading.level) && heading.from <= heading.to).then(|| {
        Intent::open(IntentKind::Heading {
            level: heading.level,
            from: heading.from,
            to: heading.to,
        })
    })
}

fn step_line_start(ctx: &CursorContext) -> Option<Intent> {
    ctx.at_line_start.then(|| {
        Intent::open(IntentKind::Heading {
            level: 0,
            from: ctx.cursor(),
            to: ctx.cursor(),
        })
    })
}

fn step_word(ctx: &CursorContext) -> Option<Intent> {
    let word = ctx.in_word?;
    (word.is_valid() && word.strictly_contains(ctx.cursor()))
        .then(|| format_at(word, ctx.cursor()))
}

fn fallback(ctx: &CursorContext) -> Intent {
    let mode = match ctx.context_mode {
        ContextMode::InsertBlock => ContextMode::InsertBlock,
        _ => ContextMode::Insert,
    };
    Intent::open(IntentKind::Insert { mode })
}

const STEPS: &[fn(&CursorContext) -> Option<Intent>] = &[
    step_code,
    step_math_block,
    step_table,
    step_list,
    step_blockquote,
    step_selection,
    step_innermost_format,
    step_image,
    step_footnote,
    step_link,
    step_inline_math,
    step_heading,
    step_line_start,
    step_word,
];

/// Decide what the toolbar trigger should do. First match wins.
pub fn classify(ctx: &CursorContext, state: &ToolbarState) -> Intent {
    if state.is_open {
        debug!(restore_to = ?state.original_cursor_pos, "toolbar open, toggling closed");
        return Intent::open(IntentKind::Skip {
            close: true,
            restore_to: state.original_cursor_pos,
        });
    }

    let intent = STEPS
        .iter()
        .find_map(|step| step(ctx))
        .unwrap_or_else(|| fallback(ctx));
    debug!(
        mode = ?intent.kind.mode(),
        auto_selected = intent.auto_selected,
        from = ctx.selection_from,
        to = ctx.selection_to,
        "classified"
    );
    intent
}

/// Click path: images and links open their own edit popups.
pub fn classify_click(ctx: &CursorContext) -> Option<Intent> {
    if let Some(image) = &ctx.in_image {
        return Some(Intent::open(IntentKind::Image {
            src: image.src.clone(),
            alt: image.alt.clone(),
            from: image.from,
            to: image.to,
        }));
    }
    let link = ctx.in_link.as_ref()?;
    Some(Intent::open(IntentKind::Link {
        href: link.href.clone(),
        from: link.from,
        to: link.to,
    }))
}
