//! The per-surface popup state slot.

use serde::Serialize;

use crate::classify::{Intent, IntentKind, PopupMode};

/// Which popup is open, its payload and any pending cursor restore.
///
/// One per editing surface. Opening while open always goes through the
/// classifier's toggle-close branch first, so there is never more than one
/// popup.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolbarState {
    pub is_open: bool,
    pub mode: Option<PopupMode>,
    pub payload: Option<IntentKind>,
    pub original_cursor_pos: Option<usize>,
}

impl ToolbarState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an opened popup. Skips are ignored.
    pub fn open(&mut self, intent: &Intent) {
        let Some(mode) = intent.kind.mode() else {
            return;
        };
        self.is_open = true;
        self.mode = Some(mode);
        self.payload = Some(intent.kind.clone());
        self.original_cursor_pos = if intent.auto_selected {
            intent.original_cursor_pos
        } else {
            None
        };
    }

    /// Reset, returning the cursor position still owed a restore.
    pub fn clear(&mut self) -> Option<usize> {
        let restore = self.original_cursor_pos.take();
        *self = Self::default();
        restore
    }

    /// An edit was committed while open: closing no longer restores.
    pub fn mark_edited(&mut self) {
        self.original_cursor_pos = None;
    }
}
