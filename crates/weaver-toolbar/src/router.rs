//! Trigger routing: classification in, selection mutation and popup effects
//! out.
//!
//! The router is the only place that acts on an [`Intent`]. It always asks
//! the surface for a fresh context before deciding, applies any auto-select,
//! then opens or closes the popup and records the result in [`ToolbarState`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::actions::ActionId;
use crate::classify::{Intent, IntentKind, PopupMode, classify, classify_click};
use crate::composition::CompositionGuard;
use crate::config::ToolbarConfig;
use crate::context::CursorContext;
use crate::retry::retry_fixed;
use crate::rules::{ButtonQuery, ButtonState, Capabilities, get_toolbar_button_state};
use crate::state::ToolbarState;
use crate::surface::SurfaceAdapter;
use crate::types::Selection;

/// Host popup store.
pub trait PopupApi {
    fn open(&mut self, intent: &IntentKind);
    fn close(&mut self);
    fn is_open(&self) -> bool;
    fn mode(&self) -> Option<PopupMode>;
}

/// Work held back while a composition is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    Trigger,
    Select(Selection),
}

/// Held for the duration of one router operation.
///
/// Releases the busy flag on drop, so early returns cannot leave it set.
struct OperationToken(Rc<Cell<bool>>);

impl OperationToken {
    fn acquire(busy: &Rc<Cell<bool>>) -> Option<Self> {
        if busy.replace(true) {
            return None;
        }
        Some(Self(busy.clone()))
    }
}

impl Drop for OperationToken {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct ToolbarRouter<P> {
    popup: P,
    state: ToolbarState,
    guard: CompositionGuard<Deferred>,
    config: ToolbarConfig,
    capabilities: Capabilities,
    busy: Rc<Cell<bool>>,
}

impl<P: PopupApi> ToolbarRouter<P> {
    pub fn new(popup: P, config: ToolbarConfig) -> Self {
        let capabilities = config.capabilities();
        Self {
            popup,
            state: ToolbarState::new(),
            guard: CompositionGuard::new(),
            config,
            capabilities,
            busy: Rc::new(Cell::new(false)),
        }
    }

    pub fn popup(&self) -> &P {
        &self.popup
    }

    pub fn popup_mut(&mut self) -> &mut P {
        &mut self.popup
    }

    pub fn state(&self) -> &ToolbarState {
        &self.state
    }

    pub fn config(&self) -> &ToolbarConfig {
        &self.config
    }

    pub fn is_composing(&self) -> bool {
        self.guard.is_composing()
    }

    /// Handle the toolbar shortcut.
    ///
    /// Returns true when a popup was opened or closed.
    pub fn trigger(&mut self, surface: &mut dyn SurfaceAdapter) -> bool {
        let Some(_token) = OperationToken::acquire(&self.busy) else {
            debug!("trigger ignored, operation in progress");
            return false;
        };
        self.trigger_inner(surface)
    }

    /// Trigger once the surface reports mounted, polling with the configured
    /// fixed-delay retry.
    pub fn trigger_when_mounted(
        &mut self,
        surface: &mut dyn SurfaceAdapter,
        sleep: impl FnMut(Duration),
    ) -> bool {
        let policy = self.config.retry;
        if retry_fixed(&policy, || surface.is_mounted().then_some(()), sleep).is_none() {
            return false;
        }
        self.trigger(surface)
    }

    /// Click on an inline element. Opens the image or link popup, replacing
    /// whatever was open.
    pub fn click(&mut self, surface: &mut dyn SurfaceAdapter) -> bool {
        let Some(_token) = OperationToken::acquire(&self.busy) else {
            return false;
        };
        if !surface.is_mounted() {
            return false;
        }
        if self.guard.is_composing() {
            debug!("click ignored during composition");
            return false;
        }
        let Some(intent) = classify_click(&surface.context()) else {
            return false;
        };
        if self.state.is_open {
            // The click already placed the caret.
            self.popup.close();
            self.state.clear();
        }
        self.open(surface, intent)
    }

    /// Close the popup, restoring the cursor if the open auto-selected and
    /// nothing was edited since. Returns whether a popup was open.
    pub fn close(&mut self, surface: &mut dyn SurfaceAdapter) -> bool {
        let Some(_token) = OperationToken::acquire(&self.busy) else {
            return false;
        };
        self.close_inner(surface)
    }

    /// An edit was committed while the popup is open.
    pub fn note_document_changed(&mut self) {
        if self.state.is_open {
            self.state.mark_edited();
        }
    }

    pub fn composition_start(&mut self, offset: usize, text: impl Into<String>) {
        self.guard.start(offset, text);
    }

    pub fn composition_update(&mut self, text: impl Into<String>) {
        self.guard.update(text);
    }

    /// Commit the composition, clean up a duplicated echo, then replay
    /// deferred work in order.
    pub fn composition_end(
        &mut self,
        surface: &mut dyn SurfaceAdapter,
        committed: &str,
        echo_end: usize,
    ) {
        let flush = self
            .guard
            .end(surface.text_buffer_mut(), committed, echo_end);
        if flush.trimmed > 0 {
            let selection = flush.map_selection(surface.selection());
            if let Err(err) = surface.set_selection(selection) {
                debug!(%err, "caret not shifted after echo cleanup");
            }
            self.state.original_cursor_pos =
                self.state.original_cursor_pos.map(|pos| flush.map_pos(pos));
        }
        let actions = flush
            .actions
            .iter()
            .map(|action| match *action {
                Deferred::Select(selection) => Deferred::Select(flush.map_selection(selection)),
                Deferred::Trigger => Deferred::Trigger,
            })
            .collect();
        self.replay(surface, actions);
    }

    /// Focus lost mid-composition: replay without cleanup.
    pub fn composition_blur(&mut self, surface: &mut dyn SurfaceAdapter) {
        let actions = self.guard.blur();
        self.replay(surface, actions);
    }

    /// Button state for the rendered toolbar.
    ///
    /// `ctx` may come from a cache; it is only used for gating.
    pub fn button_state(
        &self,
        action: ActionId,
        surface: Option<&dyn SurfaceAdapter>,
        ctx: Option<&CursorContext>,
    ) -> ButtonState {
        let surface = surface.filter(|s| s.is_mounted());
        let query = ButtonQuery {
            action,
            context: ctx,
            surface: surface.map(|s| s.kind()),
            marks: surface.and_then(|s| s.mark_query()),
            multi_selection: false,
        };
        get_toolbar_button_state(&query, &self.capabilities)
    }

    fn trigger_inner(&mut self, surface: &mut dyn SurfaceAdapter) -> bool {
        if !surface.is_mounted() {
            debug!("trigger ignored, surface not mounted");
            return false;
        }
        if self.guard.submit(Deferred::Trigger).is_none() {
            return false;
        }
        let settle = Duration::from_millis(self.config.composition_settle_ms);
        if !settle.is_zero() && self.guard.recently_ended(settle) {
            debug!("trigger ignored, composition just ended");
            return false;
        }

        let mut ctx = surface.context();
        if !self.config.word_segmentation {
            ctx.in_word = None;
        }
        let intent = classify(&ctx, &self.state);
        match intent.kind {
            IntentKind::Skip { close: true, .. } => self.close_inner(surface),
            IntentKind::Skip { close: false, .. } => false,
            _ => self.open(surface, intent),
        }
    }

    fn open(&mut self, surface: &mut dyn SurfaceAdapter, intent: Intent) -> bool {
        if let Some(target) = intent.select {
            if let Err(err) = surface.set_selection(target.into()) {
                warn!(from = target.from, to = target.to, %err, "auto-select rejected");
                return false;
            }
        }
        debug!(mode = ?intent.kind.mode(), auto_selected = intent.auto_selected, "opening popup");
        self.popup.open(&intent.kind);
        self.state.open(&intent);
        true
    }

    fn close_inner(&mut self, surface: &mut dyn SurfaceAdapter) -> bool {
        if !self.state.is_open && !self.popup.is_open() {
            return false;
        }
        self.popup.close();
        if let Some(pos) = self.state.clear() {
            self.restore(surface, pos);
        }
        debug!("popup closed");
        true
    }

    fn restore(&mut self, surface: &mut dyn SurfaceAdapter, pos: usize) {
        let Some(Deferred::Select(selection)) =
            self.guard.submit(Deferred::Select(Selection::collapsed(pos)))
        else {
            return;
        };
        if let Err(err) = surface.set_selection(selection) {
            debug!(pos, %err, "cursor restore skipped");
        }
    }

    fn replay(&mut self, surface: &mut dyn SurfaceAdapter, actions: Vec<Deferred>) {
        for action in actions {
            debug!(?action, "replaying deferred action");
            match action {
                Deferred::Trigger => {
                    self.trigger(surface);
                }
                Deferred::Select(selection) => {
                    if let Err(err) = surface.set_selection(selection) {
                        debug!(%err, "deferred selection skipped");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::FlatTextSurface;
    use crate::text::TextBuffer;
    use crate::types::SurfaceKind;

    #[derive(Default)]
    struct RecordingPopup {
        opened: Vec<IntentKind>,
        closes: usize,
        current: Option<PopupMode>,
    }

    impl PopupApi for RecordingPopup {
        fn open(&mut self, intent: &IntentKind) {
            self.opened.push(intent.clone());
            self.current = intent.mode();
        }

        fn close(&mut self) {
            self.closes += 1;
            self.current = None;
        }

        fn is_open(&self) -> bool {
            self.current.is_some()
        }

        fn mode(&self) -> Option<PopupMode> {
            self.current
        }
    }

    fn router() -> ToolbarRouter<RecordingPopup> {
        ToolbarRouter::new(RecordingPopup::default(), ToolbarConfig::default())
    }

    fn check_this_out() -> FlatTextSurface {
        FlatTextSurface::new("Check *this* out").with_selection(Selection::collapsed(8))
    }

    #[test]
    fn test_auto_select_then_cancel_restores() {
        let mut surface = check_this_out();
        let mut router = router();

        assert!(router.trigger(&mut surface));
        assert_eq!(surface.selection(), Selection::new(7, 11));
        assert_eq!(router.popup().mode(), Some(PopupMode::Format));
        assert_eq!(router.state().original_cursor_pos, Some(8));

        // Trigger again toggles closed.
        assert!(router.trigger(&mut surface));
        assert_eq!(surface.selection(), Selection::collapsed(8));
        assert!(!router.state().is_open);
        assert_eq!(router.popup().closes, 1);
    }

    #[test]
    fn test_close_after_edit_keeps_selection() {
        let mut surface = check_this_out();
        let mut router = router();
        router.trigger(&mut surface);
        router.note_document_changed();
        assert!(router.close(&mut surface));
        assert_eq!(surface.selection(), Selection::new(7, 11));
    }

    #[test]
    fn test_explicit_selection_has_no_restore() {
        let mut surface = FlatTextSurface::new("plain words here").with_selection(Selection::new(0, 5));
        let mut router = router();
        assert!(router.trigger(&mut surface));
        assert_eq!(router.state().original_cursor_pos, None);
        assert!(router.close(&mut surface));
        assert_eq!(surface.selection(), Selection::new(0, 5));
    }

    #[test]
    fn test_unmounted_surface() {
        let mut surface = check_this_out();
        surface.set_mounted(false);
        let mut router = router();
        assert!(!router.trigger(&mut surface));
        assert!(router.popup().opened.is_empty());
    }

    #[test]
    fn test_reentry_blocked() {
        let mut surface = check_this_out();
        let mut router = router();
        let token = OperationToken::acquire(&router.busy);
        assert!(token.is_some());
        assert!(!router.trigger(&mut surface));
        drop(token);
        assert!(router.trigger(&mut surface));
    }

    #[test]
    fn test_trigger_deferred_during_composition() {
        let mut surface = check_this_out();
        let mut router = router();
        router.composition_start(8, "");
        assert!(!router.trigger(&mut surface));
        assert!(router.popup().opened.is_empty());

        router.composition_end(&mut surface, "", 8);
        assert_eq!(router.popup().mode(), Some(PopupMode::Format));
        assert_eq!(surface.selection(), Selection::new(7, 11));
    }

    #[test]
    fn test_restore_deferred_during_composition() {
        let mut surface = check_this_out();
        let mut router = router();
        router.trigger(&mut surface);
        router.composition_start(11, "");
        assert!(router.close(&mut surface));
        assert_eq!(surface.selection(), Selection::new(7, 11));
        router.composition_blur(&mut surface);
        assert_eq!(surface.selection(), Selection::collapsed(8));
    }

    #[test]
    fn test_echo_cleanup_shifts_caret() {
        let mut surface = FlatTextSurface::new("x你你y").with_selection(Selection::collapsed(3));
        let mut router = router();
        router.composition_start(1, "ni");
        router.composition_end(&mut surface, "你", 3);
        assert_eq!(surface.buffer().to_string(), "x你y");
        assert_eq!(surface.selection(), Selection::collapsed(2));
    }

    #[test]
    fn test_echo_cleanup_shifts_deferred_restore() {
        let mut surface =
            FlatTextSurface::new("x你你y *ab*").with_selection(Selection::collapsed(7));
        let mut router = router();
        assert!(router.trigger(&mut surface));
        assert_eq!(surface.selection(), Selection::new(6, 8));

        router.composition_start(1, "ni");
        assert!(router.close(&mut surface));
        router.composition_end(&mut surface, "你", 3);
        assert_eq!(surface.buffer().to_string(), "x你y *ab*");
        assert_eq!(surface.selection(), Selection::collapsed(6));
    }

    #[test]
    fn test_settle_window() {
        let mut surface = check_this_out();
        let config = ToolbarConfig {
            composition_settle_ms: 60_000,
            ..Default::default()
        };
        let mut router = ToolbarRouter::new(RecordingPopup::default(), config);
        router.composition_start(8, "");
        router.composition_end(&mut surface, "", 8);
        assert!(!router.trigger(&mut surface));
    }

    #[test]
    fn test_click_opens_link_popup() {
        let mut surface = FlatTextSurface::new("see [docs](https://x.example) now")
            .with_selection(Selection::collapsed(7));
        let mut router = router();
        assert!(router.click(&mut surface));
        assert_eq!(router.popup().mode(), Some(PopupMode::Link));
        assert_eq!(surface.selection(), Selection::collapsed(7));
    }

    #[test]
    fn test_click_ignored_while_composing() {
        let mut surface = FlatTextSurface::new("see [docs](https://x.example) now")
            .with_selection(Selection::collapsed(7));
        let mut router = router();
        router.composition_start(7, "");
        assert!(!router.click(&mut surface));
        assert!(router.popup().opened.is_empty());
    }

    #[test]
    fn test_word_segmentation_off_in_config() {
        let mut surface =
            FlatTextSurface::new("the cat sat").with_selection(Selection::collapsed(5));
        let config = ToolbarConfig {
            word_segmentation: false,
            ..Default::default()
        };
        let mut router = ToolbarRouter::new(RecordingPopup::default(), config);
        assert!(router.trigger(&mut surface));
        assert_eq!(router.popup().mode(), Some(PopupMode::Insert));
        assert_eq!(surface.selection(), Selection::collapsed(5));
        assert_eq!(router.state().original_cursor_pos, None);
    }

    #[test]
    fn test_trigger_when_mounted_gives_up() {
        let mut surface = check_this_out();
        surface.set_mounted(false);
        let mut router = router();
        let mut sleeps = 0;
        assert!(!router.trigger_when_mounted(&mut surface, |_| sleeps += 1));
        assert_eq!(sleeps, 9);
    }

    #[test]
    fn test_button_state_without_surface() {
        let router = router();
        let ctx = CursorContext::default();
        assert!(router.button_state(ActionId::Bold, None, Some(&ctx)).disabled);

        let surface = FlatTextSurface::new("x").with_selection(Selection::new(0, 1));
        let ctx = surface.context();
        let state = router.button_state(ActionId::Bold, Some(&surface), Some(&ctx));
        assert!(!state.disabled);
        assert_eq!(surface.kind(), SurfaceKind::FlatText);
    }
}
