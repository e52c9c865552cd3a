//! IME composition guard.
//!
//! While a composition is active the buffer holds provisional text, so
//! anything that would read a context or move the selection is queued and
//! replayed once the composition commits.

use std::time::Duration;

use tracing::debug;
use web_time::Instant;

use crate::text::TextBuffer;
use crate::types::{CompositionState, Selection};

/// What `end` did to the buffer, plus the actions to replay in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionFlush<A> {
    /// Where the composition started.
    pub start: usize,
    /// Chars removed from `start` by the cleanup pass.
    pub trimmed: usize,
    pub actions: Vec<A>,
}

impl<A> CompositionFlush<A> {
    /// Map a pre-cleanup position onto the trimmed buffer.
    pub fn map_pos(&self, pos: usize) -> usize {
        if pos <= self.start {
            pos
        } else {
            pos.saturating_sub(self.trimmed).max(self.start)
        }
    }

    pub fn map_selection(&self, selection: Selection) -> Selection {
        Selection::new(self.map_pos(selection.anchor), self.map_pos(selection.head))
    }
}

#[derive(Debug)]
pub struct CompositionGuard<A> {
    composition: Option<CompositionState>,
    queue: Vec<A>,
    ended_at: Option<Instant>,
}

impl<A> Default for CompositionGuard<A> {
    fn default() -> Self {
        Self {
            composition: None,
            queue: Vec::new(),
            ended_at: None,
        }
    }
}

impl<A> CompositionGuard<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_composing(&self) -> bool {
        self.composition.is_some()
    }

    pub fn composition(&self) -> Option<&CompositionState> {
        self.composition.as_ref()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn start(&mut self, offset: usize, text: impl Into<String>) {
        let text = text.into();
        debug!(start_offset = offset, text = %text, "composition start");
        self.composition = Some(CompositionState::new(offset, text));
    }

    pub fn update(&mut self, text: impl Into<String>) {
        match self.composition.as_mut() {
            Some(comp) => comp.text = text.into(),
            None => debug!("composition update without active composition"),
        }
    }

    /// Queue `action` while composing. Returns it back when it can run now.
    pub fn submit(&mut self, action: A) -> Option<A> {
        if self.composition.is_none() {
            return Some(action);
        }
        self.queue.push(action);
        debug!(queued = self.queue.len(), "deferred until composition ends");
        None
    }

    /// Commit the composition.
    ///
    /// `echo_end` is where the platform's echoed insertion stops (the caret
    /// at composition end). When the echo is the committed text preceded by
    /// a provisional copy of it, that duplicated prefix is removed from
    /// `buffer`. Surfaces without a flat buffer pass `None` and skip cleanup.
    pub fn end(
        &mut self,
        buffer: Option<&mut dyn TextBuffer>,
        committed: &str,
        echo_end: usize,
    ) -> CompositionFlush<A> {
        self.ended_at = Some(Instant::now());
        let (start, trimmed) = match (self.composition.take(), buffer) {
            (Some(comp), Some(buffer)) => {
                let start = comp.start_offset;
                (start, cleanup_echo(buffer, start, echo_end, committed))
            }
            (Some(comp), None) => (comp.start_offset, 0),
            (None, _) => {
                debug!("composition end without active composition");
                (echo_end, 0)
            }
        };
        let actions = std::mem::take(&mut self.queue);
        debug!(trimmed, replay = actions.len(), "composition end");
        CompositionFlush {
            start,
            trimmed,
            actions,
        }
    }

    /// Focus was lost mid-composition. Flushes the queue with no cleanup,
    /// so one echoed character may remain.
    pub fn blur(&mut self) -> Vec<A> {
        if self.composition.take().is_some() {
            self.ended_at = Some(Instant::now());
            debug!(replay = self.queue.len(), "composition abandoned on blur");
        }
        std::mem::take(&mut self.queue)
    }

    /// A composition ended less than `window` ago.
    pub fn recently_ended(&self, window: Duration) -> bool {
        self.ended_at
            .is_some_and(|at| Instant::now().duration_since(at) < window)
    }
}

fn cleanup_echo(
    buffer: &mut dyn TextBuffer,
    start: usize,
    echo_end: usize,
    committed: &str,
) -> usize {
    if echo_end <= start || echo_end > buffer.len_chars() {
        return 0;
    }
    let Some(echoed) = buffer.slice(start..echo_end) else {
        return 0;
    };
    let echoed: Vec<char> = echoed.chars().collect();
    let committed: Vec<char> = committed.chars().collect();
    if echoed.len() <= committed.len() || !echoed.ends_with(&committed) {
        return 0;
    }
    let surplus = &echoed[..echoed.len() - committed.len()];
    let common = surplus
        .iter()
        .zip(&committed)
        .take_while(|(a, b)| a == b)
        .count();
    if common > 0 {
        buffer.delete(start..start + common);
    }
    common
}
