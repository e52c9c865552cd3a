//! Per-action enabled / active / implemented evaluation.
//!
//! Stateless: the rendered toolbar calls this continuously with whatever
//! context it has. A missing context or surface means the surface is
//! mounting or tearing down, and every button reports disabled.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::actions::{ActionBehavior, ActionGroup, ActionId};
use crate::config::CapabilityOverrides;
use crate::context::CursorContext;
use crate::surface::MarkQuery;
use crate::types::SurfaceKind;

/// Button affordances for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ButtonState {
    pub disabled: bool,
    pub active: bool,
    pub not_implemented: bool,
}

impl ButtonState {
    const UNAVAILABLE: Self = Self {
        disabled: true,
        active: false,
        not_implemented: false,
    };

    const UNIMPLEMENTED: Self = Self {
        disabled: true,
        active: false,
        not_implemented: true,
    };
}

/// Everything one evaluation needs.
#[derive(Clone, Copy)]
pub struct ButtonQuery<'a> {
    pub action: ActionId,
    pub context: Option<&'a CursorContext>,
    pub surface: Option<SurfaceKind>,
    /// The surface's mark registry, when it has one.
    pub marks: Option<&'a dyn MarkQuery>,
    /// Several selections are active at once.
    pub multi_selection: bool,
}

impl<'a> ButtonQuery<'a> {
    pub fn new(action: ActionId, context: &'a CursorContext, surface: SurfaceKind) -> Self {
        Self {
            action,
            context: Some(context),
            surface: Some(surface),
            marks: None,
            multi_selection: false,
        }
    }

    pub fn with_marks(mut self, marks: Option<&'a dyn MarkQuery>) -> Self {
        self.marks = marks;
        self
    }

    pub fn with_multi_selection(mut self, multi_selection: bool) -> Self {
        self.multi_selection = multi_selection;
        self
    }

    fn for_action(self, action: ActionId) -> Self {
        Self { action, ..self }
    }
}

/// Which actions each surface does not implement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    structured_unimplemented: BTreeSet<ActionId>,
    flat_text_unimplemented: BTreeSet<ActionId>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            // Source-only operation.
            structured_unimplemented: [ActionId::FormatTable].into_iter().collect(),
            flat_text_unimplemented: [
                ActionId::Bookmark,
                ActionId::AddColBefore,
                ActionId::AddColAfter,
                ActionId::DeleteCol,
                ActionId::AlignLeft,
                ActionId::AlignCenter,
                ActionId::AlignRight,
            ]
            .into_iter()
            .collect(),
        }
    }
}

impl Capabilities {
    /// Defaults, with each configured list replacing its surface's table.
    pub fn from_overrides(overrides: &CapabilityOverrides) -> Self {
        let mut caps = Self::default();
        if let Some(list) = &overrides.structured_unimplemented {
            caps.structured_unimplemented = list.iter().copied().collect();
        }
        if let Some(list) = &overrides.flat_text_unimplemented {
            caps.flat_text_unimplemented = list.iter().copied().collect();
        }
        caps
    }

    pub fn is_implemented(&self, action: ActionId, surface: SurfaceKind) -> bool {
        let table = match surface {
            SurfaceKind::Structured => &self.structured_unimplemented,
            SurfaceKind::FlatText => &self.flat_text_unimplemented,
        };
        !table.contains(&action)
    }
}

/// Evaluate one toolbar button.
pub fn get_toolbar_button_state(query: &ButtonQuery<'_>, caps: &Capabilities) -> ButtonState {
    let (Some(ctx), Some(surface)) = (query.context, query.surface) else {
        return ButtonState::UNAVAILABLE;
    };
    if !caps.is_implemented(query.action, surface) {
        return ButtonState::UNIMPLEMENTED;
    }

    let def = query.action.def();
    let mut enabled = def.predicates.iter().all(|p| p.holds(ctx));
    if ctx.in_link.is_some() && def.conflicts_with_link() {
        enabled = false;
    }
    if surface == SurfaceKind::FlatText && def.flat_text_needs_selection() && !ctx.has_selection
    {
        enabled = false;
    }
    if query.multi_selection && !def.multi_selection {
        enabled = false;
    }

    let active = match def.behavior {
        ActionBehavior::MarkToggle(kind) => match (surface, query.marks) {
            (SurfaceKind::Structured, Some(marks)) => marks.mark_active(kind),
            _ => ctx.active_formats.contains(&kind),
        },
        ActionBehavior::Heading(0) => false,
        ActionBehavior::Heading(level) => {
            ctx.in_heading.as_ref().is_some_and(|h| h.level == level)
        }
        ActionBehavior::Insert | ActionBehavior::LinkVariant | ActionBehavior::Command => false,
    };

    ButtonState {
        disabled: !enabled,
        active,
        not_implemented: false,
    }
}

/// Evaluate a dropdown group.
///
/// Disabled only when no child is implemented; a group whose children are
/// all contextually disabled still opens its menu.
pub fn group_state(group: ActionGroup, query: &ButtonQuery<'_>, caps: &Capabilities) -> ButtonState {
    if query.context.is_none() || query.surface.is_none() {
        return ButtonState::UNAVAILABLE;
    }
    let children: Vec<ButtonState> = group
        .children()
        .iter()
        .map(|child| get_toolbar_button_state(&query.for_action(*child), caps))
        .collect();
    let not_implemented = children.iter().all(|c| c.not_implemented);
    ButtonState {
        disabled: not_implemented,
        active: children.iter().any(|c| c.active),
        not_implemented,
    }
}
