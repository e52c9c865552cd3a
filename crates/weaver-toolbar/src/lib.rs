//! weaver-toolbar: the contextual formatting toolbar, without a UI framework.
//!
//! This crate provides:
//! - `SurfaceAdapter` - one interface over the structured (node tree) and
//!   flat-text (markdown source) editing surfaces, each producing a
//!   `CursorContext`
//! - `classify` - the priority list that turns a context into an `Intent`
//! - `ToolbarRouter` - applies intents: auto-select, popup open/close and
//!   cursor restore, deferred during IME composition
//! - `get_toolbar_button_state` - per-action enabled/active gating
//! - Mark range and word boundary resolution shared by both surfaces

pub mod actions;
pub mod classify;
pub mod composition;
pub mod config;
pub mod context;
pub mod error;
pub mod marks;
pub mod retry;
pub mod router;
pub mod rules;
pub mod state;
pub mod surface;
pub mod text;
pub mod tree;
pub mod types;
pub mod word;

pub use actions::{ActionBehavior, ActionGroup, ActionId, Predicate, UnknownAction};
pub use classify::{Intent, IntentKind, PopupMode, classify, classify_click};
pub use composition::{CompositionFlush, CompositionGuard};
pub use config::{CapabilityOverrides, ToolbarConfig};
pub use context::{
    BlockContext, BlockquoteInfo, CodeBlockInfo, ContextBuilder, ContextCache, ContextMode,
    CursorContext, FootnoteInfo, HeadingInfo, ImageInfo, InlineMathInfo, LinkInfo, ListInfo,
    ListKind, MathBlockInfo, TableInfo,
};
pub use error::{ConfigError, SurfaceError};
pub use marks::{FormatRange, Mark, MarkKind, TextRun, resolve_any_mark_range, resolve_mark_range};
pub use retry::{RetryPolicy, retry_fixed};
pub use router::{Deferred, PopupApi, ToolbarRouter};
pub use rules::{ButtonQuery, ButtonState, Capabilities, get_toolbar_button_state, group_state};
pub use smol_str::SmolStr;
pub use state::ToolbarState;
pub use surface::{
    FlatTextSurface, Geometry, MarkQuery, MonospaceGeometry, StructuredSurface, SurfaceAdapter,
};
pub use text::{EditorRope, TextBuffer};
pub use tree::{Inline, Node, NodeKind};
pub use types::{CompositionState, LineCol, Rect, Selection, SurfaceKind, TextRange};
pub use word::{WordBoundaryResolver, WordSegmenter};
