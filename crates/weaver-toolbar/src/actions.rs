//! Toolbar actions and their static definitions.
//!
//! `ActionId` names every toolbar/menu action by its kebab-case id. Each id
//! has one `ActionDef` describing when it is enabled and how its pressed
//! state is derived; the evaluation itself lives in [`crate::rules`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::CursorContext;
use crate::marks::MarkKind;

/// A toolbar action, identified by its menu id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionId {
    // === Inline formatting ===
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Subscript,
    Superscript,
    Highlight,
    ClearFormat,

    // === Inline insertion ===
    Link,
    WikiLink,
    Bookmark,
    Image,
    Footnote,
    InlineMath,

    // === Headings ===
    #[serde(rename = "heading-1")]
    Heading1,
    #[serde(rename = "heading-2")]
    Heading2,
    #[serde(rename = "heading-3")]
    Heading3,
    #[serde(rename = "heading-4")]
    Heading4,
    #[serde(rename = "heading-5")]
    Heading5,
    #[serde(rename = "heading-6")]
    Heading6,
    Paragraph,
    IncreaseHeading,
    DecreaseHeading,

    // === Blocks ===
    Quote,
    NestQuote,
    UnnestQuote,
    CodeFences,
    MathBlock,
    HorizontalLine,

    // === Lists ===
    OrderedList,
    UnorderedList,
    TaskList,
    Indent,
    Outdent,
    RemoveList,

    // === Tables ===
    InsertTable,
    AddRowBefore,
    AddRowAfter,
    AddColBefore,
    AddColAfter,
    DeleteRow,
    DeleteCol,
    DeleteTable,
    AlignLeft,
    AlignCenter,
    AlignRight,
    FormatTable,
}

impl ActionId {
    pub const ALL: &'static [ActionId] = &[
        ActionId::Bold,
        ActionId::Italic,
        ActionId::Underline,
        ActionId::Strikethrough,
        ActionId::Code,
        ActionId::Subscript,
        ActionId::Superscript,
        ActionId::Highlight,
        ActionId::ClearFormat,
        ActionId::Link,
        ActionId::WikiLink,
        ActionId::Bookmark,
        ActionId::Image,
        ActionId::Footnote,
        ActionId::InlineMath,
        ActionId::Heading1,
        ActionId::Heading2,
        ActionId::Heading3,
        ActionId::Heading4,
        ActionId::Heading5,
        ActionId::Heading6,
        ActionId::Paragraph,
        ActionId::IncreaseHeading,
        ActionId::DecreaseHeading,
        ActionId::Quote,
        ActionId::NestQuote,
        ActionId::UnnestQuote,
        ActionId::CodeFences,
        ActionId::MathBlock,
        ActionId::HorizontalLine,
        ActionId::OrderedList,
        ActionId::UnorderedList,
        ActionId::TaskList,
        ActionId::Indent,
        ActionId::Outdent,
        ActionId::RemoveList,
        ActionId::InsertTable,
        ActionId::AddRowBefore,
        ActionId::AddRowAfter,
        ActionId::AddColBefore,
        ActionId::AddColAfter,
        ActionId::DeleteRow,
        ActionId::DeleteCol,
        ActionId::DeleteTable,
        ActionId::AlignLeft,
        ActionId::AlignCenter,
        ActionId::AlignRight,
        ActionId::FormatTable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionId::Bold => "bold",
            ActionId::Italic => "italic",
            ActionId::Underline => "underline",
            ActionId::Strikethrough => "strikethrough",
            ActionId::Code => "code",
            ActionId::Subscript => "subscript",
            ActionId::Superscript => "superscript",
            ActionId::Highlight => "highlight",
            ActionId::ClearFormat => "clear-format",
            ActionId::Link => "link",
            ActionId::WikiLink => "wiki-link",
            ActionId::Bookmark => "bookmark",
            ActionId::Image => "image",
            ActionId::Footnote => "footnote",
            ActionId::InlineMath => "inline-math",
            ActionId::Heading1 => "heading-1",
            ActionId::Heading2 => "heading-2",
            ActionId::Heading3 => "heading-3",
            ActionId::Heading4 => "heading-4",
            ActionId::Heading5 => "heading-5",
            ActionId::Heading6 => "heading-6",
            ActionId::Paragraph => "paragraph",
            ActionId::IncreaseHeading => "increase-heading",
            ActionId::DecreaseHeading => "decrease-heading",
            ActionId::Quote => "quote",
            ActionId::NestQuote => "nest-quote",
            ActionId::UnnestQuote => "unnest-quote",
            ActionId::CodeFences => "code-fences",
            ActionId::MathBlock => "math-block",
            ActionId::HorizontalLine => "horizontal-line",
            ActionId::OrderedList => "ordered-list",
            ActionId::UnorderedList => "unordered-list",
            ActionId::TaskList => "task-list",
            ActionId::Indent => "indent",
            ActionId::Outdent => "outdent",
            ActionId::RemoveList => "remove-list",
            ActionId::InsertTable => "insert-table",
            ActionId::AddRowBefore => "add-row-before",
            ActionId::AddRowAfter => "add-row-after",
            ActionId::AddColBefore => "add-col-before",
            ActionId::AddColAfter => "add-col-after",
            ActionId::DeleteRow => "delete-row",
            ActionId::DeleteCol => "delete-col",
            ActionId::DeleteTable => "delete-table",
            ActionId::AlignLeft => "align-left",
            ActionId::AlignCenter => "align-center",
            ActionId::AlignRight => "align-right",
            ActionId::FormatTable => "format-table",
        }
    }

    /// Static definition for this action.
    pub fn def(self) -> ActionDef {
        use ActionBehavior::*;
        use Predicate::*;

        let (predicates, behavior, multi_selection): (&'static [Predicate], _, _) = match self {
            ActionId::Bold => (&[NotInCodeblock], MarkToggle(MarkKind::Strong), true),
            ActionId::Italic => (&[NotInCodeblock], MarkToggle(MarkKind::Emphasis), true),
            ActionId::Underline => (&[NotInCodeblock], MarkToggle(MarkKind::Underline), true),
            ActionId::Strikethrough => (&[NotInCodeblock], MarkToggle(MarkKind::Strike), true),
            ActionId::Code => (&[NotInCodeblock], MarkToggle(MarkKind::Code), true),
            ActionId::Subscript => (&[NotInCodeblock], MarkToggle(MarkKind::Subscript), true),
            ActionId::Superscript => (&[NotInCodeblock], MarkToggle(MarkKind::Superscript), true),
            ActionId::Highlight => (&[NotInCodeblock], MarkToggle(MarkKind::Highlight), true),
            ActionId::ClearFormat => (&[NotInCodeblock], Command, true),

            ActionId::Link | ActionId::WikiLink | ActionId::Bookmark => {
                (&[NotInCodeblock], LinkVariant, false)
            }
            ActionId::Image | ActionId::Footnote | ActionId::InlineMath => {
                (&[NotInCodeblock], Insert, false)
            }

            ActionId::Heading1 => (&[NotInCodeblock], Heading(1), true),
            ActionId::Heading2 => (&[NotInCodeblock], Heading(2), true),
            ActionId::Heading3 => (&[NotInCodeblock], Heading(3), true),
            ActionId::Heading4 => (&[NotInCodeblock], Heading(4), true),
            ActionId::Heading5 => (&[NotInCodeblock], Heading(5), true),
            ActionId::Heading6 => (&[NotInCodeblock], Heading(6), true),
            ActionId::Paragraph => (&[NotInCodeblock], Heading(0), true),
            ActionId::IncreaseHeading => (&[NotInCodeblock], Command, true),
            ActionId::DecreaseHeading => (&[InHeading], Command, true),

            ActionId::Quote => (&[NotInCodeblock], Command, true),
            ActionId::NestQuote | ActionId::UnnestQuote => (&[InBlockquote], Command, true),
            // Toggles the fence off from inside a code block too.
            ActionId::CodeFences => (&[Always], Command, false),
            ActionId::MathBlock | ActionId::HorizontalLine => (&[NotInCodeblock], Insert, false),

            ActionId::OrderedList | ActionId::UnorderedList | ActionId::TaskList => {
                (&[NotInCodeblock], Command, true)
            }
            ActionId::Indent | ActionId::Outdent | ActionId::RemoveList => {
                (&[InList], Command, true)
            }

            ActionId::InsertTable => (&[NotInCodeblock], Insert, false),
            ActionId::AddRowBefore
            | ActionId::AddRowAfter
            | ActionId::AddColBefore
            | ActionId::AddColAfter
            | ActionId::DeleteRow
            | ActionId::DeleteCol
            | ActionId::DeleteTable
            | ActionId::AlignLeft
            | ActionId::AlignCenter
            | ActionId::AlignRight
            | ActionId::FormatTable => (&[InTable], Command, false),
        };

        ActionDef {
            id: self,
            predicates,
            behavior,
            multi_selection,
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown toolbar action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for ActionId {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Context condition an action needs to be enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Predicate {
    Always,
    HasSelection,
    NotInCodeblock,
    InHeading,
    InList,
    InTable,
    InBlockquote,
    InCodeblock,
    Never,
}

impl Predicate {
    pub fn holds(self, ctx: &CursorContext) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::HasSelection => ctx.has_selection,
            Predicate::NotInCodeblock => ctx.in_code_block().is_none(),
            Predicate::InHeading => ctx.in_heading.is_some(),
            Predicate::InList => ctx.in_list().is_some(),
            Predicate::InTable => ctx.in_table().is_some(),
            Predicate::InBlockquote => ctx.in_blockquote().is_some(),
            Predicate::InCodeblock => ctx.in_code_block().is_some(),
            Predicate::Never => false,
        }
    }
}

/// How an action's pressed state is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionBehavior {
    /// Active while the mark covers the effective selection.
    MarkToggle(MarkKind),
    /// Active at the matching heading level. Level 0 is one-shot.
    Heading(u8),
    /// Inserts something; never active.
    Insert,
    /// Opens link authoring; never active.
    LinkVariant,
    /// One-shot command.
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDef {
    pub id: ActionId,
    /// All must hold.
    pub predicates: &'static [Predicate],
    pub behavior: ActionBehavior,
    /// Usable while several selections are active.
    pub multi_selection: bool,
}

impl ActionDef {
    /// Re-opens link authoring UI or applies a mark that cannot live inside
    /// link text.
    pub fn conflicts_with_link(&self) -> bool {
        matches!(
            self.behavior,
            ActionBehavior::LinkVariant | ActionBehavior::MarkToggle(MarkKind::Code)
        )
    }

    /// Needs a non-empty selection on the flat-text surface.
    pub fn flat_text_needs_selection(&self) -> bool {
        matches!(self.behavior, ActionBehavior::MarkToggle(_))
            || matches!(self.id, ActionId::ClearFormat | ActionId::Footnote)
    }
}

/// Dropdown groups on the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionGroup {
    Headings,
    Lists,
    Table,
    Quote,
}

impl ActionGroup {
    pub fn children(self) -> &'static [ActionId] {
        match self {
            ActionGroup::Headings => &[
                ActionId::Heading1,
                ActionId::Heading2,
                ActionId::Heading3,
                ActionId::Heading4,
                ActionId::Heading5,
                ActionId::Heading6,
                ActionId::Paragraph,
                ActionId::IncreaseHeading,
                ActionId::DecreaseHeading,
            ],
            ActionGroup::Lists => &[
                ActionId::OrderedList,
                ActionId::UnorderedList,
                ActionId::TaskList,
                ActionId::Indent,
                ActionId::Outdent,
                ActionId::RemoveList,
            ],
            ActionGroup::Table => &[
                ActionId::InsertTable,
                ActionId::AddRowBefore,
                ActionId::AddRowAfter,
                ActionId::AddColBefore,
                ActionId::AddColAfter,
                ActionId::DeleteRow,
                ActionId::DeleteCol,
                ActionId::DeleteTable,
                ActionId::AlignLeft,
                ActionId::AlignCenter,
                ActionId::AlignRight,
                ActionId::FormatTable,
            ],
            ActionGroup::Quote => &[ActionId::Quote, ActionId::NestQuote, ActionId::UnnestQuote],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for id in ActionId::ALL {
            assert_eq!(id.as_str().parse::<ActionId>(), Ok(*id));
        }
        assert!("heading-7".parse::<ActionId>().is_err());
    }

    #[test]
    fn test_serde_matches_display() {
        for id in ActionId::ALL {
            let json = serde_json::to_string(id).unwrap();
            assert_eq!(json, format!("\"{id}\""));
        }
    }

    #[test]
    fn test_defs_are_consistent() {
        for id in ActionId::ALL {
            let def = id.def();
            assert_eq!(def.id, *id);
            assert!(!def.predicates.is_empty());
        }
    }

    #[test]
    fn test_link_conflicts() {
        assert!(ActionId::Link.def().conflicts_with_link());
        assert!(ActionId::WikiLink.def().conflicts_with_link());
        assert!(ActionId::Code.def().conflicts_with_link());
        assert!(!ActionId::Bold.def().conflicts_with_link());
    }

    #[test]
    fn test_predicates() {
        let ctx = CursorContext::default();
        assert!(Predicate::Always.holds(&ctx));
        assert!(Predicate::NotInCodeblock.holds(&ctx));
        assert!(!Predicate::InList.holds(&ctx));
        assert!(!Predicate::Never.holds(&ctx));
    }
}
