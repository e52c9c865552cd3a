//! Structured document model: typed block nodes with marked inline content.
//!
//! Positions follow the node-tree convention: the document's content starts
//! at 0, every block node occupies `2 + content size` (an open and a close
//! token), text occupies one position per char, an image atom occupies one
//! position and inline containers (math, footnote references) occupy
//! `2 + chars`.

use smol_str::SmolStr;

use crate::marks::{Mark, TextRun};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading { level: u8 },
    CodeBlock { language: Option<SmolStr> },
    MathBlock,
    Blockquote,
    BulletList,
    OrderedList,
    ListItem { checked: Option<bool> },
    Table,
    TableRow,
    TableCell { header: bool },
}

impl NodeKind {
    /// Holds inline content directly.
    pub fn is_textblock(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Heading { .. }
                | NodeKind::CodeBlock { .. }
                | NodeKind::MathBlock
                | NodeKind::TableCell { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text { text: SmolStr, marks: Vec<Mark> },
    Image { src: SmolStr, alt: SmolStr, marks: Vec<Mark> },
    Math { content: SmolStr, marks: Vec<Mark> },
    FootnoteRef { label: SmolStr, marks: Vec<Mark> },
}

impl Inline {
    pub fn text(text: impl Into<SmolStr>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: impl Into<SmolStr>, marks: Vec<Mark>) -> Self {
        Inline::Text {
            text: text.into(),
            marks,
        }
    }

    pub fn image(src: impl Into<SmolStr>, alt: impl Into<SmolStr>) -> Self {
        Inline::Image {
            src: src.into(),
            alt: alt.into(),
            marks: Vec::new(),
        }
    }

    pub fn math(content: impl Into<SmolStr>) -> Self {
        Inline::Math {
            content: content.into(),
            marks: Vec::new(),
        }
    }

    pub fn footnote(label: impl Into<SmolStr>) -> Self {
        Inline::FootnoteRef {
            label: label.into(),
            marks: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Inline::Text { text, .. } => text.chars().count(),
            Inline::Image { .. } => 1,
            Inline::Math { content, .. } => content.chars().count() + 2,
            Inline::FootnoteRef { label, .. } => label.chars().count() + 2,
        }
    }

    pub fn marks(&self) -> &[Mark] {
        match self {
            Inline::Text { marks, .. }
            | Inline::Image { marks, .. }
            | Inline::Math { marks, .. }
            | Inline::FootnoteRef { marks, .. } => marks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Blocks(Vec<Node>),
    Inline(Vec<Inline>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub content: Content,
}

impl Node {
    pub fn doc(children: Vec<Node>) -> Self {
        Self::container(NodeKind::Doc, children)
    }

    pub fn container(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            content: Content::Blocks(children),
        }
    }

    pub fn textblock(kind: NodeKind, inline: Vec<Inline>) -> Self {
        Self {
            kind,
            content: Content::Inline(inline),
        }
    }

    pub fn paragraph(inline: Vec<Inline>) -> Self {
        Self::textblock(NodeKind::Paragraph, inline)
    }

    pub fn heading(level: u8, inline: Vec<Inline>) -> Self {
        Self::textblock(NodeKind::Heading { level }, inline)
    }

    pub fn code_block(language: Option<&str>, code: &str) -> Self {
        Self::textblock(
            NodeKind::CodeBlock {
                language: language.map(SmolStr::new),
            },
            vec![Inline::text(code)],
        )
    }

    pub fn content_size(&self) -> usize {
        match &self.content {
            Content::Blocks(children) => children.iter().map(Node::size).sum(),
            Content::Inline(inline) => inline.iter().map(Inline::size).sum(),
        }
    }

    /// Positions this node occupies inside its parent.
    pub fn size(&self) -> usize {
        self.content_size() + 2
    }

    pub fn inline(&self) -> Option<&[Inline]> {
        match &self.content {
            Content::Inline(inline) => Some(inline),
            Content::Blocks(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match &self.content {
            Content::Blocks(children) => children,
            Content::Inline(_) => &[],
        }
    }

    /// Resolve a position against this node, treated as the document root.
    pub fn resolve(&self, pos: usize) -> Option<ResolvedPos<'_>> {
        if pos > self.content_size() {
            return None;
        }

        let mut path = vec![PathStep {
            node: self,
            content_start: 0,
            index: 0,
        }];
        let mut node = self;
        let mut start = 0;

        loop {
            let Content::Blocks(children) = &node.content else {
                break;
            };
            let mut child_pos = start;
            let mut index = children.len();
            let mut entered = None;
            for (i, child) in children.iter().enumerate() {
                let end = child_pos + child.size();
                if pos <= child_pos {
                    index = i;
                    break;
                }
                if pos < end {
                    index = i;
                    entered = Some((child, child_pos + 1));
                    break;
                }
                child_pos = end;
            }
            if let Some(last) = path.last_mut() {
                last.index = index;
            }
            let Some((child, content_start)) = entered else {
                break;
            };
            path.push(PathStep {
                node: child,
                content_start,
                index: 0,
            });
            node = child;
            start = content_start;
        }

        Some(ResolvedPos { pos, path })
    }

    /// Textblocks in document order with their content start positions.
    pub fn textblocks(&self) -> Vec<(usize, &Node)> {
        let mut out = Vec::new();
        collect_textblocks(self, 0, &mut out);
        out
    }
}

fn collect_textblocks<'a>(node: &'a Node, content_start: usize, out: &mut Vec<(usize, &'a Node)>) {
    if node.kind.is_textblock() {
        out.push((content_start, node));
        return;
    }
    let mut child_pos = content_start;
    for child in node.children() {
        collect_textblocks(child, child_pos + 1, out);
        child_pos += child.size();
    }
}

/// One level of a resolved position's ancestor chain.
#[derive(Debug, Clone, Copy)]
pub struct PathStep<'a> {
    pub node: &'a Node,
    pub content_start: usize,
    /// Index of the child the position lies in (or before).
    pub index: usize,
}

impl PathStep<'_> {
    pub fn from(&self) -> usize {
        self.content_start.saturating_sub(1)
    }

    pub fn to(&self) -> usize {
        self.content_start + self.node.content_size() + 1
    }
}

/// A position resolved to its ancestor chain.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pub pos: usize,
    /// Root first, innermost last.
    pub path: Vec<PathStep<'a>>,
}

impl<'a> ResolvedPos<'a> {
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn parent(&self) -> &PathStep<'a> {
        &self.path[self.path.len() - 1]
    }

    /// Ancestors from the innermost outwards, excluding the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &PathStep<'a>> {
        self.path.iter().skip(1).rev()
    }

    /// The innermost textblock, if the position is inside one.
    pub fn textblock(&self) -> Option<&PathStep<'a>> {
        let parent = self.parent();
        parent.node.kind.is_textblock().then_some(parent)
    }

    pub fn parent_offset(&self) -> usize {
        self.pos - self.parent().content_start
    }

    /// Index of the step in `path` for the given ancestor kind, innermost first.
    pub fn find_ancestor(&self, pred: impl Fn(&NodeKind) -> bool) -> Option<(usize, &PathStep<'a>)> {
        self.path
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, step)| pred(&step.node.kind))
    }
}

/// A textblock's inline item with absolute positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan<'a> {
    pub from: usize,
    pub to: usize,
    pub item: &'a Inline,
}

/// Flatten a textblock whose content starts at `content_start`.
pub fn textblock_spans(node: &Node, content_start: usize) -> Vec<InlineSpan<'_>> {
    let mut pos = content_start;
    node.inline()
        .unwrap_or(&[])
        .iter()
        .map(|item| {
            let from = pos;
            pos += item.size();
            InlineSpan { from, to: pos, item }
        })
        .collect()
}

/// The run sequence the mark resolver works on.
pub fn runs_of(spans: &[InlineSpan<'_>]) -> Vec<TextRun> {
    spans
        .iter()
        .filter(|span| span.from < span.to)
        .map(|span| TextRun::new(span.from, span.to, span.item.marks().to_vec()))
        .collect()
}

/// Object replacement char standing in for non-text positions.
pub const LEAF_CHAR: char = '\u{FFFC}';

/// One char per position of the textblock content.
pub fn leaf_text(node: &Node) -> String {
    let mut out = String::new();
    for item in node.inline().unwrap_or(&[]) {
        match item {
            Inline::Text { text, .. } => out.push_str(text),
            Inline::Image { .. } => out.push(LEAF_CHAR),
            Inline::Math { content: text, .. } | Inline::FootnoteRef { label: text, .. } => {
                out.push(LEAF_CHAR);
                out.push_str(text);
                out.push(LEAF_CHAR);
            }
        }
    }
    out
}
