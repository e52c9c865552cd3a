//! The same document through both surfaces must classify the same way.

use weaver_toolbar::{
    ContextMode, FlatTextSurface, Inline, Intent, IntentKind, ListKind, Mark, Node, NodeKind,
    PopupApi, PopupMode, Selection, StructuredSurface, SurfaceAdapter, ToolbarConfig,
    ToolbarRouter, ToolbarState, classify,
};

fn run(surface: &dyn SurfaceAdapter) -> Intent {
    classify(&surface.context(), &ToolbarState::default())
}

fn flat(text: &str, sel: Selection) -> Intent {
    run(&FlatTextSurface::new(text).with_selection(sel))
}

fn structured(doc: Node, sel: Selection) -> Intent {
    run(&StructuredSurface::new(doc).with_selection(sel))
}

/// Same popup, same auto-select behaviour, same selected length.
fn assert_parity(a: &Intent, b: &Intent) {
    assert_eq!(a.kind.mode(), b.kind.mode(), "{a:?} vs {b:?}");
    assert_eq!(a.auto_selected, b.auto_selected, "{a:?} vs {b:?}");
    assert_eq!(
        a.select.map(|r| r.len()),
        b.select.map(|r| r.len()),
        "{a:?} vs {b:?}"
    );
}

fn check_this_out() -> Node {
    Node::doc(vec![Node::paragraph(vec![
        Inline::text("Check "),
        Inline::marked("this", vec![Mark::Emphasis]),
        Inline::text(" out"),
    ])])
}

#[test]
fn emphasis_auto_selects_content() {
    let a = flat("Check *this* out", Selection::collapsed(8));
    let b = structured(check_this_out(), Selection::collapsed(8));
    assert_parity(&a, &b);
    assert_eq!(a.kind, IntentKind::Format { from: 7, to: 11 });
    assert_eq!(b.kind, IntentKind::Format { from: 7, to: 11 });
}

#[test]
fn code_block_wins() {
    let a = flat("x\n\n```rust\nfn main() {}\n```", Selection::collapsed(13));
    let b = structured(
        Node::doc(vec![
            Node::paragraph(vec![Inline::text("x")]),
            Node::code_block(Some("rust"), "fn main() {}"),
        ]),
        Selection::collapsed(6),
    );
    assert_parity(&a, &b);
    for intent in [a, b] {
        match intent.kind {
            IntentKind::Code { language, .. } => assert_eq!(language.as_deref(), Some("rust")),
            other => panic!("expected code, got {other:?}"),
        }
    }
}

#[test]
fn selection_in_table_cell_opens_table() {
    let a = flat("a | b\n---|---\n1 | 2", Selection::new(18, 19));
    let cell = |s: &str, header| Node::textblock(NodeKind::TableCell { header }, vec![Inline::text(s)]);
    let b = structured(
        Node::doc(vec![Node::container(
            NodeKind::Table,
            vec![
                Node::container(NodeKind::TableRow, vec![cell("a", true), cell("b", true)]),
                Node::container(NodeKind::TableRow, vec![cell("1", false), cell("2", false)]),
            ],
        )]),
        Selection::new(14, 15),
    );
    assert_parity(&a, &b);
    for intent in [a, b] {
        match intent.kind {
            IntentKind::Table { table, selection } => {
                assert_eq!((table.row, table.column), (1, 1));
                assert_eq!((table.rows, table.columns), (2, 2));
                assert!(selection.is_some());
            }
            other => panic!("expected table, got {other:?}"),
        }
    }
}

#[test]
fn list_item() {
    let a = flat("- item one", Selection::collapsed(4));
    let b = structured(
        Node::doc(vec![Node::container(
            NodeKind::BulletList,
            vec![Node::container(
                NodeKind::ListItem { checked: None },
                vec![Node::paragraph(vec![Inline::text("item one")])],
            )],
        )]),
        Selection::collapsed(5),
    );
    assert_parity(&a, &b);
    for intent in [a, b] {
        match intent.kind {
            IntentKind::List(list) => {
                assert_eq!(list.kind, ListKind::Bullet);
                assert_eq!(list.depth, 0);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }
}

#[test]
fn heading_level() {
    let a = flat("## Title", Selection::collapsed(5));
    let b = structured(
        Node::doc(vec![Node::heading(2, vec![Inline::text("Title")])]),
        Selection::collapsed(3),
    );
    assert_parity(&a, &b);
    for intent in [a, b] {
        assert!(matches!(intent.kind, IntentKind::Heading { level: 2, .. }));
    }
}

#[test]
fn link_text_auto_selected() {
    let a = flat("a [site](https://x.example)", Selection::collapsed(5));
    let b = structured(
        Node::doc(vec![Node::paragraph(vec![
            Inline::text("a "),
            Inline::marked("site", vec![Mark::link("https://x.example")]),
        ])]),
        Selection::collapsed(5),
    );
    assert_parity(&a, &b);
    assert_eq!(a.kind.mode(), Some(PopupMode::Format));
    assert_eq!(a.select.map(|r| r.len()), Some(4));
}

#[cfg(feature = "unicode-words")]
#[test]
fn bare_word_auto_selected() {
    let a = flat("the cat sat", Selection::collapsed(5));
    let b = structured(
        Node::doc(vec![Node::paragraph(vec![Inline::text("the cat sat")])]),
        Selection::collapsed(6),
    );
    assert_parity(&a, &b);
    assert_eq!(a.select.map(|r| (r.from, r.to)), Some((4, 7)));
    assert_eq!(b.select.map(|r| (r.from, r.to)), Some((5, 8)));
}

#[test]
fn paragraph_start_is_heading_conversion() {
    let a = flat("abc\ndef", Selection::collapsed(4));
    let b = structured(
        Node::doc(vec![
            Node::paragraph(vec![Inline::text("abc")]),
            Node::paragraph(vec![Inline::text("def")]),
        ]),
        Selection::collapsed(6),
    );
    assert_parity(&a, &b);
    for intent in [a, b] {
        assert!(matches!(intent.kind, IntentKind::Heading { level: 0, .. }));
    }
}

#[test]
fn blank_line_inserts_block() {
    let a = flat("abc\n\ndef", Selection::collapsed(4));
    let b = structured(
        Node::doc(vec![
            Node::paragraph(vec![Inline::text("abc")]),
            Node::paragraph(vec![]),
            Node::paragraph(vec![Inline::text("def")]),
        ]),
        Selection::collapsed(6),
    );
    let expected = IntentKind::Insert {
        mode: ContextMode::InsertBlock,
    };
    assert_eq!(a.kind, expected);
    assert_eq!(b.kind, expected);
}

fn image_para() -> Node {
    Node::doc(vec![Node::paragraph(vec![
        Inline::image("x.png", "p"),
        Inline::text(" text"),
    ])])
}

fn math_para() -> Node {
    Node::doc(vec![Node::paragraph(vec![
        Inline::text("so "),
        Inline::math("a+b"),
        Inline::text(" end"),
    ])])
}

fn footnote_para() -> Node {
    Node::doc(vec![Node::paragraph(vec![
        Inline::text("note"),
        Inline::footnote("n1"),
        Inline::text(" end"),
    ])])
}

#[test]
fn cursor_before_leading_image_is_line_start() {
    let a = flat("![p](x.png) text", Selection::collapsed(0));
    let b = structured(image_para(), Selection::collapsed(1));
    assert_parity(&a, &b);
    for intent in [a, b] {
        assert!(matches!(intent.kind, IntentKind::Heading { level: 0, .. }));
    }
}

#[test]
fn image_is_left_to_click() {
    let a = flat("a ![pic](p.png)", Selection::collapsed(5));
    let b = structured(
        Node::doc(vec![Node::paragraph(vec![
            Inline::text("a"),
            Inline::image("p.png", "pic"),
        ])]),
        Selection::new(2, 3),
    );
    assert_parity(&a, &b);
    for intent in [a, b] {
        assert!(matches!(intent.kind, IntentKind::Skip { close: false, .. }));
    }
}

#[test]
fn inline_math_content_auto_selected() {
    let a = flat("so $a+b$ end", Selection::collapsed(5));
    let b = structured(math_para(), Selection::collapsed(6));
    assert_parity(&a, &b);
    assert_eq!(a.select.map(|r| (r.from, r.to)), Some((4, 7)));
    assert_eq!(b.select.map(|r| (r.from, r.to)), Some((5, 8)));
}

#[test]
fn footnote_label_auto_selected() {
    let a = flat("note[^n1] end", Selection::collapsed(7));
    let b = structured(footnote_para(), Selection::collapsed(7));
    assert_parity(&a, &b);
    for intent in [a, b] {
        match intent.kind {
            IntentKind::Footnote { label, from, to } => {
                assert_eq!(label, "n1");
                assert_eq!((from, to), (6, 8));
            }
            other => panic!("expected footnote, got {other:?}"),
        }
    }
}

#[derive(Default)]
struct Popup(Option<PopupMode>);

impl PopupApi for Popup {
    fn open(&mut self, intent: &IntentKind) {
        self.0 = intent.mode();
    }

    fn close(&mut self) {
        self.0 = None;
    }

    fn is_open(&self) -> bool {
        self.0.is_some()
    }

    fn mode(&self) -> Option<PopupMode> {
        self.0
    }
}

/// Open via auto-select, cancel, and check the caret is back where it was.
fn assert_round_trip(surface: &mut dyn SurfaceAdapter, cursor: usize) {
    let mut router = ToolbarRouter::new(Popup::default(), ToolbarConfig::default());
    assert!(router.trigger(surface));
    assert!(router.state().original_cursor_pos.is_some());
    assert_ne!(surface.selection(), Selection::collapsed(cursor));

    assert!(router.close(surface));
    let sel = surface.selection();
    assert_eq!((sel.anchor, sel.head), (cursor, cursor));
    assert!(!router.popup().is_open());
}

#[test]
fn cancel_restores_cursor_on_both_surfaces() {
    let mut source =
        FlatTextSurface::new("Check *this* out").with_selection(Selection::collapsed(8));
    assert_round_trip(&mut source, 8);

    let mut tree = StructuredSurface::new(check_this_out()).with_selection(Selection::collapsed(8));
    assert_round_trip(&mut tree, 8);

    let mut link = FlatTextSurface::new("a [site](https://x.example)")
        .with_selection(Selection::collapsed(5));
    assert_round_trip(&mut link, 5);
}

#[test]
fn cancel_restores_cursor_after_inline_elements() {
    let mut source = FlatTextSurface::new("note[^n1] end").with_selection(Selection::collapsed(7));
    assert_round_trip(&mut source, 7);
    let mut tree = StructuredSurface::new(footnote_para()).with_selection(Selection::collapsed(7));
    assert_round_trip(&mut tree, 7);

    let mut source = FlatTextSurface::new("so $a+b$ end").with_selection(Selection::collapsed(5));
    assert_round_trip(&mut source, 5);
    let mut tree = StructuredSurface::new(math_para()).with_selection(Selection::collapsed(6));
    assert_round_trip(&mut tree, 6);
}

#[cfg(feature = "unicode-words")]
#[test]
fn cancel_restores_cursor_after_word() {
    let mut source = FlatTextSurface::new("the cat sat").with_selection(Selection::collapsed(5));
    assert_round_trip(&mut source, 5);
    let mut tree = StructuredSurface::new(Node::doc(vec![Node::paragraph(vec![Inline::text(
        "the cat sat",
    )])]))
    .with_selection(Selection::collapsed(6));
    assert_round_trip(&mut tree, 6);
}
