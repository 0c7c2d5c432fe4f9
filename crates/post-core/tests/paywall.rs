use buletin_post_core::{
    Document, Editor, FormatEngine, FormatId, FormatOutcome, Node, PluginRegistry, Point,
    PostType, Selection, has_paid_marker, paid_content, paid_divider, set_post_type,
};

fn editor_with(children: Vec<Node>) -> Editor {
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(Document { children }, selection, PluginRegistry::post())
}

fn count_kind(doc: &Document, kind: &str) -> usize {
    doc.children
        .iter()
        .filter(|n| n.element_kind() == Some(kind))
        .count()
}

#[test]
fn paid_marker_is_appended_once() {
    let mut editor = editor_with(vec![Node::paragraph("Body")]);

    assert!(set_post_type(&mut editor, PostType::Paid).unwrap());
    assert!(!set_post_type(&mut editor, PostType::Paid).unwrap());

    assert_eq!(count_kind(editor.doc(), "paid_divider"), 1);
    assert_eq!(count_kind(editor.doc(), "paid_content"), 1);
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("Body"), paid_divider(), paid_content()]
    );
    assert_eq!(editor.selection().focus, Point::new(vec![2, 0, 0], 0));
    assert!(editor.run_query::<bool>("paywall.has_marker", None).unwrap());
}

#[test]
fn marker_goes_to_the_end_regardless_of_caret() {
    let mut editor = editor_with(vec![Node::paragraph("first"), Node::paragraph("second")]);
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 2)));

    set_post_type(&mut editor, PostType::Paid).unwrap();

    assert_eq!(editor.doc().children[0], Node::paragraph("first"));
    assert_eq!(editor.doc().children[1], Node::paragraph("second"));
    assert_eq!(editor.doc().children[2], paid_divider());
}

#[test]
fn free_paid_free_restores_the_document_exactly() {
    let mut editor = editor_with(vec![Node::heading(1, "Title"), Node::paragraph("Body")]);
    let before = serde_json::to_string(editor.doc()).unwrap();

    set_post_type(&mut editor, PostType::Paid).unwrap();
    set_post_type(&mut editor, PostType::Free).unwrap();

    assert_eq!(serde_json::to_string(editor.doc()).unwrap(), before);
}

#[test]
fn marker_presence_tracks_post_type() {
    let mut editor = editor_with(vec![Node::paragraph("Body")]);
    let sequence = [
        PostType::Free,
        PostType::Paid,
        PostType::Paid,
        PostType::Free,
        PostType::Free,
        PostType::Paid,
        PostType::Free,
        PostType::Paid,
    ];

    for post_type in sequence {
        set_post_type(&mut editor, post_type).unwrap();
        assert_eq!(
            has_paid_marker(editor.doc()),
            post_type == PostType::Paid,
            "after {post_type}"
        );
        assert!(count_kind(editor.doc(), "paid_divider") <= 1);
        assert!(count_kind(editor.doc(), "paid_content") <= 1);
    }
}

#[test]
fn removing_marker_moves_caret_before_it() {
    let mut editor = editor_with(vec![Node::paragraph("Body")]);
    set_post_type(&mut editor, PostType::Paid).unwrap();
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "secret" })))
        .unwrap();

    set_post_type(&mut editor, PostType::Free).unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("Body")]);
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 4));
}

#[test]
fn paid_marker_on_empty_post_keeps_leading_paragraph() {
    let mut editor = Editor::with_post_plugins();
    set_post_type(&mut editor, PostType::Paid).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph(""), paid_divider(), paid_content()]
    );

    set_post_type(&mut editor, PostType::Free).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
}

#[test]
fn stray_paid_content_is_replaced_on_insert() {
    let mut editor = editor_with(vec![
        Node::paragraph("Body"),
        Node::element("paid_content", Default::default(), vec![Node::paragraph("old")]),
    ]);
    assert!(!has_paid_marker(editor.doc()));

    set_post_type(&mut editor, PostType::Paid).unwrap();

    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("Body"), paid_divider(), paid_content()]
    );
}

#[test]
fn normalize_repairs_duplicate_and_orphaned_markers() {
    let editor = editor_with(vec![
        Node::paragraph("Body"),
        paid_divider(),
        paid_content(),
        paid_divider(),
        paid_content(),
    ]);
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("Body"), paid_divider(), paid_content()]
    );

    let editor = editor_with(vec![Node::paragraph("Body"), paid_divider()]);
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("Body"), paid_divider(), paid_content()]
    );
}

#[test]
fn post_type_parses_and_toggles() {
    assert_eq!("paid".parse::<PostType>(), Ok(PostType::Paid));
    assert!("premium".parse::<PostType>().is_err());
    assert_eq!(PostType::Free.toggled(), PostType::Paid);
    assert_eq!(
        serde_json::to_value(PostType::Paid).unwrap(),
        serde_json::json!("paid")
    );
}

fn url_prompt() -> impl FnMut(&str, &str) -> Option<String> {
    |_, _| Some("https://buletin.co/cover.png".to_string())
}

/// Paths of every divider and paid region, at any depth.
fn marker_paths(doc: &Document) -> Vec<Vec<usize>> {
    fn walk(children: &[Node], path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            if matches!(node.element_kind(), Some("paid_divider" | "paid_content")) {
                out.push(path.clone());
            }
            if let Node::Element(el) = node {
                walk(&el.children, path, out);
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

fn assert_single_top_level_marker(doc: &Document, context: &str) {
    let paths = marker_paths(doc);
    assert_eq!(paths.len(), 2, "{context}: {paths:?}");
    assert_eq!(paths[0].len(), 1, "{context}: divider nested at {:?}", paths[0]);
    assert_eq!(doc.children[paths[0][0]], paid_divider(), "{context}");
    assert_eq!(paths[1], vec![paths[0][0] + 1], "{context}");
    assert!(has_paid_marker(doc), "{context}");
}

fn paid_post() -> Editor {
    let mut editor = editor_with(vec![
        Node::paragraph("free"),
        paid_divider(),
        Node::element("paid_content", Default::default(), vec![Node::paragraph("paid")]),
    ]);
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![2, 0, 0], 2),
    });
    editor
}

#[test]
fn quote_across_the_divider_stops_before_it() {
    let mut editor = paid_post();
    let mut engine = FormatEngine::new();

    let outcome = engine
        .apply(&mut editor, FormatId::Quote, &mut url_prompt())
        .unwrap();

    assert_eq!(outcome, FormatOutcome::Applied);
    assert_eq!(
        editor.doc().children,
        vec![
            Node::element("blockquote", Default::default(), vec![Node::paragraph("free")]),
            paid_divider(),
            Node::element("paid_content", Default::default(), vec![Node::paragraph("paid")]),
        ]
    );
    assert_single_top_level_marker(editor.doc(), "quote");

    set_post_type(&mut editor, PostType::Free).unwrap();
    assert!(marker_paths(editor.doc()).is_empty());
}

#[test]
fn quote_starting_in_the_paid_region_stays_inside_it() {
    let mut editor = paid_post();
    editor.set_selection(Selection::collapsed(Point::new(vec![2, 0, 0], 1)));

    FormatEngine::new()
        .apply(&mut editor, FormatId::Quote, &mut url_prompt())
        .unwrap();

    let Node::Element(region) = &editor.doc().children[2] else {
        panic!("expected paid region");
    };
    assert_eq!(region.children[0].element_kind(), Some("blockquote"));
    assert_single_top_level_marker(editor.doc(), "quote in paid region");
}

#[test]
fn every_format_across_the_divider_keeps_the_marker() {
    for id in FormatId::ALL {
        let mut editor = paid_post();
        let mut engine = FormatEngine::new();

        // Some formats reject a range like this; only the marker matters here.
        engine.apply(&mut editor, id, &mut url_prompt()).ok();

        assert_single_top_level_marker(editor.doc(), id.as_str());
        assert!(set_post_type(&mut editor, PostType::Free).unwrap(), "{id}");
        assert!(marker_paths(editor.doc()).is_empty(), "{id}");
    }
}

#[test]
fn typing_over_the_divider_keeps_the_marker() {
    let mut editor = paid_post();

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "x" })))
        .ok();

    assert_single_top_level_marker(editor.doc(), "text.insert");
}

#[test]
fn formats_on_a_free_post_never_add_a_marker() {
    for id in FormatId::ALL {
        let mut editor = editor_with(vec![Node::paragraph("one"), Node::paragraph("two")]);
        editor.set_selection(Selection {
            anchor: Point::new(vec![0, 0], 1),
            focus: Point::new(vec![1, 0], 2),
        });

        FormatEngine::new()
            .apply(&mut editor, id, &mut url_prompt())
            .ok();

        assert!(marker_paths(editor.doc()).is_empty(), "{id}");
        assert!(!has_paid_marker(editor.doc()), "{id}");
    }
}
