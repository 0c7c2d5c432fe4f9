use buletin_post_core::{
    Document, Editor, FormatEngine, FormatId, FormatOutcome, Marks, Node, PluginRegistry, Point,
    Selection, TextNode,
};

fn editor_with_text(text: &str) -> Editor {
    let doc = Document {
        children: vec![Node::paragraph(text)],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, PluginRegistry::post())
}

fn select(editor: &mut Editor, from: usize, to: usize) {
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], from),
        focus: Point::new(vec![0, 0], to),
    });
}

fn no_prompt() -> impl FnMut(&str, &str) -> Option<String> {
    |_, _| None
}

#[test]
fn toggle_bold_on_range_splits_and_merges_back() {
    let mut editor = editor_with_text("hello world");
    select(&mut editor, 0, 5);

    editor.run_command("marks.toggle_bold", None).unwrap();

    let Node::Element(block) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    assert_eq!(
        block.children,
        vec![
            Node::Text(TextNode {
                text: "hello".to_string(),
                marks: Marks {
                    bold: true,
                    ..Marks::default()
                },
            }),
            Node::text(" world"),
        ]
    );
    assert!(
        editor
            .run_query::<bool>("marks.is_bold_active", None)
            .unwrap()
    );

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("hello world")]);
}

#[test]
fn bold_at_collapsed_caret_applies_to_typed_text() {
    let mut editor = Editor::with_post_plugins();
    let mut engine = FormatEngine::new();

    let outcome = engine
        .apply(&mut editor, FormatId::Bold, &mut no_prompt())
        .unwrap();
    assert_eq!(outcome, FormatOutcome::Applied);

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "Hi" })))
        .unwrap();

    let Node::Element(block) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    let Node::Text(leaf) = &block.children[0] else {
        panic!("expected text leaf");
    };
    assert_eq!(leaf.text, "Hi");
    assert!(leaf.marks.bold);
    assert!(engine.active_formats(&editor).contains(FormatId::Bold));
}

#[test]
fn subscript_and_superscript_exclude_each_other() {
    let mut editor = editor_with_text("x2");
    select(&mut editor, 1, 2);

    editor.run_command("marks.toggle_subscript", None).unwrap();
    assert!(
        editor
            .run_query::<bool>("marks.is_subscript_active", None)
            .unwrap()
    );

    editor.run_command("marks.toggle_superscript", None).unwrap();
    let marks: Marks = editor.run_query("marks.get_active", None).unwrap();
    assert!(marks.superscript);
    assert!(!marks.subscript);
}

#[test]
fn range_mark_query_requires_every_selected_leaf() {
    let mut editor = editor_with_text("hello world");
    select(&mut editor, 0, 5);
    editor.run_command("marks.toggle_italic", None).unwrap();

    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 1], 6),
    });
    assert!(
        !editor
            .run_query::<bool>("marks.is_italic_active", None)
            .unwrap()
    );

    editor.run_command("marks.toggle_italic", None).unwrap();
    assert!(
        editor
            .run_query::<bool>("marks.is_italic_active", None)
            .unwrap()
    );
}

#[test]
fn set_and_unset_link_on_range() {
    let mut editor = editor_with_text("site");
    select(&mut editor, 0, 4);

    editor
        .run_command(
            "marks.set_link",
            Some(serde_json::json!({ "url": "https://buletin.co" })),
        )
        .unwrap();
    assert!(
        editor
            .run_query::<bool>("marks.has_link_active", None)
            .unwrap()
    );

    editor.run_command("marks.unset_link", None).unwrap();
    assert!(
        !editor
            .run_query::<bool>("marks.has_link_active", None)
            .unwrap()
    );
    assert_eq!(editor.doc().children, vec![Node::paragraph("site")]);
}

#[test]
fn set_link_requires_url_arg() {
    let mut editor = editor_with_text("site");
    select(&mut editor, 0, 4);

    let err = editor.run_command("marks.set_link", None).unwrap_err();
    assert_eq!(err.message(), "Missing args.url");
    assert_eq!(editor.doc().children, vec![Node::paragraph("site")]);
}
