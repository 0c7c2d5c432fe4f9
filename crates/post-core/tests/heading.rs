use buletin_post_core::{
    Attrs, Document, Editor, ElementNode, FormatEngine, FormatId, Node, PluginRegistry, Point,
    Selection,
};

fn editor_with(children: Vec<Node>) -> Editor {
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(Document { children }, selection, PluginRegistry::post())
}

fn no_prompt() -> impl FnMut(&str, &str) -> Option<String> {
    |_, _| None
}

#[test]
fn set_type_turns_paragraph_into_heading_and_back() {
    let mut editor = editor_with(vec![Node::paragraph("Title")]);

    editor
        .run_command("block.set_type", Some(serde_json::json!({ "type": "h2" })))
        .unwrap();
    assert_eq!(
        editor
            .run_query::<Option<u64>>("block.heading_level", None)
            .unwrap(),
        Some(2)
    );
    assert_eq!(editor.doc().children, vec![Node::heading(2, "Title")]);

    editor
        .run_command("block.set_type", Some(serde_json::json!({ "type": "p" })))
        .unwrap();
    assert_eq!(
        editor
            .run_query::<Option<u64>>("block.heading_level", None)
            .unwrap(),
        None
    );
    assert_eq!(editor.doc().children, vec![Node::paragraph("Title")]);
}

#[test]
fn heading_two_replaces_heading_one() {
    let mut editor = editor_with(vec![Node::paragraph("Title")]);
    let mut engine = FormatEngine::new();

    engine
        .apply(&mut editor, FormatId::Heading1, &mut no_prompt())
        .unwrap();
    let active = engine.active_formats(&editor);
    assert!(active.contains(FormatId::Heading1));
    assert!(!active.contains(FormatId::Paragraph));

    engine
        .apply(&mut editor, FormatId::Heading2, &mut no_prompt())
        .unwrap();
    let active = engine.active_formats(&editor);
    assert!(active.contains(FormatId::Heading2));
    assert!(!active.contains(FormatId::Heading1));
    assert!(!active.contains(FormatId::Paragraph));
}

#[test]
fn set_type_rejects_unknown_type() {
    let mut editor = editor_with(vec![Node::paragraph("Title")]);

    let err = editor
        .run_command("block.set_type", Some(serde_json::json!({ "type": "h9" })))
        .unwrap_err();
    assert_eq!(err.message(), "Unknown block type: h9");
    assert_eq!(editor.doc().children, vec![Node::paragraph("Title")]);
}

#[test]
fn set_type_keeps_alignment() {
    let mut attrs = Attrs::default();
    attrs.insert("align".to_string(), serde_json::json!("center"));
    let mut editor = editor_with(vec![Node::element(
        "paragraph",
        attrs,
        vec![Node::text("Title")],
    )]);

    editor
        .run_command("block.set_type", Some(serde_json::json!({ "type": "h1" })))
        .unwrap();

    let Node::Element(block) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    assert_eq!(block.kind, "heading");
    assert_eq!(block.attr_str("align"), Some("center"));
    assert_eq!(block.attr_u64("level"), Some(1));
}

#[test]
fn heading_normalize_clamps_level_attr() {
    let mut attrs = Attrs::default();
    attrs.insert("level".to_string(), serde_json::json!(42));
    let editor = editor_with(vec![Node::Element(ElementNode {
        kind: "heading".to_string(),
        attrs,
        children: vec![Node::text("x")],
    })]);

    let Node::Element(block) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    assert_eq!(block.kind, "heading");
    assert_eq!(block.attr_u64("level"), Some(6));
}
