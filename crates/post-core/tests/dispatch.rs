use buletin_post_core::{
    Document, Editor, FormatEngine, FormatId, FormatOutcome, LINK_PROMPT, Marks, Node,
    PluginRegistry, Point, Selection, TextNode,
};

fn editor_with_text(text: &str) -> Editor {
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(
        Document {
            children: vec![Node::paragraph(text)],
        },
        selection,
        PluginRegistry::post(),
    )
}

fn no_prompt() -> impl FnMut(&str, &str) -> Option<String> {
    |_, _| None
}

#[test]
fn focus_mode_toggles_without_touching_the_document() {
    let mut editor = editor_with_text("text");
    let mut engine = FormatEngine::new();
    let before = editor.doc().clone();

    let outcome = engine
        .apply(&mut editor, FormatId::FocusMode, &mut no_prompt())
        .unwrap();
    assert_eq!(outcome, FormatOutcome::FocusModeToggled);
    assert!(engine.focus_mode());
    assert!(engine.active_formats(&editor).contains(FormatId::FocusMode));
    assert_eq!(editor.doc(), &before);
    assert!(!editor.can_undo());

    engine
        .apply(&mut editor, FormatId::FocusMode, &mut no_prompt())
        .unwrap();
    assert!(!engine.focus_mode());
}

#[test]
fn every_format_is_a_no_op_without_selection() {
    let mut editor = editor_with_text("text");
    let mut engine = FormatEngine::new();
    editor.blur();

    for id in FormatId::ALL {
        let outcome = engine.apply(&mut editor, id, &mut no_prompt()).unwrap();
        assert_eq!(outcome, FormatOutcome::NoSelection, "{id}");
    }
    assert_eq!(editor.doc().children, vec![Node::paragraph("text")]);
    assert!(!engine.focus_mode());
}

#[test]
fn link_uses_prompted_url() {
    let mut editor = editor_with_text("site");
    let mut engine = FormatEngine::new();
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 0], 4),
    });

    let mut messages: Vec<String> = Vec::new();
    let outcome = {
        let mut prompt = |message: &str, _: &str| {
            messages.push(message.to_string());
            Some("  https://buletin.co  ".to_string())
        };
        engine
            .apply(&mut editor, FormatId::Link, &mut prompt)
            .unwrap()
    };

    assert_eq!(outcome, FormatOutcome::Applied);
    assert_eq!(messages, vec![LINK_PROMPT.to_string()]);
    assert_eq!(
        editor.doc().children,
        vec![Node::element(
            "paragraph",
            Default::default(),
            vec![Node::Text(TextNode {
                text: "site".to_string(),
                marks: Marks {
                    link: Some("https://buletin.co".to_string()),
                    ..Marks::default()
                },
            })],
        )]
    );
}

#[test]
fn cancelled_link_prompt_changes_nothing() {
    let mut editor = editor_with_text("site");
    let mut engine = FormatEngine::new();

    let outcome = engine
        .apply(&mut editor, FormatId::Link, &mut no_prompt())
        .unwrap();

    assert_eq!(outcome, FormatOutcome::Cancelled);
    assert_eq!(editor.doc().children, vec![Node::paragraph("site")]);
}
