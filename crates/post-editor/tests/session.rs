use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use buletin_post_core::{FormatId, FormatOutcome, Node, Point, Selection, has_paid_marker};
use buletin_post_editor::{
    PostEditorSession, PostType, SessionConfig, SessionError, SessionEvent, SubmitKind,
};

fn no_prompt() -> impl FnMut(&str, &str) -> Option<String> {
    |_, _| None
}

fn recorder(session: &mut PostEditorSession) -> Rc<RefCell<Vec<SessionEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    session.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

#[test]
fn typing_fills_the_first_paragraph() {
    let now = Instant::now();
    let mut session = PostEditorSession::new(SessionConfig::default());

    session.insert_text("Hello", now).unwrap();

    assert_eq!(session.doc().children, vec![Node::paragraph("Hello")]);
    assert!(session.autosave_pending());
    assert_eq!(session.snapshot_html(), "<p>Hello</p>");
}

#[test]
fn new_session_starts_in_a_left_aligned_paragraph() {
    let session = PostEditorSession::new(SessionConfig::default());

    assert!(session.active_formats().contains(FormatId::Paragraph));
    assert!(session.active_formats().contains(FormatId::AlignLeft));
    assert!(!session.focus_mode());
}

#[test]
fn applying_a_format_notifies_listeners() {
    let now = Instant::now();
    let mut session = PostEditorSession::new(SessionConfig::default());
    session.insert_text("Hello", now).unwrap();
    let events = recorder(&mut session);

    session
        .set_selection(Selection {
            anchor: Point::new(vec![0, 0], 0),
            focus: Point::new(vec![0, 0], 5),
        })
        .unwrap();
    let outcome = session
        .apply_format(FormatId::Bold, &mut no_prompt(), now)
        .unwrap();

    assert_eq!(outcome, FormatOutcome::Applied);
    assert!(session.active_formats().contains(FormatId::Bold));
    let events = events.borrow();
    assert!(matches!(
        events.last(),
        Some(SessionEvent::ActiveFormatsChanged(active)) if active.contains(FormatId::Bold)
    ));
}

#[test]
fn focus_mode_does_not_touch_the_document() {
    let now = Instant::now();
    let mut session = PostEditorSession::new(SessionConfig::default());

    let outcome = session
        .apply_format(FormatId::FocusMode, &mut no_prompt(), now)
        .unwrap();

    assert_eq!(outcome, FormatOutcome::FocusModeToggled);
    assert!(session.focus_mode());
    assert!(session.active_formats().contains(FormatId::FocusMode));
    assert!(!session.autosave_pending());
}

#[test]
fn blurred_session_ignores_formats() {
    let now = Instant::now();
    let mut session = PostEditorSession::new(SessionConfig::default());
    session.blur().unwrap();

    let outcome = session
        .apply_format(FormatId::Heading1, &mut no_prompt(), now)
        .unwrap();

    assert_eq!(outcome, FormatOutcome::NoSelection);
    assert_eq!(session.doc().children, vec![Node::paragraph("")]);
    assert!(session.active_formats().is_empty());
}

#[test]
fn post_type_change_inserts_marker_and_emits() {
    let now = Instant::now();
    let mut session = PostEditorSession::new(SessionConfig::default());
    let events = recorder(&mut session);

    assert!(session.set_post_type(PostType::Paid, now).unwrap());

    assert!(has_paid_marker(session.doc()));
    assert_eq!(session.metadata().post_type, PostType::Paid);
    assert!(
        events
            .borrow()
            .iter()
            .any(|e| matches!(e, SessionEvent::PostTypeChanged(PostType::Paid)))
    );

    assert!(session.set_post_type(PostType::Free, now).unwrap());
    assert!(!has_paid_marker(session.doc()));
}

#[test]
fn undo_keeps_the_marker_while_paid() {
    let now = Instant::now();
    let mut session = PostEditorSession::new(SessionConfig::default());
    session.set_post_type(PostType::Paid, now).unwrap();

    assert!(session.undo(now).unwrap());

    assert!(has_paid_marker(session.doc()));
}

#[test]
fn undo_reverts_text_while_free() {
    let now = Instant::now();
    let mut session = PostEditorSession::new(SessionConfig::default());
    session.insert_text("Hello", now).unwrap();

    assert!(session.undo(now).unwrap());
    assert_eq!(session.doc().children, vec![Node::paragraph("")]);
    assert!(session.redo(now).unwrap());
    assert_eq!(session.doc().children, vec![Node::paragraph("Hello")]);
}

#[test]
fn resumed_paid_post_gets_its_marker() {
    let doc = buletin_post_core::Document {
        children: vec![Node::paragraph("Body")],
    };
    let metadata = buletin_post_editor::PostMetadata {
        post_type: PostType::Paid,
        ..Default::default()
    };

    let session = PostEditorSession::with_document(SessionConfig::default(), doc, metadata).unwrap();

    assert!(has_paid_marker(session.doc()));
    assert_eq!(session.doc().children[0], Node::paragraph("Body"));
}

#[test]
fn submit_emits_payload() {
    let now = Instant::now();
    let mut session = PostEditorSession::new(SessionConfig::default());
    session.set_title("Hello World", now).unwrap();
    let events = recorder(&mut session);

    let payload = session.submit(SubmitKind::Draft).unwrap();

    assert_eq!(payload.kind, SubmitKind::Draft);
    assert_eq!(payload.title, "Hello World");
    assert_eq!(
        events.borrow().as_slice(),
        &[SessionEvent::Submitted(payload.clone())]
    );
}

#[test]
fn unsubscribed_listener_hears_nothing() {
    let mut session = PostEditorSession::new(SessionConfig::default());
    let events = Rc::new(RefCell::new(0usize));
    let sink = events.clone();
    let id = session.subscribe(move |_| *sink.borrow_mut() += 1);

    assert!(session.unsubscribe(id));
    assert!(!session.unsubscribe(id));
    session.submit(SubmitKind::Publish).unwrap();

    assert_eq!(*events.borrow(), 0);
}

#[test]
fn closed_session_rejects_mutations() {
    let now = Instant::now();
    let mut session = PostEditorSession::new(SessionConfig::default());
    session.insert_text("Hello", now).unwrap();
    let events = recorder(&mut session);

    session.close();

    assert!(session.is_closed());
    assert!(!session.autosave_pending());
    assert!(matches!(
        session.insert_text("!", now),
        Err(SessionError::Closed)
    ));
    assert!(matches!(
        session.apply_format(FormatId::Bold, &mut no_prompt(), now),
        Err(SessionError::Closed)
    ));
    assert!(matches!(
        session.set_post_type(PostType::Paid, now),
        Err(SessionError::Closed)
    ));
    assert!(matches!(session.tick(now), Err(SessionError::Closed)));
    assert_eq!(session.doc().children, vec![Node::paragraph("Hello")]);
    assert!(events.borrow().is_empty());
}

fn url_prompt() -> impl FnMut(&str, &str) -> Option<String> {
    |_, _| Some("https://buletin.co/cover.png".to_string())
}

fn session_for(post_type: PostType) -> PostEditorSession {
    let doc = buletin_post_core::Document {
        children: vec![Node::paragraph("free"), Node::paragraph("more")],
    };
    let metadata = buletin_post_editor::PostMetadata {
        post_type,
        ..Default::default()
    };
    let mut session =
        PostEditorSession::with_document(SessionConfig::default(), doc, metadata).unwrap();
    // A paid post starts with the caret in the paid region.
    if post_type == PostType::Paid {
        session.insert_text("x", Instant::now()).unwrap();
    }
    let last = session.doc().children.len() - 1;
    let end = if post_type == PostType::Paid {
        Point::new(vec![last, 0, 0], 0)
    } else {
        Point::new(vec![last, 0], 2)
    };
    session
        .set_selection(Selection {
            anchor: Point::new(vec![0, 0], 1),
            focus: end,
        })
        .unwrap();
    session
}

#[test]
fn formats_across_the_divider_keep_marker_in_step_with_post_type() {
    let now = Instant::now();
    for post_type in [PostType::Paid, PostType::Free] {
        for id in FormatId::ALL {
            let mut session = session_for(post_type);

            session.apply_format(id, &mut url_prompt(), now).ok();

            assert_eq!(
                has_paid_marker(session.doc()),
                post_type == PostType::Paid,
                "{id} on a {post_type} post"
            );
            let dividers = session
                .doc()
                .children
                .iter()
                .filter(|n| n.element_kind() == Some("paid_divider"))
                .count();
            assert_eq!(dividers, usize::from(post_type == PostType::Paid), "{id}");
        }
    }
}

#[test]
fn quote_across_the_divider_then_free_leaves_no_marker() {
    let now = Instant::now();
    let mut session = session_for(PostType::Paid);

    session
        .apply_format(FormatId::Quote, &mut url_prompt(), now)
        .unwrap();
    assert!(has_paid_marker(session.doc()));
    session.set_post_type(PostType::Free, now).unwrap();

    assert!(!has_paid_marker(session.doc()));
    assert!(!session.snapshot_html().contains("paid-content"));
}
