use std::time::Instant;

use buletin_post_core::{Document, Node};
use buletin_post_editor::{
    PostEditorSession, PostMetadata, PostType, SessionConfig, SubmitKind, SubmitPayload,
};
use serde_json::json;

#[test]
fn paid_publish_payload() {
    let doc = Document {
        children: vec![Node::paragraph("Body")],
    };
    let metadata = PostMetadata {
        title: "Hello World".into(),
        subtitle: "Sub".into(),
        post_type: PostType::Paid,
        ..Default::default()
    };
    let mut session =
        PostEditorSession::with_document(SessionConfig::default(), doc, metadata).unwrap();

    let payload = session.submit(SubmitKind::Publish).unwrap();

    assert!(payload.has_paid_marker);
    assert_eq!(payload.custom_slug, "");
    assert!(
        payload
            .content
            .starts_with("<p>Body</p><div class=\"paid-content-line\">")
    );
    assert!(payload.content.contains("PAID CONTENTS BELOW THIS LINE"));
    assert!(
        payload
            .content
            .ends_with("<div class=\"paid-content\"><p><br></p></div>")
    );

    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["kind"], json!("publish"));
    assert_eq!(value["post_type"], json!("paid"));
    assert_eq!(value["has_paid_marker"], json!(true));
}

#[test]
fn custom_slug_is_only_sent_when_enabled() {
    let now = Instant::now();
    let mut session = PostEditorSession::new(SessionConfig::default());
    session.set_title("My First Post", now).unwrap();

    session.set_custom_slug_enabled(true).unwrap();
    assert_eq!(session.metadata().slug.custom(), "my-first-post");
    session.set_custom_slug("first").unwrap();
    assert_eq!(session.submit(SubmitKind::Draft).unwrap().custom_slug, "first");

    session.set_custom_slug_enabled(false).unwrap();
    assert_eq!(session.submit(SubmitKind::Draft).unwrap().custom_slug, "");
}

#[test]
fn free_draft_has_no_marker() {
    let metadata = PostMetadata::default();
    let doc = Document {
        children: vec![Node::heading(1, "Title")],
    };

    let payload = SubmitPayload::build(SubmitKind::Draft, &metadata, &doc);

    assert!(!payload.has_paid_marker);
    assert_eq!(payload.post_type, PostType::Free);
    assert_eq!(payload.content, "<h1>Title</h1>");
}
