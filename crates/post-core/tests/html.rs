use buletin_post_core::{
    Attrs, Document, Marks, Node, TextNode, paid_content, paid_divider, table_template, to_html,
};

fn attrs(pairs: &[(&str, serde_json::Value)]) -> Attrs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn list_item(list_type: &str, level: u64, children: Vec<Node>) -> Node {
    let mut attrs = attrs(&[("list_type", serde_json::json!(list_type))]);
    if level > 0 {
        attrs.insert("list_level".to_string(), serde_json::json!(level));
    }
    Node::element("list_item", attrs, children)
}

fn html(children: Vec<Node>) -> String {
    to_html(&Document { children })
}

#[test]
fn blocks_and_marks_render_as_markup() {
    let heading = Node::element(
        "heading",
        attrs(&[
            ("level", serde_json::json!(1)),
            ("align", serde_json::json!("center")),
        ]),
        vec![Node::text("Title")],
    );
    let paragraph = Node::element(
        "paragraph",
        Attrs::default(),
        vec![
            Node::text("Hi "),
            Node::Text(TextNode {
                text: "there".to_string(),
                marks: Marks {
                    bold: true,
                    link: Some("https://buletin.co".to_string()),
                    ..Marks::default()
                },
            }),
        ],
    );

    assert_eq!(
        html(vec![heading, paragraph]),
        "<h1 style=\"text-align: center\">Title</h1>\
         <p>Hi <a href=\"https://buletin.co\"><strong>there</strong></a></p>"
    );
}

#[test]
fn list_items_group_and_nest() {
    let doc = vec![
        list_item("bulleted", 0, vec![Node::text("a")]),
        list_item("bulleted", 1, vec![Node::text("b")]),
        list_item("bulleted", 0, vec![Node::text("c")]),
        list_item("ordered", 0, vec![Node::text("d")]),
    ];
    assert_eq!(
        html(doc),
        "<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul><ol><li>d</li></ol>"
    );
}

#[test]
fn check_list_renders_checkbox_input() {
    let doc = vec![
        list_item("check", 0, vec![Node::checkbox(true), Node::text("done")]),
        list_item("check", 0, vec![Node::checkbox(false), Node::text("todo")]),
    ];
    assert_eq!(
        html(doc),
        "<ul class=\"check-list\">\
         <li><input type=\"checkbox\" checked> done</li>\
         <li><input type=\"checkbox\"> todo</li></ul>"
    );
}

#[test]
fn voids_tables_and_escaping() {
    let doc = vec![
        Node::image("https://cdn.buletin.co/cat.png", Some("A \"cat\"".to_string())),
        table_template(),
        Node::paragraph("a < b & c"),
        Node::paragraph(""),
    ];
    assert_eq!(
        html(doc),
        "<img src=\"https://cdn.buletin.co/cat.png\" alt=\"A &quot;cat&quot;\">\
         <table><tbody><tr><th>Header 1</th><th>Header 2</th></tr>\
         <tr><td>Cell 1</td><td>Cell 2</td></tr></tbody></table>\
         <p>a &lt; b &amp; c</p><p><br></p>"
    );
}

#[test]
fn paid_marker_renders_divider_and_region() {
    let doc = vec![
        Node::paragraph("Free"),
        paid_divider(),
        Node::element("paid_content", Attrs::default(), vec![Node::paragraph("secret")]),
    ];
    assert_eq!(
        html(doc),
        "<p>Free</p>\
         <div class=\"paid-content-line\"><div class=\"paid-content-divider\">\
         <div class=\"divider-line\"></div>\
         <div class=\"paid-content-label\"><span class=\"paid-icon\"></span>PAID CONTENTS BELOW THIS LINE</div>\
         <div class=\"divider-line\"></div></div></div>\
         <div class=\"paid-content\"><p>secret</p></div>"
    );
    assert!(html(vec![paid_content()]).ends_with("<p><br></p></div>"));
}

#[test]
fn quotes_and_code_blocks() {
    let doc = vec![
        Node::element("blockquote", Attrs::default(), vec![Node::paragraph("wise")]),
        Node::element("code_block", Attrs::default(), vec![Node::text("let x = 1;")]),
    ];
    assert_eq!(
        html(doc),
        "<blockquote><p>wise</p></blockquote><pre><code>let x = 1;</code></pre>"
    );
}
