//! Deterministic HTML snapshot of a post body, used for previews and submission.

use std::fmt::Write as _;

use crate::blocks::block_alignment;
use crate::core::{Document, ElementNode, Marks, Node, VoidNode};

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn to_html(doc: &Document) -> String {
    let mut out = String::new();
    render_blocks(&doc.children, &mut out);
    out
}

fn render_blocks(nodes: &[Node], out: &mut String) {
    let mut ix = 0;
    while ix < nodes.len() {
        let run = nodes[ix..]
            .iter()
            .take_while(|n| matches!(n, Node::Element(el) if el.kind == "list_item"))
            .count();
        if run > 0 {
            let items: Vec<&ElementNode> = nodes[ix..ix + run]
                .iter()
                .filter_map(|n| match n {
                    Node::Element(el) => Some(el),
                    _ => None,
                })
                .collect();
            render_list_run(&items, out);
            ix += run;
            continue;
        }
        render_block(&nodes[ix], out);
        ix += 1;
    }
}

fn list_tags(list_type: &str) -> (&'static str, &'static str) {
    match list_type {
        "ordered" => ("<ol>", "</ol>"),
        "check" => ("<ul class=\"check-list\">", "</ul>"),
        _ => ("<ul>", "</ul>"),
    }
}

/// Consecutive list items become nested lists following `list_level`.
fn render_list_run(items: &[&ElementNode], out: &mut String) {
    // Open lists, innermost last: (list_type, level). Each has an open <li>.
    let mut stack: Vec<(&str, u64)> = Vec::new();

    for item in items {
        let level = item.attr_u64("list_level").unwrap_or(0);
        let list_type = item.attr_str("list_type").unwrap_or("bulleted");

        while stack.last().is_some_and(|(_, l)| *l > level) {
            if let Some((ty, _)) = stack.pop() {
                out.push_str("</li>");
                out.push_str(list_tags(ty).1);
            }
        }

        match stack.last() {
            Some((ty, l)) if *l == level && *ty == list_type => out.push_str("</li>"),
            Some((ty, l)) if *l == level => {
                out.push_str("</li>");
                out.push_str(list_tags(ty).1);
                stack.pop();
                out.push_str(list_tags(list_type).0);
                stack.push((list_type, level));
            }
            _ => {
                out.push_str(list_tags(list_type).0);
                stack.push((list_type, level));
            }
        }

        out.push_str("<li");
        push_block_style(item, false, out);
        out.push('>');
        render_inline(&item.children, out);
    }

    while let Some((ty, _)) = stack.pop() {
        out.push_str("</li>");
        out.push_str(list_tags(ty).1);
    }
}

fn push_block_style(el: &ElementNode, with_indent: bool, out: &mut String) {
    let mut rules: Vec<String> = Vec::new();
    let align = block_alignment(el);
    if align != "left" {
        rules.push(format!("text-align: {align}"));
    }
    if with_indent {
        if let Some(indent) = el.attr_u64("indent").filter(|v| *v > 0) {
            rules.push(format!("margin-left: {}px", indent * 40));
        }
    }
    if !rules.is_empty() {
        let _ = write!(out, " style=\"{}\"", rules.join("; "));
    }
}

fn render_block(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => render_text(&t.text, &t.marks, out),
        Node::Void(v) => render_void(v, out),
        Node::Element(el) => render_element(el, out),
    }
}

fn render_element(el: &ElementNode, out: &mut String) {
    match el.kind.as_str() {
        "paragraph" => render_text_block("p", el, out),
        "heading" => {
            let level = el.attr_u64("level").unwrap_or(1).clamp(1, 6);
            render_text_block(&format!("h{level}"), el, out);
        }
        "code_block" => {
            out.push_str("<pre><code>");
            let text: String = el.children.iter().map(Node::plain_text).collect();
            out.push_str(&escape_html(&text));
            out.push_str("</code></pre>");
        }
        "blockquote" => {
            out.push_str("<blockquote>");
            render_blocks(&el.children, out);
            out.push_str("</blockquote>");
        }
        "table" => {
            out.push_str("<table><tbody>");
            render_blocks(&el.children, out);
            out.push_str("</tbody></table>");
        }
        "table_row" => {
            out.push_str("<tr>");
            render_blocks(&el.children, out);
            out.push_str("</tr>");
        }
        "table_cell" => {
            let tag = if el.attrs.get("header").and_then(|v| v.as_bool()) == Some(true) {
                "th"
            } else {
                "td"
            };
            let _ = write!(out, "<{tag}>");
            match el.children.as_slice() {
                [Node::Element(p)] if p.kind == "paragraph" && p.attrs.is_empty() => {
                    render_inline(&p.children, out);
                }
                children => render_blocks(children, out),
            }
            let _ = write!(out, "</{tag}>");
        }
        "paid_content" => {
            out.push_str("<div class=\"paid-content\">");
            render_blocks(&el.children, out);
            out.push_str("</div>");
        }
        "list_item" => render_list_run(&[el], out),
        _ => {
            out.push_str("<div>");
            render_blocks(&el.children, out);
            out.push_str("</div>");
        }
    }
}

fn render_text_block(tag: &str, el: &ElementNode, out: &mut String) {
    let _ = write!(out, "<{tag}");
    push_block_style(el, true, out);
    out.push('>');
    render_inline(&el.children, out);
    let _ = write!(out, "</{tag}>");
}

fn render_inline(children: &[Node], out: &mut String) {
    let empty = children.iter().all(|n| match n {
        Node::Text(t) => t.text.is_empty(),
        _ => false,
    });
    if empty {
        out.push_str("<br>");
        return;
    }

    for (ix, node) in children.iter().enumerate() {
        match node {
            Node::Text(t) => render_text(&t.text, &t.marks, out),
            Node::Void(v) => {
                render_void(v, out);
                if v.kind == "checkbox" && ix + 1 < children.len() {
                    out.push(' ');
                }
            }
            Node::Element(el) => render_element(el, out),
        }
    }
}

fn render_text(text: &str, marks: &Marks, out: &mut String) {
    if text.is_empty() {
        return;
    }

    let wrappers: [(bool, &str, &str); 7] = [
        (marks.bold, "<strong>", "</strong>"),
        (marks.italic, "<em>", "</em>"),
        (marks.underline, "<u>", "</u>"),
        (marks.strikethrough, "<s>", "</s>"),
        (marks.subscript, "<sub>", "</sub>"),
        (marks.superscript, "<sup>", "</sup>"),
        (marks.code, "<code>", "</code>"),
    ];

    if let Some(href) = &marks.link {
        let _ = write!(out, "<a href=\"{}\">", escape_html(href));
    }
    for (on, open, _) in &wrappers {
        if *on {
            out.push_str(open);
        }
    }
    out.push_str(&escape_html(text));
    for (on, _, close) in wrappers.iter().rev() {
        if *on {
            out.push_str(close);
        }
    }
    if marks.link.is_some() {
        out.push_str("</a>");
    }
}

fn render_void(v: &VoidNode, out: &mut String) {
    let attr = |key: &str| v.attrs.get(key).and_then(|value| value.as_str());
    match v.kind.as_str() {
        "checkbox" => {
            let checked = v.attrs.get("checked").and_then(|c| c.as_bool()) == Some(true);
            out.push_str(if checked {
                "<input type=\"checkbox\" checked>"
            } else {
                "<input type=\"checkbox\">"
            });
        }
        "image" => {
            let _ = write!(out, "<img src=\"{}\"", escape_html(attr("src").unwrap_or("")));
            if let Some(alt) = attr("alt") {
                let _ = write!(out, " alt=\"{}\"", escape_html(alt));
            }
            out.push('>');
        }
        "paid_divider" => {
            let label = attr("label").unwrap_or(crate::paywall::PAID_DIVIDER_LABEL);
            let _ = write!(
                out,
                "<div class=\"paid-content-line\"><div class=\"paid-content-divider\">\
                 <div class=\"divider-line\"></div>\
                 <div class=\"paid-content-label\"><span class=\"paid-icon\"></span>{}</div>\
                 <div class=\"divider-line\"></div></div></div>",
                escape_html(label)
            );
        }
        _ => {}
    }
}
