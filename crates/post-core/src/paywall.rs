//! The paid-content marker: a `paid_divider` void followed by a `paid_content`
//! region, appended at the end of the document while the post is paid.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Attrs, Document, Editor, Node, Point, Selection, VoidNode};
use crate::ops::{Op, Transaction};
use crate::plugin::{
    CommandError, CommandSpec, NodeRole, NodeSpec, NormalizePass, PluginRegistry, PostPlugin,
    QuerySpec,
};
use crate::tree::child_path;

pub const PAID_DIVIDER_LABEL: &str = "PAID CONTENTS BELOW THIS LINE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Free,
    Paid,
}

impl PostType {
    pub fn toggled(self) -> Self {
        match self {
            PostType::Free => PostType::Paid,
            PostType::Paid => PostType::Free,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostType::Free => "free",
            PostType::Paid => "paid",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PostType::Free),
            "paid" => Ok(PostType::Paid),
            other => Err(format!("Unknown post type: {other}")),
        }
    }
}

pub fn paid_divider() -> Node {
    let mut attrs = Attrs::default();
    attrs.insert(
        "label".to_string(),
        Value::String(PAID_DIVIDER_LABEL.to_string()),
    );
    Node::Void(VoidNode {
        kind: "paid_divider".to_string(),
        attrs,
    })
}

pub fn paid_content() -> Node {
    Node::element("paid_content", Attrs::default(), vec![Node::paragraph("")])
}

fn is_kind(node: &Node, kind: &str) -> bool {
    node.element_kind() == Some(kind)
}

/// The divider or the paid region: top-level nodes no edit may nest.
pub(crate) fn is_paid_marker(node: &Node) -> bool {
    is_kind(node, "paid_divider") || is_kind(node, "paid_content")
}

/// Whether the document currently carries the paid-content divider.
pub fn has_paid_marker(doc: &Document) -> bool {
    doc.children.iter().any(|n| is_kind(n, "paid_divider"))
}

/// Top-level indices of every marker node, divider or content region.
fn marker_indices(doc: &Document) -> Vec<usize> {
    doc.children
        .iter()
        .enumerate()
        .filter(|(_, n)| is_paid_marker(n))
        .map(|(ix, _)| ix)
        .collect()
}

/// Bring the marker in line with `post_type`. Returns whether the document changed.
pub fn set_post_type(editor: &mut Editor, post_type: PostType) -> Result<bool, CommandError> {
    let before = has_paid_marker(editor.doc());
    let command = match post_type {
        PostType::Paid => "paywall.insert_marker",
        PostType::Free => "paywall.remove_marker",
    };
    editor.run_command(command, None)?;
    let after = has_paid_marker(editor.doc());
    if before != after {
        tracing::info!(post_type = %post_type, "paid-content marker updated");
    }
    Ok(before != after)
}

pub(crate) struct PaywallPlugin;

impl PostPlugin for PaywallPlugin {
    fn id(&self) -> &'static str {
        "paywall"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::void("paid_divider", NodeRole::Block),
            NodeSpec::container("paid_content"),
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizePaidMarker)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction(
                "paywall.insert_marker",
                "Insert paid-content line",
                |editor, _args| insert_marker(editor),
            )
            .description("Append the paid-content divider and an empty paid region, once.")
            .keywords(["paid", "paywall", "premium"]),
            CommandSpec::from_transaction(
                "paywall.remove_marker",
                "Remove paid-content line",
                |editor, _args| remove_marker(editor),
            )
            .description("Remove the paid-content divider and its region.")
            .keywords(["paid", "paywall", "free"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::flag("paywall.has_marker", |editor| {
            has_paid_marker(editor.doc())
        })]
    }
}

fn insert_marker(editor: &Editor) -> Result<Transaction, String> {
    let doc = editor.doc();
    if has_paid_marker(doc) {
        return Ok(Transaction::default());
    }

    // Stray regions left without a divider go first.
    let stray = marker_indices(doc);
    let mut ops: Vec<Op> = stray
        .iter()
        .rev()
        .map(|&ix| Op::RemoveNode { path: vec![ix] })
        .collect();

    let end = doc.children.len() - stray.len();
    ops.push(Op::InsertNode {
        path: vec![end],
        node: paid_divider(),
    });
    ops.push(Op::InsertNode {
        path: vec![end + 1],
        node: paid_content(),
    });

    let caret = Point::new(child_path(&[end + 1, 0], 0), 0);
    Ok(Transaction::new(ops)
        .selection_after(Selection::collapsed(caret))
        .source("command:paywall.insert_marker"))
}

fn remove_marker(editor: &Editor) -> Result<Transaction, String> {
    let doc = editor.doc();
    let removed = marker_indices(doc);
    let Some(&first_removed) = removed.first() else {
        return Ok(Transaction::default());
    };

    let ops: Vec<Op> = removed
        .iter()
        .rev()
        .map(|&ix| Op::RemoveNode { path: vec![ix] })
        .collect();

    let remap = |point: &Point| -> Option<Point> {
        let top = *point.path.first()?;
        if removed.contains(&top) {
            return None;
        }
        let shift = removed.iter().filter(|&&ix| ix < top).count();
        let mut path = point.path.clone();
        path[0] = top - shift;
        Some(Point::new(path, point.offset))
    };

    let sel = editor.selection();
    let mut tx = Transaction::new(ops).source("command:paywall.remove_marker");
    match (remap(&sel.anchor), remap(&sel.focus)) {
        (Some(anchor), Some(focus)) => tx = tx.selection_after(Selection { anchor, focus }),
        _ => {
            if let Some(point) = last_text_point_before(doc, first_removed) {
                tx = tx.selection_after(Selection::collapsed(point));
            }
        }
    }
    Ok(tx)
}

/// End of the last text leaf among the top-level blocks before `limit`.
fn last_text_point_before(doc: &Document, limit: usize) -> Option<Point> {
    fn last_leaf(node: &Node, path: &mut Vec<usize>) -> Option<Point> {
        match node {
            Node::Text(t) => Some(Point::new(path.clone(), t.text.len())),
            Node::Void(_) => None,
            Node::Element(el) => el.children.iter().enumerate().rev().find_map(|(ix, child)| {
                path.push(ix);
                let found = last_leaf(child, path);
                path.pop();
                found
            }),
        }
    }

    doc.children[..limit.min(doc.children.len())]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(ix, node)| last_leaf(node, &mut vec![ix]))
}

/// Keeps one divider, one region, and the region right after the divider.
struct NormalizePaidMarker;

impl NormalizePass for NormalizePaidMarker {
    fn id(&self) -> &'static str {
        "paywall.normalize_marker"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let dividers: Vec<usize> = doc
            .children
            .iter()
            .enumerate()
            .filter(|(_, n)| is_kind(n, "paid_divider"))
            .map(|(ix, _)| ix)
            .collect();
        let contents: Vec<usize> = doc
            .children
            .iter()
            .enumerate()
            .filter(|(_, n)| is_kind(n, "paid_content"))
            .map(|(ix, _)| ix)
            .collect();

        if dividers.len() > 1 {
            return dividers[1..]
                .iter()
                .rev()
                .map(|&ix| Op::RemoveNode { path: vec![ix] })
                .collect();
        }

        let Some(&divider) = dividers.first() else {
            return Vec::new();
        };

        let keep = contents
            .iter()
            .copied()
            .find(|&ix| ix == divider + 1)
            .or_else(|| contents.first().copied());

        if contents.len() > 1 {
            return contents
                .iter()
                .rev()
                .filter(|&&ix| Some(ix) != keep)
                .map(|&ix| Op::RemoveNode { path: vec![ix] })
                .collect();
        }

        match keep {
            Some(ix) if ix == divider + 1 => Vec::new(),
            Some(ix) => {
                let node = doc.children[ix].clone();
                let target = if ix > divider { divider + 1 } else { divider };
                vec![
                    Op::RemoveNode { path: vec![ix] },
                    Op::InsertNode {
                        path: vec![target],
                        node,
                    },
                ]
            }
            None => vec![Op::InsertNode {
                path: vec![divider + 1],
                node: paid_content(),
            }],
        }
    }
}
