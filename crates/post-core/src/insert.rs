use serde_json::Value;

use crate::core::{AttrPatch, Attrs, Editor, ElementNode, Marks, Node, Point, Selection, TextNode};
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{ChildConstraint, CommandSpec, NodeRole, NodeSpec, PostPlugin, QuerySpec};
use crate::tree::{
    RangeCut, block_path_of, child_path, cut_selection, focus_block, nearest_ancestor_path,
    next_sibling_path, split_inline, total_inline_text_len,
};

pub const CHECKLIST_PLACEHOLDER: &str = "New task";
pub const CODE_PLACEHOLDER: &str = "code";

/// Put `block` where the cut range was: over the start block when the cut
/// emptied it, otherwise right after it. Returns the ops and the block's path.
fn place_block_at_cut(cut: RangeCut, block: Node) -> (Vec<Op>, Path) {
    let RangeCut {
        mut ops, start, ..
    } = cut;

    if total_inline_text_len(&start.remaining) == 0 {
        ops.extend(Op::replace(start.path.clone(), block));
        return (ops, start.path);
    }

    let block_path = next_sibling_path(&start.path);
    let mut kept = start.element;
    kept.children = start.remaining;
    ops.extend(Op::replace(start.path, Node::Element(kept)));
    ops.push(Op::InsertNode {
        path: block_path.clone(),
        node: block,
    });
    (ops, block_path)
}

/// Insert `nodes` right after the focus block, then an empty paragraph holding the caret.
fn insert_after_focus_block(
    editor: &Editor,
    nodes: Vec<Node>,
    source: &str,
) -> Result<Transaction, String> {
    let focus = &editor.selection().focus;
    let block_path =
        block_path_of(focus).ok_or_else(|| "Selection is not in a text block".to_string())?;

    let mut path = next_sibling_path(block_path);
    let mut ops: Vec<Op> = Vec::new();
    for node in nodes {
        ops.push(Op::InsertNode {
            path: path.clone(),
            node,
        });
        path = next_sibling_path(&path);
    }
    ops.push(Op::InsertNode {
        path: path.clone(),
        node: Node::paragraph(""),
    });

    Ok(Transaction::new(ops)
        .selection_after(Selection::collapsed(Point::new(child_path(&path, 0), 0)))
        .source(source))
}

pub(crate) struct ChecklistPlugin;

impl PostPlugin for ChecklistPlugin {
    fn id(&self) -> &'static str {
        "checklist"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::void("checkbox", NodeRole::Inline)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction("checklist.insert", "Checklist item", |editor, _args| {
                insert_checklist_item(editor)
            })
            .description("Insert a checklist item holding the selected text or a placeholder.")
            .keywords(["todo", "task", "checkbox", "checklist"]),
            CommandSpec::from_transaction(
                "checklist.toggle_checked",
                "Toggle checked",
                |editor, args| toggle_checked(editor, args),
            )
            .description("Check or uncheck the checklist item at args.path, or at the caret.")
            .keywords(["todo", "task", "done", "check"])
            .args_example(serde_json::json!({ "path": [0] })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::flag("checklist.is_active", |editor| {
            focus_block(editor).is_some_and(|(_, el)| is_checklist_item(el))
        })]
    }
}

/// A list item with a checkbox among its children.
pub fn is_checklist_item(el: &ElementNode) -> bool {
    el.kind == "list_item"
        && el
            .children
            .iter()
            .any(|n| n.element_kind() == Some("checkbox"))
}

fn insert_checklist_item(editor: &Editor) -> Result<Transaction, String> {
    let cut = cut_selection(editor.doc(), editor.registry(), editor.selection(), false)?;
    let selected = cut.selected_text.replace('\n', " ");
    let label = if selected.trim().is_empty() {
        CHECKLIST_PLACEHOLDER.to_string()
    } else {
        selected
    };
    let caret_offset = label.len();

    let mut attrs = Attrs::default();
    attrs.insert("list_type".to_string(), Value::String("check".to_string()));
    let item = Node::element(
        "list_item",
        attrs,
        vec![Node::checkbox(false), Node::text(label)],
    );

    let (ops, item_path) = place_block_at_cut(cut, item);
    Ok(Transaction::new(ops)
        .selection_after(Selection::collapsed(Point::new(
            child_path(&item_path, 1),
            caret_offset,
        )))
        .source("command:checklist.insert"))
}

fn parse_path_arg(args: Option<&Value>) -> Option<Vec<usize>> {
    let path = args?.get("path")?.as_array()?;
    path.iter()
        .map(|v| v.as_u64().map(|ix| ix as usize))
        .collect()
}

fn toggle_checked(editor: &Editor, args: Option<&Value>) -> Result<Transaction, String> {
    let block_path = match parse_path_arg(args) {
        Some(path) => path,
        None => focus_block(editor)
            .map(|(path, _)| path)
            .ok_or_else(|| "No active block".to_string())?,
    };
    let Some(item_path) = nearest_ancestor_path(editor.doc(), &block_path, "list_item") else {
        return Ok(Transaction::default());
    };
    let Some(Node::Element(item)) = crate::core::node_ref(editor.doc(), &item_path) else {
        return Ok(Transaction::default());
    };
    let Some((checkbox_ix, Node::Void(checkbox))) = item
        .children
        .iter()
        .enumerate()
        .find(|(_, n)| n.element_kind() == Some("checkbox"))
    else {
        return Ok(Transaction::default());
    };

    let checked = checkbox
        .attrs
        .get("checked")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    Ok(Transaction::new(vec![Op::SetNodeAttrs {
        path: child_path(&item_path, checkbox_ix),
        patch: AttrPatch::set("checked", Value::Bool(!checked)),
    }])
    .selection_after(editor.selection().clone())
    .source("command:checklist.toggle_checked"))
}

pub(crate) struct CodePlugin;

impl PostPlugin for CodePlugin {
    fn id(&self) -> &'static str {
        "code"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("code_block")]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction("code.insert", "Code", |editor, _args| {
                insert_code(editor)
            })
            .description("Format the selection as code: a code block when it spans lines, inline code otherwise.")
            .keywords(["code", "pre", "monospace", "snippet"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::flag("code.is_active", is_code_active)]
    }
}

pub(crate) fn is_code_active(editor: &Editor) -> bool {
    let focus = &editor.selection().focus;
    if nearest_ancestor_path(editor.doc(), &focus.path, "code_block").is_some() {
        return true;
    }
    matches!(
        crate::core::node_ref(editor.doc(), &focus.path),
        Some(Node::Text(TextNode { marks, .. })) if marks.code
    )
}

fn insert_code(editor: &Editor) -> Result<Transaction, String> {
    let cut = cut_selection(editor.doc(), editor.registry(), editor.selection(), false)?;

    if cut.multiline {
        let text = cut.selected_text.clone();
        let caret_offset = text.len();
        let block = Node::element("code_block", Attrs::default(), vec![Node::text(text)]);
        let (ops, block_path) = place_block_at_cut(cut, block);
        return Ok(Transaction::new(ops)
            .selection_after(Selection::collapsed(Point::new(
                child_path(&block_path, 0),
                caret_offset,
            )))
            .source("command:code.insert"));
    }

    let text = if cut.selected_text.is_empty() {
        CODE_PLACEHOLDER.to_string()
    } else {
        cut.selected_text.clone()
    };
    let caret_offset = text.len();

    let RangeCut { mut ops, start, .. } = cut;
    let (mut children, right) = split_inline(&start.remaining, start.caret);
    let leaf_ix = children.len();
    children.push(Node::Text(TextNode {
        text,
        marks: Marks {
            code: true,
            ..Marks::default()
        },
    }));
    children.extend(right);

    let mut block = start.element;
    block.children = children;
    ops.extend(Op::replace(start.path.clone(), Node::Element(block)));

    Ok(Transaction::new(ops)
        .selection_after(Selection::collapsed(Point::new(
            child_path(&start.path, leaf_ix),
            caret_offset,
        )))
        .source("command:code.insert"))
}

pub(crate) struct ImagePlugin;

impl PostPlugin for ImagePlugin {
    fn id(&self) -> &'static str {
        "image"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::void("image", NodeRole::Block)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction("image.insert", "Image", |editor, args| {
                let src = args
                    .and_then(|v| v.get("src"))
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| "Missing args.src".to_string())?;
                let alt = args
                    .and_then(|v| v.get("alt"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                insert_after_focus_block(
                    editor,
                    vec![Node::image(src, alt)],
                    "command:image.insert",
                )
            })
            .description("Insert an image after the current block.")
            .keywords(["image", "picture", "img"])
            .args_example(serde_json::json!({ "src": "https://example.com/cat.png", "alt": "Cat" })),
        ]
    }
}

pub(crate) struct TablePlugin;

impl PostPlugin for TablePlugin {
    fn id(&self) -> &'static str {
        "table"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec {
                kind: "table".to_string(),
                role: NodeRole::Block,
                is_void: false,
                children: ChildConstraint::Any,
            },
            NodeSpec {
                kind: "table_row".to_string(),
                role: NodeRole::Block,
                is_void: false,
                children: ChildConstraint::Any,
            },
            NodeSpec::container("table_cell"),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction("table.insert_template", "Table", |editor, _args| {
                insert_after_focus_block(editor, vec![table_template()], "command:table.insert_template")
            })
            .description("Insert a 2x2 table with a header row.")
            .keywords(["table", "grid"]),
        ]
    }
}

fn table_cell_node(text: &str, header: bool) -> Node {
    let mut attrs = Attrs::default();
    if header {
        attrs.insert("header".to_string(), Value::Bool(true));
    }
    Node::element("table_cell", attrs, vec![Node::paragraph(text)])
}

fn table_row_node(cells: Vec<Node>) -> Node {
    Node::element("table_row", Attrs::default(), cells)
}

/// Fixed placeholder table: one header row and one body row, two columns.
pub fn table_template() -> Node {
    Node::element(
        "table",
        Attrs::default(),
        vec![
            table_row_node(vec![
                table_cell_node("Header 1", true),
                table_cell_node("Header 2", true),
            ]),
            table_row_node(vec![
                table_cell_node("Cell 1", false),
                table_cell_node("Cell 2", false),
            ]),
        ],
    )
}
