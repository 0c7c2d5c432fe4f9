use serde_json::Value;

use crate::core::{AttrPatch, Document, Editor, ElementNode, Node, Point, Selection};
use crate::ops::{Op, Transaction};
use crate::paywall::is_paid_marker;
use crate::plugin::{CommandSpec, NodeSpec, NormalizePass, PluginRegistry, PostPlugin, QuerySpec};
use crate::tree::{
    MAX_INDENT_LEVEL, block_path_of, carried_block_attrs, children_at_path,
    convert_selected_blocks, focus_block, for_each_element, nearest_ancestor_path,
    ordered_selection_points, selected_blocks, without_checkboxes,
};

pub const ALIGNMENTS: [&str; 4] = ["left", "center", "right", "justify"];

pub(crate) struct HeadingPlugin;

impl PostPlugin for HeadingPlugin {
    fn id(&self) -> &'static str {
        "heading"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("heading")]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeHeadingLevels)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction("block.set_type", "Set block type", |editor, args| {
                let ty = args
                    .and_then(|v| v.get("type"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "Missing args.type".to_string())?;
                let level = parse_block_type(ty)?;
                set_block_type(editor, level)
            })
            .description("Turn the selected blocks into paragraphs or headings.")
            .keywords(["heading", "paragraph", "h1", "h2", "h3", "format block"])
            .args_example(serde_json::json!({ "type": "h2" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.heading_level", |editor, _args| {
            Ok(active_heading_level(editor).map_or(Value::Null, Value::from))
        })]
    }
}

/// `p` / `paragraph` map to `None`, `h1`..`h6` to the heading level.
fn parse_block_type(ty: &str) -> Result<Option<u64>, String> {
    match ty {
        "p" | "paragraph" => Ok(None),
        _ => ty
            .strip_prefix('h')
            .and_then(|n| n.parse::<u64>().ok())
            .filter(|n| (1..=6).contains(n))
            .map(Some)
            .ok_or_else(|| format!("Unknown block type: {ty}")),
    }
}

fn heading_level(el: &ElementNode) -> u64 {
    el.attr_u64("level").unwrap_or(1).clamp(1, 6)
}

pub(crate) fn active_heading_level(editor: &Editor) -> Option<u64> {
    let (_, el) = focus_block(editor)?;
    (el.kind == "heading").then(|| heading_level(el))
}

fn set_block_type(editor: &Editor, level: Option<u64>) -> Result<Transaction, String> {
    convert_selected_blocks(editor, "command:block.set_type", |el| {
        let kind = if level.is_some() { "heading" } else { "paragraph" };
        let unchanged = match level {
            Some(level) => el.kind == "heading" && heading_level(el) == level,
            None => el.kind == "paragraph",
        };
        if unchanged {
            return None;
        }

        let mut attrs = carried_block_attrs(el, false);
        if let Some(level) = level {
            attrs.insert("level".to_string(), Value::from(level));
        }
        Some(ElementNode {
            kind: kind.to_string(),
            attrs,
            children: without_checkboxes(&el.children),
        })
    })
}

struct NormalizeHeadingLevels;

impl NormalizePass for NormalizeHeadingLevels {
    fn id(&self) -> &'static str {
        "heading.normalize_levels"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for_each_element(doc, |path, el| {
            if el.kind != "heading" {
                return;
            }
            let level = heading_level(el);
            if el.attr_u64("level") != Some(level) {
                ops.push(Op::SetNodeAttrs {
                    path: path.to_vec(),
                    patch: AttrPatch::set("level", Value::from(level)),
                });
            }
        });
        ops
    }
}

pub(crate) struct AlignPlugin;

impl PostPlugin for AlignPlugin {
    fn id(&self) -> &'static str {
        "align"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeAlignAttrs)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction("block.set_align", "Set alignment", |editor, args| {
                let align = args
                    .and_then(|v| v.get("align"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "Missing args.align".to_string())?;
                set_block_align(editor, align)
            })
            .description("Align every selected block left, center, right or justified.")
            .keywords(["align", "left", "center", "right", "justify"])
            .args_example(serde_json::json!({ "align": "center" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.align_states", |editor, _args| {
            let states = align_states(editor);
            Ok(Value::Object(
                ALIGNMENTS
                    .iter()
                    .zip(states)
                    .map(|(name, on)| (name.to_string(), Value::Bool(on)))
                    .collect(),
            ))
        })]
    }
}

/// Alignment of a block; a missing attribute means left.
pub fn block_alignment(el: &ElementNode) -> &str {
    match el.attr_str("align") {
        Some(align @ ("center" | "right" | "justify")) => align,
        _ => "left",
    }
}

/// For each of [`ALIGNMENTS`], whether any selected block has it.
pub(crate) fn align_states(editor: &Editor) -> [bool; 4] {
    let mut states = [false; 4];
    let Ok((blocks, a, b)) = selected_blocks(editor.doc(), editor.registry(), editor.selection())
    else {
        return states;
    };
    for block in &blocks[a..=b] {
        let align = block_alignment(block.el);
        if let Some(ix) = ALIGNMENTS.iter().position(|name| *name == align) {
            states[ix] = true;
        }
    }
    states
}

fn set_block_align(editor: &Editor, align: &str) -> Result<Transaction, String> {
    if !ALIGNMENTS.contains(&align) {
        return Err(format!("Invalid align value: {align}"));
    }

    let sel = editor.selection().clone();
    let (blocks, a, b) = selected_blocks(editor.doc(), editor.registry(), &sel)?;

    let mut ops: Vec<Op> = Vec::new();
    for block in &blocks[a..=b] {
        if block_alignment(block.el) == align {
            continue;
        }
        let patch = if align == "left" {
            AttrPatch::remove("align")
        } else {
            AttrPatch::set("align", Value::String(align.to_string()))
        };
        ops.push(Op::SetNodeAttrs {
            path: block.path.clone(),
            patch,
        });
    }

    Ok(Transaction::new(ops)
        .selection_after(sel)
        .source("command:block.set_align"))
}

struct NormalizeAlignAttrs;

impl NormalizePass for NormalizeAlignAttrs {
    fn id(&self) -> &'static str {
        "align.normalize_attrs"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for_each_element(doc, |path, el| {
            if el.attrs.contains_key("align") && block_alignment(el) == "left" {
                ops.push(Op::SetNodeAttrs {
                    path: path.to_vec(),
                    patch: AttrPatch::remove("align"),
                });
            }
        });
        ops
    }
}

pub(crate) struct IndentPlugin;

impl PostPlugin for IndentPlugin {
    fn id(&self) -> &'static str {
        "indent"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeIndentAttrs)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction("block.indent_increase", "Indent", |editor, _args| {
                adjust_indent(editor, IndentDirection::Increase)
            })
            .description("Increase the indent or list level of the selected blocks.")
            .keywords(["indent", "tab"]),
            CommandSpec::from_transaction("block.indent_decrease", "Outdent", |editor, _args| {
                adjust_indent(editor, IndentDirection::Decrease)
            })
            .description("Decrease the indent or list level of the selected blocks.")
            .keywords(["outdent", "dedent", "shift tab"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.indent_level", |editor, _args| {
            let level = focus_block(editor).map_or(0, |(_, el)| indent_level(el).1);
            Ok(Value::from(level))
        })]
    }
}

/// Attribute holding the nesting level of a block, and its current value.
fn indent_level(el: &ElementNode) -> (&'static str, u64) {
    let key = if el.kind == "list_item" {
        "list_level"
    } else {
        "indent"
    };
    (key, el.attr_u64(key).unwrap_or(0).min(MAX_INDENT_LEVEL))
}

#[derive(Clone, Copy)]
enum IndentDirection {
    Increase,
    Decrease,
}

fn adjust_indent(editor: &Editor, direction: IndentDirection) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let (blocks, a, b) = selected_blocks(editor.doc(), editor.registry(), &sel)?;

    let mut ops: Vec<Op> = Vec::new();
    for block in &blocks[a..=b] {
        let (key, current) = indent_level(block.el);
        let next = match direction {
            IndentDirection::Increase => current.saturating_add(1).min(MAX_INDENT_LEVEL),
            IndentDirection::Decrease => current.saturating_sub(1),
        };
        if next == current {
            continue;
        }

        let patch = if next == 0 {
            AttrPatch::remove(key)
        } else {
            AttrPatch::set(key, Value::from(next))
        };
        ops.push(Op::SetNodeAttrs {
            path: block.path.clone(),
            patch,
        });
    }

    let source = match direction {
        IndentDirection::Increase => "command:block.indent_increase",
        IndentDirection::Decrease => "command:block.indent_decrease",
    };

    Ok(Transaction::new(ops).selection_after(sel).source(source))
}

struct NormalizeIndentAttrs;

impl NormalizePass for NormalizeIndentAttrs {
    fn id(&self) -> &'static str {
        "indent.normalize_attrs"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for_each_element(doc, |path, el| {
            for key in ["indent", "list_level"] {
                let Some(value) = el.attrs.get(key) else {
                    continue;
                };
                let patch = match value.as_u64() {
                    Some(0) | None => AttrPatch::remove(key),
                    Some(level) if level > MAX_INDENT_LEVEL => {
                        AttrPatch::set(key, Value::from(MAX_INDENT_LEVEL))
                    }
                    Some(_) => continue,
                };
                ops.push(Op::SetNodeAttrs {
                    path: path.to_vec(),
                    patch,
                });
            }
        });
        ops
    }
}

pub(crate) struct BlockquotePlugin;

impl PostPlugin for BlockquotePlugin {
    fn id(&self) -> &'static str {
        "blockquote"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::container("blockquote")]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction("blockquote.wrap", "Quote", |editor, _args| {
                wrap_selection_in_blockquote(editor)
            })
            .description("Wrap the selected blocks in a blockquote.")
            .keywords(["quote", "blockquote", "citation"]),
            CommandSpec::from_transaction("blockquote.unwrap", "Unquote", |editor, _args| {
                unwrap_nearest_blockquote(editor)
            })
            .description("Lift the blocks of the nearest blockquote out of it.")
            .keywords(["quote", "blockquote", "unwrap"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::flag("blockquote.is_active", is_in_blockquote)]
    }
}

pub(crate) fn is_in_blockquote(editor: &Editor) -> bool {
    nearest_ancestor_path(editor.doc(), &editor.selection().focus.path, "blockquote").is_some()
}

fn wrap_selection_in_blockquote(editor: &Editor) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let (start, end) = ordered_selection_points(&sel);
    let doc = editor.doc();

    // Wrapping is not a toggle: a selection already in a quote stays as it is.
    if nearest_ancestor_path(doc, &start.path, "blockquote").is_some()
        || nearest_ancestor_path(doc, &end.path, "blockquote").is_some()
    {
        return Ok(Transaction::default());
    }

    let start_block_path = block_path_of(&start)
        .ok_or_else(|| "Selection start is not in a text block".to_string())?;
    let end_block_path =
        block_path_of(&end).ok_or_else(|| "Selection end is not in a text block".to_string())?;

    // Blocks in different containers are quoted through their top-level ancestors.
    let (start_block_path, end_block_path) =
        if start_block_path[..start_block_path.len() - 1] == end_block_path[..end_block_path.len() - 1] {
            (start_block_path, end_block_path)
        } else {
            (&start_block_path[..1], &end_block_path[..1])
        };

    let (start_ix, parent) = start_block_path
        .split_last()
        .ok_or_else(|| "Selection start is not a block node".to_string())?;
    let end_ix = *end_block_path
        .last()
        .ok_or_else(|| "Selection end is not a block node".to_string())?;
    let (start_ix, end_ix) = ((*start_ix).min(end_ix), (*start_ix).max(end_ix));

    let Some(parent_children) = children_at_path(doc, parent) else {
        return Err("Selection parent is not a container".into());
    };
    if end_ix >= parent_children.len() {
        return Err("Selection block range is out of bounds".into());
    }

    // The quote stops short of the paid marker.
    let end_ix = match parent_children[start_ix..=end_ix]
        .iter()
        .position(is_paid_marker)
    {
        Some(0) => return Ok(Transaction::default()),
        Some(offset) => start_ix + offset - 1,
        None => end_ix,
    };

    let quote = Node::element(
        "blockquote",
        Default::default(),
        parent_children[start_ix..=end_ix].to_vec(),
    );

    let mut ops: Vec<Op> = Vec::new();
    for ix in (start_ix..=end_ix).rev() {
        let mut path = parent.to_vec();
        path.push(ix);
        ops.push(Op::RemoveNode { path });
    }
    let mut insert_path = parent.to_vec();
    insert_path.push(start_ix);
    ops.push(Op::InsertNode {
        path: insert_path,
        node: quote,
    });

    let remap_point = |point: &Point| -> Point {
        if !point.path.starts_with(parent) || point.path.len() < parent.len() + 2 {
            return point.clone();
        }
        let block_ix = point.path[parent.len()];
        if block_ix < start_ix || block_ix > end_ix {
            return point.clone();
        }
        let mut new_path = parent.to_vec();
        new_path.push(start_ix);
        new_path.push(block_ix - start_ix);
        new_path.extend_from_slice(&point.path[parent.len() + 1..]);
        Point::new(new_path, point.offset)
    };

    let selection_after = Selection {
        anchor: remap_point(&sel.anchor),
        focus: remap_point(&sel.focus),
    };

    Ok(Transaction::new(ops)
        .selection_after(selection_after)
        .source("command:blockquote.wrap"))
}

fn unwrap_nearest_blockquote(editor: &Editor) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let Some(quote_path) = nearest_ancestor_path(editor.doc(), &sel.focus.path, "blockquote")
    else {
        return Ok(Transaction::default());
    };
    let Some((&quote_ix, parent_path)) = quote_path.split_last() else {
        return Err("Invalid blockquote path".into());
    };
    let Some(parent_children) = children_at_path(editor.doc(), parent_path) else {
        return Err("Blockquote parent is not a container".into());
    };
    let Some(Node::Element(quote_el)) = parent_children.get(quote_ix) else {
        return Err("Blockquote node not found".into());
    };

    let mut ops: Vec<Op> = vec![Op::RemoveNode {
        path: quote_path.clone(),
    }];
    for (i, node) in quote_el.children.iter().cloned().enumerate() {
        let mut path = parent_path.to_vec();
        path.push(quote_ix + i);
        ops.push(Op::InsertNode { path, node });
    }

    let remap_point = |point: &Point| -> Point {
        if point.path.len() < quote_path.len() + 1 || !point.path.starts_with(&quote_path) {
            return point.clone();
        }
        let inner_ix = point.path[quote_path.len()];
        let mut new_path = parent_path.to_vec();
        new_path.push(quote_ix + inner_ix);
        new_path.extend_from_slice(&point.path[quote_path.len() + 1..]);
        Point::new(new_path, point.offset)
    };

    let selection_after = Selection {
        anchor: remap_point(&sel.anchor),
        focus: remap_point(&sel.focus),
    };

    Ok(Transaction::new(ops)
        .selection_after(selection_after)
        .source("command:blockquote.unwrap"))
}

pub(crate) struct ListPlugin;

impl PostPlugin for ListPlugin {
    fn id(&self) -> &'static str {
        "list"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("list_item")]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::from_transaction("list.toggle_bulleted", "Bulleted list", |editor, _args| {
                toggle_list(editor, "bulleted")
            })
            .description("Turn the selected blocks into a bulleted list, or back into paragraphs.")
            .keywords(["list", "bullet", "unordered", "ul"]),
            CommandSpec::from_transaction("list.toggle_ordered", "Numbered list", |editor, _args| {
                toggle_list(editor, "ordered")
            })
            .description("Turn the selected blocks into a numbered list, or back into paragraphs.")
            .keywords(["list", "numbered", "ordered", "ol"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("list.active_type", |editor, _args| {
            Ok(active_list_type(editor).map_or(Value::Null, |t| Value::String(t.to_string())))
        })]
    }
}

pub(crate) fn active_list_type(editor: &Editor) -> Option<&str> {
    let (_, el) = focus_block(editor)?;
    if el.kind != "list_item" {
        return None;
    }
    el.attr_str("list_type")
}

fn is_list_of(el: &ElementNode, list_type: &str) -> bool {
    el.kind == "list_item" && el.attr_str("list_type") == Some(list_type)
}

fn toggle_list(editor: &Editor, list_type: &'static str) -> Result<Transaction, String> {
    let (blocks, a, b) = selected_blocks(editor.doc(), editor.registry(), editor.selection())?;
    let unwrap = blocks[a..=b].iter().all(|block| is_list_of(block.el, list_type));
    let source = format!("command:list.toggle_{list_type}");

    convert_selected_blocks(editor, &source, |el| {
        if unwrap {
            return Some(ElementNode {
                kind: "paragraph".to_string(),
                attrs: carried_block_attrs(el, false),
                children: el.children.clone(),
            });
        }
        if is_list_of(el, list_type) {
            return None;
        }
        let mut attrs = carried_block_attrs(el, true);
        attrs.insert(
            "list_type".to_string(),
            Value::String(list_type.to_string()),
        );
        Some(ElementNode {
            kind: "list_item".to_string(),
            attrs,
            children: without_checkboxes(&el.children),
        })
    })
}
