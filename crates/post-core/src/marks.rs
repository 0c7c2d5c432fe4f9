use serde_json::Value;

use crate::core::{Editor, Marks, Node, Point, Selection, TextNode, node_ref};
use crate::ops::{Op, Transaction};
use crate::plugin::{CommandSpec, PostPlugin, QueryError, QuerySpec};
use crate::tree::{
    child_path, clamp_to_char_boundary, is_point_in_block,
    ordered_selection_points, point_for_global_offset, point_global_offset, selected_blocks,
    total_inline_text_len,
};

pub(crate) type MarkGetter = fn(&Marks) -> bool;
type MarkSetter = fn(&mut Marks, bool);

struct ToggleMark {
    name: &'static str,
    command: &'static str,
    get: MarkGetter,
    set: MarkSetter,
}

const TOGGLE_MARKS: [ToggleMark; 6] = [
    ToggleMark {
        name: "bold",
        command: "marks.toggle_bold",
        get: |m| m.bold,
        set: |m, v| m.bold = v,
    },
    ToggleMark {
        name: "italic",
        command: "marks.toggle_italic",
        get: |m| m.italic,
        set: |m, v| m.italic = v,
    },
    ToggleMark {
        name: "underline",
        command: "marks.toggle_underline",
        get: |m| m.underline,
        set: |m, v| m.underline = v,
    },
    ToggleMark {
        name: "strikethrough",
        command: "marks.toggle_strikethrough",
        get: |m| m.strikethrough,
        set: |m, v| m.strikethrough = v,
    },
    ToggleMark {
        name: "subscript",
        command: "marks.toggle_subscript",
        get: |m| m.subscript,
        set: set_subscript,
    },
    ToggleMark {
        name: "superscript",
        command: "marks.toggle_superscript",
        get: |m| m.superscript,
        set: set_superscript,
    },
];

/// Toggle command and getter of the boolean mark called `name`.
pub(crate) fn toggle_mark(name: &str) -> Option<(&'static str, MarkGetter)> {
    TOGGLE_MARKS
        .iter()
        .find(|mark| mark.name == name)
        .map(|mark| (mark.command, mark.get))
}

fn set_subscript(marks: &mut Marks, on: bool) {
    marks.subscript = on;
    if on {
        marks.superscript = false;
    }
}

fn set_superscript(marks: &mut Marks, on: bool) {
    marks.superscript = on;
    if on {
        marks.subscript = false;
    }
}

pub(crate) struct MarksPlugin;

impl PostPlugin for MarksPlugin {
    fn id(&self) -> &'static str {
        "marks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let mut commands: Vec<CommandSpec> = TOGGLE_MARKS
            .iter()
            .map(|mark| {
                let (id, get, set) = (mark.command, mark.get, mark.set);
                CommandSpec::from_transaction(id, format!("Toggle {}", mark.name), move |editor, _args| {
                    toggle_bool_mark(editor, get, set, id)
                })
                .description(format!("Toggle {} on the current selection or caret.", mark.name))
                .keywords([mark.name, "mark"])
            })
            .collect();

        commands.push(
            CommandSpec::from_transaction("marks.set_link", "Set link", |editor, args| {
                let url = args
                    .and_then(|v| v.get("url"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "Missing args.url".to_string())?
                    .to_string();
                set_link(editor, Some(url), "command:marks.set_link")
            })
            .description("Set link mark on the current selection or caret.")
            .keywords(["link", "url", "hyperlink"])
            .args_example(serde_json::json!({ "url": "https://example.com" })),
        );
        commands.push(
            CommandSpec::from_transaction("marks.unset_link", "Unset link", |editor, _args| {
                set_link(editor, None, "command:marks.unset_link")
            })
            .description("Remove link mark from the current selection or caret.")
            .keywords(["link", "unlink", "url"]),
        );
        commands
    }

    fn queries(&self) -> Vec<QuerySpec> {
        let mut queries = vec![QuerySpec::new("marks.get_active", |editor, _args| {
            serde_json::to_value(active_marks(editor))
                .map_err(|err| QueryError::new(format!("Failed to encode marks: {err}")))
        })];

        for mark in &TOGGLE_MARKS {
            let get = mark.get;
            queries.push(QuerySpec::flag(format!("marks.is_{}_active", mark.name), move |editor| {
                mark_active(editor, get)
            }));
        }
        queries.push(QuerySpec::flag("marks.is_code_active", |editor| {
            mark_active(editor, |m| m.code)
        }));
        queries.push(QuerySpec::new("marks.has_link_active", |editor, _args| {
            Ok(Value::Bool(mark_active(editor, |m| m.link.is_some())))
        }));
        queries
    }
}

/// Marks of the text leaf holding the focus point.
pub(crate) fn active_marks(editor: &Editor) -> Marks {
    match node_ref(editor.doc(), &editor.selection().focus.path) {
        Some(Node::Text(text)) => text.marks.clone(),
        _ => Marks::default(),
    }
}

/// Caret: the mark of the focus leaf. Range: every selected text leaf carries it.
pub(crate) fn mark_active(editor: &Editor, get: impl Fn(&Marks) -> bool) -> bool {
    let sel = editor.selection();
    if sel.is_collapsed() {
        return get(&active_marks(editor));
    }
    all_selected_text_nodes_have_mark(editor, sel, &get).unwrap_or(false)
}

fn all_selected_text_nodes_have_mark(
    editor: &Editor,
    sel: &Selection,
    get: &dyn Fn(&Marks) -> bool,
) -> Result<bool, String> {
    let (start, end) = ordered_selection_points(sel);
    let (blocks, start_index, end_index) = selected_blocks(editor.doc(), editor.registry(), sel)?;

    let start_inline_ix = start.path.last().copied().unwrap_or(0);
    let end_inline_ix = end.path.last().copied().unwrap_or(0);
    let mut saw_text = false;

    for (block_index, block) in blocks
        .iter()
        .enumerate()
        .take(end_index + 1)
        .skip(start_index)
    {
        let children = block.el.children.as_slice();
        let total_len = total_inline_text_len(children);

        let start_global = if block_index == start_index {
            point_global_offset(children, start_inline_ix, start.offset)
        } else {
            0
        };
        let end_global = if block_index == end_index {
            point_global_offset(children, end_inline_ix, end.offset)
        } else {
            total_len
        };
        if start_global >= end_global {
            continue;
        }

        let mut cursor = 0usize;
        for node in children {
            let node_start = cursor;
            let Node::Text(t) = node else {
                if matches!(node, Node::Void(_)) {
                    cursor += crate::tree::INLINE_VOID_LEN;
                }
                continue;
            };
            cursor += t.text.len();
            if end_global <= node_start || start_global >= cursor {
                continue;
            }
            saw_text = true;
            if !get(&t.marks) {
                return Ok(false);
            }
        }
    }

    Ok(saw_text)
}

fn toggle_bool_mark(
    editor: &Editor,
    get: MarkGetter,
    set: MarkSetter,
    id: &str,
) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let source = format!("command:{id}");
    if sel.is_collapsed() {
        return toggle_mark_at_caret(editor, |mut marks| {
            let target = !get(&marks);
            set(&mut marks, target);
            marks
        })
        .map(|(ops, selection_after)| {
            Transaction::new(ops)
                .selection_after(selection_after)
                .source(source)
        });
    }

    let all_set = all_selected_text_nodes_have_mark(editor, &sel, &get)?;
    let target = !all_set;
    apply_mark_range(editor, &sel, &|mut marks: Marks| {
        set(&mut marks, target);
        marks
    })
    .map(|(ops, selection_after)| {
        Transaction::new(ops)
            .selection_after(selection_after)
            .source(source)
    })
}

fn set_link(editor: &Editor, url: Option<String>, source: &str) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let apply = |mut marks: Marks| {
        marks.link = url.clone();
        marks
    };
    let (ops, selection_after) = if sel.is_collapsed() {
        toggle_mark_at_caret(editor, apply)?
    } else {
        apply_mark_range(editor, &sel, &apply)?
    };
    Ok(Transaction::new(ops)
        .selection_after(selection_after)
        .source(source))
}

/// Give the caret its own empty leaf carrying the new marks, so typed text picks them up.
fn toggle_mark_at_caret(
    editor: &Editor,
    apply: impl Fn(Marks) -> Marks,
) -> Result<(Vec<Op>, Selection), String> {
    let focus = editor.selection().focus.clone();
    let (child_ix, block_path) = focus
        .path
        .split_last()
        .ok_or_else(|| "Selection is not in a text node".to_string())?;

    let Some(Node::Element(el)) = node_ref(editor.doc(), block_path) else {
        return Err("Selection is not in a text block".into());
    };
    let Some(Node::Text(text)) = el.children.get(*child_ix) else {
        return Err("Selection is not in a text node".into());
    };

    let cursor = clamp_to_char_boundary(&text.text, focus.offset);
    let marks_before = text.marks.clone();
    let marks_after = apply(marks_before.clone());

    if text.text.is_empty() {
        return Ok((
            vec![Op::SetTextMarks {
                path: focus.path.clone(),
                marks: marks_after,
            }],
            Selection::collapsed(Point::new(focus.path.clone(), 0)),
        ));
    }

    let mut replacement: Vec<Node> = Vec::new();
    let mut caret_child_ix = *child_ix;

    let (left, right) = text.text.split_at(cursor);
    if !left.is_empty() {
        replacement.push(Node::Text(TextNode {
            text: left.to_string(),
            marks: marks_before.clone(),
        }));
        caret_child_ix += 1;
    }
    replacement.push(Node::Text(TextNode {
        text: String::new(),
        marks: marks_after,
    }));
    if !right.is_empty() {
        replacement.push(Node::Text(TextNode {
            text: right.to_string(),
            marks: marks_before,
        }));
    }

    let mut ops: Vec<Op> = vec![Op::RemoveNode {
        path: focus.path.clone(),
    }];
    for (i, node) in replacement.into_iter().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(block_path, child_ix + i),
            node,
        });
    }

    let selection_after = Selection::collapsed(Point::new(child_path(block_path, caret_child_ix), 0));
    Ok((ops, selection_after))
}

fn apply_marks_in_block(
    children: &[Node],
    start_global: usize,
    end_global: usize,
    apply: &dyn Fn(Marks) -> Marks,
) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let Node::Text(t) = node else {
            if matches!(node, Node::Void(_)) {
                cursor += crate::tree::INLINE_VOID_LEN;
            }
            out.push(node.clone());
            continue;
        };
        let node_start = cursor;
        let node_end = cursor + t.text.len();
        cursor = node_end;

        if end_global <= node_start || start_global >= node_end {
            out.push(node.clone());
            continue;
        }

        let sel_start = clamp_to_char_boundary(&t.text, start_global.saturating_sub(node_start));
        let sel_end = clamp_to_char_boundary(&t.text, end_global.saturating_sub(node_start));

        let pieces = [
            (&t.text[..sel_start], t.marks.clone()),
            (&t.text[sel_start..sel_end], apply(t.marks.clone())),
            (&t.text[sel_end..], t.marks.clone()),
        ];
        for (text, marks) in pieces {
            if !text.is_empty() {
                out.push(Node::Text(TextNode {
                    text: text.to_string(),
                    marks,
                }));
            }
        }
    }

    if out.is_empty() {
        out.push(Node::text(""));
    }

    out
}

fn apply_mark_range(
    editor: &Editor,
    sel: &Selection,
    apply: &dyn Fn(Marks) -> Marks,
) -> Result<(Vec<Op>, Selection), String> {
    let (start, end) = ordered_selection_points(sel);
    let (blocks, start_index, end_index) = selected_blocks(editor.doc(), editor.registry(), sel)?;

    let start_inline_ix = start.path.last().copied().unwrap_or(0);
    let end_inline_ix = end.path.last().copied().unwrap_or(0);

    let mut ops: Vec<Op> = Vec::new();
    let mut new_anchor = sel.anchor.clone();
    let mut new_focus = sel.focus.clone();

    for (block_index, block) in blocks
        .iter()
        .enumerate()
        .take(end_index + 1)
        .skip(start_index)
    {
        let children = block.el.children.as_slice();
        let total_len = total_inline_text_len(children);

        let start_global = if block_index == start_index {
            point_global_offset(children, start_inline_ix, start.offset)
        } else {
            0
        };
        let end_global = if block_index == end_index {
            point_global_offset(children, end_inline_ix, end.offset)
        } else {
            total_len
        };
        if start_global >= end_global {
            continue;
        }

        let new_children = apply_marks_in_block(children, start_global, end_global, apply);

        for child_ix in (0..children.len()).rev() {
            ops.push(Op::RemoveNode {
                path: child_path(&block.path, child_ix),
            });
        }
        for (child_ix, node) in new_children.iter().cloned().enumerate() {
            ops.push(Op::InsertNode {
                path: child_path(&block.path, child_ix),
                node,
            });
        }

        for point in [&mut new_anchor, &mut new_focus] {
            if is_point_in_block(point, &block.path) {
                let global = point_global_offset(
                    children,
                    point.path.last().copied().unwrap_or(0),
                    point.offset,
                );
                *point = point_for_global_offset(&block.path, &new_children, global);
            }
        }
    }

    Ok((
        ops,
        Selection {
            anchor: new_anchor,
            focus: new_focus,
        },
    ))
}
