//! Path and offset helpers shared by the command plugins.
//!
//! Offsets inside a text block are "global": byte offsets into the block's
//! concatenated inline content, where every inline void counts as one unit.

use serde_json::Value;

use crate::core::{
    Attrs, Document, Editor, ElementNode, Node, Point, Selection, TextNode, node_ref,
};
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{ChildConstraint, PluginRegistry};

pub(crate) const INLINE_VOID_LEN: usize = 1;
pub(crate) const MAX_INDENT_LEVEL: u64 = 8;

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

pub(crate) fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}

/// Path of the sibling right after `path`.
pub(crate) fn next_sibling_path(path: &[usize]) -> Path {
    let mut next = path.to_vec();
    if let Some(last) = next.last_mut() {
        *last += 1;
    }
    next
}

fn inline_len(node: &Node) -> usize {
    match node {
        Node::Text(t) => t.text.len(),
        Node::Void(_) => INLINE_VOID_LEN,
        Node::Element(_) => 0,
    }
}

pub(crate) fn total_inline_text_len(children: &[Node]) -> usize {
    children.iter().map(inline_len).sum()
}

pub(crate) fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    let mut global = 0usize;
    for (ix, node) in children.iter().enumerate() {
        match node {
            Node::Text(t) => {
                if ix < child_ix {
                    global += t.text.len();
                    continue;
                }
                if ix == child_ix {
                    global += clamp_to_char_boundary(&t.text, offset);
                }
                break;
            }
            Node::Void(_) => {
                if ix < child_ix {
                    global += INLINE_VOID_LEN;
                    continue;
                }
                if ix == child_ix {
                    global += offset.min(INLINE_VOID_LEN);
                }
                break;
            }
            Node::Element(_) => {}
        }
    }
    global
}

pub(crate) fn point_for_global_offset(
    block_path: &[usize],
    children: &[Node],
    global_offset: usize,
) -> Point {
    let mut remaining = global_offset;
    for (child_ix, node) in children.iter().enumerate() {
        match node {
            Node::Text(t) => {
                if remaining < t.text.len() {
                    return Point::new(
                        child_path(block_path, child_ix),
                        clamp_to_char_boundary(&t.text, remaining),
                    );
                }
                if remaining == t.text.len() {
                    if matches!(children.get(child_ix + 1), Some(Node::Text(_))) {
                        return Point::new(child_path(block_path, child_ix + 1), 0);
                    }
                    return Point::new(child_path(block_path, child_ix), t.text.len());
                }
                remaining -= t.text.len();
            }
            Node::Void(_) => {
                if remaining < INLINE_VOID_LEN {
                    for (ix, prev) in children.iter().enumerate().take(child_ix).rev() {
                        if let Node::Text(t) = prev {
                            return Point::new(child_path(block_path, ix), t.text.len());
                        }
                    }
                }
                if remaining <= INLINE_VOID_LEN {
                    for (ix, next) in children.iter().enumerate().skip(child_ix + 1) {
                        if matches!(next, Node::Text(_)) {
                            return Point::new(child_path(block_path, ix), 0);
                        }
                    }
                    break;
                }
                remaining -= INLINE_VOID_LEN;
            }
            Node::Element(_) => {}
        }
    }

    // Fall back to the end of the last text leaf.
    for (child_ix, node) in children.iter().enumerate().rev() {
        if let Node::Text(t) = node {
            return Point::new(child_path(block_path, child_ix), t.text.len());
        }
    }

    Point::new(child_path(block_path, 0), 0)
}

/// Split inline children at a global offset. Empty text leaves are dropped.
pub(crate) fn split_inline(children: &[Node], at: usize) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let start = cursor;
        let end = cursor + inline_len(node);
        cursor = end;

        match node {
            Node::Text(t) if t.text.is_empty() => {}
            Node::Text(t) if start < at && at < end => {
                let split = clamp_to_char_boundary(&t.text, at - start);
                let (head, tail) = t.text.split_at(split);
                if !head.is_empty() {
                    left.push(Node::Text(TextNode {
                        text: head.to_string(),
                        marks: t.marks.clone(),
                    }));
                }
                if !tail.is_empty() {
                    right.push(Node::Text(TextNode {
                        text: tail.to_string(),
                        marks: t.marks.clone(),
                    }));
                }
            }
            _ if end <= at && start < at => left.push(node.clone()),
            _ => right.push(node.clone()),
        }
    }

    (left, right)
}

/// Text of the leaves between two global offsets. Voids contribute nothing.
pub(crate) fn inline_text_between(children: &[Node], from: usize, to: usize) -> String {
    let mut out = String::new();
    let mut cursor = 0usize;
    for node in children {
        let start = cursor;
        let end = cursor + inline_len(node);
        cursor = end;
        let Node::Text(t) = node else {
            continue;
        };
        if end <= from || start >= to {
            continue;
        }
        let a = clamp_to_char_boundary(&t.text, from.saturating_sub(start));
        let b = clamp_to_char_boundary(&t.text, to.saturating_sub(start));
        out.push_str(&t.text[a..b]);
    }
    out
}

pub(crate) fn is_point_in_block(point: &Point, block_path: &[usize]) -> bool {
    point.path.len() == block_path.len() + 1 && point.path.starts_with(block_path)
}

pub(crate) fn block_path_of(point: &Point) -> Option<&[usize]> {
    point.path.split_last().map(|(_, p)| p).filter(|p| !p.is_empty())
}

pub(crate) struct TextBlock<'a> {
    pub path: Path,
    pub el: &'a ElementNode,
}

pub(crate) fn element_is_text_block(el: &ElementNode, registry: &PluginRegistry) -> bool {
    match registry.child_constraint(&el.kind) {
        Some(ChildConstraint::InlineOnly) => true,
        Some(_) => false,
        None => el
            .children
            .iter()
            .any(|n| matches!(n, Node::Text(_) | Node::Void(_))),
    }
}

pub(crate) fn text_blocks_in_order<'a>(
    doc: &'a Document,
    registry: &PluginRegistry,
) -> Vec<TextBlock<'a>> {
    fn walk<'a>(
        nodes: &'a [Node],
        path: &mut Vec<usize>,
        registry: &PluginRegistry,
        out: &mut Vec<TextBlock<'a>>,
    ) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };

            path.push(ix);

            if element_is_text_block(el, registry) {
                out.push(TextBlock {
                    path: path.clone(),
                    el,
                });
            } else {
                walk(&el.children, path, registry, out);
            }

            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), registry, &mut out);
    out
}

pub(crate) fn ordered_selection_points(sel: &Selection) -> (Point, Point) {
    let mut start = sel.anchor.clone();
    let mut end = sel.focus.clone();

    if start.path == end.path {
        if end.offset < start.offset {
            std::mem::swap(&mut start, &mut end);
        }
        return (start, end);
    }
    if end.path < start.path {
        std::mem::swap(&mut start, &mut end);
    }
    (start, end)
}

/// Text blocks in document order plus the inclusive index range the selection covers.
pub(crate) fn selected_blocks<'a>(
    doc: &'a Document,
    registry: &PluginRegistry,
    sel: &Selection,
) -> Result<(Vec<TextBlock<'a>>, usize, usize), String> {
    let (start, end) = ordered_selection_points(sel);
    let start_block_path = block_path_of(&start)
        .ok_or_else(|| "Selection start is not in a text block".to_string())?;
    let end_block_path =
        block_path_of(&end).ok_or_else(|| "Selection end is not in a text block".to_string())?;

    let blocks = text_blocks_in_order(doc, registry);
    let start_index = blocks
        .iter()
        .position(|b| b.path == start_block_path)
        .ok_or_else(|| "Selection start is not in a text block".to_string())?;
    let end_index = blocks
        .iter()
        .position(|b| b.path == end_block_path)
        .ok_or_else(|| "Selection end is not in a text block".to_string())?;

    let (a, b) = if start_index <= end_index {
        (start_index, end_index)
    } else {
        (end_index, start_index)
    };
    Ok((blocks, a, b))
}

/// The text block holding the focus point.
pub(crate) fn focus_block(editor: &Editor) -> Option<(Path, &ElementNode)> {
    let block_path = block_path_of(&editor.selection().focus)?;
    match node_ref(editor.doc(), block_path)? {
        Node::Element(el) => Some((block_path.to_vec(), el)),
        _ => None,
    }
}

pub(crate) fn children_at_path<'a>(doc: &'a Document, parent_path: &[usize]) -> Option<&'a [Node]> {
    if parent_path.is_empty() {
        return Some(&doc.children);
    }
    match node_ref(doc, parent_path)? {
        Node::Element(el) => Some(&el.children),
        Node::Void(_) | Node::Text(_) => None,
    }
}

/// Nearest element of `kind` on the path from `point_path` up to the root.
pub(crate) fn nearest_ancestor_path(doc: &Document, point_path: &[usize], kind: &str) -> Option<Path> {
    let mut path: Path = point_path.to_vec();
    while !path.is_empty() {
        if matches!(node_ref(doc, &path), Some(Node::Element(el)) if el.kind == kind) {
            return Some(path);
        }
        path.pop();
    }
    None
}

/// Visit every element in document order.
pub(crate) fn for_each_element(doc: &Document, mut f: impl FnMut(&[usize], &ElementNode)) {
    fn walk(
        nodes: &[Node],
        path: &mut Vec<usize>,
        f: &mut dyn FnMut(&[usize], &ElementNode),
    ) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            f(path, el);
            walk(&el.children, path, f);
            path.pop();
        }
    }

    walk(&doc.children, &mut Vec::new(), &mut f);
}

/// Point at `text_offset` bytes of leaf text into `children`, skipping voids.
fn point_for_text_offset(block_path: &[usize], children: &[Node], text_offset: usize) -> Point {
    let mut remaining = text_offset;
    let mut last = None;
    for (ix, node) in children.iter().enumerate() {
        let Node::Text(t) = node else {
            continue;
        };
        if remaining <= t.text.len() {
            return Point::new(
                child_path(block_path, ix),
                clamp_to_char_boundary(&t.text, remaining),
            );
        }
        remaining -= t.text.len();
        last = Some((ix, t.text.len()));
    }
    match last {
        Some((ix, len)) => Point::new(child_path(block_path, ix), len),
        None => Point::new(child_path(block_path, 0), 0),
    }
}

/// Rewrite every selected text block with `convert` (`None` keeps a block as is).
///
/// Converted blocks keep their text; selection points inside them are carried
/// over by text offset so dropped voids (a checklist checkbox) do not shift them.
pub(crate) fn convert_selected_blocks(
    editor: &Editor,
    source: &str,
    convert: impl Fn(&ElementNode) -> Option<ElementNode>,
) -> Result<Transaction, String> {
    let sel = editor.selection().clone();
    let (blocks, a, b) = selected_blocks(editor.doc(), editor.registry(), &sel)?;

    let mut ops: Vec<Op> = Vec::new();
    let mut anchor = sel.anchor.clone();
    let mut focus = sel.focus.clone();

    for block in &blocks[a..=b] {
        let Some(next) = convert(block.el) else {
            continue;
        };
        if &next == block.el {
            continue;
        }
        for point in [&mut anchor, &mut focus] {
            if is_point_in_block(point, &block.path) {
                let global = point_global_offset(
                    &block.el.children,
                    point.path.last().copied().unwrap_or(0),
                    point.offset,
                );
                let text_offset = inline_text_between(&block.el.children, 0, global).len();
                *point = point_for_text_offset(&block.path, &next.children, text_offset);
            }
        }
        ops.extend(Op::replace(block.path.clone(), Node::Element(next)));
    }

    if ops.is_empty() {
        return Ok(Transaction::default());
    }
    Ok(Transaction::new(ops)
        .selection_after(Selection { anchor, focus })
        .source(source))
}

/// Attributes a text block keeps when it changes kind.
///
/// Kind-specific attrs are dropped; a list level becomes an indent and back.
pub(crate) fn carried_block_attrs(el: &ElementNode, into_list: bool) -> Attrs {
    let mut attrs = el.attrs.clone();
    for key in ["level", "list_type", "checked"] {
        attrs.remove(key);
    }
    let list_level = attrs.remove("list_level");
    let indent = attrs.remove("indent");
    let level = list_level
        .or(indent)
        .and_then(|v| v.as_u64())
        .filter(|v| *v > 0);
    if let Some(level) = level {
        let key = if into_list { "list_level" } else { "indent" };
        attrs.insert(key.to_string(), Value::from(level.min(MAX_INDENT_LEVEL)));
    }
    attrs
}

/// Inline children without checklist checkboxes.
pub(crate) fn without_checkboxes(children: &[Node]) -> Vec<Node> {
    let out: Vec<Node> = children
        .iter()
        .filter(|n| n.element_kind() != Some("checkbox"))
        .cloned()
        .collect();
    if out.is_empty() {
        vec![Node::text("")]
    } else {
        out
    }
}

pub(crate) struct StartBlock {
    pub path: Path,
    pub element: ElementNode,
    /// Inline content left in the start block once the range is gone.
    pub remaining: Vec<Node>,
    /// Global offset of the collapsed caret inside `remaining`.
    pub caret: usize,
}

pub(crate) struct RangeCut {
    /// Ops rewriting every block after the start block. The start block is left to the caller.
    pub ops: Vec<Op>,
    pub start: StartBlock,
    pub selected_text: String,
    pub multiline: bool,
}

/// Remove the selected range.
///
/// With `merge` the tail of the end block joins the start block (typing over a
/// range); without it the tail stays in its own block.
pub(crate) fn cut_selection(
    doc: &Document,
    registry: &PluginRegistry,
    sel: &Selection,
    merge: bool,
) -> Result<RangeCut, String> {
    let (start, end) = ordered_selection_points(sel);
    let (blocks, a, b) = selected_blocks(doc, registry, sel)?;

    let first = &blocks[a];
    let last = &blocks[b];
    let s = point_global_offset(
        &first.el.children,
        start.path.last().copied().unwrap_or(0),
        start.offset,
    );
    let e = point_global_offset(
        &last.el.children,
        end.path.last().copied().unwrap_or(0),
        end.offset,
    );

    if a == b {
        let (s, e) = (s.min(e), s.max(e));
        let children = &first.el.children;
        let (mut remaining, _) = split_inline(children, s);
        let (_, right) = split_inline(children, e);
        remaining.extend(right);
        let selected_text = inline_text_between(children, s, e);
        return Ok(RangeCut {
            ops: Vec::new(),
            multiline: selected_text.contains('\n'),
            selected_text,
            start: StartBlock {
                path: first.path.clone(),
                element: first.el.clone(),
                remaining,
                caret: s,
            },
        });
    }

    let first_len = total_inline_text_len(&first.el.children);
    let mut lines = vec![inline_text_between(&first.el.children, s, first_len)];
    for block in &blocks[a + 1..b] {
        lines.push(inline_text_between(
            &block.el.children,
            0,
            total_inline_text_len(&block.el.children),
        ));
    }
    lines.push(inline_text_between(&last.el.children, 0, e));

    let (mut remaining, _) = split_inline(&first.el.children, s);
    let (_, tail) = split_inline(&last.el.children, e);

    let mut ops: Vec<Op> = Vec::new();
    if merge {
        ops.push(Op::RemoveNode {
            path: last.path.clone(),
        });
        remaining.extend(tail);
    } else {
        let mut end_block = last.el.clone();
        end_block.children = if tail.is_empty() {
            vec![Node::text("")]
        } else {
            tail
        };
        ops.extend(Op::replace(last.path.clone(), Node::Element(end_block)));
    }
    for block in blocks[a + 1..b].iter().rev() {
        ops.push(Op::RemoveNode {
            path: block.path.clone(),
        });
    }

    Ok(RangeCut {
        ops,
        start: StartBlock {
            path: first.path.clone(),
            element: first.el.clone(),
            remaining,
            caret: s,
        },
        selected_text: lines.join("\n"),
        multiline: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Marks;

    fn leaf(text: &str, bold: bool) -> Node {
        Node::Text(TextNode {
            text: text.to_string(),
            marks: Marks {
                bold,
                ..Marks::default()
            },
        })
    }

    #[test]
    fn split_inline_cuts_inside_a_leaf() {
        let children = vec![leaf("ab", false), leaf("cd", true)];
        let (left, right) = split_inline(&children, 3);
        assert_eq!(left, vec![leaf("ab", false), leaf("c", true)]);
        assert_eq!(right, vec![leaf("d", true)]);
    }

    #[test]
    fn split_inline_keeps_voids_on_their_side() {
        let children = vec![Node::checkbox(false), leaf("task", false)];
        let (left, right) = split_inline(&children, 1);
        assert_eq!(left, vec![Node::checkbox(false)]);
        assert_eq!(right, vec![leaf("task", false)]);
    }

    #[test]
    fn inline_text_skips_voids() {
        let children = vec![Node::checkbox(true), leaf("hello", false)];
        assert_eq!(inline_text_between(&children, 0, 6), "hello");
        assert_eq!(inline_text_between(&children, 2, 4), "el");
    }

    #[test]
    fn global_offsets_round_trip_around_a_void() {
        let children = vec![Node::checkbox(false), leaf("abc", false)];
        assert_eq!(point_global_offset(&children, 1, 2), 3);
        assert_eq!(
            point_for_global_offset(&[0], &children, 3),
            Point::new(vec![0, 1], 2)
        );
        assert_eq!(
            point_for_global_offset(&[0], &children, 0),
            Point::new(vec![0, 1], 0)
        );
    }
}
