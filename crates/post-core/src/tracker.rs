//! Which toolbar formats apply at the current selection.

use crate::core::{Document, Node, Point, node_ref};
use crate::format::{ActiveFormatSet, FormatId};
use crate::insert::is_checklist_item;
use crate::platform::{PlatformError, RichTextSurface};

const INLINE_STATES: [(&str, FormatId); 4] = [
    ("bold", FormatId::Bold),
    ("italic", FormatId::Italic),
    ("underline", FormatId::Underline),
    ("strikeThrough", FormatId::Strike),
];

const ALIGN_STATES: [(&str, FormatId); 4] = [
    ("justifyLeft", FormatId::AlignLeft),
    ("justifyCenter", FormatId::AlignCenter),
    ("justifyRight", FormatId::AlignRight),
    ("justifyFull", FormatId::AlignJustify),
];

const LIST_STATES: [(&str, FormatId); 2] = [
    ("insertUnorderedList", FormatId::BulletList),
    ("insertOrderedList", FormatId::NumberedList),
];

/// Recompute the active set from scratch.
///
/// Never fails: an inspection error is logged and yields an empty set.
pub fn compute_active_formats<S>(surface: &S, focus_mode: bool) -> ActiveFormatSet
where
    S: RichTextSurface + ?Sized,
{
    let Some(selection) = surface.active_selection() else {
        let mut active = ActiveFormatSet::new();
        if focus_mode {
            active.insert(FormatId::FocusMode);
        }
        return active;
    };

    match inspect(surface, &selection.anchor, focus_mode) {
        Ok(active) => active,
        Err(err) => {
            tracing::warn!(error = %err, "failed to inspect formatting at the selection");
            ActiveFormatSet::new()
        }
    }
}

fn inspect<S>(surface: &S, anchor: &Point, focus_mode: bool) -> Result<ActiveFormatSet, PlatformError>
where
    S: RichTextSurface + ?Sized,
{
    let mut active = ActiveFormatSet::new();

    for (command, id) in INLINE_STATES.iter().chain(&ALIGN_STATES).chain(&LIST_STATES) {
        if surface.query_state(command)? {
            active.insert(*id);
        }
    }

    for id in ancestry_formats(surface.doc(), anchor)? {
        active.insert(id);
    }

    if focus_mode {
        active.insert(FormatId::FocusMode);
    }
    Ok(active)
}

/// Block formats from the elements enclosing `anchor`, innermost first.
fn ancestry_formats(doc: &Document, anchor: &Point) -> Result<Vec<FormatId>, PlatformError> {
    let Some(Node::Text(leaf)) = node_ref(doc, &anchor.path) else {
        return Err(PlatformError::DetachedSelection);
    };

    let mut heading: Option<FormatId> = None;
    let mut paragraph = false;
    let mut quote = false;
    let mut code = leaf.marks.code;
    let mut check_list = false;

    let mut path = anchor.path.clone();
    while path.pop().is_some() && !path.is_empty() {
        let Some(Node::Element(el)) = node_ref(doc, &path) else {
            return Err(PlatformError::DetachedSelection);
        };
        match el.kind.as_str() {
            "heading" if heading.is_none() => {
                heading = match el.attr_u64("level") {
                    Some(1) => Some(FormatId::Heading1),
                    Some(2) => Some(FormatId::Heading2),
                    Some(3) => Some(FormatId::Heading3),
                    _ => None,
                };
            }
            "paragraph" => paragraph = true,
            "blockquote" => quote = true,
            "code_block" => code = true,
            "list_item" => check_list |= is_checklist_item(el),
            _ => {}
        }
    }

    let mut formats = Vec::new();
    match heading {
        Some(id) => formats.push(id),
        None if paragraph => formats.push(FormatId::Paragraph),
        None => {}
    }
    if quote {
        formats.push(FormatId::Quote);
    }
    if code {
        formats.push(FormatId::Code);
    }
    if check_list {
        formats.push(FormatId::CheckList);
    }
    Ok(formats)
}
