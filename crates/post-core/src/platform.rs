//! The text-editing surface the formatting engine talks to.
//!
//! Command names follow the contentEditable `queryCommandState` /
//! `execCommand` vocabulary. [`Editor`] is the native surface; tests can wrap
//! it to fake platform answers.

use serde_json::{Value, json};

use crate::blocks::{ALIGNMENTS, align_states, active_list_type};
use crate::core::{Document, Editor, Selection};
use crate::marks::{MarkGetter, mark_active, toggle_mark};
use crate::plugin::{CommandError, QueryError};

#[derive(Debug, Clone, thiserror::Error)]
pub enum PlatformError {
    #[error("unsupported platform command: {0}")]
    Unsupported(String),
    #[error("platform command {0} needs a value")]
    MissingValue(String),
    #[error("selection is detached from the document")]
    DetachedSelection,
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Query and apply named formatting operations at the current selection.
pub trait FormatPlatform {
    fn query_state(&self, command: &str) -> Result<bool, PlatformError>;

    fn execute(&mut self, command: &str, value: Option<&str>) -> Result<(), PlatformError>;
}

/// A platform that also exposes the document and the registry commands that
/// have no platform primitive (check-list, code, table, paid marker).
pub trait RichTextSurface: FormatPlatform {
    fn doc(&self) -> &Document;

    /// `None` while the surface holds no live range.
    fn active_selection(&self) -> Option<&Selection>;

    fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError>;
}

/// Asks the user for a value. `None` or a blank answer means cancelled.
pub trait UrlPrompt {
    fn prompt(&mut self, message: &str, default: &str) -> Option<String>;
}

impl<F> UrlPrompt for F
where
    F: FnMut(&str, &str) -> Option<String>,
{
    fn prompt(&mut self, message: &str, default: &str) -> Option<String> {
        self(message, default)
    }
}

fn mark_command(command: &str) -> Option<(&'static str, MarkGetter)> {
    let name = match command {
        "strikeThrough" => "strikethrough",
        other => other,
    };
    toggle_mark(name)
}

fn justify_command(command: &str) -> Option<usize> {
    let align = match command {
        "justifyLeft" => "left",
        "justifyCenter" => "center",
        "justifyRight" => "right",
        "justifyFull" => "justify",
        _ => return None,
    };
    ALIGNMENTS.iter().position(|a| *a == align)
}

fn require<'a>(command: &str, value: Option<&'a str>) -> Result<&'a str, PlatformError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PlatformError::MissingValue(command.to_string()))
}

impl FormatPlatform for Editor {
    fn query_state(&self, command: &str) -> Result<bool, PlatformError> {
        if let Some((_, get)) = mark_command(command) {
            return Ok(mark_active(self, get));
        }
        if let Some(ix) = justify_command(command) {
            return Ok(align_states(self)[ix]);
        }
        match command {
            "insertUnorderedList" => Ok(active_list_type(self) == Some("bulleted")),
            "insertOrderedList" => Ok(active_list_type(self) == Some("ordered")),
            other => Err(PlatformError::Unsupported(other.to_string())),
        }
    }

    fn execute(&mut self, command: &str, value: Option<&str>) -> Result<(), PlatformError> {
        if let Some((id, _)) = mark_command(command) {
            return Ok(self.run_command(id, None)?);
        }
        if let Some(ix) = justify_command(command) {
            let args = json!({ "align": ALIGNMENTS[ix] });
            return Ok(self.run_command("block.set_align", Some(args))?);
        }

        let (id, args) = match command {
            "insertUnorderedList" => ("list.toggle_bulleted", None),
            "insertOrderedList" => ("list.toggle_ordered", None),
            "indent" => ("block.indent_increase", None),
            "outdent" => ("block.indent_decrease", None),
            "unlink" => ("marks.unset_link", None),
            "createLink" => ("marks.set_link", Some(json!({ "url": require(command, value)? }))),
            "insertImage" => ("image.insert", Some(json!({ "src": require(command, value)? }))),
            "insertText" => ("text.insert", Some(json!({ "text": value.unwrap_or_default() }))),
            "formatBlock" => {
                let tag = require(command, value)?
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_ascii_lowercase();
                match tag.as_str() {
                    "blockquote" => ("blockquote.wrap", None),
                    "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        ("block.set_type", Some(json!({ "type": tag })))
                    }
                    _ => return Err(PlatformError::Unsupported(format!("formatBlock {tag}"))),
                }
            }
            other => return Err(PlatformError::Unsupported(other.to_string())),
        };
        Ok(self.run_command(id, args)?)
    }
}

impl RichTextSurface for Editor {
    fn doc(&self) -> &Document {
        Editor::doc(self)
    }

    fn active_selection(&self) -> Option<&Selection> {
        Editor::active_selection(self)
    }

    fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        Editor::run_command(self, id, args)
    }
}
