//! Applies toolbar formats to a [`RichTextSurface`].

use crate::format::{ActiveFormatSet, FormatId};
use crate::platform::{PlatformError, RichTextSurface, UrlPrompt};
use crate::plugin::CommandError;
use crate::tracker::compute_active_formats;

pub const LINK_PROMPT: &str = "Enter URL:";
pub const IMAGE_PROMPT: &str = "Enter image URL:";
pub const URL_PROMPT_DEFAULT: &str = "https://";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatOutcome {
    Applied,
    FocusModeToggled,
    /// Nothing to format: the surface has no live selection.
    NoSelection,
    /// The URL prompt was dismissed or left blank.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Platform operation or registry command a format maps to.
enum Action {
    Execute(&'static str, Option<&'static str>),
    Command(&'static str),
    Prompted {
        message: &'static str,
        command: &'static str,
    },
    ToggleFocusMode,
}

fn action_for(id: FormatId) -> Action {
    use Action::*;

    match id {
        FormatId::Bold => Execute("bold", None),
        FormatId::Italic => Execute("italic", None),
        FormatId::Underline => Execute("underline", None),
        FormatId::Strike => Execute("strikeThrough", None),
        FormatId::Subscript => Execute("subscript", None),
        FormatId::Superscript => Execute("superscript", None),
        FormatId::AlignLeft => Execute("justifyLeft", None),
        FormatId::AlignCenter => Execute("justifyCenter", None),
        FormatId::AlignRight => Execute("justifyRight", None),
        FormatId::AlignJustify => Execute("justifyFull", None),
        FormatId::Heading1 => Execute("formatBlock", Some("h1")),
        FormatId::Heading2 => Execute("formatBlock", Some("h2")),
        FormatId::Heading3 => Execute("formatBlock", Some("h3")),
        FormatId::Paragraph => Execute("formatBlock", Some("p")),
        FormatId::Quote => Execute("formatBlock", Some("blockquote")),
        FormatId::BulletList => Execute("insertUnorderedList", None),
        FormatId::NumberedList => Execute("insertOrderedList", None),
        FormatId::Indent => Execute("indent", None),
        FormatId::Outdent => Execute("outdent", None),
        FormatId::CheckList => Command("checklist.insert"),
        FormatId::Code => Command("code.insert"),
        FormatId::Table => Command("table.insert_template"),
        FormatId::Link => Prompted {
            message: LINK_PROMPT,
            command: "createLink",
        },
        FormatId::Image => Prompted {
            message: IMAGE_PROMPT,
            command: "insertImage",
        },
        FormatId::FocusMode => ToggleFocusMode,
    }
}

/// Session-scoped formatting state: the focus-mode flag, plus the tracker and
/// mutator that read it.
#[derive(Debug, Clone, Default)]
pub struct FormatEngine {
    focus_mode: bool,
}

impl FormatEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus_mode(&self) -> bool {
        self.focus_mode
    }

    pub fn set_focus_mode(&mut self, on: bool) {
        self.focus_mode = on;
    }

    pub fn active_formats<S>(&self, surface: &S) -> ActiveFormatSet
    where
        S: RichTextSurface + ?Sized,
    {
        compute_active_formats(surface, self.focus_mode)
    }

    /// Apply `id` at the surface's selection. On error the document is unchanged.
    pub fn apply<S, P>(
        &mut self,
        surface: &mut S,
        id: FormatId,
        prompt: &mut P,
    ) -> Result<FormatOutcome, FormatError>
    where
        S: RichTextSurface + ?Sized,
        P: UrlPrompt + ?Sized,
    {
        if surface.active_selection().is_none() {
            tracing::debug!(format = %id, "no selection, format ignored");
            return Ok(FormatOutcome::NoSelection);
        }
        tracing::debug!(format = %id, "applying format");

        match action_for(id) {
            Action::Execute(command, value) => surface.execute(command, value)?,
            Action::Command(command) => surface.run_command(command, None)?,
            Action::Prompted { message, command } => {
                let answer = prompt
                    .prompt(message, URL_PROMPT_DEFAULT)
                    .map(|url| url.trim().to_string())
                    .filter(|url| !url.is_empty());
                let Some(url) = answer else {
                    tracing::debug!(format = %id, "url prompt cancelled");
                    return Ok(FormatOutcome::Cancelled);
                };
                surface.execute(command, Some(&url))?;
            }
            Action::ToggleFocusMode => {
                self.focus_mode = !self.focus_mode;
                return Ok(FormatOutcome::FocusModeToggled);
            }
        }
        Ok(FormatOutcome::Applied)
    }
}
