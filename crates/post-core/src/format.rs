use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A toolbar formatting command, and the state it highlights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatId {
    Bold,
    Italic,
    Underline,
    Strike,
    AlignLeft,
    AlignCenter,
    AlignRight,
    AlignJustify,
    #[serde(rename = "heading-1", alias = "h1")]
    Heading1,
    #[serde(rename = "heading-2", alias = "h2")]
    Heading2,
    #[serde(rename = "heading-3", alias = "h3")]
    Heading3,
    Paragraph,
    Quote,
    Code,
    BulletList,
    NumberedList,
    CheckList,
    Link,
    Image,
    Table,
    Indent,
    Outdent,
    Subscript,
    Superscript,
    FocusMode,
}

impl FormatId {
    pub const ALL: [FormatId; 25] = [
        FormatId::Bold,
        FormatId::Italic,
        FormatId::Underline,
        FormatId::Strike,
        FormatId::AlignLeft,
        FormatId::AlignCenter,
        FormatId::AlignRight,
        FormatId::AlignJustify,
        FormatId::Heading1,
        FormatId::Heading2,
        FormatId::Heading3,
        FormatId::Paragraph,
        FormatId::Quote,
        FormatId::Code,
        FormatId::BulletList,
        FormatId::NumberedList,
        FormatId::CheckList,
        FormatId::Link,
        FormatId::Image,
        FormatId::Table,
        FormatId::Indent,
        FormatId::Outdent,
        FormatId::Subscript,
        FormatId::Superscript,
        FormatId::FocusMode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormatId::Bold => "bold",
            FormatId::Italic => "italic",
            FormatId::Underline => "underline",
            FormatId::Strike => "strike",
            FormatId::AlignLeft => "align-left",
            FormatId::AlignCenter => "align-center",
            FormatId::AlignRight => "align-right",
            FormatId::AlignJustify => "align-justify",
            FormatId::Heading1 => "heading-1",
            FormatId::Heading2 => "heading-2",
            FormatId::Heading3 => "heading-3",
            FormatId::Paragraph => "paragraph",
            FormatId::Quote => "quote",
            FormatId::Code => "code",
            FormatId::BulletList => "bullet-list",
            FormatId::NumberedList => "numbered-list",
            FormatId::CheckList => "check-list",
            FormatId::Link => "link",
            FormatId::Image => "image",
            FormatId::Table => "table",
            FormatId::Indent => "indent",
            FormatId::Outdent => "outdent",
            FormatId::Subscript => "subscript",
            FormatId::Superscript => "superscript",
            FormatId::FocusMode => "focus-mode",
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format identifier: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for FormatId {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alias = match s {
            "h1" => Some(FormatId::Heading1),
            "h2" => Some(FormatId::Heading2),
            "h3" => Some(FormatId::Heading3),
            _ => None,
        };
        alias
            .or_else(|| FormatId::ALL.into_iter().find(|id| id.as_str() == s))
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// Formats active at the selection, in [`FormatId`] declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveFormatSet(BTreeSet<FormatId>);

impl ActiveFormatSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: FormatId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: FormatId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = FormatId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<FormatId> for ActiveFormatSet {
    fn from_iter<I: IntoIterator<Item = FormatId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ActiveFormatSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(FormatId::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_heading_aliases() {
        assert_eq!("bullet-list".parse::<FormatId>(), Ok(FormatId::BulletList));
        assert_eq!("h2".parse::<FormatId>(), Ok(FormatId::Heading2));
        assert_eq!("heading-3".parse::<FormatId>(), Ok(FormatId::Heading3));
        assert!("blink".parse::<FormatId>().is_err());
    }

    #[test]
    fn names_match_serde() {
        for id in FormatId::ALL {
            let json = serde_json::to_value(id).unwrap();
            assert_eq!(json, serde_json::Value::String(id.as_str().to_string()));
        }
    }

    #[test]
    fn set_serializes_as_ordered_array() {
        let set: ActiveFormatSet = [FormatId::FocusMode, FormatId::Bold, FormatId::Heading1]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            serde_json::json!(["bold", "heading-1", "focus-mode"])
        );
    }
}
