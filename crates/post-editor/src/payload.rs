use std::fmt;

use buletin_post_core::{Document, PostType, has_paid_marker, to_html};
use serde::{Deserialize, Serialize};

use crate::metadata::PostMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitKind {
    Draft,
    Publish,
}

impl fmt::Display for SubmitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmitKind::Draft => "draft",
            SubmitKind::Publish => "publish",
        })
    }
}

/// What "save as draft" and "publish" hand to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitPayload {
    pub kind: SubmitKind,
    pub title: String,
    pub subtitle: String,
    /// Serialized body markup.
    pub content: String,
    pub post_type: PostType,
    /// Empty unless the custom slug is enabled.
    pub custom_slug: String,
    pub has_paid_marker: bool,
}

impl SubmitPayload {
    pub fn build(kind: SubmitKind, metadata: &PostMetadata, doc: &Document) -> Self {
        Self {
            kind,
            title: metadata.title.clone(),
            subtitle: metadata.subtitle.clone(),
            content: to_html(doc),
            post_type: metadata.post_type,
            custom_slug: metadata.slug.submitted_custom().to_string(),
            has_paid_marker: has_paid_marker(doc),
        }
    }
}

/// State captured when a debounced autosave fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosaveSnapshot {
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub post_type: PostType,
    pub custom_slug: String,
}

impl AutosaveSnapshot {
    pub fn capture(metadata: &PostMetadata, doc: &Document) -> Self {
        Self {
            title: metadata.title.clone(),
            subtitle: metadata.subtitle.clone(),
            content: to_html(doc),
            post_type: metadata.post_type,
            custom_slug: metadata.slug.submitted_custom().to_string(),
        }
    }
}
