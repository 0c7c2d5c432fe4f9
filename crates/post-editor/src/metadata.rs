use buletin_post_core::PostType;
use serde::{Deserialize, Serialize};

use crate::slug::SlugSettings;

/// Everything about a post besides its body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostMetadata {
    pub title: String,
    pub subtitle: String,
    pub post_type: PostType,
    pub slug: SlugSettings,
}

impl PostMetadata {
    pub fn slug(&self) -> String {
        self.slug.slug(&self.title)
    }
}
