//! URL slugs: derived from the title unless the author overrides them.

use serde::{Deserialize, Serialize};

/// Lowercase, whitespace runs to `-`, drop anything but word characters and
/// `-`, collapse repeated `-`, trim `-` from both ends.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_whitespace = false;

    for ch in title.to_lowercase().chars() {
        if is_slug_whitespace(ch) {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            slug.push(ch);
        }
    }

    let mut collapsed = String::with_capacity(slug.len());
    for ch in slug.chars() {
        if ch == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed.trim_matches('-').to_string()
}

/// Unicode white space as title inputs treat it: BOM included, NEL excluded.
fn is_slug_whitespace(ch: char) -> bool {
    ch == '\u{feff}' || (ch.is_whitespace() && ch != '\u{85}')
}

/// `https://{host}/{author_id}/{slug}`, for display only.
pub fn url_preview(host: &str, author_id: &str, slug: &str) -> String {
    format!("https://{host}/{author_id}/{slug}")
}

/// The custom-slug override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugSettings {
    custom_enabled: bool,
    custom: String,
}

impl SlugSettings {
    pub fn is_custom_enabled(&self) -> bool {
        self.custom_enabled
    }

    pub fn custom(&self) -> &str {
        &self.custom
    }

    /// Turning the override on seeds it from a non-empty title; turning it off clears it.
    pub fn set_custom_enabled(&mut self, enabled: bool, title: &str) {
        if enabled == self.custom_enabled {
            return;
        }
        self.custom_enabled = enabled;
        if enabled && !title.is_empty() {
            self.custom = generate_slug(title);
        } else if !enabled {
            self.custom.clear();
        }
    }

    /// Store the override verbatim. It only takes effect while enabled.
    pub fn set_custom(&mut self, custom: impl Into<String>) {
        self.custom = custom.into();
    }

    /// The slug in effect for `title`.
    pub fn slug(&self, title: &str) -> String {
        if self.custom_enabled && !self.custom.is_empty() {
            self.custom.clone()
        } else {
            generate_slug(title)
        }
    }

    /// The override as submitted: empty unless enabled.
    pub fn submitted_custom(&self) -> &str {
        if self.custom_enabled { &self.custom } else { "" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_from_punctuated_title() {
        assert_eq!(generate_slug("Hello, World!  "), "hello-world");
    }

    #[test]
    fn slug_edge_cases() {
        assert_eq!(generate_slug(""), "");
        assert_eq!(generate_slug("   \t "), "");
        assert_eq!(generate_slug("  Rust -- 2024 Edition "), "rust-2024-edition");
        assert_eq!(generate_slug("snake_case stays"), "snake_case-stays");
        assert_eq!(generate_slug("Café au lait"), "caf-au-lait");
        assert_eq!(generate_slug("---Already-Slugged---"), "already-slugged");
    }

    #[test]
    fn byte_order_mark_separates_words() {
        assert_eq!(generate_slug("one\u{feff}two"), "one-two");
        assert_eq!(generate_slug("no\u{a0}break"), "no-break");
        assert_eq!(generate_slug("next\u{85}line"), "nextline");
    }

    #[test]
    fn preview_joins_host_author_and_slug() {
        assert_eq!(
            url_preview("buletin.co", "cyrpoto011", "hello-world"),
            "https://buletin.co/cyrpoto011/hello-world"
        );
    }
}
