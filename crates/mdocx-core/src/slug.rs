//! Heading anchors
//!
//! One slug algorithm produces every anchor: section ids, bookmark names
//! in packages, and table of contents targets.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

fn strip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid regex"))
}

fn collapse_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_-]+").expect("valid regex"))
}

/// Convert heading text into an anchor.
///
/// Lowercase, trim, drop characters that are not word characters,
/// whitespace or hyphens, collapse runs of whitespace, underscores and
/// hyphens into one hyphen, then trim hyphens from both ends.
///
/// ```
/// use mdocx_core::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
/// ```
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = strip_re().replace_all(lower.trim(), "");
    let collapsed = collapse_re().replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Hands out unique anchors for one document.
///
/// The first use of a slug is returned unchanged; repeats get `-1`,
/// `-2`, ... appended. Empty slugs become `section`.
#[derive(Debug, Clone, Default)]
pub struct AnchorAllocator {
    seen: HashMap<String, usize>,
}

impl AnchorAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the anchor for a heading
    pub fn allocate(&mut self, title: &str) -> String {
        let mut base = slugify(title);
        if base.is_empty() {
            base = "section".to_string();
        }
        loop {
            let count = self.seen.entry(base.clone()).or_insert(0);
            let candidate = if *count == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, count)
            };
            *count += 1;
            // A suffixed candidate may collide with a literal heading slug
            if candidate == base || !self.seen.contains_key(&candidate) {
                self.seen.entry(candidate.clone()).or_insert(1);
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
    }

    #[test]
    fn test_slugify_whitespace() {
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
    }

    #[test]
    fn test_slugify_underscores_and_hyphens() {
        assert_eq!(slugify("snake_case -- and - dashes"), "snake-case-and-dashes");
        assert_eq!(slugify("-Leading and trailing-"), "leading-and-trailing");
    }

    #[test]
    fn test_slugify_unicode_word_chars() {
        assert_eq!(slugify("Über Café"), "über-café");
        assert_eq!(slugify("1.2 Release Notes"), "12-release-notes");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        let once = slugify("API Reference (v2)");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn test_allocator_dedupes() {
        let mut anchors = AnchorAllocator::new();
        assert_eq!(anchors.allocate("Overview"), "overview");
        assert_eq!(anchors.allocate("Overview"), "overview-1");
        assert_eq!(anchors.allocate("Overview"), "overview-2");
        assert_eq!(anchors.allocate("Details"), "details");
    }

    #[test]
    fn test_allocator_avoids_literal_collision() {
        let mut anchors = AnchorAllocator::new();
        assert_eq!(anchors.allocate("Setup 1"), "setup-1");
        assert_eq!(anchors.allocate("Setup"), "setup");
        assert_eq!(anchors.allocate("Setup"), "setup-2");
    }

    #[test]
    fn test_allocator_empty_title() {
        let mut anchors = AnchorAllocator::new();
        assert_eq!(anchors.allocate("!!!"), "section");
    }
}
