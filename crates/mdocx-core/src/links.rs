//! Link resolution
//!
//! Classifies link targets and computes the rewritten form the package
//! serializer emits. Resolution is pure: the same input always yields
//! the same [`ProcessedLink`].

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::slug::slugify;

/// What a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Another document or file, by relative path
    Internal,
    /// A location reachable through a URL scheme
    External,
    /// A heading in the same document
    Anchor,
}

/// A classified link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedLink {
    pub text: String,
    pub url: String,
    pub kind: LinkKind,
    pub is_valid: bool,
    /// Target to emit instead of `url`, when it differs
    pub rewritten_url: Option<String>,
    /// Why the link is invalid
    pub warning: Option<String>,
}

impl ProcessedLink {
    /// Target the serializer should emit
    pub fn target(&self) -> &str {
        self.rewritten_url.as_deref().unwrap_or(&self.url)
    }

    /// Anchor or relative path links
    pub fn is_internal(&self) -> bool {
        matches!(self.kind, LinkKind::Internal | LinkKind::Anchor)
    }
}

/// Schemes that are complete without `//`
const OPAQUE_SCHEMES: &[&str] = &["mailto:", "tel:", "data:", "urn:"];

fn scheme_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(https?|ftps?)(\.|:|$)").expect("valid regex")
    })
}

/// Link classifier
#[derive(Debug, Clone)]
pub struct LinkResolver {
    /// Extension internal document links are rewritten to
    target_extension: Option<String>,
}

impl Default for LinkResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkResolver {
    /// Resolver that rewrites links to sibling markdown files into `.docx`
    pub fn new() -> Self {
        Self {
            target_extension: Some("docx".to_string()),
        }
    }

    /// Resolver that leaves internal document paths alone
    pub fn without_rewrites() -> Self {
        Self {
            target_extension: None,
        }
    }

    /// Classify `url`.
    ///
    /// In order: `#...` is an anchor; anything containing `://` is
    /// external; a leading scheme name without the separator is external
    /// but invalid; everything else is an internal reference.
    pub fn resolve(&self, text: &str, url: &str) -> ProcessedLink {
        let url = url.trim();
        let mut link = ProcessedLink {
            text: text.to_string(),
            url: url.to_string(),
            kind: LinkKind::Internal,
            is_valid: true,
            rewritten_url: None,
            warning: None,
        };

        if let Some(fragment) = url.strip_prefix('#') {
            link.kind = LinkKind::Anchor;
            let anchor = slugify(fragment);
            if anchor.is_empty() {
                link.is_valid = false;
                link.warning = Some(format!("Empty anchor in link \"{}\"", url));
            } else if anchor != fragment {
                link.rewritten_url = Some(format!("#{}", anchor));
            }
            return link;
        }

        if url.contains("://") {
            link.kind = LinkKind::External;
            return link;
        }

        let lower = url.to_ascii_lowercase();
        if OPAQUE_SCHEMES.iter().any(|s| lower.starts_with(s)) {
            link.kind = LinkKind::External;
            return link;
        }

        if scheme_word_re().is_match(url) {
            link.kind = LinkKind::External;
            link.is_valid = false;
            link.warning = Some(format!("Malformed URL \"{}\": missing \"://\"", url));
            return link;
        }

        if url.is_empty() {
            link.is_valid = false;
            link.warning = Some(format!("Empty link target for \"{}\"", text));
            return link;
        }

        link.rewritten_url = self.rewrite_internal(url);
        link
    }

    fn rewrite_internal(&self, url: &str) -> Option<String> {
        let ext = self.target_extension.as_deref()?;
        let (path, fragment) = match url.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (url, None),
        };
        let stem = path
            .strip_suffix(".md")
            .or_else(|| path.strip_suffix(".markdown"))?;

        let mut rewritten = format!("{}.{}", stem, ext);
        if let Some(fragment) = fragment {
            rewritten.push('#');
            rewritten.push_str(&slugify(fragment));
        }
        Some(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(url: &str) -> ProcessedLink {
        LinkResolver::new().resolve("text", url)
    }

    #[test]
    fn test_https_is_external_valid() {
        let link = resolve("https://example.com");
        assert_eq!(link.kind, LinkKind::External);
        assert!(link.is_valid);
        assert!(link.rewritten_url.is_none());
    }

    #[test]
    fn test_hash_is_anchor() {
        let link = resolve("#section-1");
        assert_eq!(link.kind, LinkKind::Anchor);
        assert!(link.is_valid);
        assert!(link.is_internal());
        assert_eq!(link.target(), "#section-1");
    }

    #[test]
    fn test_anchor_normalized_to_slug() {
        let link = resolve("#Getting Started");
        assert_eq!(link.rewritten_url.as_deref(), Some("#getting-started"));
    }

    #[test]
    fn test_scheme_without_separator_is_malformed() {
        let link = resolve("http.example.com");
        assert_eq!(link.kind, LinkKind::External);
        assert!(!link.is_valid);
        assert!(link.warning.unwrap().contains("Malformed URL"));
    }

    #[test]
    fn test_half_written_scheme_is_malformed() {
        assert!(!resolve("https:example.com").is_valid);
    }

    #[test]
    fn test_scheme_prefix_inside_word_is_internal() {
        // "httpd" is not a scheme name
        let link = resolve("httpd.conf");
        assert_eq!(link.kind, LinkKind::Internal);
        assert!(link.is_valid);
    }

    #[test]
    fn test_file_names_are_not_schemes() {
        assert_eq!(resolve("file.txt").kind, LinkKind::Internal);
        assert!(resolve("file.txt").is_valid);
    }

    #[test]
    fn test_mailto_is_external() {
        let link = resolve("mailto:team@example.com");
        assert_eq!(link.kind, LinkKind::External);
        assert!(link.is_valid);
    }

    #[test]
    fn test_relative_markdown_rewritten() {
        let link = resolve("guide/setup.md#First Steps");
        assert_eq!(link.kind, LinkKind::Internal);
        assert_eq!(link.rewritten_url.as_deref(), Some("guide/setup.docx#first-steps"));
    }

    #[test]
    fn test_other_relative_paths_untouched() {
        let link = resolve("assets/data.csv");
        assert_eq!(link.kind, LinkKind::Internal);
        assert!(link.rewritten_url.is_none());
        assert!(LinkResolver::without_rewrites()
            .resolve("t", "a.md")
            .rewritten_url
            .is_none());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let resolver = LinkResolver::new();
        for url in ["#A B", "https://x.y", "http.example.com", "doc.md", "notes.txt"] {
            assert_eq!(resolver.resolve("t", url), resolver.resolve("t", url));
        }
        // Resolving the rewritten target again needs no further rewrite
        let first = resolver.resolve("t", "#A B");
        let again = resolver.resolve("t", first.target());
        assert_eq!(again.kind, first.kind);
        assert!(again.rewritten_url.is_none());
    }
}
