//! mdocx-core - Markdown side of mdocx
//!
//! Parses markdown into the `mdocx_ast` tree, classifies links, assigns
//! heading anchors and generates markdown back from a tree.
//!
//! # Example
//!
//! ```
//! use mdocx_core::{build, generate};
//!
//! let output = build("# Hello\n\nWorld, see [docs](https://example.com).\n", None).unwrap();
//! assert_eq!(output.sections[0].id, "hello");
//! assert_eq!(output.toc.entries[0].anchor, "hello");
//! assert_eq!(output.external_link_count(), 1);
//!
//! let markdown = generate(&output.document);
//! assert!(markdown.starts_with("# Hello"));
//! ```

pub mod builder;
pub mod generator;
pub mod inline;
pub mod links;
pub mod parser;
pub mod slug;

// Re-export main types and functions
pub use builder::{build, BuildOutput, ModelBuilder};
pub use generator::{generate, GeneratorConfig, MarkdownGenerator};
pub use inline::parse_inlines;
pub use links::{LinkKind, LinkResolver, ProcessedLink};
pub use parser::{parse, HeadingLine, Parser, PAGE_BREAK_MARKER};
pub use slug::{slugify, AnchorAllocator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "1.0.0");
    }
}
