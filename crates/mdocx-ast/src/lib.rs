//! mdocx-ast - Document tree definitions
//!
//! This crate provides the types shared by the markdown side and the
//! word-processor side of mdocx: a flat block list for content, a
//! section tree keyed by heading anchors, and the table of contents
//! derived from that tree.

pub mod block;
pub mod document;
pub mod inline;
pub mod section;

pub use block::{
    Block, BreakType, CodeBlock, Heading, List, ListItem, ListType, Paragraph, Table, TableCell,
    TableRow,
};
pub use document::{Document, DocumentMeta};
pub use inline::{plain_text, FormatType, Image, Inline, Link};
pub use section::{nest_sections, DocumentSection, TableOfContents, TocEntry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
