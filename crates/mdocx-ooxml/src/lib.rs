//! # mdocx-ooxml
//!
//! Word package (DOCX) reading and writing for mdocx.
//!
//! This crate provides functionality to:
//! - Resolve templates into style bundles (`word/styles.xml`)
//! - Serialize an `mdocx_ast::Document` into a complete package
//! - Read a package back into a tree and markdown, mapping paragraph
//!   styles to semantic tags
//!
//! ## Example: Round trip
//!
//! ```
//! use mdocx_ooxml::{deserialize, serialize, template, ExtractOptions, WriteOptions};
//!
//! let output = mdocx_core::build("# Hello\n\nWorld.\n", None).unwrap();
//! let styles = template::lookup("professional-report").unwrap();
//! let package = serialize(
//!     &output.document,
//!     &output.diagrams,
//!     &output.links,
//!     &styles,
//!     &WriteOptions::default(),
//! )?;
//!
//! let extracted = deserialize(&package.bytes, &ExtractOptions::default())?;
//! assert!(extracted.markdown.contains("# Hello"));
//! # Ok::<(), mdocx_ooxml::OoxmlError>(())
//! ```

pub mod archive;
pub mod document;
pub mod error;
pub mod extract;
pub mod image;
pub mod mapping;
pub mod numbering;
pub mod relationships;
pub mod styles;
pub mod template;
pub mod writer;
mod xml;

#[cfg(test)]
pub(crate) mod test_utils;

pub use archive::OoxmlArchive;
pub use document::{
    Block, Document, Hyperlink, ImageRef, NumberingRef, Paragraph, ParagraphChild, Run, Table,
    TableCell, TableRow,
};
pub use error::{OoxmlError, Result};
pub use extract::{
    deserialize, parse_core_properties, unknown_style_warning, DocxExtractor, ExtractOptions,
    ExtractedDocument, ExtractedImage,
};
pub use mapping::{SemanticTag, StyleMapper};
pub use numbering::{NumberingBuilder, NumberingInfo};
pub use relationships::{RelKind, Relationship, Relationships};
pub use styles::{Style, StyleSheet, StyleType};
pub use template::{
    bundle, lookup, lookup_theme, Alignment, CustomStyles, StyleBundle, TemplateId, TextStyle,
};
pub use writer::{
    serialize, DocxWriter, Margins, Orientation, Package, PackageStats, WriteOptions,
};
pub use xml::escape_xml;

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
