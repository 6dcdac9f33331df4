//! Block-level elements for document structure
//!
//! This module defines block-level elements that form the document structure,
//! such as paragraphs, headings, lists, tables, and code blocks.

use serde::{Deserialize, Serialize};

use crate::inline::{plain_text, Inline};

/// Block-level content element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    /// A paragraph of text
    Paragraph(Paragraph),
    /// A section heading
    Heading(Heading),
    /// An ordered or unordered list
    List(List),
    /// A table
    Table(Table),
    /// A fenced or indented code block
    Code(CodeBlock),
    /// A block quote
    Quote(Vec<Block>),
    /// A page or section break
    Break(BreakType),
    /// A thematic break (horizontal rule)
    ThematicBreak,
}

/// A paragraph block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paragraph {
    /// Inline content within the paragraph
    pub inlines: Vec<Inline>,
    /// Style ID from the source package, if any
    pub style_id: Option<String>,
}

impl Paragraph {
    /// Create a paragraph from inline content
    pub fn new(inlines: Vec<Inline>) -> Self {
        Self {
            inlines,
            style_id: None,
        }
    }

    /// Visible text of the paragraph
    pub fn plain_text(&self) -> String {
        plain_text(&self.inlines)
    }
}

/// A section heading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading level (1-6, where 1 is the highest)
    pub level: u8,
    /// Heading text content
    pub text: Vec<Inline>,
    /// Style ID from the source package
    pub style_id: Option<String>,
    /// Anchor/ID for cross-references
    pub anchor: Option<String>,
}

impl Heading {
    /// Visible text of the heading
    pub fn plain_text(&self) -> String {
        plain_text(&self.text)
    }
}

/// A list (ordered or unordered)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    /// Type of list
    pub list_type: ListType,
    /// List items
    pub items: Vec<ListItem>,
    /// Style ID from the source package
    pub style_id: Option<String>,
}

/// List type variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListType {
    /// Unordered/bullet list
    Unordered,
    /// Ordered/numbered list
    Ordered,
}

/// A single list item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    /// Item text
    pub content: Vec<Inline>,
    /// Nesting level (0 = top level)
    pub level: u8,
}

/// A table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table rows
    pub rows: Vec<TableRow>,
    /// Style ID from the source package
    pub style_id: Option<String>,
}

impl Table {
    /// Number of columns, taken from the widest row
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }
}

/// A table row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells in this row
    pub cells: Vec<TableCell>,
    /// Whether this is a header row
    pub is_header: bool,
}

/// A table cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableCell {
    /// Cell content
    pub content: Vec<Inline>,
}

/// A code block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Raw content, lines joined with `\n`
    pub content: String,
    /// Info string language tag (e.g. "rust", "mermaid")
    pub language: Option<String>,
    /// Style ID from the source package
    pub style_id: Option<String>,
}

/// Break types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakType {
    /// Page break
    Page,
    /// Section break
    Section,
}
