//! Document root and metadata definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::Block;

/// A complete document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, authors, properties)
    pub metadata: DocumentMeta,
    /// Document content blocks
    pub blocks: Vec<Block>,
}

/// Document metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Document title
    pub title: Option<String>,
    /// Document authors
    pub authors: Vec<String>,
    /// Subject line
    pub subject: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Keywords
    pub keywords: Vec<String>,
    /// Creation timestamp (W3CDTF, as stored in package core properties)
    pub created: Option<String>,
    /// Any other properties, sorted by key
    pub attributes: BTreeMap<String, String>,
}

impl DocumentMeta {
    /// True when no property is set
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.authors.is_empty()
            && self.subject.is_none()
            && self.description.is_none()
            && self.keywords.is_empty()
            && self.created.is_none()
            && self.attributes.is_empty()
    }
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document with a title
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            metadata: DocumentMeta {
                title: Some(title.into()),
                ..Default::default()
            },
            blocks: Vec::new(),
        }
    }

    /// Add a block to the document
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Check if the document is empty (no blocks)
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of top-level blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Paragraph;
    use crate::inline::Inline;

    #[test]
    fn test_document_push() {
        let mut doc = Document::with_title("Report");
        assert!(doc.is_empty());
        doc.push(Block::Paragraph(Paragraph::new(vec![Inline::Text(
            "Body".to_string(),
        )])));
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.metadata.title.as_deref(), Some("Report"));
    }

    #[test]
    fn test_meta_is_empty() {
        let mut meta = DocumentMeta::default();
        assert!(meta.is_empty());
        meta.keywords.push("docx".to_string());
        assert!(!meta.is_empty());
    }

    #[test]
    fn test_document_serializes_to_json() {
        let doc = Document::with_title("T");
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"title\":\"T\""));
    }
}
