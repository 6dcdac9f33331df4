//! Section tree and table of contents
//!
//! Headings partition a document into nested sections. Every section
//! carries the anchor of its heading, and the table of contents mirrors
//! the tree entry for entry, reusing those anchors.

use serde::{Deserialize, Serialize};

/// A heading and everything up to the next heading of any level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSection {
    /// Heading text
    pub title: String,
    /// Heading level (1-6)
    pub level: u8,
    /// Markup between this heading and the next heading
    pub content: String,
    /// Anchor derived from the title
    pub id: String,
    /// Nested sections, each with a strictly greater level
    pub children: Vec<DocumentSection>,
}

impl DocumentSection {
    /// Create a leaf section
    pub fn new(title: impl Into<String>, level: u8, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            level,
            content: String::new(),
            id: id.into(),
            children: Vec::new(),
        }
    }

    /// Visit this section and all descendants in document order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a DocumentSection)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Number of sections in this subtree, including this one
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(DocumentSection::count).sum::<usize>()
    }
}

/// Nest a flat, document-ordered list of sections by level.
///
/// Each section becomes a child of the closest preceding section with a
/// lower level, or a root when there is none.
pub fn nest_sections(flat: Vec<DocumentSection>) -> Vec<DocumentSection> {
    let mut roots: Vec<DocumentSection> = Vec::new();
    let mut stack: Vec<DocumentSection> = Vec::new();

    for section in flat {
        while let Some(top) = stack.pop() {
            if top.level < section.level {
                stack.push(top);
                break;
            }
            attach(&mut stack, &mut roots, top);
        }
        stack.push(section);
    }
    while let Some(done) = stack.pop() {
        attach(&mut stack, &mut roots, done);
    }

    roots
}

fn attach(stack: &mut [DocumentSection], roots: &mut Vec<DocumentSection>, done: DocumentSection) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(done),
        None => roots.push(done),
    }
}

/// Navigable outline of a document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableOfContents {
    /// Top-level entries
    pub entries: Vec<TocEntry>,
}

/// One table of contents line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Heading level (1-6)
    pub level: u8,
    /// Target anchor, equal to the section id
    pub anchor: String,
    /// Nested entries
    pub children: Vec<TocEntry>,
}

impl TableOfContents {
    /// Mirror a section tree
    pub fn from_sections(sections: &[DocumentSection]) -> Self {
        Self {
            entries: sections.iter().map(TocEntry::from_section).collect(),
        }
    }

    /// Entries in document order, depth first
    pub fn flatten(&self) -> Vec<&TocEntry> {
        fn push<'a>(entry: &'a TocEntry, out: &mut Vec<&'a TocEntry>) {
            out.push(entry);
            for child in &entry.children {
                push(child, out);
            }
        }
        let mut out = Vec::new();
        for entry in &self.entries {
            push(entry, &mut out);
        }
        out
    }

    /// True when the outline has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TocEntry {
    fn from_section(section: &DocumentSection) -> Self {
        Self {
            title: section.title.clone(),
            level: section.level,
            anchor: section.id.clone(),
            children: section.children.iter().map(TocEntry::from_section).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(levels: &[(u8, &str)]) -> Vec<DocumentSection> {
        levels
            .iter()
            .map(|(level, title)| DocumentSection::new(*title, *level, title.to_lowercase()))
            .collect()
    }

    #[test]
    fn test_nest_sections_by_level() {
        let tree = nest_sections(flat(&[(1, "A"), (2, "B"), (3, "C"), (2, "D"), (1, "E")]));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].title, "A");
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[0].children[0].title, "C");
        assert_eq!(tree[0].children[1].title, "D");
        assert_eq!(tree[1].title, "E");
    }

    #[test]
    fn test_nest_sections_skipped_levels() {
        // A level 3 directly under a level 1 still nests
        let tree = nest_sections(flat(&[(1, "A"), (3, "B"), (2, "C")]));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[0].level, 3);
    }

    #[test]
    fn test_nest_sections_leading_deep_heading_is_root() {
        let tree = nest_sections(flat(&[(2, "A"), (1, "B")]));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_children_levels_strictly_greater() {
        let tree = nest_sections(flat(&[(1, "A"), (2, "B"), (2, "C"), (4, "D"), (3, "E")]));
        fn check(section: &DocumentSection) {
            for child in &section.children {
                assert!(child.level > section.level);
                check(child);
            }
        }
        tree.iter().for_each(check);
    }

    #[test]
    fn test_toc_mirrors_section_ids() {
        let tree = nest_sections(flat(&[(1, "Intro"), (2, "Scope"), (1, "Usage")]));
        let toc = TableOfContents::from_sections(&tree);

        let mut ids = Vec::new();
        for section in &tree {
            section.walk(&mut |s| ids.push(s.id.clone()));
        }
        let anchors: Vec<_> = toc.flatten().iter().map(|e| e.anchor.clone()).collect();
        assert_eq!(ids, anchors);
        assert_eq!(tree[0].count(), 2);
    }
}
