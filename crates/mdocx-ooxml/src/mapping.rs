//! Style to semantic mapping
//!
//! Reading a package maps every paragraph style id to a [`SemanticTag`]
//! through an explicit table of known Word style names. Custom styles
//! resolve through their `basedOn` chain and outline level in the
//! document's style sheet. Anything left over is [`SemanticTag::Unknown`]
//! and the caller decides how to degrade it.

use std::collections::HashMap;

use crate::styles::StyleSheet;

/// Semantic role of a paragraph style
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticTag {
    /// Heading level 1-6
    Heading(u8),
    Title,
    Paragraph,
    ListItem,
    CodeBlock,
    Quote,
    Caption,
    /// Table of contents entry
    Toc,
    TocHeading,
    Hyperlink,
    /// Style with no known meaning; carries the original id
    Unknown(String),
}

impl SemanticTag {
    /// True for tags that are dropped from the reconstructed tree
    pub fn is_generated(&self) -> bool {
        matches!(self, SemanticTag::Toc | SemanticTag::TocHeading)
    }
}

/// Lowercase with separators removed: "Heading 1", "heading1" and
/// "Heading-1" all compare equal
fn normalize(style: &str) -> String {
    style
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Maps style ids found in a package to semantic tags
#[derive(Debug, Clone)]
pub struct StyleMapper {
    table: HashMap<String, SemanticTag>,
    styles: StyleSheet,
}

impl Default for StyleMapper {
    fn default() -> Self {
        Self::new(StyleSheet::default())
    }
}

impl StyleMapper {
    /// Create a mapper backed by the package's style sheet
    pub fn new(styles: StyleSheet) -> Self {
        let mut table = HashMap::new();
        for level in 1..=9u8 {
            let tag = SemanticTag::Heading(level.min(6));
            table.insert(format!("heading{}", level), tag);
            table.insert(format!("toc{}", level), SemanticTag::Toc);
        }
        let known: &[(&str, SemanticTag)] = &[
            ("title", SemanticTag::Title),
            ("subtitle", SemanticTag::Paragraph),
            ("normal", SemanticTag::Paragraph),
            ("normalweb", SemanticTag::Paragraph),
            ("bodytext", SemanticTag::Paragraph),
            ("body", SemanticTag::Paragraph),
            ("plaintext", SemanticTag::Paragraph),
            ("nospacing", SemanticTag::Paragraph),
            ("listparagraph", SemanticTag::ListItem),
            ("listbullet", SemanticTag::ListItem),
            ("listnumber", SemanticTag::ListItem),
            ("list", SemanticTag::ListItem),
            ("codeblock", SemanticTag::CodeBlock),
            ("code", SemanticTag::CodeBlock),
            ("sourcecode", SemanticTag::CodeBlock),
            ("htmlpreformatted", SemanticTag::CodeBlock),
            ("preformatted", SemanticTag::CodeBlock),
            ("quote", SemanticTag::Quote),
            ("intensequote", SemanticTag::Quote),
            ("blocktext", SemanticTag::Quote),
            ("caption", SemanticTag::Caption),
            ("tocheading", SemanticTag::TocHeading),
            ("hyperlink", SemanticTag::Hyperlink),
        ];
        for (name, tag) in known {
            table.insert(name.to_string(), tag.clone());
        }
        Self { table, styles }
    }

    /// The semantic tag for a paragraph style id
    pub fn map(&self, style_id: &str) -> SemanticTag {
        if let Some(tag) = self.lookup(style_id) {
            return tag;
        }

        for style in self.styles.resolve_chain(style_id) {
            if let Some(tag) = self.lookup(&style.id).or_else(|| self.lookup(&style.name)) {
                return tag;
            }
            if let Some(level) = style.outline_level.filter(|&l| l < 9) {
                return SemanticTag::Heading((level + 1).min(6));
            }
        }

        SemanticTag::Unknown(style_id.to_string())
    }

    fn lookup(&self, name: &str) -> Option<SemanticTag> {
        self.table.get(&normalize(name)).cloned()
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Heading 1"), "heading1");
        assert_eq!(normalize("List_Paragraph"), "listparagraph");
        assert_eq!(normalize("TOC-Heading"), "tocheading");
    }

    #[test]
    fn test_explicit_table() {
        let mapper = StyleMapper::default();
        assert_eq!(mapper.map("Heading3"), SemanticTag::Heading(3));
        assert_eq!(mapper.map("heading 8"), SemanticTag::Heading(6));
        assert_eq!(mapper.map("CodeBlock"), SemanticTag::CodeBlock);
        assert_eq!(mapper.map("TOC2"), SemanticTag::Toc);
        assert_eq!(mapper.map("Normal"), SemanticTag::Paragraph);
        assert!(mapper.map("TOC1").is_generated());
    }

    #[test]
    fn test_unknown_fallback() {
        let mapper = StyleMapper::default();
        assert_eq!(
            mapper.map("FancyCallout"),
            SemanticTag::Unknown("FancyCallout".to_string())
        );
    }

    #[test]
    fn test_custom_styles_resolve_through_sheet() {
        let xml = br#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="a1"><w:name w:val="heading 2"/></w:style>
  <w:style w:type="paragraph" w:styleId="CorpChapter"><w:name w:val="Chapter"/><w:pPr><w:outlineLvl w:val="0"/></w:pPr></w:style>
  <w:style w:type="paragraph" w:styleId="CorpCode"><w:name w:val="Corp Code"/><w:basedOn w:val="CodeBlock"/></w:style>
  <w:style w:type="paragraph" w:styleId="CodeBlock"><w:name w:val="Code Block"/></w:style>
</w:styles>"#;
        let mapper = StyleMapper::new(StyleSheet::parse(xml).unwrap());
        assert_eq!(mapper.map("a1"), SemanticTag::Heading(2));
        assert_eq!(mapper.map("CorpChapter"), SemanticTag::Heading(1));
        assert_eq!(mapper.map("CorpCode"), SemanticTag::CodeBlock);
    }
}
