//! Style definitions parsing (word/styles.xml)
//!
//! The reverse direction uses the style sheet to recognise headings by
//! outline level and to resolve custom styles through their `basedOn`
//! chain.

use std::collections::{HashMap, HashSet};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::xml::get_attr;

/// Collection of styles from a document
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    /// All styles, keyed by style ID
    styles: HashMap<String, Style>,
    /// Default paragraph style ID
    pub default_paragraph: Option<String>,
}

/// A Word style definition
#[derive(Debug, Clone)]
pub struct Style {
    /// Style ID (used in document references)
    pub id: String,
    /// Display name
    pub name: String,
    pub style_type: StyleType,
    /// Base style ID
    pub based_on: Option<String>,
    /// Outline level (0-8, where 0 = Heading 1)
    pub outline_level: Option<u8>,
}

/// Type of style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleType {
    #[default]
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleSheet {
    /// Parse styles from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut stylesheet = StyleSheet::default();
        let mut buf = Vec::new();
        let mut current: Option<StyleBuilder> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    let local = e.local_name();
                    if local.as_ref() == b"style" {
                        current = Some(StyleBuilder {
                            id: get_attr(e, b"w:styleId"),
                            style_type: match get_attr(e, b"w:type").as_deref() {
                                Some("character") => StyleType::Character,
                                Some("table") => StyleType::Table,
                                Some("numbering") => StyleType::Numbering,
                                _ => StyleType::Paragraph,
                            },
                            is_default: get_attr(e, b"w:default").as_deref() == Some("1"),
                            ..Default::default()
                        });
                    } else if let Some(ref mut builder) = current {
                        let val = get_attr(e, b"w:val");
                        match local.as_ref() {
                            b"name" => builder.name = val,
                            b"basedOn" => builder.based_on = val,
                            b"outlineLvl" => {
                                builder.outline_level = val.and_then(|v| v.parse().ok())
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"style" => {
                    if let Some(builder) = current.take() {
                        let is_default = builder.is_default;
                        if let Some(style) = builder.build() {
                            if is_default && style.style_type == StyleType::Paragraph {
                                stylesheet.default_paragraph = Some(style.id.clone());
                            }
                            stylesheet.styles.insert(style.id.clone(), style);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(stylesheet)
    }

    /// Get a style by ID
    pub fn get(&self, id: &str) -> Option<&Style> {
        self.styles.get(id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Heading level (1-9) for a style, following `basedOn` links
    pub fn heading_level(&self, style_id: &str) -> Option<u8> {
        self.resolve_chain(style_id)
            .into_iter()
            .find_map(|s| s.outline_level)
            .filter(|&l| l < 9)
            .map(|l| l + 1)
    }

    /// The style and its ancestors, nearest first
    pub fn resolve_chain(&self, style_id: &str) -> Vec<&Style> {
        let mut chain = Vec::new();
        let mut current = style_id;
        let mut seen = HashSet::new();

        while let Some(style) = self.get(current) {
            if !seen.insert(&style.id) {
                break;
            }
            chain.push(style);
            match style.based_on {
                Some(ref base) => current = base,
                None => break,
            }
        }

        chain
    }
}

#[derive(Default)]
struct StyleBuilder {
    id: Option<String>,
    name: Option<String>,
    style_type: StyleType,
    based_on: Option<String>,
    outline_level: Option<u8>,
    is_default: bool,
}

impl StyleBuilder {
    fn build(self) -> Option<Style> {
        let id = self.id?;
        Some(Style {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            style_type: self.style_type,
            based_on: self.based_on,
            outline_level: self.outline_level,
        })
    }
}
