//! List numbering (word/numbering.xml)
//!
//! Every list in a written document gets its own abstract definition and
//! numbering instance, so ordered lists restart at 1 and adjacent lists
//! stay distinguishable when the package is read back.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::xml::get_attr;

const BULLETS: [&str; 6] = ["\u{2022}", "\u{25CB}", "\u{25AA}", "\u{25AB}", "\u{25C6}", "\u{25C7}"];
const NUMBER_FORMATS: [&str; 6] = [
    "decimal",
    "lowerLetter",
    "lowerRoman",
    "upperRoman",
    "decimal",
    "lowerLetter",
];

/// Numbering instances allocated while writing a document
#[derive(Debug, Clone)]
pub struct NumberingBuilder {
    lists: Vec<bool>,
}

impl Default for NumberingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NumberingBuilder {
    pub fn new() -> Self {
        Self { lists: Vec::new() }
    }

    /// Allocate a numbering instance for one list and return its `numId`
    pub fn add_list(&mut self, ordered: bool) -> u32 {
        self.lists.push(ordered);
        self.lists.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Generate `word/numbering.xml`
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        );
        xml.push('\n');

        for (i, &ordered) in self.lists.iter().enumerate() {
            xml.push_str(&format!(r#"<w:abstractNum w:abstractNumId="{}">"#, i + 1));
            xml.push_str(r#"<w:multiLevelType w:val="hybridMultilevel"/>"#);
            for level in 0..9usize {
                let (format, text, hanging) = if ordered {
                    (NUMBER_FORMATS[level % 6], format!("%{}.", level + 1), 420)
                } else {
                    ("bullet", BULLETS[level % 6].to_string(), 360)
                };
                xml.push_str(&format!(
                    r#"<w:lvl w:ilvl="{}"><w:start w:val="1"/><w:numFmt w:val="{}"/><w:lvlText w:val="{}"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{}" w:hanging="{}"/></w:pPr></w:lvl>"#,
                    level,
                    format,
                    text,
                    720 * (level + 1),
                    hanging
                ));
            }
            xml.push_str("</w:abstractNum>\n");
        }

        for i in 1..=self.lists.len() {
            xml.push_str(&format!(
                r#"<w:num w:numId="{0}"><w:abstractNumId w:val="{0}"/></w:num>"#,
                i
            ));
            xml.push('\n');
        }

        xml.push_str("</w:numbering>");
        xml
    }
}

/// Which numbering instances are ordered, read from a package
#[derive(Debug, Clone, Default)]
pub struct NumberingInfo {
    ordered: HashMap<String, bool>,
}

impl NumberingInfo {
    /// Parse `word/numbering.xml`
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        // abstractNumId -> first level is a number format
        let mut abstract_ordered: HashMap<String, bool> = HashMap::new();
        // numId -> abstractNumId
        let mut instances: Vec<(String, String)> = Vec::new();

        let mut current_abstract: Option<String> = None;
        let mut current_level: Option<String> = None;
        let mut current_num: Option<String> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                    b"abstractNum" => current_abstract = get_attr(e, b"w:abstractNumId"),
                    b"lvl" => current_level = get_attr(e, b"w:ilvl"),
                    b"numFmt" if current_level.as_deref() == Some("0") => {
                        if let (Some(id), Some(fmt)) = (current_abstract.clone(), get_attr(e, b"w:val")) {
                            abstract_ordered.insert(id, fmt != "bullet" && fmt != "none");
                        }
                    }
                    b"num" => current_num = get_attr(e, b"w:numId"),
                    b"abstractNumId" => {
                        if let (Some(num), Some(id)) = (current_num.clone(), get_attr(e, b"w:val")) {
                            instances.push((num, id));
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                    b"abstractNum" => current_abstract = None,
                    b"lvl" => current_level = None,
                    b"num" => current_num = None,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        let ordered = instances
            .into_iter()
            .map(|(num, id)| {
                let ordered = abstract_ordered.get(&id).copied().unwrap_or(false);
                (num, ordered)
            })
            .collect();
        Ok(Self { ordered })
    }

    /// True when `num_id` numbers its items; unknown ids are bullets
    pub fn is_ordered(&self, num_id: &str) -> bool {
        self.ordered.get(num_id).copied().unwrap_or(false)
    }
}
