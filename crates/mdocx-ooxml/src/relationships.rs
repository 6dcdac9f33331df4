//! Package relationships (`_rels/*.rels`)
//!
//! The document part points at styles, numbering, media and external
//! hyperlinks through relationship ids. Writing allocates `rId1..n` in
//! insertion order; reading keeps file order and continues numbering
//! after the highest id found.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::xml::{escape_xml, get_attr};

/// Namespace of `.rels` parts
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const OFFICE_REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/";
const CORE_PROPERTIES_URI: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

/// What a relationship points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelKind {
    OfficeDocument,
    Styles,
    Numbering,
    Image,
    Hyperlink,
    CoreProperties,
    ExtendedProperties,
    /// Any type this crate does not interpret, kept by URI
    Other(String),
}

impl RelKind {
    /// The relationship type URI
    pub fn uri(&self) -> String {
        let suffix = match self {
            RelKind::OfficeDocument => "officeDocument",
            RelKind::Styles => "styles",
            RelKind::Numbering => "numbering",
            RelKind::Image => "image",
            RelKind::Hyperlink => "hyperlink",
            RelKind::ExtendedProperties => "extended-properties",
            RelKind::CoreProperties => return CORE_PROPERTIES_URI.to_string(),
            RelKind::Other(uri) => return uri.clone(),
        };
        format!("{}{}", OFFICE_REL_BASE, suffix)
    }

    /// Classify a type URI; the strict and transitional namespaces both match
    pub fn from_uri(uri: &str) -> Self {
        match uri.rsplit('/').next().unwrap_or_default() {
            "officeDocument" => RelKind::OfficeDocument,
            "styles" => RelKind::Styles,
            "numbering" => RelKind::Numbering,
            "image" => RelKind::Image,
            "hyperlink" => RelKind::Hyperlink,
            "core-properties" => RelKind::CoreProperties,
            "extended-properties" => RelKind::ExtendedProperties,
            _ => RelKind::Other(uri.to_string()),
        }
    }
}

/// One `<Relationship>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub kind: RelKind,
    pub target: String,
    /// `TargetMode="External"`: the target is a URL, not a package part
    pub external: bool,
}

/// The relationships of one part, in file order
#[derive(Debug, Clone)]
pub struct Relationships {
    entries: Vec<Relationship>,
    next_id: u32,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `.rels` part
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Relationships::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    if let (Some(id), Some(target)) = (get_attr(e, b"Id"), get_attr(e, b"Target")) {
                        if let Some(n) = id_number(&id) {
                            rels.next_id = rels.next_id.max(n + 1);
                        }
                        rels.entries.push(Relationship {
                            id,
                            kind: RelKind::from_uri(&get_attr(e, b"Type").unwrap_or_default()),
                            target,
                            external: get_attr(e, b"TargetMode").as_deref() == Some("External"),
                        });
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }
        Ok(rels)
    }

    fn insert(&mut self, kind: RelKind, target: String, external: bool) -> String {
        let id = format!("rId{}", self.next_id);
        self.next_id += 1;
        self.entries.push(Relationship {
            id: id.clone(),
            kind,
            target,
            external,
        });
        id
    }

    /// Point at a part inside the package; returns the new id
    pub fn push(&mut self, kind: RelKind, target: impl Into<String>) -> String {
        self.insert(kind, target.into(), false)
    }

    /// Point at an external URL; returns the new id
    pub fn push_hyperlink(&mut self, url: impl Into<String>) -> String {
        self.insert(RelKind::Hyperlink, url.into(), true)
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// Target of `id`, only when the relationship has the expected kind
    pub fn target_of(&self, id: &str, kind: &RelKind) -> Option<&str> {
        self.get(id)
            .filter(|r| &r.kind == kind)
            .map(|r| r.target.as_str())
    }

    /// First relationship of `kind`
    pub fn find(&self, kind: &RelKind) -> Option<&Relationship> {
        self.entries.iter().find(|r| &r.kind == kind)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Relationship> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as a `.rels` part
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!("<Relationships xmlns=\"{}\">\n", RELATIONSHIPS_NS));
        for rel in &self.entries {
            xml.push_str(&format!(
                "  <Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"{}/>\n",
                escape_xml(&rel.id),
                escape_xml(&rel.kind.uri()),
                escape_xml(&rel.target),
                if rel.external { " TargetMode=\"External\"" } else { "" }
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// `rId12` → 12
fn id_number(id: &str) -> Option<u32> {
    let digits = id.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let mut rels = Relationships::new();
        let styles = rels.push(RelKind::Styles, "styles.xml");
        let image = rels.push(RelKind::Image, "media/image1.png");
        let link = rels.push_hyperlink("https://example.com");
        assert_eq!(
            (styles.as_str(), image.as_str(), link.as_str()),
            ("rId1", "rId2", "rId3")
        );
        assert!(rels.get(&link).unwrap().external);
        assert!(!rels.get(&image).unwrap().external);
        assert_eq!(rels.target_of(&image, &RelKind::Image), Some("media/image1.png"));
        assert_eq!(rels.target_of(&image, &RelKind::Hyperlink), None);
    }

    #[test]
    fn test_parse_continues_numbering() {
        let xml = br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://a.example/?x=1&amp;y=2" TargetMode="External"/>
  <Relationship Id="rId3" Type="http://schemas.microsoft.com/office/2007/relationships/stylesWithEffects" Target="stylesWithEffects.xml"/>
</Relationships>"#;
        let mut rels = Relationships::parse(xml).unwrap();
        assert_eq!(rels.len(), 3);
        assert_eq!(
            rels.target_of("rId7", &RelKind::Hyperlink),
            Some("https://a.example/?x=1&y=2")
        );
        assert!(matches!(rels.get("rId3").unwrap().kind, RelKind::Other(_)));
        assert_eq!(rels.push(RelKind::Image, "media/image1.png"), "rId8");
    }

    #[test]
    fn test_to_xml_roundtrip() {
        let mut rels = Relationships::new();
        rels.push(RelKind::Numbering, "numbering.xml");
        rels.push(RelKind::CoreProperties, "docProps/core.xml");
        rels.push_hyperlink("https://example.com/a?b=1&c=2");
        let xml = rels.to_xml();
        assert!(xml.contains(r#"Target="https://example.com/a?b=1&amp;c=2" TargetMode="External""#));
        assert!(xml.contains("metadata/core-properties"));

        let parsed = Relationships::parse(xml.as_bytes()).unwrap();
        let kinds: Vec<_> = parsed.iter().map(|r| r.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![RelKind::Numbering, RelKind::CoreProperties, RelKind::Hyperlink]
        );
    }
}
