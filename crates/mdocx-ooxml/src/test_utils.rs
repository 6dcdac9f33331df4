//! Shared test fixtures for mdocx-ooxml
//!
//! Packages are assembled in memory with uncompressed entries so tests
//! can feed hand-written document XML straight into the readers.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::archive::OoxmlArchive;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const EMPTY_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
</Relationships>"#;

/// Wrap body content in a `w:document` root with the usual namespaces
pub fn wrap_body(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">
  <w:body>{}</w:body>
</w:document>"#,
        body
    )
}

/// Build package bytes holding `document_xml` and optional document rels
pub fn create_test_package(document_xml: &str, rels: Option<&str>) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/_rels/document.xml.rels", rels.unwrap_or(EMPTY_RELS)),
        ("word/document.xml", document_xml),
    ];
    for (name, contents) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }

    zip.finish().unwrap();
    buffer.into_inner()
}

/// Open a package built by [`create_test_package`]
pub fn create_test_archive(document_xml: &str, rels: Option<&str>) -> OoxmlArchive {
    OoxmlArchive::from_bytes(&create_test_package(document_xml, rels)).unwrap()
}

/// Read one part of a package as a string
pub fn extract_file(docx: &[u8], path: &str) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(docx)).ok()?;
    let mut file = archive.by_name(path).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    Some(contents)
}

/// `word/document.xml` of a package
pub fn extract_document_xml(docx: &[u8]) -> String {
    extract_file(docx, "word/document.xml").unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_package_opens() {
        let bytes = create_test_package(&wrap_body("<w:p/>"), None);
        assert!(extract_document_xml(&bytes).contains("<w:body><w:p/></w:body>"));
        let archive = OoxmlArchive::from_bytes(&bytes).unwrap();
        assert!(archive.document_rels_xml().is_some());
        assert!(archive.styles_xml().is_none());
    }
}
