//! Archive handling for DOCX files
//!
//! DOCX files are ZIP archives containing XML parts and media.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use zip::read::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::{OoxmlError, Result};

/// Main document part
pub const DOCUMENT_PART: &str = "word/document.xml";
/// Style definitions part
pub const STYLES_PART: &str = "word/styles.xml";
/// List numbering part
pub const NUMBERING_PART: &str = "word/numbering.xml";
/// Main document relationships part
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
/// Core properties part
pub const CORE_PROPS_PART: &str = "docProps/core.xml";
/// Extended (application) properties part
pub const APP_PROPS_PART: &str = "docProps/app.xml";

/// An unpacked OOXML package
#[derive(Debug, Default)]
pub struct OoxmlArchive {
    /// All parts in the archive, keyed by path
    files: HashMap<String, Vec<u8>>,
}

impl OoxmlArchive {
    /// Create an empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and unpack a DOCX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Unpack from bytes in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Create from any reader that implements Read + Seek
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut files = HashMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            files.insert(name, contents);
        }

        Ok(Self { files })
    }

    /// Get a part's contents by path
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    /// Get a part's contents as a string
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.files
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Get the main document content (word/document.xml)
    pub fn document_xml(&self) -> Result<&[u8]> {
        self.get(DOCUMENT_PART)
            .ok_or_else(|| OoxmlError::MissingPart(DOCUMENT_PART.to_string()))
    }

    /// Get the styles definition (word/styles.xml)
    pub fn styles_xml(&self) -> Option<&[u8]> {
        self.get(STYLES_PART)
    }

    /// Get the numbering definitions (word/numbering.xml)
    pub fn numbering_xml(&self) -> Option<&[u8]> {
        self.get(NUMBERING_PART)
    }

    /// Get the document relationships (word/_rels/document.xml.rels)
    pub fn document_rels_xml(&self) -> Option<&[u8]> {
        self.get(DOCUMENT_RELS_PART)
    }

    /// Get the core properties (docProps/core.xml)
    pub fn core_properties_xml(&self) -> Option<&[u8]> {
        self.get(CORE_PROPS_PART)
    }

    /// Check if a part exists in the archive
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// List all parts in the archive
    pub fn file_list(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_str())
    }

    /// Set or update a part's contents
    pub fn set(&mut self, path: impl Into<String>, contents: Vec<u8>) {
        self.files.insert(path.into(), contents);
    }

    /// Set a part's contents from a string
    pub fn set_string(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into().into_bytes());
    }

    /// Write the archive to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P, compress: bool) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file, compress)
    }

    /// Write the archive to bytes
    pub fn to_bytes(&self, compress: bool) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_to(&mut buffer, compress)?;
        Ok(buffer.into_inner())
    }

    /// Write the archive to any writer
    pub fn write_to<W: Write + Seek>(&self, writer: W, compress: bool) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let method = if compress {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        let options = SimpleFileOptions::default().compression_method(method);

        // [Content_Types].xml goes first, the rest sorted for deterministic output
        let mut paths: Vec<_> = self.files.keys().collect();
        paths.sort_by(|a, b| {
            let a_key = (a.as_str() != "[Content_Types].xml", a.as_str());
            let b_key = (b.as_str() != "[Content_Types].xml", b.as_str());
            a_key.cmp(&b_key)
        });

        for path in paths {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(&self.files[path])?;
        }

        zip.finish()?;
        Ok(())
    }
}
