//! Error types for OOXML operations

use thiserror::Error;

/// Errors that can occur during OOXML operations
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// Error reading or writing the ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing XML content
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Error decoding or encoding an embedded image
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Required part not found in the package
    #[error("Required part not found: {0}")]
    MissingPart(String),

    /// The tree cannot be represented as a valid package
    #[error("Invalid package structure: {0}")]
    PackageStructure(String),

    /// Unknown template or diagram theme
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
}

/// Result type for OOXML operations
pub type Result<T> = std::result::Result<T, OoxmlError>;
