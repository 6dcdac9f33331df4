//! The conversion result envelope
//!
//! Every conversion returns a [`ConversionResult`]; internal faults are
//! normalized into a [`ConversionError`] with a stable [`ErrorCode`]
//! before they reach the caller.

use std::fmt;
use std::path::PathBuf;

use mdocx_ooxml::{OoxmlError, PackageStats};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error taxonomy; serialized with these exact names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    FileNotFound,
    InvalidFileType,
    /// Warning only
    LargeFileSize,
    FileConversionFailed,
    BatchConversionError,
    /// Recovered; reported as a warning
    DiagramRenderFailure,
    /// Recovered; reported as a warning
    MalformedLink,
    /// Recovered; reported as a warning
    UnknownStyleMapping,
    PackageStructureError,
    InvalidTemplate,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FileNotFound => "FileNotFound",
            ErrorCode::InvalidFileType => "InvalidFileType",
            ErrorCode::LargeFileSize => "LargeFileSize",
            ErrorCode::FileConversionFailed => "FileConversionFailed",
            ErrorCode::BatchConversionError => "BatchConversionError",
            ErrorCode::DiagramRenderFailure => "DiagramRenderFailure",
            ErrorCode::MalformedLink => "MalformedLink",
            ErrorCode::UnknownStyleMapping => "UnknownStyleMapping",
            ErrorCode::PackageStructureError => "PackageStructureError",
            ErrorCode::InvalidTemplate => "InvalidTemplate",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized, caller-visible error
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ConversionError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ConversionError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<OoxmlError> for ConversionError {
    fn from(err: OoxmlError) -> Self {
        let code = match err {
            OoxmlError::PackageStructure(_) => ErrorCode::PackageStructureError,
            OoxmlError::InvalidTemplate(_) => ErrorCode::InvalidTemplate,
            _ => ErrorCode::FileConversionFailed,
        };
        ConversionError::new(code, err.to_string())
    }
}

/// What a conversion produced
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutput {
    /// Package bytes
    Bytes(Vec<u8>),
    /// Markdown text
    Text(String),
}

impl ConversionOutput {
    pub fn len(&self) -> usize {
        match self {
            ConversionOutput::Bytes(bytes) => bytes.len(),
            ConversionOutput::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ConversionOutput::Bytes(bytes) => bytes,
            ConversionOutput::Text(text) => text.as_bytes(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConversionOutput::Text(text) => Some(text),
            ConversionOutput::Bytes(_) => None,
        }
    }
}

/// Sizes, timing and document statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionMetadata {
    pub input_size: u64,
    pub output_size: u64,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_link_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_link_count: Option<usize>,
}

impl ConversionMetadata {
    /// Copy package statistics into the envelope
    pub fn with_stats(mut self, stats: &PackageStats) -> Self {
        self.page_count = Some(stats.page_count);
        self.image_count = Some(stats.image_count);
        self.diagram_count = Some(stats.diagram_count);
        self.internal_link_count = Some(stats.internal_link_count);
        self.external_link_count = Some(stats.external_link_count);
        self
    }
}

/// Outcome of one conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub success: bool,
    /// Kept in memory; the JSON envelope reports `outputPath` instead
    #[serde(skip)]
    pub output: Option<ConversionOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub metadata: ConversionMetadata,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ConversionError>,
}

impl ConversionResult {
    pub fn success(
        output: ConversionOutput,
        metadata: ConversionMetadata,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            success: true,
            output: Some(output),
            input_path: None,
            output_path: None,
            metadata,
            warnings,
            error: None,
        }
    }

    pub fn failure(error: ConversionError, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            output: None,
            input_path: None,
            output_path: None,
            metadata: ConversionMetadata::default(),
            warnings,
            error: Some(error),
        }
    }

    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// The error code, if the conversion failed
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}
