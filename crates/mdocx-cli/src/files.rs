//! File collaborators: reading, writing and validating inputs

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::result::{ConversionError, ErrorCode};

/// Inputs above this size convert, with a warning
pub const LARGE_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Extensions accepted for markdown input
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "txt"];

/// Extensions accepted for package input
pub const DOCX_EXTENSIONS: &[&str] = &["docx", "docm", "dotx"];

/// Outcome of [`validate_file`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileValidation {
    pub is_valid: bool,
    pub errors: Vec<ConversionError>,
    pub warnings: Vec<String>,
    /// Size in bytes, when the file could be inspected
    pub size: u64,
}

fn missing(path: &Path, err: Option<&io::Error>) -> ConversionError {
    let error = ConversionError::new(
        ErrorCode::FileNotFound,
        format!("File not found: {}", path.display()),
    );
    match err {
        Some(e) => error.with_details(e.to_string()),
        None => error,
    }
}

fn not_a_file(path: &Path) -> ConversionError {
    ConversionError::new(
        ErrorCode::FileNotFound,
        format!("Not a file: {}", path.display()),
    )
}

fn io_failure(action: &str, path: &Path, err: io::Error) -> ConversionError {
    ConversionError::new(
        ErrorCode::FileConversionFailed,
        format!("Failed to {} {}", action, path.display()),
    )
    .with_details(err.to_string())
}

fn check_is_file(path: &Path) -> Result<fs::Metadata, ConversionError> {
    let meta = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => missing(path, None),
        _ => missing(path, Some(&e)),
    })?;
    if !meta.is_file() {
        return Err(not_a_file(path));
    }
    Ok(meta)
}

/// Read a text file
pub fn read_file(path: &Path) -> Result<String, ConversionError> {
    check_is_file(path)?;
    fs::read_to_string(path).map_err(|e| io_failure("read", path, e))
}

/// Read a binary file
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, ConversionError> {
    check_is_file(path)?;
    fs::read(path).map_err(|e| io_failure("read", path, e))
}

/// Write `contents`, creating parent directories first
pub fn write_file(path: &Path, contents: &[u8]) -> Result<(), ConversionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_failure("create directory", parent, e))?;
    }
    fs::write(path, contents).map_err(|e| io_failure("write", path, e))
}

/// Check existence, extension and size.
///
/// `allowed` extensions compare case-insensitively, without the dot.
pub fn validate_file(path: &Path, allowed: &[&str]) -> FileValidation {
    let mut validation = FileValidation::default();

    let meta = match check_is_file(path) {
        Ok(meta) => meta,
        Err(e) => {
            validation.errors.push(e);
            return validation;
        }
    };
    validation.size = meta.len();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !allowed.is_empty() && !allowed.contains(&extension.as_str()) {
        validation.errors.push(
            ConversionError::new(
                ErrorCode::InvalidFileType,
                format!("Unsupported file type: {}", path.display()),
            )
            .with_details(format!("expected one of: {}", allowed.join(", "))),
        );
    }

    if meta.len() > LARGE_FILE_BYTES {
        validation.warnings.push(format!(
            "{}: {} is {:.1} MB, larger than {} MB; conversion may be slow",
            ErrorCode::LargeFileSize,
            path.display(),
            meta.len() as f64 / (1024.0 * 1024.0),
            LARGE_FILE_BYTES / (1024 * 1024)
        ));
    }

    validation.is_valid = validation.errors.is_empty();
    validation
}
