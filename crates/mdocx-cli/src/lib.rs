//! mdocx CLI - Command-line interface and conversion orchestrator
//!
//! This library provides:
//! - Convert: markdown to DOCX, with rendered mermaid diagrams
//! - Extract: DOCX back to markdown, optionally with images
//! - Batch: many files, one result per file
//!
//! Every operation returns a [`ConversionResult`]; failures carry an
//! [`ErrorCode`] instead of escaping as panics or raw errors.
//!
//! # Library Usage
//!
//! ```no_run
//! use mdocx_cli::{Config, Converter};
//! use std::path::Path;
//!
//! let converter = Converter::new(Config::default());
//! let result = converter.convert_file(Path::new("guide.md"), None);
//! if !result.success {
//!     eprintln!("{:?}", result.error);
//! }
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Markdown to DOCX with a contents list
//! mdocx convert guide.md --template technical-documentation --toc
//!
//! # DOCX to markdown, images into ./media
//! mdocx extract report.docx --extract-images media
//!
//! # Everything under docs/, JSON envelope per file
//! mdocx batch "docs/*.md" --out-dir build --json
//! ```

pub mod app;
pub mod converter;
pub mod files;
pub mod options;
pub mod result;

pub use app::{
    batch_command, convert_command, extract_command, run_cli, templates_command, BackendArg,
    ImageFormatArg, TargetFormat,
};
pub use converter::{BatchProgress, Converter, Direction};
pub use files::{read_bytes, read_file, validate_file, write_file, FileValidation};
pub use options::{BackendKind, Config, ConvertOptions, ExtractOptions, OutputOptions, RenderSettings};
pub use result::{
    ConversionError, ConversionMetadata, ConversionOutput, ConversionResult, ErrorCode,
};
