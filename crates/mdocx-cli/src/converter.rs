//! Conversion orchestration
//!
//! A [`Converter`] carries everything one run needs: options, the diagram
//! backend factory, the retry policy for output writes and a cancellation
//! token. Nothing is global, so tests substitute a fake backend and
//! concurrent converters never share state.
//!
//! Every public operation returns a [`ConversionResult`]. Batch runs
//! process files one after another, each with its own renderer, and
//! record a failing file without stopping the rest.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use mdocx_ast::{Block, Document, Inline};
use mdocx_core::{BuildOutput, ModelBuilder};
use mdocx_diagrams::{
    diagram_id_from_file_name, factory_of, BackendFactory, CancellationToken, DiagramRenderer,
    MermaidCliBackend,
};
use mdocx_ooxml::{unknown_style_warning, DocxExtractor, DocxWriter, ExtractedDocument};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::files::{
    read_bytes, read_file, validate_file, write_file, DOCX_EXTENSIONS, MARKDOWN_EXTENSIONS,
};
use crate::options::{BackendKind, Config, ExtractOptions};
use crate::result::{
    ConversionError, ConversionMetadata, ConversionOutput, ConversionResult, ErrorCode,
};

/// Conversion direction for batch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Markdown → docx
    #[default]
    Docx,
    /// Docx → markdown
    Md,
}

impl Direction {
    /// Extension of produced files
    pub fn output_extension(&self) -> &'static str {
        match self {
            Direction::Docx => "docx",
            Direction::Md => "md",
        }
    }
}

/// Reported after each batch item
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress<'a> {
    pub completed: usize,
    pub total: usize,
    pub input: &'a Path,
    pub success: bool,
}

/// Conversion context
pub struct Converter {
    config: Config,
    backend: Option<BackendFactory>,
    cancel: CancellationToken,
}

impl Converter {
    /// Create a converter; the diagram backend follows `config.render`
    pub fn new(config: Config) -> Self {
        Self {
            config,
            backend: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `factory` for diagram backends instead of the configured one
    pub fn with_backend(mut self, factory: BackendFactory) -> Self {
        self.backend = Some(factory);
        self
    }

    /// Share a cancellation token, checked between diagrams and batch items
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn backend_factory(&self) -> Option<BackendFactory> {
        if let Some(ref factory) = self.backend {
            return Some(Arc::clone(factory));
        }
        let render = &self.config.render;
        match render.backend {
            BackendKind::None => None,
            BackendKind::Mmdc => Some(factory_of(match render.mmdc_path {
                Some(ref program) => MermaidCliBackend::with_program(program),
                None => MermaidCliBackend::new(),
            })),
            BackendKind::Kroki => kroki_factory(render.kroki_url.clone(), self.config.retry),
        }
    }

    /// A fresh renderer for one conversion
    fn renderer(&self) -> Result<Option<DiagramRenderer>, ConversionError> {
        let config = self
            .config
            .convert
            .render_config(&self.config.render.config)?;
        Ok(self.backend_factory().map(|factory| {
            DiagramRenderer::new(factory, config).with_cancellation(self.cancel.clone())
        }))
    }

    /// Convert markdown text to package bytes.
    ///
    /// Relative image paths resolve against `base_dir`.
    pub fn convert_markdown(&self, markdown: &str, base_dir: Option<&Path>) -> ConversionResult {
        let started = Instant::now();
        match self.convert_inner(markdown, base_dir) {
            Ok((bytes, metadata, warnings)) => {
                let metadata = ConversionMetadata {
                    input_size: markdown.len() as u64,
                    output_size: bytes.len() as u64,
                    processing_time_ms: elapsed_ms(started),
                    ..metadata
                };
                ConversionResult::success(ConversionOutput::Bytes(bytes), metadata, warnings)
            }
            Err(e) => {
                warn!("Conversion failed: {}", e);
                ConversionResult::failure(e, Vec::new())
            }
        }
    }

    fn convert_inner(
        &self,
        markdown: &str,
        base_dir: Option<&Path>,
    ) -> Result<(Vec<u8>, ConversionMetadata, Vec<String>), ConversionError> {
        let options = &self.config.convert;
        let styles = options.style_bundle()?;
        let renderer = self.renderer()?;

        let mut builder = ModelBuilder::new();
        if let Some(ref renderer) = renderer {
            builder = builder.with_renderer(renderer);
        }
        let mut output = builder.build(markdown).map_err(|e| {
            ConversionError::new(ErrorCode::FileConversionFailed, "Failed to parse markdown")
                .with_details(format!("{:#}", e))
        })?;
        options.apply_metadata(&mut output.document.metadata);
        let mut warnings = tag_build_warnings(&output);

        let mut write_options = options.write_options();
        for src in local_image_sources(&output.document) {
            let path = base_dir.unwrap_or(Path::new(".")).join(&src);
            match std::fs::read(&path) {
                Ok(bytes) => {
                    write_options.media.insert(src, bytes);
                }
                Err(e) => debug!("Image {} not loaded: {}", path.display(), e),
            }
        }

        let package = DocxWriter::new(&styles, &write_options)
            .with_diagrams(&output.diagrams)
            .with_links(&output.links)
            .write(&output.document)?;
        warnings.extend(package.warnings.iter().cloned());

        info!(
            "Serialized {} bytes ({} page(s), {} diagram(s))",
            package.bytes.len(),
            package.stats.page_count,
            package.stats.diagram_count
        );
        let metadata = ConversionMetadata::default().with_stats(&package.stats);
        Ok((package.bytes, metadata, warnings))
    }

    /// Convert a markdown file; output defaults to the input with `.docx`
    pub fn convert_file(&self, input: &Path, output: Option<&Path>) -> ConversionResult {
        let started = Instant::now();
        let output_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.with_extension("docx"));
        info!("Converting {} -> {}", input.display(), output_path.display());

        let validation = validate_file(input, MARKDOWN_EXTENSIONS);
        if let Some(error) = validation.errors.into_iter().next() {
            return ConversionResult::failure(error, validation.warnings).with_input(input);
        }
        let markdown = match read_file(input) {
            Ok(text) => text,
            Err(e) => return ConversionResult::failure(e, validation.warnings).with_input(input),
        };

        let mut result = self.convert_markdown(&markdown, input.parent());
        result.warnings.splice(0..0, validation.warnings);
        if let Some(ConversionOutput::Bytes(ref bytes)) = result.output {
            if let Err(e) = self.write_with_retry(&output_path, bytes) {
                return ConversionResult::failure(e, result.warnings).with_input(input);
            }
            result.metadata.processing_time_ms = elapsed_ms(started);
            result = result.with_output_path(output_path);
        }
        result.with_input(input)
    }

    /// Convert package bytes to markdown; images stay in memory
    pub fn extract_bytes(&self, bytes: &[u8]) -> ConversionResult {
        let started = Instant::now();
        match self.extract_inner(bytes, &self.config.extract) {
            Ok(extracted) => extraction_result(bytes.len(), &extracted, started),
            Err(e) => {
                warn!("Extraction failed: {}", e);
                ConversionResult::failure(e, Vec::new())
            }
        }
    }

    fn extract_inner(
        &self,
        bytes: &[u8],
        extract: &ExtractOptions,
    ) -> Result<ExtractedDocument, ConversionError> {
        let options =
            extract.to_extractor_options(self.config.convert.output_options.image_quality);
        DocxExtractor::with_options(options)
            .extract_bytes(bytes)
            .map_err(|e| {
                let error: ConversionError = e.into();
                if error.code == ErrorCode::FileConversionFailed {
                    ConversionError::new(error.code, "Failed to read package")
                        .with_details(error.message)
                } else {
                    error
                }
            })
    }

    /// Convert a package file; output defaults to the input with `.md`.
    ///
    /// Extracted images are written next to the output.
    pub fn extract_file(&self, input: &Path, output: Option<&Path>) -> ConversionResult {
        self.extract_file_with(input, output, &self.config.extract)
    }

    fn extract_file_with(
        &self,
        input: &Path,
        output: Option<&Path>,
        extract: &ExtractOptions,
    ) -> ConversionResult {
        let started = Instant::now();
        let output_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.with_extension("md"));
        info!("Extracting {} -> {}", input.display(), output_path.display());

        let validation = validate_file(input, DOCX_EXTENSIONS);
        if let Some(error) = validation.errors.into_iter().next() {
            return ConversionResult::failure(error, validation.warnings).with_input(input);
        }
        let bytes = match read_bytes(input) {
            Ok(bytes) => bytes,
            Err(e) => return ConversionResult::failure(e, validation.warnings).with_input(input),
        };
        let extracted = match self.extract_inner(&bytes, extract) {
            Ok(extracted) => extracted,
            Err(e) => return ConversionResult::failure(e, validation.warnings).with_input(input),
        };

        let image_dir = extract.image_dir(Some(&output_path));
        for image in &extracted.images {
            let path = image_dir.join(&image.file_name);
            if let Err(e) = self.write_with_retry(&path, &image.bytes) {
                return ConversionResult::failure(e, validation.warnings).with_input(input);
            }
        }
        if let Err(e) = self.write_with_retry(&output_path, extracted.markdown.as_bytes()) {
            return ConversionResult::failure(e, validation.warnings).with_input(input);
        }

        let mut result = extraction_result(bytes.len(), &extracted, started);
        result.warnings.splice(0..0, validation.warnings);
        result.with_input(input).with_output_path(output_path)
    }

    /// Convert many files into `out_dir`.
    ///
    /// Returns one result per input, in input order. `progress` runs after
    /// each item on the calling thread.
    pub fn batch(
        &self,
        inputs: &[PathBuf],
        out_dir: &Path,
        direction: Direction,
        mut progress: impl FnMut(&BatchProgress<'_>),
    ) -> Vec<ConversionResult> {
        let total = inputs.len();
        let mut results = Vec::with_capacity(total);
        let mut used_names = HashSet::new();

        for (i, input) in inputs.iter().enumerate() {
            let result = if self.cancel.is_cancelled() {
                ConversionResult::failure(
                    ConversionError::new(
                        ErrorCode::BatchConversionError,
                        format!("Cancelled before converting {}", input.display()),
                    ),
                    Vec::new(),
                )
                .with_input(input)
            } else {
                let output = out_dir.join(unique_name(input, direction, &mut used_names));
                let result = match direction {
                    Direction::Docx => self.convert_file(input, Some(&output)),
                    Direction::Md => {
                        // Each document gets its own image directory
                        let extract = self.config.extract.for_item(&output);
                        self.extract_file_with(input, Some(&output), &extract)
                    }
                };
                as_batch_item(result, input)
            };

            if !result.success {
                warn!("Batch item {} of {} failed: {}", i + 1, total, input.display());
            }
            progress(&BatchProgress {
                completed: i + 1,
                total,
                input,
                success: result.success,
            });
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        info!("Batch complete: {} of {} succeeded", succeeded, total);
        results
    }

    fn write_with_retry(&self, path: &Path, bytes: &[u8]) -> Result<(), ConversionError> {
        self.config.retry.run(
            |attempt| {
                if attempt > 1 {
                    debug!("Retrying write of {} (attempt {})", path.display(), attempt);
                }
                write_file(path, bytes)
            },
            |e| e.code == ErrorCode::FileConversionFailed,
        )
    }
}

#[cfg(feature = "kroki")]
fn kroki_factory(
    url: Option<String>,
    policy: mdocx_diagrams::RetryPolicy,
) -> Option<BackendFactory> {
    use mdocx_diagrams::{KrokiBackend, RenderBackend, RetryingBackend, DEFAULT_KROKI_URL};

    let url = url.unwrap_or_else(|| DEFAULT_KROKI_URL.to_string());
    Some(Arc::new(move || {
        Box::new(RetryingBackend::new(KrokiBackend::with_url(url.clone()), policy))
            as Box<dyn RenderBackend>
    }))
}

#[cfg(not(feature = "kroki"))]
fn kroki_factory(
    _url: Option<String>,
    _policy: mdocx_diagrams::RetryPolicy,
) -> Option<BackendFactory> {
    warn!("Kroki support is not compiled in; diagrams are left as code");
    None
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Prefix builder warnings with their error code
fn tag_build_warnings(output: &BuildOutput) -> Vec<String> {
    let link_warnings: HashSet<&str> = output
        .links
        .iter()
        .filter_map(|l| l.warning.as_deref())
        .collect();
    output
        .warnings
        .iter()
        .map(|w| {
            let code = if link_warnings.contains(w.as_str()) {
                ErrorCode::MalformedLink
            } else {
                ErrorCode::DiagramRenderFailure
            };
            format!("{}: {}", code, w)
        })
        .collect()
}

fn extraction_result(
    input_size: usize,
    extracted: &ExtractedDocument,
    started: Instant,
) -> ConversionResult {
    let unknown: HashSet<String> = extracted
        .unknown_styles
        .iter()
        .map(|id| unknown_style_warning(id))
        .collect();
    let warnings = extracted
        .warnings
        .iter()
        .map(|w| {
            if unknown.contains(w) {
                format!("{}: {}", ErrorCode::UnknownStyleMapping, w)
            } else {
                w.clone()
            }
        })
        .collect();
    let metadata = ConversionMetadata {
        input_size: input_size as u64,
        output_size: extracted.markdown.len() as u64,
        processing_time_ms: elapsed_ms(started),
        image_count: Some(extracted.images.len()),
        ..Default::default()
    };
    ConversionResult::success(
        ConversionOutput::Text(extracted.markdown.clone()),
        metadata,
        warnings,
    )
}

/// A batch item's failure is reported as a conversion failure of that file
fn as_batch_item(mut result: ConversionResult, input: &Path) -> ConversionResult {
    if let Some(inner) = result.error.take() {
        let error = match inner.code {
            ErrorCode::FileConversionFailed | ErrorCode::BatchConversionError => inner,
            _ => ConversionError::new(
                ErrorCode::FileConversionFailed,
                format!("Failed to convert {}", input.display()),
            )
            .with_details(inner.to_string()),
        };
        result.error = Some(error);
    }
    result
}

/// Output file name for `input`, suffixed when two inputs share a stem
fn unique_name(input: &Path, direction: Direction, used: &mut HashSet<String>) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let ext = direction.output_extension();
    let mut name = format!("{}.{}", stem, ext);
    let mut n = 1;
    while !used.insert(name.clone()) {
        name = format!("{}-{}.{}", stem, n, ext);
        n += 1;
    }
    name
}

/// Image sources that refer to local files rather than diagrams or URLs
fn local_image_sources(doc: &Document) -> Vec<String> {
    fn visit_inlines(inlines: &[Inline], out: &mut Vec<String>) {
        for inline in inlines {
            match inline {
                Inline::Image(image) => out.push(image.src.clone()),
                Inline::Format(_, inner) => visit_inlines(std::slice::from_ref(inner.as_ref()), out),
                Inline::Span(children) => visit_inlines(children, out),
                Inline::Link(link) => visit_inlines(&link.text, out),
                Inline::Text(_) | Inline::Break => {}
            }
        }
    }

    fn visit_blocks(blocks: &[Block], out: &mut Vec<String>) {
        for block in blocks {
            match block {
                Block::Paragraph(p) => visit_inlines(&p.inlines, out),
                Block::Heading(h) => visit_inlines(&h.text, out),
                Block::List(l) => l.items.iter().for_each(|i| visit_inlines(&i.content, out)),
                Block::Table(t) => t
                    .rows
                    .iter()
                    .flat_map(|r| r.cells.iter())
                    .for_each(|c| visit_inlines(&c.content, out)),
                Block::Quote(children) => visit_blocks(children, out),
                Block::Code(_) | Block::Break(_) | Block::ThematicBreak => {}
            }
        }
    }

    let mut sources = Vec::new();
    visit_blocks(&doc.blocks, &mut sources);
    let mut seen = HashSet::new();
    sources.retain(|src| {
        !src.contains("://")
            && !src.starts_with("data:")
            && diagram_id_from_file_name(src).is_none()
            && seen.insert(src.clone())
    });
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdocx_diagrams::testing::FakeBackend;
    use tempfile::TempDir;

    fn converter() -> Converter {
        let mut config = Config::default();
        config.render.backend = BackendKind::None;
        Converter::new(config)
    }

    #[test]
    fn test_convert_markdown_envelope() {
        let result = converter().convert_markdown(
            "# Title\n\nSee [site](https://example.com), [intro](#title) and [bad](http.example.com).\n",
            None,
        );
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.metadata.external_link_count, Some(2));
        assert_eq!(result.metadata.internal_link_count, Some(1));
        assert_eq!(result.metadata.page_count, Some(1));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.starts_with("MalformedLink: ")));
        let output = result.output.unwrap();
        assert_eq!(result.metadata.output_size, output.len() as u64);
        assert!(output.as_bytes().starts_with(b"PK"));
    }

    #[test]
    fn test_invalid_template_fails_the_call() {
        let mut config = Config::default();
        config.convert.template = "nope".to_string();
        let result = Converter::new(config).convert_markdown("# x\n", None);
        assert!(!result.success);
        assert_eq!(result.error_code(), Some(ErrorCode::InvalidTemplate));
    }

    #[test]
    fn test_diagram_failures_become_warnings() {
        let backend = FakeBackend::new().failing_on("FAIL");
        let converter = converter().with_backend(backend.factory());
        let result = converter.convert_markdown(
            "# D\n\n```mermaid\ngraph TD; A-->B;\n```\n\n```mermaid\nFAIL\n```\n",
            None,
        );
        assert!(result.success);
        assert_eq!(result.metadata.diagram_count, Some(1));
        assert_eq!(
            result
                .warnings
                .iter()
                .filter(|w| w.starts_with("DiagramRenderFailure: "))
                .count(),
            1
        );
        assert_eq!(backend.log().live(), 0);
    }

    #[test]
    fn test_convert_and_extract_files() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("guide.md");
        std::fs::write(&input, "# Guide\n\nBody text.\n").unwrap();

        let converter = converter();
        let result = converter.convert_file(&input, None);
        assert!(result.success, "{:?}", result.error);
        let docx = dir.path().join("guide.docx");
        assert_eq!(result.output_path.as_deref(), Some(docx.as_path()));
        assert!(docx.exists());

        let out = dir.path().join("back/guide.md");
        let result = converter.extract_file(&docx, Some(&out));
        assert!(result.success, "{:?}", result.error);
        let markdown = std::fs::read_to_string(&out).unwrap();
        assert!(markdown.contains("# Guide"));
        assert!(markdown.contains("Body text."));
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let result = converter().extract_bytes(b"not a zip");
        assert!(!result.success);
        assert_eq!(result.error_code(), Some(ErrorCode::FileConversionFailed));
    }

    #[test]
    fn test_local_images_are_embedded() {
        let dir = TempDir::new().unwrap();
        let mut png = Vec::new();
        image::RgbImage::from_pixel(4, 4, image::Rgb([0, 90, 200]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        std::fs::write(dir.path().join("logo.png"), png).unwrap();
        let result = converter().convert_markdown(
            "![Logo](logo.png)\n\n![Remote](https://example.com/x.png)\n",
            Some(dir.path()),
        );
        assert!(result.success);
        assert_eq!(result.metadata.image_count, Some(1));
        assert!(result.warnings.iter().any(|w| w.contains("x.png")));
    }

    #[test]
    fn test_unique_names() {
        let mut used = HashSet::new();
        assert_eq!(
            unique_name(Path::new("a/readme.md"), Direction::Docx, &mut used),
            "readme.docx"
        );
        assert_eq!(
            unique_name(Path::new("b/readme.md"), Direction::Docx, &mut used),
            "readme-1.docx"
        );
    }
}
