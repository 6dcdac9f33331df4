//! Document extraction (docx → markdown)
//!
//! Rebuilds an `mdocx_ast::Document` from a package and renders it back
//! to markdown. Paragraph styles are mapped through [`StyleMapper`];
//! styles with no known meaning degrade to plain paragraphs and are
//! reported once per style id. Embedded media is optionally collected
//! under deterministic names (`image-<n>.<ext>`).

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use mdocx_ast::{
    Block as AstBlock, BreakType, CodeBlock, Document as AstDocument, DocumentMeta, FormatType,
    Heading, Image, Inline, Link, List, ListItem, ListType, Paragraph as AstParagraph,
    Table as AstTable, TableCell as AstCell, TableRow as AstRow,
};
use mdocx_core::{GeneratorConfig, MarkdownGenerator};
use mdocx_diagrams::ImageFormat;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::archive::OoxmlArchive;
use crate::document::{Block, Document, Hyperlink, ImageRef, Paragraph, ParagraphChild, Run, Table};
use crate::error::Result;
use crate::image::{convert_raster, sniff_format};
use crate::mapping::{SemanticTag, StyleMapper};
use crate::numbering::NumberingInfo;
use crate::relationships::{RelKind, Relationships};
use crate::styles::StyleSheet;

/// Reverse conversion settings
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Keep inline emphasis and emit front matter for document properties
    pub preserve_formatting: bool,
    /// Collect embedded media
    pub extract_images: bool,
    /// Directory image references point into
    pub image_output_dir: Option<PathBuf>,
    /// Target format for extracted images
    pub image_format: ImageFormat,
    /// JPEG quality when re-encoding
    pub image_quality: u8,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            preserve_formatting: true,
            extract_images: false,
            image_output_dir: None,
            image_format: ImageFormat::Png,
            image_quality: 85,
        }
    }
}

/// An embedded image pulled out of the package
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// Deterministic file name, `image-<n>.<ext>`
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// Result of extracting a document
#[derive(Debug)]
pub struct ExtractedDocument {
    /// The reconstructed tree
    pub document: AstDocument,
    /// The generated markdown
    pub markdown: String,
    /// Non-fatal problems found while mapping
    pub warnings: Vec<String>,
    /// Style ids that had no semantic mapping, in first-seen order
    pub unknown_styles: Vec<String>,
    /// Images collected when extraction is enabled
    pub images: Vec<ExtractedImage>,
}

impl ExtractedDocument {
    /// Write every extracted image into `dir`, creating it if needed
    pub fn save_images(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if self.images.is_empty() {
            return Ok(Vec::new());
        }
        std::fs::create_dir_all(dir)?;
        self.images
            .iter()
            .map(|image| {
                let path = dir.join(&image.file_name);
                std::fs::write(&path, &image.bytes)?;
                Ok(path)
            })
            .collect()
    }
}

/// Parse core properties (docProps/core.xml) into document metadata
pub fn parse_core_properties(xml: &[u8]) -> DocumentMeta {
    let mut meta = DocumentMeta::default();
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().trim().to_string();
                if text.is_empty() {
                    buf.clear();
                    continue;
                }
                match current.as_str() {
                    "dc:title" => meta.title = Some(text),
                    "dc:subject" => meta.subject = Some(text),
                    "dc:description" => meta.description = Some(text),
                    "dcterms:created" => meta.created = Some(text),
                    "dc:creator" => {
                        meta.authors = split_list(&text, ';');
                    }
                    "cp:keywords" => {
                        meta.keywords = split_list(&text, ',');
                    }
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current.clear(),
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    meta
}

/// Warning recorded for a style id with no semantic mapping
pub fn unknown_style_warning(style_id: &str) -> String {
    format!("Unknown style '{}' mapped to paragraph", style_id)
}

fn split_list(text: &str, sep: char) -> Vec<String> {
    text.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts packages to markdown
#[derive(Debug, Clone, Default)]
pub struct DocxExtractor {
    options: ExtractOptions,
}

impl DocxExtractor {
    /// Create an extractor with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Extract a document from a file path
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<ExtractedDocument> {
        let archive = OoxmlArchive::open(path)?;
        self.extract_archive(&archive)
    }

    /// Extract a document from package bytes
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<ExtractedDocument> {
        let archive = OoxmlArchive::from_bytes(bytes)?;
        self.extract_archive(&archive)
    }

    /// Extract from an already-opened archive
    pub fn extract_archive(&self, archive: &OoxmlArchive) -> Result<ExtractedDocument> {
        let document = Document::parse(archive.document_xml()?)?;
        let styles = match archive.styles_xml() {
            Some(xml) => StyleSheet::parse(xml)?,
            None => StyleSheet::default(),
        };
        let numbering = match archive.numbering_xml() {
            Some(xml) => NumberingInfo::parse(xml)?,
            None => NumberingInfo::default(),
        };
        let relationships = match archive.document_rels_xml() {
            Some(xml) => Relationships::parse(xml)?,
            None => Relationships::new(),
        };
        let metadata = archive
            .core_properties_xml()
            .map(parse_core_properties)
            .unwrap_or_default();

        let mut mapper = TreeMapper {
            options: &self.options,
            archive,
            styles: StyleMapper::new(styles),
            numbering,
            relationships,
            warnings: Vec::new(),
            unknown: BTreeSet::new(),
            unknown_order: Vec::new(),
            images: Vec::new(),
            image_names: HashMap::new(),
        };
        let blocks = mapper.map_blocks(&document.blocks);

        let tree = AstDocument { metadata, blocks };
        let mut generator = MarkdownGenerator::with_config(GeneratorConfig {
            include_front_matter: self.options.preserve_formatting,
        });
        let markdown = generator.generate(&tree);

        Ok(ExtractedDocument {
            document: tree,
            markdown,
            warnings: mapper.warnings,
            unknown_styles: mapper.unknown_order,
            images: mapper.images,
        })
    }
}

/// Convert package bytes to markdown with the given options
pub fn deserialize(bytes: &[u8], options: &ExtractOptions) -> Result<ExtractedDocument> {
    DocxExtractor::with_options(options.clone()).extract_bytes(bytes)
}

/// Per-extraction state
struct TreeMapper<'a> {
    options: &'a ExtractOptions,
    archive: &'a OoxmlArchive,
    styles: StyleMapper,
    numbering: NumberingInfo,
    relationships: Relationships,
    warnings: Vec<String>,
    unknown: BTreeSet<String>,
    unknown_order: Vec<String>,
    images: Vec<ExtractedImage>,
    /// rel id -> extracted file name
    image_names: HashMap<String, String>,
}

/// A paragraph after style mapping, before grouping
enum Mapped {
    Block(AstBlock),
    ListItem { num_id: String, item: ListItem },
    Code(String),
    Quote(AstBlock),
    Skip,
}

impl TreeMapper<'_> {
    fn map_blocks(&mut self, blocks: &[Block]) -> Vec<AstBlock> {
        let mut out: Vec<AstBlock> = Vec::new();
        let mut list: Option<(String, List)> = None;
        let mut code: Option<String> = None;
        let mut quote: Option<Vec<AstBlock>> = None;
        let mut after_toc = false;

        for block in blocks {
            let mapped = match block {
                Block::Paragraph(para) => {
                    let tag = self.tag_for(para);
                    if tag.is_generated() {
                        after_toc = true;
                        continue;
                    }
                    // The page break closing a generated contents list
                    if after_toc && para.page_break && para.is_empty() {
                        after_toc = false;
                        continue;
                    }
                    after_toc = false;
                    self.map_paragraph(para, tag)
                }
                Block::Table(table) => {
                    after_toc = false;
                    Mapped::Block(AstBlock::Table(self.map_table(table)))
                }
            };

            if !matches!(mapped, Mapped::ListItem { .. }) {
                if let Some((_, finished)) = list.take() {
                    out.push(AstBlock::List(finished));
                }
            }
            if !matches!(mapped, Mapped::Code(_)) {
                if let Some(content) = code.take() {
                    out.push(code_block(content));
                }
            }
            if !matches!(mapped, Mapped::Quote(_)) {
                if let Some(children) = quote.take() {
                    out.push(AstBlock::Quote(children));
                }
            }

            match mapped {
                Mapped::Block(block) => out.push(block),
                Mapped::ListItem { num_id, item } => {
                    let continues = matches!(list, Some((ref current, _)) if *current == num_id);
                    if continues {
                        if let Some((_, ref mut current)) = list {
                            current.items.push(item);
                        }
                    } else {
                        if let Some((_, finished)) = list.take() {
                            out.push(AstBlock::List(finished));
                        }
                        let list_type = if self.numbering.is_ordered(&num_id) {
                            ListType::Ordered
                        } else {
                            ListType::Unordered
                        };
                        list = Some((
                            num_id,
                            List {
                                list_type,
                                items: vec![item],
                                style_id: None,
                            },
                        ));
                    }
                }
                Mapped::Code(text) => match code {
                    Some(ref mut content) => {
                        content.push('\n');
                        content.push_str(&text);
                    }
                    None => code = Some(text),
                },
                Mapped::Quote(block) => quote.get_or_insert_with(Vec::new).push(block),
                Mapped::Skip => {}
            }

            if let Block::Paragraph(para) = block {
                if para.page_break && !para.is_empty() {
                    out.push(AstBlock::Break(BreakType::Page));
                }
            }
        }

        if let Some((_, finished)) = list {
            out.push(AstBlock::List(finished));
        }
        if let Some(content) = code {
            out.push(code_block(content));
        }
        if let Some(children) = quote {
            out.push(AstBlock::Quote(children));
        }
        out
    }

    fn tag_for(&mut self, para: &Paragraph) -> SemanticTag {
        let Some(ref style_id) = para.style_id else {
            return SemanticTag::Paragraph;
        };
        match self.styles.map(style_id) {
            SemanticTag::Unknown(id) => {
                if self.unknown.insert(id.clone()) {
                    log::warn!("No semantic mapping for style '{}'", id);
                    self.warnings.push(unknown_style_warning(&id));
                    self.unknown_order.push(id.clone());
                }
                SemanticTag::Unknown(id)
            }
            tag => tag,
        }
    }

    fn map_paragraph(&mut self, para: &Paragraph, tag: SemanticTag) -> Mapped {
        if para.is_empty() {
            return if para.bottom_border {
                Mapped::Block(AstBlock::ThematicBreak)
            } else if para.page_break {
                Mapped::Block(AstBlock::Break(BreakType::Page))
            } else if para.section_break {
                Mapped::Block(AstBlock::Break(BreakType::Section))
            } else {
                Mapped::Skip
            };
        }

        if let Some(ref numbering) = para.numbering {
            if !numbering.num_id.is_empty() && numbering.num_id != "0" {
                return Mapped::ListItem {
                    num_id: numbering.num_id.clone(),
                    item: ListItem {
                        content: self.map_inlines(para),
                        level: numbering.ilvl,
                    },
                };
            }
        }

        match tag {
            SemanticTag::Heading(level) => Mapped::Block(self.heading(para, level)),
            SemanticTag::Title => Mapped::Block(self.heading(para, 1)),
            SemanticTag::CodeBlock => Mapped::Code(para.plain_text()),
            SemanticTag::Quote => Mapped::Quote(AstBlock::Paragraph(AstParagraph::new(
                self.map_inlines(para),
            ))),
            SemanticTag::ListItem => Mapped::ListItem {
                num_id: String::new(),
                item: ListItem {
                    content: self.map_inlines(para),
                    level: 0,
                },
            },
            _ if is_code_paragraph(para) => Mapped::Code(para.plain_text()),
            _ => Mapped::Block(AstBlock::Paragraph(AstParagraph::new(self.map_inlines(para)))),
        }
    }

    fn heading(&mut self, para: &Paragraph, level: u8) -> AstBlock {
        AstBlock::Heading(Heading {
            level: level.clamp(1, 6),
            text: self.map_inlines(para),
            style_id: None,
            anchor: para.bookmarks().next().map(str::to_string),
        })
    }

    fn map_table(&mut self, table: &Table) -> AstTable {
        let rows = table
            .rows
            .iter()
            .map(|row| AstRow {
                cells: row
                    .cells
                    .iter()
                    .map(|cell| {
                        let mut content = Vec::new();
                        for para in cell.paragraphs.iter().filter(|p| !p.is_empty()) {
                            if !content.is_empty() {
                                content.push(Inline::Break);
                            }
                            content.extend(self.map_inlines(para));
                        }
                        AstCell { content }
                    })
                    .collect(),
                is_header: row.is_header,
            })
            .collect();
        AstTable {
            rows,
            style_id: None,
        }
    }

    fn map_inlines(&mut self, para: &Paragraph) -> Vec<Inline> {
        let mut inlines = Vec::new();
        let mut pending: Vec<&Run> = Vec::new();

        for child in &para.children {
            if !matches!(child, ParagraphChild::Run(_)) {
                self.flush_runs(&mut pending, &mut inlines);
            }
            match child {
                ParagraphChild::Run(run) => pending.push(run),
                ParagraphChild::Break => inlines.push(Inline::Break),
                ParagraphChild::Hyperlink(link) => {
                    if let Some(inline) = self.map_hyperlink(link) {
                        inlines.push(inline);
                    }
                }
                ParagraphChild::Image(image) => {
                    if let Some(inline) = self.map_image(image) {
                        inlines.push(inline);
                    }
                }
                ParagraphChild::Bookmark(_) => {}
            }
        }
        self.flush_runs(&mut pending, &mut inlines);
        trim_edges(&mut inlines);
        inlines
    }

    /// Merge adjacent runs with identical formatting
    fn flush_runs(&self, pending: &mut Vec<&Run>, out: &mut Vec<Inline>) {
        let mut merged: Vec<Run> = Vec::new();
        for run in pending.drain(..) {
            match merged.last_mut() {
                Some(last) if same_format(last, run) => last.text.push_str(&run.text),
                _ => merged.push(run.clone()),
            }
        }
        out.extend(merged.iter().map(|run| self.convert_run(run)));
    }

    fn convert_run(&self, run: &Run) -> Inline {
        let mut inline = Inline::Text(run.text.clone());
        if !self.options.preserve_formatting || run.text.trim().is_empty() {
            return inline;
        }
        let formats = [
            (run.monospace, FormatType::Code),
            (run.strike, FormatType::Strikethrough),
            (run.underline, FormatType::Underline),
            (run.italic, FormatType::Italic),
            (run.bold, FormatType::Bold),
        ];
        for (on, format) in formats {
            if on {
                inline = Inline::Format(format, Box::new(inline));
            }
        }
        inline
    }

    fn map_hyperlink(&mut self, link: &Hyperlink) -> Option<Inline> {
        let mut text = Vec::new();
        let mut pending: Vec<&Run> = link.runs.iter().collect();
        self.flush_runs(&mut pending, &mut text);
        if text.is_empty() {
            return None;
        }

        let url = if let Some(ref anchor) = link.anchor {
            Some(format!("#{}", anchor))
        } else if let Some(ref id) = link.id {
            let target = self
                .relationships
                .target_of(id, &RelKind::Hyperlink)
                .map(str::to_string);
            if target.is_none() {
                self.warnings
                    .push(format!("Hyperlink relationship not found: {}", id));
            }
            target
        } else {
            None
        };

        Some(match url {
            Some(url) => Inline::Link(Link { url, text }),
            None => Inline::Span(text),
        })
    }

    fn map_image(&mut self, image: &ImageRef) -> Option<Inline> {
        let alt = image.alt.clone().unwrap_or_default();
        let Some(target) = self
            .relationships
            .target_of(&image.rel_id, &RelKind::Image)
            .map(str::to_string)
        else {
            self.warnings
                .push(format!("Image relationship not found: {}", image.rel_id));
            return None;
        };

        if !self.options.extract_images {
            return Some(Inline::Image(Image { src: target, alt }));
        }

        let file_name = match self.image_names.get(&image.rel_id) {
            Some(name) => name.clone(),
            None => {
                let name = self.collect_image(&target)?;
                self.image_names.insert(image.rel_id.clone(), name.clone());
                name
            }
        };
        let src = match self.options.image_output_dir {
            Some(ref dir) => dir.join(&file_name).to_string_lossy().replace('\\', "/"),
            None => file_name,
        };
        Some(Inline::Image(Image { src, alt }))
    }

    /// Copy a media part out of the package under the next image name
    fn collect_image(&mut self, target: &str) -> Option<String> {
        let part = match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("word/{}", target),
        };
        let Some(bytes) = self.archive.get(&part) else {
            self.warnings.push(format!("Media part not found: {}", part));
            return None;
        };

        let source = sniff_format(bytes).unwrap_or(ImageFormat::Png);
        let requested = self.options.image_format;
        let (bytes, format) = match requested {
            ImageFormat::Svg if source != ImageFormat::Svg => {
                self.warnings.push(format!(
                    "Cannot convert {} to svg; kept as {}",
                    part,
                    source.extension()
                ));
                (bytes.to_vec(), source)
            }
            wanted if wanted != source && source != ImageFormat::Svg => {
                match convert_raster(bytes, wanted, self.options.image_quality) {
                    Ok(converted) => (converted, wanted),
                    Err(e) => {
                        self.warnings
                            .push(format!("Failed to convert {}: {}", part, e));
                        (bytes.to_vec(), source)
                    }
                }
            }
            _ => (bytes.to_vec(), source),
        };

        let file_name = format!("image-{}.{}", self.images.len() + 1, format.extension());
        self.images.push(ExtractedImage {
            file_name: file_name.clone(),
            bytes,
            format,
        });
        Some(file_name)
    }
}

fn code_block(content: String) -> AstBlock {
    AstBlock::Code(CodeBlock {
        content,
        language: None,
        style_id: None,
    })
}

fn same_format(a: &Run, b: &Run) -> bool {
    a.bold == b.bold
        && a.italic == b.italic
        && a.underline == b.underline
        && a.strike == b.strike
        && a.monospace == b.monospace
}

/// Unstyled paragraphs set entirely in a monospace font
fn is_code_paragraph(para: &Paragraph) -> bool {
    let mut runs = para.children.iter().filter_map(|c| match c {
        ParagraphChild::Run(run) if !run.text.trim().is_empty() => Some(run),
        _ => None,
    });
    let has_other = para
        .children
        .iter()
        .any(|c| matches!(c, ParagraphChild::Hyperlink(_) | ParagraphChild::Image(_)));
    match runs.next() {
        Some(first) => !has_other && first.monospace && runs.all(|r| r.monospace),
        None => false,
    }
}

/// Drop leading and trailing whitespace of the paragraph text
fn trim_edges(inlines: &mut Vec<Inline>) {
    if let Some(Inline::Text(first)) = inlines.first_mut() {
        let trimmed = first.trim_start().to_string();
        *first = trimmed;
    }
    if let Some(Inline::Text(last)) = inlines.last_mut() {
        let trimmed = last.trim_end().to_string();
        *last = trimmed;
    }
    inlines.retain(|i| !matches!(i, Inline::Text(t) if t.is_empty()));
}
