//! DOCX Writer
//!
//! Serializes an `mdocx_ast::Document` into a complete package: the
//! main document part, styles from a [`StyleBundle`], list numbering,
//! embedded media, relationships and (optionally) document properties.
//!
//! Rendered diagrams are referenced from the tree by their embed file
//! name (`mermaid-<id>.png`) and resolved against the diagrams handed to
//! the writer. Links are emitted from their [`ProcessedLink`]
//! classification: anchors become `w:anchor` hyperlinks, everything else
//! an external relationship.
//!
//! # Example
//!
//! ```
//! use mdocx_ooxml::{serialize, template, WriteOptions};
//!
//! let output = mdocx_core::build("# Hello\n\nWorld.\n", None).unwrap();
//! let styles = template::lookup("simple").unwrap();
//! let package = serialize(
//!     &output.document,
//!     &output.diagrams,
//!     &output.links,
//!     &styles,
//!     &WriteOptions::default(),
//! )
//! .unwrap();
//! assert!(!package.bytes.is_empty());
//! ```

use std::collections::HashMap;

use mdocx_ast::{
    nest_sections, plain_text, Block, BreakType, CodeBlock, Document, DocumentSection, FormatType,
    Heading, Image, Inline, Link, List, ListType, Paragraph, Table, TableOfContents,
};
use mdocx_core::{AnchorAllocator, LinkKind, LinkResolver, ProcessedLink};
use mdocx_diagrams::{diagram_id_from_file_name, ImageFormat, ProcessedDiagram};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::archive::{
    OoxmlArchive, APP_PROPS_PART, CORE_PROPS_PART, DOCUMENT_PART, DOCUMENT_RELS_PART,
    NUMBERING_PART, STYLES_PART,
};
use crate::error::{OoxmlError, Result};
use crate::image::{convert_raster, display_size, pixels_to_emu, raster_size, sniff_format};
use crate::numbering::NumberingBuilder;
use crate::relationships::{RelKind, Relationships};
use crate::template::{style_ids, StyleBundle};
use crate::xml::escape_xml;

/// Words per estimated page
const WORDS_PER_PAGE: usize = 500;

/// Twips per millimetre
const TWIPS_PER_MM: f32 = 56.692_9;

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page margins in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 25.4,
            right: 25.4,
            bottom: 25.4,
            left: 25.4,
        }
    }
}

/// Serializer switches
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Emit a table of contents before the body
    pub toc: bool,
    /// Emit hyperlinks; when off, link text becomes plain runs
    pub preserve_links: bool,
    /// Write `docProps/core.xml` and `docProps/app.xml`
    pub include_metadata: bool,
    /// Deflate package parts
    pub compress: bool,
    /// JPEG quality used when media is re-encoded
    pub image_quality: u8,
    /// Re-encode PNG media as JPEG when that is smaller
    pub optimize_size: bool,
    pub orientation: Orientation,
    pub margins: Margins,
    /// Image bytes for non-diagram image sources, keyed by `src`
    pub media: HashMap<String, Vec<u8>>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            toc: false,
            preserve_links: true,
            include_metadata: true,
            compress: true,
            image_quality: 85,
            optimize_size: false,
            orientation: Orientation::Portrait,
            margins: Margins::default(),
            media: HashMap::new(),
        }
    }
}

impl WriteOptions {
    /// Provide bytes for an image source referenced by the document
    pub fn with_media(mut self, src: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.media.insert(src.into(), bytes);
        self
    }
}

/// Counters accumulated while writing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageStats {
    /// Estimated from word count plus explicit page breaks
    pub page_count: usize,
    /// Embedded images that are not diagrams
    pub image_count: usize,
    pub diagram_count: usize,
    pub internal_link_count: usize,
    pub external_link_count: usize,
    pub word_count: usize,
}

/// A serialized package
#[derive(Debug, Clone)]
pub struct Package {
    pub bytes: Vec<u8>,
    pub stats: PackageStats,
    /// Recovered problems (missing images, unsupported media)
    pub warnings: Vec<String>,
}

/// Run formatting accumulated from nested inlines
#[derive(Debug, Clone, Copy, Default)]
struct RunProps {
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    code: bool,
    hyperlink: bool,
}

impl RunProps {
    fn with(mut self, format: FormatType) -> Self {
        match format {
            FormatType::Bold => self.bold = true,
            FormatType::Italic => self.italic = true,
            FormatType::Underline => self.underline = true,
            FormatType::Strikethrough => self.strike = true,
            FormatType::Code => self.code = true,
        }
        self
    }
}

/// An embedded media part
struct MediaPart {
    rel_id: String,
    width: u32,
    height: u32,
}

/// DOCX Writer for generating packages from the AST
pub struct DocxWriter<'a> {
    /// XML output buffer
    output: String,
    /// Document relationships (word/_rels/document.xml.rels)
    relationships: Relationships,
    numbering: NumberingBuilder,
    /// Media parts to embed (part path, bytes)
    media_files: Vec<(String, Vec<u8>)>,
    /// Embedded media keyed by content hash
    media_by_hash: HashMap<String, MediaPart>,
    next_drawing_id: usize,
    next_bookmark_id: usize,
    /// Anchors for headings, in document order
    heading_anchors: Vec<String>,
    next_heading: usize,
    toc: TableOfContents,
    styles: &'a StyleBundle,
    options: &'a WriteOptions,
    diagrams: HashMap<&'a str, &'a ProcessedDiagram>,
    links: HashMap<&'a str, &'a ProcessedLink>,
    resolver: LinkResolver,
    stats: PackageStats,
    page_breaks: usize,
    warnings: Vec<String>,
}

impl<'a> DocxWriter<'a> {
    /// Create a writer for one document
    pub fn new(styles: &'a StyleBundle, options: &'a WriteOptions) -> Self {
        Self {
            output: String::new(),
            relationships: Relationships::new(),
            numbering: NumberingBuilder::new(),
            media_files: Vec::new(),
            media_by_hash: HashMap::new(),
            next_drawing_id: 1,
            next_bookmark_id: 0,
            heading_anchors: Vec::new(),
            next_heading: 0,
            toc: TableOfContents::default(),
            styles,
            options,
            diagrams: HashMap::new(),
            links: HashMap::new(),
            resolver: LinkResolver::new(),
            stats: PackageStats::default(),
            page_breaks: 0,
            warnings: Vec::new(),
        }
    }

    /// Rendered diagrams the tree may reference
    pub fn with_diagrams(mut self, diagrams: &'a [ProcessedDiagram]) -> Self {
        self.diagrams = diagrams.iter().map(|d| (d.id.as_str(), d)).collect();
        self
    }

    /// Link classifications, keyed by original url
    pub fn with_links(mut self, links: &'a [ProcessedLink]) -> Self {
        self.links = links.iter().map(|l| (l.url.as_str(), l)).collect();
        self
    }

    /// Serialize `doc` into package bytes
    pub fn write(mut self, doc: &Document) -> Result<Package> {
        validate(doc, &self.diagrams)?;

        self.collect_outline(doc);

        let mut archive = OoxmlArchive::new();
        self.relationships.push(RelKind::Styles, "styles.xml");
        self.relationships
            .push(RelKind::Numbering, "numbering.xml");

        let document_xml = self.generate_document_xml(doc)?;
        check_well_formed(&document_xml)?;

        self.stats.page_count =
            self.stats.word_count.div_ceil(WORDS_PER_PAGE).max(1) + self.page_breaks;

        archive.set_string(DOCUMENT_PART, document_xml);
        archive.set_string(STYLES_PART, self.styles.to_styles_xml());
        archive.set_string(NUMBERING_PART, self.numbering.to_xml());
        archive.set_string(DOCUMENT_RELS_PART, self.relationships.to_xml());
        for (path, bytes) in std::mem::take(&mut self.media_files) {
            archive.set(path, bytes);
        }

        let include_metadata = self.options.include_metadata;
        if include_metadata {
            archive.set_string(CORE_PROPS_PART, core_properties_xml(doc));
            archive.set_string(APP_PROPS_PART, self.app_properties_xml());
        }
        archive.set_string("_rels/.rels", package_rels_xml(include_metadata));
        archive.set_string("[Content_Types].xml", content_types_xml(include_metadata));

        let bytes = archive.to_bytes(self.options.compress)?;
        log::debug!(
            "Wrote package: {} bytes, {} image(s), {} diagram(s)",
            bytes.len(),
            self.stats.image_count,
            self.stats.diagram_count
        );

        Ok(Package {
            bytes,
            stats: self.stats,
            warnings: self.warnings,
        })
    }

    /// Assign every heading its anchor and build the table of contents
    /// from the same anchors
    fn collect_outline(&mut self, doc: &Document) {
        let mut allocator = AnchorAllocator::new();
        let mut flat = Vec::new();
        // Headings inside quotes are quoted content and get no bookmark
        for block in &doc.blocks {
            let Block::Heading(heading) = block else {
                continue;
            };
            let title = heading.plain_text();
            let anchor = heading
                .anchor
                .clone()
                .unwrap_or_else(|| allocator.allocate(&title));
            flat.push(DocumentSection::new(title, heading.level, anchor));
        }
        self.heading_anchors = flat.iter().map(|s| s.id.clone()).collect();
        self.toc = TableOfContents::from_sections(&nest_sections(flat));
    }

    /// Generate the complete document.xml content
    fn generate_document_xml(&mut self, doc: &Document) -> Result<String> {
        self.output.clear();

        self.output
            .push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        self.output.push('\n');
        self.output.push_str(r#"<w:document "#);
        self.output
            .push_str(r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#);
        self.output.push_str(
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
        );
        self.output.push_str(
            r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
        );
        self.output
            .push_str(r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#);
        self.output
            .push_str(r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#);
        self.output.push('\n');
        self.output.push_str("<w:body>\n");

        if self.options.toc && !self.toc.is_empty() {
            self.generate_toc();
        }

        for block in &doc.blocks {
            self.generate_block(block, None)?;
        }

        self.generate_section_properties();
        self.output.push_str("</w:body>\n");
        self.output.push_str("</w:document>");

        Ok(std::mem::take(&mut self.output))
    }

    /// TOC heading, one hyperlinked entry per heading, then a page break
    fn generate_toc(&mut self) {
        self.output.push_str(&format!(
            "<w:p><w:pPr><w:pStyle w:val=\"{}\"/></w:pPr><w:r><w:t>Table of Contents</w:t></w:r></w:p>\n",
            style_ids::TOC_HEADING
        ));
        let entries: Vec<(u8, String, String)> = self
            .toc
            .flatten()
            .into_iter()
            .map(|e| (e.level, e.anchor.clone(), e.title.clone()))
            .collect();
        for (level, anchor, title) in entries {
            self.output.push_str(&format!(
                "<w:p><w:pPr><w:pStyle w:val=\"{}\"/></w:pPr><w:hyperlink w:anchor=\"{}\" w:history=\"1\"><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:hyperlink></w:p>\n",
                style_ids::toc(level),
                escape_xml(&anchor),
                escape_xml(&title)
            ));
        }
        self.generate_break(BreakType::Page);
    }

    fn generate_block(&mut self, block: &Block, inherited_style: Option<&str>) -> Result<()> {
        match block {
            Block::Paragraph(para) => self.generate_paragraph(para, inherited_style)?,
            Block::Heading(heading) => self.generate_heading(heading)?,
            Block::List(list) => self.generate_list(list)?,
            Block::Table(table) => self.generate_table(table)?,
            Block::Code(code) => self.generate_code(code),
            Block::Quote(inner) => {
                for block in inner {
                    match block {
                        Block::Heading(heading) => self.generate_heading_text(heading)?,
                        _ => self.generate_block(block, Some(style_ids::QUOTE))?,
                    }
                }
            }
            Block::Break(break_type) => self.generate_break(*break_type),
            Block::ThematicBreak => {
                self.output
                    .push_str("<w:p><w:pPr><w:pBdr><w:bottom w:val=\"single\" w:sz=\"6\" w:space=\"1\" w:color=\"auto\"/></w:pBdr></w:pPr></w:p>\n");
            }
        }
        Ok(())
    }

    /// Generate XML for a paragraph
    fn generate_paragraph(&mut self, para: &Paragraph, inherited_style: Option<&str>) -> Result<()> {
        let style = para
            .style_id
            .as_deref()
            .or(inherited_style)
            .unwrap_or(style_ids::NORMAL)
            .to_string();

        self.output.push_str("<w:p>\n");
        self.output.push_str("<w:pPr>");
        self.output
            .push_str(&format!("<w:pStyle w:val=\"{}\"/>", escape_xml(&style)));
        // Paragraphs that only hold images are centred
        let images_only = !para.inlines.is_empty()
            && para
                .inlines
                .iter()
                .all(|i| matches!(i, Inline::Image(_) | Inline::Break));
        if images_only {
            self.output.push_str(r#"<w:jc w:val="center"/>"#);
        }
        self.output.push_str("</w:pPr>\n");

        self.generate_inlines(&para.inlines, RunProps::default())?;

        self.output.push_str("</w:p>\n");
        Ok(())
    }

    /// Generate XML for a heading, wrapped in a bookmark named by its anchor
    fn generate_heading(&mut self, heading: &Heading) -> Result<()> {
        let anchor = self
            .heading_anchors
            .get(self.next_heading)
            .cloned()
            .unwrap_or_default();
        self.next_heading += 1;
        self.write_heading(heading, Some(&anchor))
    }

    /// A heading without a bookmark, as written inside a quote
    fn generate_heading_text(&mut self, heading: &Heading) -> Result<()> {
        self.write_heading(heading, None)
    }

    fn write_heading(&mut self, heading: &Heading, anchor: Option<&str>) -> Result<()> {
        let style = heading
            .style_id
            .clone()
            .unwrap_or_else(|| style_ids::heading(heading.level));

        self.output.push_str("<w:p>\n");
        self.output.push_str(&format!(
            "<w:pPr><w:pStyle w:val=\"{}\"/></w:pPr>\n",
            escape_xml(&style)
        ));

        let Some(anchor) = anchor else {
            self.generate_inlines(&heading.text, RunProps::default())?;
            self.output.push_str("</w:p>\n");
            return Ok(());
        };
        let bookmark_id = self.next_bookmark_id;
        self.next_bookmark_id += 1;
        self.output.push_str(&format!(
            "<w:bookmarkStart w:id=\"{}\" w:name=\"{}\"/>\n",
            bookmark_id,
            escape_xml(anchor)
        ));
        self.generate_inlines(&heading.text, RunProps::default())?;
        self.output
            .push_str(&format!("<w:bookmarkEnd w:id=\"{}\"/>\n", bookmark_id));

        self.output.push_str("</w:p>\n");
        Ok(())
    }

    /// Generate XML for a list; each list gets its own numbering instance
    fn generate_list(&mut self, list: &List) -> Result<()> {
        let num_id = self
            .numbering
            .add_list(list.list_type == ListType::Ordered);
        let style = list
            .style_id
            .clone()
            .unwrap_or_else(|| style_ids::LIST_PARAGRAPH.to_string());

        for item in &list.items {
            self.output.push_str("<w:p>\n");
            self.output.push_str(&format!(
                "<w:pPr><w:pStyle w:val=\"{}\"/><w:numPr><w:ilvl w:val=\"{}\"/><w:numId w:val=\"{}\"/></w:numPr></w:pPr>\n",
                escape_xml(&style),
                item.level.min(8),
                num_id
            ));
            self.generate_inlines(&item.content, RunProps::default())?;
            self.output.push_str("</w:p>\n");
        }
        Ok(())
    }

    /// Generate XML for a table
    fn generate_table(&mut self, table: &Table) -> Result<()> {
        let columns = table.column_count();
        let col_width = 9000 / columns.max(1);

        self.output.push_str("<w:tbl>\n");
        let style = table.style_id.as_deref().unwrap_or(style_ids::TABLE);
        self.output.push_str(&format!(
            "<w:tblPr><w:tblStyle w:val=\"{}\"/><w:tblW w:w=\"5000\" w:type=\"pct\"/><w:tblLook w:val=\"04A0\" w:firstRow=\"1\" w:lastRow=\"0\" w:firstColumn=\"0\" w:lastColumn=\"0\" w:noHBand=\"0\" w:noVBand=\"1\"/></w:tblPr>\n",
            escape_xml(style)
        ));

        self.output.push_str("<w:tblGrid>");
        for _ in 0..columns {
            self.output
                .push_str(&format!("<w:gridCol w:w=\"{}\"/>", col_width));
        }
        self.output.push_str("</w:tblGrid>\n");

        for row in &table.rows {
            self.output.push_str("<w:tr>\n");
            if row.is_header {
                self.output.push_str("<w:trPr><w:tblHeader/></w:trPr>\n");
            }

            let props = RunProps {
                bold: row.is_header,
                ..Default::default()
            };
            for i in 0..columns {
                self.output.push_str(&format!(
                    "<w:tc><w:tcPr><w:tcW w:w=\"{}\" w:type=\"dxa\"/></w:tcPr><w:p>",
                    col_width
                ));
                if let Some(cell) = row.cells.get(i) {
                    self.generate_inlines(&cell.content, props)?;
                }
                self.output.push_str("</w:p></w:tc>\n");
            }

            self.output.push_str("</w:tr>\n");
        }

        self.output.push_str("</w:tbl>\n");
        // Word requires a paragraph between adjacent tables
        self.output.push_str("<w:p/>\n");
        Ok(())
    }

    /// A code block is one paragraph with a line break per source line
    fn generate_code(&mut self, code: &CodeBlock) {
        let style = code.style_id.as_deref().unwrap_or(style_ids::CODE_BLOCK);
        self.output.push_str("<w:p>\n");
        self.output.push_str(&format!(
            "<w:pPr><w:pStyle w:val=\"{}\"/></w:pPr>\n",
            escape_xml(style)
        ));
        self.output.push_str("<w:r>");
        for (i, line) in code.content.split('\n').enumerate() {
            if i > 0 {
                self.output.push_str("<w:br/>");
            }
            self.stats.word_count += line.split_whitespace().count();
            self.output.push_str(&format!(
                "<w:t xml:space=\"preserve\">{}</w:t>",
                escape_xml(line)
            ));
        }
        self.output.push_str("</w:r>\n");
        self.output.push_str("</w:p>\n");
    }

    /// Generate XML for a break
    fn generate_break(&mut self, break_type: BreakType) {
        self.page_breaks += 1;
        match break_type {
            BreakType::Page => {
                self.output
                    .push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>\n");
            }
            BreakType::Section => {
                self.output.push_str(
                    "<w:p><w:pPr><w:sectPr><w:type w:val=\"nextPage\"/></w:sectPr></w:pPr></w:p>\n",
                );
            }
        }
    }

    /// Final section properties: page size, orientation and margins
    fn generate_section_properties(&mut self) {
        // A4 in twips
        let (mut width, mut height) = (11906u32, 16838u32);
        let landscape = self.options.orientation == Orientation::Landscape;
        if landscape {
            std::mem::swap(&mut width, &mut height);
        }
        let orient = if landscape {
            " w:orient=\"landscape\""
        } else {
            ""
        };
        let m = &self.options.margins;
        let twips = |mm: f32| (mm.max(0.0) * TWIPS_PER_MM).round() as u32;
        self.output.push_str(&format!(
            "<w:sectPr><w:pgSz w:w=\"{}\" w:h=\"{}\"{}/><w:pgMar w:top=\"{}\" w:right=\"{}\" w:bottom=\"{}\" w:left=\"{}\" w:header=\"720\" w:footer=\"720\" w:gutter=\"0\"/></w:sectPr>\n",
            width,
            height,
            orient,
            twips(m.top),
            twips(m.right),
            twips(m.bottom),
            twips(m.left)
        ));
    }

    fn generate_inlines(&mut self, inlines: &[Inline], props: RunProps) -> Result<()> {
        for inline in inlines {
            self.generate_inline(inline, props)?;
        }
        Ok(())
    }

    fn generate_inline(&mut self, inline: &Inline, props: RunProps) -> Result<()> {
        match inline {
            Inline::Text(text) => self.generate_text_run(text, props),
            Inline::Format(format_type, inner) => {
                self.generate_inline(inner, props.with(*format_type))?
            }
            Inline::Span(inlines) => self.generate_inlines(inlines, props)?,
            Inline::Link(link) => self.generate_link(link, props)?,
            Inline::Image(image) => self.generate_image(image)?,
            Inline::Break => self.output.push_str("<w:r><w:br/></w:r>\n"),
        }
        Ok(())
    }

    fn generate_text_run(&mut self, text: &str, props: RunProps) {
        if text.is_empty() {
            return;
        }
        self.stats.word_count += text.split_whitespace().count();
        self.output.push_str("<w:r>");
        self.output.push_str(&self.run_properties(props));
        self.output.push_str(&format!(
            "<w:t xml:space=\"preserve\">{}</w:t>",
            escape_xml(text)
        ));
        self.output.push_str("</w:r>\n");
    }

    fn run_properties(&self, props: RunProps) -> String {
        let mut xml = String::new();
        if props.hyperlink {
            xml.push_str(&format!("<w:rStyle w:val=\"{}\"/>", style_ids::HYPERLINK));
        }
        if props.code {
            let font = escape_xml(self.styles.code_block.font.as_deref().unwrap_or("Consolas"));
            xml.push_str(&format!(
                "<w:rFonts w:ascii=\"{0}\" w:hAnsi=\"{0}\" w:cs=\"{0}\"/>",
                font
            ));
        }
        if props.bold {
            xml.push_str("<w:b/>");
        }
        if props.italic {
            xml.push_str("<w:i/>");
        }
        if props.strike {
            xml.push_str("<w:strike/>");
        }
        if props.underline {
            xml.push_str("<w:u w:val=\"single\"/>");
        }
        if xml.is_empty() {
            xml
        } else {
            format!("<w:rPr>{}</w:rPr>", xml)
        }
    }

    /// Emit a hyperlink using the link's classification
    fn generate_link(&mut self, link: &Link, props: RunProps) -> Result<()> {
        let processed = match self.links.get(link.url.trim()) {
            Some(processed) => (*processed).clone(),
            None => self.resolver.resolve(&plain_text(&link.text), &link.url),
        };

        match processed.kind {
            LinkKind::External => self.stats.external_link_count += 1,
            LinkKind::Internal | LinkKind::Anchor => self.stats.internal_link_count += 1,
        }

        if !self.options.preserve_links || !processed.is_valid {
            return self.generate_inlines(&link.text, props);
        }

        let target = processed.target();
        if processed.kind == LinkKind::Anchor {
            self.output.push_str(&format!(
                "<w:hyperlink w:anchor=\"{}\" w:history=\"1\">\n",
                escape_xml(target.trim_start_matches('#'))
            ));
        } else {
            let rel_id = self.relationships.push_hyperlink(target);
            self.output.push_str(&format!(
                "<w:hyperlink r:id=\"{}\" w:history=\"1\">\n",
                escape_xml(&rel_id)
            ));
        }

        let link_props = RunProps {
            hyperlink: true,
            ..props
        };
        if link.text.is_empty() {
            self.generate_text_run(&link.url, link_props);
        } else {
            self.generate_inlines(&link.text, link_props)?;
        }
        self.output.push_str("</w:hyperlink>\n");
        Ok(())
    }

    /// Embed an image: a rendered diagram or caller supplied media
    fn generate_image(&mut self, image: &Image) -> Result<()> {
        let diagram = diagram_id_from_file_name(&image.src).and_then(|id| self.diagrams.get(id).copied());

        let (bytes, is_diagram) = match diagram {
            Some(diagram) => (diagram.image_bytes.clone(), true),
            None => match self.options.media.get(&image.src) {
                Some(bytes) => (bytes.clone(), false),
                None => {
                    self.warn(format!("Image not found: {}", image.src));
                    self.generate_text_run(&image.alt, RunProps::default());
                    return Ok(());
                }
            },
        };

        let format = match sniff_format(&bytes) {
            Some(format @ (ImageFormat::Png | ImageFormat::Jpg)) => format,
            _ => {
                self.warn(format!(
                    "Image {} is not PNG or JPEG; kept as text",
                    image.src
                ));
                self.generate_text_run(&image.alt, RunProps::default());
                return Ok(());
            }
        };

        let media = self.add_media(bytes, format, diagram.map(|d| (d.dimensions.width, d.dimensions.height)))?;
        let (width, height) = display_size(media.0, media.1);
        let rel_id = media.2;

        if is_diagram {
            self.stats.diagram_count += 1;
        } else {
            self.stats.image_count += 1;
        }

        let drawing_id = self.next_drawing_id;
        self.next_drawing_id += 1;
        self.generate_drawing_xml(drawing_id, &rel_id, &image.alt, width, height);
        Ok(())
    }

    /// Store media once per distinct content and return (width, height, rel id)
    fn add_media(
        &mut self,
        bytes: Vec<u8>,
        format: ImageFormat,
        known_size: Option<(u32, u32)>,
    ) -> Result<(u32, u32, String)> {
        let hash = format!("{:x}", Sha256::digest(&bytes));
        if let Some(part) = self.media_by_hash.get(&hash) {
            return Ok((part.width, part.height, part.rel_id.clone()));
        }

        let (mut bytes, mut format) = (bytes, format);
        if self.options.optimize_size && format == ImageFormat::Png {
            let jpeg = convert_raster(&bytes, ImageFormat::Jpg, self.options.image_quality)?;
            if jpeg.len() < bytes.len() {
                bytes = jpeg;
                format = ImageFormat::Jpg;
            }
        }

        let (width, height) = match known_size.filter(|&(w, h)| w > 0 && h > 0) {
            Some(size) => size,
            None => raster_size(&bytes).ok_or_else(|| {
                OoxmlError::PackageStructure("embedded image cannot be decoded".to_string())
            })?,
        };

        let name = format!("image{}.{}", self.media_files.len() + 1, format.extension());
        let rel_id = self.relationships.push(RelKind::Image, format!("media/{}", name));
        self.media_files.push((format!("word/media/{}", name), bytes));
        self.media_by_hash.insert(
            hash,
            MediaPart {
                rel_id: rel_id.clone(),
                width,
                height,
            },
        );
        Ok((width, height, rel_id))
    }

    fn generate_drawing_xml(&mut self, drawing_id: usize, rel_id: &str, alt: &str, width: u32, height: u32) {
        let cx = pixels_to_emu(width);
        let cy = pixels_to_emu(height);
        let name = format!("Picture {}", drawing_id);

        self.output.push_str("<w:r>\n");
        self.output.push_str("<w:drawing>\n");
        self.output.push_str(&format!(
            r#"<wp:inline distT="0" distB="0" distL="0" distR="0">
<wp:extent cx="{cx}" cy="{cy}"/>
<wp:effectExtent l="0" t="0" r="0" b="0"/>
<wp:docPr id="{id}" name="{name}" descr="{alt}"/>
<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>
<a:graphic>
<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">
<pic:pic>
<pic:nvPicPr><pic:cNvPr id="{id}" name="{name}" descr="{alt}"/><pic:cNvPicPr/></pic:nvPicPr>
<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>
<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>
</pic:pic>
</a:graphicData>
</a:graphic>
</wp:inline>
"#,
            cx = cx,
            cy = cy,
            id = drawing_id,
            name = escape_xml(&name),
            alt = escape_xml(alt),
            rel = escape_xml(rel_id)
        ));
        self.output.push_str("</w:drawing>\n");
        self.output.push_str("</w:r>\n");
    }

    fn app_properties_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>mdocx {}</Application><Pages>{}</Pages><Words>{}</Words></Properties>"#,
            env!("CARGO_PKG_VERSION"),
            self.stats.page_count,
            self.stats.word_count
        )
    }

    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Serialize a document with its diagrams and link classifications
pub fn serialize(
    doc: &Document,
    diagrams: &[ProcessedDiagram],
    links: &[ProcessedLink],
    styles: &StyleBundle,
    options: &WriteOptions,
) -> Result<Package> {
    DocxWriter::new(styles, options)
        .with_diagrams(diagrams)
        .with_links(links)
        .write(doc)
}

/// Reject trees that cannot form a valid package
fn validate(doc: &Document, diagrams: &HashMap<&str, &ProcessedDiagram>) -> Result<()> {
    fn check(blocks: &[Block], diagrams: &HashMap<&str, &ProcessedDiagram>) -> Result<()> {
        for block in blocks {
            match block {
                Block::Heading(h) if !(1..=6).contains(&h.level) => {
                    return Err(OoxmlError::PackageStructure(format!(
                        "heading level {} outside 1-6",
                        h.level
                    )));
                }
                Block::Table(t) if t.column_count() == 0 => {
                    return Err(OoxmlError::PackageStructure(
                        "table without columns".to_string(),
                    ));
                }
                Block::Paragraph(p) => {
                    for inline in &p.inlines {
                        if let Inline::Image(image) = inline {
                            let empty = diagram_id_from_file_name(&image.src)
                                .and_then(|id| diagrams.get(id))
                                .is_some_and(|d| d.image_bytes.is_empty());
                            if empty {
                                return Err(OoxmlError::PackageStructure(format!(
                                    "diagram {} has no image data",
                                    image.src
                                )));
                            }
                        }
                    }
                }
                Block::Quote(inner) => check(inner, diagrams)?,
                _ => {}
            }
        }
        Ok(())
    }
    check(&doc.blocks, diagrams)
}

/// The generated main part must parse as XML with balanced tags
fn check_well_formed(xml: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                return Err(OoxmlError::PackageStructure(format!(
                    "generated document part is not well formed: {}",
                    e
                )))
            }
        }
    }
}

fn core_properties_xml(doc: &Document) -> String {
    let meta = &doc.metadata;
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#);
    if let Some(ref title) = meta.title {
        xml.push_str(&format!("<dc:title>{}</dc:title>", escape_xml(title)));
    }
    if let Some(ref subject) = meta.subject {
        xml.push_str(&format!("<dc:subject>{}</dc:subject>", escape_xml(subject)));
    }
    if !meta.authors.is_empty() {
        xml.push_str(&format!(
            "<dc:creator>{}</dc:creator>",
            escape_xml(&meta.authors.join("; "))
        ));
    }
    if !meta.keywords.is_empty() {
        xml.push_str(&format!(
            "<cp:keywords>{}</cp:keywords>",
            escape_xml(&meta.keywords.join(", "))
        ));
    }
    if let Some(ref description) = meta.description {
        xml.push_str(&format!(
            "<dc:description>{}</dc:description>",
            escape_xml(description)
        ));
    }
    if let Some(ref created) = meta.created {
        xml.push_str(&format!(
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>"#,
            escape_xml(created)
        ));
    }
    xml.push_str("</cp:coreProperties>");
    xml
}

fn package_rels_xml(include_metadata: bool) -> String {
    let mut rels = Relationships::new();
    rels.push(RelKind::OfficeDocument, DOCUMENT_PART);
    if include_metadata {
        rels.push(RelKind::CoreProperties, CORE_PROPS_PART);
        rels.push(RelKind::ExtendedProperties, APP_PROPS_PART);
    }
    rels.to_xml()
}

fn content_types_xml(include_metadata: bool) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Default Extension="png" ContentType="image/png"/>"#);
    xml.push_str(r#"<Default Extension="jpg" ContentType="image/jpeg"/>"#);
    xml.push_str(r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>"#);
    if include_metadata {
        xml.push_str(r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
        xml.push_str(r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#);
    }
    xml.push_str("</Types>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::sample_png;
    use crate::template::{bundle, TemplateId};
    use mdocx_ast::{ListItem, TableCell, TableRow};
    use mdocx_diagrams::Dimensions;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn heading(level: u8, title: &str) -> Block {
        Block::Heading(Heading {
            level,
            text: vec![text(title)],
            style_id: None,
            anchor: None,
        })
    }

    fn write(doc: &Document, options: &WriteOptions) -> (OoxmlArchive, Package) {
        write_with(doc, &[], &[], options)
    }

    fn write_with(
        doc: &Document,
        diagrams: &[ProcessedDiagram],
        links: &[ProcessedLink],
        options: &WriteOptions,
    ) -> (OoxmlArchive, Package) {
        let styles = bundle(TemplateId::Simple);
        let package = serialize(doc, diagrams, links, &styles, options).unwrap();
        let archive = OoxmlArchive::from_bytes(&package.bytes).unwrap();
        (archive, package)
    }

    fn document_xml(archive: &OoxmlArchive) -> String {
        archive.get_string(DOCUMENT_PART).unwrap()
    }

    #[test]
    fn test_write_basic_doc() {
        let mut doc = Document::with_title("Report");
        doc.push(heading(1, "Introduction"));
        doc.push(Block::Paragraph(Paragraph::new(vec![
            text("Plain "),
            Inline::Format(FormatType::Bold, Box::new(text("bold"))),
        ])));

        let (archive, package) = write(&doc, &WriteOptions::default());
        let xml = document_xml(&archive);

        assert!(xml.contains(r#"<w:pStyle w:val="Heading1"/>"#));
        assert!(xml.contains(r#"w:name="introduction""#));
        assert!(xml.contains("<w:rPr><w:b/></w:rPr>"));
        assert!(archive.contains(STYLES_PART));
        assert!(archive.contains(NUMBERING_PART));
        assert!(archive
            .get_string(CORE_PROPS_PART)
            .unwrap()
            .contains("<dc:title>Report</dc:title>"));
        assert_eq!(package.stats.page_count, 1);
        assert!(package.warnings.is_empty());
    }

    #[test]
    fn test_toc_anchors_match_bookmarks() {
        let mut doc = Document::new();
        doc.push(heading(1, "Setup"));
        doc.push(heading(2, "Install"));
        doc.push(heading(1, "Setup"));

        let options = WriteOptions {
            toc: true,
            ..Default::default()
        };
        let (archive, package) = write(&doc, &options);
        let xml = document_xml(&archive);

        for anchor in ["setup", "install", "setup-1"] {
            assert!(xml.contains(&format!(r#"<w:hyperlink w:anchor="{}""#, anchor)));
            assert!(xml.contains(&format!(r#"w:name="{}""#, anchor)));
        }
        assert!(xml.contains(r#"<w:pStyle w:val="TOC2"/>"#));
        // TOC is followed by a page break
        assert_eq!(package.stats.page_count, 2);
    }

    #[test]
    fn test_quoted_heading_gets_no_bookmark() {
        let output = mdocx_core::build("# Intro\n\n> # Intro\n", None).unwrap();
        let options = WriteOptions {
            toc: true,
            ..Default::default()
        };
        let (archive, _) = write_with(&output.document, &[], &output.links, &options);
        let xml = document_xml(&archive);

        assert_eq!(xml.matches(r#"w:name="intro""#).count(), 1);
        assert_eq!(xml.matches(r#"<w:hyperlink w:anchor="intro""#).count(), 1);
        assert_eq!(xml.matches("<w:bookmarkStart").count(), 1);
        assert_eq!(output.sections.len(), 1);
        assert_eq!(output.toc.flatten().len(), 1);
    }

    #[test]
    fn test_heading_anchor_from_tree_is_kept() {
        let mut doc = Document::new();
        doc.push(Block::Heading(Heading {
            level: 2,
            text: vec![text("Results")],
            style_id: None,
            anchor: Some("results-1".to_string()),
        }));
        let options = WriteOptions {
            toc: true,
            ..Default::default()
        };
        let (archive, _) = write(&doc, &options);
        let xml = document_xml(&archive);
        assert!(xml.contains(r#"w:anchor="results-1""#));
        assert!(xml.contains(r#"w:name="results-1""#));
    }

    #[test]
    fn test_links_use_classification() {
        let resolver = LinkResolver::new();
        let links = vec![
            resolver.resolve("site", "https://example.com"),
            resolver.resolve("intro", "#Intro"),
            resolver.resolve("bad", "http.example.com"),
        ];
        let link = |label: &str, url: &str| {
            Inline::Link(Link {
                url: url.to_string(),
                text: vec![text(label)],
            })
        };
        let mut doc = Document::new();
        doc.push(Block::Paragraph(Paragraph::new(vec![
            link("site", "https://example.com"),
            link("intro", "#Intro"),
            link("bad", "http.example.com"),
        ])));

        let (archive, package) = write_with(&doc, &[], &links, &WriteOptions::default());
        let xml = document_xml(&archive);
        let rels = Relationships::parse(archive.document_rels_xml().unwrap()).unwrap();

        let external: Vec<_> = rels.iter().filter(|r| r.external).collect();
        assert_eq!(external.len(), 1);
        assert_eq!(external[0].target, "https://example.com");
        assert!(xml.contains(&format!(r#"<w:hyperlink r:id="{}""#, external[0].id)));
        assert!(xml.contains(r#"<w:hyperlink w:anchor="intro""#));
        // Invalid link degrades to text
        assert!(xml.contains(">bad</w:t>"));
        assert!(!xml.contains("http.example.com"));
        assert_eq!(package.stats.external_link_count, 2);
        assert_eq!(package.stats.internal_link_count, 1);
    }

    #[test]
    fn test_links_not_preserved() {
        let mut doc = Document::new();
        doc.push(Block::Paragraph(Paragraph::new(vec![Inline::Link(Link {
            url: "https://example.com".to_string(),
            text: vec![text("site")],
        })])));
        let options = WriteOptions {
            preserve_links: false,
            ..Default::default()
        };
        let (archive, _) = write(&doc, &options);
        assert!(!document_xml(&archive).contains("w:hyperlink"));
    }

    #[test]
    fn test_diagram_embedded_with_relationship() {
        let png = sample_png(1200, 300);
        let diagram = ProcessedDiagram {
            id: "d1".to_string(),
            source_code: "graph TD; A-->B".to_string(),
            image_bytes: png,
            format: ImageFormat::Png,
            dimensions: Dimensions {
                width: 1200,
                height: 300,
            },
        };
        let mut doc = Document::new();
        for _ in 0..2 {
            doc.push(Block::Paragraph(Paragraph::new(vec![Inline::Image(Image {
                src: diagram.file_name(),
                alt: "Mermaid Diagram d1".to_string(),
            })])));
        }

        let (archive, package) =
            write_with(&doc, std::slice::from_ref(&diagram), &[], &WriteOptions::default());
        let xml = document_xml(&archive);
        let rels = Relationships::parse(archive.document_rels_xml().unwrap()).unwrap();

        assert!(archive.contains("word/media/image1.png"));
        assert!(!archive.contains("word/media/image2.png"));
        let rel_id = &rels.find(&RelKind::Image).unwrap().id;
        assert_eq!(xml.matches(&format!(r#"r:embed="{}""#, rel_id)).count(), 2);
        // 576 px wide, 144 px high
        assert!(xml.contains(&format!(r#"cx="{}" cy="{}""#, pixels_to_emu(576), pixels_to_emu(144))));
        assert_eq!(package.stats.diagram_count, 2);
        assert_eq!(package.stats.image_count, 0);
    }

    #[test]
    fn test_missing_image_is_warning() {
        let mut doc = Document::new();
        doc.push(Block::Paragraph(Paragraph::new(vec![Inline::Image(Image {
            src: "photo.png".to_string(),
            alt: "A photo".to_string(),
        })])));
        let (archive, package) = write(&doc, &WriteOptions::default());
        assert_eq!(package.warnings.len(), 1);
        assert!(document_xml(&archive).contains("A photo"));

        let options = WriteOptions::default().with_media("photo.png", sample_png(10, 10));
        let (archive, package) = write(&doc, &options);
        assert!(package.warnings.is_empty());
        assert_eq!(package.stats.image_count, 1);
        assert!(document_xml(&archive).contains("<w:drawing>"));
    }

    #[test]
    fn test_lists_get_numbering() {
        let item = |s: &str, level| ListItem {
            content: vec![text(s)],
            level,
        };
        let mut doc = Document::new();
        doc.push(Block::List(List {
            list_type: ListType::Ordered,
            items: vec![item("one", 0), item("nested", 1)],
            style_id: None,
        }));
        let (archive, _) = write(&doc, &WriteOptions::default());
        let xml = document_xml(&archive);
        assert!(xml.contains(r#"<w:ilvl w:val="1"/><w:numId w:val="1"/>"#));
        assert!(archive
            .get_string(NUMBERING_PART)
            .unwrap()
            .contains(r#"<w:numFmt w:val="decimal"/>"#));
    }

    #[test]
    fn test_table_and_code() {
        let cell = |s: &str| TableCell {
            content: vec![text(s)],
        };
        let mut doc = Document::new();
        doc.push(Block::Table(Table {
            rows: vec![
                TableRow {
                    cells: vec![cell("A"), cell("B")],
                    is_header: true,
                },
                TableRow {
                    cells: vec![cell("1")],
                    is_header: false,
                },
            ],
            style_id: None,
        }));
        doc.push(Block::Code(CodeBlock {
            content: "fn main() {\n    x < y\n}".to_string(),
            language: Some("rust".to_string()),
            style_id: None,
        }));

        let (archive, _) = write(&doc, &WriteOptions::default());
        let xml = document_xml(&archive);
        assert!(xml.contains("<w:tblHeader/>"));
        assert_eq!(xml.matches("<w:tc>").count(), 4);
        assert!(xml.contains(r#"<w:pStyle w:val="CodeBlock"/>"#));
        assert!(xml.contains("    x &lt; y"));
        assert_eq!(xml.matches("<w:br/>").count(), 2);
    }

    #[test]
    fn test_landscape_and_margins() {
        let options = WriteOptions {
            orientation: Orientation::Landscape,
            margins: Margins {
                top: 10.0,
                ..Default::default()
            },
            include_metadata: false,
            ..Default::default()
        };
        let (archive, _) = write(&Document::new(), &options);
        let xml = document_xml(&archive);
        assert!(xml.contains(r#"<w:pgSz w:w="16838" w:h="11906" w:orient="landscape"/>"#));
        assert!(xml.contains(r#"w:top="567""#));
        assert!(!archive.contains(CORE_PROPS_PART));
    }

    #[test]
    fn test_structural_errors_are_fatal() {
        let styles = bundle(TemplateId::Simple);
        let options = WriteOptions::default();

        let mut doc = Document::new();
        doc.push(heading(7, "Too deep"));
        let err = serialize(&doc, &[], &[], &styles, &options).unwrap_err();
        assert!(matches!(err, OoxmlError::PackageStructure(_)));

        let mut doc = Document::new();
        doc.push(Block::Table(Table::default()));
        let err = serialize(&doc, &[], &[], &styles, &options).unwrap_err();
        assert!(matches!(err, OoxmlError::PackageStructure(_)));
    }
}
