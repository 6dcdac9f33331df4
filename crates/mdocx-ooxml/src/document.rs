//! Document content parsing (word/document.xml)
//!
//! Reads the main document part into a thin model that mirrors the XML:
//! paragraphs with their style, numbering and children, tables of cell
//! paragraphs, and markers for page and section breaks. Mapping that
//! model onto the structural tree happens in [`crate::extract`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::xml::{get_attr, get_attr_with_ns, is_off};

/// A parsed Word document
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Document body blocks
    pub blocks: Vec<Block>,
}

/// Block-level elements
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// A paragraph with its content and style
#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    /// Style ID (references styles.xml)
    pub style_id: Option<String>,
    pub children: Vec<ParagraphChild>,
    /// Numbering info for list items
    pub numbering: Option<NumberingRef>,
    /// Contains `<w:br w:type="page"/>`
    pub page_break: bool,
    /// Carries its own `<w:sectPr>`
    pub section_break: bool,
    /// Has a bottom border and no text: a horizontal rule
    pub bottom_border: bool,
}

/// Child elements of a paragraph
#[derive(Debug, Clone)]
pub enum ParagraphChild {
    Run(Run),
    /// Line break inside the paragraph
    Break,
    Hyperlink(Hyperlink),
    Image(ImageRef),
    /// Bookmark anchor name
    Bookmark(String),
}

/// A hyperlink with its target and content
#[derive(Debug, Clone, Default)]
pub struct Hyperlink {
    /// Relationship ID for external URLs (r:id)
    pub id: Option<String>,
    /// Internal anchor name (w:anchor)
    pub anchor: Option<String>,
    pub runs: Vec<Run>,
}

/// A text run with formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    /// Set in a monospace font
    pub monospace: bool,
}

/// Reference to a numbering definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberingRef {
    pub num_id: String,
    /// Indent level (0-based)
    pub ilvl: u8,
}

/// An inline drawing that embeds an image part
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    /// Relationship ID of the image part (r:embed)
    pub rel_id: String,
    /// Alt text (docPr descr)
    pub alt: Option<String>,
    pub width_emu: Option<i64>,
    pub height_emu: Option<i64>,
}

/// A table
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub style_id: Option<String>,
    pub rows: Vec<TableRow>,
}

/// A table row
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    /// Repeats as a header row (`w:tblHeader`)
    pub is_header: bool,
}

/// A table cell
#[derive(Debug, Clone, Default)]
pub struct TableCell {
    pub paragraphs: Vec<Paragraph>,
}

impl Document {
    /// Parse a document from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        // Whitespace inside runs is content
        reader.config_mut().trim_text(false);

        let mut parser = DocumentParser::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => parser.open(e),
                Ok(Event::Empty(ref e)) => {
                    parser.open(e);
                    parser.close(e.local_name().as_ref());
                }
                Ok(Event::End(ref e)) => parser.close(e.local_name().as_ref()),
                Ok(Event::Text(ref e)) => {
                    if parser.in_text {
                        let text = e.unescape()?;
                        parser.text(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(Document {
            blocks: parser.blocks,
        })
    }

    /// All paragraphs, including those inside tables
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().flat_map(|block| match block {
            Block::Paragraph(p) => vec![p],
            Block::Table(t) => t
                .rows
                .iter()
                .flat_map(|r| r.cells.iter())
                .flat_map(|c| c.paragraphs.iter())
                .collect(),
        })
    }
}

impl Paragraph {
    /// Plain text of this paragraph; line breaks become `\n`
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                ParagraphChild::Run(run) => out.push_str(&run.text),
                ParagraphChild::Break => out.push('\n'),
                ParagraphChild::Hyperlink(link) => {
                    link.runs.iter().for_each(|r| out.push_str(&r.text))
                }
                ParagraphChild::Image(img) => out.push_str(img.alt.as_deref().unwrap_or_default()),
                ParagraphChild::Bookmark(_) => {}
            }
        }
        out
    }

    /// No visible text and no images
    pub fn is_empty(&self) -> bool {
        self.children.iter().all(|child| match child {
            ParagraphChild::Run(run) => run.text.trim().is_empty(),
            ParagraphChild::Hyperlink(link) => link.runs.iter().all(|r| r.text.trim().is_empty()),
            ParagraphChild::Image(_) => false,
            ParagraphChild::Break | ParagraphChild::Bookmark(_) => true,
        })
    }

    /// Bookmark names in this paragraph
    pub fn bookmarks(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|child| match child {
            ParagraphChild::Bookmark(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// Event-driven state for one document part
#[derive(Default)]
struct DocumentParser {
    blocks: Vec<Block>,
    in_body: bool,
    in_text: bool,
    in_border: bool,
    para: Option<Paragraph>,
    run: Option<Run>,
    hyperlink: Option<Hyperlink>,
    image: Option<ImageBuilder>,
    /// Open tables, innermost last
    tables: Vec<TableBuilder>,
}

impl DocumentParser {
    fn open(&mut self, e: &BytesStart) {
        let name = e.local_name();
        match name.as_ref() {
            b"body" => self.in_body = true,
            b"p" if self.in_body => self.para = Some(Paragraph::default()),
            b"pStyle" => {
                if let Some(ref mut para) = self.para {
                    para.style_id = get_attr(e, b"w:val");
                }
            }
            b"numId" | b"ilvl" => {
                if let Some(ref mut para) = self.para {
                    let numbering = para.numbering.get_or_insert_with(NumberingRef::default);
                    let val = get_attr(e, b"w:val").unwrap_or_default();
                    if name.as_ref() == b"numId" {
                        numbering.num_id = val;
                    } else {
                        numbering.ilvl = val.parse().unwrap_or(0);
                    }
                }
            }
            b"pBdr" => self.in_border = true,
            b"bottom" if self.in_border => {
                if let Some(ref mut para) = self.para {
                    para.bottom_border = !is_off(e) && get_attr(e, b"w:val").as_deref() != Some("nil");
                }
            }
            b"sectPr" => {
                if let Some(ref mut para) = self.para {
                    para.section_break = true;
                }
            }
            b"r" if self.para.is_some() => self.run = Some(Run::default()),
            b"b" | b"i" | b"u" | b"strike" | b"rFonts" => {
                if let Some(ref mut run) = self.run {
                    match name.as_ref() {
                        b"b" => run.bold = !is_off(e),
                        b"i" => run.italic = !is_off(e),
                        b"u" => run.underline = !is_off(e),
                        b"strike" => run.strike = !is_off(e),
                        _ => {
                            if let Some(font) = get_attr(e, b"w:ascii") {
                                run.monospace = is_monospace_font(&font);
                            }
                        }
                    }
                }
            }
            b"t" if self.run.is_some() => self.in_text = true,
            b"tab" if self.run.is_some() => self.text("\t"),
            b"br" => self.line_break(get_attr(e, b"w:type").as_deref()),
            b"hyperlink" if self.para.is_some() => {
                self.hyperlink = Some(Hyperlink {
                    id: get_attr_with_ns(e, b"r:id"),
                    anchor: get_attr_with_ns(e, b"w:anchor"),
                    runs: Vec::new(),
                });
            }
            b"bookmarkStart" => {
                if let (Some(para), Some(name)) = (self.para.as_mut(), get_attr(e, b"w:name")) {
                    // _GoBack, _Hlk* and similar are Word internals
                    if !name.starts_with('_') || name.starts_with("_Toc") {
                        para.children.push(ParagraphChild::Bookmark(name));
                    }
                }
            }
            b"drawing" if self.para.is_some() => self.image = Some(ImageBuilder::default()),
            b"extent" => {
                if let Some(ref mut image) = self.image {
                    image.width_emu = get_attr(e, b"cx").and_then(|v| v.parse().ok());
                    image.height_emu = get_attr(e, b"cy").and_then(|v| v.parse().ok());
                }
            }
            b"docPr" => {
                if let Some(ref mut image) = self.image {
                    image.alt = get_attr(e, b"descr").filter(|d| !d.is_empty());
                }
            }
            b"blip" => {
                if let Some(ref mut image) = self.image {
                    image.rel_id = get_attr_with_ns(e, b"r:embed");
                }
            }
            b"tbl" if self.in_body => self.tables.push(TableBuilder::default()),
            b"tblStyle" => {
                if let Some(table) = self.tables.last_mut() {
                    table.table.style_id = get_attr(e, b"w:val");
                }
            }
            b"tr" => {
                if let Some(table) = self.tables.last_mut() {
                    table.row = Some(TableRow::default());
                }
            }
            b"tblHeader" => {
                if let Some(row) = self.tables.last_mut().and_then(|t| t.row.as_mut()) {
                    row.is_header = !is_off(e);
                }
            }
            b"tc" => {
                if let Some(table) = self.tables.last_mut() {
                    table.cell = Some(TableCell::default());
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"body" => self.in_body = false,
            b"t" => self.in_text = false,
            b"pBdr" => self.in_border = false,
            b"r" => {
                if let Some(run) = self.run.take() {
                    self.push_run(run);
                }
            }
            b"hyperlink" => {
                if let (Some(link), Some(para)) = (self.hyperlink.take(), self.para.as_mut()) {
                    para.children.push(ParagraphChild::Hyperlink(link));
                }
            }
            b"drawing" => {
                let image = self.image.take().and_then(ImageBuilder::build);
                if let (Some(image), Some(para)) = (image, self.para.as_mut()) {
                    para.children.push(ParagraphChild::Image(image));
                }
            }
            b"p" => {
                if let Some(para) = self.para.take() {
                    match self.tables.last_mut().and_then(|t| t.cell.as_mut()) {
                        Some(cell) => cell.paragraphs.push(para),
                        None => self.blocks.push(Block::Paragraph(para)),
                    }
                }
            }
            b"tc" => {
                if let Some(table) = self.tables.last_mut() {
                    if let (Some(cell), Some(row)) = (table.cell.take(), table.row.as_mut()) {
                        row.cells.push(cell);
                    }
                }
            }
            b"tr" => {
                if let Some(table) = self.tables.last_mut() {
                    if let Some(row) = table.row.take() {
                        table.table.rows.push(row);
                    }
                }
            }
            b"tbl" => {
                if let Some(done) = self.tables.pop() {
                    match self.tables.last_mut().and_then(|t| t.cell.as_mut()) {
                        // Nested tables flatten into the enclosing cell
                        Some(cell) => cell.paragraphs.extend(
                            done.table
                                .rows
                                .into_iter()
                                .flat_map(|r| r.cells)
                                .flat_map(|c| c.paragraphs),
                        ),
                        None => self.blocks.push(Block::Table(done.table)),
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(ref mut run) = self.run {
            run.text.push_str(text);
        }
    }

    fn line_break(&mut self, break_type: Option<&str>) {
        if break_type == Some("page") {
            if let Some(ref mut para) = self.para {
                para.page_break = true;
            }
            return;
        }
        // Split the run so the break lands between its halves
        let Some(ref mut run) = self.run else {
            return;
        };
        let before = Run {
            text: std::mem::take(&mut run.text),
            ..run.clone()
        };
        self.push_run(before);
        if let Some(ref mut para) = self.para {
            para.children.push(ParagraphChild::Break);
        }
    }

    fn push_run(&mut self, run: Run) {
        if run.text.is_empty() {
            return;
        }
        if let Some(ref mut link) = self.hyperlink {
            link.runs.push(run);
        } else if let Some(ref mut para) = self.para {
            para.children.push(ParagraphChild::Run(run));
        }
    }
}

#[derive(Default)]
struct TableBuilder {
    table: Table,
    row: Option<TableRow>,
    cell: Option<TableCell>,
}

#[derive(Default)]
struct ImageBuilder {
    rel_id: Option<String>,
    alt: Option<String>,
    width_emu: Option<i64>,
    height_emu: Option<i64>,
}

impl ImageBuilder {
    /// The relationship id is required to find the image part
    fn build(self) -> Option<ImageRef> {
        Some(ImageRef {
            rel_id: self.rel_id?,
            alt: self.alt,
            width_emu: self.width_emu,
            height_emu: self.height_emu,
        })
    }
}

pub(crate) fn is_monospace_font(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("mono")
        || lower.contains("courier")
        || lower.contains("consolas")
        || lower.contains("menlo")
        || lower.contains("cascadia")
        || lower.contains("source code")
}
