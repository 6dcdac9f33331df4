//! Markdown Generator
//!
//! This module converts a `mdocx_ast::Document` back into markdown text.
//!
//! # Example
//!
//! ```
//! use mdocx_ast::{Document, Block, Heading, Inline};
//! use mdocx_core::generate;
//!
//! let mut doc = Document::new();
//! doc.push(Block::Heading(Heading {
//!     level: 1,
//!     text: vec![Inline::Text("My Title".to_string())],
//!     style_id: None,
//!     anchor: None,
//! }));
//!
//! let markdown = generate(&doc);
//! assert!(markdown.contains("# My Title"));
//! ```

use std::fmt::Write;

use mdocx_ast::{
    Block, BreakType, CodeBlock, Document, DocumentMeta, FormatType, Heading, Inline, List,
    ListType, Paragraph, Table,
};

use crate::parser::PAGE_BREAK_MARKER;

/// Markdown generator configuration
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Whether to emit front matter for document metadata
    pub include_front_matter: bool,
}

/// Markdown generator
pub struct MarkdownGenerator {
    config: GeneratorConfig,
    output: String,
}

impl Default for MarkdownGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownGenerator {
    /// Create a new generator with default configuration
    pub fn new() -> Self {
        Self {
            config: GeneratorConfig::default(),
            output: String::new(),
        }
    }

    /// Create a generator with custom configuration
    pub fn with_config(config: GeneratorConfig) -> Self {
        Self {
            config,
            output: String::new(),
        }
    }

    /// Generate markdown from a document
    pub fn generate(&mut self, doc: &Document) -> String {
        self.output.clear();

        if self.config.include_front_matter && !doc.metadata.is_empty() {
            self.generate_front_matter(&doc.metadata);
        }

        for (i, block) in doc.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(self.output).unwrap();
            }
            self.generate_block(block);
        }

        let mut out = self.output.trim_end().to_string();
        out.push('\n');
        out
    }

    fn generate_front_matter(&mut self, meta: &DocumentMeta) {
        writeln!(self.output, "---").unwrap();
        if let Some(ref title) = meta.title {
            writeln!(self.output, "title: {}", title).unwrap();
        }
        if !meta.authors.is_empty() {
            writeln!(self.output, "author: {}", meta.authors.join(", ")).unwrap();
        }
        if let Some(ref subject) = meta.subject {
            writeln!(self.output, "subject: {}", subject).unwrap();
        }
        if let Some(ref description) = meta.description {
            writeln!(self.output, "description: {}", description).unwrap();
        }
        if !meta.keywords.is_empty() {
            writeln!(self.output, "keywords: {}", meta.keywords.join(", ")).unwrap();
        }
        if let Some(ref created) = meta.created {
            writeln!(self.output, "date: {}", created).unwrap();
        }
        for (key, value) in &meta.attributes {
            writeln!(self.output, "{}: {}", key, value).unwrap();
        }
        writeln!(self.output, "---").unwrap();
        writeln!(self.output).unwrap();
    }

    /// Generate a single block
    fn generate_block(&mut self, block: &Block) {
        match block {
            Block::Heading(h) => self.generate_heading(h),
            Block::Paragraph(p) => self.generate_paragraph(p),
            Block::List(l) => self.generate_list(l),
            Block::Table(t) => self.generate_table(t),
            Block::Code(c) => self.generate_code(c),
            Block::Quote(blocks) => self.generate_quote(blocks),
            Block::Break(b) => self.generate_break(b),
            Block::ThematicBreak => writeln!(self.output, "---").unwrap(),
        }
    }

    fn generate_heading(&mut self, heading: &Heading) {
        let level = heading.level.clamp(1, 6) as usize;
        write!(self.output, "{} ", "#".repeat(level)).unwrap();
        self.generate_inlines(&heading.text);
        writeln!(self.output).unwrap();
    }

    fn generate_paragraph(&mut self, para: &Paragraph) {
        let text = self.inline_markup(&para.inlines);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                writeln!(self.output).unwrap();
            }
            write!(self.output, "{}", escape_line_start(line)).unwrap();
        }
        writeln!(self.output).unwrap();
    }

    fn generate_inlines(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            self.generate_inline(inline);
        }
    }

    /// Generate inline content
    fn generate_inline(&mut self, inline: &Inline) {
        match inline {
            Inline::Text(text) => write!(self.output, "{}", escape_text(text)).unwrap(),
            // Code span content is literal
            Inline::Format(FormatType::Code, inner) => {
                write!(self.output, "`{}`", inner.plain_text()).unwrap();
            }
            Inline::Format(format_type, inner) => {
                let marker = match format_type {
                    FormatType::Bold => "**",
                    FormatType::Italic => "*",
                    FormatType::Underline => "__",
                    FormatType::Strikethrough => "~~",
                    FormatType::Code => "`",
                };
                write!(self.output, "{}", marker).unwrap();
                self.generate_inline(inner);
                write!(self.output, "{}", marker).unwrap();
            }
            Inline::Span(inlines) => self.generate_inlines(inlines),
            Inline::Link(link) => {
                write!(self.output, "[").unwrap();
                self.generate_inlines(&link.text);
                write!(self.output, "]({})", link.url).unwrap();
            }
            Inline::Image(image) => {
                write!(self.output, "![{}]({})", image.alt, image.src).unwrap();
            }
            Inline::Break => writeln!(self.output, "  ").unwrap(),
        }
    }

    fn generate_list(&mut self, list: &List) {
        let mut counters = [0usize; 9];
        for item in &list.items {
            let level = (item.level as usize).min(counters.len() - 1);
            let indent = "  ".repeat(level);
            match list.list_type {
                ListType::Unordered => write!(self.output, "{}- ", indent).unwrap(),
                ListType::Ordered => {
                    counters[level] += 1;
                    counters[level + 1..].iter_mut().for_each(|c| *c = 0);
                    write!(self.output, "{}{}. ", indent, counters[level]).unwrap();
                }
            }
            self.generate_inlines(&item.content);
            writeln!(self.output).unwrap();
        }
    }

    fn generate_table(&mut self, table: &Table) {
        let columns = table.column_count();
        if columns == 0 {
            return;
        }

        for (i, row) in table.rows.iter().enumerate() {
            write!(self.output, "|").unwrap();
            for col in 0..columns {
                let cell = row.cells.get(col).map(|c| self.inline_markup(&c.content));
                write!(
                    self.output,
                    " {} |",
                    cell.unwrap_or_default().replace('|', "\\|")
                )
                .unwrap();
            }
            writeln!(self.output).unwrap();

            if i == 0 {
                writeln!(self.output, "|{}", " --- |".repeat(columns)).unwrap();
            }
        }
    }

    fn generate_code(&mut self, code: &CodeBlock) {
        let fence = if code.content.contains("```") {
            "~~~"
        } else {
            "```"
        };
        writeln!(
            self.output,
            "{}{}",
            fence,
            code.language.as_deref().unwrap_or("")
        )
        .unwrap();
        if !code.content.is_empty() {
            writeln!(self.output, "{}", code.content.trim_end_matches('\n')).unwrap();
        }
        writeln!(self.output, "{}", fence).unwrap();
    }

    fn generate_quote(&mut self, blocks: &[Block]) {
        let mut inner = MarkdownGenerator::new();
        let body = inner.generate(&Document {
            metadata: DocumentMeta::default(),
            blocks: blocks.to_vec(),
        });
        for line in body.lines() {
            if line.is_empty() {
                writeln!(self.output, ">").unwrap();
            } else {
                writeln!(self.output, "> {}", line).unwrap();
            }
        }
    }

    fn generate_break(&mut self, break_type: &BreakType) {
        match break_type {
            BreakType::Page => writeln!(self.output, "{}", PAGE_BREAK_MARKER).unwrap(),
            BreakType::Section => writeln!(self.output, "---").unwrap(),
        }
    }

    /// Render inlines to a standalone string
    fn inline_markup(&self, inlines: &[Inline]) -> String {
        let mut inner = MarkdownGenerator::new();
        inner.generate_inlines(inlines);
        inner.output
    }
}

/// Backslash-escape characters the inline scanner would read as markup
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let live = match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '~' | '<' => true,
            // `!` only opens an image when a link follows the text node
            '!' => chars.peek().is_none(),
            _ => false,
        };
        if live {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a marker at the start of a paragraph line that would otherwise
/// open a heading, list, quote or table
fn escape_line_start(line: &str) -> String {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    if body.starts_with(['#', '>', '-', '+', '|']) {
        return format!("{indent}\\{body}");
    }
    let digits = body.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && body[digits..].starts_with(['.', ')']) {
        return format!("{indent}{}\\{}", &body[..digits], &body[digits..]);
    }
    line.to_string()
}

/// Generate markdown from a document using default configuration
pub fn generate(doc: &Document) -> String {
    MarkdownGenerator::new().generate(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdocx_ast::{Link, ListItem, TableCell, TableRow};

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn test_generate_heading_and_paragraph() {
        let mut doc = Document::new();
        doc.push(Block::Heading(Heading {
            level: 2,
            text: vec![text("Scope")],
            style_id: None,
            anchor: Some("scope".to_string()),
        }));
        doc.push(Block::Paragraph(Paragraph::new(vec![
            text("See "),
            Inline::Format(FormatType::Bold, Box::new(text("this"))),
            text("."),
        ])));
        assert_eq!(generate(&doc), "## Scope\n\nSee **this**.\n");
    }

    #[test]
    fn test_generate_link_and_image() {
        let mut doc = Document::new();
        doc.push(Block::Paragraph(Paragraph::new(vec![
            Inline::Link(Link {
                url: "https://example.com".to_string(),
                text: vec![text("site")],
            }),
            text(" "),
            Inline::Image(mdocx_ast::Image {
                src: "media/image1.png".to_string(),
                alt: "chart".to_string(),
            }),
        ])));
        assert_eq!(
            generate(&doc),
            "[site](https://example.com) ![chart](media/image1.png)\n"
        );
    }

    #[test]
    fn test_generate_ordered_list_numbering() {
        let mut doc = Document::new();
        doc.push(Block::List(List {
            list_type: ListType::Ordered,
            items: vec![
                ListItem { content: vec![text("a")], level: 0 },
                ListItem { content: vec![text("a1")], level: 1 },
                ListItem { content: vec![text("b")], level: 0 },
            ],
            style_id: None,
        }));
        assert_eq!(generate(&doc), "1. a\n  1. a1\n2. b\n");
    }

    #[test]
    fn test_generate_table() {
        let mut doc = Document::new();
        doc.push(Block::Table(Table {
            rows: vec![
                TableRow {
                    cells: vec![TableCell { content: vec![text("A")] }, TableCell { content: vec![text("B")] }],
                    is_header: true,
                },
                TableRow {
                    cells: vec![TableCell { content: vec![text("1|2")] }],
                    is_header: false,
                },
            ],
            style_id: None,
        }));
        assert_eq!(generate(&doc), "| A | B |\n| --- | --- |\n| 1\\|2 |  |\n");
    }

    #[test]
    fn test_generate_code_and_quote() {
        let mut doc = Document::new();
        doc.push(Block::Code(CodeBlock {
            content: "fn main() {}".to_string(),
            language: Some("rust".to_string()),
            style_id: None,
        }));
        doc.push(Block::Quote(vec![Block::Paragraph(Paragraph::new(vec![text("quoted")]))]));
        assert_eq!(generate(&doc), "```rust\nfn main() {}\n```\n\n> quoted\n");
    }

    #[test]
    fn test_front_matter_only_when_enabled() {
        let doc = Document::with_title("Report");
        assert!(!generate(&doc).contains("title:"));

        let mut generator = MarkdownGenerator::with_config(GeneratorConfig {
            include_front_matter: true,
        });
        assert!(generator.generate(&doc).starts_with("---\ntitle: Report\n---\n"));
    }

    #[test]
    fn test_markup_characters_in_text_are_escaped() {
        let mut doc = Document::new();
        for line in ["# Not a heading", "1. Not a list", "- dash", "> not quoted", "| pipe"] {
            doc.push(Block::Paragraph(Paragraph::new(vec![text(line)])));
        }
        doc.push(Block::Paragraph(Paragraph::new(vec![
            text("snake_case and *stars* with "),
            Inline::Format(FormatType::Code, Box::new(text("a_b*c"))),
        ])));

        let markdown = generate(&doc);
        assert!(markdown.starts_with("\\# Not a heading\n\n1\\. Not a list\n"));
        assert!(markdown.contains("snake\\_case and \\*stars\\* with `a_b*c`"));

        let reparsed = crate::parse(&markdown).unwrap();
        assert_eq!(reparsed.blocks, doc.blocks);
    }
}
