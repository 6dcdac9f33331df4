//! Markdown Parser
//!
//! This module implements a line-based state machine parser that converts
//! markdown text into the `mdocx_ast::Document` structure.
//!
//! # Supported Syntax
//!
//! - Front matter (`---` delimited `key: value` lines) for metadata
//! - ATX headings (`#` through `######`)
//! - Paragraphs, with hard breaks from trailing double spaces or `\`
//! - Unordered (`-`, `*`, `+`) and ordered (`1.`, `1)`) lists, nested by indent
//! - Fenced code blocks (backticks or tildes) with a language tag
//! - Pipe tables with a separator row
//! - Block quotes, thematic breaks and page break markers
//!
//! This is not a complete CommonMark implementation. Unknown constructs
//! are treated as paragraph text.

use anyhow::Result;

use mdocx_ast::{
    Block, BreakType, CodeBlock, Document, DocumentMeta, Heading, Inline, List, ListItem,
    ListType, Paragraph, Table, TableCell, TableRow,
};

use crate::inline::{extend_inlines, parse_inlines, push_text};
use crate::slug::AnchorAllocator;

/// Marker line emitted for page breaks
pub const PAGE_BREAK_MARKER: &str = r#"<div style="page-break-after: always"></div>"#;

/// A heading found while parsing, with its source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingLine {
    /// 0-based line index in the input
    pub line: usize,
    /// Heading level (1-6)
    pub level: u8,
    /// Heading text as written
    pub title: String,
    /// Allocated anchor
    pub anchor: String,
}

/// Parser state machine states
#[derive(Debug)]
enum ParserState {
    /// At the root level, not inside any block
    Root,
    /// Inside a paragraph, accumulating lines
    Paragraph(Vec<String>),
    /// Inside a list: type and raw items as (level, text)
    List(ListType, Vec<(u8, String)>),
    /// Inside a fenced code block
    Code {
        fence: String,
        language: Option<String>,
        lines: Vec<String>,
    },
    /// Inside a table: rows of raw cell text, first row is the header
    Table(Vec<Vec<String>>),
    /// Inside a block quote, accumulating unquoted lines
    Quote(Vec<String>),
}

/// Markdown parser
pub struct Parser {
    state: ParserState,
    blocks: Vec<Block>,
    anchors: AnchorAllocator,
    outline: Vec<HeadingLine>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser
    pub fn new() -> Self {
        Self {
            state: ParserState::Root,
            blocks: Vec::new(),
            anchors: AnchorAllocator::new(),
            outline: Vec::new(),
        }
    }

    /// Parse markdown text into a Document
    pub fn parse(self, text: &str) -> Result<Document> {
        self.parse_with_outline(text).map(|(doc, _)| doc)
    }

    /// Parse markdown text, also returning every heading with its line
    pub fn parse_with_outline(mut self, text: &str) -> Result<(Document, Vec<HeadingLine>)> {
        let lines: Vec<&str> = text.lines().collect();
        let (metadata, body_start) = parse_front_matter(&lines);

        let mut i = body_start;
        while i < lines.len() {
            i += self.handle_line(&lines, i);
        }
        self.flush_state();

        let doc = Document {
            metadata,
            blocks: self.blocks,
        };
        Ok((doc, self.outline))
    }

    /// Process the line at `i`; returns how many lines were consumed
    fn handle_line(&mut self, lines: &[&str], i: usize) -> usize {
        let line = lines[i];

        // Code blocks swallow everything up to the closing fence
        if let ParserState::Code { fence, lines: code, .. } = &mut self.state {
            if is_closing_fence(line, fence) {
                self.flush_state();
            } else {
                code.push(line.to_string());
            }
            return 1;
        }

        let trimmed = line.trim();

        if trimmed.is_empty() {
            // Blank lines end everything except lists
            if !matches!(self.state, ParserState::List(..)) {
                self.flush_state();
            }
            return 1;
        }

        if let Some((fence, language)) = parse_opening_fence(line) {
            self.flush_state();
            self.state = ParserState::Code {
                fence,
                language,
                lines: Vec::new(),
            };
            return 1;
        }

        if let Some((level, title)) = parse_atx_heading(line) {
            self.flush_state();
            let anchor = self.anchors.allocate(&title);
            self.outline.push(HeadingLine {
                line: i,
                level,
                title: title.clone(),
                anchor: anchor.clone(),
            });
            self.blocks.push(Block::Heading(Heading {
                level,
                text: parse_inlines(&title),
                style_id: None,
                anchor: Some(anchor),
            }));
            return 1;
        }

        if is_thematic_break(trimmed) {
            self.flush_state();
            self.blocks.push(Block::ThematicBreak);
            return 1;
        }

        if trimmed == PAGE_BREAK_MARKER {
            self.flush_state();
            self.blocks.push(Block::Break(BreakType::Page));
            return 1;
        }

        if let Some(quoted) = trimmed.strip_prefix('>') {
            let quoted = quoted.strip_prefix(' ').unwrap_or(quoted).to_string();
            match &mut self.state {
                ParserState::Quote(quote_lines) => quote_lines.push(quoted),
                _ => {
                    self.flush_state();
                    self.state = ParserState::Quote(vec![quoted]);
                }
            }
            return 1;
        }

        if let ParserState::Table(rows) = &mut self.state {
            if trimmed.contains('|') {
                rows.push(split_table_row(trimmed));
                return 1;
            }
            self.flush_state();
        }

        if trimmed.contains('|') {
            if let Some(next) = lines.get(i + 1) {
                if is_table_separator(next.trim()) {
                    self.flush_state();
                    self.state = ParserState::Table(vec![split_table_row(trimmed)]);
                    return 2;
                }
            }
        }

        if let Some((list_type, level, content)) = parse_list_item(line) {
            self.handle_list_item(list_type, level, content);
            return 1;
        }

        // Indented text continues the previous list item
        if let ParserState::List(_, items) = &mut self.state {
            if line.starts_with([' ', '\t']) {
                if let Some((_, text)) = items.last_mut() {
                    text.push(' ');
                    text.push_str(trimmed);
                    return 1;
                }
            }
        }

        self.handle_paragraph_line(line);
        1
    }

    /// Handle a list item
    fn handle_list_item(&mut self, list_type: ListType, level: u8, content: String) {
        match &mut self.state {
            ParserState::List(current_type, items)
                if *current_type == list_type || level > 0 =>
            {
                items.push((level, content));
            }
            _ => {
                self.flush_state();
                self.state = ParserState::List(list_type, vec![(level, content)]);
            }
        }
    }

    /// Handle a paragraph line
    fn handle_paragraph_line(&mut self, line: &str) {
        match &mut self.state {
            ParserState::Paragraph(lines) => lines.push(line.to_string()),
            _ => {
                self.flush_state();
                self.state = ParserState::Paragraph(vec![line.to_string()]);
            }
        }
    }

    /// Flush the current state to blocks
    fn flush_state(&mut self) {
        let state = std::mem::replace(&mut self.state, ParserState::Root);

        match state {
            ParserState::Root => {}
            ParserState::Paragraph(lines) => {
                if !lines.is_empty() {
                    self.blocks
                        .push(Block::Paragraph(Paragraph::new(paragraph_inlines(&lines))));
                }
            }
            ParserState::List(list_type, items) => {
                if !items.is_empty() {
                    self.blocks.push(Block::List(List {
                        list_type,
                        items: items
                            .into_iter()
                            .map(|(level, text)| ListItem {
                                content: parse_inlines(&text),
                                level,
                            })
                            .collect(),
                        style_id: None,
                    }));
                }
            }
            ParserState::Code {
                language, lines, ..
            } => {
                self.blocks.push(Block::Code(CodeBlock {
                    content: lines.join("\n"),
                    language,
                    style_id: None,
                }));
            }
            ParserState::Table(rows) => {
                let width = rows.first().map(Vec::len).unwrap_or(0);
                let rows = rows
                    .into_iter()
                    .enumerate()
                    .map(|(index, mut cells)| {
                        cells.resize(width, String::new());
                        TableRow {
                            cells: cells
                                .iter()
                                .map(|c| TableCell {
                                    content: parse_inlines(c),
                                })
                                .collect(),
                            is_header: index == 0,
                        }
                    })
                    .collect();
                self.blocks.push(Block::Table(Table {
                    rows,
                    style_id: None,
                }));
            }
            ParserState::Quote(lines) => {
                let mut inner = Parser::new()
                    .parse(&lines.join("\n"))
                    .map(|doc| doc.blocks)
                    .unwrap_or_default();
                // Quoted headings are content, not part of the outline
                clear_anchors(&mut inner);
                self.blocks.push(Block::Quote(inner));
            }
        }
    }
}

fn clear_anchors(blocks: &mut [Block]) {
    for block in blocks {
        match block {
            Block::Heading(heading) => heading.anchor = None,
            Block::Quote(inner) => clear_anchors(inner),
            _ => {}
        }
    }
}

/// Join paragraph lines, honouring hard line breaks
fn paragraph_inlines(lines: &[String]) -> Vec<Inline> {
    let mut out = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let hard_break = line.ends_with("  ") || line.ends_with('\\');
        let content = line.trim().trim_end_matches('\\').trim_end();
        extend_inlines(&mut out, parse_inlines(content));
        if index + 1 < lines.len() {
            if hard_break {
                out.push(Inline::Break);
            } else {
                push_text(&mut out, " ");
            }
        }
    }
    out
}

/// Parse `---` delimited front matter; returns metadata and body start line
fn parse_front_matter(lines: &[&str]) -> (DocumentMeta, usize) {
    let mut meta = DocumentMeta::default();
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return (meta, 0);
    }
    let Some(close) = lines
        .iter()
        .skip(1)
        .position(|l| matches!(l.trim_end(), "---" | "..."))
    else {
        return (meta, 0);
    };
    let body = &lines[1..close + 1];
    if !body.iter().all(|l| l.trim().is_empty() || l.contains(':')) {
        return (meta, 0);
    }

    for line in body {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = unquote(value.trim());
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "title" => meta.title = Some(value),
            "author" | "authors" => meta.authors = split_list(&value),
            "subject" => meta.subject = Some(value),
            "description" => meta.description = Some(value),
            "keywords" | "tags" => meta.keywords = split_list(&value),
            "date" | "created" => meta.created = Some(value),
            _ => {
                meta.attributes.insert(key, value);
            }
        }
    }

    (meta, close + 2)
}

fn unquote(value: &str) -> String {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')));
    stripped.unwrap_or(value).to_string()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split([',', ';'])
        .map(|s| unquote(s.trim()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Try to parse an ATX heading line
pub(crate) fn parse_atx_heading(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    // Optional closing sequence of '#'
    let mut title = rest.trim();
    let without_closing = title.trim_end_matches('#');
    if without_closing.is_empty() || without_closing.ends_with([' ', '\t']) {
        title = without_closing.trim_end();
    }
    Some((level as u8, title.to_string()))
}

/// Try to parse an opening code fence; returns the fence and language
fn parse_opening_fence(line: &str) -> Option<(String, Option<String>)> {
    let trimmed = line.trim_start();
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let count = trimmed.chars().take_while(|&c| c == ch).count();
    if count < 3 {
        return None;
    }
    let info = trimmed[count..].trim();
    if ch == '`' && info.contains('`') {
        return None;
    }
    let language = info.split_whitespace().next().map(str::to_string);
    Some((trimmed[..count].to_string(), language))
}

fn is_closing_fence(line: &str, fence: &str) -> bool {
    let trimmed = line.trim();
    let Some(ch) = fence.chars().next() else {
        return false;
    };
    trimmed.len() >= fence.len() && trimmed.chars().all(|c| c == ch)
}

fn is_thematic_break(trimmed: &str) -> bool {
    let Some(first) = trimmed.chars().next() else {
        return false;
    };
    if !matches!(first, '-' | '*' | '_') {
        return false;
    }
    let marks = trimmed.chars().filter(|&c| c == first).count();
    marks >= 3 && trimmed.chars().all(|c| c == first || c == ' ')
}

/// Try to parse a list item; returns type, nesting level and content
fn parse_list_item(line: &str) -> Option<(ListType, u8, String)> {
    let indent: usize = line
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();
    let trimmed = line.trim_start();
    let level = (indent / 2).min(8) as u8;

    for marker in ["- ", "* ", "+ "] {
        if let Some(content) = trimmed.strip_prefix(marker) {
            return Some((ListType::Unordered, level, content.trim().to_string()));
        }
    }

    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && digits <= 9 {
        let rest = &trimmed[digits..];
        for delimiter in [". ", ") "] {
            if let Some(content) = rest.strip_prefix(delimiter) {
                return Some((ListType::Ordered, level, content.trim().to_string()));
            }
        }
    }

    None
}

/// Split a `| a | b |` row into trimmed cells, honouring `\|`
fn split_table_row(row: &str) -> Vec<String> {
    let row = row.trim();
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = if row.ends_with('|') && !row.ends_with("\\|") {
        &row[..row.len() - 1]
    } else {
        row
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = row.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn is_table_separator(line: &str) -> bool {
    if !line.contains('-') {
        return false;
    }
    let cells = split_table_row(line);
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let core = cell.trim_start_matches(':').trim_end_matches(':');
            !core.is_empty() && core.chars().all(|c| c == '-')
        })
}

/// Parse markdown text into a Document.
///
/// # Errors
///
/// The parser is lenient and does not currently fail on any input;
/// unknown constructs are treated as plain paragraph text.
pub fn parse(text: &str) -> Result<Document> {
    Parser::new().parse(text)
}
