//! Document model builder
//!
//! Turns markdown text into the structural tree plus everything the
//! package serializer needs alongside it: rendered diagrams, classified
//! links, the section tree and its table of contents. Per-element
//! problems (a diagram that does not render, a malformed link) become
//! warnings; the build itself only fails on parser errors.

use anyhow::Result;

use mdocx_ast::{
    nest_sections, plain_text, Block, Document, DocumentSection, Inline, TableOfContents,
};
use mdocx_diagrams::{DiagramRenderer, ProcessedDiagram};

use crate::links::{LinkKind, LinkResolver, ProcessedLink};
use crate::parser::{HeadingLine, Parser};

/// Everything produced from one markdown input
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Structural tree
    pub document: Document,
    /// Heading tree; ids are the heading anchors
    pub sections: Vec<DocumentSection>,
    /// Outline mirroring `sections`
    pub toc: TableOfContents,
    /// Diagrams that rendered, referenced from the tree by image source
    pub diagrams: Vec<ProcessedDiagram>,
    /// Every link in document order
    pub links: Vec<ProcessedLink>,
    /// Recovered problems
    pub warnings: Vec<String>,
    /// Markdown after diagram blocks were replaced
    pub text: String,
}

impl BuildOutput {
    /// Number of internal and anchor links
    pub fn internal_link_count(&self) -> usize {
        self.links.iter().filter(|l| l.is_internal()).count()
    }

    /// Number of external links
    pub fn external_link_count(&self) -> usize {
        self.links
            .iter()
            .filter(|l| l.kind == LinkKind::External)
            .count()
    }

    /// Look up the classification recorded for `url`
    pub fn link_for(&self, url: &str) -> Option<&ProcessedLink> {
        self.links.iter().find(|l| l.url == url.trim())
    }
}

/// Builds document models
pub struct ModelBuilder<'a> {
    renderer: Option<&'a DiagramRenderer>,
    resolver: LinkResolver,
}

impl Default for ModelBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ModelBuilder<'a> {
    /// Builder that leaves diagram blocks as code
    pub fn new() -> Self {
        Self {
            renderer: None,
            resolver: LinkResolver::new(),
        }
    }

    /// Render diagram blocks with `renderer`
    pub fn with_renderer(mut self, renderer: &'a DiagramRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Classify links with `resolver`
    pub fn with_resolver(mut self, resolver: LinkResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Build the model for `text`
    pub fn build(&self, text: &str) -> Result<BuildOutput> {
        let mut output = BuildOutput::default();

        match self.renderer {
            Some(renderer) => {
                let processed = renderer.process_content(text);
                log::debug!(
                    "Rendered {} of {} diagram block(s)",
                    processed.diagrams.len(),
                    processed.blocks_found
                );
                output.text = processed.text;
                output.diagrams = processed.diagrams;
                output.warnings.extend(processed.warnings);
            }
            None => output.text = text.to_string(),
        }

        let (document, outline) = Parser::new().parse_with_outline(&output.text)?;

        output.sections = nest_sections(flat_sections(&output.text, &outline));
        output.toc = TableOfContents::from_sections(&output.sections);

        let mut links = Vec::new();
        collect_links(&document.blocks, &mut links);
        for (text, url) in links {
            let link = self.resolver.resolve(&text, &url);
            if let Some(ref warning) = link.warning {
                log::warn!("{}", warning);
                output.warnings.push(warning.clone());
            }
            output.links.push(link);
        }

        output.document = document;
        Ok(output)
    }
}

/// Build the model for `text` with an optional renderer
pub fn build(text: &str, renderer: Option<&DiagramRenderer>) -> Result<BuildOutput> {
    let mut builder = ModelBuilder::new();
    if let Some(renderer) = renderer {
        builder = builder.with_renderer(renderer);
    }
    builder.build(text)
}

/// One section per heading, with the raw markdown up to the next heading
fn flat_sections(text: &str, outline: &[HeadingLine]) -> Vec<DocumentSection> {
    let lines: Vec<&str> = text.lines().collect();
    outline
        .iter()
        .enumerate()
        .map(|(i, heading)| {
            let end = outline.get(i + 1).map(|h| h.line).unwrap_or(lines.len());
            let start = (heading.line + 1).min(end);
            let mut section = DocumentSection::new(
                heading.title.clone(),
                heading.level,
                heading.anchor.clone(),
            );
            section.content = lines[start..end].join("\n").trim().to_string();
            section
        })
        .collect()
}

/// Gather `(text, url)` for every link, in document order
fn collect_links(blocks: &[Block], out: &mut Vec<(String, String)>) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => collect_inline_links(&p.inlines, out),
            Block::Heading(h) => collect_inline_links(&h.text, out),
            Block::List(list) => {
                for item in &list.items {
                    collect_inline_links(&item.content, out);
                }
            }
            Block::Table(table) => {
                for cell in table.rows.iter().flat_map(|r| &r.cells) {
                    collect_inline_links(&cell.content, out);
                }
            }
            Block::Quote(inner) => collect_links(inner, out),
            Block::Code(_) | Block::Break(_) | Block::ThematicBreak => {}
        }
    }
}

fn collect_inline_links(inlines: &[Inline], out: &mut Vec<(String, String)>) {
    for inline in inlines {
        match inline {
            Inline::Link(link) => out.push((plain_text(&link.text), link.url.clone())),
            Inline::Format(_, inner) => collect_inline_links(std::slice::from_ref(inner), out),
            Inline::Span(inner) => collect_inline_links(inner, out),
            Inline::Text(_) | Inline::Image(_) | Inline::Break => {}
        }
    }
}
