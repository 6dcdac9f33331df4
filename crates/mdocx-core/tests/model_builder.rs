//! Document model builder tests
//!
//! Parse real-looking markdown, render diagrams through the fake
//! backend, and check the outline and link invariants.

use mdocx_ast::{Block, FormatType, Inline, ListType};
use mdocx_core::{build, parse, slugify, LinkKind, ModelBuilder};
use mdocx_diagrams::testing::FakeBackend;
use mdocx_diagrams::{diagram_id_from_file_name, DiagramRenderer, RenderConfig};

const REPORT: &str = r#"---
title: Quarterly Report
author: Ada Lovelace
---

# Overview

The **quarter** went _well_. See [details](#Results) and
[the site](https://example.com).

## Results

| Metric | Value |
|--------|------:|
| Revenue | 10 |
| Cost | `4` |

1. First
2. Second
   - nested

## Results

> Quoted text

```rust
fn main() {}
```
"#;

#[test]
fn test_parse_report_structure() {
    let doc = parse(REPORT).unwrap();
    assert_eq!(doc.metadata.title.as_deref(), Some("Quarterly Report"));
    assert_eq!(doc.metadata.authors, vec!["Ada Lovelace"]);

    let kinds: Vec<&str> = doc
        .blocks
        .iter()
        .map(|b| match b {
            Block::Heading(_) => "heading",
            Block::Paragraph(_) => "paragraph",
            Block::Table(_) => "table",
            Block::List(_) => "list",
            Block::Quote(_) => "quote",
            Block::Code(_) => "code",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["heading", "paragraph", "heading", "table", "list", "heading", "quote", "code"]
    );

    let Block::Paragraph(ref para) = doc.blocks[1] else {
        panic!("expected paragraph");
    };
    assert!(para
        .inlines
        .iter()
        .any(|i| matches!(i, Inline::Format(FormatType::Bold, _))));

    let Block::Table(ref table) = doc.blocks[3] else {
        panic!("expected table");
    };
    assert_eq!(table.rows.len(), 3);
    assert!(table.rows[0].is_header);
    assert_eq!(table.column_count(), 2);

    let Block::List(ref list) = doc.blocks[4] else {
        panic!("expected list");
    };
    assert_eq!(list.list_type, ListType::Ordered);
    assert_eq!(list.items.len(), 3);
    assert_eq!(list.items[2].level, 1);
}

#[test]
fn test_toc_anchor_equals_section_id() {
    let output = build(REPORT, None).unwrap();

    let mut ids = Vec::new();
    for section in &output.sections {
        section.walk(&mut |s| ids.push(s.id.clone()));
    }
    let anchors: Vec<String> = output.toc.flatten().iter().map(|e| e.anchor.clone()).collect();

    assert_eq!(ids, vec!["overview", "results", "results-1"]);
    assert_eq!(ids, anchors);

    // Heading blocks carry the same anchors
    let heading_anchors: Vec<String> = output
        .document
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::Heading(h) => h.anchor.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(heading_anchors, ids);
}

#[test]
fn test_anchor_links_target_slugs() {
    let output = build(REPORT, None).unwrap();
    let link = output.link_for("#Results").unwrap();
    assert_eq!(link.kind, LinkKind::Anchor);
    assert_eq!(link.target(), format!("#{}", slugify("Results")));
}

#[test]
fn test_rendered_diagrams_are_referenced_from_tree() {
    let md = "# Flow\n\n```mermaid\ngraph TD; A-->B\n```\n\n```mermaid\nFAIL\n```\n";
    let backend = FakeBackend::new().failing_on("FAIL");
    let renderer = DiagramRenderer::new(backend.factory(), RenderConfig::default());

    let output = ModelBuilder::new().with_renderer(&renderer).build(md).unwrap();

    assert_eq!(output.diagrams.len(), 1);
    assert_eq!(output.warnings.len(), 1);
    assert_eq!(backend.log().live(), 0);

    let image_ids: Vec<String> = output
        .document
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::Paragraph(p) => Some(p.inlines.clone()),
            _ => None,
        })
        .flatten()
        .filter_map(|i| match i {
            Inline::Image(img) => diagram_id_from_file_name(&img.src).map(str::to_string),
            _ => None,
        })
        .collect();
    assert_eq!(image_ids, vec![output.diagrams[0].id.clone()]);

    // The failed block is still a mermaid code block
    assert!(output.document.blocks.iter().any(|b| matches!(
        b,
        Block::Code(c) if c.language.as_deref() == Some("mermaid") && c.content == "FAIL"
    )));
}

#[test]
fn test_no_diagrams_no_backend() {
    let backend = FakeBackend::new();
    let renderer = DiagramRenderer::new(backend.factory(), RenderConfig::default());
    let output = build("Just text.\n", Some(&renderer)).unwrap();
    assert!(output.diagrams.is_empty());
    assert_eq!(backend.log().starts, 0);
}
