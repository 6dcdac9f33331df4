//! Lifecycle tests for the diagram renderer
//!
//! These exercise the public API with the in-process fake backend:
//! partial failures, guaranteed teardown and scratch cleanup.

use std::fs;

use mdocx_diagrams::testing::FakeBackend;
use mdocx_diagrams::{find_mermaid_blocks, DiagramRenderer, MermaidTheme, RenderConfig};
use tempfile::TempDir;

fn document(sources: &[&str]) -> String {
    let mut text = String::from("# Diagrams\n\n");
    for (i, source) in sources.iter().enumerate() {
        text.push_str(&format!("Figure {}:\n\n```mermaid\n{}\n```\n\n", i + 1, source));
    }
    text.push_str("The end.\n");
    text
}

#[test]
fn test_embedded_count_matches_successes() {
    let sources = ["graph TD; A-->B;", "FAIL here", "sequenceDiagram\nA->>B: hi", "FAIL again"];
    let text = document(&sources);
    let backend = FakeBackend::new().failing_on("FAIL");

    let content = DiagramRenderer::new(backend.factory(), RenderConfig::default())
        .process_content(&text);

    assert_eq!(content.blocks_found, 4);
    assert_eq!(content.diagrams.len(), 2);
    assert_eq!(content.warnings.len(), 2);

    // Every failed block survives byte for byte
    let remaining = find_mermaid_blocks(&content.text);
    assert_eq!(remaining.len(), 2);
    for block in &remaining {
        assert!(block.source.starts_with("FAIL"));
        let original = find_mermaid_blocks(&text)
            .into_iter()
            .find(|b| b.source == block.source)
            .unwrap();
        assert_eq!(
            &content.text[block.start..block.end],
            &text[original.start..original.end]
        );
    }

    for diagram in &content.diagrams {
        assert!(content.text.contains(&diagram.embed_reference()));
    }
}

#[test]
fn test_teardown_and_cleanup_on_every_path() {
    let outer = TempDir::new().unwrap();
    let scratch = outer.path().join("scratch");
    let config = RenderConfig {
        scratch_dir: Some(scratch.clone()),
        theme: MermaidTheme::Neutral,
        ..Default::default()
    };

    for backend in [
        FakeBackend::new(),
        FakeBackend::new().failing_on("graph"),
        FakeBackend::new().panicking_on("graph"),
        FakeBackend::new().unavailable(),
    ] {
        let text = document(&["graph TD; A-->B;", "graph LR; C-->D;"]);
        DiagramRenderer::new(backend.factory(), config.clone()).process_content(&text);

        let log = backend.log();
        assert_eq!(log.starts, 1);
        assert_eq!(log.live(), 0, "backend left running: {:?}", log);
        assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
    }
}

#[test]
fn test_large_diagram_is_downscaled() {
    let backend = FakeBackend::new().with_size(1600, 600);
    let content = DiagramRenderer::new(backend.factory(), RenderConfig::default())
        .process_content(&document(&["graph LR; A-->B-->C-->D;"]));

    let diagram = &content.diagrams[0];
    assert_eq!(diagram.dimensions.width, 800);
    assert_eq!(diagram.dimensions.height, 300);
}

#[test]
fn test_repeated_calls_use_independent_sessions() {
    let backend = FakeBackend::new();
    let renderer = DiagramRenderer::new(backend.factory(), RenderConfig::default());
    let text = document(&["graph TD; A-->B;"]);

    let first = renderer.process_content(&text);
    let second = renderer.process_content(&text);

    assert_eq!(first.diagrams[0].id, second.diagrams[0].id);
    let log = backend.log();
    assert_eq!(log.starts, 2);
    assert_eq!(log.shutdowns, 2);
}
