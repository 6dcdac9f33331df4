//! Integration tests for the conversion orchestrator
//!
//! These run whole conversions through `Converter` with a fake diagram
//! backend: files in, files out, one result per input.

use std::fs;
use std::path::PathBuf;

use mdocx_cli::{BackendKind, Config, Converter, Direction, ErrorCode};
use mdocx_diagrams::testing::FakeBackend;
use mdocx_diagrams::CancellationToken;
use tempfile::TempDir;

const GUIDE: &str = r#"# User Guide

An introduction with a [link](https://example.com) and **bold** text.

## Flow

```mermaid
graph TD; A-->B;
```

See [the flow](#flow).
"#;

fn offline_config() -> Config {
    let mut config = Config::default();
    config.render.backend = BackendKind::None;
    config.retry = mdocx_diagrams::RetryPolicy::none();
    config
}

fn write_inputs(dir: &TempDir, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            fs::write(&path, format!("# {}\n\nBody of {}.\n", name, name)).unwrap();
            path
        })
        .collect()
}

#[test]
fn test_batch_isolates_failures() {
    let dir = TempDir::new().unwrap();
    let mut inputs = write_inputs(&dir, &["one.md", "two.md", "three.md"]);
    inputs.insert(1, dir.path().join("missing.md"));
    let out_dir = dir.path().join("out");

    let converter = Converter::new(offline_config());
    let results = converter.batch(&inputs, &out_dir, Direction::Docx, |_| {});

    assert_eq!(results.len(), 4);
    assert_eq!(results.iter().filter(|r| r.success).count(), 3);

    let failed = &results[1];
    assert!(!failed.success);
    assert_eq!(failed.input_path.as_deref(), Some(inputs[1].as_path()));
    assert_eq!(failed.error_code(), Some(ErrorCode::FileConversionFailed));
    let details = failed.error.as_ref().unwrap().details.as_deref().unwrap();
    assert!(details.contains("FileNotFound"));

    for name in ["one.docx", "two.docx", "three.docx"] {
        assert!(out_dir.join(name).is_file(), "{} missing", name);
    }
}

#[test]
fn test_batch_reports_progress_in_order() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(&dir, &["a.md", "b.md"]);
    let converter = Converter::new(offline_config());

    let mut seen = Vec::new();
    converter.batch(&inputs, &dir.path().join("out"), Direction::Docx, |p| {
        seen.push((p.completed, p.total, p.input.to_path_buf(), p.success));
    });

    assert_eq!(
        seen,
        vec![
            (1, 2, inputs[0].clone(), true),
            (2, 2, inputs[1].clone(), true),
        ]
    );
}

#[test]
fn test_batch_stops_converting_after_cancel() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(&dir, &["a.md", "b.md", "c.md"]);
    let token = CancellationToken::new();
    let converter = Converter::new(offline_config()).with_cancellation(token.clone());

    let results = converter.batch(&inputs, &dir.path().join("out"), Direction::Docx, |p| {
        if p.completed == 1 {
            token.cancel();
        }
    });

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    for result in &results[1..] {
        assert!(!result.success);
        assert_eq!(result.error_code(), Some(ErrorCode::BatchConversionError));
    }
    assert!(!dir.path().join("out/b.docx").exists());
}

#[test]
fn test_batch_to_markdown_with_bad_package() {
    let dir = TempDir::new().unwrap();
    let md = write_inputs(&dir, &["good.md"]);
    let converter = Converter::new(offline_config());
    let good = converter.convert_file(&md[0], None);
    assert!(good.success);

    let bad = dir.path().join("bad.docx");
    fs::write(&bad, b"definitely not a zip").unwrap();

    let inputs = vec![dir.path().join("good.docx"), bad];
    let results = converter.batch(&inputs, &dir.path().join("md"), Direction::Md, |_| {});
    assert!(results[0].success);
    assert!(!results[1].success);
    assert_eq!(results[1].error_code(), Some(ErrorCode::FileConversionFailed));

    let markdown = fs::read_to_string(dir.path().join("md/good.md")).unwrap();
    assert!(markdown.contains("# good.md"));
}

#[test]
fn test_wrong_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.pdf");
    fs::write(&path, "%PDF").unwrap();

    let result = Converter::new(offline_config()).convert_file(&path, None);
    assert!(!result.success);
    assert_eq!(result.error_code(), Some(ErrorCode::InvalidFileType));
}

#[test]
fn test_round_trip_with_rendered_diagram() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("guide.md");
    fs::write(&input, GUIDE).unwrap();

    let backend = FakeBackend::new();
    let mut config = offline_config();
    config.extract.extract_images = true;
    let converter = Converter::new(config).with_backend(backend.factory());

    let result = converter.convert_file(&input, None);
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.metadata.diagram_count, Some(1));
    assert_eq!(result.metadata.internal_link_count, Some(1));
    assert_eq!(result.metadata.external_link_count, Some(1));
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(backend.log().live(), 0);

    let docx = dir.path().join("guide.docx");
    let out = dir.path().join("back/guide.md");
    let result = converter.extract_file(&docx, Some(&out));
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.metadata.image_count, Some(1));

    let markdown = fs::read_to_string(&out).unwrap();
    assert!(markdown.contains("# User Guide"));
    assert!(markdown.contains("## Flow"));
    assert!(markdown.contains("[link](https://example.com)"));
    assert!(markdown.contains("](images/image-1.png)"));
    assert!(dir.path().join("back/images/image-1.png").is_file());
}

#[test]
fn test_json_envelope_for_failure() {
    let result = Converter::new(offline_config())
        .convert_file(&PathBuf::from("/nonexistent/input.md"), None);
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["success"], false);
    assert_eq!(value["error"]["code"], "FileNotFound");
    assert_eq!(value["inputPath"], "/nonexistent/input.md");
    assert!(value.get("outputPath").is_none());
    assert_eq!(value["warnings"], serde_json::json!([]));
}

#[test]
fn test_batch_extraction_keeps_images_apart() {
    let dir = TempDir::new().unwrap();
    let mut config = offline_config();
    config.extract.extract_images = true;
    let converter = Converter::new(config);

    let mut packages = Vec::new();
    for (name, color) in [("a", [255, 0, 0]), ("b", [0, 0, 255])] {
        let mut png = Vec::new();
        image::RgbImage::from_pixel(4, 4, image::Rgb(color))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        fs::write(dir.path().join(format!("{}.png", name)), png).unwrap();
        let input = dir.path().join(format!("{}.md", name));
        fs::write(&input, format!("# {}\n\n![pic]({}.png)\n", name, name)).unwrap();
        assert!(converter.convert_file(&input, None).success);
        packages.push(dir.path().join(format!("{}.docx", name)));
    }

    let out_dir = dir.path().join("md");
    let results = converter.batch(&packages, &out_dir, Direction::Md, |_| {});
    assert!(results.iter().all(|r| r.success), "{:?}", results);

    let pixel = |path: PathBuf| *image::open(path).unwrap().to_rgb8().get_pixel(0, 0);
    assert_eq!(pixel(out_dir.join("images/a/image-1.png")), image::Rgb([255, 0, 0]));
    assert_eq!(pixel(out_dir.join("images/b/image-1.png")), image::Rgb([0, 0, 255]));

    let a = fs::read_to_string(out_dir.join("a.md")).unwrap();
    assert!(a.contains("](images/a/image-1.png)"));
}
