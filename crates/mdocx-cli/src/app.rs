//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use mdocx_diagrams::{ImageFormat, MermaidTheme};
use mdocx_ooxml::{Orientation, TemplateId};

use crate::converter::{BatchProgress, Converter, Direction};
use crate::options::{BackendKind, Config};
use crate::result::ConversionResult;

/// Image encoding for extracted images
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ImageFormatArg {
    #[default]
    Png,
    #[value(alias = "jpeg")]
    Jpg,
    Svg,
}

impl From<ImageFormatArg> for ImageFormat {
    fn from(arg: ImageFormatArg) -> Self {
        match arg {
            ImageFormatArg::Png => ImageFormat::Png,
            ImageFormatArg::Jpg => ImageFormat::Jpg,
            ImageFormatArg::Svg => ImageFormat::Svg,
        }
    }
}

/// Diagram backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Mmdc,
    Kroki,
    None,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Mmdc => BackendKind::Mmdc,
            BackendArg::Kroki => BackendKind::Kroki,
            BackendArg::None => BackendKind::None,
        }
    }
}

/// Batch target format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TargetFormat {
    #[default]
    Docx,
    Md,
}

impl From<TargetFormat> for Direction {
    fn from(target: TargetFormat) -> Self {
        match target {
            TargetFormat::Docx => Direction::Docx,
            TargetFormat::Md => Direction::Md,
        }
    }
}

#[derive(Parser)]
#[command(name = "mdocx")]
#[command(author, version, about = "Markdown to Word and back", long_about = None)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./mdocx.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Diagram rendering backend
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a markdown file to DOCX
    Convert {
        /// Input markdown file
        input: PathBuf,

        /// Output file (defaults to the input with a .docx extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Style template
        #[arg(short, long)]
        template: Option<String>,

        /// Mermaid theme
        #[arg(long)]
        theme: Option<String>,

        /// Insert a table of contents
        #[arg(long)]
        toc: bool,

        /// Write link text without hyperlinks
        #[arg(long)]
        no_links: bool,

        /// Skip document properties
        #[arg(long)]
        no_metadata: bool,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Document author
        #[arg(long)]
        author: Option<String>,

        /// Landscape pages
        #[arg(long)]
        landscape: bool,
    },

    /// Extract markdown from a DOCX file
    Extract {
        /// Input DOCX file
        input: PathBuf,

        /// Output file (defaults to the input with a .md extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write embedded images to this directory
        #[arg(long, value_name = "DIR")]
        extract_images: Option<PathBuf>,

        /// Encoding for extracted images
        #[arg(long, value_enum)]
        image_format: Option<ImageFormatArg>,

        /// Drop inline formatting
        #[arg(long)]
        no_formatting: bool,
    },

    /// Convert many files
    Batch {
        /// Input files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output directory
        #[arg(short = 'd', long, default_value = "output")]
        out_dir: PathBuf,

        /// Target format
        #[arg(long, value_enum, default_value = "docx")]
        to: TargetFormat,
    },

    /// List templates and mermaid themes
    Templates,
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.render.backend = backend.into();
    }

    match cli.command {
        Commands::Convert {
            input,
            output,
            template,
            theme,
            toc,
            no_links,
            no_metadata,
            title,
            author,
            landscape,
        } => {
            let convert = &mut config.convert;
            if let Some(template) = template {
                convert.template = template;
            }
            if let Some(theme) = theme {
                convert.mermaid_theme = theme;
            }
            convert.toc_generation |= toc;
            convert.preserve_links &= !no_links;
            convert.include_metadata &= !no_metadata;
            convert.title = title.or(convert.title.take());
            convert.author = author.or(convert.author.take());
            if landscape {
                convert.orientation = Orientation::Landscape;
            }
            convert_command(config, &input, output.as_deref(), cli.json)?;
        }
        Commands::Extract {
            input,
            output,
            extract_images,
            image_format,
            no_formatting,
        } => {
            let extract = &mut config.extract;
            if let Some(dir) = extract_images {
                extract.extract_images = true;
                extract.image_output_dir = Some(dir);
            }
            if let Some(format) = image_format {
                extract.image_format = format.into();
            }
            extract.preserve_formatting &= !no_formatting;
            extract_command(config, &input, output.as_deref(), cli.json)?;
        }
        Commands::Batch {
            inputs,
            out_dir,
            to,
        } => {
            batch_command(config, &inputs, &out_dir, to.into(), cli.json)?;
        }
        Commands::Templates => templates_command(cli.json)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_env("MDOCX_LOG")
        .unwrap_or_else(|_| EnvFilter::from_default_env().add_directive(level.into()));
    // A second init (tests calling run_cli twice) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load settings from a config file or use defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load(path).with_context(|| format!("Failed to load config: {}", path.display()))
        }
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            Ok(Config::discover(&cwd)?.unwrap_or_default())
        }
    }
}

/// Execute the convert command
pub fn convert_command(
    config: Config,
    input: &Path,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let result = Converter::new(config).convert_file(input, output);
    report(&result, json)?;
    finish(&result)
}

/// Execute the extract command
pub fn extract_command(
    config: Config,
    input: &Path,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let result = Converter::new(config).extract_file(input, output);
    report(&result, json)?;
    finish(&result)
}

/// Execute the batch command
pub fn batch_command(
    config: Config,
    patterns: &[String],
    out_dir: &Path,
    direction: Direction,
    json: bool,
) -> Result<()> {
    let inputs = expand_inputs(patterns)?;
    if inputs.is_empty() {
        anyhow::bail!("No input files matched");
    }

    let converter = Converter::new(config);
    let results = converter.batch(&inputs, out_dir, direction, |p: &BatchProgress<'_>| {
        if !json {
            println!(
                "[{}/{}] {} {}",
                p.completed,
                p.total,
                if p.success { "ok    " } else { "FAILED" },
                p.input.display()
            );
        }
    });

    let failed = results.iter().filter(|r| !r.success).count();
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in results.iter().filter(|r| !r.success) {
            if let (Some(input), Some(error)) = (&result.input_path, &result.error) {
                eprintln!("{}: {}", input.display(), error);
                if let Some(ref details) = error.details {
                    eprintln!("  {}", details);
                }
            }
        }
        println!(
            "Converted {} of {} file(s) into {}",
            results.len() - failed,
            results.len(),
            out_dir.display()
        );
    }

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed", failed, results.len());
    }
    Ok(())
}

/// Execute the templates command
pub fn templates_command(json: bool) -> Result<()> {
    if json {
        let templates: Vec<_> = TemplateId::all()
            .iter()
            .map(|t| serde_json::json!({ "name": t.as_str(), "description": t.description() }))
            .collect();
        let themes: Vec<_> = MermaidTheme::all().iter().map(|t| t.as_str()).collect();
        let value = serde_json::json!({ "templates": templates, "themes": themes });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Templates:");
    for template in TemplateId::all() {
        println!("  {:<22} {}", template.as_str(), template.description());
    }
    println!();
    println!("Mermaid themes:");
    for theme in MermaidTheme::all() {
        println!("  {}", theme);
    }
    Ok(())
}

/// Expand glob patterns; plain paths pass through unchanged
fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            inputs.push(PathBuf::from(pattern));
            continue;
        }
        for entry in glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))? {
            match entry {
                Ok(path) if path.is_file() => inputs.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!("Could not read {}", e),
            }
        }
    }
    Ok(inputs)
}

fn report(result: &ConversionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    if let Some(ref output) = result.output_path {
        let meta = &result.metadata;
        println!(
            "Wrote {} ({} bytes in {} ms)",
            output.display(),
            meta.output_size,
            meta.processing_time_ms
        );
        if let Some(pages) = meta.page_count {
            println!(
                "  ~{} page(s), {} image(s), {} diagram(s), {} internal / {} external link(s)",
                pages,
                meta.image_count.unwrap_or(0),
                meta.diagram_count.unwrap_or(0),
                meta.internal_link_count.unwrap_or(0),
                meta.external_link_count.unwrap_or(0)
            );
        }
    }
    Ok(())
}

fn finish(result: &ConversionResult) -> Result<()> {
    match result.error {
        Some(ref error) => match error.details {
            Some(ref details) => anyhow::bail!("{}\n  {}", error, details),
            None => anyhow::bail!("{}", error),
        },
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_convert() {
        let args = vec![
            "mdocx",
            "convert",
            "guide.md",
            "-o",
            "out/guide.docx",
            "--template",
            "academic-paper",
            "--toc",
            "--no-links",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Convert {
                input,
                output,
                template,
                toc,
                no_links,
                landscape,
                ..
            } => {
                assert_eq!(input, PathBuf::from("guide.md"));
                assert_eq!(output, Some(PathBuf::from("out/guide.docx")));
                assert_eq!(template.as_deref(), Some("academic-paper"));
                assert!(toc);
                assert!(no_links);
                assert!(!landscape);
            }
            _ => panic!("Expected Convert command"),
        }
    }

    #[test]
    fn test_cli_parse_extract() {
        let args = vec![
            "mdocx",
            "extract",
            "report.docx",
            "--extract-images",
            "media",
            "--image-format",
            "jpeg",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Extract {
                input,
                output,
                extract_images,
                image_format,
                no_formatting,
            } => {
                assert_eq!(input, PathBuf::from("report.docx"));
                assert!(output.is_none());
                assert_eq!(extract_images, Some(PathBuf::from("media")));
                assert_eq!(image_format, Some(ImageFormatArg::Jpg));
                assert!(!no_formatting);
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_cli_parse_batch_with_globals() {
        let args = vec![
            "mdocx", "batch", "docs/*.md", "README.md", "--to", "docx", "--json", "--backend",
            "none",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.json);
        assert_eq!(cli.backend, Some(BackendArg::None));

        match cli.command {
            Commands::Batch {
                inputs,
                out_dir,
                to,
            } => {
                assert_eq!(inputs, vec!["docs/*.md", "README.md"]);
                assert_eq!(out_dir, PathBuf::from("output"));
                assert_eq!(to, TargetFormat::Docx);
            }
            _ => panic!("Expected Batch command"),
        }
    }

    #[test]
    fn test_cli_batch_requires_inputs() {
        assert!(Cli::try_parse_from(vec!["mdocx", "batch"]).is_err());
    }

    #[test]
    fn test_expand_inputs() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.md"), "# a").unwrap();
        std::fs::write(dir.path().join("b.md"), "# b").unwrap();
        std::fs::write(dir.path().join("c.txt"), "c").unwrap();

        let pattern = dir.path().join("*.md").display().to_string();
        let mut inputs = expand_inputs(&[pattern, "missing.md".to_string()]).unwrap();
        inputs.sort();
        assert_eq!(inputs.len(), 3);
        assert!(inputs.contains(&PathBuf::from("missing.md")));
    }

    #[test]
    fn test_load_config_default() {
        let config = load_config(None);
        assert!(config.is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config(Some(Path::new("/nonexistent/mdocx.toml"))).is_err());
    }
}
