//! Conversion options and the `mdocx.toml` configuration file
//!
//! Option names follow the camelCase spelling used in JSON and TOML
//! (`mermaidTheme`, `tocGeneration`, `customStyles`, ...). Every field
//! has a default, so a partial file only overrides what it names.
//!
//! ```toml
//! [convert]
//! template = "technical-documentation"
//! mermaidTheme = "forest"
//! tocGeneration = true
//!
//! [convert.outputOptions]
//! imageQuality = 70
//!
//! [extract]
//! extractImages = true
//! imageOutputDir = "images"
//!
//! [render]
//! backend = "kroki"
//! timeoutMs = 10000
//!
//! [retry]
//! maxAttempts = 4
//! baseDelay = 250
//! ```

use std::path::{Path, PathBuf};

use mdocx_ast::DocumentMeta;
use mdocx_diagrams::{ImageFormat, RenderConfig, RetryPolicy};
use mdocx_ooxml::{template, CustomStyles, Margins, Orientation, StyleBundle, WriteOptions};
use serde::{Deserialize, Serialize};

use crate::result::{ConversionError, ErrorCode};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "mdocx.toml";

/// Package encoding switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputOptions {
    pub compress: bool,
    /// JPEG quality (1-100)
    pub image_quality: u8,
    /// Re-encode images as JPEG when that is smaller
    pub optimize_size: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            compress: true,
            image_quality: 85,
            optimize_size: false,
        }
    }
}

/// Markdown → docx options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Style Registry template id
    pub template: String,
    /// Diagram theme id
    pub mermaid_theme: String,
    pub preserve_links: bool,
    pub toc_generation: bool,
    pub include_metadata: bool,
    pub custom_styles: Option<CustomStyles>,
    pub output_options: OutputOptions,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub created_at: Option<String>,
    pub orientation: Orientation,
    pub margins: Margins,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            template: "professional-report".to_string(),
            mermaid_theme: "default".to_string(),
            preserve_links: true,
            toc_generation: false,
            include_metadata: true,
            custom_styles: None,
            output_options: OutputOptions::default(),
            title: None,
            author: None,
            subject: None,
            description: None,
            keywords: Vec::new(),
            created_at: None,
            orientation: Orientation::Portrait,
            margins: Margins::default(),
        }
    }
}

impl ConvertOptions {
    /// Resolve the template and apply custom style overrides
    pub fn style_bundle(&self) -> Result<StyleBundle, ConversionError> {
        let bundle = template::lookup(&self.template).map_err(|e| {
            ConversionError::new(ErrorCode::InvalidTemplate, e.to_string())
                .with_details(format!("valid templates: {}", template_names()))
        })?;
        Ok(match self.custom_styles {
            Some(ref custom) => bundle.with_overrides(custom),
            None => bundle,
        })
    }

    /// Renderer settings with this conversion's theme
    pub fn render_config(&self, base: &RenderConfig) -> Result<RenderConfig, ConversionError> {
        let theme = template::lookup_theme(&self.mermaid_theme)
            .map_err(|e| ConversionError::new(ErrorCode::InvalidTemplate, e.to_string()))?;
        Ok(RenderConfig {
            theme,
            ..base.clone()
        })
    }

    /// Serializer switches
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            toc: self.toc_generation,
            preserve_links: self.preserve_links,
            include_metadata: self.include_metadata,
            compress: self.output_options.compress,
            image_quality: self.output_options.image_quality,
            optimize_size: self.output_options.optimize_size,
            orientation: self.orientation,
            margins: self.margins,
            ..Default::default()
        }
    }

    /// Explicit options win over front matter
    pub fn apply_metadata(&self, meta: &mut DocumentMeta) {
        if let Some(ref title) = self.title {
            meta.title = Some(title.clone());
        }
        if let Some(ref author) = self.author {
            meta.authors = vec![author.clone()];
        }
        if let Some(ref subject) = self.subject {
            meta.subject = Some(subject.clone());
        }
        if let Some(ref description) = self.description {
            meta.description = Some(description.clone());
        }
        if !self.keywords.is_empty() {
            meta.keywords = self.keywords.clone();
        }
        if let Some(ref created) = self.created_at {
            meta.created = Some(created.clone());
        }
    }
}

fn template_names() -> String {
    template::TemplateId::all()
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Docx → markdown options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractOptions {
    pub preserve_formatting: bool,
    pub extract_images: bool,
    /// Relative paths resolve against the output file's directory
    pub image_output_dir: Option<PathBuf>,
    pub image_format: ImageFormat,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            preserve_formatting: true,
            extract_images: false,
            image_output_dir: None,
            image_format: ImageFormat::Png,
        }
    }
}

impl ExtractOptions {
    /// Directory extracted images are written to
    pub fn image_dir(&self, output: Option<&Path>) -> PathBuf {
        let dir = self
            .image_output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("images"));
        match output.and_then(Path::parent) {
            Some(parent) if dir.is_relative() => parent.join(dir),
            _ => dir,
        }
    }

    /// Options for one batch item: images go under a directory named
    /// after the item's output file
    pub fn for_item(&self, output: &Path) -> Self {
        let base = self
            .image_output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("images"));
        let dir = match output.file_stem() {
            Some(stem) => base.join(stem),
            None => base,
        };
        Self {
            image_output_dir: Some(dir),
            ..self.clone()
        }
    }

    /// Extractor settings; image references use the configured directory
    pub fn to_extractor_options(&self, image_quality: u8) -> mdocx_ooxml::ExtractOptions {
        mdocx_ooxml::ExtractOptions {
            preserve_formatting: self.preserve_formatting,
            extract_images: self.extract_images,
            image_output_dir: self
                .extract_images
                .then(|| {
                    self.image_output_dir
                        .clone()
                        .unwrap_or_else(|| PathBuf::from("images"))
                }),
            image_format: self.image_format,
            image_quality,
        }
    }
}

/// Which rendering backend produces diagram SVG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The `mmdc` command line tool
    #[default]
    Mmdc,
    /// A Kroki server
    Kroki,
    /// Leave diagram blocks as code
    None,
}

/// `[render]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderSettings {
    pub backend: BackendKind,
    /// Path to `mmdc`; looked up on PATH when unset
    pub mmdc_path: Option<PathBuf>,
    /// Kroki server; the public one when unset
    pub kroki_url: Option<String>,
    #[serde(flatten)]
    pub config: RenderConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Mmdc,
            mmdc_path: None,
            kroki_url: None,
            config: RenderConfig::default(),
        }
    }
}

/// Contents of `mdocx.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub convert: ConvertOptions,
    pub extract: ExtractOptions,
    pub render: RenderSettings,
    pub retry: RetryPolicy,
}

impl Config {
    /// Parse a configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&text)?)
    }

    /// Load `mdocx.toml` from `dir` when present
    pub fn discover(dir: &Path) -> anyhow::Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            tracing::debug!("Loading config: {}", path.display());
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdocx_diagrams::MermaidTheme;

    #[test]
    fn test_defaults() {
        let options = ConvertOptions::default();
        assert!(options.preserve_links);
        assert!(options.include_metadata);
        assert!(!options.toc_generation);
        assert_eq!(options.output_options.image_quality, 85);
        assert!(options.style_bundle().is_ok());
    }

    #[test]
    fn test_camel_case_json() {
        let json = r#"{
            "template": "modern",
            "mermaidTheme": "dark",
            "tocGeneration": true,
            "customStyles": {"h1": {"color": "FF0000"}},
            "outputOptions": {"optimizeSize": true},
            "createdAt": "2024-01-01T00:00:00Z",
            "orientation": "landscape",
            "margins": {"top": 10.0}
        }"#;
        let options: ConvertOptions = serde_json::from_str(json).unwrap();
        assert!(options.toc_generation);
        assert!(options.output_options.optimize_size);
        assert!(options.output_options.compress);
        assert_eq!(options.orientation, Orientation::Landscape);
        assert_eq!(options.margins.top, 10.0);
        assert_eq!(options.margins.left, 25.4);

        let bundle = options.style_bundle().unwrap();
        assert_eq!(bundle.heading(1).color.as_deref(), Some("FF0000"));
        let config = options.render_config(&RenderConfig::default()).unwrap();
        assert_eq!(config.theme, MermaidTheme::Dark);
    }

    #[test]
    fn test_invalid_template_and_theme() {
        let options = ConvertOptions {
            template: "fancy".to_string(),
            ..Default::default()
        };
        let err = options.style_bundle().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTemplate);
        assert!(err.details.unwrap().contains("professional-report"));

        let options = ConvertOptions {
            mermaid_theme: "neon".to_string(),
            ..Default::default()
        };
        let err = options.render_config(&RenderConfig::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTemplate);
    }

    #[test]
    fn test_metadata_overrides() {
        let mut meta = DocumentMeta {
            title: Some("From front matter".to_string()),
            subject: Some("Kept".to_string()),
            ..Default::default()
        };
        ConvertOptions {
            title: Some("Explicit".to_string()),
            author: Some("Ann".to_string()),
            keywords: vec!["a".to_string()],
            ..Default::default()
        }
        .apply_metadata(&mut meta);
        assert_eq!(meta.title.as_deref(), Some("Explicit"));
        assert_eq!(meta.subject.as_deref(), Some("Kept"));
        assert_eq!(meta.authors, vec!["Ann"]);
        assert_eq!(meta.keywords, vec!["a"]);
    }

    #[test]
    fn test_config_file_sections() {
        let config = Config::from_toml_str(
            r#"
[convert]
template = "academic-paper"
tocGeneration = true

[convert.outputOptions]
imageQuality = 60

[extract]
extractImages = true
imageFormat = "jpeg"

[render]
backend = "kroki"
krokiUrl = "http://localhost:8000"
timeoutMs = 5000
concurrency = 2

[retry]
maxAttempts = 5
baseDelay = 100
"#,
        )
        .unwrap();
        assert_eq!(config.convert.template, "academic-paper");
        assert!(config.convert.toc_generation);
        assert_eq!(config.convert.output_options.image_quality, 60);
        assert!(config.extract.extract_images);
        assert_eq!(config.extract.image_format, ImageFormat::Jpg);
        assert_eq!(config.render.backend, BackendKind::Kroki);
        assert_eq!(config.render.config.timeout_ms, 5000);
        assert_eq!(config.render.config.concurrency, 2);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay.as_millis(), 100);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_batch_items_get_their_own_image_dir() {
        let options = ExtractOptions::default();
        let a = options.for_item(Path::new("out/a.md"));
        let b = options.for_item(Path::new("out/b.md"));
        assert_eq!(a.image_dir(Some(Path::new("out/a.md"))), PathBuf::from("out/images/a"));
        assert_eq!(b.image_dir(Some(Path::new("out/b.md"))), PathBuf::from("out/images/b"));
        assert_eq!(options.image_output_dir, None);
    }

    #[test]
    fn test_image_dir_resolution() {
        let options = ExtractOptions {
            extract_images: true,
            image_output_dir: Some(PathBuf::from("assets")),
            ..Default::default()
        };
        assert_eq!(
            options.image_dir(Some(Path::new("out/doc.md"))),
            PathBuf::from("out/assets")
        );
        assert_eq!(options.image_dir(None), PathBuf::from("assets"));
        let extractor = options.to_extractor_options(85);
        assert_eq!(extractor.image_output_dir, Some(PathBuf::from("assets")));
    }
}
