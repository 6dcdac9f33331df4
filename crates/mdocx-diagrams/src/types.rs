//! Type definitions for diagram rendering
//!
//! This module defines mermaid themes, image formats, and the values a
//! rendered diagram carries back to the document builder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DiagramError;

/// Mermaid rendering themes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MermaidTheme {
    /// Mermaid's stock theme
    #[default]
    Default,
    /// Green palette
    Forest,
    /// Light text on dark background
    Dark,
    /// Greyscale, print friendly
    Neutral,
    /// Minimal theme meant for customisation
    Base,
}

impl MermaidTheme {
    /// Theme name as mermaid expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Forest => "forest",
            Self::Dark => "dark",
            Self::Neutral => "neutral",
            Self::Base => "base",
        }
    }

    /// Every theme, in declaration order
    pub fn all() -> &'static [MermaidTheme] {
        &[
            Self::Default,
            Self::Forest,
            Self::Dark,
            Self::Neutral,
            Self::Base,
        ]
    }

    /// Background colour that suits the theme
    pub fn background(&self) -> &'static str {
        match self {
            Self::Dark => "#333333",
            _ => "white",
        }
    }
}

impl fmt::Display for MermaidTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MermaidTheme {
    type Err = DiagramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "forest" => Ok(Self::Forest),
            "dark" => Ok(Self::Dark),
            "neutral" => Ok(Self::Neutral),
            "base" => Ok(Self::Base),
            _ => Err(DiagramError::UnknownTheme(s.to_string())),
        }
    }
}

/// Image encodings handled by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG raster image
    #[default]
    Png,
    /// JPEG raster image
    #[serde(alias = "jpeg")]
    Jpg,
    /// SVG vector image
    Svg,
}

impl ImageFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Svg => "svg",
        }
    }

    /// Get the MIME type for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Guess the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        ext.trim_start_matches('.').parse().ok()
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = DiagramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "svg" => Ok(Self::Svg),
            _ => Err(DiagramError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// An encoded raster image with its size
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    /// Encoded bytes
    pub bytes: Vec<u8>,
    /// Encoding of `bytes`
    pub format: ImageFormat,
    /// Pixel size
    pub dimensions: Dimensions,
}

impl RasterImage {
    /// Check PNG magic bytes
    pub fn is_valid_png(&self) -> bool {
        self.bytes.len() > 8 && &self.bytes[0..8] == b"\x89PNG\r\n\x1a\n"
    }
}

/// A diagram block that rendered successfully
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDiagram {
    /// Unique id within one conversion
    pub id: String,
    /// Diagram source between the fences
    pub source_code: String,
    /// Encoded image
    pub image_bytes: Vec<u8>,
    /// Encoding of `image_bytes`
    pub format: ImageFormat,
    /// Pixel size
    pub dimensions: Dimensions,
}

impl ProcessedDiagram {
    /// File name used by the embed reference
    pub fn file_name(&self) -> String {
        diagram_file_name(&self.id)
    }

    /// Markdown image reference that replaces the diagram block
    pub fn embed_reference(&self) -> String {
        format!("![Mermaid Diagram {}]({})", self.id, self.file_name())
    }
}

/// `mermaid-<id>.png`
pub fn diagram_file_name(id: &str) -> String {
    format!("mermaid-{}.png", id)
}

/// Recover a diagram id from an embed reference target
pub fn diagram_id_from_file_name(name: &str) -> Option<&str> {
    name.strip_prefix("mermaid-")?.strip_suffix(".png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_from_str() {
        assert_eq!("forest".parse::<MermaidTheme>().unwrap(), MermaidTheme::Forest);
        assert_eq!("DARK".parse::<MermaidTheme>().unwrap(), MermaidTheme::Dark);
        assert!("solarized".parse::<MermaidTheme>().is_err());
        assert_eq!(MermaidTheme::all().len(), 5);
    }

    #[test]
    fn test_image_format_from_str() {
        assert_eq!("jpeg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpg);
        assert_eq!(ImageFormat::from_extension(".png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::Svg.mime_type(), "image/svg+xml");
        assert!("gif".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn test_embed_reference_syntax() {
        let diagram = ProcessedDiagram {
            id: "1-abcd1234".to_string(),
            source_code: "graph TD; A-->B;".to_string(),
            image_bytes: vec![],
            format: ImageFormat::Png,
            dimensions: Dimensions::default(),
        };
        assert_eq!(
            diagram.embed_reference(),
            "![Mermaid Diagram 1-abcd1234](mermaid-1-abcd1234.png)"
        );
        assert_eq!(diagram_id_from_file_name("mermaid-1-abcd1234.png"), Some("1-abcd1234"));
        assert_eq!(diagram_id_from_file_name("photo.png"), None);
    }
}
