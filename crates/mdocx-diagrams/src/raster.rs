//! SVG to PNG rasterization
//!
//! The rendered SVG is measured, clipped to its drawn bounding box and
//! scaled down to fit the configured bounds. Images are never upscaled.

use std::sync::{Arc, OnceLock};

use crate::error::{DiagramError, Result};
use crate::types::{Dimensions, ImageFormat, RasterImage};

/// Default maximum raster width in pixels
pub const DEFAULT_MAX_WIDTH: u32 = 800;
/// Default maximum raster height in pixels
pub const DEFAULT_MAX_HEIGHT: u32 = 600;

/// Size bounds and background for rasterization
#[derive(Debug, Clone)]
pub struct RasterLimits {
    pub max_width: u32,
    pub max_height: u32,
    /// CSS colour; `None` keeps the background transparent
    pub background: Option<String>,
}

impl Default for RasterLimits {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            background: Some("white".to_string()),
        }
    }
}

fn font_database() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut fontdb = usvg::fontdb::Database::new();
            fontdb.load_system_fonts();
            if fontdb.is_empty() {
                log::warn!("No system fonts found, diagram labels may be missing");
            }
            Arc::new(fontdb)
        })
        .clone()
}

/// Rasterize SVG markup into a PNG no larger than `limits`
pub fn rasterize(svg: &str, limits: &RasterLimits) -> Result<RasterImage> {
    let opts = usvg::Options {
        fontdb: font_database(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &opts)
        .map_err(|e| DiagramError::Raster(format!("SVG parsing failed: {}", e)))?;

    // Clip to what was actually drawn; fall back to the declared size
    let bbox = tree.root().abs_stroke_bounding_box();
    let (x, y, width, height) = if bbox.width() >= 1.0 && bbox.height() >= 1.0 {
        (bbox.x(), bbox.y(), bbox.width(), bbox.height())
    } else {
        let size = tree.size();
        (0.0, 0.0, size.width(), size.height())
    };

    let (target_width, target_height, scale) =
        fit_within(width, height, limits.max_width, limits.max_height);

    let mut pixmap = tiny_skia::Pixmap::new(target_width, target_height).ok_or_else(|| {
        DiagramError::Raster(format!(
            "Failed to create pixmap ({}x{})",
            target_width, target_height
        ))
    })?;

    if let Some(color) = limits.background.as_deref().and_then(parse_color) {
        pixmap.fill(color);
    }

    let transform = tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, -x * scale, -y * scale);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let bytes = pixmap
        .encode_png()
        .map_err(|e| DiagramError::Raster(format!("PNG encoding failed: {}", e)))?;

    Ok(RasterImage {
        bytes,
        format: ImageFormat::Png,
        dimensions: Dimensions {
            width: target_width,
            height: target_height,
        },
    })
}

/// Target pixel size and scale factor for a `width` x `height` drawing.
///
/// The aspect ratio is preserved and the scale never exceeds 1.
pub fn fit_within(width: f32, height: f32, max_width: u32, max_height: u32) -> (u32, u32, f32) {
    let width = width.max(1.0);
    let height = height.max(1.0);
    let scale = (max_width as f32 / width)
        .min(max_height as f32 / height)
        .min(1.0);
    let final_width = ((width * scale).round() as u32).clamp(1, max_width.max(1));
    let final_height = ((height * scale).round() as u32).clamp(1, max_height.max(1));
    (final_width, final_height, scale)
}

/// Parse a CSS color string to tiny_skia::Color
fn parse_color(color: &str) -> Option<tiny_skia::Color> {
    let color = color.trim().to_lowercase();

    match color.as_str() {
        "white" => return Some(tiny_skia::Color::WHITE),
        "black" => return Some(tiny_skia::Color::BLACK),
        "transparent" => return Some(tiny_skia::Color::TRANSPARENT),
        _ => {}
    }

    let hex = color.strip_prefix('#').filter(|h| h.is_ascii())?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let r = channel(&hex[0..1].repeat(2))?;
            let g = channel(&hex[1..2].repeat(2))?;
            let b = channel(&hex[2..3].repeat(2))?;
            Some(tiny_skia::Color::from_rgba8(r, g, b, 255))
        }
        6 | 8 => {
            let r = channel(&hex[0..2])?;
            let g = channel(&hex[2..4])?;
            let b = channel(&hex[4..6])?;
            let a = if hex.len() == 8 { channel(&hex[6..8])? } else { 255 };
            Some(tiny_skia::Color::from_rgba8(r, g, b, a))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100" viewBox="0 0 200 100">
  <rect x="10" y="10" width="100" height="50" fill="#336699"/>
</svg>"##;

    #[test]
    fn test_fit_within_no_upscaling() {
        assert_eq!(fit_within(200.0, 100.0, 800, 600), (200, 100, 1.0));
    }

    #[test]
    fn test_fit_within_wide_image() {
        let (w, h, scale) = fit_within(1600.0, 400.0, 800, 600);
        assert_eq!((w, h), (800, 200));
        assert!((scale - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fit_within_tall_image() {
        let (w, h, _) = fit_within(300.0, 1200.0, 800, 600);
        assert_eq!((w, h), (150, 600));
    }

    #[test]
    fn test_rasterize_clips_to_drawn_box() {
        let image = rasterize(BOX_SVG, &RasterLimits::default()).unwrap();
        assert!(image.is_valid_png());
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!(image.dimensions, Dimensions { width: 100, height: 50 });
    }

    #[test]
    fn test_rasterize_respects_bounds() {
        let limits = RasterLimits {
            max_width: 50,
            max_height: 50,
            background: None,
        };
        let image = rasterize(BOX_SVG, &limits).unwrap();
        assert!(image.dimensions.width <= 50);
        assert!(image.dimensions.height <= 50);
        assert_eq!(image.dimensions.width, 2 * image.dimensions.height);
    }

    #[test]
    fn test_rasterize_invalid_svg() {
        let result = rasterize("not svg", &RasterLimits::default());
        assert!(matches!(result, Err(DiagramError::Raster(_))));
    }

    #[test]
    fn test_parse_color() {
        assert!(parse_color("white").is_some());
        assert!(parse_color("#fff").is_some());
        assert!(parse_color("#336699").is_some());
        assert!(parse_color("#33669980").is_some());
        assert!(parse_color("chartreuse").is_none());
        assert!(parse_color("#éa").is_none());
        assert!(parse_color("#ééé").is_none());
    }
}
