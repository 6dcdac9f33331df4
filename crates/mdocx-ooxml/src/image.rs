//! Image support for OOXML packages
//!
//! Images are embedded via `<w:drawing>` elements with inline
//! positioning:
//!
//! ```xml
//! <w:drawing>
//!   <wp:inline>
//!     <wp:extent cx="..." cy="..."/>                <!-- Dimensions in EMUs -->
//!     <wp:docPr id="..." name="..." descr="..."/>   <!-- Alt text -->
//!     <a:graphic>
//!       <a:graphicData uri="...picture">
//!         <pic:pic>
//!           <pic:blipFill><a:blip r:embed="rIdNN"/></pic:blipFill>
//!         </pic:pic>
//!       </a:graphicData>
//!     </a:graphic>
//!   </wp:inline>
//! </w:drawing>
//! ```
//!
//! OOXML uses EMUs (English Metric Units) for dimensions:
//! - 914400 EMUs = 1 inch
//! - 9525 EMUs = 1 pixel (at 96 DPI)

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use mdocx_diagrams::ImageFormat;

use crate::error::Result;

/// EMUs per inch (914400)
pub const EMU_PER_INCH: i64 = 914400;

/// EMUs per pixel at 96 DPI (9525)
pub const EMU_PER_PIXEL: i64 = 9525;

/// Widest an inline image may be: 6 inches, the text width of a
/// letter page with one inch margins
pub const MAX_INLINE_WIDTH_PX: u32 = 576;

/// Convert pixels to EMUs
pub fn pixels_to_emu(pixels: u32) -> i64 {
    pixels as i64 * EMU_PER_PIXEL
}

/// Convert EMUs to pixels, rounding to nearest
pub fn emu_to_pixels(emu: i64) -> u32 {
    ((emu + EMU_PER_PIXEL / 2) / EMU_PER_PIXEL).max(0) as u32
}

/// Display size for an image, shrunk to the text width
pub fn display_size(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_INLINE_WIDTH_PX || width == 0 {
        return (width.max(1), height.max(1));
    }
    let scale = MAX_INLINE_WIDTH_PX as f64 / width as f64;
    (
        MAX_INLINE_WIDTH_PX,
        ((height as f64 * scale).round() as u32).max(1),
    )
}

/// Detect the format of image bytes from their signature
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => Some(ImageFormat::Png),
        Ok(image::ImageFormat::Jpeg) => Some(ImageFormat::Jpg),
        _ => {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
            head.contains("<svg").then_some(ImageFormat::Svg)
        }
    }
}

/// Pixel size of raster image bytes
pub fn raster_size(bytes: &[u8]) -> Option<(u32, u32)> {
    image::load_from_memory(bytes)
        .ok()
        .map(|img| (img.width(), img.height()))
}

/// Re-encode raster bytes into `target`.
///
/// `quality` applies to JPEG output (1-100). SVG is not a raster target;
/// the caller keeps the original bytes in that case.
pub fn convert_raster(bytes: &[u8], target: ImageFormat, quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let mut out = Vec::new();
    match target {
        ImageFormat::Jpg => {
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
            encoder.encode_image(&rgb)?;
        }
        ImageFormat::Png | ImageFormat::Svg => {
            img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emu_conversions() {
        assert_eq!(pixels_to_emu(96), EMU_PER_INCH);
        assert_eq!(emu_to_pixels(EMU_PER_INCH), 96);
        assert_eq!(emu_to_pixels(pixels_to_emu(400)), 400);
    }

    #[test]
    fn test_display_size_shrinks_wide_images() {
        assert_eq!(display_size(400, 200), (400, 200));
        assert_eq!(display_size(1152, 600), (576, 300));
    }

    #[test]
    fn test_sniff_and_convert() {
        let png = sample_png(8, 4);
        assert_eq!(sniff_format(&png), Some(ImageFormat::Png));
        assert_eq!(raster_size(&png), Some((8, 4)));

        let jpg = convert_raster(&png, ImageFormat::Jpg, 80).unwrap();
        assert_eq!(sniff_format(&jpg), Some(ImageFormat::Jpg));
        assert_eq!(raster_size(&jpg), Some((8, 4)));

        let back = convert_raster(&jpg, ImageFormat::Png, 80).unwrap();
        assert_eq!(sniff_format(&back), Some(ImageFormat::Png));
    }

    #[test]
    fn test_sniff_svg() {
        assert_eq!(
            sniff_format(br#"<svg xmlns="http://www.w3.org/2000/svg"/>"#),
            Some(ImageFormat::Svg)
        );
        assert_eq!(sniff_format(b"plain"), None);
    }
}
