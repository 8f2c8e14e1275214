//! # Image Transcode Stage
//!
//! Converts a captured frame into a transmission-ready payload for the
//! remote filter endpoint: probe natural dimensions, resize to a bounded
//! width preserving aspect ratio (SIMD-accelerated via fast_image_resize),
//! re-encode as JPEG at a fixed quality factor, and base64-encode the
//! result.
//!
//! Bounding the width caps request payload size and round-trip latency;
//! preserving the aspect ratio prevents distortion. Images already embedded
//! as data URIs pass their payload through untouched: they were transfer
//! encoded once and re-encoding would only lose quality.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{ResizeOptions, Resizer};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use log::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::image_ref::ImageRef;

/// JPEG recompression quality, the source's fixed 0.8 factor.
pub const JPEG_QUALITY: u8 = 80;

/// Compute the bounded output size for a source image.
///
/// Width is clamped to `max_width`; height follows proportionally, rounded,
/// and clamped to at least 1 px. Sources at or under the bound keep their
/// size; no upscaling.
pub fn bounded_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scaled = (max_width as f64) * (height as f64) / (width as f64);
    (max_width, (scaled.round() as u32).max(1))
}

/// Convert an image reference into its transfer representation: a base64
/// string of JPEG bytes bounded to `max_width`.
///
/// File references are read, probed, resized if needed, and recompressed.
/// Data references already carry a transfer-encoded payload and are passed
/// through without re-encoding.
pub fn to_transfer_format(
    image: &ImageRef,
    max_width: u32,
    jpeg_quality: u8,
) -> PipelineResult<String> {
    if let Some(payload) = image.payload() {
        return Ok(payload.to_owned());
    }

    let bytes = image.read_bytes()?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| PipelineError::transcode("probe", e.to_string()))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let (out_w, out_h) = bounded_size(width, height, max_width);

    let pixels = if (out_w, out_h) == (width, height) {
        rgb.into_raw()
    } else {
        debug!(
            "resizing {}x{} -> {}x{} (bound {})",
            width, height, out_w, out_h, max_width
        );
        resize_rgb(rgb.as_raw(), width, height, out_w, out_h)?
    };

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality)
        .encode(&pixels, out_w, out_h, ExtendedColorType::Rgb8)
        .map_err(|e| PipelineError::transcode("encode", e.to_string()))?;

    Ok(BASE64.encode(&jpeg))
}

/// SIMD resize of a tightly-packed RGB8 buffer.
fn resize_rgb(
    src: &[u8],
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
) -> PipelineResult<Vec<u8>> {
    let src_view = TypedImageRef::<U8x3>::from_buffer(src_w, src_h, src)
        .map_err(|e| PipelineError::transcode("resize", e.to_string()))?;
    let mut dst_buf = vec![0u8; (dst_w as usize) * (dst_h as usize) * 3];
    let mut dst_view = TypedImage::<U8x3>::from_buffer(dst_w, dst_h, dst_buf.as_mut_slice())
        .map_err(|e| PipelineError::transcode("resize", e.to_string()))?;

    let opts = ResizeOptions::new().use_alpha(false);
    let mut resizer = Resizer::new();
    resizer
        .resize_typed::<U8x3>(&src_view, &mut dst_view, &opts)
        .map_err(|e| PipelineError::transcode("resize", e.to_string()))?;

    Ok(dst_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn decoded_dimensions(b64: &str) -> (u32, u32) {
        let jpeg = BASE64.decode(b64).unwrap();
        let img = image::load_from_memory(&jpeg).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_bounded_size_math() {
        assert_eq!(bounded_size(2560, 1440, 1280), (1280, 720));
        assert_eq!(bounded_size(1920, 1080, 1280), (1280, 720));
        // Rounds, not truncates: 1280 * 721 / 1920 = 480.67
        assert_eq!(bounded_size(1920, 721, 1280), (1280, 481));
        // No upscaling at or under the bound.
        assert_eq!(bounded_size(800, 600, 1280), (800, 600));
        assert_eq!(bounded_size(1280, 960, 1280), (1280, 960));
        // Extreme aspect ratios never collapse to zero height.
        assert_eq!(bounded_size(100_000, 1, 1280), (1280, 1));
    }

    #[test]
    fn test_oversized_file_is_resized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, png_bytes(1600, 1200)).unwrap();

        let b64 = to_transfer_format(&ImageRef::file(&path), 1280, JPEG_QUALITY).unwrap();
        assert_eq!(decoded_dimensions(&b64), (1280, 960));
    }

    #[test]
    fn test_small_file_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, png_bytes(320, 240)).unwrap();

        let b64 = to_transfer_format(&ImageRef::file(&path), 1280, JPEG_QUALITY).unwrap();
        assert_eq!(decoded_dimensions(&b64), (320, 240));
    }

    #[test]
    fn test_data_uri_passes_through_untouched() {
        let image = ImageRef::data("image/png", "bm90LWFuLWltYWdl");
        let b64 = to_transfer_format(&image, 1280, JPEG_QUALITY).unwrap();
        // Passthrough is literal: no decode, no re-encode.
        assert_eq!(b64, "bm90LWFuLWltYWdl");
    }

    #[test]
    fn test_unreadable_source_is_transcode_error() {
        let err =
            to_transfer_format(&ImageRef::file("/nonexistent.jpg"), 1280, JPEG_QUALITY).unwrap_err();
        assert_eq!(err.category(), "transcode");
    }

    #[test]
    fn test_failed_probe_is_transcode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = to_transfer_format(&ImageRef::file(&path), 1280, JPEG_QUALITY).unwrap_err();
        assert_eq!(err.category(), "transcode");
    }
}
