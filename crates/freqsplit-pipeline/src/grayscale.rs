//! Image decoding, grayscale conversion, and optional resizing.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! `[0, 1]` [`Image`] grid the transform consumes.
//!
//! This is the first step in the pipeline: raw bytes in, `Image` out.

use image::GrayImage;

use crate::types::{Dimensions, Image, PipelineError, ResizeFilter};

/// Decode raw image bytes and convert to 8-bit grayscale.
///
/// Supports PNG, JPEG, BMP, and WebP formats (whatever the `image` crate
/// can decode). Color input is reduced with the `image` crate's luma
/// conversion.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded grayscale image"]
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_luma8())
}

/// Resize to exactly `target` (aspect ratio is not preserved).
///
/// Returns the image unchanged when it already has the target size.
#[must_use = "returns the resized image"]
pub fn resize(gray: &GrayImage, target: Dimensions, filter: ResizeFilter) -> GrayImage {
    if gray.dimensions() == (target.width, target.height) {
        return gray.clone();
    }
    image::imageops::resize(gray, target.width, target.height, filter.to_image_filter())
}

/// Decode, grayscale, optionally resize, and scale into `[0, 1]`.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] or [`PipelineError::ImageDecode`]
/// from decoding, and [`PipelineError::InvalidGeometry`] if the decoded
/// or resized raster is empty.
pub fn load_image(
    bytes: &[u8],
    target_size: Option<Dimensions>,
    filter: ResizeFilter,
) -> Result<Image, PipelineError> {
    let gray = decode_and_grayscale(bytes)?;
    let gray = match target_size {
        Some(target) => resize(&gray, target, filter),
        None => gray,
    };
    Image::from_gray(&gray)
}
