//! freqsplit-render: Raster rendering of decompositions (sans-IO)
//!
//! Turns the grids of a [`Decomposition`](freqsplit_pipeline::Decomposition)
//! into 8-bit panels, composes them into a 2x3 figure, and encodes PNG
//! bytes. Writing the bytes anywhere is the caller's job.

pub mod figure;
pub mod panel;

pub use figure::{FigureLayout, compose_figure};
pub use panel::{
    HIGH_RING_COLOR, LOW_RING_COLOR, Panels, autoscale_to_gray, ring_overlay, unit_to_gray,
};

use image::{GrayImage, ImageEncoder, RgbImage};

/// Errors that can occur while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    PngEncode(#[from] image::ImageError),

    /// A grid dimension does not fit in a raster dimension.
    #[error("grid of {rows}x{cols} is too large to render")]
    GridTooLarge {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },

    /// A panel differs in size from the first panel.
    #[error("panel {panel} is {actual:?}, expected {expected:?}")]
    PanelSizeMismatch {
        /// Panel name.
        panel: &'static str,
        /// Size of the first panel.
        expected: (u32, u32),
        /// Size of this panel.
        actual: (u32, u32),
    },

    /// The composed figure would overflow a raster dimension.
    #[error("figure layout overflows the maximum raster size")]
    FigureTooLarge,
}

/// Encode an RGB image as PNG bytes.
///
/// # Errors
///
/// Returns [`RenderError::PngEncode`] if PNG encoding fails.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(png_bytes)
}

/// Encode a grayscale image as PNG bytes.
///
/// # Errors
///
/// Returns [`RenderError::PngEncode`] if PNG encoding fails.
pub fn encode_gray_png(image: &GrayImage) -> Result<Vec<u8>, RenderError> {
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::L8,
    )?;
    Ok(png_bytes)
}
