//! Individual raster panels.
//!
//! Every grid is rendered row-major: grid row `r`, column `c` becomes
//! pixel `(x = c, y = r)`.

use freqsplit_pipeline::{Decomposition, LogMagnitude, MaskGeometry};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_circle_mut;
use ndarray::Array2;

use crate::RenderError;

/// Ring color marking the low-pass radius (lime).
pub const LOW_RING_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Ring color marking the high-pass radius (red).
pub const HIGH_RING_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Map a `[0, 1]` grid to 8-bit gray. Values outside the range are clamped.
///
/// # Errors
///
/// Returns [`RenderError::GridTooLarge`] if a dimension exceeds `u32`.
pub fn unit_to_gray(grid: &Array2<f64>) -> Result<GrayImage, RenderError> {
    let (width, height) = raster_size(grid)?;
    Ok(GrayImage::from_fn(width, height, |x, y| {
        image::Luma([to_u8(grid[[y as usize, x as usize]])])
    }))
}

/// Min-max stretch a grid to the full 8-bit range.
///
/// A grid with no spread renders black.
///
/// # Errors
///
/// Returns [`RenderError::GridTooLarge`] if a dimension exceeds `u32`.
pub fn autoscale_to_gray(grid: &Array2<f64>) -> Result<GrayImage, RenderError> {
    let (min, max) = grid
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if max > min {
        let span = max - min;
        unit_to_gray(&grid.mapv(|v| (v - min) / span))
    } else {
        unit_to_gray(&Array2::zeros(grid.raw_dim()))
    }
}

/// The autoscaled log-magnitude with both mask radii drawn as rings.
///
/// Rings are centered on the mask center (column as x, row as y). A
/// radius that rounds to zero or less is not drawn.
///
/// # Errors
///
/// Returns [`RenderError::GridTooLarge`] if a dimension exceeds `u32`.
pub fn ring_overlay(
    log_magnitude: &LogMagnitude,
    geometry: &MaskGeometry,
) -> Result<RgbImage, RenderError> {
    let mut canvas = gray_to_rgb(&autoscale_to_gray(log_magnitude.values())?);
    let center = (
        saturating_i32(geometry.center.col),
        saturating_i32(geometry.center.row),
    );
    for (radius, color) in [
        (geometry.low_radius_px, LOW_RING_COLOR),
        (geometry.high_radius_px, HIGH_RING_COLOR),
    ] {
        if let Some(radius) = ring_radius(radius) {
            draw_hollow_circle_mut(&mut canvas, center, radius, color);
        }
    }
    Ok(canvas)
}

/// The six panels of a decomposition figure.
#[derive(Debug, Clone)]
pub struct Panels {
    /// The input image.
    pub original: GrayImage,
    /// Autoscaled `ln(1 + |F|)`.
    pub spectrum: GrayImage,
    /// Spectrum with mask rings.
    pub rings: RgbImage,
    /// Low-pass reconstruction.
    pub low: GrayImage,
    /// High-pass reconstruction.
    pub high: GrayImage,
    /// Autoscaled `low + high` mask sum (overlap shows brightest).
    pub masks: GrayImage,
}

impl Panels {
    /// Render every panel of a decomposition.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::GridTooLarge`] if the grids exceed `u32`.
    pub fn from_decomposition(decomposition: &Decomposition) -> Result<Self, RenderError> {
        Ok(Self {
            original: unit_to_gray(decomposition.image.values())?,
            spectrum: autoscale_to_gray(decomposition.log_magnitude.values())?,
            rings: ring_overlay(&decomposition.log_magnitude, &decomposition.masks.geometry)?,
            low: unit_to_gray(decomposition.low.values())?,
            high: unit_to_gray(decomposition.high.values())?,
            masks: autoscale_to_gray(&decomposition.masks.combined())?,
        })
    }
}

pub(crate) fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

fn raster_size(grid: &Array2<f64>) -> Result<(u32, u32), RenderError> {
    let (rows, cols) = grid.dim();
    match (u32::try_from(cols), u32::try_from(rows)) {
        (Ok(width), Ok(height)) => Ok((width, height)),
        _ => Err(RenderError::GridTooLarge { rows, cols }),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn saturating_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[allow(clippy::cast_possible_truncation)]
fn ring_radius(radius_px: f64) -> Option<i32> {
    let rounded = radius_px.round();
    (rounded.is_finite() && rounded >= 1.0).then(|| rounded.min(f64::from(i32::MAX)) as i32)
}
