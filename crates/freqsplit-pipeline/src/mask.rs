//! Circular low-pass and high-pass masks over a centered spectrum.
//!
//! Radii are given as fractions of `min(H, W) / 2` and converted to
//! absolute pixel distances. Distances are measured from
//! [`Shape::center`], the same `(H / 2, W / 2)` the forward shift moves
//! the zero-frequency term to, so the masks line up with the spectrum.
//!
//! Both boundaries are inclusive: a position exactly at the low radius is
//! kept by the low-pass mask, and a position exactly at the high radius
//! is kept by the high-pass mask.

use ndarray::Array2;

use crate::types::{Mask, MaskGeometry, MaskSet, PipelineError, Shape};

/// Build the low-pass and high-pass masks for a spectrum shape.
///
/// `low_frac` and `high_frac` are not range-checked. Fractions outside
/// `(0, 1)` or an inverted pair still yield well-defined masks: empty,
/// full, or overlapping.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidGeometry`] if either dimension of
/// `shape` is zero.
pub fn build_masks(shape: Shape, low_frac: f64, high_frac: f64) -> Result<MaskSet, PipelineError> {
    let shape = shape.ensure_valid()?;
    let max_radius = shape.max_radius();
    let geometry = MaskGeometry {
        low_radius_px: low_frac * max_radius,
        high_radius_px: high_frac * max_radius,
        center: shape.center(),
    };

    let distance = distance_grid(shape);
    let low = Mask::from_fn(shape, |row, col| {
        distance[[row, col]] <= geometry.low_radius_px
    });
    let high = Mask::from_fn(shape, |row, col| {
        distance[[row, col]] >= geometry.high_radius_px
    });

    tracing::debug!(
        %shape,
        low_radius_px = geometry.low_radius_px,
        high_radius_px = geometry.high_radius_px,
        low_kept = low.kept(),
        high_kept = high.kept(),
        "built radial masks"
    );

    Ok(MaskSet {
        low,
        high,
        geometry,
    })
}

/// Euclidean distance, in pixels, from every grid position to the center.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn distance_grid(shape: Shape) -> Array2<f64> {
    let center = shape.center();
    let (cy, cx) = (center.row as f64, center.col as f64);
    Array2::from_shape_fn((shape.height, shape.width), |(row, col)| {
        (col as f64 - cx).hypot(row as f64 - cy)
    })
}
