//! Masked inverse transform and display normalization.
//!
//! A mask is applied to the centered spectrum, the centering shift is
//! undone, and the inverse DFT is taken. Only the real part is kept: the
//! imaginary residue left by rounding (or by an asymmetric mask) is
//! dropped without being reported.
//!
//! The real result is then min-max rescaled into `[0, 1]` so that
//! low-pass and high-pass outputs are comparable on screen even though
//! their raw magnitudes can differ by orders of magnitude.

use ndarray::Array2;

use crate::shift::ifftshift;
use crate::spectrum::ifft2;
use crate::types::{Mask, PipelineError, ReconstructedImage, Spectrum};

/// Reconstruct a spatial image from the frequencies a mask keeps.
///
/// # Errors
///
/// Returns [`PipelineError::ShapeMismatch`] if `mask` and `spectrum`
/// differ in shape. The check runs before any numeric work.
pub fn reconstruct(spectrum: &Spectrum, mask: &Mask) -> Result<ReconstructedImage, PipelineError> {
    let masked = spectrum.masked(mask)?;
    Ok(normalize(inverse_real(&masked)))
}

/// Undo the centering shift, inverse-transform, and keep the real part.
///
/// This is the raw reconstruction before rescaling; an unmasked spectrum
/// returns the original image up to rounding.
#[must_use]
pub fn inverse_real(spectrum: &Spectrum) -> Array2<f64> {
    let unshifted = ifftshift(spectrum.values());
    ifft2(&unshifted).mapv(|v| v.re)
}

/// Min-max rescale into `[0, 1]`.
///
/// A grid with no spread (max == min) becomes all zeros.
#[must_use]
pub fn normalize(mut values: Array2<f64>) -> ReconstructedImage {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if max > min {
        let span = max - min;
        values.mapv_inplace(|v| (v - min) / span);
    } else {
        values.fill(0.0);
    }

    ReconstructedImage::new(values, min, max)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;
    use crate::mask::build_masks;
    use crate::spectrum::transform;
    use crate::types::{Image, Shape};

    fn impulse_4x4() -> Image {
        let mut grid = Array2::zeros((4, 4));
        grid[[2, 2]] = 1.0;
        Image::from_grid(grid).unwrap()
    }

    fn textured(rows: usize, cols: usize) -> Image {
        #[allow(clippy::cast_precision_loss)]
        let grid = Array2::from_shape_fn((rows, cols), |(r, c)| {
            let (r, c) = (r as f64, c as f64);
            (0.5 + 0.3 * (r * 0.7).sin() * (c * 0.4).cos() + 0.1 * ((r + 2.0 * c) * 1.9).sin())
                .clamp(0.0, 1.0)
        });
        Image::from_grid(grid).unwrap()
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let (spectrum, _) = transform(&textured(6, 6));
        let mask = Mask::keep_all(Shape::new(6, 5));
        let result = reconstruct(&spectrum, &mask);
        assert!(matches!(result, Err(PipelineError::ShapeMismatch { .. })));
    }

    #[test]
    fn keep_all_mask_reproduces_normalized_original() {
        for (rows, cols) in [(8, 8), (7, 5), (9, 12)] {
            let image = textured(rows, cols);
            let (spectrum, _) = transform(&image);
            let rebuilt = reconstruct(&spectrum, &Mask::keep_all(spectrum.shape())).unwrap();
            let expected = normalize(image.values().clone());
            for ((r, c), &v) in expected.values().indexed_iter() {
                assert!(
                    (rebuilt.values()[[r, c]] - v).abs() < 1e-9,
                    "mismatch at ({r}, {c}) for {rows}x{cols}"
                );
            }
        }
    }

    #[test]
    fn inverse_real_of_unmasked_spectrum_is_the_image() {
        let image = textured(5, 9);
        let (spectrum, _) = transform(&image);
        let back = inverse_real(&spectrum);
        for ((r, c), &v) in image.values().indexed_iter() {
            assert!((back[[r, c]] - v).abs() < 1e-12);
        }
    }

    #[test]
    fn disjoint_covering_masks_partition_the_spectrum() {
        // 8x8: low radius 2.0; high radius a hair above 2.0, below sqrt(5).
        let image = textured(8, 8);
        let (spectrum, _) = transform(&image);
        let masks = build_masks(spectrum.shape(), 0.5, 0.5 + 1e-9).unwrap();
        assert_eq!(masks.overlap(), 0);
        assert_eq!(masks.low.kept() + masks.high.kept(), 64);

        let low = spectrum.masked(&masks.low).unwrap();
        let high = spectrum.masked(&masks.high).unwrap();
        for ((r, c), &full) in spectrum.values().indexed_iter() {
            let sum = low.values()[[r, c]] + high.values()[[r, c]];
            assert!((sum - full).norm() < 1e-12, "partition broken at ({r}, {c})");
        }

        // Linearity carries the partition through to the spatial domain.
        let spatial = inverse_real(&low) + inverse_real(&high);
        for ((r, c), &v) in image.values().indexed_iter() {
            assert!((spatial[[r, c]] - v).abs() < 1e-12);
        }
    }

    #[test]
    fn normalized_output_spans_unit_interval() {
        let image = textured(16, 16);
        let (spectrum, _) = transform(&image);
        let masks = build_masks(spectrum.shape(), 0.2, 0.4).unwrap();
        for mask in [&masks.low, &masks.high] {
            let out = reconstruct(&spectrum, mask).unwrap();
            let min = out.values().iter().copied().fold(f64::INFINITY, f64::min);
            let max = out.values().iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert!(min.abs() < 1e-12, "min {min}");
            assert!((max - 1.0).abs() < 1e-12, "max {max}");
            assert!(!out.is_flat());
        }
    }

    #[test]
    fn constant_grid_normalizes_to_zero() {
        let out = normalize(Array2::from_elem((6, 4), 0.7));
        assert!(out.is_flat());
        assert!(out.values().iter().all(|&v| v == 0.0));
        assert_eq!(out.shape(), Shape::new(6, 4));
    }

    #[test]
    fn dc_only_reconstruction_is_flat() {
        let image = Image::from_grid(Array2::from_elem((6, 4), 0.7)).unwrap();
        let (spectrum, _) = transform(&image);
        let center = spectrum.shape().center();
        let mask = Mask::from_fn(spectrum.shape(), |row, col| (row, col) == (center.row, center.col));
        let out = reconstruct(&spectrum, &mask).unwrap();
        assert!(out.is_flat());
        assert!(out.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_mask_yields_all_zero() {
        let (spectrum, _) = transform(&textured(5, 5));
        let mask = Mask::from_fn(spectrum.shape(), |_, _| false);
        let out = reconstruct(&spectrum, &mask).unwrap();
        assert!(out.is_flat());
        assert_eq!(out.source_range(), (0.0, 0.0));
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn impulse_low_and_high_reconstructions() {
        let (spectrum, _) = transform(&impulse_4x4());
        let masks = build_masks(spectrum.shape(), 0.5, 0.5).unwrap();

        // Low pass keeps DC and the four nearest frequencies:
        // x[m, n] = (1 - 2 cos(pi m / 2) - 2 cos(pi n / 2)) / 16,
        // ranging from -3/16 to 5/16.
        let low = reconstruct(&spectrum, &masks.low).unwrap();
        let (lo, hi) = low.source_range();
        assert!((lo + 3.0 / 16.0).abs() < 1e-12);
        assert!((hi - 5.0 / 16.0).abs() < 1e-12);
        for ((m, n), &v) in low.values().indexed_iter() {
            let expected = (2.0 - (FRAC_PI_2 * m as f64).cos() - (FRAC_PI_2 * n as f64).cos()) / 4.0;
            assert!((v - expected).abs() < 1e-12, "low ({m}, {n}): {v} vs {expected}");
        }

        // High pass drops only DC: the impulse minus its mean, which
        // normalizes back to the impulse.
        let high = reconstruct(&spectrum, &masks.high).unwrap();
        let (lo, hi) = high.source_range();
        assert!((lo + 1.0 / 16.0).abs() < 1e-12);
        assert!((hi - 15.0 / 16.0).abs() < 1e-12);
        for ((m, n), &v) in high.values().indexed_iter() {
            let expected = if (m, n) == (2, 2) { 1.0 } else { 0.0 };
            assert!((v - expected).abs() < 1e-12, "high ({m}, {n}): {v}");
        }

        // Raw energies: low keeps 5/16 of the impulse's unit energy,
        // high keeps 15/16 (the bands overlap on four frequencies).
        let low_raw = inverse_real(&spectrum.masked(&masks.low).unwrap());
        let high_raw = inverse_real(&spectrum.masked(&masks.high).unwrap());
        let energy = |grid: &Array2<f64>| grid.iter().map(|v| v * v).sum::<f64>();
        assert!((energy(&low_raw) - 5.0 / 16.0).abs() < 1e-12);
        assert!((energy(&high_raw) - 15.0 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_records_source_range() {
        let grid = Array2::from_shape_vec((1, 3), vec![-2.0, 0.0, 6.0]).unwrap();
        let out = normalize(grid);
        assert_eq!(out.source_range(), (-2.0, 6.0));
        assert!((out.values()[[0, 1]] - 0.25).abs() < f64::EPSILON);
    }
}
