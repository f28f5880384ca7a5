//! Forward and inverse 2D discrete Fourier transforms.
//!
//! Wraps [`rustfft`] 1D plans into separable 2D transforms: every row is
//! transformed, then every column. The scaling convention matches the
//! usual `fft2`/`ifft2` pair: the forward transform is unnormalized and
//! the inverse divides by `H * W`, so a forward/inverse round trip is the
//! identity up to rounding.
//!
//! [`transform`] is the first numerical step of the pipeline: image in,
//! centered spectrum and log-magnitude out.

use std::sync::Arc;

use ndarray::{Array2, Axis};
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};

use crate::shift::fftshift;
use crate::types::{Image, LogMagnitude, Spectrum};

/// Transform an image into its centered spectrum and log-magnitude.
///
/// The zero-frequency term of the returned [`Spectrum`] sits at
/// [`Shape::center`](crate::Shape::center), the same center the mask
/// builder measures radii from.
#[must_use = "returns the centered spectrum and its log-magnitude"]
pub fn transform(image: &Image) -> (Spectrum, LogMagnitude) {
    let spectrum = Spectrum::from_centered(fftshift(&fft2(image.values())));
    let log_magnitude = LogMagnitude::of(&spectrum);
    (spectrum, log_magnitude)
}

/// Unnormalized forward 2D DFT of a real grid, in DFT order (zero
/// frequency at `(0, 0)`).
#[must_use]
pub fn fft2(grid: &Array2<f64>) -> Array2<Complex64> {
    let mut data = grid.mapv(|v| Complex64::new(v, 0.0));
    process_2d(&mut data, FftDirection::Forward);
    data
}

/// Inverse 2D DFT of a grid in DFT order, normalized by `1 / (H * W)`.
#[must_use]
pub fn ifft2(spectrum: &Array2<Complex64>) -> Array2<Complex64> {
    let mut data = spectrum.clone();
    if data.is_empty() {
        return data;
    }
    process_2d(&mut data, FftDirection::Inverse);
    #[allow(clippy::cast_precision_loss)]
    let scale = 1.0 / data.len() as f64;
    data.mapv_inplace(|v| v * scale);
    data
}

/// Run a 1D transform along every row and then every column.
fn process_2d(data: &mut Array2<Complex64>, direction: FftDirection) {
    if data.is_empty() {
        return;
    }
    let (rows, cols) = data.dim();
    let mut planner = FftPlanner::new();
    let row_fft = planner.plan_fft(cols, direction);
    let col_fft = planner.plan_fft(rows, direction);
    process_lanes(data, Axis(1), &row_fft);
    process_lanes(data, Axis(0), &col_fft);
}

/// Transform every lane that runs along `axis`.
///
/// Lanes are copied through a contiguous scratch buffer because column
/// lanes of a row-major array are strided.
fn process_lanes(data: &mut Array2<Complex64>, axis: Axis, fft: &Arc<dyn Fft<f64>>) {
    let mut buffer = vec![Complex64::default(); data.len_of(axis)];
    let mut scratch = vec![Complex64::default(); fft.get_inplace_scratch_len()];
    for mut lane in data.lanes_mut(axis) {
        for (slot, value) in buffer.iter_mut().zip(lane.iter()) {
            *slot = *value;
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);
        for (value, slot) in lane.iter_mut().zip(&buffer) {
            *value = *slot;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Shape;

    fn ramp_image(rows: usize, cols: usize) -> Image {
        #[allow(clippy::cast_precision_loss)]
        let grid = Array2::from_shape_fn((rows, cols), |(r, c)| ((r * 7 + c * 3) % 11) as f64 / 10.0);
        Image::from_grid(grid).unwrap()
    }

    #[test]
    fn fft2_ifft2_round_trip() {
        for (rows, cols) in [(8, 8), (5, 7), (1, 9), (6, 1)] {
            let image = ramp_image(rows, cols);
            let recovered = ifft2(&fft2(image.values()));
            for ((r, c), &v) in image.values().indexed_iter() {
                let back = recovered[[r, c]];
                assert!(
                    (back.re - v).abs() < 1e-12 && back.im.abs() < 1e-12,
                    "round trip failed at ({r}, {c}) for {rows}x{cols}: {back} vs {v}"
                );
            }
        }
    }

    #[test]
    fn fft2_dc_term_is_sum_of_samples() {
        let grid = Array2::from_elem((4, 6), 0.25);
        let spectrum = fft2(&grid);
        assert!((spectrum[[0, 0]].re - 6.0).abs() < 1e-12);
        assert!(spectrum[[0, 0]].im.abs() < 1e-12);
    }

    #[test]
    fn fft2_matches_direct_dft() {
        let image = ramp_image(3, 4);
        let spectrum = fft2(image.values());
        let (rows, cols) = (3.0, 4.0);
        for ((k, l), &got) in spectrum.indexed_iter() {
            let mut expected = Complex64::default();
            for ((m, n), &x) in image.values().indexed_iter() {
                #[allow(clippy::cast_precision_loss)]
                let phase = -2.0
                    * std::f64::consts::PI
                    * ((k * m) as f64 / rows + (l * n) as f64 / cols);
                expected += Complex64::from_polar(x, phase);
            }
            assert!(
                (got - expected).norm() < 1e-10,
                "coefficient ({k}, {l}): {got} vs {expected}"
            );
        }
    }

    #[test]
    fn transform_centers_constant_image_energy() {
        for (rows, cols) in [(4, 4), (5, 5), (3, 8), (7, 4), (1, 1), (2, 9)] {
            let image = Image::from_grid(Array2::from_elem((rows, cols), 0.5)).unwrap();
            let (spectrum, log_magnitude) = transform(&image);
            let center = Shape::new(rows, cols).center();

            let argmax = log_magnitude
                .values()
                .indexed_iter()
                .fold(((0, 0), f64::NEG_INFINITY), |best, (idx, &v)| {
                    if v > best.1 { (idx, v) } else { best }
                })
                .0;
            assert_eq!(argmax, (center.row, center.col), "{rows}x{cols}");

            #[allow(clippy::cast_precision_loss)]
            let expected_dc = 0.5 * (rows * cols) as f64;
            assert!((spectrum.values()[[center.row, center.col]].re - expected_dc).abs() < 1e-12);
        }
    }

    #[test]
    fn impulse_has_flat_unit_magnitude() {
        let mut grid = Array2::zeros((4, 4));
        grid[[2, 2]] = 1.0;
        let image = Image::from_grid(grid).unwrap();
        let (spectrum, log_magnitude) = transform(&image);
        for v in spectrum.values() {
            assert!((v.norm() - 1.0).abs() < 1e-12, "magnitude {}", v.norm());
        }
        for &v in log_magnitude.values() {
            assert!((v - std::f64::consts::LN_2).abs() < 1e-12);
        }
    }

    #[test]
    fn log_magnitude_matches_spectrum_shape() {
        let image = ramp_image(6, 10);
        let (spectrum, log_magnitude) = transform(&image);
        assert_eq!(spectrum.shape(), Shape::new(6, 10));
        assert_eq!(log_magnitude.shape(), spectrum.shape());
        assert!(log_magnitude.values().iter().all(|&v| v >= 0.0));
    }
}
