//! Quadrant shifts between DFT order and centered order.
//!
//! A DFT places the zero-frequency term at index `(0, 0)`. Radial
//! masking needs it at the geometric center, so the forward path rolls
//! each axis of length `n` forward by `n / 2` ([`fftshift`]) and the
//! inverse path rolls it forward by `n - n / 2` ([`ifftshift`]). For even
//! `n` both rolls are the same half-swap; for odd `n` only this pairing
//! is an exact inverse.

use ndarray::Array2;

/// Move the zero-frequency term from `(0, 0)` to `(H / 2, W / 2)`.
#[must_use = "returns the shifted grid"]
pub fn fftshift<T: Clone>(grid: &Array2<T>) -> Array2<T> {
    let (rows, cols) = grid.dim();
    roll(grid, rows / 2, cols / 2)
}

/// Move the term at `(H / 2, W / 2)` back to `(0, 0)`.
///
/// Exact inverse of [`fftshift`] for every grid size.
#[must_use = "returns the shifted grid"]
pub fn ifftshift<T: Clone>(grid: &Array2<T>) -> Array2<T> {
    let (rows, cols) = grid.dim();
    roll(grid, rows - rows / 2, cols - cols / 2)
}

/// Cyclically roll a grid so that element `(r, c)` lands at
/// `((r + down) mod H, (c + right) mod W)`.
fn roll<T: Clone>(grid: &Array2<T>, down: usize, right: usize) -> Array2<T> {
    let (rows, cols) = grid.dim();
    if rows == 0 || cols == 0 {
        return grid.clone();
    }
    let (down, right) = (down % rows, right % cols);
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        grid[[(r + rows - down) % rows, (c + cols - right) % cols]].clone()
    })
}
