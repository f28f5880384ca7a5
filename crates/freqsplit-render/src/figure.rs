//! Composite 2x3 figure.
//!
//! Panel order, left to right and top to bottom:
//!
//! ```text
//! original | spectrum | rings
//! low      | high     | masks
//! ```

use image::{Rgb, RgbImage};

use crate::RenderError;
use crate::panel::{Panels, gray_to_rgb};

/// Spacing and background of the composite figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FigureLayout {
    /// Pixels between panels and around the outer edge.
    pub gutter: u32,
    /// Fill color behind the panels.
    pub background: Rgb<u8>,
}

impl FigureLayout {
    /// Default gutter width in pixels.
    pub const DEFAULT_GUTTER: u32 = 8;
    /// Default background (white).
    pub const DEFAULT_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
}

impl Default for FigureLayout {
    fn default() -> Self {
        Self {
            gutter: Self::DEFAULT_GUTTER,
            background: Self::DEFAULT_BACKGROUND,
        }
    }
}

/// Arrange the six panels into one RGB image.
///
/// # Errors
///
/// Returns [`RenderError::PanelSizeMismatch`] if the panels differ in
/// size, or [`RenderError::FigureTooLarge`] if the figure would not fit
/// in a `u32` raster.
pub fn compose_figure(panels: &Panels, layout: &FigureLayout) -> Result<RgbImage, RenderError> {
    let cells: [(&'static str, RgbImage); 6] = [
        ("original", gray_to_rgb(&panels.original)),
        ("spectrum", gray_to_rgb(&panels.spectrum)),
        ("rings", panels.rings.clone()),
        ("low", gray_to_rgb(&panels.low)),
        ("high", gray_to_rgb(&panels.high)),
        ("masks", gray_to_rgb(&panels.masks)),
    ];

    let expected = cells[0].1.dimensions();
    for (panel, image) in &cells {
        let actual = image.dimensions();
        if actual != expected {
            return Err(RenderError::PanelSizeMismatch {
                panel: *panel,
                expected,
                actual,
            });
        }
    }

    let (panel_width, panel_height) = expected;
    let width = span(3, panel_width, layout.gutter).ok_or(RenderError::FigureTooLarge)?;
    let height = span(2, panel_height, layout.gutter).ok_or(RenderError::FigureTooLarge)?;
    let mut canvas = RgbImage::from_pixel(width, height, layout.background);

    for (index, (_, image)) in cells.iter().enumerate() {
        let (row, col) = (index / 3, index % 3);
        // Both offsets are bounded by the spans computed above.
        let x = offset(col, panel_width, layout.gutter);
        let y = offset(row, panel_height, layout.gutter);
        image::imageops::replace(&mut canvas, image, i64::from(x), i64::from(y));
    }

    Ok(canvas)
}

/// Total extent of `count` panels with gutters on both sides and between.
fn span(count: u32, panel: u32, gutter: u32) -> Option<u32> {
    panel
        .checked_mul(count)?
        .checked_add(gutter.checked_mul(count + 1)?)
}

#[allow(clippy::cast_possible_truncation)]
fn offset(index: usize, panel: u32, gutter: u32) -> u32 {
    let index = index as u32;
    gutter + index * (panel + gutter)
}
