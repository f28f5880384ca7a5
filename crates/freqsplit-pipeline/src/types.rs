//! Shared types for the freqsplit decomposition pipeline.

use std::fmt;

use ndarray::{Array2, Zip};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference decoded
/// raster data without depending on `image` directly.
pub use image::GrayImage;

/// Image dimensions in pixels, in the `image` crate's width-first order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Grid shape in `(rows, columns)` order, matching array indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    /// Number of rows (H).
    pub height: usize,
    /// Number of columns (W).
    pub width: usize,
}

impl Shape {
    /// Create a new shape.
    #[must_use]
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Shape of an existing grid.
    #[must_use]
    pub fn of<T>(grid: &Array2<T>) -> Self {
        let (height, width) = grid.dim();
        Self { height, width }
    }

    /// `true` if either dimension is zero.
    #[must_use]
    pub const fn is_degenerate(self) -> bool {
        self.height == 0 || self.width == 0
    }

    /// Total number of grid cells.
    #[must_use]
    pub const fn len(self) -> usize {
        self.height * self.width
    }

    /// Location of the zero-frequency term after centering: `(H / 2, W / 2)`
    /// with floor division.
    #[must_use]
    pub const fn center(self) -> Center {
        Center {
            row: self.height / 2,
            col: self.width / 2,
        }
    }

    /// Radius of the largest circle centered in the grid: `min(H, W) / 2`.
    ///
    /// Radius fractions are relative to this value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn max_radius(self) -> f64 {
        self.height.min(self.width) as f64 / 2.0
    }

    /// Fail with [`PipelineError::InvalidGeometry`] if either dimension is zero.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidGeometry`] for a degenerate shape.
    pub fn ensure_valid(self) -> Result<Self, PipelineError> {
        if self.is_degenerate() {
            return Err(PipelineError::InvalidGeometry {
                height: self.height,
                width: self.width,
            });
        }
        Ok(self)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Grid index of the centered zero-frequency term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Center {
    /// Row index (`H / 2`).
    pub row: usize,
    /// Column index (`W / 2`).
    pub col: usize,
}

/// A real-valued grayscale image, one sample per pixel.
///
/// Samples produced by [`Image::from_gray`] lie in `[0, 1]`. Every
/// sample is finite and both dimensions are at least 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Image(Array2<f64>);

impl Image {
    /// Wrap an existing grid.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidGeometry`] if the grid has a zero
    /// dimension, or [`PipelineError::NonFiniteSample`] for the first
    /// NaN or infinite sample in row-major order.
    pub fn from_grid(grid: Array2<f64>) -> Result<Self, PipelineError> {
        Shape::of(&grid).ensure_valid()?;
        if let Some(((row, col), _)) = grid.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(PipelineError::NonFiniteSample { row, col });
        }
        Ok(Self(grid))
    }

    /// Convert an 8-bit grayscale raster into `[0, 1]` samples (`p / 255`).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidGeometry`] for an empty raster.
    pub fn from_gray(gray: &GrayImage) -> Result<Self, PipelineError> {
        let shape = Shape::new(gray.height() as usize, gray.width() as usize).ensure_valid()?;
        let samples = gray
            .as_raw()
            .iter()
            .map(|&p| f64::from(p) / 255.0)
            .collect();
        let grid = Array2::from_shape_vec((shape.height, shape.width), samples).map_err(|_| {
            PipelineError::InvalidGeometry {
                height: shape.height,
                width: shape.width,
            }
        })?;
        Ok(Self(grid))
    }

    /// Grid shape.
    #[must_use]
    pub fn shape(&self) -> Shape {
        Shape::of(&self.0)
    }

    /// The samples.
    #[must_use]
    pub const fn values(&self) -> &Array2<f64> {
        &self.0
    }

    /// Consume the image and return its samples.
    #[must_use]
    pub fn into_values(self) -> Array2<f64> {
        self.0
    }
}

/// Centered complex spectrum: the 2D DFT of an [`Image`] with the
/// zero-frequency term moved to [`Shape::center`].
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum(Array2<Complex64>);

impl Spectrum {
    /// Wrap an already centered spectrum grid.
    #[must_use]
    pub const fn from_centered(grid: Array2<Complex64>) -> Self {
        Self(grid)
    }

    /// Grid shape.
    #[must_use]
    pub fn shape(&self) -> Shape {
        Shape::of(&self.0)
    }

    /// The centered coefficients.
    #[must_use]
    pub const fn values(&self) -> &Array2<Complex64> {
        &self.0
    }

    /// Multiply every coefficient by the corresponding mask value.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShapeMismatch`] if the mask shape differs
    /// from the spectrum shape.
    pub fn masked(&self, mask: &Mask) -> Result<Self, PipelineError> {
        let expected = self.shape();
        let actual = mask.shape();
        if expected != actual {
            return Err(PipelineError::ShapeMismatch { expected, actual });
        }
        let grid = Zip::from(&self.0)
            .and(&mask.0)
            .map_collect(|&coefficient, &keep| coefficient * keep);
        Ok(Self(grid))
    }
}

/// `ln(1 + |F|)` of a centered spectrum. Display only.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMagnitude(Array2<f64>);

impl LogMagnitude {
    /// Compute the log-magnitude of a centered spectrum.
    #[must_use]
    pub fn of(spectrum: &Spectrum) -> Self {
        Self(spectrum.values().mapv(|v| v.norm().ln_1p()))
    }

    /// Grid shape.
    #[must_use]
    pub fn shape(&self) -> Shape {
        Shape::of(&self.0)
    }

    /// The log-magnitude values.
    #[must_use]
    pub const fn values(&self) -> &Array2<f64> {
        &self.0
    }
}

/// Binary frequency selector: `1.0` keeps a coefficient, `0.0` rejects it.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask(Array2<f64>);

impl Mask {
    /// Build a mask by evaluating `keep` at every grid position.
    pub fn from_fn(shape: Shape, mut keep: impl FnMut(usize, usize) -> bool) -> Self {
        Self(Array2::from_shape_fn(
            (shape.height, shape.width),
            |(row, col)| if keep(row, col) { 1.0 } else { 0.0 },
        ))
    }

    /// A mask that keeps every coefficient.
    #[must_use]
    pub fn keep_all(shape: Shape) -> Self {
        Self(Array2::ones((shape.height, shape.width)))
    }

    /// Grid shape.
    #[must_use]
    pub fn shape(&self) -> Shape {
        Shape::of(&self.0)
    }

    /// The mask values.
    #[must_use]
    pub const fn values(&self) -> &Array2<f64> {
        &self.0
    }

    /// Number of kept positions.
    #[must_use]
    pub fn kept(&self) -> usize {
        self.0.iter().filter(|&&v| v > 0.0).count()
    }
}

/// Absolute mask radii and the shared center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskGeometry {
    /// Low-pass radius in pixels.
    pub low_radius_px: f64,
    /// High-pass radius in pixels.
    pub high_radius_px: f64,
    /// Center both radii are measured from.
    pub center: Center,
}

/// Low-pass and high-pass masks built for one shape and radius pair.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskSet {
    /// Keeps frequencies within `low_radius_px` of the center.
    pub low: Mask,
    /// Keeps frequencies at least `high_radius_px` from the center.
    pub high: Mask,
    /// Radii and center.
    pub geometry: MaskGeometry,
}

impl MaskSet {
    /// Elementwise `low + high`, for display. Values are 0, 1, or 2
    /// (2 where the masks overlap).
    #[must_use]
    pub fn combined(&self) -> Array2<f64> {
        &self.low.0 + &self.high.0
    }

    /// Number of positions kept by both masks.
    #[must_use]
    pub fn overlap(&self) -> usize {
        Zip::from(&self.low.0)
            .and(&self.high.0)
            .fold(0, |n, &low, &high| n + usize::from(low > 0.0 && high > 0.0))
    }
}

/// A spatial reconstruction rescaled into `[0, 1]`.
///
/// Also records the range of the real reconstruction before rescaling.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedImage {
    values: Array2<f64>,
    source_min: f64,
    source_max: f64,
}

impl ReconstructedImage {
    pub(crate) const fn new(values: Array2<f64>, source_min: f64, source_max: f64) -> Self {
        Self {
            values,
            source_min,
            source_max,
        }
    }

    /// Grid shape.
    #[must_use]
    pub fn shape(&self) -> Shape {
        Shape::of(&self.values)
    }

    /// Normalized samples in `[0, 1]`.
    #[must_use]
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// `(min, max)` of the real reconstruction before rescaling.
    #[must_use]
    pub const fn source_range(&self) -> (f64, f64) {
        (self.source_min, self.source_max)
    }

    /// `true` if the reconstruction had zero variance and was zeroed.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.source_max.partial_cmp(&self.source_min) != Some(std::cmp::Ordering::Greater)
    }
}

/// Resampling filter used when resizing to a target size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom).
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with 3 lobes.
    Lanczos3,
}

impl ResizeFilter {
    /// Convert to the `image` crate's `FilterType`.
    pub(crate) const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Configuration for a decomposition run.
///
/// Radius fractions are relative to `min(H, W) / 2` and are deliberately
/// not range-checked: values outside `(0, 1)` or an inverted pair produce
/// degenerate (all-zero, all-one, or overlapping) masks rather than an
/// error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposeConfig {
    /// Low-pass radius as a fraction of `min(H, W) / 2`.
    pub low_radius_frac: f64,

    /// High-pass radius as a fraction of `min(H, W) / 2`.
    pub high_radius_frac: f64,

    /// Resize the decoded image to exactly this size before transforming.
    /// `None` keeps the source size.
    pub target_size: Option<Dimensions>,

    /// Filter used when `target_size` is set.
    pub resize_filter: ResizeFilter,
}

impl DecomposeConfig {
    /// Default low-pass radius fraction.
    pub const DEFAULT_LOW_RADIUS_FRAC: f64 = 0.12;
    /// Default high-pass radius fraction.
    pub const DEFAULT_HIGH_RADIUS_FRAC: f64 = 0.28;
    /// Default resize filter.
    pub const DEFAULT_RESIZE_FILTER: ResizeFilter = ResizeFilter::Triangle;

    /// Check the parts of the config that would make a run impossible.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `target_size` has a
    /// zero dimension.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Some(size) = self.target_size
            && (size.width == 0 || size.height == 0)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "target size must be non-zero, got {size}"
            )));
        }
        Ok(())
    }

    /// `true` if both fractions lie in `(0, 1)` and low < high.
    ///
    /// Configs failing this check still run; the pipeline logs a warning.
    #[must_use]
    pub fn has_ordered_fractions(&self) -> bool {
        let in_range = |f: f64| f > 0.0 && f < 1.0;
        in_range(self.low_radius_frac)
            && in_range(self.high_radius_frac)
            && self.low_radius_frac < self.high_radius_frac
    }
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            low_radius_frac: Self::DEFAULT_LOW_RADIUS_FRAC,
            high_radius_frac: Self::DEFAULT_HIGH_RADIUS_FRAC,
            target_size: None,
            resize_filter: Self::DEFAULT_RESIZE_FILTER,
        }
    }
}

/// Every product of one decomposition run.
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// The input image.
    pub image: Image,
    /// Centered spectrum of `image`.
    pub spectrum: Spectrum,
    /// `ln(1 + |spectrum|)`.
    pub log_magnitude: LogMagnitude,
    /// Masks and their geometry.
    pub masks: MaskSet,
    /// Low-pass reconstruction (coarse structure).
    pub low: ReconstructedImage,
    /// High-pass reconstruction (edges and noise).
    pub high: ReconstructedImage,
}

/// Errors that can occur during decomposition.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A grid has a zero dimension.
    #[error("invalid grid geometry {height}x{width}: both dimensions must be at least 1")]
    InvalidGeometry {
        /// Number of rows.
        height: usize,
        /// Number of columns.
        width: usize,
    },

    /// An image sample is NaN or infinite.
    #[error("non-finite sample at row {row}, column {col}")]
    NonFiniteSample {
        /// Row of the offending sample.
        row: usize,
        /// Column of the offending sample.
        col: usize,
    },

    /// A mask does not match the spectrum it is applied to.
    #[error("mask shape {actual} does not match spectrum shape {expected}")]
    ShapeMismatch {
        /// Spectrum shape.
        expected: Shape,
        /// Mask shape.
        actual: Shape,
    },

    /// Configuration is invalid.
    #[error("invalid decomposition configuration: {0}")]
    InvalidConfig(String),
}
