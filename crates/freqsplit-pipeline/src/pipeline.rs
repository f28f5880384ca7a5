//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::decompose`] which runs everything in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use freqsplit_pipeline::{DecomposeConfig, Pipeline, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let config = DecomposeConfig::default();
//! let decomposition = Pipeline::new(png, config)
//!     .load()?
//!     .transform()
//!     .build_masks()?
//!     .reconstruct()?
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates forward so the final [`Decomposition`] can feed every
//! display panel.

use crate::diagnostics::StageMetrics;
use crate::types::{
    DecomposeConfig, Decomposition, Dimensions, Image, LogMagnitude, MaskSet, PipelineError,
    ReconstructedImage, Spectrum,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`load`](Self::load) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing: call .load() to continue"]
pub struct Pending {
    config: DecomposeConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the config, decode, optionally resize, and scale into
    /// `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an unusable config,
    /// [`PipelineError::EmptyInput`] if the source bytes are empty, and
    /// [`PipelineError::ImageDecode`] if the image cannot be decoded.
    pub fn load(self) -> Result<Loaded, PipelineError> {
        self.config.validate()?;
        let gray = crate::grayscale::decode_and_grayscale(&self.source)?;
        let source_dimensions = Dimensions {
            width: gray.width(),
            height: gray.height(),
        };
        let gray = match self.config.target_size {
            Some(target) => crate::grayscale::resize(&gray, target, self.config.resize_filter),
            None => gray,
        };
        let resized = (gray.width(), gray.height())
            != (source_dimensions.width, source_dimensions.height);
        let image = Image::from_gray(&gray)?;

        tracing::debug!(
            input_bytes = self.source.len(),
            source = %source_dimensions,
            shape = %image.shape(),
            resized,
            "loaded image"
        );

        Ok(Loaded {
            config: self.config,
            image,
            input_bytes: self.source.len(),
            source_dimensions: Some(source_dimensions),
            resized,
        })
    }
}

// ───────────────────────── Stage 1: Loaded ───────────────────────────

/// Pipeline state holding the `[0, 1]` image grid.
///
/// Call [`transform`](Self::transform) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing: call .transform() to continue"]
pub struct Loaded {
    config: DecomposeConfig,
    image: Image,
    input_bytes: usize,
    /// `None` when the pipeline started from an in-memory [`Image`].
    source_dimensions: Option<Dimensions>,
    resized: bool,
}

impl Loaded {
    /// The image grid.
    #[must_use]
    pub const fn image(&self) -> &Image {
        &self.image
    }

    /// Load-stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let shape = self.image.shape();
        let (source_width, source_height) = self.source_dimensions.map_or(
            (shape.width, shape.height),
            |d| (d.width as usize, d.height as usize),
        );
        StageMetrics::Load {
            input_bytes: self.input_bytes,
            source_width,
            source_height,
            width: shape.width,
            height: shape.height,
            resized: self.resized,
        }
    }

    /// Advance to the transform stage.
    pub fn transform(self) -> Transformed {
        let (spectrum, log_magnitude) = crate::spectrum::transform(&self.image);
        tracing::debug!(shape = %spectrum.shape(), "computed centered spectrum");
        Transformed {
            config: self.config,
            image: self.image,
            spectrum,
            log_magnitude,
        }
    }
}

// ───────────────────────── Stage 2: Transformed ──────────────────────

/// Pipeline state after the forward transform.
///
/// Call [`build_masks`](Self::build_masks) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing: call .build_masks() to continue"]
pub struct Transformed {
    config: DecomposeConfig,
    image: Image,
    spectrum: Spectrum,
    log_magnitude: LogMagnitude,
}

impl Transformed {
    /// The centered spectrum.
    #[must_use]
    pub const fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    /// `ln(1 + |spectrum|)`.
    #[must_use]
    pub const fn log_magnitude(&self) -> &LogMagnitude {
        &self.log_magnitude
    }

    /// Transform-stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let center = self.spectrum.shape().center();
        let dc_magnitude = self.spectrum.values()[[center.row, center.col]].norm();
        let peak_log_magnitude = self
            .log_magnitude
            .values()
            .iter()
            .copied()
            .fold(0.0, f64::max);
        StageMetrics::Transform {
            dc_magnitude,
            peak_log_magnitude,
        }
    }

    /// Advance to the mask stage.
    ///
    /// Fractions outside `(0, 1)` or an inverted pair are logged as a
    /// warning and used as given.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidGeometry`] if the spectrum has a
    /// zero dimension.
    pub fn build_masks(self) -> Result<Masked, PipelineError> {
        if !self.config.has_ordered_fractions() {
            tracing::warn!(
                low_radius_frac = self.config.low_radius_frac,
                high_radius_frac = self.config.high_radius_frac,
                "radius fractions are outside (0, 1) or not ordered low < high; masks may be empty, full, or overlapping"
            );
        }
        let masks = crate::mask::build_masks(
            self.spectrum.shape(),
            self.config.low_radius_frac,
            self.config.high_radius_frac,
        )?;
        Ok(Masked {
            image: self.image,
            spectrum: self.spectrum,
            log_magnitude: self.log_magnitude,
            masks,
        })
    }
}

// ───────────────────────── Stage 3: Masked ───────────────────────────

/// Pipeline state after mask construction.
///
/// Call [`reconstruct`](Self::reconstruct) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing: call .reconstruct() to continue"]
pub struct Masked {
    image: Image,
    spectrum: Spectrum,
    log_magnitude: LogMagnitude,
    masks: MaskSet,
}

impl Masked {
    /// The low-pass and high-pass masks.
    #[must_use]
    pub const fn masks(&self) -> &MaskSet {
        &self.masks
    }

    /// Mask-stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Masks {
            low_radius_px: self.masks.geometry.low_radius_px,
            high_radius_px: self.masks.geometry.high_radius_px,
            low_kept: self.masks.low.kept(),
            high_kept: self.masks.high.kept(),
            overlap: self.masks.overlap(),
            total: self.spectrum.shape().len(),
        }
    }

    /// Reconstruct the low-pass and high-pass images.
    ///
    /// The two reconstructions only read the spectrum, so their order
    /// does not matter.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShapeMismatch`] if a mask does not match
    /// the spectrum.
    pub fn reconstruct(self) -> Result<Reconstructed, PipelineError> {
        let low = crate::reconstruct::reconstruct(&self.spectrum, &self.masks.low)?;
        let high = crate::reconstruct::reconstruct(&self.spectrum, &self.masks.high)?;
        tracing::debug!(
            low_flat = low.is_flat(),
            high_flat = high.is_flat(),
            "reconstructed low and high bands"
        );
        Ok(Reconstructed {
            image: self.image,
            spectrum: self.spectrum,
            log_magnitude: self.log_magnitude,
            masks: self.masks,
            low,
            high,
        })
    }
}

// ───────────────────────── Stage 4: Reconstructed ────────────────────

/// Final pipeline state.
///
/// Call [`into_result`](Self::into_result) to take the [`Decomposition`].
#[must_use = "call .into_result() to take the decomposition"]
pub struct Reconstructed {
    image: Image,
    spectrum: Spectrum,
    log_magnitude: LogMagnitude,
    masks: MaskSet,
    low: ReconstructedImage,
    high: ReconstructedImage,
}

impl Reconstructed {
    /// The low-pass reconstruction.
    #[must_use]
    pub const fn low(&self) -> &ReconstructedImage {
        &self.low
    }

    /// The high-pass reconstruction.
    #[must_use]
    pub const fn high(&self) -> &ReconstructedImage {
        &self.high
    }

    /// Reconstruct-stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Reconstruct {
            low_range: self.low.source_range(),
            high_range: self.high.source_range(),
            low_flat: self.low.is_flat(),
            high_flat: self.high.is_flat(),
        }
    }

    /// Consume the pipeline and return every intermediate.
    #[must_use]
    pub fn into_result(self) -> Decomposition {
        Decomposition {
            image: self.image,
            spectrum: self.spectrum,
            log_magnitude: self.log_magnitude,
            masks: self.masks,
            low: self.low,
            high: self.high,
        }
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental decomposition pipeline.
///
/// Start from encoded bytes with [`Pipeline::new`] or from an in-memory
/// grid with [`Pipeline::from_image`]. Each stage method consumes the
/// current state and returns the next, making it a compile-time error to
/// skip stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    ///
    /// No processing is performed until [`.load()`](Pending::load).
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: DecomposeConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }

    /// Start from an already loaded image, skipping decode and resize.
    ///
    /// `config.target_size` is ignored on this path.
    pub const fn from_image(image: Image, config: DecomposeConfig) -> Loaded {
        Loaded {
            config,
            image,
            input_bytes: 0,
            source_dimensions: None,
            resized: false,
        }
    }
}
