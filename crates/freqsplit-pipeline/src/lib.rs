//! freqsplit-pipeline: Frequency-domain band split of grayscale images (sans-IO).
//!
//! Splits an image into a low-pass (coarse structure) and a high-pass
//! (edges and noise) reconstruction through:
//! decode -> grayscale -> optional resize -> 2D FFT -> centering shift ->
//! radial masks -> masked inverse FFT -> min-max normalization.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! byte slices and grids and returns structured data. File access and
//! rendering live in `freqsplit-cli` and `freqsplit-render`.

pub mod diagnostics;
pub mod grayscale;
pub mod mask;
pub mod pipeline;
pub mod reconstruct;
pub mod shift;
pub mod spectrum;
pub mod types;

pub use diagnostics::{
    Clock, DecomposeDiagnostics, DecomposeSummary, StageDiagnostics, StageMetrics,
    decompose_with_diagnostics,
};
pub use mask::build_masks;
pub use pipeline::Pipeline;
pub use reconstruct::reconstruct;
pub use spectrum::transform;
pub use types::{
    Center, DecomposeConfig, Decomposition, Dimensions, GrayImage, Image, LogMagnitude, Mask,
    MaskGeometry, MaskSet, PipelineError, ReconstructedImage, ResizeFilter, Shape, Spectrum,
};

/// Run the full decomposition on encoded image bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration,
/// then produces a [`Decomposition`] holding the image, its centered
/// spectrum and log-magnitude, both masks, and both reconstructions.
///
/// # Pipeline steps
///
/// 1. Decode, convert to grayscale, optionally resize, scale to `[0, 1]`
/// 2. Forward 2D FFT and centering shift
/// 3. Low-pass and high-pass radial masks
/// 4. Masked inverse FFT and min-max normalization, once per mask
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a zero target size.
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
pub fn decompose(
    image_bytes: &[u8],
    config: &DecomposeConfig,
) -> Result<Decomposition, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .load()?
        .transform()
        .build_masks()?
        .reconstruct()?
        .into_result())
}

/// Run the decomposition on an already loaded image.
///
/// `config.target_size` and `config.resize_filter` are ignored.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidGeometry`] or
/// [`PipelineError::ShapeMismatch`] if the grids are inconsistent, which
/// a valid [`Image`] never produces.
pub fn decompose_image(
    image: Image,
    config: &DecomposeConfig,
) -> Result<Decomposition, PipelineError> {
    Ok(Pipeline::from_image(image, config.clone())
        .transform()
        .build_masks()?
        .reconstruct()?
        .into_result())
}
