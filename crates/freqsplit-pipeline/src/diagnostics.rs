//! Pipeline diagnostics: timing and per-stage metrics.
//!
//! Every call to [`decompose_with_diagnostics`] collects diagnostics
//! alongside the decomposition. Timestamps come from a caller-supplied
//! [`Clock`] so this crate never reads the system clock itself.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::types::{DecomposeConfig, Decomposition, PipelineError};

/// Source of timestamps for stage timing.
///
/// Native callers wrap `std::time::Instant`; tests use a fake clock that
/// advances by a fixed step.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single decomposition run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeDiagnostics {
    /// Stage 1: decode, grayscale, optional resize.
    pub load: StageDiagnostics,
    /// Stage 2: forward transform and centering.
    pub transform: StageDiagnostics,
    /// Stage 3: mask construction.
    pub masks: StageDiagnostics,
    /// Stage 4: low-pass and high-pass reconstruction.
    pub reconstruct: StageDiagnostics,
    /// Total wall-clock duration of the entire run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary across all stages.
    pub summary: DecomposeSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image loading metrics.
    Load {
        /// Size of the input image bytes (0 for an in-memory image).
        input_bytes: usize,
        /// Decoded width before resizing.
        source_width: usize,
        /// Decoded height before resizing.
        source_height: usize,
        /// Grid width after resizing.
        width: usize,
        /// Grid height after resizing.
        height: usize,
        /// Whether a resize changed the size.
        resized: bool,
    },
    /// Forward transform metrics.
    Transform {
        /// Magnitude of the zero-frequency term.
        dc_magnitude: f64,
        /// Largest `ln(1 + |F|)` value.
        peak_log_magnitude: f64,
    },
    /// Mask construction metrics.
    Masks {
        /// Low-pass radius in pixels.
        low_radius_px: f64,
        /// High-pass radius in pixels.
        high_radius_px: f64,
        /// Positions kept by the low-pass mask.
        low_kept: usize,
        /// Positions kept by the high-pass mask.
        high_kept: usize,
        /// Positions kept by both.
        overlap: usize,
        /// Total grid positions.
        total: usize,
    },
    /// Reconstruction metrics.
    Reconstruct {
        /// `(min, max)` of the raw low-pass reconstruction.
        low_range: (f64, f64),
        /// `(min, max)` of the raw high-pass reconstruction.
        high_range: (f64, f64),
        /// Low-pass output had zero variance.
        low_flat: bool,
        /// High-pass output had zero variance.
        high_flat: bool,
    },
}

/// High-level summary for the entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeSummary {
    /// Grid width in pixels.
    pub width: usize,
    /// Grid height in pixels.
    pub height: usize,
    /// Low-pass radius fraction used.
    pub low_radius_frac: f64,
    /// High-pass radius fraction used.
    pub high_radius_frac: f64,
    /// Fraction of the spectrum kept by the low-pass mask.
    pub low_coverage: f64,
    /// Fraction of the spectrum kept by the high-pass mask.
    pub high_coverage: f64,
}

impl DecomposeDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Decomposition Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}  |  low_frac={:.3} high_frac={:.3}",
            self.summary.width,
            self.summary.height,
            self.summary.low_radius_frac,
            self.summary.high_radius_frac,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Load", &self.load),
            ("Transform", &self.transform),
            ("Masks", &self.masks),
            ("Reconstruct", &self.reconstruct),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Low band keeps {:.1}% of the spectrum  |  High band keeps {:.1}%",
            self.summary.low_coverage * 100.0,
            self.summary.high_coverage * 100.0,
        ));

        lines.join("\n")
    }
}

/// Run the full decomposition, timing each stage with `clock`.
///
/// # Errors
///
/// Same as [`crate::decompose`].
pub fn decompose_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &DecomposeConfig,
    clock: &C,
) -> Result<(Decomposition, DecomposeDiagnostics), PipelineError> {
    let run_start = clock.now();

    let start = clock.now();
    let loaded = Pipeline::new(image_bytes.to_vec(), config.clone()).load()?;
    let load = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: loaded.metrics(),
    };

    let start = clock.now();
    let transformed = loaded.transform();
    let transform = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: transformed.metrics(),
    };

    let start = clock.now();
    let masked = transformed.build_masks()?;
    let masks = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: masked.metrics(),
    };

    let start = clock.now();
    let reconstructed = masked.reconstruct()?;
    let reconstruct = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: reconstructed.metrics(),
    };

    let decomposition = reconstructed.into_result();
    let total_duration = clock.elapsed(&run_start);

    let shape = decomposition.image.shape();
    let summary = DecomposeSummary {
        width: shape.width,
        height: shape.height,
        low_radius_frac: config.low_radius_frac,
        high_radius_frac: config.high_radius_frac,
        low_coverage: coverage(decomposition.masks.low.kept(), shape.len()),
        high_coverage: coverage(decomposition.masks.high.kept(), shape.len()),
    };

    tracing::debug!(
        total_ms = duration_ms(total_duration),
        "decomposition finished"
    );

    Ok((
        decomposition,
        DecomposeDiagnostics {
            load,
            transform,
            masks,
            reconstruct,
            total_duration,
            summary,
        },
    ))
}

#[allow(clippy::cast_precision_loss)]
fn coverage(kept: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        kept as f64 / total as f64
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Load {
            input_bytes,
            source_width,
            source_height,
            width,
            height,
            resized,
        } => {
            if *resized {
                format!("{input_bytes} bytes -> {source_width}x{source_height} -> {width}x{height}")
            } else {
                format!("{input_bytes} bytes -> {width}x{height}")
            }
        }
        StageMetrics::Transform {
            dc_magnitude,
            peak_log_magnitude,
        } => format!("|DC|={dc_magnitude:.3} peak_log={peak_log_magnitude:.3}"),
        StageMetrics::Masks {
            low_radius_px,
            high_radius_px,
            low_kept,
            high_kept,
            overlap,
            total,
        } => format!(
            "r_low={low_radius_px:.2}px r_high={high_radius_px:.2}px low={low_kept}/{total} high={high_kept}/{total} overlap={overlap}",
        ),
        StageMetrics::Reconstruct {
            low_range,
            high_range,
            low_flat,
            high_flat,
        } => {
            let flag = |flat: bool| if flat { " (flat)" } else { "" };
            format!(
                "low=[{:.4}, {:.4}]{} high=[{:.4}, {:.4}]{}",
                low_range.0,
                low_range.1,
                flag(*low_flat),
                high_range.0,
                high_range.1,
                flag(*high_flat),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Clock that advances one millisecond every time it is read.
    struct StepClock {
        ticks: Cell<u64>,
    }

    impl StepClock {
        const fn new() -> Self {
            Self {
                ticks: Cell::new(0),
            }
        }
    }

    impl Clock for StepClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn checker_png(size: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(size, size, |x, y| {
            if (x / 2 + y / 2) % 2 == 0 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn stages_are_timed_with_the_supplied_clock() {
        let clock = StepClock::new();
        let (_, diag) =
            decompose_with_diagnostics(&checker_png(16), &DecomposeConfig::default(), &clock)
                .unwrap();
        // Each stage reads the clock twice: start and elapsed.
        for stage in [&diag.load, &diag.transform, &diag.masks, &diag.reconstruct] {
            assert_eq!(stage.duration, Duration::from_millis(1));
        }
        assert!(diag.total_duration > diag.load.duration);
    }

    #[test]
    fn metrics_describe_the_run() {
        let (result, diag) = decompose_with_diagnostics(
            &checker_png(16),
            &DecomposeConfig::default(),
            &StepClock::new(),
        )
        .unwrap();

        assert_eq!(diag.summary.width, 16);
        assert_eq!(diag.summary.height, 16);
        assert!(matches!(
            diag.load.metrics,
            StageMetrics::Load {
                width: 16,
                height: 16,
                resized: false,
                ..
            }
        ));
        match diag.masks.metrics {
            StageMetrics::Masks {
                low_kept, total, ..
            } => {
                assert_eq!(low_kept, result.masks.low.kept());
                assert_eq!(total, 256);
            }
            ref other => unreachable!("unexpected metrics {other:?}"),
        }
        assert!(diag.summary.low_coverage > 0.0 && diag.summary.low_coverage < 1.0);
    }

    #[test]
    fn errors_propagate() {
        let result =
            decompose_with_diagnostics(&[], &DecomposeConfig::default(), &StepClock::new());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn report_lists_every_stage() {
        let (_, diag) = decompose_with_diagnostics(
            &checker_png(8),
            &DecomposeConfig::default(),
            &StepClock::new(),
        )
        .unwrap();
        let report = diag.report();
        assert!(report.contains("Decomposition Diagnostics Report"));
        for name in ["Load", "Transform", "Masks", "Reconstruct"] {
            assert!(report.contains(name), "missing {name} in report");
        }
        assert!(report.contains("8x8"));
    }

    #[test]
    fn format_reconstruct_marks_flat_bands() {
        let details = format_metrics(&StageMetrics::Reconstruct {
            low_range: (0.5, 0.5),
            high_range: (-0.25, 0.75),
            low_flat: true,
            high_flat: false,
        });
        assert_eq!(
            details,
            "low=[0.5000, 0.5000] (flat) high=[-0.2500, 0.7500]"
        );
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let (_, diag) = decompose_with_diagnostics(
            &checker_png(8),
            &DecomposeConfig::default(),
            &StepClock::new(),
        )
        .unwrap();
        let json = serde_json::to_value(&diag).unwrap();
        let seconds = json["load"]["duration"].as_f64().unwrap();
        assert!((seconds - 0.001).abs() < 1e-12);

        let back: DecomposeDiagnostics = serde_json::from_value(json).unwrap();
        assert!((back.load.duration.as_secs_f64() - 0.001).abs() < 1e-9);
        assert_eq!(back.masks.metrics, diag.masks.metrics);
    }
}
