//! freqsplit: split an image into low- and high-frequency bands.
//!
//! Runs the decomposition on a given image file with configurable radius
//! fractions, prints per-stage diagnostics, and optionally writes the
//! rendered panels and the composite figure. Useful for:
//!
//! - Seeing what a radius pair keeps in each band
//! - Comparing resize filters before the transform
//! - Measuring per-stage durations on large images
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin freqsplit -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use freqsplit_pipeline::{Clock, DecomposeConfig, DecomposeDiagnostics, Decomposition, Dimensions, ResizeFilter};
use freqsplit_render::{FigureLayout, Panels};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

/// Frequency-domain band split of a grayscale image.
///
/// Transforms the image with a 2D FFT, keeps a disc of low frequencies
/// and everything outside a larger circle, and reconstructs both bands.
#[derive(Parser)]
#[command(name = "freqsplit", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Low-pass radius as a fraction of min(H, W) / 2.
    #[arg(long, default_value_t = DecomposeConfig::DEFAULT_LOW_RADIUS_FRAC, allow_negative_numbers = true)]
    low_frac: f64,

    /// High-pass radius as a fraction of min(H, W) / 2.
    #[arg(long, default_value_t = DecomposeConfig::DEFAULT_HIGH_RADIUS_FRAC, allow_negative_numbers = true)]
    high_frac: f64,

    /// Resize to exactly WxH before transforming (e.g. 256x256).
    #[arg(long, value_parser = parse_dimensions)]
    resize: Option<Dimensions>,

    /// Resize filter (nearest, triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    resize_filter: Filter,

    /// Write the 2x3 composite figure as PNG.
    #[arg(long)]
    figure: Option<PathBuf>,

    /// Write each panel as a separate PNG into this directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full decomposition config as a JSON string.
    ///
    /// When provided, all other decomposition parameter flags are ignored.
    /// The JSON must be a valid `DecomposeConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Resize filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation.
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

const fn filter_from_pipeline(f: ResizeFilter) -> Filter {
    match f {
        ResizeFilter::Nearest => Filter::Nearest,
        ResizeFilter::Triangle => Filter::Triangle,
        ResizeFilter::CatmullRom => Filter::CatmullRom,
        ResizeFilter::Gaussian => Filter::Gaussian,
        ResizeFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// The CLI default filter, derived from [`DecomposeConfig::DEFAULT_RESIZE_FILTER`]
/// so the two cannot silently diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(DecomposeConfig::DEFAULT_RESIZE_FILTER);

/// Parse `WxH` (also accepts `X` as the separator).
fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {s:?}"))?;
    let width: u32 = w.trim().parse().map_err(|e| format!("invalid width {w:?}: {e}"))?;
    let height: u32 = h.trim().parse().map_err(|e| format!("invalid height {h:?}: {e}"))?;
    if width == 0 || height == 0 {
        return Err(format!("dimensions must be non-zero, got {s:?}"));
    }
    Ok(Dimensions { width, height })
}

/// Build a [`DecomposeConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> CliResult<DecomposeConfig> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json)
            .map_err(|e| -> CliError { format!("Error parsing --config-json: {e}").into() });
    }

    Ok(DecomposeConfig {
        low_radius_frac: cli.low_frac,
        high_radius_frac: cli.high_frac,
        target_size: cli.resize,
        resize_filter: match cli.resize_filter {
            Filter::Nearest => ResizeFilter::Nearest,
            Filter::Triangle => ResizeFilter::Triangle,
            Filter::CatmullRom => ResizeFilter::CatmullRom,
            Filter::Gaussian => ResizeFilter::Gaussian,
            Filter::Lanczos3 => ResizeFilter::Lanczos3,
        },
    })
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config_from_cli(&cli)?;

    let image_bytes = std::fs::read(&cli.image_path).map_err(|e| -> CliError {
        format!("Error reading {}: {e}", cli.image_path.display()).into()
    })?;

    tracing::info!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    tracing::info!(
        "Config: low_frac={} high_frac={} resize={} filter={}",
        config.low_radius_frac,
        config.high_radius_frac,
        config
            .target_size
            .map_or_else(|| "none".to_owned(), |d| d.to_string()),
        config.resize_filter,
    );

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            tracing::info!("Run {}/{}", run + 1, cli.runs);
        }

        let (decomposition, diagnostics) =
            freqsplit_pipeline::decompose_with_diagnostics(&image_bytes, &config, &StdClock)?;

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        } else {
            println!("{}", diagnostics.report());
        }

        // Write images on the first run only.
        if run == 0 {
            write_outputs(&cli, &decomposition)?;
        }

        all_diagnostics.push(diagnostics);
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    Ok(())
}

/// Render and write the requested panel files and figure.
fn write_outputs(cli: &Cli, decomposition: &Decomposition) -> CliResult<()> {
    if cli.out_dir.is_none() && cli.figure.is_none() {
        return Ok(());
    }

    let panels = Panels::from_decomposition(decomposition)?;

    if let Some(ref dir) = cli.out_dir {
        std::fs::create_dir_all(dir)?;
        let gray_panels = [
            ("original.png", &panels.original),
            ("spectrum.png", &panels.spectrum),
            ("low.png", &panels.low),
            ("high.png", &panels.high),
            ("masks.png", &panels.masks),
        ];
        for (name, image) in gray_panels {
            write_file(&dir.join(name), &freqsplit_render::encode_gray_png(image)?)?;
        }
        write_file(
            &dir.join("rings.png"),
            &freqsplit_render::encode_png(&panels.rings)?,
        )?;
    }

    if let Some(ref path) = cli.figure {
        let figure = freqsplit_render::compose_figure(&panels, &FigureLayout::default())?;
        write_file(path, &freqsplit_render::encode_png(&figure)?)?;
    }

    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> CliResult<()> {
    std::fs::write(path, bytes)
        .map_err(|e| -> CliError { format!("Error writing {}: {e}", path.display()).into() })?;
    tracing::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&DecomposeDiagnostics) -> Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[DecomposeDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<16} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(32));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Load", |d| d.load.duration),
        ("Transform", |d| d.transform.duration),
        ("Masks", |d| d.masks.duration),
        ("Reconstruct", |d| d.reconstruct.duration),
    ];

    for (name, extractor) in stage_extractors {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<16} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_dimensions_accepts_both_separators() {
        assert_eq!(
            parse_dimensions("256x128").unwrap(),
            Dimensions {
                width: 256,
                height: 128
            }
        );
        assert_eq!(
            parse_dimensions("32X16").unwrap(),
            Dimensions {
                width: 32,
                height: 16
            }
        );
    }

    #[test]
    fn parse_dimensions_rejects_bad_input() {
        assert!(parse_dimensions("256").is_err());
        assert!(parse_dimensions("0x10").is_err());
        assert!(parse_dimensions("axb").is_err());
    }

    #[test]
    fn flags_build_config() {
        let cli = Cli::try_parse_from([
            "freqsplit",
            "in.png",
            "--low-frac",
            "0.2",
            "--high-frac",
            "0.5",
            "--resize",
            "64x32",
            "--resize-filter",
            "catmull-rom",
        ])
        .unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert!((config.low_radius_frac - 0.2).abs() < f64::EPSILON);
        assert!((config.high_radius_frac - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            config.target_size,
            Some(Dimensions {
                width: 64,
                height: 32
            })
        );
        assert_eq!(config.resize_filter, ResizeFilter::CatmullRom);
    }

    #[test]
    fn defaults_match_pipeline() {
        let cli = Cli::try_parse_from(["freqsplit", "in.png"]).unwrap();
        assert_eq!(config_from_cli(&cli).unwrap(), DecomposeConfig::default());
        assert_eq!(cli.runs, 1);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = Cli::try_parse_from([
            "freqsplit",
            "in.png",
            "--low-frac",
            "0.4",
            "--config-json",
            r#"{"low_radius_frac": 0.05, "high_radius_frac": 0.9}"#,
        ])
        .unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert!((config.low_radius_frac - 0.05).abs() < f64::EPSILON);
        assert!((config.high_radius_frac - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_config_json_is_an_error() {
        let cli =
            Cli::try_parse_from(["freqsplit", "in.png", "--config-json", "{not json"]).unwrap();
        assert!(config_from_cli(&cli).is_err());
    }

    #[test]
    fn zero_runs_is_rejected() {
        assert!(Cli::try_parse_from(["freqsplit", "in.png", "--runs", "0"]).is_err());
    }

    #[test]
    fn negative_fractions_parse() {
        let cli = Cli::try_parse_from(["freqsplit", "in.png", "--low-frac", "-0.1"]).unwrap();
        assert!((cli.low_frac + 0.1).abs() < f64::EPSILON);
    }
}
