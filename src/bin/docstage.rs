//! CLI binary for docstage.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, serves one or more simulated upload requests and prints
//! each response body.

use anyhow::{Context, Result};
use clap::Parser;
use docstage::{
    inspect_document, provision_staging_root, simulate_requests, PipelineConfig,
    ProgressCallback, RasterDevice, Stage, StageProgressCallback, TiffCompression,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that logs one line per finished stage. Works when several
/// invocations report concurrently.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Processing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn short(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

impl StageProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, id: Uuid, stage: Stage) {
        self.bar.set_message(format!("{} {stage}…", short(id)));
    }

    fn on_stage_complete(&self, id: Uuid, stage: Stage, artifact: &Path) {
        self.bar.println(format!(
            "  {} {}  {:<24} {}",
            green("✓"),
            dim(&short(id)),
            stage.to_string(),
            dim(&artifact.display().to_string()),
        ));
    }

    fn on_stage_error(&self, id: Uuid, stage: Stage, error: &str) {
        // Keep the log line to its first line; the full error is printed below.
        let first = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} {}  {:<24} {}",
            red("✗"),
            dim(&short(id)),
            stage.to_string(),
            red(first),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One-time setup, then process ./image.tif once
  docstage --provision
  docstage

  # Simulate five requests, two at a time, against a custom root
  docstage --staging-root /var/tmp/uploads --requests 5 --concurrency 2

  # Higher-resolution grayscale output
  docstage --dpi 300 --device tiffgray scan.png

  # Inspect a produced document
  docstage --inspect /tmp/docstage/document-<id>.pdf

ARTIFACTS (per request, under the staging root):
  image-<id>.<ext>     byte-for-byte copy of the source
  document-<id>.pdf    single page, image fitted to the page size
  raster-<id>.tiff     Ghostscript output

The staging root is NOT created automatically. Without --provision or
--create-staging-root every request fails until the directory exists.

ENVIRONMENT VARIABLES:
  DOCSTAGE_SOURCE        Source image path
  DOCSTAGE_STAGING_ROOT  Staging root directory
  DOCSTAGE_GS            Ghostscript executable
  RUST_LOG               Override log filter (e.g. docstage=debug)
"#;

/// Stage an image, wrap it in a PDF, and rasterise it to TIFF.
#[derive(Parser, Debug)]
#[command(
    name = "docstage",
    version,
    about = "Stage an image, wrap it in a PDF, and rasterise it to TIFF with Ghostscript",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source image (TIFF, PNG, JPEG).
    #[arg(env = "DOCSTAGE_SOURCE", default_value = docstage::config::DEFAULT_SOURCE_PATH)]
    source: PathBuf,

    /// Directory under which all artifacts are written.
    #[arg(long, env = "DOCSTAGE_STAGING_ROOT", default_value = docstage::config::DEFAULT_STAGING_ROOT)]
    staging_root: PathBuf,

    /// Create the staging root before running (idempotent).
    #[arg(long)]
    provision: bool,

    /// Let the staging store create the root on demand.
    #[arg(long, env = "DOCSTAGE_CREATE_STAGING_ROOT")]
    create_staging_root: bool,

    /// Number of simulated requests.
    #[arg(short = 'n', long, env = "DOCSTAGE_REQUESTS", default_value_t = 1)]
    requests: usize,

    /// Requests in flight at once.
    #[arg(short, long, env = "DOCSTAGE_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Output resolution (36–1200).
    #[arg(long, env = "DOCSTAGE_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(36..=1200))]
    dpi: u32,

    /// Ghostscript TIFF device.
    #[arg(long, env = "DOCSTAGE_DEVICE", value_enum, default_value = "tiff12nc")]
    device: DeviceArg,

    /// TIFF compression.
    #[arg(long, env = "DOCSTAGE_COMPRESSION", value_enum, default_value = "lzw")]
    compression: CompressionArg,

    /// JPEG quality for the embedded image (1–100).
    #[arg(long, env = "DOCSTAGE_JPEG_QUALITY", default_value_t = 80)]
    jpeg_quality: u8,

    /// Ghostscript executable.
    #[arg(long = "gs", env = "DOCSTAGE_GS", default_value = "gs")]
    ghostscript: PathBuf,

    /// Print the structure of a PDF and exit.
    #[arg(long, value_name = "PDF")]
    inspect: Option<PathBuf>,

    /// Print compact JSON only (no progress, no summary).
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOCSTAGE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCSTAGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except response bodies and errors.
    #[arg(short, long, env = "DOCSTAGE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum DeviceArg {
    Tiff12nc,
    Tiff24nc,
    Tiff48nc,
    Tiffgray,
}

impl From<DeviceArg> for RasterDevice {
    fn from(v: DeviceArg) -> Self {
        match v {
            DeviceArg::Tiff12nc => RasterDevice::Tiff12nc,
            DeviceArg::Tiff24nc => RasterDevice::Tiff24nc,
            DeviceArg::Tiff48nc => RasterDevice::Tiff48nc,
            DeviceArg::Tiffgray => RasterDevice::TiffGray,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum CompressionArg {
    None,
    Lzw,
    Pack,
}

impl From<CompressionArg> for TiffCompression {
    fn from(v: CompressionArg) -> Self {
        match v {
            CompressionArg::None => TiffCompression::None,
            CompressionArg::Lzw => TiffCompression::Lzw,
            CompressionArg::Pack => TiffCompression::Pack,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports each stage; keep INFO logs out of its way.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress || cli.json {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if let Some(ref pdf) = cli.inspect {
        let summary = inspect_document(pdf)
            .await
            .with_context(|| format!("Failed to inspect {}", pdf.display()))?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string(&summary).context("Failed to serialise summary")?
            );
        } else {
            println!("File:       {}", pdf.display());
            println!("Pages:      {}", summary.page_count);
            if let Some((w, h)) = summary.media_box {
                println!("Page size:  {w} x {h} pt");
            }
            for (i, (w, h)) in summary.images.iter().enumerate() {
                println!("Image {}:    {w} x {h} px", i + 1);
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    if cli.provision {
        provision_staging_root(&cli.staging_root)
            .await
            .context("Failed to provision staging root")?;
        if !cli.quiet && !cli.json {
            eprintln!(
                "{} staging root ready: {}",
                green("✔"),
                bold(&cli.staging_root.display().to_string())
            );
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress.clone().map(|p| p as ProgressCallback),
    )?;

    // ── Serve requests ───────────────────────────────────────────────────
    let outcomes = simulate_requests(&config, cli.requests, cli.concurrency).await;
    if let Some(ref p) = progress {
        p.finish();
    }

    let mut failed = 0usize;
    let mut needs_provisioning = false;
    for outcome in &outcomes {
        let response = outcome.response();
        let body = serde_json::to_string(&response.body).context("Failed to serialise response")?;

        if response.is_success() {
            println!("{body}");
        } else {
            failed += 1;
            if let Err(ref e) = outcome.result {
                needs_provisioning |= e.is_missing_directory();
            }
            if cli.json {
                println!("{body}");
            } else {
                eprintln!(
                    "{} request {} ({}) → {}  {}",
                    red("✘"),
                    outcome.request,
                    outcome.id,
                    response.status,
                    body
                );
            }
        }
    }

    if !cli.quiet && !cli.json {
        let ok = outcomes.len() - failed;
        eprintln!(
            "{}  {}/{} requests succeeded",
            if failed == 0 { green("✔") } else { red("✘") },
            bold(&ok.to_string()),
            outcomes.len(),
        );
        if needs_provisioning {
            eprintln!(
                "   {}",
                dim(&format!(
                    "staging root {} does not exist; run with --provision",
                    cli.staging_root.display()
                ))
            );
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .staging_root(&cli.staging_root)
        .source_path(&cli.source)
        .dpi(cli.dpi)
        .device(cli.device.clone().into())
        .compression(cli.compression.clone().into())
        .jpeg_quality(cli.jpeg_quality)
        .create_staging_root(cli.create_staging_root)
        .ghostscript_program(&cli.ghostscript);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_reference_config() {
        let cli = Cli::parse_from(["docstage"]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.raster.dpi, 200);
        assert_eq!(config.raster.device, RasterDevice::Tiff12nc);
        assert_eq!(config.raster.compression, TiffCompression::Lzw);
        assert_eq!(config.source_path, PathBuf::from("image.tif"));
        assert!(!config.create_staging_root);
    }

    #[test]
    fn flags_map_to_config() {
        let cli = Cli::parse_from([
            "docstage",
            "scan.png",
            "--staging-root",
            "/srv/stage",
            "--dpi",
            "300",
            "--device",
            "tiffgray",
            "--compression",
            "pack",
            "--gs",
            "/opt/gs/bin/gs",
            "--create-staging-root",
        ]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.source_path, PathBuf::from("scan.png"));
        assert_eq!(config.staging_root, PathBuf::from("/srv/stage"));
        assert_eq!(config.raster.dpi, 300);
        assert_eq!(config.raster.device, RasterDevice::TiffGray);
        assert_eq!(config.raster.compression, TiffCompression::Pack);
        assert_eq!(config.ghostscript_program, PathBuf::from("/opt/gs/bin/gs"));
        assert!(config.create_staging_root);
    }

    #[test]
    fn dpi_out_of_range_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["docstage", "--dpi", "20"]).is_err());
    }
}
