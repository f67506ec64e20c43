//! Configuration types for the ingestion pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The staging root is an explicit value here
//! rather than a process-wide constant, so tests can point each run at its own
//! temporary directory.

use crate::error::PipelineError;
use crate::pipeline::rasterize::Rasterizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default shared staging root.
pub const DEFAULT_STAGING_ROOT: &str = "/tmp/docstage";

/// Default well-known source image.
pub const DEFAULT_SOURCE_PATH: &str = "image.tif";

/// Configuration for one or more pipeline invocations.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use docstage::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .staging_root("/var/tmp/uploads")
///     .source_path("incoming/scan.tif")
///     .dpi(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.raster.dpi, 300);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Directory under which every per-invocation artifact is written.
    ///
    /// Must exist before the first invocation unless
    /// [`create_staging_root`](Self::create_staging_root) is set.
    pub staging_root: PathBuf,

    /// The source image each invocation stages. Default: `image.tif`.
    pub source_path: PathBuf,

    /// Options passed to the rasterizer for the final TIFF.
    pub raster: RasterOptions,

    /// Page the source image is fitted onto. Default: US Letter.
    pub page_size: PageSize,

    /// JPEG quality used when re-encoding the source for embedding. Range 1–100. Default: 80.
    pub jpeg_quality: u8,

    /// Create the staging root (idempotently) before staging. Default: false.
    pub create_staging_root: bool,

    /// Ghostscript executable used when no [`rasterizer`](Self::rasterizer) is set. Default: `gs`.
    pub ghostscript_program: PathBuf,

    /// Pre-constructed rasterizer. Takes precedence over `ghostscript_program`.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// Optional stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging_root: PathBuf::from(DEFAULT_STAGING_ROOT),
            source_path: PathBuf::from(DEFAULT_SOURCE_PATH),
            raster: RasterOptions::default(),
            page_size: PageSize::default(),
            jpeg_quality: 80,
            create_staging_root: false,
            ghostscript_program: PathBuf::from("gs"),
            rasterizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("staging_root", &self.staging_root)
            .field("source_path", &self.source_path)
            .field("raster", &self.raster)
            .field("page_size", &self.page_size)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("create_staging_root", &self.create_staging_root)
            .field("ghostscript_program", &self.ghostscript_program)
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn StageProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.staging_root = root.into();
        self
    }

    pub fn source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_path = path.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.raster.dpi = dpi;
        self
    }

    pub fn device(mut self, device: RasterDevice) -> Self {
        self.config.raster.device = device;
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.config.raster.compression = compression;
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn create_staging_root(mut self, v: bool) -> Self {
        self.config.create_staging_root = v;
        self
    }

    pub fn ghostscript_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.ghostscript_program = program.into();
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if !(MIN_DPI..=MAX_DPI).contains(&c.raster.dpi) {
            return Err(PipelineError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                c.raster.dpi
            )));
        }
        if !(c.page_size.width_pt > 0.0 && c.page_size.height_pt > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "Page size must be positive, got {}x{} pt",
                c.page_size.width_pt, c.page_size.height_pt
            )));
        }
        if c.staging_root.as_os_str().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Staging root must not be empty".into(),
            ));
        }
        if c.source_path.as_os_str().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Source path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

const MIN_DPI: u32 = 36;
const MAX_DPI: u32 = 1200;

// ── Raster options ───────────────────────────────────────────────────────

/// Parameters handed to the rasterizer for each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterOptions {
    /// Output device. Default: [`RasterDevice::Tiff12nc`].
    pub device: RasterDevice,
    /// TIFF compression scheme. Default: [`TiffCompression::Lzw`].
    pub compression: TiffCompression,
    /// Output resolution in dots per inch. Default: 200.
    pub dpi: u32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            device: RasterDevice::default(),
            compression: TiffCompression::default(),
            dpi: 200,
        }
    }
}

/// Ghostscript TIFF output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterDevice {
    /// 12-bit RGB (4 bits per channel). (default)
    #[default]
    Tiff12nc,
    /// 24-bit RGB.
    Tiff24nc,
    /// 48-bit RGB.
    Tiff48nc,
    /// 8-bit grayscale.
    TiffGray,
}

impl RasterDevice {
    /// The `-sDEVICE=` value understood by Ghostscript.
    pub fn as_str(&self) -> &'static str {
        match self {
            RasterDevice::Tiff12nc => "tiff12nc",
            RasterDevice::Tiff24nc => "tiff24nc",
            RasterDevice::Tiff48nc => "tiff48nc",
            RasterDevice::TiffGray => "tiffgray",
        }
    }
}

/// TIFF compression scheme for the colour and gray devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TiffCompression {
    /// No compression.
    None,
    /// Lempel-Ziv-Welch. (default)
    #[default]
    Lzw,
    /// PackBits run-length encoding.
    Pack,
}

impl TiffCompression {
    /// The `-sCompression=` value understood by Ghostscript.
    pub fn as_str(&self) -> &'static str {
        match self {
            TiffCompression::None => "none",
            TiffCompression::Lzw => "lzw",
            TiffCompression::Pack => "pack",
        }
    }
}

/// Page dimensions in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize {
        width_pt: 612.0,
        height_pt: 792.0,
    };
    pub const A4: PageSize = PageSize {
        width_pt: 595.0,
        height_pt: 842.0,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        Self::LETTER
    }
}
