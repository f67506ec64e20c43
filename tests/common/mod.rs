//! Shared helpers for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use docstage::{PipelineError, RasterOptions, Rasterizer};
use image::{ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Write a gradient image at `dir/name`; the format follows the extension.
pub fn write_source(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    img.save(&path).expect("write source image");
    path
}

/// One recorded `rasterize` call.
#[derive(Debug, Clone)]
pub struct RasterCall {
    pub document: PathBuf,
    pub output: PathBuf,
    pub options: RasterOptions,
}

/// Rasterizer that records its calls and writes a tiny TIFF instead of
/// spawning Ghostscript. Fails like a real process when the output
/// directory is missing.
#[derive(Default)]
pub struct RecordingRasterizer {
    pub calls: Mutex<Vec<RasterCall>>,
}

impl RecordingRasterizer {
    pub fn calls(&self) -> Vec<RasterCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rasterizer for RecordingRasterizer {
    async fn rasterize(
        &self,
        document: &Path,
        output: &Path,
        options: &RasterOptions,
    ) -> Result<(), PipelineError> {
        self.calls.lock().unwrap().push(RasterCall {
            document: document.to_path_buf(),
            output: output.to_path_buf(),
            options: *options,
        });
        assert!(document.exists(), "document must be written before rasterising");

        RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]))
            .save_with_format(output, ImageFormat::Tiff)
            .map_err(|e| PipelineError::RasterizerFailed {
                program: PathBuf::from("fake-gs"),
                code: Some(1),
                diagnostic: e.to_string(),
            })
    }
}

/// Rasterizer that always exits with code 1 and a fixed diagnostic.
pub struct FailingRasterizer {
    pub diagnostic: String,
}

#[async_trait]
impl Rasterizer for FailingRasterizer {
    async fn rasterize(
        &self,
        _document: &Path,
        _output: &Path,
        _options: &RasterOptions,
    ) -> Result<(), PipelineError> {
        Err(PipelineError::RasterizerFailed {
            program: PathBuf::from("fake-gs"),
            code: Some(1),
            diagnostic: self.diagnostic.clone(),
        })
    }
}
