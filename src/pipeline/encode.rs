//! Image re-encoding: staged raster (TIFF, PNG, …) → in-memory JPEG.
//!
//! JPEG can be embedded in a PDF verbatim as a `DCTDecode` stream, so the
//! document writer never has to touch pixel data. The format is sniffed
//! from the file contents rather than trusted from the extension.

use crate::error::PipelineError;
use image::codecs::jpeg::JpegEncoder;
use image::ImageReader;
use std::io;
use std::path::Path;
use tracing::debug;

/// A JPEG held entirely in memory, with the pixel size it encodes.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode `path` and re-encode it as baseline RGB JPEG.
///
/// Decoding is CPU-bound, so it runs on the blocking pool.
pub async fn encode_to_jpeg(path: &Path, quality: u8) -> Result<EncodedImage, PipelineError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || encode_to_jpeg_blocking(&path, quality))
        .await
        .map_err(|e| PipelineError::Internal(format!("Encode task panicked: {}", e)))?
}

fn encode_to_jpeg_blocking(path: &Path, quality: u8) -> Result<EncodedImage, PipelineError> {
    let reader = ImageReader::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PipelineError::SourceNotFound { path: path.to_path_buf() },
        io::ErrorKind::PermissionDenied => PipelineError::PermissionDenied { path: path.to_path_buf() },
        _ => PipelineError::DecodeFailed {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        },
    })?;

    let decoded = reader
        .with_guessed_format()
        .map_err(|e| PipelineError::DecodeFailed {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })?
        .decode()
        .map_err(|e| PipelineError::DecodeFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    // JPEG carries no alpha channel.
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&rgb)
        .map_err(|e| PipelineError::EncodeFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    debug!(
        "Encoded {} ({}x{} px) → {} bytes JPEG",
        path.display(),
        width,
        height,
        bytes.len()
    );

    Ok(EncodedImage {
        bytes,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    #[tokio::test]
    async fn encodes_png_with_alpha() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("src.png");
        RgbaImage::from_pixel(12, 7, Rgba([255, 0, 0, 128]))
            .save(&path)
            .unwrap();

        let img = encode_to_jpeg(&path, 80).await.expect("encode should succeed");
        assert_eq!((img.width, img.height), (12, 7));
        // SOI marker
        assert_eq!(&img.bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn sniffs_format_despite_wrong_extension() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("real.png");
        RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255])).save(&png).unwrap();
        let misnamed = dir.path().join("image-x.tif");
        std::fs::rename(&png, &misnamed).unwrap();

        let img = encode_to_jpeg(&misnamed, 80).await.unwrap();
        assert_eq!((img.width, img.height), (3, 3));
    }

    #[tokio::test]
    async fn garbage_is_decode_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image-x.tif");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = encode_to_jpeg(&path, 80).await.unwrap_err();
        assert!(matches!(err, PipelineError::DecodeFailed { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = encode_to_jpeg(&dir.path().join("gone.tif"), 80)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound { .. }), "got {err:?}");
    }
}
