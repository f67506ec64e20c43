//! Document-to-raster conversion through an external process.
//!
//! [`Rasterizer`] is the seam: production code uses [`GhostscriptRasterizer`],
//! tests substitute a fake. The converter does not check that the output
//! directory exists; that is left to the process, which reports it as a
//! non-zero exit.
//!
//! There is no timeout. A rasterizer that never exits hangs the invocation.

use crate::config::RasterOptions;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Converts a document file into a raster image file.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render `document` to `output` using `options`.
    async fn rasterize(
        &self,
        document: &Path,
        output: &Path,
        options: &RasterOptions,
    ) -> Result<(), PipelineError>;
}

/// Rasterise `document` to `output` with the given rasterizer.
pub async fn convert_to_raster(
    rasterizer: &dyn Rasterizer,
    document: &Path,
    output: &Path,
    options: &RasterOptions,
) -> Result<PathBuf, PipelineError> {
    info!("Rasterising {} → {}", document.display(), output.display());
    rasterizer.rasterize(document, output, options).await?;
    Ok(output.to_path_buf())
}

/// Runs Ghostscript as a child process.
#[derive(Debug, Clone)]
pub struct GhostscriptRasterizer {
    program: PathBuf,
}

impl GhostscriptRasterizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for GhostscriptRasterizer {
    fn default() -> Self {
        Self::new("gs")
    }
}

/// Ghostscript argument vector for one document.
///
/// `-q -dNOPAUSE -sDEVICE=<dev> -sCompression=<c> -o <out> -r<dpi> <doc>`
pub fn ghostscript_args(document: &Path, output: &Path, options: &RasterOptions) -> Vec<OsString> {
    vec![
        "-q".into(),
        "-dNOPAUSE".into(),
        format!("-sDEVICE={}", options.device.as_str()).into(),
        format!("-sCompression={}", options.compression.as_str()).into(),
        "-o".into(),
        output.as_os_str().to_owned(),
        format!("-r{}", options.dpi).into(),
        document.as_os_str().to_owned(),
    ]
}

#[async_trait]
impl Rasterizer for GhostscriptRasterizer {
    async fn rasterize(
        &self,
        document: &Path,
        output: &Path,
        options: &RasterOptions,
    ) -> Result<(), PipelineError> {
        let args = ghostscript_args(document, output, options);
        debug!(
            "Running {} {}",
            self.program.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => PipelineError::RasterizerNotFound {
                    program: self.program.clone(),
                },
                _ => PipelineError::RasterizerLaunchFailed {
                    program: self.program.clone(),
                    source: e,
                },
            })?;

        if !result.status.success() {
            return Err(PipelineError::RasterizerFailed {
                program: self.program.clone(),
                code: result.status.code(),
                diagnostic: diagnostic_text(&result.stderr, &result.stdout),
            });
        }

        debug!("Rasterizer finished: {}", output.display());
        Ok(())
    }
}

/// Ghostscript prints most errors to stdout; keep both streams.
fn diagnostic_text(stderr: &[u8], stdout: &[u8]) -> String {
    [stderr, stdout]
        .iter()
        .map(|s| String::from_utf8_lossy(s).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RasterDevice, TiffCompression};

    #[test]
    fn default_args_match_reference_command() {
        let args = ghostscript_args(
            Path::new("/stage/document-1.pdf"),
            Path::new("/stage/raster-1.tiff"),
            &RasterOptions::default(),
        );
        let joined = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(
            joined,
            "-q -dNOPAUSE -sDEVICE=tiff12nc -sCompression=lzw -o /stage/raster-1.tiff -r200 /stage/document-1.pdf"
        );
    }

    #[test]
    fn args_follow_options() {
        let opts = RasterOptions {
            device: RasterDevice::TiffGray,
            compression: TiffCompression::Pack,
            dpi: 300,
        };
        let args = ghostscript_args(Path::new("d.pdf"), Path::new("o.tiff"), &opts);
        assert!(args.contains(&OsString::from("-sDEVICE=tiffgray")));
        assert!(args.contains(&OsString::from("-sCompression=pack")));
        assert!(args.contains(&OsString::from("-r300")));
    }

    #[test]
    fn diagnostic_keeps_both_streams() {
        assert_eq!(diagnostic_text(b"  err \n", b"out"), "err\nout");
        assert_eq!(diagnostic_text(b"", b" only stdout "), "only stdout");
        assert_eq!(diagnostic_text(b"", b""), "");
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let gs = GhostscriptRasterizer::new("/definitely/not/a/real/gs");
        let err = gs
            .rasterize(Path::new("a.pdf"), Path::new("b.tiff"), &RasterOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::RasterizerNotFound { .. }), "got {err:?}");
    }
}
