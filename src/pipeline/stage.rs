//! Staging store: copy the source image into the staging root.
//!
//! The source is opened and its first chunk read before the destination is
//! created, so a missing or unreadable source fails before anything is
//! written. Read errors name the source and write errors name the
//! destination. Both handles are owned by this function and dropped on every
//! return path.
//!
//! The staging root itself is not created here unless the caller opts in.
//! When it is missing, creating the destination fails with
//! `io::ErrorKind::NotFound` and that error is returned as-is inside
//! [`PipelineError::StagingFailed`].

use crate::error::PipelineError;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

const COPY_CHUNK: usize = 64 * 1024;

/// Copy `source` byte-for-byte to `dest`.
///
/// Returns `dest` once every byte is flushed to durable storage and the file
/// handle is closed. Creates exactly one file; creates the parent directory
/// only when `create_root` is true.
pub async fn stage_source(
    source: &Path,
    dest: &Path,
    create_root: bool,
) -> Result<PathBuf, PipelineError> {
    info!("Staging {} → {}", source.display(), dest.display());

    let mut reader = File::open(source).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PipelineError::SourceNotFound {
            path: source.to_path_buf(),
        },
        io::ErrorKind::PermissionDenied => PipelineError::PermissionDenied {
            path: source.to_path_buf(),
        },
        _ => PipelineError::SourceReadFailed {
            path: source.to_path_buf(),
            source: e,
        },
    })?;

    let read_err = |e: io::Error| PipelineError::SourceReadFailed {
        path: source.to_path_buf(),
        source: e,
    };
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut n = reader.read(&mut buf).await.map_err(read_err)?;

    if create_root {
        if let Some(root) = dest.parent() {
            provision_staging_root(root).await?;
        }
    }

    let staging_err = |e: io::Error| PipelineError::StagingFailed {
        path: dest.to_path_buf(),
        source: e,
    };

    let mut writer = File::create(dest).await.map_err(staging_err)?;
    let mut copied: u64 = 0;
    while n > 0 {
        writer.write_all(&buf[..n]).await.map_err(staging_err)?;
        copied += n as u64;
        n = reader.read(&mut buf).await.map_err(read_err)?;
    }
    writer.flush().await.map_err(staging_err)?;
    writer.sync_all().await.map_err(staging_err)?;

    debug!("Staged {} bytes", copied);
    Ok(dest.to_path_buf())
}

/// Create the staging root if it does not exist. Idempotent.
///
/// Intended for deployment setup; the pipeline only calls it when
/// `create_staging_root` is enabled.
pub async fn provision_staging_root(root: &Path) -> Result<(), PipelineError> {
    tokio::fs::create_dir_all(root)
        .await
        .map_err(|e| PipelineError::StagingFailed {
            path: root.to_path_buf(),
            source: e,
        })?;
    debug!("Staging root ready: {}", root.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn copies_bytes_exactly() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let payload: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
        std::fs::write(&src, &payload).unwrap();

        let dest = dir.path().join("image-1.bin");
        let staged = stage_source(&src, &dest, false).await.unwrap();

        assert_eq!(staged, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), payload);
    }

    #[tokio::test]
    async fn missing_source_is_not_found_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("image-1.tif");

        let err = stage_source(&dir.path().join("nope.tif"), &dest, false)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::SourceNotFound { .. }), "got {err:?}");
        assert!(!dest.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_source_names_source_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        // Opening a directory succeeds on unix; reading it does not.
        let src = dir.path().join("a-directory.tif");
        std::fs::create_dir(&src).unwrap();
        let dest = dir.path().join("image-1.tif");

        let err = stage_source(&src, &dest, false).await.unwrap_err();

        match &err {
            PipelineError::SourceReadFailed { path, .. } => assert_eq!(path, &src),
            other => panic!("expected SourceReadFailed, got {other:?}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn missing_root_fails_without_creating_it() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.tif");
        std::fs::write(&src, b"bytes").unwrap();
        let root = dir.path().join("not-provisioned");
        let dest = root.join("image-1.tif");

        let err = stage_source(&src, &dest, false).await.unwrap_err();

        assert!(err.is_missing_directory(), "got {err:?}");
        assert!(err.to_string().contains("not-provisioned"));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn create_root_opt_in_provisions() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.tif");
        std::fs::write(&src, b"bytes").unwrap();
        let dest = dir.path().join("a/b/image-1.tif");

        stage_source(&src, &dest, true).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn provisioning_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        provision_staging_root(&root).await.unwrap();
        provision_staging_root(&root).await.unwrap();
        assert!(root.is_dir());
    }
}
