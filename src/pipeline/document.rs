//! Raster-to-document conversion: wrap an [`EncodedImage`] in a one-page PDF.
//!
//! The page object graph is assembled in memory with `lopdf`, serialised to a
//! byte buffer, and only then streamed to disk. The image XObject is complete
//! before the page referencing it is added, and the file is flushed and synced
//! before [`wrap_in_document`] returns.
//!
//! If the disk write fails part-way (full disk, directory removed underneath
//! us), a truncated file can be left at the destination. It is never reported
//! as a finished document: the call returns
//! [`PipelineError::DocumentWriteFailed`] and the orchestrator stops there.

use crate::config::{PageSize, PipelineConfig};
use crate::error::PipelineError;
use crate::pipeline::encode::{encode_to_jpeg, EncodedImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Resource name the page content uses to draw the embedded image.
const IMAGE_NAME: &str = "Im0";

/// Re-encode the staged image and write it as a one-page PDF to `output`.
///
/// Returns `output` once the document is fully on disk.
pub async fn convert_to_document(
    staged: &Path,
    output: &Path,
    config: &PipelineConfig,
) -> Result<PathBuf, PipelineError> {
    info!("Converting {} → {}", staged.display(), output.display());
    let encoded = encode_to_jpeg(staged, config.jpeg_quality).await?;
    wrap_in_document(&encoded, output, config.page_size).await?;
    Ok(output.to_path_buf())
}

/// Place `image` on a single page, scaled to fit, and write the PDF to `output`.
pub async fn wrap_in_document(
    image: &EncodedImage,
    output: &Path,
    page: PageSize,
) -> Result<(), PipelineError> {
    let bytes = build_document(image, page).map_err(|detail| {
        PipelineError::DocumentBuildFailed {
            path: output.to_path_buf(),
            detail,
        }
    })?;

    let write_err = |e: io::Error| PipelineError::DocumentWriteFailed {
        path: output.to_path_buf(),
        source: e,
    };

    let mut file = File::create(output).await.map_err(write_err)?;
    file.write_all(&bytes).await.map_err(write_err)?;
    file.flush().await.map_err(write_err)?;
    file.sync_all().await.map_err(write_err)?;

    debug!("Wrote {} byte document to {}", bytes.len(), output.display());
    Ok(())
}

/// Scale `(w, h)` to fit inside `page`, preserving aspect ratio.
///
/// Returns the drawn width and height in points.
pub fn fit_to_page(width: u32, height: u32, page: PageSize) -> (f32, f32) {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let scale = (page.width_pt / w).min(page.height_pt / h);
    (w * scale, h * scale)
}

/// Serialise a single-page PDF embedding `image` as a DCT stream.
fn build_document(image: &EncodedImage, page: PageSize) -> Result<Vec<u8>, String> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        image.bytes.clone(),
    );
    let image_id = doc.add_object(image_stream);

    // Anchored top-left like a layout engine would place it.
    let (draw_w, draw_h) = fit_to_page(image.width, image.height, page);
    let y = page.height_pt - draw_h;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    draw_w.into(),
                    0.into(),
                    0.into(),
                    draw_h.into(),
                    0.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content.encode().map_err(|e| e.to_string())?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), page.width_pt.into(), page.height_pt.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_NAME => image_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(|e| e.to_string())?;
    Ok(buf)
}

// ── Inspection ───────────────────────────────────────────────────────────

/// Structural summary of a written document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    /// Number of pages in the page tree.
    pub page_count: usize,
    /// Pixel dimensions of every embedded image XObject, sorted.
    pub images: Vec<(u32, u32)>,
    /// Width and height of the first page's media box in points.
    pub media_box: Option<(f32, f32)>,
}

/// Parse the PDF at `path` and summarise its structure.
pub async fn inspect_document(path: &Path) -> Result<DocumentSummary, PipelineError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PipelineError::SourceNotFound {
            path: path.to_path_buf(),
        },
        _ => PipelineError::DocumentReadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;

    let read_err = |detail: String| PipelineError::DocumentReadFailed {
        path: path.to_path_buf(),
        detail,
    };

    let doc = Document::load_mem(&bytes).map_err(|e| read_err(e.to_string()))?;
    let pages = doc.get_pages();

    let media_box = match pages.values().next() {
        Some(page_id) => {
            let page = doc
                .get_dictionary(*page_id)
                .map_err(|e| read_err(e.to_string()))?;
            page.get(b"MediaBox")
                .and_then(Object::as_array)
                .ok()
                .and_then(|arr| {
                    let nums: Vec<f32> = arr.iter().filter_map(number).collect();
                    match nums.as_slice() {
                        [x0, y0, x1, y1] => Some((x1 - x0, y1 - y0)),
                        _ => None,
                    }
                })
        }
        None => None,
    };

    let mut images: Vec<(u32, u32)> = doc
        .objects
        .values()
        .filter_map(|obj| match obj {
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        })
        .filter(|dict| {
            dict.get(b"Subtype")
                .and_then(Object::as_name)
                .map(|n| n == b"Image")
                .unwrap_or(false)
        })
        .filter_map(|dict| {
            let w = dict.get(b"Width").and_then(Object::as_i64).ok()?;
            let h = dict.get(b"Height").and_then(Object::as_i64).ok()?;
            Some((u32::try_from(w).ok()?, u32::try_from(h).ok()?))
        })
        .collect();
    images.sort_unstable();

    Ok(DocumentSummary {
        page_count: pages.len(),
        images,
        media_box,
    })
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
