//! Result types returned by the pipeline.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use uuid::Uuid;

/// Paths of the three artifacts a successful invocation leaves on disk.
///
/// Serialises as `{"stagedPath", "documentPath", "outputRasterPath"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Byte-for-byte copy of the source inside the staging root.
    pub staged_path: PathBuf,
    /// Single-page PDF wrapping the re-encoded image.
    pub document_path: PathBuf,
    /// TIFF produced by the rasterizer.
    pub output_raster_path: PathBuf,
}

impl UploadResult {
    pub fn paths(&self) -> [&PathBuf; 3] {
        [&self.staged_path, &self.document_path, &self.output_raster_path]
    }
}

/// The outcome of one simulated inbound request.
#[derive(Debug)]
pub struct RequestOutcome {
    /// 1-indexed request number.
    pub request: usize,
    /// Identifier of the invocation that served the request.
    pub id: Uuid,
    pub result: Result<UploadResult, PipelineError>,
}

impl RequestOutcome {
    pub fn response(&self) -> UploadResponse {
        UploadResponse::from_result(&self.result)
    }
}

/// What a request handler sends back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResponse {
    pub status: u16,
    pub body: Value,
}

impl UploadResponse {
    /// 201 with the result paths, or 400 with `{"error": message}`.
    pub fn from_result(result: &Result<UploadResult, PipelineError>) -> Self {
        match result {
            Ok(r) => Self {
                status: 201,
                body: json!(r),
            },
            Err(e) => Self {
                status: 400,
                body: json!({ "error": e.to_string() }),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UploadResult {
        UploadResult {
            staged_path: "/s/image-1.tif".into(),
            document_path: "/s/document-1.pdf".into(),
            output_raster_path: "/s/raster-1.tiff".into(),
        }
    }

    #[test]
    fn result_uses_camel_case_keys() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["stagedPath"], "/s/image-1.tif");
        assert_eq!(v["documentPath"], "/s/document-1.pdf");
        assert_eq!(v["outputRasterPath"], "/s/raster-1.tiff");
    }

    #[test]
    fn success_maps_to_201() {
        let resp = UploadResponse::from_result(&Ok(sample()));
        assert_eq!(resp.status, 201);
        assert!(resp.is_success());
        assert_eq!(resp.body["documentPath"], "/s/document-1.pdf");
    }

    #[test]
    fn failure_maps_to_400_with_message() {
        let err = PipelineError::SourceNotFound {
            path: "/src/image.tif".into(),
        };
        let resp = UploadResponse::from_result(&Err(err));
        assert_eq!(resp.status, 400);
        assert!(!resp.is_success());
        assert!(resp.body["error"]
            .as_str()
            .unwrap()
            .contains("/src/image.tif"));
    }
}
