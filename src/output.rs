//! Result types produced by the pipeline.

use crate::config::Dialect;
use crate::error::{AnalysisError, Img2DiagramError};
use serde::{Deserialize, Serialize};

/// Outcome of the image-analysis step for one upload.
///
/// Either `error` is `Some` (and `diagram_text` is empty), or `error` is
/// `None` and `diagram_text` holds the cleaned model reply. The text may be
/// empty on success; [`crate::generate_diagram`] turns that into
/// [`Img2DiagramError::EmptyDiagram`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub dialect: Dialect,
    /// Cleaned diagram source text.
    pub diagram_text: String,
    pub error: Option<AnalysisError>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Wall-clock time of the analysis, including the network call.
    pub duration_ms: u64,
}

impl AnalysisResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result`, dropping token accounting.
    pub fn into_result(self) -> Result<String, AnalysisError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.diagram_text),
        }
    }
}

/// Everything the UI needs after a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramOutput {
    pub file_name: String,
    pub file_size: usize,
    pub file_type: String,
    /// The upload as a `data:` URL, for display.
    pub image_data_url: String,
    pub diagram_text: String,
    /// Rendering-service URL; fetching it yields the diagram image.
    pub diagram_image_url: String,
    #[serde(rename = "diagramType")]
    pub dialect: Dialect,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub duration_ms: u64,
}

/// The discriminated value returned to the UI layer.
///
/// Serialises to either `{"error": "..."}` or
/// `{"success": true, "fileName": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagramResponse {
    Success {
        success: bool,
        #[serde(flatten)]
        output: DiagramOutput,
    },
    Error {
        error: String,
    },
}

impl DiagramResponse {
    pub fn success(output: DiagramOutput) -> Self {
        DiagramResponse::Success {
            success: true,
            output,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        DiagramResponse::Error {
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DiagramResponse::Success { .. })
    }
}

impl From<Result<DiagramOutput, Img2DiagramError>> for DiagramResponse {
    fn from(result: Result<DiagramOutput, Img2DiagramError>) -> Self {
        match result {
            Ok(output) => DiagramResponse::success(output),
            Err(e) => DiagramResponse::error(e.to_string()),
        }
    }
}
