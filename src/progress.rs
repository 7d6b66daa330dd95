//! Progress-callback trait for per-step pipeline events.
//!
//! Inject an [`Arc<dyn DiagramProgressCallback>`] via
//! [`crate::config::DiagramConfigBuilder::progress_callback`] to receive
//! events as a request moves through the four user-visible steps.
//!
//! # Example
//!
//! ```rust
//! use edgequake_img2diagram::{DiagramConfig, DiagramProgressCallback, Step};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl DiagramProgressCallback for Printer {
//!     fn on_step_start(&self, step: Step) {
//!         eprintln!("{}…", step.label());
//!     }
//! }
//!
//! let config = DiagramConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn DiagramProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The steps a request goes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    /// An image was chosen and passed validation.
    SelectImage,
    /// The image is read and wrapped into a data URL.
    UploadAndProcess,
    /// The vision model is working on the image.
    AiAnalysis,
    /// The render URL is being built.
    GenerateDiagram,
}

impl Step {
    pub const ALL: [Step; 4] = [
        Step::SelectImage,
        Step::UploadAndProcess,
        Step::AiAnalysis,
        Step::GenerateDiagram,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Step::SelectImage => "Select Image",
            Step::UploadAndProcess => "Upload & Process",
            Step::AiAnalysis => "AI Analysis",
            Step::GenerateDiagram => "Generate Diagram",
        }
    }

    /// 1-based position, handy for "step 2/4" displays.
    pub fn number(&self) -> usize {
        *self as usize + 1
    }
}

/// Called by the pipeline as it moves through each [`Step`].
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: the server
/// shares one config across request tasks.
pub trait DiagramProgressCallback: Send + Sync {
    /// Called when `step` begins.
    fn on_step_start(&self, step: Step) {
        let _ = step;
    }

    /// Called when `step` finished successfully.
    fn on_step_complete(&self, step: Step) {
        let _ = step;
    }

    /// Called when `step` failed; no further events follow for this request.
    ///
    /// # Arguments
    /// * `step`  — the step that failed
    /// * `error` — the user-facing error text
    fn on_error(&self, step: Step, error: &str) {
        let _ = (step, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DiagramProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DiagramConfig`].
pub type ProgressCallback = Arc<dyn DiagramProgressCallback>;
