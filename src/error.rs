//! Error types for the edgequake-img2diagram library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Img2DiagramError`] — **Terminal**: the request cannot produce a
//!   diagram (no file, not an image, analysis failed). Returned as
//!   `Err(Img2DiagramError)` from [`crate::generate_diagram`] and rendered
//!   as `{ "error": "..." }` by the HTTP layer.
//!
//! * [`AnalysisError`] — **Recorded**: the model call failed. Stored inside
//!   [`crate::output::AnalysisResult`] so the analysis step itself never
//!   fails; the orchestrator decides what to do with it.
//!
//! The `Display` strings of the validation variants are shown to end users
//! verbatim, so they are kept short and free of internal detail.

use std::path::PathBuf;
use thiserror::Error;

/// Name of the model service used in user-facing messages.
pub const SERVICE_LABEL: &str = "OpenAI";

/// All terminal errors returned by the edgequake-img2diagram library.
#[derive(Debug, Error)]
pub enum Img2DiagramError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No file was uploaded, or the file is empty.
    #[error("Please select an image file")]
    NoImage,

    /// The declared media type does not start with `image/`.
    #[error("File must be an image")]
    NotAnImage { media_type: String },

    /// Input file was not found at the given path (CLI only).
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file (CLI only).
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Analysis errors ───────────────────────────────────────────────────
    /// The model call failed; the inner error carries the user-facing text.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// The model answered, but nothing usable was left after cleanup.
    #[error("Model returned an empty diagram")]
    EmptyDiagram,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The HTTP server could not listen on its configured address.
    #[error("Failed to bind '{addr}': {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Img2DiagramError {
    /// True for errors caused by the uploaded input rather than the system.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Img2DiagramError::NoImage
                | Img2DiagramError::NotAnImage { .. }
                | Img2DiagramError::FileNotFound { .. }
                | Img2DiagramError::PermissionDenied { .. }
        )
    }

    /// True for errors caused by local configuration (missing key, bad builder input).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Img2DiagramError::InvalidConfig(_)
                | Img2DiagramError::Analysis(AnalysisError::MissingApiKey { .. })
        )
    }
}

/// A recorded failure of the image-analysis step.
///
/// Every variant renders to a message fit for display next to the upload form.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum AnalysisError {
    /// No credential configured; detected before any network call.
    #[error("{service} API key not configured")]
    MissingApiKey { service: String },

    /// The API answered with a non-2xx status.
    ///
    /// `message` is the API's own `error.message` when present, otherwise the
    /// HTTP status text.
    #[error("{service} API error: {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset, timeout).
    #[error("{0}")]
    Transport(String),

    /// A 2xx response whose body could not be decoded.
    #[error("{0}")]
    InvalidResponse(String),

    /// Failure without any usable description.
    #[error("Unknown error occurred")]
    Unknown,
}

impl AnalysisError {
    pub(crate) fn missing_api_key() -> Self {
        AnalysisError::MissingApiKey {
            service: SERVICE_LABEL.to_string(),
        }
    }

    pub(crate) fn api(status: u16, message: impl Into<String>) -> Self {
        AnalysisError::Api {
            service: SERVICE_LABEL.to_string(),
            status,
            message: message.into(),
        }
    }

    /// Wrap an arbitrary error message, falling back to [`AnalysisError::Unknown`]
    /// when the message is blank.
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            AnalysisError::Unknown
        } else {
            AnalysisError::Transport(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_verbatim() {
        assert_eq!(Img2DiagramError::NoImage.to_string(), "Please select an image file");
        let e = Img2DiagramError::NotAnImage {
            media_type: "text/plain".into(),
        };
        assert_eq!(e.to_string(), "File must be an image");
        assert!(e.is_validation());
    }

    #[test]
    fn missing_key_display() {
        let e = AnalysisError::missing_api_key();
        assert_eq!(e.to_string(), "OpenAI API key not configured");
        assert!(Img2DiagramError::from(e).is_configuration());
    }

    #[test]
    fn api_error_display() {
        let e = AnalysisError::api(500, "overloaded");
        assert_eq!(e.to_string(), "OpenAI API error: overloaded");
    }

    #[test]
    fn analysis_error_is_transparent() {
        let e = Img2DiagramError::from(AnalysisError::Transport("connection refused".into()));
        assert_eq!(e.to_string(), "connection refused");
        assert!(!e.is_validation());
    }

    #[test]
    fn bind_failure_is_neither_input_nor_config() {
        let e = Img2DiagramError::BindFailed {
            addr: "127.0.0.1:80".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(e.to_string(), "Failed to bind '127.0.0.1:80': denied");
        assert!(!e.is_validation());
        assert!(!e.is_configuration());
    }

    #[test]
    fn blank_transport_message_is_unknown() {
        assert_eq!(AnalysisError::transport("  "), AnalysisError::Unknown);
        assert_eq!(AnalysisError::Unknown.to_string(), "Unknown error occurred");
    }
}
