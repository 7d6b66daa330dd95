//! Image encoding: uploaded bytes → base64 `data:` URL.
//!
//! The same data URL serves twice: it is embedded in the chat-completions
//! request body, and it is echoed back to the UI so the uploaded picture can
//! be shown next to the generated diagram without a second round-trip.
//! The bytes are sent as uploaded; no re-encoding, so the model sees exactly
//! what the user picked.

use crate::pipeline::input::UploadedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// A base64-encoded image tagged with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub data: String,
    pub media_type: String,
}

impl ImagePayload {
    /// Encode an upload. The media type is taken as declared.
    pub fn from_upload(image: &UploadedImage) -> Self {
        let data = STANDARD.encode(&image.bytes);
        debug!("Encoded image → {} bytes base64", data.len());
        Self {
            data,
            media_type: image.media_type.clone(),
        }
    }

    /// `data:<media type>;base64,<data>`
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    /// Length of the base64 text.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
