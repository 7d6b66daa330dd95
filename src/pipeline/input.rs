//! Input handling: the uploaded image and its validation.
//!
//! Uploads arrive either from a multipart form (bytes + declared media type
//! + file name) or from a path on disk (CLI). Both end up as an
//! [`UploadedImage`], which is validated before anything else happens, so
//! a bad upload never costs an API call.

use crate::error::Img2DiagramError;
use std::path::Path;
use tracing::debug;

/// An image received from the user. Read-only; dropped with the request.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    /// Declared media type, e.g. `image/png`. May be empty when unknown.
    pub media_type: String,
    pub file_name: String,
}

impl std::fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedImage")
            .field("bytes", &self.bytes.len())
            .field("media_type", &self.media_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

impl UploadedImage {
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        media_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Read an image from disk, sniffing its media type.
    ///
    /// The type comes from the file's magic bytes when the `image` crate
    /// recognises them, otherwise from the extension. An unrecognised file is
    /// still returned (with `application/octet-stream`) so that validation,
    /// not I/O, reports "File must be an image".
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, Img2DiagramError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => Img2DiagramError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Img2DiagramError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;

        let media_type = sniff_media_type(&bytes, path);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!("Read {} ({} bytes, {})", path.display(), bytes.len(), media_type);
        Ok(Self::new(bytes, media_type, file_name))
    }
}

/// Reject uploads that must not reach the model.
///
/// Order matters: an empty upload is "no file" even if its declared type is
/// wrong, matching what the user actually did.
pub fn validate(image: Option<&UploadedImage>) -> Result<&UploadedImage, Img2DiagramError> {
    let image = match image {
        Some(img) if img.size() > 0 => img,
        _ => return Err(Img2DiagramError::NoImage),
    };
    if !image.media_type.starts_with("image/") {
        return Err(Img2DiagramError::NotAnImage {
            media_type: image.media_type.clone(),
        });
    }
    Ok(image)
}

/// Best-effort media type for a file on disk.
pub fn sniff_media_type(bytes: &[u8], path: &Path) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
    .to_string()
}
