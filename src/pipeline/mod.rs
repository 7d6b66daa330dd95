//! Pipeline stages for image-to-diagram conversion.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the network-facing stage stays small.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ postprocess ──▶ render
//! (upload)  (base64)   (VLM)   (fences)        (URL)
//! ```
//!
//! 1. [`input`]  — the uploaded image and its validation
//! 2. [`encode`] — base64 `data:` URL for the request body and the UI
//! 3. [`llm`]    — build the chat-completions request and classify the
//!    outcome; the only stage with network I/O
//! 4. [`postprocess`] — strip markdown fences the model added anyway
//! 5. [`render`] — turn diagram text into a rendering-service URL

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
