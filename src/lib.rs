//! # edgequake-img2diagram
//!
//! Turn a photo or screenshot of a diagram into PlantUML, Mermaid or ZenUML
//! source using a Vision Language Model, plus a ready-to-use rendering URL.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image upload
//!  │
//!  ├─ 1. Validate  non-empty, media type image/*
//!  ├─ 2. Encode    bytes → base64 data URL
//!  ├─ 3. VLM       one chat-completions call with a dialect-specific instruction
//!  ├─ 4. Polish    strip the markdown fences the model adds anyway
//!  └─ 5. Render    diagram text → plantuml.com / mermaid.ink / zenuml.com URL
//! ```
//!
//! The rendering services are never called by this crate; the URL is handed
//! to the client, which fetches the picture itself.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_img2diagram::{generate_diagram_from_path, DiagramConfig, Dialect};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DiagramConfig::builder()
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     let output = generate_diagram_from_path("whiteboard.jpg", Dialect::Mermaid, &config).await?;
//!     println!("{}", output.diagram_text);
//!     eprintln!("{}", output.diagram_image_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum router accepting multipart uploads ([`server`]) |
//! | `cli`    | on      | The `img2diagram` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable both when using only the library:
//! ```toml
//! edgequake-img2diagram = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze_image, generate_diagram, generate_diagram_from_path, generate_diagram_sync, render_url,
};
pub use config::{DiagramConfig, DiagramConfigBuilder, Dialect, ImageDetail, RenderEndpoints, ServerConfig};
pub use error::{AnalysisError, Img2DiagramError};
pub use output::{AnalysisResult, DiagramOutput, DiagramResponse};
pub use pipeline::input::UploadedImage;
pub use progress::{DiagramProgressCallback, NoopProgressCallback, ProgressCallback, Step};
