//! Conversion entry points.
//!
//! [`analyze_image`] is the analysis step alone: one model call, cleaned
//! text, never an `Err`. [`generate_diagram`] is the full request: validate
//! the upload, analyse it, and build the rendering URL.

use crate::config::{DiagramConfig, Dialect};
use crate::error::Img2DiagramError;
use crate::output::{AnalysisResult, DiagramOutput};
use crate::pipeline::encode::ImagePayload;
use crate::pipeline::input::{self, UploadedImage};
use crate::pipeline::{llm, postprocess, render};
use crate::progress::Step;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Ask the model for `dialect` source text describing `image`.
///
/// ## Return Value
///
/// Always returns an `AnalysisResult`; failures (missing key, API error,
/// network error) are recorded in `result.error` rather than propagated.
/// The caller is expected to have validated the upload already.
pub async fn analyze_image(
    image: &UploadedImage,
    dialect: Dialect,
    config: &DiagramConfig,
) -> AnalysisResult {
    let start = Instant::now();
    let payload = ImagePayload::from_upload(image);

    let outcome = llm::complete(&payload, dialect, config).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(completion) => {
            debug!(
                "{}: {} input tokens, {} output tokens, {}ms",
                dialect, completion.input_tokens, completion.output_tokens, duration_ms
            );
            AnalysisResult {
                dialect,
                diagram_text: postprocess::clean_diagram_text(&completion.content),
                error: None,
                input_tokens: completion.input_tokens,
                output_tokens: completion.output_tokens,
                duration_ms,
            }
        }
        Err(e) => {
            warn!("{}: analysis failed: {}", dialect, e);
            AnalysisResult {
                dialect,
                diagram_text: String::new(),
                error: Some(e),
                input_tokens: 0,
                output_tokens: 0,
                duration_ms,
            }
        }
    }
}

/// Validate, analyse and encode one upload.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// - [`Img2DiagramError::NoImage`] / [`Img2DiagramError::NotAnImage`] before
///   any network call
/// - [`Img2DiagramError::Analysis`] when the model call failed
/// - [`Img2DiagramError::EmptyDiagram`] when the reply was blank after cleanup
///
/// There is no partial success: either every step completes or an error is
/// returned.
pub async fn generate_diagram(
    image: Option<&UploadedImage>,
    dialect: Dialect,
    config: &DiagramConfig,
) -> Result<DiagramOutput, Img2DiagramError> {
    let cb = config.progress_callback.as_deref();
    let fail = |step: Step, e: Img2DiagramError| {
        if let Some(cb) = cb {
            cb.on_error(step, &e.to_string());
        }
        e
    };
    let begin = |step: Step| {
        if let Some(cb) = cb {
            cb.on_step_start(step);
        }
    };
    let end = |step: Step| {
        if let Some(cb) = cb {
            cb.on_step_complete(step);
        }
    };

    // ── Step 1: Validate upload ──────────────────────────────────────────
    begin(Step::SelectImage);
    let image = input::validate(image).map_err(|e| fail(Step::SelectImage, e))?;
    end(Step::SelectImage);
    info!(
        "Generating {} diagram from '{}' ({} bytes, {})",
        dialect.label(),
        image.file_name,
        image.size(),
        image.media_type
    );

    // ── Step 2: Display data URL ─────────────────────────────────────────
    begin(Step::UploadAndProcess);
    let image_data_url = ImagePayload::from_upload(image).data_url();
    end(Step::UploadAndProcess);

    // ── Step 3: Model call ───────────────────────────────────────────────
    begin(Step::AiAnalysis);
    let analysis = analyze_image(image, dialect, config).await;
    let (input_tokens, output_tokens, duration_ms) = (
        analysis.input_tokens,
        analysis.output_tokens,
        analysis.duration_ms,
    );
    let diagram_text = analysis
        .into_result()
        .map_err(|e| fail(Step::AiAnalysis, e.into()))?;
    if diagram_text.is_empty() {
        return Err(fail(Step::AiAnalysis, Img2DiagramError::EmptyDiagram));
    }
    end(Step::AiAnalysis);

    // ── Step 4: Render URL ───────────────────────────────────────────────
    begin(Step::GenerateDiagram);
    let diagram_image_url = dialect.render_url(&diagram_text, &config.endpoints);
    if diagram_image_url.len() > render::MAX_PORTABLE_URL_LEN {
        warn!(
            "{} render URL is {} chars; some clients reject URLs over {}",
            dialect.label(),
            diagram_image_url.len(),
            render::MAX_PORTABLE_URL_LEN
        );
    }
    end(Step::GenerateDiagram);

    info!(
        "{} diagram ready: {} chars of source, {}ms",
        dialect.label(),
        diagram_text.len(),
        duration_ms
    );

    Ok(DiagramOutput {
        file_name: image.file_name.clone(),
        file_size: image.size(),
        file_type: image.media_type.clone(),
        image_data_url,
        diagram_text,
        diagram_image_url,
        dialect,
        input_tokens,
        output_tokens,
        duration_ms,
    })
}

/// Read an image from disk and run [`generate_diagram`] on it.
pub async fn generate_diagram_from_path(
    path: impl AsRef<Path>,
    dialect: Dialect,
    config: &DiagramConfig,
) -> Result<DiagramOutput, Img2DiagramError> {
    let image = UploadedImage::from_path(path).await?;
    generate_diagram(Some(&image), dialect, config).await
}

/// Synchronous wrapper around [`generate_diagram`].
///
/// Creates a temporary tokio runtime internally, so it must not be called
/// from within an async context.
pub fn generate_diagram_sync(
    image: Option<&UploadedImage>,
    dialect: Dialect,
    config: &DiagramConfig,
) -> Result<DiagramOutput, Img2DiagramError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2DiagramError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_diagram(image, dialect, config))
}

/// Render URL for existing diagram text; no model involved.
pub fn render_url(diagram_text: &str, dialect: Dialect, config: &DiagramConfig) -> String {
    dialect.render_url(diagram_text, &config.endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::DiagramProgressCallback;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Steps(Mutex<Vec<(Step, bool)>>);

    impl DiagramProgressCallback for Steps {
        fn on_step_complete(&self, step: Step) {
            self.0.lock().unwrap().push((step, true));
        }
        fn on_error(&self, step: Step, _error: &str) {
            self.0.lock().unwrap().push((step, false));
        }
    }

    #[tokio::test]
    async fn missing_key_reported_at_analysis_step() {
        let steps = Arc::new(Steps::default());
        let config = DiagramConfig::builder()
            .progress_callback(steps.clone())
            .build()
            .unwrap();
        let img = UploadedImage::new(vec![1, 2, 3], "image/png", "a.png");

        let err = generate_diagram(Some(&img), Dialect::PlantUml, &config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key not configured"));
        assert!(err.is_configuration());

        let seen = steps.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (Step::SelectImage, true),
                (Step::UploadAndProcess, true),
                (Step::AiAnalysis, false),
            ]
        );
    }

    #[tokio::test]
    async fn validation_reported_at_first_step() {
        let steps = Arc::new(Steps::default());
        let config = DiagramConfig::builder()
            .api_key("sk-test")
            .progress_callback(steps.clone())
            .build()
            .unwrap();

        let err = generate_diagram(None, Dialect::Mermaid, &config).await.unwrap_err();
        assert_eq!(err.to_string(), "Please select an image file");
        assert_eq!(*steps.0.lock().unwrap(), vec![(Step::SelectImage, false)]);
    }

    #[test]
    fn sync_wrapper_runs_outside_a_runtime() {
        let config = DiagramConfig::builder().api_key("sk-test").build().unwrap();
        let text = UploadedImage::new(b"hello".to_vec(), "text/plain", "notes.txt");

        let err = generate_diagram_sync(Some(&text), Dialect::ZenUml, &config).unwrap_err();
        assert_eq!(err.to_string(), "File must be an image");
        let err = generate_diagram_sync(None, Dialect::ZenUml, &config).unwrap_err();
        assert!(matches!(err, Img2DiagramError::NoImage));
    }

    #[test]
    fn render_url_without_model() {
        let url = render_url("graph TD;A-->B;", Dialect::Mermaid, &DiagramConfig::default());
        assert_eq!(url, "https://mermaid.ink/img/Z3JhcGggVEQ7QS0tPkI7");
    }
}
