//! HTTP surface: accept a multipart upload, answer with a [`DiagramResponse`].
//!
//! ## Routes
//!
//! | Method | Path           | Body |
//! |--------|----------------|------|
//! | POST   | `/api/diagram` | multipart: `image` (file), `diagramType` (optional) |
//! | GET    | `/health`      | — |
//!
//! The JSON body is always the discriminated `{error}` / `{success, …}`
//! shape the UI expects; the status code only classifies the failure
//! (400 input, 500 configuration, 502 model).

use crate::analyze::generate_diagram;
use crate::config::{DiagramConfig, Dialect, ServerConfig};
use crate::error::Img2DiagramError;
use crate::output::DiagramResponse;
use crate::pipeline::input::UploadedImage;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Multipart field carrying the dialect; `dialect` is accepted as an alias.
pub const DIALECT_FIELD: &str = "diagramType";

/// Shared, immutable per-process state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DiagramConfig>,
}

/// Build the application router.
///
/// A pooled `reqwest::Client` is created unless `config` already carries one.
pub fn build_router(
    mut config: DiagramConfig,
    server: &ServerConfig,
) -> Result<Router, Img2DiagramError> {
    if config.client.is_none() {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Img2DiagramError::Internal(format!("Failed to build HTTP client: {e}")))?;
        config.client = Some(client);
    }

    let state = AppState {
        config: Arc::new(config),
    };

    let router = Router::new()
        .route("/api/diagram", post(create_diagram))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state);

    Ok(router)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(
    config: DiagramConfig,
    server: ServerConfig,
    shutdown: F,
) -> Result<(), Img2DiagramError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if config.api_key.is_none() {
        warn!("No API key configured; every analysis will fail until one is set");
    }

    let router = build_router(config, &server)?;
    let listener = TcpListener::bind(&server.bind)
        .await
        .map_err(|source| Img2DiagramError::BindFailed {
            addr: server.bind.clone(),
            source,
        })?;
    info!("img2diagram listening on http://{}", server.bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Img2DiagramError::Internal(format!("Server error: {e}")))?;

    info!("img2diagram stopped");
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// Parsed form fields.
#[derive(Debug, Default)]
struct DiagramForm {
    image: Option<UploadedImage>,
    dialect: Option<String>,
}

async fn create_diagram(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<DiagramResponse>) {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            return (
                rejection.status(),
                Json(DiagramResponse::error(rejection.body_text())),
            )
        }
    };

    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err((status, message)) => return (status, Json(DiagramResponse::error(message))),
    };

    let dialect = Dialect::parse_lenient(form.dialect.as_deref());
    let result = generate_diagram(form.image.as_ref(), dialect, &state.config).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => status_for(e),
    };

    (status, Json(result.into()))
}

async fn read_form(multipart: &mut Multipart) -> Result<DiagramForm, (StatusCode, String)> {
    let mut form = DiagramForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            IMAGE_FIELD => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let media_type = field.content_type().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| (e.status(), e.body_text()))?;
                form.image = Some(UploadedImage::new(bytes.to_vec(), media_type, file_name));
            }
            DIALECT_FIELD | "dialect" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| (e.status(), e.body_text()))?;
                form.dialect = Some(value);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Status code for a failed request; the body carries the message.
pub fn status_for(error: &Img2DiagramError) -> StatusCode {
    if error.is_validation() {
        StatusCode::BAD_REQUEST
    } else if error.is_configuration() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        match error {
            Img2DiagramError::Analysis(_) | Img2DiagramError::EmptyDiagram => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
