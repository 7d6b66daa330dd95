//! Configuration types for image-to-diagram conversion.
//!
//! All analysis behaviour is controlled through [`DiagramConfig`], built via
//! its [`DiagramConfigBuilder`]. The model credential lives here too and is
//! handed to the pipeline explicitly; nothing in the library reads the
//! process environment; that is the binary's job.

use crate::error::Img2DiagramError;
use crate::pipeline::render;
use crate::progress::ProgressCallback;
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default OpenAI-compatible API base.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for one or many diagram analyses.
///
/// Built via [`DiagramConfig::builder()`] or using [`DiagramConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_img2diagram::DiagramConfig;
///
/// let config = DiagramConfig::builder()
///     .api_key("sk-test")
///     .model("gpt-4o-mini")
///     .max_tokens(1500)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gpt-4o-mini");
/// ```
#[derive(Clone)]
pub struct DiagramConfig {
    /// Bearer credential for the model API. `None` short-circuits every
    /// analysis with "API key not configured".
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API. Default: [`DEFAULT_API_BASE`].
    ///
    /// `/chat/completions` is appended. Point this at Azure, a local vLLM /
    /// Ollama gateway, or a mock server in tests.
    pub api_base: String,

    /// Vision model identifier. Default: `gpt-4o`.
    pub model: String,

    /// Maximum tokens the model may generate. Default: 1000.
    ///
    /// Diagram sources are short; 1000 tokens covers a dense sequence diagram.
    /// Too low a value truncates the text and the renderer shows a syntax error.
    pub max_tokens: u32,

    /// Sampling temperature. Default: unset (provider default).
    pub temperature: Option<f32>,

    /// Image detail hint sent with the picture. Default: unset (provider default).
    pub image_detail: Option<ImageDetail>,

    /// Per-call timeout in seconds. Default: unset (transport default).
    pub api_timeout_secs: Option<u64>,

    /// Custom instruction used for every dialect. If None, uses the built-in
    /// per-dialect prompts in [`crate::prompts`].
    pub instruction: Option<String>,

    /// Rendering-service base URLs.
    pub endpoints: RenderEndpoints,

    /// Pre-constructed HTTP client. Takes precedence over building one per call.
    ///
    /// Long-running hosts (the HTTP server) share one client so connections
    /// to the model API are pooled.
    pub client: Option<reqwest::Client>,

    /// Optional step-by-step progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: None,
            image_detail: None,
            api_timeout_secs: None,
            instruction: None,
            endpoints: RenderEndpoints::default(),
            client: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DiagramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagramConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("image_detail", &self.image_detail)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("instruction", &self.instruction.as_ref().map(|s| s.len()))
            .field("endpoints", &self.endpoints)
            .field("client", &self.client.as_ref().map(|_| "<reqwest::Client>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DiagramProgressCallback>"),
            )
            .finish()
    }
}

impl DiagramConfig {
    /// Create a new builder for `DiagramConfig`.
    pub fn builder() -> DiagramConfigBuilder {
        DiagramConfigBuilder {
            config: Self::default(),
        }
    }

    /// Instruction text for `dialect`, honouring the override.
    pub fn instruction_for(&self, dialect: Dialect) -> &str {
        self.instruction
            .as_deref()
            .unwrap_or_else(|| prompts::instruction_for(dialect))
    }

    /// Full chat-completions endpoint.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Builder for [`DiagramConfig`].
#[derive(Debug)]
pub struct DiagramConfigBuilder {
    config: DiagramConfig,
}

impl DiagramConfigBuilder {
    /// Blank keys are treated as absent.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.api_key = if key.trim().is_empty() {
            None
        } else {
            Some(key)
        };
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn image_detail(mut self, detail: ImageDetail) -> Self {
        self.config.image_detail = Some(detail);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn endpoints(mut self, endpoints: RenderEndpoints) -> Self {
        self.config.endpoints = endpoints;
        self
    }

    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DiagramConfig, Img2DiagramError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(Img2DiagramError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if !(c.api_base.starts_with("http://") || c.api_base.starts_with("https://")) {
            return Err(Img2DiagramError::InvalidConfig(format!(
                "api_base must be an http(s) URL, got '{}'",
                c.api_base
            )));
        }
        if c.model.trim().is_empty() {
            return Err(Img2DiagramError::InvalidConfig("model must not be empty".into()));
        }
        if let Some(t) = c.temperature {
            if !t.is_finite() {
                return Err(Img2DiagramError::InvalidConfig(format!(
                    "temperature must be a finite number, got {t}"
                )));
            }
        }
        if c.api_timeout_secs == Some(0) {
            return Err(Img2DiagramError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Settings for the HTTP `serve` mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on. Default: `127.0.0.1:3000`.
    pub bind: String,

    /// Largest accepted request body in bytes. Default: 20 MiB.
    ///
    /// Matches the upload ceiling of the common vision APIs; anything larger
    /// would be rejected upstream anyway.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Diagram text language the model is asked to produce.
///
/// The dialect selects both the instruction prompt and the rendering service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PlantUML, rendered as SVG by plantuml.com. (default)
    #[default]
    PlantUml,
    /// Mermaid, rendered by mermaid.ink.
    Mermaid,
    /// ZenUML sequence diagrams, rendered as PNG by zenuml.com.
    ZenUml,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::PlantUml, Dialect::Mermaid, Dialect::ZenUml];

    /// Wire name used in form fields and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::PlantUml => "plantuml",
            Dialect::Mermaid => "mermaid",
            Dialect::ZenUml => "zenuml",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Dialect::PlantUml => "PlantUML",
            Dialect::Mermaid => "Mermaid",
            Dialect::ZenUml => "ZenUML",
        }
    }

    /// Parse a form value; anything unrecognised (or absent) means PlantUML.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    /// Rendering-service URL for `diagram_text` in this dialect.
    pub fn render_url(&self, diagram_text: &str, endpoints: &RenderEndpoints) -> String {
        match self {
            Dialect::PlantUml => render::plantuml_url(&endpoints.plantuml, diagram_text),
            Dialect::Mermaid => render::mermaid_url(&endpoints.mermaid, diagram_text),
            Dialect::ZenUml => render::zenuml_url(&endpoints.zenuml, diagram_text),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Img2DiagramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plantuml" => Ok(Dialect::PlantUml),
            "mermaid" => Ok(Dialect::Mermaid),
            "zenuml" => Ok(Dialect::ZenUml),
            other => Err(Img2DiagramError::InvalidConfig(format!(
                "unknown diagram type '{other}' (expected plantuml, mermaid or zenuml)"
            ))),
        }
    }
}

/// `detail` hint attached to the image part of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    High,
    Auto,
}

/// Base URLs of the public rendering services.
///
/// Override to point at a self-hosted PlantUML server or mermaid.ink instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderEndpoints {
    pub plantuml: String,
    pub mermaid: String,
    pub zenuml: String,
}

impl Default for RenderEndpoints {
    fn default() -> Self {
        Self {
            plantuml: render::PLANTUML_SVG_BASE.to_string(),
            mermaid: render::MERMAID_IMG_BASE.to_string(),
            zenuml: render::ZENUML_PNG_BASE.to_string(),
        }
    }
}
