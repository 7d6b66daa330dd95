//! CLI binary for edgequake-img2diagram.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `DiagramConfig`, runs one conversion or the HTTP server, and prints
//! results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_img2diagram::{
    generate_diagram_from_path, render_url, server, DiagramConfig, DiagramProgressCallback,
    DiagramResponse, Dialect, ImageDetail, ProgressCallback, ServerConfig, Step,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner line per request, with a
/// checkmark line printed as each of the four steps completes.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(Step::ALL.len() as u64);
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl DiagramProgressCallback for CliProgressCallback {
    fn on_step_start(&self, step: Step) {
        self.bar
            .set_prefix(format!("{}/{}", step.number(), Step::ALL.len()));
        self.bar.set_message(format!("{}…", step.label()));
    }

    fn on_step_complete(&self, step: Step) {
        self.bar.println(format!("  {} {}", green("✓"), step.label()));
        self.bar.inc(1);
        if step == Step::GenerateDiagram {
            self.bar.finish_and_clear();
        }
    }

    fn on_error(&self, step: Step, error: &str) {
        self.bar
            .println(format!("  {} {}  {}", red("✗"), step.label(), red(error)));
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # PlantUML from a whiteboard photo (text on stdout, URL on stderr)
  img2diagram analyze whiteboard.jpg

  # Mermaid, full JSON result
  img2diagram analyze --dialect mermaid --json screenshot.png > result.json

  # Render URL for diagram text you already have
  img2diagram encode --dialect plantuml diagram.puml
  echo 'graph TD;A-->B;' | img2diagram encode --dialect mermaid -

  # HTTP service (POST multipart to /api/diagram)
  img2diagram serve --bind 0.0.0.0:3000

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY            Model API key
  IMG2DIAGRAM_API_BASE      OpenAI-compatible base URL (default https://api.openai.com/v1)
  IMG2DIAGRAM_MODEL         Vision model (default gpt-4o)
  IMG2DIAGRAM_BIND          Listen address for `serve`
  RUST_LOG                  Overrides the log filter
"#;

/// Turn diagram images into PlantUML, Mermaid or ZenUML with a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "img2diagram",
    version,
    about = "Turn diagram images into PlantUML, Mermaid or ZenUML with a Vision LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "IMG2DIAGRAM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "IMG2DIAGRAM_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse one image file.
    Analyze {
        /// Path to the image.
        image: PathBuf,

        /// Diagram language to generate.
        #[arg(short, long, value_enum, default_value = "plantuml")]
        dialect: DialectArg,

        /// Output the JSON response (as served over HTTP) instead of text.
        #[arg(long)]
        json: bool,

        /// Disable progress spinner.
        #[arg(long, env = "IMG2DIAGRAM_NO_PROGRESS")]
        no_progress: bool,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Print the rendering URL for existing diagram text.
    Encode {
        /// File with diagram text, or `-` for stdin.
        input: String,

        /// Diagram language of the input.
        #[arg(short, long, value_enum, default_value = "plantuml")]
        dialect: DialectArg,
    },

    /// Run the HTTP service.
    Serve {
        /// Listen address.
        #[arg(long, env = "IMG2DIAGRAM_BIND", default_value = "127.0.0.1:3000")]
        bind: String,

        /// Largest accepted upload in bytes.
        #[arg(long, env = "IMG2DIAGRAM_MAX_UPLOAD_BYTES", default_value_t = 20 * 1024 * 1024)]
        max_upload_bytes: usize,

        #[command(flatten)]
        model: ModelArgs,
    },
}

/// Model-call settings shared by `analyze` and `serve`.
#[derive(Args, Debug)]
struct ModelArgs {
    /// Model API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = "IMG2DIAGRAM_API_BASE", default_value = "https://api.openai.com/v1")]
    api_base: String,

    /// Vision model ID.
    #[arg(long, env = "IMG2DIAGRAM_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Max output tokens.
    #[arg(long, env = "IMG2DIAGRAM_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: u32,

    /// Sampling temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "IMG2DIAGRAM_TEMPERATURE")]
    temperature: Option<f32>,

    /// Image detail hint: low, high, auto.
    #[arg(long, value_enum)]
    detail: Option<DetailArg>,

    /// Per-call timeout in seconds. Transport default when unset.
    #[arg(long, env = "IMG2DIAGRAM_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Path to a text file replacing the built-in instruction prompt.
    #[arg(long, env = "IMG2DIAGRAM_INSTRUCTION")]
    instruction: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DialectArg {
    Plantuml,
    Mermaid,
    Zenuml,
}

impl From<DialectArg> for Dialect {
    fn from(v: DialectArg) -> Self {
        match v {
            DialectArg::Plantuml => Dialect::PlantUml,
            DialectArg::Mermaid => Dialect::Mermaid,
            DialectArg::Zenuml => Dialect::ZenUml,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DetailArg {
    Low,
    High,
    Auto,
}

impl From<DetailArg> for ImageDetail {
    fn from(v: DetailArg) -> Self {
        match v {
            DetailArg::Low => ImageDetail::Low,
            DetailArg::High => ImageDetail::High,
            DetailArg::Auto => ImageDetail::Auto,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports progress for `analyze`; keep library logs
    // at error level there unless asked otherwise.
    let spinner_active = matches!(
        cli.command,
        Command::Analyze { json: false, no_progress: false, .. }
    ) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner_active {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Analyze {
            image,
            dialect,
            json,
            model,
            ..
        } => {
            let progress: Option<ProgressCallback> = if spinner_active {
                Some(CliProgressCallback::new() as Arc<dyn DiagramProgressCallback>)
            } else {
                None
            };
            let config = build_config(&model, progress).await?;
            run_analyze(image, dialect.into(), json, cli.quiet, &config).await
        }
        Command::Encode { input, dialect } => {
            let text = read_text(&input)?;
            println!("{}", render_url(text.trim(), dialect.into(), &DiagramConfig::default()));
            Ok(())
        }
        Command::Serve {
            bind,
            max_upload_bytes,
            model,
        } => {
            let config = build_config(&model, None).await?;
            let server_config = ServerConfig {
                bind,
                max_upload_bytes,
            };
            server::serve(config, server_config, shutdown_signal())
                .await
                .context("Server failed")
        }
    }
}

async fn run_analyze(
    image: PathBuf,
    dialect: Dialect,
    json: bool,
    quiet: bool,
    config: &DiagramConfig,
) -> Result<()> {
    let result = generate_diagram_from_path(&image, dialect, config).await;

    if json {
        let failed = result.is_err();
        let response = DiagramResponse::from(result);
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to serialise output")?
        );
        if failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    let output = result.context("Diagram generation failed")?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(output.diagram_text.as_bytes())
        .context("Failed to write to stdout")?;
    handle.write_all(b"\n").ok();

    if !quiet {
        eprintln!(
            "{} {} diagram  {}",
            green("✔"),
            bold(dialect.label()),
            dim(&format!(
                "{} tokens in / {} tokens out, {}ms",
                output.input_tokens, output.output_tokens, output.duration_ms
            )),
        );
        eprintln!("{}", output.diagram_image_url);
    }
    Ok(())
}

/// Map CLI args to `DiagramConfig`.
async fn build_config(args: &ModelArgs, progress: Option<ProgressCallback>) -> Result<DiagramConfig> {
    let mut builder = DiagramConfig::builder()
        .api_base(&args.api_base)
        .model(&args.model)
        .max_tokens(args.max_tokens);

    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key);
    }
    if let Some(t) = args.temperature {
        builder = builder.temperature(t);
    }
    if let Some(d) = args.detail {
        builder = builder.image_detail(d.into());
    }
    if let Some(secs) = args.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref path) = args.instruction {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(text);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn read_text(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
}
