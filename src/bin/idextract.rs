//! Server binary for edgequake-idextract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` / `ServerConfig`, builds the gateway and serves.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_idextract::config::DEFAULT_MODEL;
use edgequake_idextract::pipeline::gateway::OPENAI_BASE_URL;
use edgequake_idextract::{
    serve, ExtractionConfig, Extractor, ModelGateway, OpenAiGateway, ProviderGateway, SchemaKind,
    ServerConfig,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on 0.0.0.0:5000 with gpt-4o
  OPENAI_API_KEY=sk-... idextract

  # Short identity schema, different port
  idextract --schema identity --bind 127.0.0.1:8080

  # Any provider known to edgequake-llm
  ANTHROPIC_API_KEY=... idextract --provider anthropic --model claude-sonnet-4-20250514

  # Call it
  curl -F file=@ine.jpg http://localhost:5000/ocr-curp

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (provider "openai")
  OPENAI_BASE_URL         OpenAI-compatible base URL
  ANTHROPIC_API_KEY       Anthropic API key (provider "anthropic")
  GEMINI_API_KEY          Google Gemini API key (provider "gemini")
  PDFIUM_LIB_PATH         Path to an existing libpdfium (skips auto-download)
  RUST_LOG                Log filter, overrides --verbose / --quiet
"#;

/// Extract identity-document fields with a Vision LLM over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "idextract",
    version,
    about = "Extract identity-document fields with a Vision LLM over HTTP",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Listen address.
    #[arg(long, env = "IDEXTRACT_BIND", default_value = "0.0.0.0:5000")]
    bind: SocketAddr,

    /// LLM provider: openai, anthropic, gemini, ollama, azure, …
    #[arg(long, env = "IDEXTRACT_PROVIDER", default_value = "openai")]
    provider: String,

    /// Vision model ID.
    #[arg(long, env = "IDEXTRACT_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the OpenAI-compatible API (provider "openai" only).
    #[arg(long, env = "OPENAI_BASE_URL", default_value = OPENAI_BASE_URL)]
    base_url: String,

    /// OpenAI API key (provider "openai" only).
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Target field set.
    #[arg(long, env = "IDEXTRACT_SCHEMA", value_enum, default_value = "extended")]
    schema: SchemaArg,

    /// Path to a text file replacing the generated instruction.
    #[arg(long, env = "IDEXTRACT_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// Max output tokens per document.
    #[arg(long, env = "IDEXTRACT_MAX_TOKENS", default_value_t = 300)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "IDEXTRACT_TEMPERATURE")]
    temperature: Option<f32>,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "IDEXTRACT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Largest accepted upload, in MiB.
    #[arg(long, env = "IDEXTRACT_MAX_UPLOAD_MB", default_value_t = 20)]
    max_upload_mb: usize,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IDEXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IDEXTRACT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum SchemaArg {
    Identity,
    Extended,
}

impl From<SchemaArg> for SchemaKind {
    fn from(v: SchemaArg) -> Self {
        match v {
            SchemaArg::Identity => SchemaKind::Identity,
            SchemaArg::Extended => SchemaKind::Extended,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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

    // ── Warm up PDFium ───────────────────────────────────────────────────
    // Downloads the engine on first run so the first PDF upload does not pay
    // for it. Image uploads work without it, so failure is only a warning.
    if let Err(e) = tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None)) {
        warn!("PDFium is unavailable, PDF uploads will fail: {}", e);
    }

    // ── Build config and gateway ─────────────────────────────────────────
    let config = build_config(&cli).await?;
    let gateway = build_gateway(&cli)?;
    info!(
        "Using provider '{}' with model '{}', schema '{}'",
        gateway.name(),
        config.model,
        config.schema.name
    );

    let server = ServerConfig {
        bind: cli.bind,
        ..ServerConfig::default()
    }
    .with_max_upload_mb(cli.max_upload_mb);

    // ── Serve ────────────────────────────────────────────────────────────
    serve(Extractor::new(config, gateway), &server, shutdown_signal())
        .await
        .with_context(|| format!("Server on {} failed", server.bind))?;

    info!("Shut down cleanly");
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .model(&cli.model)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .schema_kind(cli.schema.clone().into());

    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }

    if let Some(ref path) = cli.instruction {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(text);
    }

    builder.build().context("Invalid configuration")
}

/// The API key goes straight into the gateway; it is never stored in config.
fn build_gateway(cli: &Cli) -> Result<Arc<dyn ModelGateway>> {
    if cli.provider == "openai" {
        let Some(key) = cli.api_key.as_deref().filter(|k| !k.is_empty()) else {
            bail!("OPENAI_API_KEY is not set. Export it or pass --api-key.");
        };
        return Ok(Arc::new(OpenAiGateway::new(key).with_base_url(&cli.base_url)));
    }

    let gateway = ProviderGateway::from_factory(&cli.provider, &cli.model)
        .context("Failed to create LLM provider")?;
    Ok(Arc::new(gateway))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
