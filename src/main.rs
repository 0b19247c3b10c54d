//! Report Lens server
//!
//! Entry point: load configuration and the Gemini credential, then serve.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use tracing::error;

use report_lens::analysis::GeminiClient;
use report_lens::config::{AppConfig, load_gemini_settings};
use report_lens::server::{start_server, with_configured_timeout};
use report_lens::telemetry::{self, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before anything reads the environment
    let _ = dotenv();

    telemetry::init(LogFormat::from_env());

    let config = match AppConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!(name: "config.invalid", error = %e, "Configuration error");
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Missing credential is fatal: refuse to bind rather than fail on first use.
    let settings = match load_gemini_settings(&config.analysis) {
        Ok(s) => s,
        Err(e) => {
            error!(name: "config.credential_missing", error = %e, "Configuration error");
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let analyzer = with_configured_timeout(&config, GeminiClient::new(settings));

    start_server(config, analyzer).await
}
