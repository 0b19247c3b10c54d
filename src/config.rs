//! Layered application configuration.
//!
//! Precedence, lowest first: built-in defaults, config file
//! (`--config`/`CONFIG_FILE`, else `./config.{yaml,toml,json}` if present),
//! `REPORT_LENS_*` environment variables (`__` between section and key, e.g.
//! `REPORT_LENS_SERVER__PORT=8000`), then CLI flags.
//!
//! The Gemini credential is not part of [`AppConfig`]; it is read by
//! [`load_gemini_settings`] so it never ends up in a config dump.

use std::env;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::analysis::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiSettings};
use crate::session::DEFAULT_SESSION_TIMEOUT;
use crate::upload::{DEFAULT_MAX_BYTES, UploadLimits};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "REPORT_LENS";

/// Credential variables, in lookup order.
pub const CREDENTIAL_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    /// A value was read but is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted key, e.g. `upload.max_bytes`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Neither credential variable is set.
    #[error("missing Gemini API key: set GEMINI_API_KEY (or API_KEY)")]
    CredentialMissing,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub analysis: AnalysisConfig,
    pub resilience: ResilienceConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub max_bytes: usize,
    pub verify_content_type: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    pub base_url: String,
    pub model: String,
    /// Per-call deadline; `0` disables it.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub timeout_disabled: bool,
    pub requests_per_second: f32,
    pub burst_size: f32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("upload.max_bytes", DEFAULT_MAX_BYTES as u64)?
            .set_default("upload.verify_content_type", true)?
            .set_default("analysis.base_url", DEFAULT_BASE_URL)?
            .set_default("analysis.model", DEFAULT_MODEL)?
            .set_default("analysis.timeout_secs", 120)?
            .set_default("resilience.rate_limit_enabled", true)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.requests_per_second", 5.0)?
            .set_default("resilience.burst_size", 10.0)?
            .set_default("resilience.request_timeout_secs", 30)?
            .set_default("session.idle_timeout_secs", DEFAULT_SESSION_TIMEOUT.as_secs())?
            .set_default("session.sweep_interval_secs", 60)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Flags (and their plain env fallbacks via clap) win over everything.
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "upload.max_bytes",
                reason: "must be greater than zero".into(),
            });
        }
        if let Err(e) = url::Url::parse(&self.analysis.base_url) {
            return Err(ConfigError::Invalid {
                field: "analysis.base_url",
                reason: e.to_string(),
            });
        }
        if self.analysis.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "analysis.model",
                reason: "cannot be empty".into(),
            });
        }
        if self.resilience.rate_limit_enabled
            && (self.resilience.requests_per_second <= 0.0 || self.resilience.burst_size < 1.0)
        {
            return Err(ConfigError::Invalid {
                field: "resilience",
                reason: "requests_per_second must be positive and burst_size at least 1".into(),
            });
        }
        if !self.resilience.timeout_disabled && self.resilience.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "resilience.request_timeout_secs",
                reason: "must be greater than zero; set timeout_disabled to turn it off".into(),
            });
        }
        if self.session.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.sweep_interval_secs",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Limits handed to the upload encoder.
    #[must_use]
    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_bytes: self.upload.max_bytes,
            verify_content_type: self.upload.verify_content_type,
        }
    }

    /// Request body ceiling for upload routes.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        self.upload.max_bytes.saturating_add(MULTIPART_OVERHEAD)
    }

    /// Deadline for a single analysis call, if any.
    #[must_use]
    pub fn analysis_timeout(&self) -> Option<Duration> {
        (self.analysis.timeout_secs > 0).then(|| Duration::from_secs(self.analysis.timeout_secs))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.resilience.request_timeout_secs)
    }

    #[must_use]
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }

    #[must_use]
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session.sweep_interval_secs)
    }
}

/// Build Gemini settings from the process environment and `analysis`.
///
/// Reads `GEMINI_API_KEY`, falling back to `API_KEY`. Blank values count as
/// missing.
pub fn load_gemini_settings(analysis: &AnalysisConfig) -> Result<GeminiSettings, ConfigError> {
    let api_key = resolve_api_key(|name| env::var(name).ok())?;
    Ok(GeminiSettings::new(
        api_key,
        analysis.base_url.clone(),
        analysis.model.clone(),
    ))
}

fn resolve_api_key(lookup: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    CREDENTIAL_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .ok_or(ConfigError::CredentialMissing)
}
