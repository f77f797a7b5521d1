//! Command-line options, secret resolution, and the resolved [`Config`].
//!
//! Secrets are read once at startup. If the mounted secrets file exists it is
//! the only source consulted; otherwise the process environment is used. The
//! file format is `KEY=VALUE` per line, with blank lines and lines starting
//! with `#` ignored.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use autoapply::SchedulerConfig;
use clap::Parser;
use runtask::SecretToken;
use tfc::{TfcConfig, DEFAULT_APPLY_COMMENT, DEFAULT_BASE_URL};
use thiserror::Error;

use crate::telemetry::LogFormat;

/// Name of the shared secret used to sign run task deliveries.
pub const HMAC_SECRET: &str = "HMAC_SECRET";

/// Name of the platform API token used to read and apply runs.
pub const TFC_API_TOKEN: &str = "TFC_API_TOKEN";

pub const DEFAULT_SECRETS_FILE: &str = "/etc/secrets/.env";

#[derive(Debug, Parser)]
#[command(
    name = "tfc-autoapply",
    version,
    about = "Run task that auto-applies run-triggered runs in auto-apply workspaces"
)]
pub struct Cli {
    /// Port to listen on (all interfaces). Ignored when --listen is given.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Full listen address, e.g. 127.0.0.1:8080.
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen: Option<SocketAddr>,

    /// Platform address (HCP Terraform or a Terraform Enterprise hostname).
    #[arg(long, env = "TFC_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub tfc_base_url: String,

    /// Mounted secrets file. Used instead of the environment when it exists.
    #[arg(long, env = "SECRETS_FILE", default_value = DEFAULT_SECRETS_FILE)]
    pub secrets_file: PathBuf,

    /// Delay before re-polling a run that is the only one waiting.
    #[arg(long, default_value_t = 5)]
    pub retry_delay_secs: u64,

    /// Maximum number of events processed concurrently.
    #[arg(long, default_value_t = listener::pool::DEFAULT_MAX_CONCURRENT_EVENTS)]
    pub max_concurrent_events: usize,

    /// Timeout for each request to the platform API.
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Comment recorded on every apply.
    #[arg(long, default_value = DEFAULT_APPLY_COMMENT)]
    pub apply_comment: String,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read secrets file {path}: {source}")]
    ReadSecrets {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret {name} is not set in the {origin}")]
    MissingSecret { name: &'static str, origin: String },
}

// ---------------------------------------------------------------------------
// Secret sources
// ---------------------------------------------------------------------------

/// Where secrets are read from.
#[derive(Debug)]
pub enum SecretSource {
    File {
        path: PathBuf,
        values: HashMap<String, String>,
    },
    Environment,
}

impl SecretSource {
    /// Uses `path` if it exists, otherwise the process environment.
    pub fn detect(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(SecretSource::Environment);
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadSecrets {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(SecretSource::File {
            path: path.to_path_buf(),
            values: parse_env_file(&contents),
        })
    }

    pub fn describe(&self) -> String {
        match self {
            SecretSource::File { path, .. } => format!("secrets file {}", path.display()),
            SecretSource::Environment => "process environment".to_string(),
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        match self {
            SecretSource::File { values, .. } => values.get(name).cloned(),
            SecretSource::Environment => std::env::var(name).ok(),
        }
    }

    /// Returns the secret, failing if it is absent or empty.
    pub fn require(&self, name: &'static str) -> Result<SecretToken, ConfigError> {
        self.get(name)
            .filter(|value| !value.is_empty())
            .map(SecretToken::new)
            .ok_or_else(|| ConfigError::MissingSecret {
                name,
                origin: self.describe(),
            })
    }
}

fn parse_env_file(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Everything the process needs, resolved once at startup.
#[derive(Debug)]
pub struct Config {
    pub listen: SocketAddr,
    pub tfc: TfcConfig,
    pub hmac_secret: SecretToken,
    pub scheduler: SchedulerConfig,
    pub max_concurrent_events: usize,
    pub secrets_origin: String,
}

impl Config {
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let secrets = SecretSource::detect(&cli.secrets_file)?;
        Self::from_parts(cli, &secrets)
    }

    fn from_parts(cli: &Cli, secrets: &SecretSource) -> Result<Self, ConfigError> {
        let hmac_secret = secrets.require(HMAC_SECRET)?;
        let api_token = secrets.require(TFC_API_TOKEN)?;

        Ok(Config {
            listen: cli
                .listen
                .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, cli.port))),
            tfc: TfcConfig {
                base_url: cli.tfc_base_url.clone(),
                api_token,
                apply_comment: cli.apply_comment.clone(),
                request_timeout: Duration::from_secs(cli.request_timeout_secs),
            },
            hmac_secret,
            scheduler: SchedulerConfig {
                retry_delay: Duration::from_secs(cli.retry_delay_secs),
            },
            max_concurrent_events: cli.max_concurrent_events,
            secrets_origin: secrets.describe(),
        })
    }
}
