use crate::store::UpdateMode;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

const DEFAULT_HTTP_PORT: u16 = 3333;
const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_bind_address: SocketAddr,
    pub update_mode: UpdateMode,
    pub cors_enabled: bool,
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind_address: default_bind_address(),
            update_mode: UpdateMode::default(),
            cors_enabled: true,
            graceful_shutdown_timeout_secs: DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Merges CLI arguments over the optional config file over defaults.
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            http_bind: cli_http_bind,
            update_mode: cli_update_mode,
            disable_cors,
            graceful_shutdown_timeout_secs: cli_shutdown_timeout,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            http_bind: file_http_bind,
            update_mode: file_update_mode,
            cors_enabled: file_cors_enabled,
            graceful_shutdown_timeout_secs: file_shutdown_timeout,
        } = file_config;

        let http_bind_address = cli_http_bind
            .or(file_http_bind)
            .unwrap_or_else(default_bind_address);

        let update_mode = cli_update_mode.or(file_update_mode).unwrap_or_default();

        let cors_enabled = !disable_cors && file_cors_enabled.unwrap_or(true);

        let graceful_shutdown_timeout_secs = cli_shutdown_timeout
            .or(file_shutdown_timeout)
            .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECS);

        Ok(Self {
            http_bind_address,
            update_mode,
            cors_enabled,
            graceful_shutdown_timeout_secs,
        })
    }

    /// Fails fast on settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.graceful_shutdown_timeout_secs > 0,
            "graceful shutdown timeout must be at least one second"
        );
        Ok(())
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "repositories-api",
    about = "In-memory repository tracking service",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "REPOSITORIES_API_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "REPOSITORIES_API_UPDATE_MODE",
        value_enum,
        value_name = "MODE",
        help = "How updates treat omitted fields (overwrite clears them, merge keeps them)"
    )]
    pub update_mode: Option<UpdateMode>,

    #[arg(
        long = "no-cors",
        env = "REPOSITORIES_API_DISABLE_CORS",
        help = "Do not attach permissive CORS headers"
    )]
    pub disable_cors: bool,

    #[arg(
        long,
        env = "REPOSITORIES_API_SHUTDOWN_TIMEOUT_SECS",
        value_name = "SECS",
        help = "Seconds allowed for shutdown handlers after the listener stops",
        value_parser = clap::value_parser!(u64)
    )]
    pub graceful_shutdown_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    http_bind: Option<SocketAddr>,
    update_mode: Option<UpdateMode>,
    cors_enabled: Option<bool>,
    graceful_shutdown_timeout_secs: Option<u64>,
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_HTTP_PORT))
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
