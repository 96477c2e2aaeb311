//! Configuration management.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Default interval between SSE keep-alive comments.
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;

/// Default number of events buffered per stream.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Configuration structure that matches the TOML file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    sse: SseConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_host")]
    host: IpAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SseConfig {
    #[serde(default = "default_keep_alive_secs")]
    keep_alive_secs: u64,
    #[serde(default = "default_channel_capacity")]
    channel_capacity: usize,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LoggingConfig {
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    log_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    /// If not set, uses RUST_LOG environment variable or defaults to "info"
    log_level: Option<String>,
}

fn default_port() -> u16 {
    brygga_types::DEFAULT_PORT
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_keep_alive_secs() -> u64 {
    DEFAULT_KEEP_ALIVE_SECS
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

/// Values given on the command line. `None` leaves lower layers in effect.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub config_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Address to bind (all interfaces by default)
    pub host: IpAddr,
    /// Interval between SSE keep-alive comments
    pub keep_alive: Duration,
    /// Events buffered per stream before POSTs are rejected
    pub channel_capacity: usize,
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    pub log_file: Option<PathBuf>,
    /// Log level (if set, overrides RUST_LOG environment variable)
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with full priority chain: CLI args > env vars > config files > defaults.
    ///
    /// Config files are merged in this order:
    /// 1. `config.toml` in user config directory (~/.config/brygga/ on Linux)
    /// 2. `.brygga.toml` in current directory
    /// 3. the file passed with `--config`
    ///
    /// Of the environment variables, `BRYGGA_*` (for example
    /// `BRYGGA_SERVER_PORT`) wins over the conventional `PORT`.
    pub fn from_figment(cli: CliOverrides) -> anyhow::Result<Self> {
        // Find config file paths
        let local_config = std::env::current_dir()
            .ok()
            .map(|d| d.join(".brygga.toml"));
        let user_config = directories::ProjectDirs::from("", "", "brygga")
            .map(|dirs| dirs.config_dir().join("config.toml"));

        // Build figment with priority: defaults < user config < local config < explicit config < env vars < CLI args
        let mut figment = Figment::new();

        // 1. Start with defaults
        figment = figment.merge(Serialized::defaults(ConfigFile {
            server: ServerConfig::default(),
            sse: SseConfig::default(),
            logging: LoggingConfig::default(),
        }));

        // 2. Merge user config file if it exists
        if let Some(ref path) = user_config {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        // 3. Merge local config file if it exists
        if let Some(ref path) = local_config {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        // 4. Explicit config file must exist
        if let Some(ref path) = cli.config_file {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        // 5. Conventional PORT variable
        if let Some(port) = env_port("PORT") {
            figment = figment.merge(Serialized::default("server.port", port));
        }

        // 6. Merge environment variables (BRYGGA_<SECTION>_<KEY>)
        figment = figment.merge(
            Env::prefixed("BRYGGA_").map(|key| key.as_str().replacen('_', ".", 1).into()),
        );

        // 7. Merge CLI arguments (highest priority)
        if let Some(p) = cli.port {
            figment = figment.merge(Serialized::default("server.port", p));
        }
        if let Some(ref lf) = cli.log_file {
            figment = figment.merge(Serialized::default("logging.log_file", lf));
        }
        if let Some(ref level) = cli.log_level {
            figment = figment.merge(Serialized::default("logging.log_level", level));
        }

        // Extract the configuration
        let config_file: ConfigFile = figment.extract()?;
        Ok(Self::from_file(config_file))
    }

    /// Load configuration from environment variables only.
    ///
    /// Reads `BRYGGA_SERVER_PORT`, then `PORT`, then falls back to the default port.
    pub fn from_env() -> Self {
        let port = env_port("BRYGGA_SERVER_PORT")
            .or_else(|| env_port("PORT"))
            .unwrap_or(brygga_types::DEFAULT_PORT);
        let log_file = env::var("BRYGGA_LOGGING_LOG_FILE").ok().map(PathBuf::from);
        let log_level = env::var("BRYGGA_LOGGING_LOG_LEVEL").ok();

        Self {
            port,
            log_file,
            log_level,
            ..Self::default()
        }
    }

    fn from_file(file: ConfigFile) -> Self {
        Self {
            port: file.server.port,
            host: file.server.host,
            keep_alive: Duration::from_secs(file.sse.keep_alive_secs.max(1)),
            channel_capacity: file.sse.channel_capacity.max(1),
            log_file: file.logging.log_file,
            log_level: file.logging.log_level,
        }
    }
}

fn env_port(name: &str) -> Option<u16> {
    env::var(name).ok().and_then(|p| p.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: brygga_types::DEFAULT_PORT,
            host: default_host(),
            keep_alive: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_file: None,
            log_level: None,
        }
    }
}
