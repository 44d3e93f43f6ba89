//! CLI argument definitions for dockmeta-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dockmeta_core::config::DockmetaConfig;

/// Container metadata enrichment daemon.
///
/// Reads JSON log resources line by line from stdin, attaches the
/// metadata of the container that produced them, and writes the
/// enriched resources to stdout.
#[derive(Parser, Debug)]
#[command(name = "dockmeta-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to dockmeta.toml configuration file.
    ///
    /// A missing file at the default path falls back to built-in defaults.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the Docker socket path.
    #[arg(long)]
    pub docker_socket: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dockmeta/dockmeta.toml";

impl DaemonCli {
    /// Whether the config path is the built-in default (not user supplied).
    pub fn uses_default_config(&self) -> bool {
        self.config.as_os_str() == DEFAULT_CONFIG_PATH
    }

    /// Load the configuration file and apply overrides.
    ///
    /// Precedence, lowest first: built-in defaults, config file,
    /// `DOCKMETA_*` environment variables, command-line flags.
    /// A missing file is only tolerated at the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if it is
    /// missing at a user-supplied path.
    pub async fn load_config(&self) -> Result<DockmetaConfig> {
        let mut config = if self.uses_default_config() && !self.config.exists() {
            DockmetaConfig::default()
        } else {
            DockmetaConfig::from_file(&self.config).await.map_err(|e| {
                anyhow::anyhow!("failed to load config {}: {}", self.config.display(), e)
            })?
        };
        config.apply_env_overrides();
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Apply command-line overrides to `config`.
    pub fn apply_overrides(&self, config: &mut DockmetaConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(socket) = &self.docker_socket {
            config.metadata.docker_socket = socket.clone();
        }
    }
}
