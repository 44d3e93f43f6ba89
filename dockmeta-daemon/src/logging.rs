//! Diagnostic logging for dockmeta-daemon.
//!
//! Stdout carries the enriched `ResourceLogs` stream, one JSON document per
//! input line, so every diagnostic line is written to stderr.
//!
//! Verbosity is taken from `RUST_LOG` when it is set. Otherwise it comes from
//! `general.log_level`, which `DOCKMETA_GENERAL_LOG_LEVEL` and `--log-level`
//! override in that order.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use dockmeta_core::config::GeneralConfig;

/// Build the level filter for the daemon's diagnostics.
///
/// # Errors
///
/// Returns an error if `RUST_LOG` is unset and `level` is not a valid
/// filter directive.
pub fn log_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", level, e)),
    }
}

/// Install the stderr subscriber for the daemon.
///
/// Call once at startup, after the configuration is loaded and before the
/// orchestrator is built.
///
/// `general.log_format` selects the output:
///
/// * `"json"` - one JSON object per event, for log shippers
/// * `"pretty"` - multi-line human-readable output
///
/// # Errors
///
/// Returns an error for an unknown format, an invalid level, or when a
/// global subscriber is already installed.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    if !matches!(config.log_format.as_str(), "json" | "pretty") {
        return Err(anyhow::anyhow!(
            "unknown log format '{}', expected 'json' or 'pretty'",
            config.log_format
        ));
    }

    let registry = tracing_subscriber::registry().with(log_filter(&config.log_level)?);
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let installed = if config.log_format == "json" {
        registry.with(stderr.json()).try_init()
    } else {
        registry.with(stderr.pretty()).try_init()
    };
    installed.map_err(|e| {
        anyhow::anyhow!(
            "failed to install {} log subscriber: {}",
            config.log_format,
            e
        )
    })
}
