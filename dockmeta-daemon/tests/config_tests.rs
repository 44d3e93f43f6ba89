//! Configuration loading and validation tests.
//!
//! Tests config file loading through the CLI, override precedence, and
//! whole-config validation as the daemon performs it before startup.

use std::io::Write;

use clap::Parser;
use dockmeta_core::config::{DockmetaConfig, FlattenMode, KeyNaming};
use dockmeta_daemon::cli::DaemonCli;
use dockmeta_daemon::orchestrator::validate_config;
use serial_test::serial;

const FULL_CONFIG: &str = r#"
[general]
log_level = "debug"
log_format = "pretty"

[metadata]
docker_socket = "/run/docker.sock"
refresh_interval_secs = 30
fetch_timeout_secs = 2
max_document_bytes = 65536
watch_events = false

[enrichment]
container_id_sources = ["container.id"]
attributes = ["^aws.*"]

[enrichment.flatten]
mode = "ecs"
key_naming = "literal"

[metrics]
enabled = true
listen_addr = "0.0.0.0"
port = 9100
"#;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    file.write_all(contents.as_bytes())
        .expect("should write config");
    file
}

fn cli_for(path: &std::path::Path, extra: &[&str]) -> DaemonCli {
    let mut args = vec!["dockmeta-daemon", "--config", path.to_str().expect("utf-8 path")];
    args.extend_from_slice(extra);
    DaemonCli::parse_from(args)
}

#[tokio::test]
#[serial]
async fn test_load_full_config_file() {
    // Given: A complete config file
    let file = write_config(FULL_CONFIG);
    let cli = cli_for(file.path(), &[]);

    // When: Loading through the CLI
    let config = cli.load_config().await.expect("config should load");

    // Then: Every section is taken from the file
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.metadata.docker_socket, "/run/docker.sock");
    assert_eq!(config.metadata.refresh_interval_secs, 30);
    assert!(!config.metadata.watch_events);
    assert_eq!(config.enrichment.container_id_sources, vec!["container.id"]);
    assert_eq!(config.enrichment.flatten.mode, FlattenMode::Ecs);
    assert_eq!(config.enrichment.flatten.key_naming, KeyNaming::Literal);
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.port, 9100);
    validate_config(&config).expect("full config should validate");
}

#[tokio::test]
#[serial]
async fn test_partial_config_uses_defaults() {
    // Given: A config that only sets the log level
    let file = write_config("[general]\nlog_level = \"warn\"\n");
    let cli = cli_for(file.path(), &[]);

    // When: Loading
    let config = cli.load_config().await.expect("config should load");

    // Then: Other sections keep their defaults
    let defaults = DockmetaConfig::default();
    assert_eq!(config.general.log_level, "warn");
    assert_eq!(config.general.log_format, defaults.general.log_format);
    assert_eq!(
        config.enrichment.container_id_sources,
        defaults.enrichment.container_id_sources
    );
    assert_eq!(config.enrichment.attributes, defaults.enrichment.attributes);
}

#[tokio::test]
#[serial]
async fn test_cli_flags_override_env_and_file() {
    // Given: File, environment, and CLI all set the log level
    let file = write_config("[general]\nlog_level = \"warn\"\n");
    // SAFETY: serialized test; no other thread reads the environment concurrently
    unsafe {
        std::env::set_var("DOCKMETA_GENERAL_LOG_LEVEL", "error");
        std::env::set_var("DOCKMETA_METADATA_REFRESH_INTERVAL_SECS", "15");
    }
    let cli = cli_for(file.path(), &["--log-level", "trace"]);

    // When: Loading
    let config = cli.load_config().await;

    // SAFETY: serialized test; no other thread reads the environment concurrently
    unsafe {
        std::env::remove_var("DOCKMETA_GENERAL_LOG_LEVEL");
        std::env::remove_var("DOCKMETA_METADATA_REFRESH_INTERVAL_SECS");
    }

    // Then: CLI wins over env, env wins over file
    let config = config.expect("config should load");
    assert_eq!(config.general.log_level, "trace");
    assert_eq!(config.metadata.refresh_interval_secs, 15);
}

#[tokio::test]
#[serial]
async fn test_missing_explicit_config_fails() {
    // Given: A user-supplied path that does not exist
    let dir = tempfile::tempdir().expect("should create temp dir");
    let cli = cli_for(&dir.path().join("missing.toml"), &[]);

    // When: Loading
    let result = cli.load_config().await;

    // Then: The error names the file
    let err = result.expect_err("missing explicit config should fail");
    assert!(
        err.to_string().contains("missing.toml"),
        "error should mention the path, got: {err}"
    );
}

#[tokio::test]
#[serial]
async fn test_unparseable_config_fails() {
    let file = write_config("[general\nlog_level = ");
    let cli = cli_for(file.path(), &[]);

    assert!(cli.load_config().await.is_err());
}

#[test]
fn test_validate_rejects_invalid_attribute_pattern() {
    // Given: A config whose attribute regex does not compile
    let mut config = DockmetaConfig::default();
    config.enrichment.attributes = vec!["?=".to_owned()];

    // When: Validating the whole config
    let result = validate_config(&config);

    // Then: The pattern is rejected before startup
    let err = result.expect_err("invalid regex should fail validation");
    assert!(
        err.to_string().contains("?="),
        "error should mention the pattern, got: {err}"
    );
}

#[test]
fn test_validate_rejects_empty_sources() {
    let mut config = DockmetaConfig::default();
    config.enrichment.container_id_sources.clear();

    assert!(validate_config(&config).is_err());
}

#[test]
fn test_validate_rejects_unknown_log_format() {
    let mut config = DockmetaConfig::default();
    config.general.log_format = "xml".to_owned();

    assert!(validate_config(&config).is_err());
}

#[test]
fn test_example_config_is_valid() {
    let config = DockmetaConfig::parse(include_str!("../../dockmeta.toml.example"))
        .expect("example config should parse");
    validate_config(&config).expect("example config should validate");
}
