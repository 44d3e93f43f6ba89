//! Daemon orchestration -- assembly, lifecycle management, and the main loop.
//!
//! The [`Orchestrator`] is the central coordinator of `dockmeta-daemon`.
//! It validates configuration, connects to Docker, builds the enrichment
//! processor, and runs the stdin/stdout log stream until input ends or a
//! shutdown signal arrives.
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: stop reading input and shut down
//! - `SIGHUP`: request an immediate metadata resync

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};

use dockmeta_container_metadata::{
    BollardDockerClient, DockerClient, DockerEndpointDiscovery, EndpointDiscovery,
    HttpMetadataFetcher, MetadataFetcher,
};
use dockmeta_core::config::DockmetaConfig;
use dockmeta_core::metrics as m;
use dockmeta_core::pipeline::{HealthStatus, Pipeline};
use dockmeta_log_enrichment::{
    EnrichmentProcessor, EnrichmentProcessorBuilder, EnrichmentProcessorConfig,
};

use crate::health::{
    DaemonHealth, ENRICHMENT_MODULE, ModuleHealth, STREAM_MODULE, aggregate_status,
};
use crate::metrics_server;
use crate::stream::{self, StreamStats};

/// Interval between periodic health reports and uptime updates.
const HEALTH_INTERVAL: Duration = Duration::from_secs(30);

// log stream lifecycle
const STREAM_IDLE: u8 = 0;
const STREAM_OPEN: u8 = 1;
const STREAM_CLOSED: u8 = 2;

/// Discovery used by the production daemon.
pub type DockerDiscovery = DockerEndpointDiscovery<BollardDockerClient>;

/// Why the main loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The input stream reached EOF.
    EndOfInput(StreamStats),
    /// A termination signal was received.
    Signal(&'static str),
}

/// The main daemon orchestrator.
///
/// Owns the loaded configuration and the enrichment processor, and drives
/// the processor through exactly one `start` / `stop` cycle.
pub struct Orchestrator<D: EndpointDiscovery = DockerDiscovery, F: MetadataFetcher = HttpMetadataFetcher>
{
    /// Loaded and validated configuration.
    config: DockmetaConfig,
    /// Enrichment processor (scheduler, cache, enricher).
    processor: EnrichmentProcessor<D, F>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
    /// Input stream lifecycle (`STREAM_*`).
    stream_state: AtomicU8,
}

impl Orchestrator<DockerDiscovery, HttpMetadataFetcher> {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or validated,
    /// or if the processor cannot be built.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = DockmetaConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// This performs the following steps:
    /// 1. Validate the configuration
    /// 2. Connect to the Docker daemon and ping it
    /// 3. Install the Prometheus recorder if metrics are enabled
    /// 4. Build the enrichment processor
    ///
    /// # Errors
    ///
    /// Fails before any listener is bound if the Docker daemon is unreachable.
    pub async fn build_from_config(config: DockmetaConfig) -> Result<Self> {
        validate_config(&config)?;

        let processor_config = EnrichmentProcessorConfig::from_core(&config);
        let docker = Arc::new(
            BollardDockerClient::connect(&processor_config.metadata.docker_socket)
                .map_err(|e| anyhow::anyhow!("failed to create docker client: {}", e))?,
        );
        ensure_docker_reachable(docker.as_ref()).await?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let fetcher = HttpMetadataFetcher::from_config(&processor_config.metadata)
            .map_err(|e| anyhow::anyhow!("failed to create metadata fetcher: {}", e))?;
        let events = docker.events();

        let processor = EnrichmentProcessorBuilder::new()
            .config(processor_config)
            .discovery(Arc::new(DockerEndpointDiscovery::new(docker)))
            .fetcher(Arc::new(fetcher))
            .events(events)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build enrichment processor: {}", e))?;

        tracing::info!("orchestrator initialized");
        Ok(Self::from_parts(config, processor))
    }

    /// Run against the process's stdin and stdout.
    ///
    /// Blocks until stdin reaches EOF or a shutdown signal is received.
    pub async fn run(&mut self) -> Result<ShutdownReason> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        self.run_with_io(stdin, &mut stdout).await
    }
}

impl<D: EndpointDiscovery, F: MetadataFetcher> Orchestrator<D, F> {
    /// Assemble an orchestrator from an already-built processor.
    pub fn from_parts(config: DockmetaConfig, processor: EnrichmentProcessor<D, F>) -> Self {
        if config.metrics.enabled {
            record_daemon_metrics();
        }
        Self {
            config,
            processor,
            start_time: Instant::now(),
            stream_state: AtomicU8::new(STREAM_IDLE),
        }
    }

    /// Start the processor, stream `reader` into `writer`, then stop.
    ///
    /// The processor is stopped on every exit path once it has started.
    ///
    /// # Errors
    ///
    /// Returns an error if the processor fails to start, if signal handlers
    /// cannot be installed, or if the stream fails with an I/O error.
    pub async fn run_with_io<R, W>(&mut self, reader: R, writer: &mut W) -> Result<ShutdownReason>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("starting enrichment processor");
        self.processor
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start enrichment processor: {}", e))?;

        self.stream_state.store(STREAM_OPEN, Ordering::Release);
        let outcome = self.main_loop(reader, writer).await;
        self.stream_state.store(STREAM_CLOSED, Ordering::Release);

        tracing::info!("stopping enrichment processor");
        if let Err(e) = self.processor.stop().await {
            tracing::error!(error = %e, "failed to stop enrichment processor");
        }

        match &outcome {
            Ok(ShutdownReason::EndOfInput(stats)) => tracing::info!(
                lines = stats.lines,
                written = stats.written,
                malformed = stats.malformed,
                "input closed, daemon shut down"
            ),
            Ok(ShutdownReason::Signal(signal)) => {
                tracing::info!(signal = *signal, "daemon shut down on signal")
            }
            Err(e) => tracing::error!(error = %e, "log stream failed"),
        }
        outcome
    }

    async fn main_loop<R, W>(&self, reader: R, writer: &mut W) -> Result<ShutdownReason>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;
        let mut sighup = signal(SignalKind::hangup())
            .map_err(|e| anyhow::anyhow!("failed to install SIGHUP handler: {}", e))?;

        let trigger = self.processor.trigger();
        let mut health_tick = tokio::time::interval_at(
            tokio::time::Instant::now() + HEALTH_INTERVAL,
            HEALTH_INTERVAL,
        );
        health_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let stream = stream::run(reader, writer, &self.processor);
        tokio::pin!(stream);

        tracing::info!("entering main loop");
        loop {
            tokio::select! {
                result = &mut stream => break result.map(ShutdownReason::EndOfInput),
                _ = sigterm.recv() => break Ok(ShutdownReason::Signal("SIGTERM")),
                _ = sigint.recv() => break Ok(ShutdownReason::Signal("SIGINT")),
                _ = sighup.recv() => {
                    tracing::info!("SIGHUP received, requesting metadata resync");
                    trigger.sync_now();
                }
                _ = health_tick.tick() => {
                    let health = self.health().await;
                    if health.status.is_healthy() {
                        tracing::debug!(
                            uptime_secs = health.uptime_secs,
                            cached = health.cached_containers,
                            "daemon healthy"
                        );
                    } else {
                        tracing::warn!(
                            status = %health.status,
                            cached = health.cached_containers,
                            "daemon health degraded"
                        );
                    }
                }
            }
        }
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let stream_status = match self.stream_state.load(Ordering::Acquire) {
            STREAM_OPEN => HealthStatus::Healthy,
            STREAM_IDLE => HealthStatus::Unhealthy("not started".to_owned()),
            _ => HealthStatus::Unhealthy("input closed".to_owned()),
        };
        let modules = vec![
            ModuleHealth::enabled(ENRICHMENT_MODULE, self.processor.health_check().await),
            ModuleHealth::enabled(STREAM_MODULE, stream_status),
        ];

        let status = aggregate_status(&modules);
        let uptime_secs = self.start_time.elapsed().as_secs();

        if self.config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
        }

        DaemonHealth {
            status,
            uptime_secs,
            cached_containers: self.processor.cache().len(),
            modules,
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &DockmetaConfig {
        &self.config
    }

    /// Get a reference to the enrichment processor.
    pub fn processor(&self) -> &EnrichmentProcessor<D, F> {
        &self.processor
    }
}

/// Validate the whole configuration, including attribute patterns.
///
/// # Errors
///
/// Returns the first validation failure found.
pub fn validate_config(config: &DockmetaConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    EnrichmentProcessorConfig::from_core(config)
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    Ok(())
}

/// Ping the Docker daemon so a missing or unreadable socket fails at startup
/// instead of on the first sync cycle.
///
/// # Errors
///
/// Returns an error if the daemon does not answer the ping.
pub async fn ensure_docker_reachable<D: DockerClient>(docker: &D) -> Result<()> {
    docker
        .ping()
        .await
        .map_err(|e| anyhow::anyhow!("docker daemon unreachable: {}", e))?;
    tracing::debug!("docker daemon reachable");
    Ok(())
}

/// Record daemon-level metrics (build info).
///
/// Called once during orchestrator initialization.
fn record_daemon_metrics() {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}
