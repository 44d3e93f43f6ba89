//! 보강 프로세서 -- 메타데이터 동기화와 리소스 보강의 생명주기를 관리합니다.
//!
//! [`EnrichmentProcessor`]는 core의 [`Pipeline`] trait을 구현하여 호스트가
//! `start` → `process_logs`* → `stop` 순서로 다룹니다.
//! 캐시는 프로세서가 소유하고 스케줄러와 보강기에 같은 `Arc`로 주입됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! EnrichmentProcessor
//!   ├── SyncScheduler ──(reconcile)──> MetadataCache
//!   └── Enricher ───────(get)────────> MetadataCache
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use dockmeta_container_metadata::{
    ContainerEventStream, EndpointDiscovery, MetadataCache, MetadataFetcher, SyncScheduler,
    SyncTrigger,
};
use dockmeta_core::error::{DockmetaError, PipelineError};
use dockmeta_core::pipeline::{HealthStatus, Pipeline};
use dockmeta_core::types::ResourceLogs;

use crate::config::EnrichmentProcessorConfig;
use crate::enricher::Enricher;
use crate::error::LogEnrichmentError;

/// 프로세서 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessorState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 컨테이너 메타데이터 보강 프로세서
///
/// # 사용 예시
/// ```ignore
/// let mut processor = EnrichmentProcessorBuilder::new()
///     .config(EnrichmentProcessorConfig::from_core(&config))
///     .discovery(Arc::new(DockerEndpointDiscovery::new(docker.clone())))
///     .fetcher(Arc::new(HttpMetadataFetcher::from_config(&metadata_config)?))
///     .events(docker.events())
///     .build()?;
///
/// processor.start().await?;
/// let enriched = processor.process_logs(batch)?;
/// processor.stop().await?;
/// ```
pub struct EnrichmentProcessor<D: EndpointDiscovery, F: MetadataFetcher> {
    state: ProcessorState,
    scheduler: SyncScheduler<D, F>,
    enricher: Enricher,
    cache: Arc<MetadataCache>,
}

impl<D: EndpointDiscovery, F: MetadataFetcher> EnrichmentProcessor<D, F> {
    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            ProcessorState::Initialized => "initialized",
            ProcessorState::Running => "running",
            ProcessorState::Stopped => "stopped",
        }
    }

    /// 병렬 워커용 보강기 핸들을 반환합니다.
    ///
    /// 반환된 핸들은 상태 검사를 하지 않습니다.
    pub fn enricher(&self) -> Enricher {
        self.enricher.clone()
    }

    /// 공유 메타데이터 캐시를 반환합니다.
    pub fn cache(&self) -> Arc<MetadataCache> {
        Arc::clone(&self.cache)
    }

    /// 즉시 동기화 핸들을 반환합니다.
    pub fn trigger(&self) -> SyncTrigger {
        self.scheduler.trigger()
    }

    /// 로그 배치를 보강해 돌려줍니다.
    ///
    /// # Errors
    ///
    /// `start` 전이나 `stop` 후에 호출하면 `PipelineError::NotRunning`을 반환합니다.
    pub fn process_logs(
        &self,
        mut batch: Vec<ResourceLogs>,
    ) -> Result<Vec<ResourceLogs>, DockmetaError> {
        if self.state != ProcessorState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        let summary = self.enricher.process(&mut batch);
        debug!(
            resources = summary.resources,
            enriched = summary.enriched,
            misses = summary.cache_misses,
            agents = summary.agents,
            "log batch processed"
        );
        Ok(batch)
    }
}

impl<D: EndpointDiscovery, F: MetadataFetcher> Pipeline for EnrichmentProcessor<D, F> {
    async fn start(&mut self) -> Result<(), DockmetaError> {
        match self.state {
            ProcessorState::Running => return Err(PipelineError::AlreadyRunning.into()),
            ProcessorState::Stopped => {
                return Err(PipelineError::InitFailed(
                    "processor was stopped; build a new one to restart".to_owned(),
                )
                .into());
            }
            ProcessorState::Initialized => {}
        }

        info!("starting enrichment processor");
        self.scheduler.start().await?;

        self.state = ProcessorState::Running;
        info!(cached = self.cache.len(), "enrichment processor started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DockmetaError> {
        if self.state != ProcessorState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping enrichment processor");
        self.state = ProcessorState::Stopped;
        self.scheduler.stop().await?;
        info!("enrichment processor stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ProcessorState::Running => self.scheduler.health_check().await,
            ProcessorState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ProcessorState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 보강 프로세서 빌더
///
/// 설정을 검증하고 캐시를 만들어 스케줄러와 보강기에 주입합니다.
pub struct EnrichmentProcessorBuilder<D: EndpointDiscovery, F: MetadataFetcher> {
    config: EnrichmentProcessorConfig,
    discovery: Option<Arc<D>>,
    fetcher: Option<Arc<F>>,
    events: Option<ContainerEventStream>,
}

impl<D: EndpointDiscovery, F: MetadataFetcher> EnrichmentProcessorBuilder<D, F> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: EnrichmentProcessorConfig::default(),
            discovery: None,
            fetcher: None,
            events: None,
        }
    }

    /// 프로세서 설정을 지정합니다.
    pub fn config(mut self, config: EnrichmentProcessorConfig) -> Self {
        self.config = config;
        self
    }

    /// 엔드포인트 탐색기를 지정합니다.
    pub fn discovery(mut self, discovery: Arc<D>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// 메타데이터 수집기를 지정합니다.
    pub fn fetcher(mut self, fetcher: Arc<F>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// 컨테이너 이벤트 스트림을 연결합니다.
    ///
    /// 설정에서 `watch_events`가 꺼져 있으면 무시됩니다.
    pub fn events(mut self, events: ContainerEventStream) -> Self {
        self.events = Some(events);
        self
    }

    /// 프로세서를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 설정이 유효하지 않거나 탐색기/수집기가 지정되지 않으면 에러를 반환합니다.
    pub fn build(self) -> Result<EnrichmentProcessor<D, F>, LogEnrichmentError> {
        self.config.validate()?;

        let discovery = self.discovery.ok_or_else(|| LogEnrichmentError::Config {
            field: "discovery".to_owned(),
            reason: "endpoint discovery is required".to_owned(),
        })?;
        let fetcher = self.fetcher.ok_or_else(|| LogEnrichmentError::Config {
            field: "fetcher".to_owned(),
            reason: "metadata fetcher is required".to_owned(),
        })?;

        let cache = Arc::new(MetadataCache::new());
        let enricher = Enricher::from_config(Arc::clone(&cache), &self.config)?;

        let mut scheduler = SyncScheduler::new(
            Arc::clone(&cache),
            discovery,
            fetcher,
            self.config.metadata.refresh_interval(),
        );
        match self.events {
            Some(events) if self.config.metadata.watch_events => {
                scheduler = scheduler.with_events(events);
            }
            Some(_) => debug!("container events disabled by configuration"),
            None => {}
        }

        Ok(EnrichmentProcessor {
            state: ProcessorState::Initialized,
            scheduler,
            enricher,
            cache,
        })
    }
}

impl<D: EndpointDiscovery, F: MetadataFetcher> Default for EnrichmentProcessorBuilder<D, F> {
    fn default() -> Self {
        Self::new()
    }
}
