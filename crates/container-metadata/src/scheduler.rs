//! 메타데이터 동기화 스케줄러 -- 주기/이벤트 기반 캐시 동기화
//!
//! [`SyncScheduler`]는 core의 [`Pipeline`] trait을 구현합니다.
//! `start`는 초기 동기화를 한 번 수행한 뒤 백그라운드 태스크 하나를 띄우고,
//! `stop`은 취소 토큰을 보낸 뒤 태스크 종료를 기다립니다.
//!
//! # 내부 아키텍처
//! ```text
//! interval tick ──┐
//! create event ───┼──> discovery.endpoints() ──> cache.reconcile()
//! sync_now() ─────┘
//! CancellationToken ──> loop 종료
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use metrics::counter;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use dockmeta_core::error::{DockmetaError, PipelineError};
use dockmeta_core::metrics as m;
use dockmeta_core::pipeline::{HealthStatus, Pipeline};

use crate::cache::{MetadataCache, ReconcileStats};
use crate::discovery::EndpointDiscovery;
use crate::error::ContainerMetadataError;
use crate::event::ContainerEvent;
use crate::fetch::MetadataFetcher;

/// 컨테이너 이벤트 스트림
pub type ContainerEventStream = BoxStream<'static, Result<ContainerEvent, ContainerMetadataError>>;

/// 스케줄러 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    /// 생성됨, 아직 시작하지 않음
    Idle,
    /// 실행 중
    Running,
    /// 정지됨 (재시작 불가)
    Stopped,
}

/// 즉시 동기화를 요청하는 핸들
///
/// 스케줄러가 실행 중이 아니면 요청은 다음 시작 때까지 보관됩니다.
#[derive(Debug, Clone)]
pub struct SyncTrigger {
    notify: Arc<Notify>,
}

impl SyncTrigger {
    /// 주기를 기다리지 않고 동기화를 한 번 요청합니다.
    ///
    /// 처리되기 전의 여러 요청은 하나로 합쳐집니다.
    pub fn sync_now(&self) {
        self.notify.notify_one();
    }
}

/// 메타데이터 동기화 스케줄러
///
/// # 사용 예시
/// ```ignore
/// let mut scheduler = SyncScheduler::new(cache, discovery, fetcher, Duration::from_secs(60))
///     .with_events(docker.events());
/// scheduler.start().await?;
/// // ...
/// scheduler.stop().await?;
/// ```
pub struct SyncScheduler<D: EndpointDiscovery, F: MetadataFetcher> {
    cache: Arc<MetadataCache>,
    discovery: Arc<D>,
    fetcher: Arc<F>,
    /// 이벤트 스트림 (start에서 소비됨)
    events: Mutex<Option<ContainerEventStream>>,
    interval: Duration,
    state: SchedulerState,
    cancel: CancellationToken,
    notify: Arc<Notify>,
    /// 마지막 동기화 실패 사유 (성공 시 None)
    last_error: Arc<Mutex<Option<String>>>,
    task: Option<JoinHandle<()>>,
}

impl<D: EndpointDiscovery, F: MetadataFetcher> SyncScheduler<D, F> {
    /// 새 스케줄러를 생성합니다.
    pub fn new(
        cache: Arc<MetadataCache>,
        discovery: Arc<D>,
        fetcher: Arc<F>,
        interval: Duration,
    ) -> Self {
        Self {
            cache,
            discovery,
            fetcher,
            events: Mutex::new(None),
            interval,
            state: SchedulerState::Idle,
            cancel: CancellationToken::new(),
            notify: Arc::new(Notify::new()),
            last_error: Arc::new(Mutex::new(None)),
            task: None,
        }
    }

    /// 컨테이너 이벤트 스트림을 연결합니다.
    ///
    /// 생성(create) 이벤트가 올 때마다 즉시 동기화합니다.
    pub fn with_events(mut self, events: ContainerEventStream) -> Self {
        *self.events.get_mut().unwrap_or_else(PoisonError::into_inner) = Some(events);
        self
    }

    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Stopped => "stopped",
        }
    }

    /// 즉시 동기화 핸들을 반환합니다.
    pub fn trigger(&self) -> SyncTrigger {
        SyncTrigger {
            notify: Arc::clone(&self.notify),
        }
    }

    /// 공유 캐시 참조를 반환합니다.
    pub fn cache(&self) -> Arc<MetadataCache> {
        Arc::clone(&self.cache)
    }
}

/// 탐색 한 번과 동기화 한 번을 수행합니다.
async fn sync_once<D: EndpointDiscovery, F: MetadataFetcher>(
    cache: &MetadataCache,
    discovery: &D,
    fetcher: &F,
) -> Result<ReconcileStats, ContainerMetadataError> {
    let endpoints = discovery.endpoints().await?;
    debug!(
        count = endpoints.len(),
        "containers with detected metadata endpoints"
    );
    cache.reconcile(&endpoints, fetcher).await
}

/// 동기화 주기를 실행하고 결과를 로그와 메트릭으로 남깁니다. 에러는 전파하지 않습니다.
async fn run_cycle<D: EndpointDiscovery, F: MetadataFetcher>(
    cache: &MetadataCache,
    discovery: &D,
    fetcher: &F,
    last_error: &Mutex<Option<String>>,
    trigger: &'static str,
) {
    let outcome = sync_once(cache, discovery, fetcher).await;
    let (result, reason) = match &outcome {
        Ok(stats) => {
            debug!(trigger, cached = stats.cached, "metadata sync cycle finished");
            ("success", None)
        }
        Err(e) => {
            error!(trigger, error = %e, "failed to update container metadata");
            ("failure", Some(e.to_string()))
        }
    };
    counter!(m::METADATA_SYNC_CYCLES_TOTAL, m::LABEL_TRIGGER => trigger, m::LABEL_RESULT => result)
        .increment(1);
    *last_error.lock().unwrap_or_else(PoisonError::into_inner) = reason;
}

/// 다음 이벤트를 기다립니다. 스트림이 없으면 영원히 대기합니다.
async fn next_event(
    events: &mut Option<ContainerEventStream>,
) -> Option<Result<ContainerEvent, ContainerMetadataError>> {
    match events {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// 루프를 깨운 원인
enum Wake {
    Cancelled,
    Tick,
    Manual,
    Event(Option<Result<ContainerEvent, ContainerMetadataError>>),
}

impl<D: EndpointDiscovery, F: MetadataFetcher> Pipeline for SyncScheduler<D, F> {
    async fn start(&mut self) -> Result<(), DockmetaError> {
        match self.state {
            SchedulerState::Running => return Err(PipelineError::AlreadyRunning.into()),
            SchedulerState::Stopped => {
                return Err(PipelineError::InitFailed(
                    "scheduler was stopped; build a new one to restart".to_owned(),
                )
                .into());
            }
            SchedulerState::Idle => {}
        }

        info!(
            interval_secs = self.interval.as_secs(),
            "starting metadata sync scheduler"
        );

        // 1. 초기 동기화 (실패해도 다음 주기에 재시도)
        run_cycle(
            &self.cache,
            self.discovery.as_ref(),
            self.fetcher.as_ref(),
            &self.last_error,
            "startup",
        )
        .await;

        // 2. 동기화 루프 스폰
        let mut events = self
            .events
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if events.is_none() {
            debug!("no container event stream attached, syncing on timer only");
        }

        let cache = Arc::clone(&self.cache);
        let discovery = Arc::clone(&self.discovery);
        let fetcher = Arc::clone(&self.fetcher);
        let last_error = Arc::clone(&self.last_error);
        let notify = Arc::clone(&self.notify);
        let cancel = self.cancel.clone();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 첫 tick은 즉시 완료되므로 건너뜁니다.
            ticker.tick().await;

            loop {
                let wake = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Wake::Cancelled,
                    _ = ticker.tick() => Wake::Tick,
                    _ = notify.notified() => Wake::Manual,
                    item = next_event(&mut events) => Wake::Event(item),
                };

                let trigger = match wake {
                    Wake::Cancelled => break,
                    Wake::Tick => "interval",
                    Wake::Manual => "manual",
                    Wake::Event(Some(Ok(event))) if event.triggers_resync() => {
                        debug!(container_id = %event.container_id, "new container detected, re-syncing metadata");
                        "event"
                    }
                    Wake::Event(Some(Ok(_))) => continue,
                    Wake::Event(Some(Err(e))) => {
                        warn!(error = %e, "error received from container event stream");
                        continue;
                    }
                    Wake::Event(None) => {
                        info!("container event stream ended, continuing on timer only");
                        events = None;
                        continue;
                    }
                };

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = run_cycle(cache.as_ref(), discovery.as_ref(), fetcher.as_ref(), &last_error, trigger) => {}
                }
            }

            debug!("metadata sync loop exited");
        });

        self.task = Some(task);
        self.state = SchedulerState::Running;
        info!("metadata sync scheduler started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DockmetaError> {
        if self.state != SchedulerState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping metadata sync scheduler");
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "metadata sync task ended abnormally");
            }
        }

        self.state = SchedulerState::Stopped;
        info!("metadata sync scheduler stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            SchedulerState::Running => {
                let last_error = self
                    .last_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                match last_error {
                    None => HealthStatus::Healthy,
                    Some(reason) => HealthStatus::Degraded(format!("last sync failed: {reason}")),
                }
            }
            SchedulerState::Idle => HealthStatus::Unhealthy("not started".to_owned()),
            SchedulerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

impl<D: EndpointDiscovery, F: MetadataFetcher> Drop for SyncScheduler<D, F> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
