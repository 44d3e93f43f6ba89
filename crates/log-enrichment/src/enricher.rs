//! 리소스 보강기 -- 로그 처리 경로의 진입점
//!
//! [`Enricher`]는 리소스마다 다음 순서로 동작합니다.
//!
//! 1. 설정된 소스 속성에서 컨테이너 ID 도출
//! 2. ECS 에이전트 컨테이너면 `ecs.agent = "true"` 기록 (에이전트는 메타데이터 엔드포인트가 없음)
//! 3. 캐시 조회 (미스면 리소스를 그대로 둠)
//! 4. 메타데이터 문서 평탄화
//! 5. 허용된 키만 문자열 값으로 리소스 속성에 기록 (같은 키는 덮어씀)
//!
//! 캐시는 읽기만 하며 네트워크 I/O는 하지 않습니다.
//! 모든 상태가 `Arc` 뒤에 있어 복제한 보강기를 여러 워커에서 동시에 쓸 수 있습니다.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use dockmeta_container_metadata::MetadataCache;
use dockmeta_core::metrics as m;
use dockmeta_core::types::{AttributeValue, Resource, ResourceLogs};

use crate::config::EnrichmentProcessorConfig;
use crate::container_id;
use crate::error::LogEnrichmentError;
use crate::filter::AttributeFilter;
use crate::flatten::Flattener;

/// ECS 에이전트 로그에 붙는 리소스 속성 키
pub const ECS_AGENT_ATTRIBUTE: &str = "ecs.agent";

/// 한 배치의 보강 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    /// 처리한 리소스 수
    pub resources: usize,
    /// 메타데이터가 기록된 리소스 수
    pub enriched: usize,
    /// 컨테이너 ID를 찾지 못한 리소스 수
    pub unidentified: usize,
    /// 캐시에 문서가 없던 리소스 수
    pub cache_misses: usize,
    /// 평탄화에 실패한 리소스 수
    pub flatten_failures: usize,
    /// ECS 에이전트로 표시한 리소스 수
    pub agents: usize,
    /// 기록한 속성 수
    pub attributes_written: usize,
}

/// 리소스 단위 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Enriched(usize),
    Unidentified,
    CacheMiss,
    FlattenFailed,
}

/// 컨테이너 메타데이터 리소스 보강기
#[derive(Clone)]
pub struct Enricher {
    cache: Arc<MetadataCache>,
    sources: Arc<[String]>,
    filter: Arc<AttributeFilter>,
    flattener: Flattener,
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("sources", &self.sources)
            .field("patterns", &self.filter.pattern_count())
            .field("mode", &self.flattener.mode())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl Enricher {
    /// 구성 요소로 보강기를 생성합니다.
    pub fn new(
        cache: Arc<MetadataCache>,
        sources: Vec<String>,
        filter: AttributeFilter,
        flattener: Flattener,
    ) -> Self {
        Self {
            cache,
            sources: sources.into(),
            filter: Arc::new(filter),
            flattener,
        }
    }

    /// 검증된 설정으로 보강기를 생성합니다.
    ///
    /// # Errors
    ///
    /// 컨테이너 ID 소스가 없거나 속성 패턴이 컴파일되지 않으면 에러를 반환합니다.
    pub fn from_config(
        cache: Arc<MetadataCache>,
        config: &EnrichmentProcessorConfig,
    ) -> Result<Self, LogEnrichmentError> {
        config.validate()?;
        Ok(Self::new(
            cache,
            config.container_id_sources.clone(),
            config.attribute_filter()?,
            Flattener::new(&config.flatten),
        ))
    }

    /// 배치의 모든 리소스를 보강합니다.
    ///
    /// 캐시 미스나 평탄화 실패는 해당 리소스만 건너뜁니다.
    pub fn process(&self, batch: &mut [ResourceLogs]) -> EnrichSummary {
        let mut summary = EnrichSummary {
            resources: batch.len(),
            ..Default::default()
        };

        for logs in batch.iter_mut() {
            let (agent, outcome) = self.enrich(&mut logs.resource);
            if agent {
                summary.agents += 1;
            }
            match outcome {
                Outcome::Enriched(written) => {
                    summary.enriched += 1;
                    summary.attributes_written += written;
                }
                Outcome::Unidentified => summary.unidentified += 1,
                Outcome::CacheMiss => summary.cache_misses += 1,
                Outcome::FlattenFailed => summary.flatten_failures += 1,
            }
        }

        counter!(m::ENRICHMENT_RESOURCES_TOTAL).increment(summary.resources as u64);
        counter!(m::ENRICHMENT_ENRICHED_TOTAL).increment(summary.enriched as u64);
        counter!(m::ENRICHMENT_CACHE_MISSES_TOTAL)
            .increment((summary.cache_misses + summary.unidentified) as u64);
        counter!(m::ENRICHMENT_ATTRIBUTES_WRITTEN_TOTAL)
            .increment(summary.attributes_written as u64);
        counter!(m::ENRICHMENT_AGENT_TAGGED_TOTAL).increment(summary.agents as u64);

        summary
    }

    /// 리소스 하나를 보강하고 기록한 속성 수를 반환합니다.
    ///
    /// 메타데이터를 기록하지 않았으면 `None`을 반환합니다.
    /// ECS 에이전트 표시는 반환값과 무관하게 기록됩니다.
    pub fn enrich_resource(&self, resource: &mut Resource) -> Option<usize> {
        match self.enrich(resource).1 {
            Outcome::Enriched(written) => Some(written),
            _ => None,
        }
    }

    /// 리소스를 보강하고 (에이전트 표시 여부, 처리 결과)를 반환합니다.
    fn enrich(&self, resource: &mut Resource) -> (bool, Outcome) {
        let Some(id) = container_id::derive(resource, &self.sources[..]) else {
            debug!(sources = ?self.sources, "no container id on resource, skipping enrichment");
            return (false, Outcome::Unidentified);
        };

        let agent = self.cache.is_agent(id.as_str());
        if agent {
            resource.set(ECS_AGENT_ATTRIBUTE, "true");
        }

        let Some(document) = self.cache.get(id.as_str()) else {
            debug!(container_id = %id, agent, "metadata not found for container, skipping enrichment");
            return (agent, Outcome::CacheMiss);
        };

        let flattened = match self.flattener.flatten(&document) {
            Ok(flat) => flat,
            Err(e) => {
                warn!(container_id = %id.short(), error = %e, "failed to flatten container metadata");
                return (agent, Outcome::FlattenFailed);
            }
        };

        let mut written = 0;
        for (key, value) in flattened {
            if !self.filter.allow(&key) {
                continue;
            }
            let rendered = match value {
                AttributeValue::String(s) => s,
                other => other.to_string(),
            };
            resource.set(key, AttributeValue::String(rendered));
            written += 1;
        }

        debug!(container_id = %id.short(), attributes = written, "resource enriched");
        (agent, Outcome::Enriched(written))
    }
}
