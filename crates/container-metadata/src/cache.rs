//! 컨테이너 메타데이터 캐시
//!
//! [`MetadataCache`]는 컨테이너 ID → 메타데이터 문서 매핑을 유지합니다.
//! 로그 처리 경로의 `get`은 잠금 한 번과 `Arc` 복제만 수행하고,
//! 네트워크 I/O는 스케줄러 태스크의 `reconcile`에서만 일어납니다.
//!
//! # 동기화 규칙
//! 1. 엔드포인트 집합에 있지만 캐시에 없는 컨테이너만 첫 번째 URL에서 수집
//! 2. 수집이 실패해도 나머지 컨테이너의 수집은 계속하고, 성공한 문서는 반영
//! 3. 하나의 임계 구역에서 새 문서 삽입(기존 항목은 덮어쓰지 않음) 후
//!    집합에 없는 항목 제거. 실패한 주기에도 제거는 항상 수행
//! 4. 실패가 있었다면 첫 번째 실패를 `Fetch` 오류로 반환하고,
//!    실패한 컨테이너는 다음 주기에 다시 수집
//!
//! ECS 에이전트 컨테이너 집합은 같은 임계 구역에서 통째로 교체됩니다.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use metrics::{counter, gauge};
use serde_json::Value;
use tracing::{debug, info, warn};

use dockmeta_core::metrics as m;
use dockmeta_core::types::ContainerId;

use crate::discovery::EndpointSet;
use crate::error::ContainerMetadataError;
use crate::fetch::MetadataFetcher;

/// 한 번의 동기화 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// 새로 수집해 삽입한 문서 수
    pub fetched: usize,
    /// 제거된 항목 수
    pub evicted: usize,
    /// 동기화 후 캐시된 항목 수
    pub cached: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<ContainerId, Arc<Value>>,
    agents: HashSet<ContainerId>,
}

/// 컨테이너 메타데이터 캐시
///
/// 읽기와 쓰기가 같은 잠금을 사용하며, 잠금 구간에서는 I/O를 하지 않습니다.
/// `reconcile` 호출은 내부 async 게이트로 직렬화되어 같은 컨테이너를
/// 두 번 수집하지 않습니다.
#[derive(Debug)]
pub struct MetadataCache {
    state: Mutex<CacheState>,
    reconcile_gate: tokio::sync::Mutex<()>,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataCache {
    /// 빈 캐시를 생성합니다.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            reconcile_gate: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // 임계 구역에서 패닉이 나도 맵은 항상 일관된 상태입니다.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 캐시된 문서를 조회합니다. 수집은 하지 않습니다.
    pub fn get(&self, id: &str) -> Option<Arc<Value>> {
        self.lock().entries.get(id).cloned()
    }

    /// 가장 최근 동기화에서 ECS 에이전트로 발견된 컨테이너인지 확인합니다.
    pub fn is_agent(&self, id: &str) -> bool {
        self.lock().agents.contains(id)
    }

    /// 캐시된 항목 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// 캐시가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// 컨테이너가 캐시되어 있는지 확인합니다.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().entries.contains_key(id)
    }

    /// 캐시된 컨테이너 ID를 정렬해 반환합니다.
    pub fn container_ids(&self) -> Vec<ContainerId> {
        let mut ids: Vec<_> = self.lock().entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 캐시를 엔드포인트 집합에 맞춥니다.
    ///
    /// 누락된 문서를 수집해 삽입하고, 집합에 없는 항목을 제거합니다.
    ///
    /// # Errors
    ///
    /// 수집이 실패하면 첫 번째 실패를 `ContainerMetadataError::Fetch`로
    /// 반환합니다. 성공한 문서의 삽입과 제거는 이미 반영된 상태입니다.
    pub async fn reconcile<F: MetadataFetcher>(
        &self,
        endpoints: &EndpointSet,
        fetcher: &F,
    ) -> Result<ReconcileStats, ContainerMetadataError> {
        let _gate = self.reconcile_gate.lock().await;

        let missing: Vec<(ContainerId, String)> = {
            let state = self.lock();
            let mut missing: Vec<_> = endpoints
                .iter()
                .filter(|(id, _)| !state.entries.contains_key(*id))
                .filter_map(|(id, urls)| urls.first().map(|url| (id.clone(), url.clone())))
                .collect();
            missing.sort_by(|a, b| a.0.cmp(&b.0));
            missing
        };

        let mut fetched = Vec::with_capacity(missing.len());
        let mut failure = None;
        for (id, url) in missing {
            match fetcher.fetch(&url).await {
                Ok(document) => {
                    counter!(m::METADATA_FETCHES_TOTAL, m::LABEL_RESULT => "success").increment(1);
                    debug!(container_id = %id.short(), url = %url, "metadata fetched");
                    fetched.push((id, Arc::new(document)));
                }
                Err(e) => {
                    counter!(m::METADATA_FETCHES_TOTAL, m::LABEL_RESULT => "failure").increment(1);
                    warn!(container_id = %id.short(), url = %url, error = %e, "metadata fetch failed");
                    // 첫 번째 실패만 보고하고 나머지 수집은 계속합니다.
                    if failure.is_none() {
                        failure = Some(ContainerMetadataError::Fetch {
                            container_id: id.to_string(),
                            url,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        let stats = {
            let mut state = self.lock();
            let mut inserted = 0;
            for (id, document) in fetched {
                if let Entry::Vacant(slot) = state.entries.entry(id) {
                    slot.insert(document);
                    inserted += 1;
                }
            }

            let before = state.entries.len();
            state.entries.retain(|id, _| endpoints.contains(id.as_str()));
            state.agents.clone_from(endpoints.agents());

            ReconcileStats {
                fetched: inserted,
                evicted: before - state.entries.len(),
                cached: state.entries.len(),
            }
        };

        counter!(m::METADATA_EVICTIONS_TOTAL).increment(stats.evicted as u64);
        gauge!(m::METADATA_CACHED_CONTAINERS).set(stats.cached as f64);

        if stats.fetched > 0 || stats.evicted > 0 {
            info!(
                fetched = stats.fetched,
                evicted = stats.evicted,
                cached = stats.cached,
                "metadata cache reconciled"
            );
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }
}
