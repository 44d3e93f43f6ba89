//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `dockmeta_`
//! - 모듈명: `metadata_`, `enrichment_`, `daemon_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 동기화 트리거 레이블 키 (startup, interval, event, manual)
pub const LABEL_TRIGGER: &str = "trigger";

// ─── Container Metadata 메트릭 ─────────────────────────────────────

/// 캐시된 컨테이너 메타데이터 수 (gauge)
pub const METADATA_CACHED_CONTAINERS: &str = "dockmeta_metadata_cached_containers";

/// 메타데이터 문서 수집 횟수 (counter, label: result)
pub const METADATA_FETCHES_TOTAL: &str = "dockmeta_metadata_fetches_total";

/// 캐시에서 제거된 컨테이너 수 (counter)
pub const METADATA_EVICTIONS_TOTAL: &str = "dockmeta_metadata_evictions_total";

/// 동기화 주기 실행 횟수 (counter, labels: trigger, result)
pub const METADATA_SYNC_CYCLES_TOTAL: &str = "dockmeta_metadata_sync_cycles_total";

// ─── Log Enrichment 메트릭 ─────────────────────────────────────────

/// 처리된 리소스 수 (counter)
pub const ENRICHMENT_RESOURCES_TOTAL: &str = "dockmeta_enrichment_resources_total";

/// 메타데이터로 보강된 리소스 수 (counter)
pub const ENRICHMENT_ENRICHED_TOTAL: &str = "dockmeta_enrichment_enriched_total";

/// 캐시 미스로 보강되지 않은 리소스 수 (counter)
pub const ENRICHMENT_CACHE_MISSES_TOTAL: &str = "dockmeta_enrichment_cache_misses_total";

/// 리소스에 기록된 속성 수 (counter)
pub const ENRICHMENT_ATTRIBUTES_WRITTEN_TOTAL: &str =
    "dockmeta_enrichment_attributes_written_total";

/// 평탄화 키 충돌 수 (counter, label: result = renamed | dropped)
pub const ENRICHMENT_KEY_COLLISIONS_TOTAL: &str = "dockmeta_enrichment_key_collisions_total";

/// ECS 에이전트로 표시된 리소스 수 (counter)
pub const ENRICHMENT_AGENT_TAGGED_TOTAL: &str = "dockmeta_enrichment_agent_tagged_total";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "dockmeta_daemon_build_info";

/// 데몬 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "dockmeta_daemon_uptime_seconds";

/// 입력 스트림에서 읽은 줄 수 (counter, label: result)
pub const DAEMON_INPUT_LINES_TOTAL: &str = "dockmeta_daemon_input_lines_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_gauge!(
        METADATA_CACHED_CONTAINERS,
        "Number of containers with cached metadata documents"
    );
    describe_counter!(
        METADATA_FETCHES_TOTAL,
        "Metadata document fetches by result (success, failure)"
    );
    describe_counter!(
        METADATA_EVICTIONS_TOTAL,
        "Cached metadata entries evicted because the container disappeared"
    );
    describe_counter!(
        METADATA_SYNC_CYCLES_TOTAL,
        "Metadata synchronisation cycles by trigger and result"
    );

    describe_counter!(
        ENRICHMENT_RESOURCES_TOTAL,
        "Resources seen by the enricher"
    );
    describe_counter!(
        ENRICHMENT_ENRICHED_TOTAL,
        "Resources enriched with container metadata"
    );
    describe_counter!(
        ENRICHMENT_CACHE_MISSES_TOTAL,
        "Resources passed through because no metadata was cached"
    );
    describe_counter!(
        ENRICHMENT_ATTRIBUTES_WRITTEN_TOTAL,
        "Resource attributes written from flattened metadata"
    );
    describe_counter!(
        ENRICHMENT_KEY_COLLISIONS_TOTAL,
        "Flattened keys produced by more than one field path, by resolution (renamed, dropped)"
    );
    describe_counter!(
        ENRICHMENT_AGENT_TAGGED_TOTAL,
        "Resources tagged as ECS agent logs"
    );

    describe_gauge!(DAEMON_BUILD_INFO, "Build information (always 1)");
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Daemon uptime in seconds");
    describe_counter!(
        DAEMON_INPUT_LINES_TOTAL,
        "Input lines read by result (success, malformed)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        METADATA_CACHED_CONTAINERS,
        METADATA_FETCHES_TOTAL,
        METADATA_EVICTIONS_TOTAL,
        METADATA_SYNC_CYCLES_TOTAL,
        ENRICHMENT_RESOURCES_TOTAL,
        ENRICHMENT_ENRICHED_TOTAL,
        ENRICHMENT_CACHE_MISSES_TOTAL,
        ENRICHMENT_ATTRIBUTES_WRITTEN_TOTAL,
        ENRICHMENT_KEY_COLLISIONS_TOTAL,
        ENRICHMENT_AGENT_TAGGED_TOTAL,
        DAEMON_BUILD_INFO,
        DAEMON_UPTIME_SECONDS,
        DAEMON_INPUT_LINES_TOTAL,
    ];

    const GAUGES: &[&str] = &[
        METADATA_CACHED_CONTAINERS,
        DAEMON_BUILD_INFO,
        DAEMON_UPTIME_SECONDS,
    ];

    #[test]
    fn all_metrics_start_with_dockmeta_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("dockmeta_"),
                "Metric '{}' does not start with 'dockmeta_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        for name in ALL_METRIC_NAMES
            .iter()
            .filter(|n| !GAUGES.contains(*n))
        {
            assert!(name.ends_with("_total"), "counter '{name}' must end with _total");
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }
}
