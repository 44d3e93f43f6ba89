#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`flatten`]: 메타데이터 문서 평탄화 (generic / ECS 스키마)
//! - [`filter`]: 정규식 기반 속성 허용 목록
//! - [`container_id`]: 리소스 속성에서 컨테이너 ID 도출 및 정규화
//! - [`enricher`]: 리소스 보강기 (로그 처리 경로)
//! - [`processor`]: 동기화 스케줄러와 보강기의 생명주기 관리 (Pipeline trait 구현)
//! - [`config`]: 프로세서 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! ResourceLogs -> container_id::derive -> MetadataCache.get -> Flattener -> AttributeFilter -> Resource.set
//!                        |                        ^
//!               container.id / log.file.name      |
//!                                          SyncScheduler (background)
//! ```

pub mod config;
pub mod container_id;
pub mod enricher;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod processor;

// --- 주요 타입 re-export ---

// 프로세서
pub use processor::{EnrichmentProcessor, EnrichmentProcessorBuilder};

// 보강기
pub use enricher::{ECS_AGENT_ATTRIBUTE, EnrichSummary, Enricher};

// 설정
pub use config::EnrichmentProcessorConfig;

// 에러
pub use error::LogEnrichmentError;

// 평탄화
pub use flatten::{
    Flattener, KeyCollisions, dotted_name, flatten_ecs, flatten_generic,
    flatten_generic_with_collisions,
};

// 속성 필터
pub use filter::AttributeFilter;
