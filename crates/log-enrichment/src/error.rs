//! 로그 보강 에러 타입
//!
//! [`LogEnrichmentError`]는 보강 설정 검증, 메타데이터 평탄화,
//! 프로세서 구성 중 발생하는 에러를 표현합니다.
//! `From<LogEnrichmentError> for DockmetaError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use dockmeta_container_metadata::ContainerMetadataError;
use dockmeta_core::error::{ConfigError, DockmetaError, EnrichmentError};

/// 로그 보강 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogEnrichmentError {
    /// 속성 허용 패턴 컴파일 실패
    #[error("invalid attribute pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// 문제가 된 패턴
        pattern: String,
        /// 컴파일 실패 사유
        reason: String,
    },

    /// 메타데이터 문서가 기대한 형태가 아님
    #[error("flatten error: {0}")]
    Flatten(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 메타데이터 동기화 구성 에러
    #[error(transparent)]
    Metadata(#[from] ContainerMetadataError),
}

impl From<LogEnrichmentError> for DockmetaError {
    fn from(err: LogEnrichmentError) -> Self {
        match err {
            LogEnrichmentError::InvalidPattern { pattern, reason } => {
                DockmetaError::Enrichment(EnrichmentError::InvalidPattern { pattern, reason })
            }
            LogEnrichmentError::Flatten(reason) => {
                DockmetaError::Enrichment(EnrichmentError::Flatten(reason))
            }
            LogEnrichmentError::Config { field, reason } => {
                DockmetaError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogEnrichmentError::Metadata(e) => e.into(),
        }
    }
}
