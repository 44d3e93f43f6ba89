//! 컨테이너 메타데이터 에러 타입
//!
//! [`ContainerMetadataError`]는 엔드포인트 탐색, 문서 수집, 이벤트 감시 중
//! 발생하는 모든 에러를 표현합니다.
//! `From<ContainerMetadataError> for DockmetaError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use dockmeta_core::error::{ConfigError, DockmetaError, MetadataError};

/// 컨테이너 메타데이터 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ContainerMetadataError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 컨테이너를 찾을 수 없음 (목록 조회와 inspect 사이에 사라진 경우 등)
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// 메타데이터 문서 수집 실패
    #[error("metadata fetch failed for container '{container_id}' from {url}: {reason}")]
    Fetch {
        /// 대상 컨테이너 ID
        container_id: String,
        /// 요청한 엔드포인트 URL
        url: String,
        /// 실패 사유
        reason: String,
    },

    /// 컨테이너 이벤트 스트림 에러
    #[error("container event stream error: {0}")]
    EventStream(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

/// 단일 메타데이터 문서 요청 실패 사유
///
/// 수집기는 어떤 컨테이너의 문서인지 모르므로, 캐시가
/// [`ContainerMetadataError::Fetch`]로 감싸 컨테이너 ID를 붙입니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// 연결 실패, 타임아웃 등 요청 자체의 실패
    #[error("request failed: {0}")]
    Request(String),

    /// 2xx가 아닌 응답 상태
    #[error("unexpected status {0}")]
    Status(u16),

    /// 응답 본문이 허용 크기를 넘음
    #[error("document exceeds {limit} bytes")]
    TooLarge {
        /// 허용 최대 크기
        limit: usize,
    },

    /// JSON 디코딩 실패
    #[error("malformed JSON: {0}")]
    Decode(String),

    /// 최상위 값이 JSON 객체가 아님
    #[error("top-level value is not a JSON object")]
    NotAnObject,
}

impl From<ContainerMetadataError> for DockmetaError {
    fn from(err: ContainerMetadataError) -> Self {
        match err {
            ContainerMetadataError::Fetch {
                container_id,
                url,
                reason,
            } => DockmetaError::Metadata(MetadataError::Fetch {
                container_id,
                reason: format!("{url}: {reason}"),
            }),
            ContainerMetadataError::Config { field, reason } => {
                DockmetaError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => DockmetaError::Metadata(MetadataError::Discovery(other.to_string())),
        }
    }
}
