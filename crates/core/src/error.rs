//! 에러 타입 -- 도메인별 에러 정의

/// dockmeta 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DockmetaError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 컨테이너 메타데이터 탐색/수집 에러
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// 로그 보강 에러
    #[error("enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아님 (시작 전이거나 이미 정지됨)
    #[error("pipeline is not running")]
    NotRunning,
}

/// 컨테이너 메타데이터 에러
///
/// 백그라운드 동기화 중 발생하며, 스케줄러가 로그로 남기고 다음 주기에 재시도합니다.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// 엔드포인트 탐색 실패 (런타임 소켓 연결 불가, 컨테이너 조회 실패 등)
    #[error("endpoint discovery failed: {0}")]
    Discovery(String),

    /// 메타데이터 문서 수집 실패
    #[error("metadata fetch failed for container '{container_id}': {reason}")]
    Fetch {
        container_id: String,
        reason: String,
    },
}

/// 로그 보강 에러
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    /// 속성 허용 패턴이 정규식으로 컴파일되지 않음
    #[error("invalid attribute pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// 메타데이터 평탄화 실패
    #[error("flatten failed: {0}")]
    Flatten(String),
}
