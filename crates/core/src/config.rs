//! 설정 관리 -- dockmeta.toml 파싱 및 런타임 설정
//!
//! [`DockmetaConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DOCKMETA_METADATA_REFRESH_INTERVAL_SECS=30` 형식)
//! 3. 설정 파일 (`dockmeta.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), dockmeta_core::error::DockmetaError> {
//! use dockmeta_core::config::DockmetaConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DockmetaConfig::load("dockmeta.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DockmetaConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DockmetaError};

/// 기본 속성 허용 패턴: AWS/ECS, 이미지, Docker, 라벨 네임스페이스
pub const DEFAULT_ATTRIBUTE_PATTERN: &str = r"^aws.ecs.*|^image.*|^docker.*|^labels.*";

const MAX_REFRESH_INTERVAL_SECS: u64 = 3600;
const MAX_FETCH_TIMEOUT_SECS: u64 = 60;
const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

/// dockmeta 통합 설정
///
/// `dockmeta.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 크레이트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockmetaConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 컨테이너 메타데이터 동기화 설정
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// 로그 보강 설정
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    /// 메트릭 노출 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl DockmetaConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DockmetaError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DockmetaError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DockmetaError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DockmetaError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DockmetaError> {
        toml::from_str(toml_str).map_err(|e| {
            DockmetaError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DOCKMETA_{SECTION}_{FIELD}`.
    /// 정규식 목록(`enrichment.attributes`)은 구분자와 충돌하므로 파일에서만 설정합니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DOCKMETA_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DOCKMETA_GENERAL_LOG_FORMAT");

        // Metadata
        override_string(
            &mut self.metadata.docker_socket,
            "DOCKMETA_METADATA_DOCKER_SOCKET",
        );
        override_u64(
            &mut self.metadata.refresh_interval_secs,
            "DOCKMETA_METADATA_REFRESH_INTERVAL_SECS",
        );
        override_u64(
            &mut self.metadata.fetch_timeout_secs,
            "DOCKMETA_METADATA_FETCH_TIMEOUT_SECS",
        );
        override_usize(
            &mut self.metadata.max_document_bytes,
            "DOCKMETA_METADATA_MAX_DOCUMENT_BYTES",
        );
        override_bool(
            &mut self.metadata.watch_events,
            "DOCKMETA_METADATA_WATCH_EVENTS",
        );

        // Enrichment
        override_csv(
            &mut self.enrichment.container_id_sources,
            "DOCKMETA_ENRICHMENT_CONTAINER_ID_SOURCES",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "DOCKMETA_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "DOCKMETA_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "DOCKMETA_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 정규식 컴파일은 `dockmeta-log-enrichment`가 필터를 만들 때 수행합니다.
    pub fn validate(&self) -> Result<(), DockmetaError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.metadata.validate()?;
        self.enrichment.validate()?;

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be 1-65535 when enabled"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> DockmetaError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 컨테이너 메타데이터 동기화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Docker 소켓 경로 (빈 문자열이면 플랫폼 기본값)
    pub docker_socket: String,
    /// 주기적 동기화 간격 (초)
    pub refresh_interval_secs: u64,
    /// 메타데이터 엔드포인트 요청 타임아웃 (초)
    pub fetch_timeout_secs: u64,
    /// 메타데이터 문서 최대 크기 (바이트)
    pub max_document_bytes: usize,
    /// 컨테이너 생성 이벤트 감시 여부
    pub watch_events: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            docker_socket: String::new(),
            refresh_interval_secs: 60,
            fetch_timeout_secs: 5,
            max_document_bytes: 1024 * 1024,
            watch_events: true,
        }
    }
}

impl MetadataConfig {
    /// 메타데이터 섹션을 검증합니다.
    pub fn validate(&self) -> Result<(), DockmetaError> {
        if self.refresh_interval_secs == 0 || self.refresh_interval_secs > MAX_REFRESH_INTERVAL_SECS
        {
            return Err(invalid(
                "metadata.refresh_interval_secs",
                format!("must be 1-{MAX_REFRESH_INTERVAL_SECS}"),
            ));
        }
        if self.fetch_timeout_secs == 0 || self.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
            return Err(invalid(
                "metadata.fetch_timeout_secs",
                format!("must be 1-{MAX_FETCH_TIMEOUT_SECS}"),
            ));
        }
        if self.max_document_bytes == 0 || self.max_document_bytes > MAX_DOCUMENT_BYTES {
            return Err(invalid(
                "metadata.max_document_bytes",
                format!("must be 1-{MAX_DOCUMENT_BYTES}"),
            ));
        }
        Ok(())
    }
}

/// 평탄화 전략
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlattenMode {
    /// 임의의 JSON을 필드 이름 그대로(또는 변환하여) 경로로 사용
    #[default]
    Generic,
    /// ECS 컨테이너 메타데이터 v4 고정 스키마
    Ecs,
}

/// generic 평탄화에서 JSON 필드 이름을 경로 세그먼트로 바꾸는 규칙
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyNaming {
    /// `ContainerPort` → `container.port`
    #[default]
    Dotted,
    /// 필드 이름 그대로 사용
    Literal,
}

/// 평탄화 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    /// 평탄화 전략
    pub mode: FlattenMode,
    /// 키 이름 규칙 (generic 전용)
    pub key_naming: KeyNaming,
}

/// 로그 보강 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// 컨테이너 ID를 읽을 리소스 속성 이름 (앞쪽 우선)
    pub container_id_sources: Vec<String>,
    /// 속성 허용 정규식 목록 (비어 있으면 모두 허용)
    pub attributes: Vec<String>,
    /// 평탄화 설정
    pub flatten: FlattenConfig,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            container_id_sources: vec!["container.id".to_owned(), "log.file.name".to_owned()],
            attributes: vec![DEFAULT_ATTRIBUTE_PATTERN.to_owned()],
            flatten: FlattenConfig::default(),
        }
    }
}

impl EnrichmentConfig {
    /// 보강 섹션을 검증합니다.
    pub fn validate(&self) -> Result<(), DockmetaError> {
        if self.container_id_sources.is_empty() {
            return Err(invalid(
                "enrichment.container_id_sources",
                "at least one container ID source must be specified",
            ));
        }
        if self.container_id_sources.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid(
                "enrichment.container_id_sources",
                "source attribute names must not be empty",
            ));
        }
        Ok(())
    }
}

/// 메트릭 노출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
