//! 컨테이너 메타데이터 동기화 설정
//!
//! [`ContainerMetadataConfig`]는 core의 [`MetadataConfig`](dockmeta_core::config::MetadataConfig)를
//! 기반으로 동기화 스케줄러와 HTTP 수집기가 사용하는 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use dockmeta_core::config::DockmetaConfig;
//! use dockmeta_container_metadata::config::ContainerMetadataConfig;
//!
//! let core_config = DockmetaConfig::default();
//! let config = ContainerMetadataConfig::from_core(&core_config.metadata);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ContainerMetadataError;

/// 설정 상한값 상수
const MAX_REFRESH_INTERVAL_SECS: u64 = 3600;
const MAX_FETCH_TIMEOUT_SECS: u64 = 60;
const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

/// 컨테이너 메타데이터 동기화 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadataConfig {
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

impl Default for ContainerMetadataConfig {
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

impl ContainerMetadataConfig {
    /// core의 `MetadataConfig`에서 설정을 생성합니다.
    pub fn from_core(core: &dockmeta_core::config::MetadataConfig) -> Self {
        Self {
            docker_socket: core.docker_socket.clone(),
            refresh_interval_secs: core.refresh_interval_secs,
            fetch_timeout_secs: core.fetch_timeout_secs,
            max_document_bytes: core.max_document_bytes,
            watch_events: core.watch_events,
        }
    }

    /// 동기화 주기를 `Duration`으로 반환합니다.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// 수집 타임아웃을 `Duration`으로 반환합니다.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ContainerMetadataError> {
        if self.refresh_interval_secs == 0 || self.refresh_interval_secs > MAX_REFRESH_INTERVAL_SECS
        {
            return Err(ContainerMetadataError::Config {
                field: "refresh_interval_secs".to_owned(),
                reason: format!("must be 1-{MAX_REFRESH_INTERVAL_SECS}"),
            });
        }

        if self.fetch_timeout_secs == 0 || self.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
            return Err(ContainerMetadataError::Config {
                field: "fetch_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_FETCH_TIMEOUT_SECS}"),
            });
        }

        if self.max_document_bytes == 0 || self.max_document_bytes > MAX_DOCUMENT_BYTES {
            return Err(ContainerMetadataError::Config {
                field: "max_document_bytes".to_owned(),
                reason: format!("must be 1-{MAX_DOCUMENT_BYTES}"),
            });
        }

        Ok(())
    }
}

/// 컨테이너 메타데이터 설정 빌더
#[derive(Default)]
pub struct ContainerMetadataConfigBuilder {
    config: ContainerMetadataConfig,
}

impl ContainerMetadataConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// Docker 소켓 경로를 설정합니다.
    pub fn docker_socket(mut self, socket: impl Into<String>) -> Self {
        self.config.docker_socket = socket.into();
        self
    }

    /// 동기화 주기(초)를 설정합니다.
    pub fn refresh_interval_secs(mut self, secs: u64) -> Self {
        self.config.refresh_interval_secs = secs;
        self
    }

    /// 수집 타임아웃(초)을 설정합니다.
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    /// 메타데이터 문서 최대 크기를 설정합니다.
    pub fn max_document_bytes(mut self, bytes: usize) -> Self {
        self.config.max_document_bytes = bytes;
        self
    }

    /// 컨테이너 생성 이벤트 감시 여부를 설정합니다.
    pub fn watch_events(mut self, watch: bool) -> Self {
        self.config.watch_events = watch;
        self
    }

    /// 설정을 검증하고 `ContainerMetadataConfig`를 생성합니다.
    pub fn build(self) -> Result<ContainerMetadataConfig, ContainerMetadataError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ContainerMetadataConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = dockmeta_core::config::MetadataConfig {
            docker_socket: "/run/docker.sock".to_owned(),
            refresh_interval_secs: 30,
            fetch_timeout_secs: 2,
            max_document_bytes: 4096,
            watch_events: false,
        };
        let config = ContainerMetadataConfig::from_core(&core);
        assert_eq!(config.docker_socket, "/run/docker.sock");
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(2));
        assert_eq!(config.max_document_bytes, 4096);
        assert!(!config.watch_events);
    }

    #[test]
    fn validate_rejects_zero_refresh_interval() {
        let config = ContainerMetadataConfig {
            refresh_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_boundary_max_refresh_interval() {
        let config = ContainerMetadataConfig {
            refresh_interval_secs: 3600,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = ContainerMetadataConfig {
            refresh_interval_secs: 3601,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_fetch_timeout() {
        let config = ContainerMetadataConfig {
            fetch_timeout_secs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fetch_timeout_secs"));
    }

    #[test]
    fn validate_rejects_zero_document_size() {
        let config = ContainerMetadataConfig {
            max_document_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_all_setters() {
        let config = ContainerMetadataConfigBuilder::new()
            .docker_socket("/custom/docker.sock")
            .refresh_interval_secs(15)
            .fetch_timeout_secs(3)
            .max_document_bytes(2048)
            .watch_events(false)
            .build()
            .unwrap();

        assert_eq!(config.docker_socket, "/custom/docker.sock");
        assert_eq!(config.refresh_interval_secs, 15);
        assert_eq!(config.fetch_timeout_secs, 3);
        assert_eq!(config.max_document_bytes, 2048);
        assert!(!config.watch_events);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = ContainerMetadataConfigBuilder::new()
            .refresh_interval_secs(0)
            .build();
        assert!(result.is_err());
    }
}
