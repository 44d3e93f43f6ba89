//! 보강 프로세서 설정
//!
//! [`EnrichmentProcessorConfig`]는 core의 [`DockmetaConfig`]에서
//! 보강과 메타데이터 동기화에 필요한 부분만 추려 프로세서에 전달합니다.
//! 정규식 패턴 검증은 여기서 한 번만 수행되며, 실패하면 프로세서를 만들지 않습니다.

use dockmeta_container_metadata::ContainerMetadataConfig;
use dockmeta_core::config::{DockmetaConfig, FlattenConfig};

use crate::error::LogEnrichmentError;
use crate::filter::AttributeFilter;

/// 보강 프로세서 설정
#[derive(Debug, Clone)]
pub struct EnrichmentProcessorConfig {
    /// 컨테이너 ID 소스 속성 (앞쪽 우선)
    pub container_id_sources: Vec<String>,
    /// 속성 허용 정규식 (비어 있으면 모두 허용)
    pub attributes: Vec<String>,
    /// 평탄화 설정
    pub flatten: FlattenConfig,
    /// 메타데이터 동기화 설정
    pub metadata: ContainerMetadataConfig,
}

impl Default for EnrichmentProcessorConfig {
    fn default() -> Self {
        Self::from_core(&DockmetaConfig::default())
    }
}

impl EnrichmentProcessorConfig {
    /// core 설정에서 생성합니다.
    pub fn from_core(core: &DockmetaConfig) -> Self {
        Self {
            container_id_sources: core.enrichment.container_id_sources.clone(),
            attributes: core.enrichment.attributes.clone(),
            flatten: core.enrichment.flatten.clone(),
            metadata: ContainerMetadataConfig::from_core(&core.metadata),
        }
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> Result<(), LogEnrichmentError> {
        if self.container_id_sources.is_empty() {
            return Err(LogEnrichmentError::Config {
                field: "container_id_sources".to_owned(),
                reason: "at least one container ID source must be specified".to_owned(),
            });
        }
        if let Some(pos) = self
            .container_id_sources
            .iter()
            .position(|s| s.trim().is_empty())
        {
            return Err(LogEnrichmentError::Config {
                field: format!("container_id_sources[{pos}]"),
                reason: "source attribute name must not be empty".to_owned(),
            });
        }

        self.attribute_filter()?;
        self.metadata.validate()?;
        Ok(())
    }

    /// 속성 패턴을 컴파일한 필터를 반환합니다.
    pub fn attribute_filter(&self) -> Result<AttributeFilter, LogEnrichmentError> {
        AttributeFilter::new(&self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockmeta_core::config::{FlattenMode, DEFAULT_ATTRIBUTE_PATTERN};

    #[test]
    fn default_config_is_valid() {
        let config = EnrichmentProcessorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.container_id_sources, vec!["container.id", "log.file.name"]);
        assert_eq!(config.attributes, vec![DEFAULT_ATTRIBUTE_PATTERN]);
        assert_eq!(config.flatten.mode, FlattenMode::Generic);
    }

    #[test]
    fn from_core_copies_sections() {
        let mut core = DockmetaConfig::default();
        core.enrichment.container_id_sources = vec!["k8s.container.id".to_owned()];
        core.enrichment.flatten.mode = FlattenMode::Ecs;
        core.metadata.refresh_interval_secs = 15;

        let config = EnrichmentProcessorConfig::from_core(&core);
        assert_eq!(config.container_id_sources, vec!["k8s.container.id"]);
        assert_eq!(config.flatten.mode, FlattenMode::Ecs);
        assert_eq!(config.metadata.refresh_interval_secs, 15);
    }

    #[test]
    fn validate_rejects_empty_sources() {
        let config = EnrichmentProcessorConfig {
            container_id_sources: vec![],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least one container ID source"));
    }

    #[test]
    fn validate_rejects_blank_source() {
        let config = EnrichmentProcessorConfig {
            container_id_sources: vec!["container.id".to_owned(), "  ".to_owned()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("container_id_sources[1]"));
    }

    #[test]
    fn validate_rejects_invalid_pattern() {
        let config = EnrichmentProcessorConfig {
            attributes: vec!["?=".to_owned()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LogEnrichmentError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_metadata_section() {
        let mut config = EnrichmentProcessorConfig::default();
        config.metadata.refresh_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(LogEnrichmentError::Metadata(_))
        ));
    }

    #[test]
    fn empty_attribute_list_allows_all() {
        let config = EnrichmentProcessorConfig {
            attributes: vec![],
            ..Default::default()
        };
        assert!(config.attribute_filter().unwrap().allow("limits.cpu"));
    }
}
