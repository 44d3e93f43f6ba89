//! 속성 허용 목록 필터
//!
//! 평탄화된 메타데이터 키 중 리소스에 기록할 키를 정규식 목록으로 고릅니다.
//! 패턴은 앵커 없이 검색(search)으로 매칭되므로 앵커가 필요하면 `^`를 직접 씁니다.

use regex::Regex;

use crate::error::LogEnrichmentError;

/// 미리 컴파일된 속성 허용 필터
///
/// 패턴이 하나도 없으면 모든 키를 허용합니다.
#[derive(Debug, Clone, Default)]
pub struct AttributeFilter {
    patterns: Vec<Regex>,
}

impl AttributeFilter {
    /// 패턴 목록을 컴파일합니다.
    ///
    /// # Errors
    ///
    /// 하나라도 컴파일되지 않으면 [`LogEnrichmentError::InvalidPattern`]을 반환합니다.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, LogEnrichmentError> {
        let patterns = patterns
            .iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// 모든 키를 허용하는 필터를 생성합니다.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// 키가 허용되는지 확인합니다.
    pub fn allow(&self, key: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|re| re.is_match(key))
    }

    /// 컴파일된 패턴 수를 반환합니다.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

fn compile(pattern: &str) -> Result<Regex, LogEnrichmentError> {
    Regex::new(pattern).map_err(|e| LogEnrichmentError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: e.to_string(),
    })
}

/// 패턴을 호출마다 컴파일하는 단발성 판정 함수
///
/// 컴파일에 실패한 패턴을 건너뛰지 않고 에러로 돌려줍니다.
/// 반복 호출 경로에서는 [`AttributeFilter`]를 사용하세요.
pub fn allow<S: AsRef<str>>(key: &str, patterns: &[S]) -> Result<bool, LogEnrichmentError> {
    if patterns.is_empty() {
        return Ok(true);
    }
    for pattern in patterns {
        if compile(pattern.as_ref())?.is_match(key) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockmeta_core::config::DEFAULT_ATTRIBUTE_PATTERN;

    #[test]
    fn empty_patterns_allow_everything() {
        let filter = AttributeFilter::new::<&str>(&[]).unwrap();
        assert!(filter.allow("anything"));
        assert!(filter.allow(""));
        assert!(allow::<&str>("anything", &[]).unwrap());
    }

    #[test]
    fn any_matching_pattern_allows() {
        let filter = AttributeFilter::new(&["^image", "^docker"]).unwrap();
        assert!(filter.allow("image.id"));
        assert!(filter.allow("docker.name"));
        assert!(!filter.allow("limits.cpu"));
    }

    #[test]
    fn patterns_are_unanchored() {
        let filter = AttributeFilter::new(&["port"]).unwrap();
        assert!(filter.allow("ports.0.host.port"));
        assert!(filter.allow("export"));
    }

    #[test]
    fn default_pattern_selects_ecs_identity_keys() {
        let filter = AttributeFilter::new(&[DEFAULT_ATTRIBUTE_PATTERN]).unwrap();
        for key in [
            "aws.ecs.cluster",
            "image",
            "image.id",
            "docker.id",
            "labels.com.amazonaws.ecs.task-arn",
        ] {
            assert!(filter.allow(key), "{key} should be allowed");
        }
        for key in ["limits.cpu", "ports.0.protocol", "name", "known.status"] {
            assert!(!filter.allow(key), "{key} should be rejected");
        }
    }

    #[test]
    fn invalid_pattern_is_rejected_at_construction() {
        let err = AttributeFilter::new(&["^ok", "?="]).unwrap_err();
        assert!(matches!(
            err,
            LogEnrichmentError::InvalidPattern { ref pattern, .. } if pattern == "?="
        ));
    }

    #[test]
    fn per_call_allow_reports_invalid_pattern() {
        assert!(allow("image", &["(unclosed"]).is_err());
    }

    #[test]
    fn per_call_allow_stops_at_first_match() {
        // 앞선 패턴이 매칭되면 뒤의 잘못된 패턴은 컴파일하지 않습니다.
        assert!(allow("image", &["^image", "(unclosed"]).unwrap());
        assert!(!allow("name", &["^image"]).unwrap());
    }

    #[test]
    fn pattern_count() {
        assert_eq!(AttributeFilter::allow_all().pattern_count(), 0);
        assert_eq!(AttributeFilter::new(&["a", "b"]).unwrap().pattern_count(), 2);
    }
}
