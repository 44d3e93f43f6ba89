//! 파이프라인 trait -- 호스트가 관리하는 생명주기 정의

use std::fmt;
use std::future::Future;

use serde::Serialize;

use crate::error::DockmetaError;

/// 컴포넌트 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작은 하지만 일부 기능 저하
    Degraded(String),
    /// 비정상
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 비정상 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 호스트가 정확히 한 번씩 `start` → `stop` 순서로 호출하는 생명주기 trait
///
/// `start`와 `stop` 사이에서만 레코드 처리가 허용됩니다.
pub trait Pipeline: Send + Sync {
    /// 파이프라인을 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), DockmetaError>> + Send;

    /// 파이프라인을 정지합니다.
    ///
    /// 반환 이후에는 어떤 백그라운드 작업도 실행되지 않습니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), DockmetaError>> + Send;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}
