//! Container lifecycle events.
//!
//! [`ContainerEvent`] is the runtime-agnostic view of a Docker container event.
//! Only [`ContainerEventKind::Created`] triggers an out-of-band metadata
//! resync; every other kind is observed and ignored by the scheduler.
//!
//! # Examples
//!
//! ```
//! use dockmeta_container_metadata::{ContainerEvent, ContainerEventKind};
//!
//! let event = ContainerEvent::from_action("abc123def456", "create");
//! assert_eq!(event.kind, ContainerEventKind::Created);
//! assert!(event.triggers_resync());
//! ```

use std::fmt;

/// Container lifecycle event kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEventKind {
    /// 컨테이너 생성됨
    Created,
    /// 컨테이너 시작됨
    Started,
    /// 컨테이너 정지됨
    Stopped,
    /// 컨테이너 삭제됨
    Destroyed,
    /// 그 밖의 액션 (attach, exec_start 등)
    Other(String),
}

impl ContainerEventKind {
    /// Docker 이벤트 액션 문자열을 종류로 변환합니다.
    pub fn from_action(action: &str) -> Self {
        match action {
            "create" => Self::Created,
            "start" => Self::Started,
            "stop" | "die" => Self::Stopped,
            "destroy" => Self::Destroyed,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ContainerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
            Self::Destroyed => write!(f, "destroyed"),
            Self::Other(action) => write!(f, "other({action})"),
        }
    }
}

/// Docker container lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEvent {
    /// 대상 컨테이너 ID
    pub container_id: String,
    /// 이벤트 종류
    pub kind: ContainerEventKind,
}

impl ContainerEvent {
    /// Creates an event from a container ID and a raw Docker action.
    pub fn from_action(container_id: impl Into<String>, action: &str) -> Self {
        Self {
            container_id: container_id.into(),
            kind: ContainerEventKind::from_action(action),
        }
    }

    /// Returns `true` when this event should trigger an immediate resync.
    pub fn triggers_resync(&self) -> bool {
        self.kind == ContainerEventKind::Created
    }
}

impl fmt::Display for ContainerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContainerEvent container={} kind={}",
            &self.container_id[..12.min(self.container_id.len())],
            self.kind,
        )
    }
}
