//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use `MockDockerClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐   ┌───────────────┐
//! │ DockerEndpointDiscovery│   │ SyncScheduler │
//! └───────────┬───────────┘   └───────┬───────┘
//!             │ list / inspect        │ events
//!             ▼                       ▼
//!           ┌──────────────────────────┐
//!           │     DockerClient (trait) │
//!           └──────────────────────────┘
//!                 │             │
//!                 ▼             ▼
//!             ┌───────┐     ┌──────┐
//!             │Bollard│     │ Mock │
//!             └───┬───┘     └──────┘
//!                 ▼
//!           Docker Daemon
//! ```
//!
//! # Container ID Validation
//!
//! `inspect_container` validates IDs before calling the daemon:
//! - Must be 1-64 characters
//! - Must contain only ASCII hex digits ([0-9a-fA-F])

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;

use crate::error::ContainerMetadataError;
use crate::event::ContainerEvent;

/// Image name of the ECS container agent.
pub const ECS_AGENT_IMAGE: &str = "amazon/amazon-ecs-agent";

/// Validates a container ID before it is sent to the daemon.
fn validate_container_id(id: &str) -> Result<(), ContainerMetadataError> {
    if id.is_empty() || id.len() > 64 {
        return Err(ContainerMetadataError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ContainerMetadataError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// Running container as reported by the container list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    /// Full container ID
    pub id: String,
    /// Primary name without the leading `/`
    pub name: String,
    /// Image reference (`amazon/amazon-ecs-agent:latest`, ...)
    pub image: String,
}

impl ContainerSummary {
    /// Whether this container runs the ECS container agent.
    ///
    /// The agent never exposes a metadata endpoint of its own.
    pub fn is_ecs_agent(&self) -> bool {
        self.image.contains(ECS_AGENT_IMAGE)
    }
}

/// Inspected container details relevant to endpoint discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetails {
    /// Full container ID
    pub id: String,
    /// Name without the leading `/`
    pub name: String,
    /// Environment as `KEY=VALUE` strings, in the order Docker reports them
    pub env: Vec<String>,
}

impl ContainerDetails {
    /// Returns the value of an environment variable, if set.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.iter().find_map(|entry| {
            entry
                .split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
        })
    }
}

/// Trait abstracting Docker API operations.
///
/// The trait is `Send + Sync + 'static`, allowing safe sharing across async contexts.
///
/// # Error Handling
///
/// - **404 errors**: Converted to `ContainerMetadataError::ContainerNotFound`
/// - **Connection errors**: Wrapped as `ContainerMetadataError::DockerConnection`
/// - **Event stream errors**: Yielded as `ContainerMetadataError::EventStream` items
pub trait DockerClient: Send + Sync + 'static {
    /// Lists running containers.
    fn list_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerSummary>, ContainerMetadataError>> + Send;

    /// Inspects a specific container.
    ///
    /// # Errors
    ///
    /// - `ContainerMetadataError::ContainerNotFound`: Container does not exist (404)
    /// - `ContainerMetadataError::DockerApi`: Invalid ID or other API errors
    fn inspect_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ContainerDetails, ContainerMetadataError>> + Send;

    /// Subscribes to container lifecycle events.
    ///
    /// The stream is filtered to container events. It ends when the daemon
    /// closes the connection.
    fn events(&self) -> BoxStream<'static, Result<ContainerEvent, ContainerMetadataError>>;

    /// Checks Docker daemon connectivity.
    ///
    /// # Errors
    ///
    /// Returns `ContainerMetadataError::DockerConnection` if the daemon is unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), ContainerMetadataError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Internally uses `Arc<bollard::Docker>` for safe sharing across async tasks.
///
/// # Examples
///
/// ```ignore
/// use dockmeta_container_metadata::BollardDockerClient;
///
/// // Connect to default Docker socket
/// let client = BollardDockerClient::connect_local()?;
///
/// // Or connect to a specific socket
/// let client = BollardDockerClient::connect_with_socket("/run/docker.sock")?;
/// # Ok::<(), dockmeta_container_metadata::ContainerMetadataError>(())
/// ```
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the default local socket.
    ///
    /// # Errors
    ///
    /// Returns `ContainerMetadataError::DockerConnection` if the connection fails.
    pub fn connect_local() -> Result<Self, ContainerMetadataError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            ContainerMetadataError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker using a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns `ContainerMetadataError::DockerConnection` if the connection fails.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, ContainerMetadataError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    ContainerMetadataError::DockerConnection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to `socket_path`, or to the platform default when it is empty.
    pub fn connect(socket_path: &str) -> Result<Self, ContainerMetadataError> {
        if socket_path.is_empty() {
            Self::connect_local()
        } else {
            Self::connect_with_socket(socket_path)
        }
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, ContainerMetadataError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| ContainerMetadataError::DockerApi(format!("list containers failed: {e}")))?;

        Ok(containers
            .into_iter()
            .map(|container| ContainerSummary {
                id: container.id.unwrap_or_default(),
                name: container
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_owned())
                    .unwrap_or_default(),
                image: container.image.unwrap_or_default(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, ContainerMetadataError> {
        validate_container_id(id)?;

        let details = self
            .docker
            .inspect_container(id, None)
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => ContainerMetadataError::ContainerNotFound(id.to_owned()),
                other => {
                    ContainerMetadataError::DockerApi(format!("inspect container failed: {other}"))
                }
            })?;

        Ok(ContainerDetails {
            id: details.id.unwrap_or_else(|| id.to_owned()),
            name: details
                .name
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default(),
            env: details.config.and_then(|c| c.env).unwrap_or_default(),
        })
    }

    fn events(&self) -> BoxStream<'static, Result<ContainerEvent, ContainerMetadataError>> {
        use bollard::system::EventsOptions;

        let mut filters = HashMap::new();
        filters.insert("type".to_owned(), vec!["container".to_owned()]);
        let options = EventsOptions::<String> {
            filters,
            ..Default::default()
        };

        self.docker
            .events(Some(options))
            .map(|item| match item {
                Ok(message) => {
                    let action = message.action.unwrap_or_default();
                    let container_id = message.actor.and_then(|a| a.id).unwrap_or_default();
                    Ok(ContainerEvent::from_action(container_id, &action))
                }
                Err(e) => Err(ContainerMetadataError::EventStream(e.to_string())),
            })
            .boxed()
    }

    async fn ping(&self) -> Result<(), ContainerMetadataError> {
        self.docker
            .ping()
            .await
            .map_err(|e| ContainerMetadataError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// 테스트용 Mock Docker 클라이언트
///
/// 설정 가능한 응답을 반환하여 Docker 없이도 테스트할 수 있습니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    /// list/inspect 호출 시 반환할 컨테이너 목록
    pub containers: Vec<ContainerDetails>,
    /// events 호출 시 순서대로 내보낼 이벤트
    pub events: Vec<ContainerEvent>,
    /// list_containers 실패를 시뮬레이션할지 여부
    pub fail_list: bool,
    /// 목록에는 보이지만 inspect 시 사라진 컨테이너 ID
    pub vanished: Vec<String>,
    /// 컨테이너 ID → 이미지 (기본값 `mock:latest`)
    pub images: HashMap<String, String>,
    /// ping 실패를 시뮬레이션할지 여부
    pub fail_ping: bool,
}

#[cfg(test)]
impl MockDockerClient {
    /// 빈 컨테이너 목록으로 mock 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 테스트용 컨테이너를 추가합니다.
    pub fn with_containers(mut self, containers: Vec<ContainerDetails>) -> Self {
        self.containers = containers;
        self
    }

    /// events 스트림이 내보낼 이벤트를 설정합니다.
    pub fn with_events(mut self, events: Vec<ContainerEvent>) -> Self {
        self.events = events;
        self
    }

    /// list_containers 호출이 실패하도록 설정합니다.
    pub fn with_failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// inspect 시 404를 돌려줄 컨테이너를 설정합니다.
    pub fn with_vanished(mut self, id: impl Into<String>) -> Self {
        self.vanished.push(id.into());
        self
    }

    /// 컨테이너의 이미지를 설정합니다.
    pub fn with_image(mut self, id: impl Into<String>, image: impl Into<String>) -> Self {
        self.images.insert(id.into(), image.into());
        self
    }

    /// ping 호출이 실패하도록 설정합니다.
    pub fn with_failing_ping(mut self) -> Self {
        self.fail_ping = true;
        self
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, ContainerMetadataError> {
        if self.fail_list {
            return Err(ContainerMetadataError::DockerApi("mock failure".to_owned()));
        }
        Ok(self
            .containers
            .iter()
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                image: self
                    .images
                    .get(&c.id)
                    .cloned()
                    .unwrap_or_else(|| "mock:latest".to_owned()),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, ContainerMetadataError> {
        if self.vanished.iter().any(|v| v == id) {
            return Err(ContainerMetadataError::ContainerNotFound(id.to_owned()));
        }
        self.containers
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| ContainerMetadataError::ContainerNotFound(id.to_owned()))
    }

    fn events(&self) -> BoxStream<'static, Result<ContainerEvent, ContainerMetadataError>> {
        futures::stream::iter(self.events.clone().into_iter().map(Ok)).boxed()
    }

    async fn ping(&self) -> Result<(), ContainerMetadataError> {
        if self.fail_ping {
            return Err(ContainerMetadataError::DockerConnection("mock ping failure".to_owned()));
        }
        Ok(())
    }
}
