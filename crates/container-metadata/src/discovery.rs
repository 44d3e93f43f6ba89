//! 메타데이터 엔드포인트 탐색
//!
//! [`EndpointDiscovery`]는 현재 살아 있는 컨테이너와 각 컨테이너의
//! 메타데이터 엔드포인트 URL 목록([`EndpointSet`])을 만들어 냅니다.
//! [`DockerEndpointDiscovery`]는 실행 중인 컨테이너의 환경변수에서
//! ECS 메타데이터 URI를 읽습니다. ECS 에이전트 컨테이너는 엔드포인트가
//! 없으므로 이미지로 식별해 따로 기록합니다.

use std::collections::hash_map;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use dockmeta_core::types::ContainerId;

use crate::docker::{ContainerDetails, DockerClient};
use crate::error::ContainerMetadataError;

/// ECS 컨테이너 메타데이터 v4 엔드포인트 환경변수
pub const ECS_METADATA_URI_V4: &str = "ECS_CONTAINER_METADATA_URI_V4";

/// ECS 컨테이너 메타데이터 v3 엔드포인트 환경변수
pub const ECS_METADATA_URI: &str = "ECS_CONTAINER_METADATA_URI";

/// 컨테이너 ID → 메타데이터 엔드포인트 URL 목록 (앞쪽 우선)
///
/// 탐색 주기마다 새로 만들어지며, URL 목록이 비어 있는 컨테이너는 담지 않습니다.
/// 같은 주기에 발견된 ECS 에이전트 컨테이너 ID도 함께 담습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSet {
    endpoints: HashMap<ContainerId, Vec<String>>,
    agents: HashSet<ContainerId>,
}

impl EndpointSet {
    /// 빈 집합을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 컨테이너의 엔드포인트 목록을 추가합니다.
    ///
    /// 목록이 비어 있으면 무시하고 `false`를 반환합니다.
    pub fn insert(&mut self, id: impl Into<ContainerId>, urls: Vec<String>) -> bool {
        if urls.is_empty() {
            return false;
        }
        self.endpoints.insert(id.into(), urls);
        true
    }

    /// 컨테이너가 포함되어 있는지 확인합니다.
    pub fn contains(&self, id: &str) -> bool {
        self.endpoints.contains_key(id)
    }

    /// 컨테이너의 첫 번째(우선) 엔드포인트를 반환합니다.
    pub fn primary(&self, id: &str) -> Option<&str> {
        self.endpoints.get(id).and_then(|urls| urls.first()).map(String::as_str)
    }

    /// 엔드포인트가 있는 컨테이너 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// 엔드포인트가 있는 컨테이너가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// (컨테이너 ID, URL 목록) 쌍을 순회합니다.
    pub fn iter(&self) -> hash_map::Iter<'_, ContainerId, Vec<String>> {
        self.endpoints.iter()
    }

    /// ECS 에이전트 컨테이너를 기록합니다.
    pub fn insert_agent(&mut self, id: impl Into<ContainerId>) {
        self.agents.insert(id.into());
    }

    /// ECS 에이전트 컨테이너인지 확인합니다.
    pub fn is_agent(&self, id: &str) -> bool {
        self.agents.contains(id)
    }

    /// ECS 에이전트 컨테이너 ID 집합
    pub fn agents(&self) -> &HashSet<ContainerId> {
        &self.agents
    }
}

impl<I, U> FromIterator<(I, Vec<U>)> for EndpointSet
where
    I: Into<ContainerId>,
    U: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (I, Vec<U>)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (id, urls) in iter {
            set.insert(id, urls.into_iter().map(Into::into).collect());
        }
        set
    }
}

/// 살아 있는 컨테이너의 메타데이터 엔드포인트를 찾아 주는 협력자
pub trait EndpointDiscovery: Send + Sync + 'static {
    /// 현재 엔드포인트 집합을 반환합니다.
    fn endpoints(&self) -> impl Future<Output = Result<EndpointSet, ContainerMetadataError>> + Send;
}

impl<T: EndpointDiscovery> EndpointDiscovery for Arc<T> {
    fn endpoints(&self) -> impl Future<Output = Result<EndpointSet, ContainerMetadataError>> + Send {
        (**self).endpoints()
    }
}

/// 컨테이너 환경변수에서 엔드포인트 URL을 추출합니다.
///
/// v4 URI가 v3 URI보다 앞에 옵니다. 값이 빈 변수는 무시합니다.
pub fn endpoints_from_env(details: &ContainerDetails) -> Vec<String> {
    [ECS_METADATA_URI_V4, ECS_METADATA_URI]
        .into_iter()
        .filter_map(|key| details.env_var(key))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Docker 데몬 기반 엔드포인트 탐색
pub struct DockerEndpointDiscovery<D: DockerClient> {
    docker: Arc<D>,
}

impl<D: DockerClient> DockerEndpointDiscovery<D> {
    /// 새 탐색기를 생성합니다.
    pub fn new(docker: Arc<D>) -> Self {
        Self { docker }
    }
}

impl<D: DockerClient> EndpointDiscovery for DockerEndpointDiscovery<D> {
    async fn endpoints(&self) -> Result<EndpointSet, ContainerMetadataError> {
        let containers = self.docker.list_containers().await?;
        let mut set = EndpointSet::new();

        for container in &containers {
            if container.is_ecs_agent() {
                debug!(
                    container_id = %container.id,
                    image = %container.image,
                    "ecs agent container discovered"
                );
                set.insert_agent(container.id.as_str());
                continue;
            }

            let details = match self.docker.inspect_container(&container.id).await {
                Ok(details) => details,
                Err(ContainerMetadataError::ContainerNotFound(id)) => {
                    debug!(container_id = %id, "container disappeared before inspect, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(container_id = %container.id, error = %e, "failed to inspect container");
                    return Err(e);
                }
            };

            let urls = endpoints_from_env(&details);
            if set.insert(container.id.as_str(), urls) {
                debug!(
                    container_id = %container.id,
                    container_name = %container.name,
                    "metadata endpoint discovered"
                );
            }
        }

        debug!(
            containers = containers.len(),
            with_endpoints = set.len(),
            agents = set.agents().len(),
            "endpoint discovery finished"
        );
        Ok(set)
    }
}
