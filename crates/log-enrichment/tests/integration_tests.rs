//! 통합 테스트 -- HTTP 메타데이터 엔드포인트부터 리소스 보강까지의 전체 흐름 검증
//!
//! mockito 서버가 ECS 메타데이터 문서를 제공하고, 프로세서가 실제
//! `HttpMetadataFetcher`로 문서를 수집해 로그 리소스를 보강합니다.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use dockmeta_container_metadata::{
    ContainerMetadataError, EndpointDiscovery, EndpointSet, HttpMetadataFetcher,
};
use dockmeta_core::config::{DEFAULT_ATTRIBUTE_PATTERN, FlattenConfig, FlattenMode, KeyNaming};
use dockmeta_core::pipeline::Pipeline;
use dockmeta_core::types::{AttributeValue, LogRecord, ResourceLogs};
use dockmeta_log_enrichment::{
    EnrichmentProcessor, EnrichmentProcessorBuilder, EnrichmentProcessorConfig,
    LogEnrichmentError,
};
use mockito::{Mock, Server, ServerGuard};

const CONTAINER_ID: &str = "0123456789";

const PAYLOAD: &str = r#"{
    "ContainerARN": "arn:aws:ecs:eu-west-1:035955823196:container/cds-305/ec7ff82b7a3a44a5bbbe9bcf11daee33/cc1c133f-bd1f-4006-8dae-4cd8a3f54f19",
    "CreatedAt": "2023-06-22T12:41:18.315883278Z",
    "DesiredStatus": "RUNNING",
    "DockerId": "196a0e6abfce1e31ee24b65e97875f089878dd7d1d7e9f15155d6094c8b908f5",
    "DockerName": "ecs-cadvisor-task-definition-7-cadvisor-bae592b5e4c1a3bb3800",
    "Image": "gcr.io/cadvisor/cadvisor:latest",
    "ImageID": "sha256:68c29634fe49724f94ed34f18224316f776392f7a5a4014969ac5798a2ec96dc",
    "KnownStatus": "RUNNING",
    "Labels": {
        "com.amazonaws.ecs.cluster": "cds-305",
        "com.amazonaws.ecs.container-name": "cadvisor",
        "com.amazonaws.ecs.task-arn": "arn:aws:ecs:eu-west-1:035955823196:task/cds-305/ec7ff82b7a3a44a5bbbe9bcf11daee33",
        "com.amazonaws.ecs.task-definition-family": "cadvisor-task-definition",
        "com.amazonaws.ecs.task-definition-version": "7"
    },
    "Limits": {"CPU": 10, "Memory": 300},
    "Name": "cadvisor",
    "Networks": [{"IPv4Addresses": ["172.17.0.2"], "NetworkMode": "bridge"}],
    "Ports": [
        {"ContainerPort": 8080, "HostIp": "0.0.0.0", "HostPort": 32911, "Protocol": "tcp"},
        {"ContainerPort": 8080, "HostIp": "::", "HostPort": 32911, "Protocol": "tcp"}
    ],
    "StartedAt": "2023-06-22T12:41:18.713571182Z",
    "Type": "NORMAL",
    "Volumes": [
        {"Destination": "/var", "Source": "/var"},
        {"Destination": "/etc", "Source": "/etc"}
    ]
}"#;

/// `PAYLOAD`를 제공하는 mock 메타데이터 엔드포인트
///
/// 이 값이 살아 있는 동안만 엔드포인트가 응답합니다.
struct MetadataEndpoint {
    _server: ServerGuard,
    _mock: Mock,
    url: String,
}

async fn metadata_server() -> MetadataEndpoint {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", format!("/v4/{CONTAINER_ID}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PAYLOAD)
        .create_async()
        .await;
    let url = format!("{}/v4/{CONTAINER_ID}", server.url());
    MetadataEndpoint {
        _server: server,
        _mock: mock,
        url,
    }
}

// Test discovery returning a mutable endpoint set
struct TestDiscovery {
    endpoints: Mutex<Vec<(String, String)>>,
}

impl TestDiscovery {
    fn new(url: &str) -> Self {
        Self {
            endpoints: Mutex::new(vec![(CONTAINER_ID.to_owned(), url.to_owned())]),
        }
    }

    fn clear(&self) {
        self.endpoints.lock().unwrap().clear();
    }
}

impl EndpointDiscovery for TestDiscovery {
    async fn endpoints(&self) -> Result<EndpointSet, ContainerMetadataError> {
        let endpoints = self.endpoints.lock().unwrap().clone();
        Ok(endpoints
            .into_iter()
            .map(|(id, url)| (id, vec![url]))
            .collect())
    }
}

type TestProcessor = EnrichmentProcessor<TestDiscovery, HttpMetadataFetcher>;

async fn start_processor(
    config: EnrichmentProcessorConfig,
) -> (TestProcessor, Arc<TestDiscovery>, MetadataEndpoint) {
    let endpoint = metadata_server().await;
    let discovery = Arc::new(TestDiscovery::new(&endpoint.url));
    let fetcher = HttpMetadataFetcher::from_config(&config.metadata).unwrap();

    let mut processor = EnrichmentProcessorBuilder::new()
        .config(config)
        .discovery(Arc::clone(&discovery))
        .fetcher(Arc::new(fetcher))
        .build()
        .unwrap();
    processor.start().await.unwrap();
    (processor, discovery, endpoint)
}

fn config(patterns: &[&str], mode: FlattenMode) -> EnrichmentProcessorConfig {
    EnrichmentProcessorConfig {
        attributes: patterns.iter().map(|p| (*p).to_owned()).collect(),
        flatten: FlattenConfig {
            mode,
            key_naming: KeyNaming::Dotted,
        },
        ..Default::default()
    }
}

fn batch(source: &str, value: &str) -> Vec<ResourceLogs> {
    let mut logs = ResourceLogs {
        records: vec![LogRecord {
            severity_text: "INFO".to_owned(),
            body: serde_json::json!("container started"),
            ..Default::default()
        }],
        ..Default::default()
    };
    logs.resource.set(source, value);
    vec![logs]
}

fn count_matching(logs: &ResourceLogs, pattern: &str) -> usize {
    let re = regex::Regex::new(pattern).unwrap();
    logs.resource
        .attributes
        .keys()
        .filter(|k| re.is_match(k))
        .count()
}

#[tokio::test]
async fn ecs_mode_aws_attributes_only() {
    let (mut processor, _, _endpoint) = start_processor(config(&["^aws.*"], FlattenMode::Ecs)).await;

    let out = processor.process_logs(batch("container.id", CONTAINER_ID)).unwrap();
    assert_eq!(count_matching(&out[0], "^aws.*"), 7);
    assert_eq!(out[0].resource.attributes.len(), 8);
    assert_eq!(
        out[0].resource.get("aws.ecs.cluster"),
        Some(&AttributeValue::String("cds-305".to_owned()))
    );

    processor.stop().await.unwrap();
}

#[tokio::test]
async fn ecs_mode_all_attributes() {
    let (mut processor, _, _endpoint) = start_processor(config(&[".*"], FlattenMode::Ecs)).await;

    let out = processor.process_logs(batch("container.id", CONTAINER_ID)).unwrap();
    // 32개 메타데이터 속성 + container.id
    assert_eq!(out[0].resource.attributes.len(), 33);
    assert_eq!(
        out[0].resource.get("ports.0.host.port"),
        Some(&AttributeValue::String("32911".to_owned()))
    );
    assert_eq!(
        out[0].resource.get("limits.memory"),
        Some(&AttributeValue::String("300".to_owned()))
    );

    processor.stop().await.unwrap();
}

#[tokio::test]
async fn ecs_mode_default_patterns() {
    let (mut processor, _, _endpoint) =
        start_processor(config(&[DEFAULT_ATTRIBUTE_PATTERN], FlattenMode::Ecs)).await;

    let out = processor.process_logs(batch("container.id", CONTAINER_ID)).unwrap();
    assert_eq!(count_matching(&out[0], "^aws.*|^image.*|^docker.*"), 11);
    assert_eq!(out[0].resource.attributes.len(), 12);

    processor.stop().await.unwrap();
}

#[tokio::test]
async fn generic_mode_default_patterns() {
    let (mut processor, _, _endpoint) =
        start_processor(config(&[DEFAULT_ATTRIBUTE_PATTERN], FlattenMode::Generic)).await;

    let out = processor.process_logs(batch("container.id", CONTAINER_ID)).unwrap();
    let attrs = &out[0].resource.attributes;
    // image, image.id, docker.id, docker.name + labels 5개
    assert_eq!(attrs.len(), 10);
    assert_eq!(
        attrs.get("labels.com.amazonaws.ecs.task-definition-version"),
        Some(&AttributeValue::String("7".to_owned()))
    );
    assert!(!attrs.contains_key("limits.cpu"));

    processor.stop().await.unwrap();
}

#[tokio::test]
async fn container_id_from_log_file_name() {
    let (mut processor, _, _endpoint) = start_processor(config(&[".*"], FlattenMode::Ecs)).await;

    let out = processor
        .process_logs(batch("log.file.name", &format!("{CONTAINER_ID}-json.log")))
        .unwrap();
    assert_eq!(count_matching(&out[0], "^aws.*"), 7);
    assert_eq!(out[0].resource.attributes.len(), 33);

    processor.stop().await.unwrap();
}

#[tokio::test]
async fn unknown_container_passes_through() {
    let (mut processor, _, _endpoint) = start_processor(config(&[".*"], FlattenMode::Ecs)).await;

    let input = batch("container.id", "fedcba9876");
    let out = processor.process_logs(input.clone()).unwrap();
    assert_eq!(out, input);

    processor.stop().await.unwrap();
}

#[tokio::test]
async fn evicted_container_is_no_longer_enriched() {
    let (mut processor, discovery, _endpoint) = start_processor(config(&[".*"], FlattenMode::Ecs)).await;
    let cache = processor.cache();
    assert!(cache.contains(CONTAINER_ID));

    discovery.clear();
    processor.trigger().sync_now();
    for _ in 0..100 {
        if !cache.contains(CONTAINER_ID) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(cache.is_empty());

    let out = processor.process_logs(batch("container.id", CONTAINER_ID)).unwrap();
    assert_eq!(out[0].resource.attributes.len(), 1);

    processor.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_workers_share_enricher() {
    let (mut processor, _, _endpoint) = start_processor(config(&["^aws.*"], FlattenMode::Ecs)).await;

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let enricher = processor.enricher();
            tokio::spawn(async move {
                let mut total = 0;
                for _ in 0..50 {
                    let mut logs = batch("container.id", CONTAINER_ID);
                    total += enricher.process(&mut logs).attributes_written;
                }
                total
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.await.unwrap(), 50 * 7);
    }
    processor.stop().await.unwrap();
}

#[test]
fn bad_regex_is_rejected_before_start() {
    let result = EnrichmentProcessorBuilder::<TestDiscovery, HttpMetadataFetcher>::new()
        .config(config(&["?="], FlattenMode::Ecs))
        .discovery(Arc::new(TestDiscovery::new("http://127.0.0.1:1/v4")))
        .fetcher(Arc::new(
            HttpMetadataFetcher::new(Duration::from_secs(1), 1024).unwrap(),
        ))
        .build();
    assert!(matches!(result, Err(LogEnrichmentError::InvalidPattern { .. })));
}
