//! 메타데이터 평탄화 벤치마크
//!
//! generic(점 표기/그대로), ECS 스키마 평탄화와 속성 필터의 처리량을 측정합니다.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use dockmeta_core::config::{DEFAULT_ATTRIBUTE_PATTERN, KeyNaming};
use dockmeta_log_enrichment::{AttributeFilter, flatten_ecs, flatten_generic};
use serde_json::Value;

/// ECS 컨테이너 메타데이터 v4 문서
const ECS_DOCUMENT: &str = r#"{
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

fn document() -> Value {
    serde_json::from_str(ECS_DOCUMENT).unwrap()
}

fn bench_flatten(c: &mut Criterion) {
    let doc = document();

    let mut group = c.benchmark_group("flatten");
    group.throughput(Throughput::Elements(1));

    group.bench_function("generic_dotted", |b| {
        b.iter(|| flatten_generic(black_box(&doc), KeyNaming::Dotted))
    });

    group.bench_function("generic_literal", |b| {
        b.iter(|| flatten_generic(black_box(&doc), KeyNaming::Literal))
    });

    group.bench_function("ecs", |b| b.iter(|| flatten_ecs(black_box(&doc)).unwrap()));

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let flat = flatten_generic(&document(), KeyNaming::Dotted);
    let filter = AttributeFilter::new(&[DEFAULT_ATTRIBUTE_PATTERN]).unwrap();

    let mut group = c.benchmark_group("attribute_filter");
    group.throughput(Throughput::Elements(flat.len() as u64));

    group.bench_function("default_pattern", |b| {
        b.iter(|| flat.keys().filter(|k| filter.allow(black_box(k))).count())
    });

    group.bench_function("allow_all", |b| {
        let all = AttributeFilter::allow_all();
        b.iter(|| flat.keys().filter(|k| all.allow(black_box(k))).count())
    });

    group.finish();
}

criterion_group!(benches, bench_flatten, bench_filter);
criterion_main!(benches);
