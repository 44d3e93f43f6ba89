//! 메타데이터 문서 평탄화
//!
//! 중첩된 JSON 문서를 `.`으로 구분된 경로 → 스칼라 값 맵으로 변환합니다.
//! 깊이 우선 전위 순회이며 배열 인덱스는 10진수 경로 조각이 됩니다.
//!
//! 두 가지 전략을 지원합니다.
//! - [`FlattenMode::Generic`]: 스키마 없이 임의의 JSON을 순회합니다.
//!   필드명은 [`KeyNaming`]에 따라 그대로 쓰거나 점 표기로 변환합니다.
//! - [`FlattenMode::Ecs`]: ECS 컨테이너 메타데이터 v4 형태를 정적으로 방문하며
//!   고정된 출력 키(`aws.ecs.cluster` 등)를 사용합니다.
//!
//! `null`, 빈 배열, 빈 객체는 아무 키도 만들지 않습니다.
//! 점 표기로 키가 겹치면 나중 값은 원래 필드명 경로로 기록됩니다 ([`KeyCollisions`]).

use std::borrow::Cow;

use metrics::counter;
use serde::Deserialize;
use serde_json::{Number, Value};
use tracing::warn;

use dockmeta_core::config::{FlattenConfig, FlattenMode, KeyNaming};
use dockmeta_core::metrics as m;
use dockmeta_core::types::{AttributeValue, Attributes};

use crate::error::LogEnrichmentError;

/// 경로 구분자
pub const SEPARATOR: char = '.';

/// 설정된 전략으로 문서를 평탄화하는 평탄화기
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flattener {
    mode: FlattenMode,
    naming: KeyNaming,
}

impl Flattener {
    /// 평탄화 설정에서 생성합니다.
    pub fn new(config: &FlattenConfig) -> Self {
        Self {
            mode: config.mode,
            naming: config.key_naming,
        }
    }

    /// 스키마 없는 평탄화기를 생성합니다.
    pub fn generic(naming: KeyNaming) -> Self {
        Self {
            mode: FlattenMode::Generic,
            naming,
        }
    }

    /// ECS 스키마 평탄화기를 생성합니다.
    pub fn ecs() -> Self {
        Self {
            mode: FlattenMode::Ecs,
            naming: KeyNaming::default(),
        }
    }

    /// 평탄화 전략
    pub fn mode(&self) -> FlattenMode {
        self.mode
    }

    /// 문서를 평탄화합니다.
    ///
    /// # Errors
    ///
    /// ECS 모드에서 문서가 ECS 메타데이터 형태와 맞지 않으면
    /// [`LogEnrichmentError::Flatten`]을 반환합니다. Generic 모드는 실패하지 않습니다.
    pub fn flatten(&self, document: &Value) -> Result<Attributes, LogEnrichmentError> {
        match self.mode {
            FlattenMode::Generic => Ok(flatten_generic(document, self.naming)),
            FlattenMode::Ecs => flatten_ecs(document),
        }
    }
}

// ─── Generic ───────────────────────────────────────────────────────

/// 키 충돌 처리 결과
///
/// 점 표기에서는 서로 다른 입력 경로가 같은 키를 만들 수 있습니다
/// (`{"Image":{"Id":..}}`와 `{"ImageId":..}` 모두 `image.id`).
/// 먼저 기록된 값이 키를 차지하고, 나중 값은 원래 필드명 경로로 기록됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyCollisions {
    /// 원래 필드명 경로로 옮겨 기록한 값 수
    pub renamed: usize,
    /// 대체 경로도 이미 차 있어 버려진 값 수
    pub dropped: usize,
}

impl KeyCollisions {
    /// 충돌이 하나도 없었는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.renamed == 0 && self.dropped == 0
    }
}

/// 임의의 JSON 문서를 평탄화합니다.
pub fn flatten_generic(document: &Value, naming: KeyNaming) -> Attributes {
    flatten_generic_with_collisions(document, naming).0
}

/// 문서를 평탄화하고 키 충돌 처리 결과를 함께 반환합니다.
pub fn flatten_generic_with_collisions(
    document: &Value,
    naming: KeyNaming,
) -> (Attributes, KeyCollisions) {
    let mut walker = Walker {
        naming,
        path: String::new(),
        literal: String::new(),
        out: Attributes::new(),
        collisions: KeyCollisions::default(),
    };
    walker.walk(document);

    let collisions = walker.collisions;
    if !collisions.is_empty() {
        counter!(m::ENRICHMENT_KEY_COLLISIONS_TOTAL, m::LABEL_RESULT => "renamed")
            .increment(collisions.renamed as u64);
        counter!(m::ENRICHMENT_KEY_COLLISIONS_TOTAL, m::LABEL_RESULT => "dropped")
            .increment(collisions.dropped as u64);
    }
    (walker.out, collisions)
}

struct Walker {
    naming: KeyNaming,
    /// 출력 키 경로
    path: String,
    /// 원래 필드명 경로
    literal: String,
    out: Attributes,
    collisions: KeyCollisions,
}

impl Walker {
    fn walk(&mut self, value: &Value) {
        match value {
            Value::Null => {}
            Value::Bool(b) => self.emit(AttributeValue::Bool(*b)),
            Value::Number(n) => self.emit(number_value(n)),
            Value::String(s) => self.emit(AttributeValue::String(s.clone())),
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let segment = index.to_string();
                    self.descend(item, &segment, &segment);
                }
            }
            Value::Object(fields) => {
                for (name, field) in fields {
                    let segment = match self.naming {
                        KeyNaming::Dotted => dotted_name(name),
                        KeyNaming::Literal => Cow::Borrowed(name.as_str()),
                    };
                    self.descend(field, &segment, name);
                }
            }
        }
    }

    fn descend(&mut self, value: &Value, segment: &str, literal: &str) {
        let restore = (self.path.len(), self.literal.len());
        push_segment(&mut self.path, segment);
        push_segment(&mut self.literal, literal);
        self.walk(value);
        self.path.truncate(restore.0);
        self.literal.truncate(restore.1);
    }

    fn emit(&mut self, value: AttributeValue) {
        // 최상위 스칼라는 경로가 없으므로 기록하지 않습니다.
        if self.path.is_empty() {
            return;
        }
        if !self.out.contains_key(&self.path) {
            self.out.insert(self.path.clone(), value);
            return;
        }

        if self.literal != self.path && !self.out.contains_key(&self.literal) {
            warn!(key = %self.path, fallback = %self.literal, "flattened key collision, using field path");
            self.out.insert(self.literal.clone(), value);
            self.collisions.renamed += 1;
        } else {
            warn!(key = %self.path, "flattened key collision, keeping first value");
            self.collisions.dropped += 1;
        }
    }
}

fn push_segment(path: &mut String, segment: &str) {
    if !path.is_empty() {
        path.push(SEPARATOR);
    }
    path.push_str(segment);
}

fn number_value(n: &Number) -> AttributeValue {
    if let Some(i) = n.as_i64() {
        AttributeValue::Int(i)
    } else if let Some(u) = n.as_u64() {
        AttributeValue::UInt(u)
    } else {
        AttributeValue::Double(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// CamelCase 필드명을 소문자 점 표기로 변환합니다.
///
/// `ContainerPort` → `container.port`, `ImageID` → `image.id`,
/// `IPv4Addresses` → `ipv4.addresses`. 대문자가 없는 이름은 그대로 반환합니다.
pub fn dotted_name(name: &str) -> Cow<'_, str> {
    if !name.bytes().any(|b| b.is_ascii_uppercase()) {
        return Cow::Borrowed(name);
    }

    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && starts_word(&chars, i) && !out.ends_with(SEPARATOR) {
            out.push(SEPARATOR);
        }
        out.push(c.to_ascii_lowercase());
    }
    Cow::Owned(out)
}

fn starts_word(chars: &[char], i: usize) -> bool {
    let (prev, c) = (chars[i - 1], chars[i]);
    if !c.is_ascii_uppercase() {
        return false;
    }
    if prev.is_ascii_lowercase() || prev.is_ascii_digit() {
        return true;
    }
    if prev.is_ascii_uppercase() {
        // 대문자 연속 구간 뒤에 소문자가 오면 마지막 대문자부터 새 단어입니다 (`ARNValue`).
        // 소문자 한 글자 뒤에 숫자가 오면 버전 표기로 보고 나누지 않습니다 (`IPv4`).
        let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
        let version = chars.get(i + 2).is_some_and(|n| n.is_ascii_digit());
        return next_lower && !version;
    }
    false
}

// ─── ECS ───────────────────────────────────────────────────────────

/// ECS 컨테이너 메타데이터 v4 문서
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EcsContainer {
    #[serde(rename = "ContainerARN")]
    container_arn: Option<String>,
    created_at: Option<String>,
    desired_status: Option<String>,
    docker_id: Option<String>,
    docker_name: Option<String>,
    image: Option<String>,
    #[serde(rename = "ImageID")]
    image_id: Option<String>,
    known_status: Option<String>,
    labels: Option<EcsLabels>,
    limits: Option<EcsLimits>,
    name: Option<String>,
    networks: Option<Vec<EcsNetwork>>,
    ports: Option<Vec<EcsPort>>,
    started_at: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
    volumes: Option<Vec<EcsVolume>>,
}

#[derive(Debug, Default, Deserialize)]
struct EcsLabels {
    #[serde(rename = "com.amazonaws.ecs.cluster")]
    cluster: Option<String>,
    #[serde(rename = "com.amazonaws.ecs.container-name")]
    container_name: Option<String>,
    #[serde(rename = "com.amazonaws.ecs.task-arn")]
    task_arn: Option<String>,
    #[serde(rename = "com.amazonaws.ecs.task-definition-family")]
    task_definition_family: Option<String>,
    #[serde(rename = "com.amazonaws.ecs.task-definition-version")]
    task_definition_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EcsLimits {
    #[serde(rename = "CPU")]
    cpu: Option<Number>,
    memory: Option<Number>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EcsNetwork {
    #[serde(rename = "IPv4Addresses")]
    ipv4_addresses: Option<Vec<String>>,
    network_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EcsPort {
    container_port: Option<Number>,
    host_ip: Option<String>,
    host_port: Option<Number>,
    protocol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EcsVolume {
    destination: Option<String>,
    source: Option<String>,
}

/// ECS 컨테이너 메타데이터 문서를 고정된 출력 키로 평탄화합니다.
///
/// # Errors
///
/// 필드 타입이 ECS 메타데이터 형태와 다르면 [`LogEnrichmentError::Flatten`]을 반환합니다.
pub fn flatten_ecs(document: &Value) -> Result<Attributes, LogEnrichmentError> {
    let container = EcsContainer::deserialize(document)
        .map_err(|e| LogEnrichmentError::Flatten(format!("not an ECS container document: {e}")))?;

    let mut out = Attributes::new();
    put_str(&mut out, "aws.ecs.container.arn", container.container_arn);
    put_str(&mut out, "aws.ecs.task.known.status", container.known_status);
    put_str(&mut out, "created.at", container.created_at);
    put_str(&mut out, "desired.status", container.desired_status);
    put_str(&mut out, "docker.id", container.docker_id);
    put_str(&mut out, "docker.name", container.docker_name);
    put_str(&mut out, "image", container.image);
    put_str(&mut out, "image.id", container.image_id);
    put_str(&mut out, "name", container.name);
    put_str(&mut out, "started.at", container.started_at);
    put_str(&mut out, "type", container.kind);

    if let Some(labels) = container.labels {
        put_str(&mut out, "aws.ecs.cluster", labels.cluster);
        put_str(&mut out, "aws.ecs.container.name", labels.container_name);
        put_str(&mut out, "aws.ecs.task.arn", labels.task_arn);
        put_str(&mut out, "aws.ecs.task.definition.family", labels.task_definition_family);
        put_str(&mut out, "aws.ecs.task.definition.version", labels.task_definition_version);
    }

    if let Some(limits) = container.limits {
        put_num(&mut out, "limits.cpu", limits.cpu);
        put_num(&mut out, "limits.memory", limits.memory);
    }

    for (i, network) in container.networks.unwrap_or_default().into_iter().enumerate() {
        put_str(&mut out, &format!("networks.{i}.network.mode"), network.network_mode);
        for (j, addr) in network.ipv4_addresses.unwrap_or_default().into_iter().enumerate() {
            out.insert(
                format!("networks.{i}.ipv4.addresses.{j}"),
                AttributeValue::String(addr),
            );
        }
    }

    for (i, port) in container.ports.unwrap_or_default().into_iter().enumerate() {
        put_num(&mut out, &format!("ports.{i}.container.port"), port.container_port);
        put_str(&mut out, &format!("ports.{i}.host.ip"), port.host_ip);
        put_num(&mut out, &format!("ports.{i}.host.port"), port.host_port);
        put_str(&mut out, &format!("ports.{i}.protocol"), port.protocol);
    }

    for (i, volume) in container.volumes.unwrap_or_default().into_iter().enumerate() {
        put_str(&mut out, &format!("volumes.{i}.destination"), volume.destination);
        put_str(&mut out, &format!("volumes.{i}.source"), volume.source);
    }

    Ok(out)
}

fn put_str(out: &mut Attributes, key: &str, value: Option<String>) {
    if let Some(v) = value {
        out.insert(key.to_owned(), AttributeValue::String(v));
    }
}

fn put_num(out: &mut Attributes, key: &str, value: Option<Number>) {
    if let Some(n) = value {
        out.insert(key.to_owned(), number_value(&n));
    }
}
