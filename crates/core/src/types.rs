//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 로그 리소스, 속성 값, 컨테이너 식별자 등 모든 크레이트가 공유하는
//! 데이터 구조를 정의합니다.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 속성 맵 (키 정렬 유지)
pub type Attributes = BTreeMap<String, AttributeValue>;

/// 리소스/로그 속성 값
///
/// JSON 스칼라와 1:1로 대응합니다. 직렬화 시 태그 없이 원시 값으로 표현됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// 불리언
    Bool(bool),
    /// 부호 있는 정수
    Int(i64),
    /// `i64` 범위를 넘는 부호 없는 정수
    UInt(u64),
    /// 부동소수점
    Double(f64),
    /// 문자열
    String(String),
}

impl AttributeValue {
    /// 문자열 값이면 참조를 반환합니다.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::UInt(value), Self::Int)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// 로그를 생성한 엔티티를 설명하는 리소스
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    /// 리소스 속성
    pub attributes: Attributes,
}

impl Resource {
    /// 속성을 설정합니다. 같은 키가 있으면 덮어씁니다.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// 속성을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

/// 단일 로그 레코드
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRecord {
    /// 타임스탬프 (Unix epoch 나노초, 0이면 미지정)
    pub time_unix_nano: u64,
    /// 심각도 문자열 (INFO, WARN 등)
    pub severity_text: String,
    /// 로그 본문
    pub body: serde_json::Value,
    /// 레코드 속성
    pub attributes: Attributes,
}

/// 하나의 리소스와 그 리소스에서 발생한 로그 레코드 묶음
///
/// 보강(enrichment)은 리소스 단위로 수행됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLogs {
    /// 리소스
    pub resource: Resource,
    /// 로그 레코드
    pub records: Vec<LogRecord>,
}

/// 정규화된 컨테이너 식별자 (메타데이터 캐시 키)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// 문자열로부터 식별자를 생성합니다. 정규화는 수행하지 않습니다.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 내부 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Docker 로그 등에서 쓰는 12자리 축약 ID를 반환합니다.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ContainerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ContainerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
