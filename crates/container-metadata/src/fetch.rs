//! 메타데이터 문서 수집
//!
//! [`MetadataFetcher`]는 엔드포인트 URL 하나에서 JSON 문서를 가져옵니다.
//! [`HttpMetadataFetcher`]는 `reqwest` 기반 구현으로, 요청 타임아웃과
//! 응답 크기 제한을 적용합니다. 재시도는 하지 않습니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::ContainerMetadataConfig;
use crate::error::{ContainerMetadataError, FetchError};

/// 메타데이터 문서를 가져오는 협력자
///
/// 성공 시 최상위가 JSON 객체인 문서를 반환합니다.
pub trait MetadataFetcher: Send + Sync + 'static {
    /// `url`에서 메타데이터 문서를 가져옵니다.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

impl<T: MetadataFetcher> MetadataFetcher for Arc<T> {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Value, FetchError>> + Send {
        (**self).fetch(url)
    }
}

/// 바이트열을 메타데이터 문서로 디코딩합니다.
///
/// 최상위 값이 객체가 아니면 [`FetchError::NotAnObject`]를 반환합니다.
pub fn decode_document(body: &[u8]) -> Result<Value, FetchError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    if !value.is_object() {
        return Err(FetchError::NotAnObject);
    }
    Ok(value)
}

/// HTTP 메타데이터 수집기
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
    max_document_bytes: usize,
}

impl HttpMetadataFetcher {
    /// 타임아웃과 최대 문서 크기로 수집기를 생성합니다.
    pub fn new(timeout: Duration, max_document_bytes: usize) -> Result<Self, ContainerMetadataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ContainerMetadataError::Config {
                field: "fetch_timeout_secs".to_owned(),
                reason: format!("failed to build http client: {e}"),
            })?;
        Ok(Self {
            client,
            max_document_bytes,
        })
    }

    /// 메타데이터 설정에서 수집기를 생성합니다.
    pub fn from_config(config: &ContainerMetadataConfig) -> Result<Self, ContainerMetadataError> {
        config.validate()?;
        Self::new(config.fetch_timeout(), config.max_document_bytes)
    }
}

impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_document_bytes as u64)
        {
            return Err(FetchError::TooLarge {
                limit: self.max_document_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_document_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_document_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url, bytes = body.len(), "metadata document fetched");
        decode_document(&body)
    }
}

/// 테스트용 Mock 수집기
///
/// URL별 고정 문서를 돌려주고 호출 횟수를 기록합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockMetadataFetcher {
    /// URL → 반환할 문서
    pub documents: std::collections::HashMap<String, Value>,
    /// 실패를 시뮬레이션할 URL
    pub failing: Vec<String>,
    /// URL별 호출 기록
    pub calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockMetadataFetcher {
    /// 빈 mock 수집기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// URL에 대한 문서를 등록합니다.
    pub fn with_document(mut self, url: impl Into<String>, document: Value) -> Self {
        self.documents.insert(url.into(), document);
        self
    }

    /// URL 요청이 실패하도록 설정합니다.
    pub fn with_failing(mut self, url: impl Into<String>) -> Self {
        self.failing.push(url.into());
        self
    }

    /// 지금까지의 호출 횟수를 반환합니다.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 특정 URL의 호출 횟수를 반환합니다.
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|u| *u == url).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
impl MetadataFetcher for MockMetadataFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_owned());
        }
        if self.failing.iter().any(|u| u == url) {
            return Err(FetchError::Request("mock failure".to_owned()));
        }
        self.documents
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}
