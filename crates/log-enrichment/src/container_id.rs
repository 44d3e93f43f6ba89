//! 리소스 속성에서 컨테이너 ID 도출
//!
//! 소스 속성은 설정 순서대로 확인합니다. 값은 선행하는 `[a-z0-9]` 문자열만
//! 남기도록 정규화되므로 `log.file.name`의 `<id>-json.log` 같은 값에서도
//! ID를 얻을 수 있습니다.

use dockmeta_core::types::{ContainerId, Resource};

/// 원시 값을 컨테이너 ID로 정규화합니다.
///
/// 선행하는 소문자 영숫자 구간이 비어 있으면 `None`을 반환합니다.
pub fn normalize(raw: &str) -> Option<ContainerId> {
    let end = raw
        .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .unwrap_or(raw.len());
    if end == 0 {
        return None;
    }
    Some(ContainerId::new(&raw[..end]))
}

/// 소스 속성 목록에서 첫 번째로 유효한 컨테이너 ID를 찾습니다.
///
/// 속성이 있어도 정규화 결과가 비어 있으면 다음 소스로 넘어갑니다.
pub fn derive<S: AsRef<str>>(resource: &Resource, sources: &[S]) -> Option<ContainerId> {
    sources.iter().find_map(|source| {
        resource
            .get(source.as_ref())
            .and_then(|value| match value.as_str() {
                Some(s) => normalize(s),
                None => normalize(&value.to_string()),
            })
    })
}
