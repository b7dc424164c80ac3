//! 세션 설정 스냅샷.
//!
//! 시작 시 `/api/config`에서 한 번 가져와 세션 동안 유지한다.
//! 제자리 수정 없이 재요청 시 통째로 교체된다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 불변 세션 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 슬라이딩 윈도우 용량
    pub max_points: usize,
    /// 프로브 대상 (예: "8.8.8.8")
    pub target: String,
    /// 폴링 주기
    pub poll_interval: Duration,
    /// 샘플 소스 URL
    pub source_url: String,
}

impl SessionConfig {
    /// 원격 설정을 받지 못했을 때 사용하는 폴백
    pub fn fallback(
        max_points: usize,
        poll_interval: Duration,
        target: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            max_points: max_points.max(1),
            target: target.into(),
            poll_interval,
            source_url: source_url.into(),
        }
    }
}
