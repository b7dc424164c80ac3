//! 샘플 소스 포트.
//!
//! 구현: `pingdeck-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::contract::{RemoteConfig, ResetResponse, TelemetrySnapshot};

/// 원격 프로브 서비스 클라이언트
///
/// 각 호출은 요청/응답 한 번이며 느리거나 실패할 수 있다.
/// 재시도와 실패 분류는 호출자(스케줄러)의 책임이다.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// 현재 텔레메트리 스냅샷 조회 (`GET /api/data`)
    async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot, CoreError>;

    /// 세션 설정 조회 (`GET /api/config`)
    async fn fetch_config(&self) -> Result<RemoteConfig, CoreError>;

    /// 원격 카운터 초기화 (`POST /api/reset`)
    ///
    /// 2단계 리셋의 첫 단계. 성공 응답 이후에만 로컬 윈도우를 비운다.
    async fn reset(&self) -> Result<ResetResponse, CoreError>;
}
