//! 파이프라인 에러 타입.

use pingdeck_core::error::CoreError;
use thiserror::Error;

use crate::scheduler::PollingStatus;

/// 슬라이딩 윈도우 에러
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// 순번이 마지막 수용 순번보다 크지 않음 (중복 또는 역순 전달)
    #[error("순서 위반 샘플 거부: 마지막 index={last}, 수신 index={got}")]
    OutOfOrder {
        /// 마지막으로 수용된 순번
        last: u64,
        /// 거부된 샘플의 순번
        got: u64,
    },
}

/// 폴링 스케줄러 에러
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// 다른 파라미터로 이미 시작됨 (일시정지 포함)
    #[error("스케줄러가 이미 실행 중 (상태: {status})")]
    AlreadyRunning {
        /// 현재 상태
        status: PollingStatus,
    },

    /// 시작 전에 resume 호출
    #[error("스케줄러가 시작되지 않음")]
    NotStarted,

    /// 0 주기
    #[error("폴링 주기는 0보다 커야 함")]
    InvalidInterval,

    /// 2단계 리셋의 원격 단계 실패 (로컬 데이터는 유지됨)
    #[error("원격 리셋 실패: {0}")]
    Reset(#[source] CoreError),
}
