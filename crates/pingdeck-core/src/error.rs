//! pingdeck 핵심 에러 타입.
//!
//! 어댑터 crate(`pingdeck-network`)는 전송 계층 실패를 이 타입으로 매핑하고,
//! 파이프라인 crate는 자체 에러 타입에서 `#[from] CoreError`로 래핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 전송, 페이로드 검증, 설정 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 네트워크 에러 (연결 실패, 연결 끊김)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 요청 타임아웃
    #[error("요청 타임아웃: {timeout_ms}ms 초과")]
    Timeout {
        /// 초과된 타임아웃 시간 (밀리초)
        timeout_ms: u64,
    },

    /// 2xx 이외의 HTTP 응답
    #[error("HTTP 에러 ({status}): {body}")]
    Http {
        /// 상태 코드
        status: u16,
        /// 응답 본문 (진단용)
        body: String,
    },

    /// 리소스를 찾을 수 없음 (404)
    #[error("{resource} 미발견")]
    NotFound {
        /// 요청한 경로
        resource: String,
    },

    /// Rate Limit 초과 (429)
    #[error("요청 한도 초과, {retry_after_secs}초 후 재시도")]
    RateLimit {
        /// 재시도 대기 시간 (초)
        retry_after_secs: u64,
    },

    /// 서비스 일시 불가 (503)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// 응답 본문이 계약과 맞지 않음
    #[error("잘못된 페이로드: {0}")]
    MalformedPayload(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 다음 폴링 주기에 회복될 수 있는 일시적 실패인지 판별
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_)
                | CoreError::Timeout { .. }
                | CoreError::ServiceUnavailable(_)
                | CoreError::RateLimit { .. }
                | CoreError::Http { .. }
        )
    }

    /// 검증 에러 생성 헬퍼
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
