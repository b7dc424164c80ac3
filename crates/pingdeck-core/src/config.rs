//! 애플리케이션 설정 구조체.
//!
//! 샘플 소스 URL, 폴링 주기, 표시 용량 등 클라이언트 측 런타임 설정을 정의한다.
//! 원격 `/api/config`에서 받는 세션 설정은 [`crate::models::session`] 참조.
//! 바이너리에서 `config` crate를 통해 파일/환경변수에서 로드.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 샘플 소스 서버 연결 설정
    pub server: ServerConfig,
    /// 폴링 설정
    #[serde(default)]
    pub polling: PollingConfig,
    /// 차트 표시 설정
    #[serde(default)]
    pub display: DisplayConfig,
    /// 슬라이딩 윈도우 설정
    #[serde(default)]
    pub window: WindowConfig,
}

// ============================================================
// 서버/폴링/표시/윈도우 설정
// ============================================================

/// 샘플 소스 서버 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API 서버 기본 URL (예: "http://localhost:5000")
    pub base_url: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// 원격 설정 조회 재시도 횟수 (폴링 fetch는 재시도하지 않음)
    #[serde(default = "default_config_retries")]
    pub config_retries: u32,
}

/// 폴링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// 원격 설정을 받지 못했을 때 사용할 폴링 주기 (밀리초)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    /// 시작 직후 즉시 한 번 가져올지 여부
    #[serde(default = "default_true")]
    pub immediate: bool,
    /// 단일 fetch 상한 시간 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            immediate: true,
            fetch_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// 차트 표시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// 차트에 그릴 최근 샘플 수 (윈도우 용량보다 작게 유지)
    #[serde(default = "default_display_capacity")]
    pub capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            capacity: default_display_capacity(),
        }
    }
}

/// 슬라이딩 윈도우 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 원격 설정을 받지 못했을 때 사용할 윈도우 용량
    #[serde(default = "default_fallback_max_points")]
    pub fallback_max_points: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            fallback_max_points: default_fallback_max_points(),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:5000".to_string(),
                request_timeout_ms: default_request_timeout_ms(),
                config_retries: default_config_retries(),
            },
            polling: PollingConfig::default(),
            display: DisplayConfig::default(),
            window: WindowConfig::default(),
        }
    }

    /// 설정값 검증
    ///
    /// 0 주기, 0 용량, 빈 URL은 거부한다.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.server.base_url.trim().is_empty() {
            return Err(CoreError::validation("server.base_url", "비어 있음"));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(CoreError::validation(
                "server.request_timeout_ms",
                "0보다 커야 함",
            ));
        }
        if self.polling.interval_ms == 0 {
            return Err(CoreError::validation("polling.interval_ms", "0보다 커야 함"));
        }
        if self.polling.fetch_timeout_ms == 0 {
            return Err(CoreError::validation(
                "polling.fetch_timeout_ms",
                "0보다 커야 함",
            ));
        }
        if self.display.capacity == 0 {
            return Err(CoreError::validation("display.capacity", "0보다 커야 함"));
        }
        if self.window.fallback_max_points == 0 {
            return Err(CoreError::validation(
                "window.fallback_max_points",
                "0보다 커야 함",
            ));
        }
        Ok(())
    }

    /// 서버 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// 폴백 폴링 주기를 Duration으로 반환
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    /// fetch 타임아웃을 Duration으로 반환
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.polling.fetch_timeout_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_config_retries() -> u32 {
    2
}
fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_display_capacity() -> usize {
    100
}
fn default_fallback_max_points() -> usize {
    60
}
