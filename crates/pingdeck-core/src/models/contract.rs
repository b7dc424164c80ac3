//! 샘플 소스 HTTP 계약.
//!
//! `GET /api/data`, `GET /api/config`, `POST /api/reset` 응답 본문.
//! 와이어 형식은 null 허용 필드를 그대로 두고, 도메인 타입 변환 시 검증한다.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;
use crate::models::sample::Sample;
use crate::models::session::SessionConfig;

/// 차트 데이터 포인트 (와이어 형식)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// 순번
    pub index: u64,
    /// TTL (실패 시 null)
    pub ttl: Option<u32>,
    /// 왕복 시간 ms (실패 시 null)
    #[serde(rename = "pingTime")]
    pub ping_time: Option<f64>,
    /// 관측 시각 (Unix epoch 밀리초)
    pub timestamp: i64,
}

impl ChartPoint {
    /// 도메인 샘플로 변환
    ///
    /// TTL과 RTT는 함께 존재하거나 함께 부재해야 한다.
    pub fn to_sample(&self) -> Result<Sample, CoreError> {
        let timestamp = DateTime::from_timestamp_millis(self.timestamp).ok_or_else(|| {
            CoreError::MalformedPayload(format!(
                "index {}: 범위를 벗어난 timestamp {}",
                self.index, self.timestamp
            ))
        })?;

        match (self.ping_time, self.ttl) {
            (Some(rtt), Some(ttl)) => {
                if !rtt.is_finite() || rtt < 0.0 {
                    return Err(CoreError::MalformedPayload(format!(
                        "index {}: 잘못된 pingTime {rtt}",
                        self.index
                    )));
                }
                Ok(Sample::success(self.index, rtt, ttl, timestamp))
            }
            (None, None) => Ok(Sample::failed(self.index, timestamp)),
            _ => Err(CoreError::MalformedPayload(format!(
                "index {}: ttl과 pingTime의 존재 여부 불일치",
                self.index
            ))),
        }
    }
}

/// `GET /api/data` 응답
///
/// 요약 필드는 서버 측 계산값이며 표시용 참고치다.
/// 로컬 통계는 항상 윈도우 내용에서 다시 계산한다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(default)]
    pub failure_rate: f64,
    #[serde(default)]
    pub avg_ping_time: Option<f64>,
    #[serde(default)]
    pub min_ping_time: Option<f64>,
    #[serde(default)]
    pub max_ping_time: Option<f64>,
    /// 구버전 서버는 `avg_failed_pings`로 보낸다
    #[serde(default, alias = "avg_failed_pings")]
    pub avg_outage_duration: Option<f64>,
    #[serde(default)]
    pub total_pings: u64,
    #[serde(default)]
    pub chart_data: Vec<ChartPoint>,
}

impl TelemetrySnapshot {
    /// 모든 차트 포인트를 샘플로 변환 (하나라도 잘못되면 전체 거부)
    pub fn samples(&self) -> Result<Vec<Sample>, CoreError> {
        self.chart_data.iter().map(ChartPoint::to_sample).collect()
    }
}

/// `GET /api/config` 응답
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub max_points: usize,
    pub target: String,
    /// 폴링 주기 (밀리초)
    pub auto_refresh_interval: u64,
    pub api_url: String,
}

impl RemoteConfig {
    /// 세션 설정으로 변환
    pub fn into_session(self) -> Result<SessionConfig, CoreError> {
        if self.max_points == 0 {
            return Err(CoreError::validation("max_points", "0보다 커야 함"));
        }
        if self.auto_refresh_interval == 0 {
            return Err(CoreError::validation(
                "auto_refresh_interval",
                "0보다 커야 함",
            ));
        }
        Ok(SessionConfig {
            max_points: self.max_points,
            target: self.target,
            poll_interval: Duration::from_millis(self.auto_refresh_interval),
            source_url: self.api_url,
        })
    }
}

/// `POST /api/reset` 응답
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
}
