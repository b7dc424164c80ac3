//! 통합 테스트용 인메모리 샘플 소스.
//!
//! 서버처럼 프로브 이력을 누적하고, fetch마다 포인트 1개를 추가한 뒤 전체 이력을 돌려준다.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use pingdeck_core::error::CoreError;
use pingdeck_core::models::contract::{
    ChartPoint, RemoteConfig, ResetResponse, TelemetrySnapshot,
};
use pingdeck_core::ports::sample_source::SampleSource;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

pub struct FakeSource {
    history: Mutex<Vec<ChartPoint>>,
    /// 다음 프로브 결과 (`None` = 실패), 비어 있으면 성공
    script: Mutex<VecDeque<Option<f64>>>,
    delay: Mutex<Option<Duration>>,
    config: Mutex<RemoteConfig>,
    pub fail: AtomicBool,
    pub config_fails: AtomicBool,
    pub reset_fails: AtomicBool,
    pub fetches: AtomicU64,
    pub resets: AtomicU64,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            delay: Mutex::new(None),
            config: Mutex::new(RemoteConfig {
                max_points: 300,
                target: "8.8.8.8".to_string(),
                auto_refresh_interval: 1000,
                api_url: "http://localhost:5000".to_string(),
            }),
            fail: AtomicBool::new(false),
            config_fails: AtomicBool::new(false),
            reset_fails: AtomicBool::new(false),
            fetches: AtomicU64::new(0),
            resets: AtomicU64::new(0),
        }
    }

    pub fn with_config(self, max_points: usize, interval_ms: u64) -> Self {
        {
            let mut config = self.config.lock();
            config.max_points = max_points;
            config.auto_refresh_interval = interval_ms;
        }
        self
    }

    pub fn set_config(&self, max_points: usize, interval_ms: u64) {
        let mut config = self.config.lock();
        config.max_points = max_points;
        config.auto_refresh_interval = interval_ms;
    }

    /// 다음 프로브 결과 예약
    pub fn script(&self, outcomes: &[Option<f64>]) {
        self.script.lock().extend(outcomes.iter().copied());
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// `/api/reset` 없이 원격 이력만 비움 (프로브 서비스 재시작)
    pub fn restart(&self) {
        self.history.lock().clear();
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn probe(&self) {
        let mut history = self.history.lock();
        let index = history.len() as u64;
        let rtt = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(Some(10.0 + index as f64));
        history.push(ChartPoint {
            index,
            ttl: rtt.map(|_| 117),
            ping_time: rtt,
            timestamp: 1_700_000_000_000 + index as i64 * 1000,
        });
    }
}

#[async_trait]
impl SampleSource for FakeSource {
    async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot, CoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Network("connection refused".to_string()));
        }

        self.probe();
        let chart_data = self.history.lock().clone();
        Ok(TelemetrySnapshot {
            total_pings: chart_data.len() as u64,
            chart_data,
            ..Default::default()
        })
    }

    async fn fetch_config(&self) -> Result<RemoteConfig, CoreError> {
        if self.config_fails.load(Ordering::SeqCst) {
            return Err(CoreError::ServiceUnavailable("config".to_string()));
        }
        Ok(self.config.lock().clone())
    }

    async fn reset(&self) -> Result<ResetResponse, CoreError> {
        if self.reset_fails.load(Ordering::SeqCst) {
            return Err(CoreError::Http {
                status: 500,
                body: "reset failed".to_string(),
            });
        }
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.history.lock().clear();
        Ok(ResetResponse {
            message: "Statistics reset".to_string(),
        })
    }
}
