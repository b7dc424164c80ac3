//! 대시보드 파사드.
//!
//! 샘플 소스 + 윈도우 + 스케줄러 + 프로젝터를 묶어 표시 계층에 하나의 진입점을 제공한다.
//! 시작 시 원격 세션 설정을 받고, 실패하면 로컬 폴백으로 계속한다.

use parking_lot::{Mutex, RwLock};
use pingdeck_core::config::AppConfig;
use pingdeck_core::error::CoreError;
use pingdeck_core::models::session::SessionConfig;
use pingdeck_core::ports::sample_source::SampleSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::SchedulerError;
use crate::projector::{ChartProjector, Projection};
use crate::scheduler::{
    FailureKind, FetchFailure, FetchOutcome, PollingParams, PollingScheduler, PollingState,
    PollingStatus, SchedulerConfig,
};
use crate::stats::DerivedStats;
use crate::window::{new_shared_window, SharedWindow};

/// 원격 설정이 없을 때 표시하는 대상 이름
const UNKNOWN_TARGET: &str = "unknown";

/// 대시보드 런타임 설정 (로컬 설정에서 유도)
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    /// 원격 설정 실패 시 윈도우 용량
    pub fallback_max_points: usize,
    /// 원격 설정 실패 시 폴링 주기
    pub fallback_interval: Duration,
    /// 시작 직후 즉시 fetch
    pub immediate: bool,
    pub fetch_timeout: Duration,
    /// 차트 표시 개수
    pub display_capacity: usize,
    /// 폴백 세션에 기록할 소스 URL
    pub source_url: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default_config())
    }
}

impl DashboardSettings {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fallback_max_points: config.window.fallback_max_points,
            fallback_interval: config.poll_interval(),
            immediate: config.polling.immediate,
            fetch_timeout: config.fetch_timeout(),
            display_capacity: config.display.capacity,
            source_url: config.server.base_url.clone(),
        }
    }

    fn fallback_session(&self) -> SessionConfig {
        SessionConfig::fallback(
            self.fallback_max_points,
            self.fallback_interval,
            UNKNOWN_TARGET,
            self.source_url.clone(),
        )
    }
}

/// 사용자에게 보여줄 오류 배너
#[derive(Debug, Clone, PartialEq)]
pub enum Banner {
    /// 첫 연결 실패 + 표시할 데이터 없음 (재시도 안내)
    ConnectionError(FetchFailure),
    /// 사용자 요청 리셋 실패 (다음 성공 fetch까지 유지)
    ResetFailed(FetchFailure),
}

/// 표시 계층용 스냅샷
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub polling: PollingState,
    pub stats: DerivedStats,
    pub projection: Projection,
    pub session: Arc<SessionConfig>,
    pub banner: Option<Banner>,
    /// 원격 설정 실패로 폴백 사용 중
    pub config_error: Option<FetchFailure>,
}

/// 리셋 실패 기록 (실패 시점의 누적 성공 수)
struct ResetFailureMark {
    successes_at: u64,
    failure: FetchFailure,
}

/// 대시보드
pub struct Dashboard {
    source: Arc<dyn SampleSource>,
    settings: DashboardSettings,
    session: RwLock<Arc<SessionConfig>>,
    window: SharedWindow,
    scheduler: PollingScheduler,
    projector: ChartProjector,
    reset_failure: Mutex<Option<ResetFailureMark>>,
    config_error: Mutex<Option<FetchFailure>>,
}

impl Dashboard {
    /// 원격 세션 설정을 받아 대시보드 구성 (폴링은 시작하지 않음)
    pub async fn bootstrap(source: Arc<dyn SampleSource>, settings: DashboardSettings) -> Self {
        let (session, config_error) = match fetch_session(source.as_ref()).await {
            Ok(session) => {
                info!(
                    "세션 설정: 대상={}, 용량={}, 주기={}ms",
                    session.target,
                    session.max_points,
                    session.poll_interval.as_millis()
                );
                (session, None)
            }
            Err(e) => {
                warn!("원격 설정 조회 실패, 기본값 사용: {e}");
                (
                    settings.fallback_session(),
                    Some(FetchFailure::new(FailureKind::ConfigFetchFailure, e.to_string())),
                )
            }
        };

        let window = new_shared_window(session.max_points);
        let scheduler = PollingScheduler::new(
            Arc::clone(&source),
            Arc::clone(&window),
            SchedulerConfig {
                interval: session.poll_interval,
                fetch_timeout: settings.fetch_timeout,
            },
        );

        Self {
            source,
            projector: ChartProjector::new(settings.display_capacity),
            settings,
            session: RwLock::new(Arc::new(session)),
            window,
            scheduler,
            reset_failure: Mutex::new(None),
            config_error: Mutex::new(config_error),
        }
    }

    /// 원격 설정 재조회 (실패 시 현재 세션 유지)
    ///
    /// 성공하면 세션을 통째로 교체하고 새 용량과 주기를 적용한다.
    pub async fn reload_config(&self) -> Result<Arc<SessionConfig>, CoreError> {
        let session = match fetch_session(self.source.as_ref()).await {
            Ok(session) => Arc::new(session),
            Err(e) => {
                warn!("설정 재조회 실패 (현재 세션 유지): {e}");
                return Err(e);
            }
        };

        self.window.write().set_capacity(session.max_points);
        if let Err(e) = self.scheduler.set_interval(session.poll_interval) {
            warn!("주기 적용 실패: {e}");
        }
        *self.session.write() = Arc::clone(&session);
        *self.config_error.lock() = None;
        info!("세션 설정 교체: 용량={}", session.max_points);
        Ok(session)
    }

    /// 세션 주기로 폴링 시작
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let interval = self.session.read().poll_interval;
        self.scheduler
            .start(PollingParams {
                interval,
                immediate: self.settings.immediate,
            })
            .await
    }

    pub fn pause(&self) {
        self.scheduler.pause();
    }

    pub async fn resume(&self) -> Result<(), SchedulerError> {
        self.scheduler.resume(false).await
    }

    /// 실행 ↔ 일시정지 전환 (정지 상태면 시작)
    pub async fn toggle_pause(&self) -> Result<PollingStatus, SchedulerError> {
        match self.scheduler.status() {
            PollingStatus::Running => self.pause(),
            PollingStatus::Paused => self.resume().await?,
            PollingStatus::Idle => self.start().await?,
        }
        Ok(self.scheduler.status())
    }

    /// 수동 새로고침 (일시정지 중에도 동작)
    pub async fn refresh(&self) -> FetchOutcome {
        self.scheduler.refetch().await
    }

    /// 2단계 리셋, 실패는 배너로 기록
    pub async fn reset(&self) -> Result<FetchOutcome, SchedulerError> {
        match self.scheduler.reset().await {
            Ok(outcome) => {
                *self.reset_failure.lock() = None;
                Ok(outcome)
            }
            Err(e) => {
                *self.reset_failure.lock() = Some(ResetFailureMark {
                    successes_at: self.scheduler.state().successful_fetches,
                    failure: FetchFailure::new(FailureKind::ResetFailure, e.to_string()),
                });
                Err(e)
            }
        }
    }

    /// 폴링 정지
    pub fn shutdown(&self) {
        self.scheduler.stop();
        info!("대시보드 종료");
    }

    /// 현재 화면 스냅샷
    pub fn view(&self) -> DashboardView {
        let polling = self.scheduler.state();
        let (stats, projection, empty) = {
            let window = self.window.read();
            (
                window.stats(),
                self.projector.project(window.samples()),
                window.is_empty(),
            )
        };

        let banner = match &polling.connection_error {
            Some(failure) if empty => Some(Banner::ConnectionError(failure.clone())),
            _ => self.pending_reset_failure(&polling).map(Banner::ResetFailed),
        };

        DashboardView {
            banner,
            stats,
            projection,
            session: self.session(),
            config_error: self.config_error.lock().clone(),
            polling,
        }
    }

    pub fn session(&self) -> Arc<SessionConfig> {
        self.session.read().clone()
    }

    pub fn scheduler(&self) -> &PollingScheduler {
        &self.scheduler
    }

    pub fn window(&self) -> SharedWindow {
        Arc::clone(&self.window)
    }

    fn pending_reset_failure(&self, polling: &PollingState) -> Option<FetchFailure> {
        let mut mark = self.reset_failure.lock();
        match mark.as_ref() {
            Some(m) if polling.successful_fetches == m.successes_at => Some(m.failure.clone()),
            Some(_) => {
                *mark = None;
                None
            }
            None => None,
        }
    }
}

async fn fetch_session(source: &dyn SampleSource) -> Result<SessionConfig, CoreError> {
    source.fetch_config().await?.into_session()
}
