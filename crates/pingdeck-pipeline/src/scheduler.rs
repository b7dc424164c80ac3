//! 폴링 스케줄러.
//!
//! `Idle → Running → Paused → Running → Idle` 상태 머신.
//! 타이머는 별도 tokio 태스크에서 돌고, 각 틱의 fetch는 다시 자체 태스크로 실행된다
//! (일시정지는 타이머만 취소하고 진행 중인 fetch는 건드리지 않음).
//!
//! 동시 fetch는 최대 1개. 진행 중일 때 들어온 요청은 버린다 (`Coalesced`).
//! `stop`/`reset`은 세대(generation)를 올려 이전 세대 fetch 결과를 폐기한다.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pingdeck_core::error::CoreError;
use pingdeck_core::models::sample::Sample;
use pingdeck_core::ports::sample_source::SampleSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::SchedulerError;
use crate::window::SharedWindow;

/// 스케줄러 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingStatus {
    Idle,
    Running,
    Paused,
}

impl fmt::Display for PollingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PollingStatus::Idle => "idle",
            PollingStatus::Running => "running",
            PollingStatus::Paused => "paused",
        };
        f.write_str(label)
    }
}

/// 시작 파라미터
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingParams {
    /// 폴링 주기
    pub interval: Duration,
    /// 시작 시 즉시 1회 fetch
    pub immediate: bool,
}

/// 스케줄러 설정
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 시작 전 기본 주기
    pub interval: Duration,
    /// fetch 1회 제한 시간
    pub fetch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// 실패 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 데이터가 이미 있거나 이전 성공 이력이 있는 상태의 실패 (로그만)
    TransientFetchFailure,
    /// 첫 fetch 실패 + 데이터 없음 (사용자에게 표시)
    InitialConnectionFailure,
    /// 원격 설정 조회 실패 (기본값으로 계속)
    ConfigFetchFailure,
    /// 사용자 요청 리셋 실패
    ResetFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::TransientFetchFailure => "일시적 조회 실패",
            FailureKind::InitialConnectionFailure => "초기 연결 실패",
            FailureKind::ConfigFetchFailure => "설정 조회 실패",
            FailureKind::ResetFailure => "리셋 실패",
        };
        f.write_str(label)
    }
}

/// 실패 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// 관측용 스케줄러 상태 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingState {
    pub status: PollingStatus,
    pub interval: Duration,
    pub last_error: Option<FetchFailure>,
    pub last_successful_fetch_at: Option<DateTime<Utc>>,
    /// 누적 성공 fetch 수
    pub successful_fetches: u64,
    /// 마지막 성공 이후 연속 실패 수
    pub consecutive_failures: u32,
    /// 초기 연결 실패 (성공 시 해제)
    pub connection_error: Option<FetchFailure>,
}

impl PollingState {
    fn idle(interval: Duration) -> Self {
        Self {
            status: PollingStatus::Idle,
            interval,
            last_error: None,
            last_successful_fetch_at: None,
            successful_fetches: 0,
            consecutive_failures: 0,
            connection_error: None,
        }
    }
}

/// fetch 요청 주체 (로그용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    Start,
    Timer,
    Resume,
    Manual,
    Reset,
}

/// fetch 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 성공, 새로 수용한 샘플 수
    Ingested { accepted: usize },
    /// 다른 fetch가 진행 중이라 버려짐
    Coalesced,
    /// 실패 (윈도우는 그대로)
    Failed(FailureKind),
    /// stop/reset 이전 세대의 결과라 폐기됨
    Discarded,
}

/// 세대별 진행 중 fetch 표시
///
/// 슬롯 값은 `세대 + 1` (0 = 비어 있음). 같은 세대의 두 번째 요청만 막고,
/// 이전 세대 fetch가 남아 있으면 덮어쓴다. 해제는 Drop에서 하므로
/// 중단된 fetch가 파이프라인을 막지 않는다.
struct InFlightGuard {
    slot: Arc<AtomicU64>,
    token: u64,
}

impl InFlightGuard {
    fn acquire(slot: &Arc<AtomicU64>, generation: u64) -> Option<Self> {
        let token = generation + 1;
        let mut current = slot.load(Ordering::Acquire);
        loop {
            if current == token {
                return None;
            }
            match slot.compare_exchange(current, token, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => {
                    return Some(Self {
                        slot: Arc::clone(slot),
                        token,
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let _ = self
            .slot
            .compare_exchange(self.token, 0, Ordering::AcqRel, Ordering::Acquire);
    }
}

/// 상태 전이 제어 (락 안에서만 변경)
struct Control {
    status: PollingStatus,
    interval: Duration,
    params: Option<PollingParams>,
    timer: Option<JoinHandle<()>>,
    timer_fetch: Option<AbortHandle>,
}

struct Shared {
    source: Arc<dyn SampleSource>,
    window: SharedWindow,
    fetch_timeout: Duration,
    control: Mutex<Control>,
    state_tx: watch::Sender<PollingState>,
    generation: AtomicU64,
    in_flight: Arc<AtomicU64>,
}

impl Shared {
    fn publish_control(&self, control: &Control) {
        let status = control.status;
        let interval = control.interval;
        self.state_tx.send_modify(|s| {
            s.status = status;
            s.interval = interval;
        });
    }

    /// 타이머 재설정 (다음 틱 = 지금 + 주기)
    fn arm(self: &Arc<Self>, control: &mut Control) {
        if let Some(timer) = control.timer.take() {
            timer.abort();
        }

        let shared = Arc::clone(self);
        let period = control.interval;
        let first_tick = Instant::now() + period;
        control.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !shared.spawn_timer_fetch() {
                    break;
                }
            }
        }));
        debug!("타이머 설정: {}ms", period.as_millis());
    }

    /// 틱마다 상태를 다시 확인하고 Running일 때만 fetch 태스크 생성
    ///
    /// 진행 중 fetch가 있으면 태스크를 만들지 않으므로 `timer_fetch`는
    /// 항상 실제로 진행 중인 타이머 fetch를 가리킨다.
    fn spawn_timer_fetch(self: &Arc<Self>) -> bool {
        let mut control = self.control.lock();
        if control.status != PollingStatus::Running {
            return false;
        }
        let generation = self.generation.load(Ordering::Acquire);
        let Some(guard) = InFlightGuard::acquire(&self.in_flight, generation) else {
            debug!("fetch 진행 중, 타이머 틱 무시");
            return true;
        };
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            shared.run_fetch(guard, generation, FetchTrigger::Timer).await;
        });
        control.timer_fetch = Some(handle.abort_handle());
        true
    }

    async fn fetch_once(&self, trigger: FetchTrigger) -> FetchOutcome {
        let generation = self.generation.load(Ordering::Acquire);
        let Some(guard) = InFlightGuard::acquire(&self.in_flight, generation) else {
            debug!("fetch 진행 중, {trigger:?} 요청 무시");
            return FetchOutcome::Coalesced;
        };
        self.run_fetch(guard, generation, trigger).await
    }

    /// 가드를 쥔 채 fetch 1회 (가드는 완료나 중단 시 해제)
    async fn run_fetch(
        &self,
        _guard: InFlightGuard,
        generation: u64,
        trigger: FetchTrigger,
    ) -> FetchOutcome {
        debug!("fetch 시작 ({trigger:?})");
        let result = match tokio::time::timeout(self.fetch_timeout, self.source.fetch_snapshot())
            .await
        {
            Ok(Ok(snapshot)) => snapshot.samples(),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CoreError::Timeout {
                timeout_ms: self.fetch_timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(samples) => self.ingest(generation, samples),
            Err(e) => self.record_failure(generation, &e),
        }
    }

    fn ingest(&self, generation: u64, samples: Vec<Sample>) -> FetchOutcome {
        let mut window = self.window.write();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("이전 세대 fetch 결과 폐기");
            return FetchOutcome::Discarded;
        }

        // 원격 이력의 최신 순번이 뒤로 갔다면 `/api/reset` 없이 원격이 재시작된 것
        let newest = samples.iter().map(|s| s.sequence_index).max();
        if let (Some(newest), Some(last)) = (newest, window.last_index()) {
            if newest < last {
                warn!(
                    "원격 순번 역행 (마지막 수용 {last}, 수신 최신 {newest}): 윈도우 재동기화"
                );
                window.reset();
            }
        }

        let mut accepted = 0;
        for sample in samples {
            // 이미 본 포인트와의 겹침은 정상
            if window
                .last_index()
                .is_some_and(|last| sample.sequence_index <= last)
            {
                continue;
            }
            if window.push(sample).is_ok() {
                accepted += 1;
            }
        }

        let now = Utc::now();
        self.state_tx.send_modify(|s| {
            s.last_successful_fetch_at = Some(now);
            s.successful_fetches += 1;
            s.last_error = None;
            s.connection_error = None;
            s.consecutive_failures = 0;
        });
        debug!("fetch 성공: {accepted}개 수용 (보관 {}개)", window.len());
        FetchOutcome::Ingested { accepted }
    }

    fn record_failure(&self, generation: u64, err: &CoreError) -> FetchOutcome {
        let window = self.window.read();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("이전 세대 fetch 실패 폐기: {err}");
            return FetchOutcome::Discarded;
        }

        let never_succeeded = self.state_tx.borrow().last_successful_fetch_at.is_none();
        let kind = if never_succeeded && window.is_empty() {
            FailureKind::InitialConnectionFailure
        } else {
            FailureKind::TransientFetchFailure
        };
        let failure = FetchFailure::new(kind, err.to_string());

        match kind {
            FailureKind::InitialConnectionFailure => error!("초기 연결 실패: {err}"),
            _ => warn!("fetch 실패 (기존 데이터 유지): {err}"),
        }

        self.state_tx.send_modify(|s| {
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
            if kind == FailureKind::InitialConnectionFailure {
                s.connection_error = Some(failure.clone());
            }
            s.last_error = Some(failure);
        });
        FetchOutcome::Failed(kind)
    }
}

/// 폴링 스케줄러
///
/// 모든 메서드는 tokio 런타임 안에서 호출해야 한다 (타이머 태스크 생성).
/// Drop 시 `stop`과 동일하게 타이머와 진행 중 fetch를 정리한다.
pub struct PollingScheduler {
    shared: Arc<Shared>,
}

impl PollingScheduler {
    pub fn new(
        source: Arc<dyn SampleSource>,
        window: SharedWindow,
        config: SchedulerConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(PollingState::idle(config.interval));
        Self {
            shared: Arc::new(Shared {
                source,
                window,
                fetch_timeout: config.fetch_timeout,
                control: Mutex::new(Control {
                    status: PollingStatus::Idle,
                    interval: config.interval,
                    params: None,
                    timer: None,
                    timer_fetch: None,
                }),
                state_tx,
                generation: AtomicU64::new(0),
                in_flight: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    /// 폴링 시작
    ///
    /// 같은 파라미터로 이미 실행 중이면 no-op. 다른 파라미터로 실행 중이거나
    /// 일시정지 상태면 `AlreadyRunning` (`resume` 사용).
    pub async fn start(&self, params: PollingParams) -> Result<(), SchedulerError> {
        if params.interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }

        {
            let mut control = self.shared.control.lock();
            match control.status {
                PollingStatus::Running if control.params == Some(params) => return Ok(()),
                PollingStatus::Running | PollingStatus::Paused => {
                    return Err(SchedulerError::AlreadyRunning {
                        status: control.status,
                    });
                }
                PollingStatus::Idle => {}
            }
            control.status = PollingStatus::Running;
            control.interval = params.interval;
            control.params = Some(params);
            self.shared.arm(&mut control);
            self.shared.publish_control(&control);
        }

        info!(
            "폴링 시작: 주기={}ms, 즉시={}",
            params.interval.as_millis(),
            params.immediate
        );
        if params.immediate {
            self.shared.fetch_once(FetchTrigger::Start).await;
        }
        Ok(())
    }

    /// 일시정지 (타이머만 취소, 진행 중 fetch는 유지)
    pub fn pause(&self) {
        let mut control = self.shared.control.lock();
        if control.status != PollingStatus::Running {
            return;
        }
        if let Some(timer) = control.timer.take() {
            timer.abort();
        }
        control.status = PollingStatus::Paused;
        self.shared.publish_control(&control);
        info!("폴링 일시정지");
    }

    /// 재개 (현재 주기로 타이머 재설정, `immediate`면 1회 fetch 후 반환)
    pub async fn resume(&self, immediate: bool) -> Result<(), SchedulerError> {
        {
            let mut control = self.shared.control.lock();
            match control.status {
                PollingStatus::Idle => return Err(SchedulerError::NotStarted),
                PollingStatus::Running => return Ok(()),
                PollingStatus::Paused => {}
            }
            control.status = PollingStatus::Running;
            self.shared.arm(&mut control);
            self.shared.publish_control(&control);
        }

        info!("폴링 재개");
        if immediate {
            self.shared.fetch_once(FetchTrigger::Resume).await;
        }
        Ok(())
    }

    /// 주기 변경 (실행 중이면 추가 fetch 없이 타이머만 재설정)
    pub fn set_interval(&self, interval: Duration) -> Result<(), SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }

        let mut control = self.shared.control.lock();
        if control.interval == interval {
            return Ok(());
        }
        control.interval = interval;
        if let Some(params) = control.params.as_mut() {
            params.interval = interval;
        }
        if control.status == PollingStatus::Running {
            self.shared.arm(&mut control);
        }
        self.shared.publish_control(&control);
        info!("폴링 주기 변경: {}ms", interval.as_millis());
        Ok(())
    }

    /// 즉시 1회 fetch (일시정지 여부와 무관)
    pub async fn refetch(&self) -> FetchOutcome {
        self.shared.fetch_once(FetchTrigger::Manual).await
    }

    /// 정지 (타이머 취소, 진행 중 fetch 폐기)
    pub fn stop(&self) {
        let mut control = self.shared.control.lock();
        if let Some(timer) = control.timer.take() {
            timer.abort();
        }
        if let Some(fetch) = control.timer_fetch.take() {
            fetch.abort();
        }
        self.shared.generation.fetch_add(1, Ordering::AcqRel);

        if control.status != PollingStatus::Idle {
            control.status = PollingStatus::Idle;
            control.params = None;
            self.shared.publish_control(&control);
            info!("폴링 정지");
        }
    }

    /// 2단계 리셋
    ///
    /// 원격 리셋 → 로컬 윈도우 초기화 → 즉시 fetch 순서를 지킨다.
    /// 원격 단계가 실패하면 로컬 데이터는 그대로 두고 `Reset` 에러를 반환한다.
    pub async fn reset(&self) -> Result<FetchOutcome, SchedulerError> {
        let remote = match tokio::time::timeout(self.shared.fetch_timeout, self.shared.source.reset())
            .await
        {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout {
                timeout_ms: self.shared.fetch_timeout.as_millis() as u64,
            }),
        };

        match remote {
            Ok(response) => info!("원격 리셋 완료: {}", response.message),
            Err(e) => {
                warn!("원격 리셋 실패 (로컬 데이터 유지): {e}");
                let failure = FetchFailure::new(FailureKind::ResetFailure, e.to_string());
                self.shared.state_tx.send_modify(|s| s.last_error = Some(failure));
                return Err(SchedulerError::Reset(e));
            }
        }

        {
            let mut window = self.shared.window.write();
            self.shared.generation.fetch_add(1, Ordering::AcqRel);
            window.reset();
        }
        if let Some(fetch) = self.shared.control.lock().timer_fetch.take() {
            fetch.abort();
        }

        Ok(self.shared.fetch_once(FetchTrigger::Reset).await)
    }

    /// 현재 상태 스냅샷
    pub fn state(&self) -> PollingState {
        self.shared.state_tx.borrow().clone()
    }

    /// 상태 변경 구독
    pub fn subscribe(&self) -> watch::Receiver<PollingState> {
        self.shared.state_tx.subscribe()
    }

    pub fn status(&self) -> PollingStatus {
        self.shared.control.lock().status
    }

    pub fn interval(&self) -> Duration {
        self.shared.control.lock().interval
    }

    /// 공유 윈도우
    pub fn window(&self) -> SharedWindow {
        Arc::clone(&self.shared.window)
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
