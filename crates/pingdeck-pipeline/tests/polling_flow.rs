//! 스케줄러 + 윈도우 통합 테스트.
//!
//! 가상 시간(`start_paused`)으로 타이머 동작을 검증한다.

mod common;

use assert_matches::assert_matches;
use common::FakeSource;
use pingdeck_pipeline::error::SchedulerError;
use pingdeck_pipeline::scheduler::{
    FailureKind, FetchOutcome, PollingParams, PollingScheduler, PollingStatus, SchedulerConfig,
};
use pingdeck_pipeline::window::{new_shared_window, SharedWindow};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn setup(capacity: usize) -> (Arc<FakeSource>, SharedWindow, PollingScheduler) {
    let source = Arc::new(FakeSource::new());
    let window = new_shared_window(capacity);
    let scheduler = PollingScheduler::new(
        source.clone(),
        window.clone(),
        SchedulerConfig {
            interval: Duration::from_millis(1000),
            fetch_timeout: Duration::from_millis(500),
        },
    );
    (source, window, scheduler)
}

fn every(ms: u64, immediate: bool) -> PollingParams {
    PollingParams {
        interval: Duration::from_millis(ms),
        immediate,
    }
}

fn indices(window: &SharedWindow) -> Vec<u64> {
    window.read().samples().map(|s| s.sequence_index).collect()
}

#[tokio::test(start_paused = true)]
async fn timer_drives_fetches() {
    let (_, window, scheduler) = setup(100);
    scheduler.start(every(1000, true)).await.unwrap();
    assert_eq!(indices(&window), vec![0]);

    sleep(Duration::from_millis(3500)).await;
    assert_eq!(indices(&window), vec![0, 1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn delayed_start_waits_one_interval() {
    let (source, window, scheduler) = setup(100);
    scheduler.start(every(1000, false)).await.unwrap();
    assert_eq!(source.fetch_count(), 0);

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(indices(&window), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn window_never_exceeds_capacity() {
    let (_, window, scheduler) = setup(5);
    scheduler.start(every(100, true)).await.unwrap();

    for _ in 0..20 {
        sleep(Duration::from_millis(100)).await;
        assert!(window.read().len() <= 5);
    }

    let guard = window.read();
    assert_eq!(guard.len(), 5);
    let idx: Vec<u64> = guard.samples().map(|s| s.sequence_index).collect();
    assert!(idx.windows(2).all(|w| w[0] + 1 == w[1]));
    assert_eq!(guard.stats().total_pings, guard.last_index().unwrap_or(0) + 1);
}

#[tokio::test(start_paused = true)]
async fn pause_stops_timer_but_refetch_still_ingests() {
    let (source, window, scheduler) = setup(100);
    scheduler.start(every(1000, true)).await.unwrap();
    scheduler.pause();
    assert_eq!(scheduler.status(), PollingStatus::Paused);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(source.fetch_count(), 1);

    assert_eq!(
        scheduler.refetch().await,
        FetchOutcome::Ingested { accepted: 1 }
    );
    assert_eq!(indices(&window), vec![0, 1]);
    assert_eq!(scheduler.status(), PollingStatus::Paused);
}

#[tokio::test(start_paused = true)]
async fn resume_rearms_without_immediate_fetch() {
    let (source, window, scheduler) = setup(100);
    scheduler.start(every(1000, true)).await.unwrap();
    scheduler.pause();

    scheduler.resume(false).await.unwrap();
    assert_eq!(source.fetch_count(), 1);
    // 이미 실행 중이면 no-op
    scheduler.resume(false).await.unwrap();

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(indices(&window), vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn resume_with_immediate_fetches() {
    let (_, window, scheduler) = setup(100);
    scheduler.start(every(1000, false)).await.unwrap();
    scheduler.pause();
    scheduler.resume(true).await.unwrap();
    assert_eq!(indices(&window), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn interval_change_rearms_without_extra_fetch() {
    let (source, _, scheduler) = setup(100);
    scheduler.start(every(1000, true)).await.unwrap();

    scheduler.set_interval(Duration::from_secs(5)).unwrap();
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(scheduler.state().interval, Duration::from_secs(5));

    sleep(Duration::from_secs(4)).await;
    assert_eq!(source.fetch_count(), 1);

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(source.fetch_count(), 2);

    // 새 주기 기준으로는 같은 파라미터
    assert!(scheduler.start(every(5000, true)).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_after_data_keeps_window() {
    let (source, window, scheduler) = setup(100);
    scheduler.refetch().await;
    scheduler.refetch().await;
    let before = window.read().stats();

    source.set_fail(true);
    assert_eq!(
        scheduler.refetch().await,
        FetchOutcome::Failed(FailureKind::TransientFetchFailure)
    );

    assert_eq!(window.read().stats(), before);
    let state = scheduler.state();
    assert!(state.connection_error.is_none());
    assert_eq!(state.consecutive_failures, 1);
    assert_matches!(
        state.last_error.as_ref().map(|e| e.kind),
        Some(FailureKind::TransientFetchFailure)
    );

    source.set_fail(false);
    scheduler.refetch().await;
    let state = scheduler.state();
    assert!(state.last_error.is_none());
    assert_eq!(state.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out() {
    let (source, window, scheduler) = setup(100);
    source.set_delay(Some(Duration::from_secs(5)));

    assert_eq!(
        scheduler.refetch().await,
        FetchOutcome::Failed(FailureKind::InitialConnectionFailure)
    );
    assert!(window.read().is_empty());
    assert!(scheduler.state().connection_error.is_some());
}

#[tokio::test(start_paused = true)]
async fn overlapping_fetch_is_coalesced() {
    let (source, window, scheduler) = setup(100);
    source.set_delay(Some(Duration::from_millis(300)));

    let (first, second) = tokio::join!(scheduler.refetch(), async {
        sleep(Duration::from_millis(10)).await;
        scheduler.refetch().await
    });

    assert_eq!(first, FetchOutcome::Ingested { accepted: 1 });
    assert_eq!(second, FetchOutcome::Coalesced);
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(indices(&window), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn stop_discards_in_flight_fetch() {
    let (source, window, scheduler) = setup(100);
    source.set_delay(Some(Duration::from_millis(300)));

    let (outcome, _) = tokio::join!(scheduler.refetch(), async {
        sleep(Duration::from_millis(10)).await;
        scheduler.stop();
    });

    assert_eq!(outcome, FetchOutcome::Discarded);
    assert!(window.read().is_empty());
    assert!(scheduler.state().last_successful_fetch_at.is_none());
}

#[tokio::test(start_paused = true)]
async fn reset_clears_then_refetches() {
    let (source, window, scheduler) = setup(100);
    for _ in 0..3 {
        scheduler.refetch().await;
    }
    assert_eq!(window.read().stats().total_pings, 3);

    // 리셋 직후 fetch를 실패시켜 초기화 단계만 관찰
    source.set_fail(true);
    let outcome = scheduler.reset().await.unwrap();
    assert_eq!(outcome, FetchOutcome::Failed(FailureKind::TransientFetchFailure));
    assert_eq!(source.resets.load(Ordering::SeqCst), 1);
    assert_eq!(window.read().len(), 0);
    assert_eq!(window.read().stats().total_pings, 0);

    source.set_fail(false);
    assert_eq!(
        scheduler.refetch().await,
        FetchOutcome::Ingested { accepted: 1 }
    );
    assert_eq!(indices(&window), vec![0]);
    assert_eq!(window.read().stats().total_pings, 1);
}

#[tokio::test(start_paused = true)]
async fn reset_refetch_ingests_only_new_sample() {
    let (_, window, scheduler) = setup(100);
    for _ in 0..4 {
        scheduler.refetch().await;
    }

    let outcome = scheduler.reset().await.unwrap();
    assert_eq!(outcome, FetchOutcome::Ingested { accepted: 1 });
    assert_eq!(indices(&window), vec![0]);
    assert_eq!(window.read().stats().total_pings, 1);
}

#[tokio::test(start_paused = true)]
async fn remote_reset_failure_keeps_local_data() {
    let (source, window, scheduler) = setup(100);
    scheduler.refetch().await;
    scheduler.refetch().await;
    source.reset_fails.store(true, Ordering::SeqCst);

    assert_matches!(scheduler.reset().await, Err(SchedulerError::Reset(_)));
    assert_eq!(indices(&window), vec![0, 1]);
    assert_matches!(
        scheduler.state().last_error.map(|e| e.kind),
        Some(FailureKind::ResetFailure)
    );
}

#[tokio::test(start_paused = true)]
async fn reset_discards_stale_in_flight_timer_fetch() {
    let (source, window, scheduler) = setup(100);
    scheduler.start(every(1000, true)).await.unwrap();
    source.set_delay(Some(Duration::from_millis(400)));

    // 1초 틱의 fetch가 진행 중일 때 리셋
    sleep(Duration::from_millis(1100)).await;
    source.set_delay(None);
    let outcome = scheduler.reset().await.unwrap();

    assert_eq!(outcome, FetchOutcome::Ingested { accepted: 1 });
    assert_eq!(indices(&window), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn dropping_scheduler_stops_timer() {
    let (source, _, scheduler) = setup(100);
    scheduler.start(every(1000, true)).await.unwrap();
    drop(scheduler);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_after_stop() {
    let (_, window, scheduler) = setup(100);
    scheduler.start(every(1000, true)).await.unwrap();
    scheduler.stop();
    assert_eq!(scheduler.status(), PollingStatus::Idle);

    scheduler.start(every(500, true)).await.unwrap();
    assert_eq!(scheduler.status(), PollingStatus::Running);
    assert_eq!(indices(&window), vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn remote_restart_resyncs_window() {
    let (source, window, scheduler) = setup(100);
    for _ in 0..5 {
        scheduler.refetch().await;
    }
    assert_eq!(indices(&window), vec![0, 1, 2, 3, 4]);

    source.restart();
    assert_eq!(
        scheduler.refetch().await,
        FetchOutcome::Ingested { accepted: 1 }
    );
    assert_eq!(indices(&window), vec![0]);
    assert_eq!(window.read().lifetime_total(), 1);

    scheduler.refetch().await;
    assert_eq!(indices(&window), vec![0, 1]);
}
