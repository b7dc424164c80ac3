//! 윈도우 파생 통계.
//!
//! 실패율, 성공 샘플 기준 평균/최소/최대 RTT, 평균 장애 지속 길이.
//! 매번 윈도우 내용 전체에서 다시 계산한다 (누적 합 없음 → 부동소수 누적 오차 없음).

use pingdeck_core::models::sample::Sample;
use serde::{Deserialize, Serialize};

/// 장애로 인정하는 최소 연속 실패 수 (1회 실패는 일시적 손실로 취급)
pub const MIN_OUTAGE_RUN: usize = 2;

/// 파생 통계 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    /// 실패율 (%, 보관 샘플 기준, 비어 있으면 0)
    pub failure_rate: f64,
    pub avg_ping_time: Option<f64>,
    pub min_ping_time: Option<f64>,
    pub max_ping_time: Option<f64>,
    /// 길이 2 이상 연속 실패 구간의 평균 길이 (샘플 수)
    pub avg_outage_duration: Option<f64>,
    /// 누적 샘플 수 (윈도우 제거와 무관)
    pub total_pings: u64,
    /// 현재 보관 샘플 수
    pub retained: usize,
    /// 보관 샘플 중 실패 수
    pub failed_pings: usize,
}

impl DerivedStats {
    /// 샘플 시퀀스에서 통계 계산
    pub fn compute<'a, I>(samples: I, total_pings: u64) -> Self
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let mut retained = 0usize;
        let mut failed = 0usize;
        let mut sum = 0.0f64;
        let mut ok_count = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut outages = OutageTracker::default();

        for sample in samples {
            retained += 1;
            outages.observe(sample.is_failed());
            match sample.rtt_ms() {
                Some(rtt) => {
                    ok_count += 1;
                    sum += rtt;
                    min = min.min(rtt);
                    max = max.max(rtt);
                }
                None => failed += 1,
            }
        }

        let runs = outages.finish();
        let (avg_ping_time, min_ping_time, max_ping_time) = if ok_count > 0 {
            (Some(sum / ok_count as f64), Some(min), Some(max))
        } else {
            (None, None, None)
        };

        Self {
            failure_rate: if retained > 0 {
                failed as f64 / retained as f64 * 100.0
            } else {
                0.0
            },
            avg_ping_time,
            min_ping_time,
            max_ping_time,
            avg_outage_duration: mean(&runs),
            total_pings,
            retained,
            failed_pings: failed,
        }
    }
}

/// 장애 구간 길이 목록 (길이 2 이상, 끝나지 않은 마지막 구간 포함)
pub fn outage_runs<'a, I>(samples: I) -> Vec<usize>
where
    I: IntoIterator<Item = &'a Sample>,
{
    let mut tracker = OutageTracker::default();
    for sample in samples {
        tracker.observe(sample.is_failed());
    }
    tracker.finish()
}

#[derive(Default)]
struct OutageTracker {
    current: usize,
    runs: Vec<usize>,
}

impl OutageTracker {
    fn observe(&mut self, failed: bool) {
        if failed {
            self.current += 1;
        } else {
            self.close_run();
        }
    }

    fn close_run(&mut self) {
        if self.current >= MIN_OUTAGE_RUN {
            self.runs.push(self.current);
        }
        self.current = 0;
    }

    fn finish(mut self) -> Vec<usize> {
        self.close_run();
        self.runs
    }
}

fn mean(runs: &[usize]) -> Option<f64> {
    if runs.is_empty() {
        None
    } else {
        Some(runs.iter().sum::<usize>() as f64 / runs.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// `Some(rtt)` = 성공, `None` = 실패
    fn samples(pattern: &[Option<f64>]) -> Vec<Sample> {
        let now = Utc::now();
        pattern
            .iter()
            .enumerate()
            .map(|(i, rtt)| match rtt {
                Some(rtt) => Sample::success(i as u64, *rtt, 117, now),
                None => Sample::failed(i as u64, now),
            })
            .collect()
    }

    const OK: Option<f64> = Some(10.0);
    const FAIL: Option<f64> = None;

    #[test]
    fn single_failure_is_not_an_outage() {
        let s = samples(&[OK, FAIL, OK]);
        assert!(outage_runs(&s).is_empty());
        assert_eq!(DerivedStats::compute(&s, 3).avg_outage_duration, None);
    }

    #[test]
    fn two_failures_make_one_outage() {
        let s = samples(&[OK, FAIL, FAIL, OK]);
        assert_eq!(outage_runs(&s), vec![2]);
        assert_eq!(DerivedStats::compute(&s, 4).avg_outage_duration, Some(2.0));
    }

    #[test]
    fn trailing_run_counts() {
        let s = samples(&[FAIL, FAIL, FAIL]);
        assert_eq!(outage_runs(&s), vec![3]);
        assert_eq!(DerivedStats::compute(&s, 3).avg_outage_duration, Some(3.0));
    }

    #[test]
    fn mixed_runs_average_only_long_ones() {
        // 1(무시), 2, 4 → 평균 3
        let s = samples(&[FAIL, OK, FAIL, FAIL, OK, FAIL, FAIL, FAIL, FAIL, OK]);
        assert_eq!(outage_runs(&s), vec![2, 4]);
        assert_eq!(DerivedStats::compute(&s, 10).avg_outage_duration, Some(3.0));
    }

    #[test]
    fn ping_times_exclude_failures() {
        let s = samples(&[Some(10.0), FAIL, Some(20.0), Some(30.0)]);
        let stats = DerivedStats::compute(&s, 4);
        assert_eq!(stats.avg_ping_time, Some(20.0));
        assert_eq!(stats.min_ping_time, Some(10.0));
        assert_eq!(stats.max_ping_time, Some(30.0));
        assert_eq!(stats.failure_rate, 25.0);
        assert_eq!(stats.failed_pings, 1);
        assert_eq!(stats.retained, 4);
    }

    #[test]
    fn all_failed_has_no_ping_times() {
        let s = samples(&[FAIL, FAIL]);
        let stats = DerivedStats::compute(&s, 2);
        assert_eq!(stats.avg_ping_time, None);
        assert_eq!(stats.min_ping_time, None);
        assert_eq!(stats.max_ping_time, None);
        assert_eq!(stats.failure_rate, 100.0);
    }

    #[test]
    fn empty_window() {
        let stats = DerivedStats::compute(&Vec::<Sample>::new(), 0);
        assert_eq!(stats, DerivedStats::default());
    }

    #[test]
    fn total_pings_is_passed_through() {
        let s = samples(&[OK, OK]);
        assert_eq!(DerivedStats::compute(&s, 1_000).total_pings, 1_000);
    }
}
