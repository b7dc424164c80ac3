//! 슬라이딩 윈도우 버퍼.
//!
//! 최근 `max_points`개의 샘플을 도착 순서대로 보관한다 (FIFO, 최대 크기 제한).
//! 순번은 엄격히 증가해야 하며, 통계는 항상 현재 내용에서 다시 계산한다.

use parking_lot::RwLock;
use pingdeck_core::models::sample::Sample;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::WindowError;
use crate::stats::DerivedStats;

/// 샘플 슬라이딩 윈도우
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
    /// 제거와 무관한 누적 수용 샘플 수 (reset으로만 0)
    lifetime_total: u64,
    /// 마지막으로 수용한 순번
    last_index: Option<u64>,
}

impl SlidingWindow {
    /// 새 윈도우 생성 (용량 0은 1로 보정)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            lifetime_total: 0,
            last_index: None,
        }
    }

    /// 샘플 추가
    ///
    /// 순번이 마지막 수용 순번 이하이면 거부한다. 용량 초과 시 가장 오래된 샘플 제거.
    pub fn push(&mut self, sample: Sample) -> Result<(), WindowError> {
        if let Some(last) = self.last_index {
            if sample.sequence_index <= last {
                let err = WindowError::OutOfOrder {
                    last,
                    got: sample.sequence_index,
                };
                warn!("{err}");
                return Err(err);
            }
        }

        self.last_index = Some(sample.sequence_index);
        self.samples.push_back(sample);
        self.lifetime_total += 1;
        self.evict_overflow();
        Ok(())
    }

    /// 모든 샘플과 누적 카운터 초기화
    pub fn reset(&mut self) {
        self.samples.clear();
        self.lifetime_total = 0;
        self.last_index = None;
        debug!("윈도우 초기화");
    }

    /// 현재 내용 기반 통계
    pub fn stats(&self) -> DerivedStats {
        DerivedStats::compute(&self.samples, self.lifetime_total)
    }

    /// 보관 중인 샘플 (오래된 것부터)
    pub fn samples(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// 가장 최근 샘플
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 누적 수용 샘플 수
    pub fn lifetime_total(&self) -> u64 {
        self.lifetime_total
    }

    /// 마지막으로 수용한 순번 (reset 이후에는 None)
    pub fn last_index(&self) -> Option<u64> {
        self.last_index
    }

    /// 용량 변경 (축소 시 앞에서부터 제거)
    pub fn set_capacity(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        if capacity != self.capacity {
            debug!("윈도우 용량 변경: {} → {}", self.capacity, capacity);
            self.capacity = capacity;
            self.evict_overflow();
        }
    }

    fn evict_overflow(&mut self) {
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }
}

/// 스케줄러와 표시 계층이 공유하는 윈도우
pub type SharedWindow = Arc<RwLock<SlidingWindow>>;

/// 새 공유 윈도우 생성
pub fn new_shared_window(capacity: usize) -> SharedWindow {
    Arc::new(RwLock::new(SlidingWindow::new(capacity)))
}
