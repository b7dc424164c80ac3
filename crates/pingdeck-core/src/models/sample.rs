//! 텔레메트리 샘플 모델.
//!
//! 핑 한 번의 관측 결과. 실패 여부는 RTT 부재로 정의되며,
//! TTL은 RTT와 함께만 존재한다 (enum으로 강제).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 프로브 결과
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// 응답 수신
    Success {
        /// 왕복 시간 (밀리초, 0 이상)
        rtt_ms: f64,
        /// 응답 패킷 TTL
        ttl: u32,
    },
    /// 응답 없음 (타임아웃, 도달 불가)
    Failed,
}

/// 단일 텔레메트리 관측값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// 세션 내 단조 증가 순번
    pub sequence_index: u64,
    /// 프로브 결과
    pub outcome: ProbeOutcome,
    /// 관측 시각
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// 성공 샘플 생성
    pub fn success(sequence_index: u64, rtt_ms: f64, ttl: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            sequence_index,
            outcome: ProbeOutcome::Success { rtt_ms, ttl },
            timestamp,
        }
    }

    /// 실패 샘플 생성
    pub fn failed(sequence_index: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            sequence_index,
            outcome: ProbeOutcome::Failed,
            timestamp,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Failed)
    }

    /// 왕복 시간 (실패 시 None)
    pub fn rtt_ms(&self) -> Option<f64> {
        match self.outcome {
            ProbeOutcome::Success { rtt_ms, .. } => Some(rtt_ms),
            ProbeOutcome::Failed => None,
        }
    }

    /// TTL (실패 시 None)
    pub fn ttl(&self) -> Option<u32> {
        match self.outcome {
            ProbeOutcome::Success { ttl, .. } => Some(ttl),
            ProbeOutcome::Failed => None,
        }
    }
}
