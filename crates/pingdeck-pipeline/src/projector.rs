//! 차트 프로젝션.
//!
//! 윈도우 샘플을 렌더링 가능한 시계열로 변환하는 순수 함수.
//! 실패 샘플은 선을 끊는 빈 값(gap)으로, 별도 마커 시리즈는 축 중앙에 배치한다.
//! Y축은 고정 스케일 또는 성공 샘플 기반 자동 스케일링.

use pingdeck_core::models::sample::Sample;
use serde::{Deserialize, Serialize};

/// 자동 스케일링 여유 비율 (범위의 10%)
const PAD_RATIO: f64 = 0.1;
/// 최소 여유 폭
const MIN_PAD: f64 = 5.0;
/// 최소/최대가 같을 때 가정하는 범위
const FLAT_SPREAD: f64 = 10.0;

/// 기본 차트 표시 개수
pub const DEFAULT_DISPLAY_CAPACITY: usize = 100;

/// 성공 샘플이 없을 때의 RTT 축
pub const DEFAULT_RTT_DOMAIN: AxisDomain = AxisDomain::new(0.0, 100.0);

/// TTL 고정 축 (일반적으로 1-128)
pub const TTL_DOMAIN: AxisDomain = AxisDomain::new(0.0, 128.0);

/// Y축 범위
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisDomain {
    pub min: f64,
    pub max: f64,
}

impl AxisDomain {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// 세로 중앙값 (실패 마커 위치)
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// 축 범위 결정 방식
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DomainPolicy {
    /// 도메인 의미상 알려진 고정 범위
    Static(AxisDomain),
    /// 성공 샘플에서 매번 다시 계산, 성공 샘플이 없으면 `fallback`
    Dynamic { fallback: AxisDomain },
}

impl DomainPolicy {
    /// 성공 샘플 값으로 범위 결정
    pub fn resolve(&self, values: &[f64]) -> AxisDomain {
        match self {
            DomainPolicy::Static(domain) => *domain,
            DomainPolicy::Dynamic { fallback } => dynamic_domain(values).unwrap_or(*fallback),
        }
    }
}

/// 자동 스케일링 범위
///
/// `pad = max(0.1·(max−min), 5)`, 결과는 `[floor(max(0, min−pad)), ceil(max+pad)]`.
/// 값이 없으면 None.
pub fn dynamic_domain(values: &[f64]) -> Option<AxisDomain> {
    let (min, max) = values.iter().fold(None, |acc: Option<(f64, f64)>, &v| {
        Some(match acc {
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
            None => (v, v),
        })
    })?;

    let range = if max > min { max - min } else { FLAT_SPREAD };
    let pad = (range * PAD_RATIO).max(MIN_PAD);
    Some(AxisDomain::new(
        (min - pad).max(0.0).floor(),
        (max + pad).ceil(),
    ))
}

/// 추적 지표
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// 왕복 시간 (ms)
    RoundTripTime,
    /// TTL (hops)
    Ttl,
}

impl Metric {
    fn value(&self, sample: &Sample) -> Option<f64> {
        match self {
            Metric::RoundTripTime => sample.rtt_ms(),
            Metric::Ttl => sample.ttl().map(f64::from),
        }
    }
}

/// 주 시리즈 포인트 (None = 선을 끊는 gap)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub index: u64,
    pub value: Option<f64>,
}

/// 실패 마커 포인트
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerPoint {
    pub index: u64,
    pub value: f64,
}

/// 단일 지표 차트 데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: Metric,
    pub points: Vec<SeriesPoint>,
    /// 실패 샘플 마커 (축 계산에 참여하지 않음)
    pub failed_markers: Vec<MarkerPoint>,
    pub domain: AxisDomain,
}

/// 프로젝션 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub round_trip_time: MetricSeries,
    pub ttl: MetricSeries,
    /// 표시 구간의 첫/마지막 순번 (고정 X축용)
    pub x_range: (u64, u64),
    /// 빈 입력에 대한 자리표시 포인트 여부
    pub placeholder: bool,
}

/// 차트 프로젝터
#[derive(Debug, Clone)]
pub struct ChartProjector {
    display_capacity: usize,
    rtt_policy: DomainPolicy,
    ttl_policy: DomainPolicy,
}

impl Default for ChartProjector {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_CAPACITY)
    }
}

impl ChartProjector {
    /// RTT 자동 스케일링, TTL 고정 축으로 생성
    pub fn new(display_capacity: usize) -> Self {
        Self {
            display_capacity: display_capacity.max(1),
            rtt_policy: DomainPolicy::Dynamic {
                fallback: DEFAULT_RTT_DOMAIN,
            },
            ttl_policy: DomainPolicy::Static(TTL_DOMAIN),
        }
    }

    /// 지표별 축 정책 설정
    pub fn with_policy(mut self, metric: Metric, policy: DomainPolicy) -> Self {
        match metric {
            Metric::RoundTripTime => self.rtt_policy = policy,
            Metric::Ttl => self.ttl_policy = policy,
        }
        self
    }

    pub fn display_capacity(&self) -> usize {
        self.display_capacity
    }

    /// 샘플을 차트 시리즈로 변환 (최근 `display_capacity`개, 순서 유지)
    pub fn project<'a, I>(&self, samples: I) -> Projection
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let all: Vec<&Sample> = samples.into_iter().collect();
        let start = all.len().saturating_sub(self.display_capacity);
        let slice = &all[start..];

        match (slice.first(), slice.last()) {
            (Some(first), Some(last)) => Projection {
                round_trip_time: series(Metric::RoundTripTime, &self.rtt_policy, slice),
                ttl: series(Metric::Ttl, &self.ttl_policy, slice),
                x_range: (first.sequence_index, last.sequence_index),
                placeholder: false,
            },
            _ => Projection {
                round_trip_time: placeholder(Metric::RoundTripTime, &self.rtt_policy),
                ttl: placeholder(Metric::Ttl, &self.ttl_policy),
                x_range: (0, 0),
                placeholder: true,
            },
        }
    }
}

/// 기본 프로젝터로 변환
pub fn project<'a, I>(samples: I, display_capacity: usize) -> Projection
where
    I: IntoIterator<Item = &'a Sample>,
{
    ChartProjector::new(display_capacity).project(samples)
}

fn series(metric: Metric, policy: &DomainPolicy, slice: &[&Sample]) -> MetricSeries {
    let points: Vec<SeriesPoint> = slice
        .iter()
        .map(|s| SeriesPoint {
            index: s.sequence_index,
            value: metric.value(s),
        })
        .collect();

    // 축은 성공 값만으로 결정
    let values: Vec<f64> = points.iter().filter_map(|p| p.value).collect();
    let domain = policy.resolve(&values);
    let mid = domain.midpoint();

    let failed_markers = points
        .iter()
        .filter(|p| p.value.is_none())
        .map(|p| MarkerPoint {
            index: p.index,
            value: mid,
        })
        .collect();

    MetricSeries {
        metric,
        points,
        failed_markers,
        domain,
    }
}

fn placeholder(metric: Metric, policy: &DomainPolicy) -> MetricSeries {
    MetricSeries {
        metric,
        points: vec![SeriesPoint {
            index: 0,
            value: None,
        }],
        failed_markers: Vec::new(),
        domain: policy.resolve(&[]),
    }
}
