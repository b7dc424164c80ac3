//! 콘솔 표시 계층.
//!
//! 대시보드 스냅샷을 텍스트로 그리고, 한 글자 명령을 해석한다.

use chrono::{DateTime, Local, Utc};
use pingdeck_pipeline::dashboard::{Banner, DashboardView};
use pingdeck_pipeline::projector::MetricSeries;
use std::fmt::Write;

/// 스파크라인 단계 문자 (낮음 → 높음)
const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
/// 실패 샘플 표시
const FAILED_MARK: char = '×';
/// 스파크라인 최대 폭
const SPARK_WIDTH: usize = 60;

/// 사용자 명령
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 일시정지 ↔ 재개
    TogglePause,
    /// 즉시 새로고침
    Refresh,
    /// 원격 + 로컬 통계 초기화
    Reset,
    /// 원격 설정 재조회
    ReloadConfig,
    Quit,
}

impl Command {
    /// 입력 한 줄 해석 (대소문자 무시)
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" | "resume" => Some(Command::TogglePause),
            "r" | "refresh" => Some(Command::Refresh),
            "x" | "reset" => Some(Command::Reset),
            "c" | "config" => Some(Command::ReloadConfig),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// 명령 도움말
pub fn help() -> &'static str {
    "명령: [p] 일시정지/재개  [r] 새로고침  [x] 리셋  [c] 설정 재조회  [q] 종료"
}

/// 스냅샷 렌더링
pub fn render(view: &DashboardView) -> String {
    let mut out = String::new();
    let session = &view.session;
    let stats = &view.stats;

    let _ = writeln!(
        out,
        "── pingdeck ── 대상 {} │ {} │ 주기 {}ms │ 윈도우 {}/{}",
        session.target,
        view.polling.status,
        view.polling.interval.as_millis(),
        stats.retained,
        session.max_points,
    );

    match &view.banner {
        Some(Banner::ConnectionError(failure)) => {
            let _ = writeln!(
                out,
                "!! 서버에 연결할 수 없습니다: {} ([r]로 재시도)",
                failure.message
            );
        }
        Some(Banner::ResetFailed(failure)) => {
            let _ = writeln!(out, "!! 리셋 실패: {}", failure.message);
        }
        None => {}
    }
    if let Some(failure) = &view.config_error {
        let _ = writeln!(out, "   (원격 설정 없음, 기본값 사용: {})", failure.message);
    }

    let _ = writeln!(
        out,
        "   실패율 {:.1}% │ 평균 {} │ 최소 {} │ 최대 {} │ 평균 장애 {} │ 총 {}회",
        stats.failure_rate,
        ms(stats.avg_ping_time),
        ms(stats.min_ping_time),
        ms(stats.max_ping_time),
        stats
            .avg_outage_duration
            .map(|d| format!("{d:.1}회"))
            .unwrap_or_else(|| "-".to_string()),
        stats.total_pings,
    );

    if view.projection.placeholder {
        let _ = writeln!(out, "   (데이터 대기 중)");
    } else {
        let (first, last) = view.projection.x_range;
        let _ = writeln!(out, "   RTT {}  #{first}..#{last}", spark(&view.projection.round_trip_time));
        let _ = writeln!(out, "   TTL {}", spark(&view.projection.ttl));
    }

    let _ = write!(
        out,
        "   마지막 성공: {}",
        view.polling
            .last_successful_fetch_at
            .map(local_time)
            .unwrap_or_else(|| "-".to_string())
    );
    out
}

fn ms(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}ms"))
        .unwrap_or_else(|| "-".to_string())
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// 축 범위 기준 스파크라인 (최근 `SPARK_WIDTH`개)
fn spark(series: &MetricSeries) -> String {
    let span = (series.domain.max - series.domain.min).max(f64::EPSILON);
    let start = series.points.len().saturating_sub(SPARK_WIDTH);

    series.points[start..]
        .iter()
        .map(|point| match point.value {
            Some(v) => {
                let ratio = ((v - series.domain.min) / span).clamp(0.0, 1.0);
                let level = (ratio * (LEVELS.len() - 1) as f64).round() as usize;
                LEVELS[level.min(LEVELS.len() - 1)]
            }
            None => FAILED_MARK,
        })
        .collect()
}
