//! # pingdeck-app
//!
//! pingdeck 콘솔 대시보드 진입점.
//! 설정 로드, HTTP 샘플 소스와 대시보드 조립, 명령 루프.

mod console;
mod lifecycle;
mod settings;

use anyhow::{anyhow, Result};
use clap::Parser;
use pingdeck_core::config::AppConfig;
use pingdeck_network::http_client::HttpSampleSource;
use pingdeck_pipeline::dashboard::{Dashboard, DashboardSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::console::Command;
use crate::lifecycle::LifecycleManager;

/// pingdeck: ping 텔레메트리 콘솔 대시보드
#[derive(Parser, Debug)]
#[command(name = "pingdeck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 샘플 소스 서버 URL (예: http://localhost:5000)
    #[arg(long, short = 's')]
    server: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 원격 설정이 없을 때의 폴링 주기 (밀리초)
    #[arg(long)]
    poll_interval: Option<u64>,

    /// 차트 표시 개수
    #[arg(long)]
    display_capacity: Option<usize>,

    /// 시작 시 즉시 조회하지 않음
    #[arg(long)]
    no_immediate: bool,

    /// 화면 갱신 주기 (밀리초)
    #[arg(long, default_value = "1000")]
    render_interval: u64,
}

impl Args {
    /// CLI 인자로 설정 오버라이드
    fn apply(&self, config: &mut AppConfig) {
        if let Some(ref server) = self.server {
            config.server.base_url = server.clone();
        }
        if let Some(interval) = self.poll_interval {
            config.polling.interval_ms = interval;
        }
        if let Some(capacity) = self.display_capacity {
            config.display.capacity = capacity;
        }
        if self.no_immediate {
            config.polling.immediate = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "pingdeck={},pingdeck_app={},pingdeck_core={},pingdeck_network={},pingdeck_pipeline={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = settings::load(args.config.as_deref())?;
    args.apply(&mut config);
    config
        .validate()
        .map_err(|e| anyhow!("설정 검증 실패: {e}"))?;

    print_banner(&config);
    info!("pingdeck 시작: 서버 {}", config.server.base_url);

    let source = HttpSampleSource::new(&config.server.base_url, config.request_timeout())?
        .with_config_retries(config.server.config_retries);
    let dashboard = Arc::new(
        Dashboard::bootstrap(Arc::new(source), DashboardSettings::from_app_config(&config)).await,
    );
    dashboard.start().await?;

    let lifecycle = Arc::new(LifecycleManager::new());
    {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.wait_for_signal().await });
    }

    run(
        &dashboard,
        &lifecycle,
        Duration::from_millis(args.render_interval.max(100)),
    )
    .await;

    dashboard.shutdown();
    info!("pingdeck 종료");
    Ok(())
}

/// 명령 루프 (stdin 명령 + 주기적 화면 갱신)
async fn run(dashboard: &Dashboard, lifecycle: &LifecycleManager, render_every: Duration) {
    let mut shutdown_rx = lifecycle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut render_tick = tokio::time::interval(render_every);
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = render_tick.tick() => {
                println!("{}\n", console::render(&dashboard.view()));
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        let Some(command) = Command::parse(&line) else {
                            if !line.trim().is_empty() {
                                println!("{}", console::help());
                            }
                            continue;
                        };
                        if command == Command::Quit {
                            lifecycle.shutdown();
                            break;
                        }
                        // 진행 중 fetch가 멈춰 있어도 종료 신호는 바로 받는다
                        if lifecycle.until_shutdown(handle(dashboard, command)).await.is_none() {
                            info!("종료 신호 수신, 진행 중 명령 중단");
                            break;
                        }
                        println!("{}\n", console::render(&dashboard.view()));
                    }
                    Ok(None) => {
                        // stdin 종료 (파이프 입력 등) → 시그널로만 종료
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!("입력 읽기 실패: {e}");
                        stdin_open = false;
                    }
                }
            }
        }
    }
}

async fn handle(dashboard: &Dashboard, command: Command) {
    match command {
        Command::TogglePause => match dashboard.toggle_pause().await {
            Ok(status) => println!("상태: {status}"),
            Err(e) => warn!("전환 실패: {e}"),
        },
        Command::Refresh => {
            let outcome = dashboard.refresh().await;
            info!("새로고침: {outcome:?}");
        }
        Command::Reset => match dashboard.reset().await {
            Ok(outcome) => info!("리셋 완료: {outcome:?}"),
            Err(e) => warn!("{e}"),
        },
        Command::ReloadConfig => {
            if let Ok(session) = dashboard.reload_config().await {
                println!(
                    "설정 적용: 대상 {}, 용량 {}, 주기 {}ms",
                    session.target,
                    session.max_points,
                    session.poll_interval.as_millis()
                );
            }
        }
        Command::Quit => {}
    }
}

fn print_banner(config: &AppConfig) {
    println!(
        r#"
  ┌─┐┬┌┐┌┌─┐┌┬┐┌─┐┌─┐┬┌─
  ├─┘│││││ ┬ ││├┤ │  ├┴┐
  ┴  ┴┘└┘└─┘─┴┘└─┘└─┘┴ ┴  v{}
  서버: {}
  {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.server.base_url,
        console::help(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_config() {
        let args = Args::parse_from([
            "pingdeck",
            "--server",
            "http://10.0.0.2:5000",
            "--poll-interval",
            "250",
            "--no-immediate",
        ]);
        let mut config = AppConfig::default_config();
        args.apply(&mut config);

        assert_eq!(config.server.base_url, "http://10.0.0.2:5000");
        assert_eq!(config.polling.interval_ms, 250);
        assert!(!config.polling.immediate);
        assert_eq!(config.display.capacity, 100);
    }

    #[test]
    fn defaults_leave_config_untouched() {
        let args = Args::parse_from(["pingdeck"]);
        let mut config = AppConfig::default_config();
        args.apply(&mut config);
        assert_eq!(config.server.base_url, "http://localhost:5000");
        assert!(config.polling.immediate);
    }
}
