//! 라이프사이클 관리.
//!
//! 종료 신호 전파와 OS 시그널 대기.

use std::future::Future;
use tokio::sync::watch;
use tracing::{info, warn};

/// 라이프사이클 관리자
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { shutdown_tx }
    }

    /// 종료 수신기
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// 종료 신호 발송
    pub fn shutdown(&self) {
        info!("종료 신호 발송");
        self.shutdown_tx.send_replace(true);
    }

    /// 종료 신호가 오면 `fut`를 버리고 `None` 반환
    ///
    /// 이미 종료 중이면 `fut`를 폴링하지 않는다.
    pub async fn until_shutdown<F: Future>(&self, fut: F) -> Option<F::Output> {
        let mut shutdown_rx = self.subscribe();
        tokio::select! {
            biased;
            _ = shutdown_rx.wait_for(|stop| *stop) => None,
            out = fut => Some(out),
        }
    }

    /// OS 시그널 대기 (SIGINT, SIGTERM) 후 종료 신호 발송
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match (
                signal(SignalKind::interrupt()),
                signal(SignalKind::terminate()),
            ) {
                (Ok(mut sigint), Ok(mut sigterm)) => {
                    tokio::select! {
                        _ = sigint.recv() => info!("SIGINT 수신"),
                        _ = sigterm.recv() => info!("SIGTERM 수신"),
                    }
                }
                _ => {
                    warn!("시그널 핸들러 등록 실패, Ctrl+C만 대기");
                    wait_ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        wait_ctrl_c().await;

        self.shutdown();
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C 수신"),
        Err(e) => {
            warn!("Ctrl+C 핸들러 등록 실패: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn lifecycle_creation() {
        let lm = LifecycleManager::new();
        let rx = lm.subscribe();
        assert!(!*rx.borrow());
    }

    #[test]
    fn shutdown_signal() {
        let lm = LifecycleManager::new();
        let rx = lm.subscribe();
        lm.shutdown();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn completed_command_returns_output() {
        let lm = LifecycleManager::new();
        assert_eq!(lm.until_shutdown(async { 7 }).await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_hung_command() {
        let lm = Arc::new(LifecycleManager::new());
        let trigger = Arc::clone(&lm);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.shutdown();
        });

        let out = lm.until_shutdown(std::future::pending::<()>()).await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn already_shut_down_skips_command() {
        let lm = LifecycleManager::new();
        lm.shutdown();
        assert_eq!(lm.until_shutdown(async { 7 }).await, None);
    }
}
