//! HTTP 샘플 소스 클라이언트.
//!
//! `SampleSource` 포트 구현. 상태 코드별 에러 매핑 + 설정 조회 재시도.
//! 폴링 fetch는 재시도 없이 다음 주기에 맡기고, 리셋은 사용자 명령이라 재시도하지 않는다.
//! 재시도는 시작 시 한 번뿐인 `/api/config` 조회에만 적용된다.

use async_trait::async_trait;
use pingdeck_core::error::CoreError;
use pingdeck_core::models::contract::{RemoteConfig, ResetResponse, TelemetrySnapshot};
use pingdeck_core::ports::sample_source::SampleSource;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// 설정 조회 기본 재시도 횟수
const DEFAULT_CONFIG_RETRIES: u32 = 0;

/// 재시도 가능한 에러인지 판별
fn is_retryable(error: &CoreError) -> bool {
    matches!(
        error,
        CoreError::Network(_)
            | CoreError::Timeout { .. }
            | CoreError::ServiceUnavailable(_)
            | CoreError::RateLimit { .. }
    )
}

/// REST 샘플 소스 클라이언트: `SampleSource` 포트 구현
pub struct HttpSampleSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    config_retries: u32,
}

impl HttpSampleSource {
    /// 새 HTTP 샘플 소스 생성
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            config_retries: DEFAULT_CONFIG_RETRIES,
        })
    }

    /// `/api/config` 재시도 횟수 설정
    pub fn with_config_retries(mut self, retries: u32) -> Self {
        self.config_retries = retries;
        self
    }

    /// 서버 기본 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 전송 계층 에러 매핑
    fn map_send_error(&self, path: &str, e: reqwest::Error) -> CoreError {
        if e.is_timeout() {
            CoreError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_decode() {
            CoreError::MalformedPayload(format!("{path} 응답 파싱 실패: {e}"))
        } else {
            CoreError::Network(format!("{path} 요청 실패: {e}"))
        }
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(
        &self,
        path: &str,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp);
        }

        let status_code = status.as_u16();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status_code {
            404 => Err(CoreError::NotFound {
                resource: path.to_string(),
            }),
            429 => Err(CoreError::RateLimit {
                // Retry-After 헤더가 없으면 다음 주기에 맡김
                retry_after_secs: retry_after.unwrap_or(1),
            }),
            503 => Err(CoreError::ServiceUnavailable(text)),
            _ => Err(CoreError::Http {
                status: status_code,
                body: text,
            }),
        }
    }

    /// 요청 1회 실행 후 JSON 본문 디코딩
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<T, CoreError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .request(method, &url)
            .send()
            .await
            .map_err(|e| self.map_send_error(path, e))?;

        let resp = self.check_response(path, resp).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| self.map_send_error(path, e))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::MalformedPayload(format!("{path} 응답 파싱 실패: {e}")))
    }

    /// 재시도가 포함된 요청 실행
    ///
    /// exponential backoff: 1s → 2s → 4s
    async fn execute_with_retry<F, Fut, T>(
        &self,
        max_retries: u32,
        operation: F,
    ) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut delay = Duration::from_secs(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !is_retryable(&e) || attempt >= max_retries {
                        return Err(e);
                    }

                    warn!(
                        "요청 실패 (시도 {}/{}): {e}, {delay:?} 후 재시도",
                        attempt + 1,
                        max_retries + 1
                    );

                    // RateLimit의 경우 서버 지정 대기 시간 사용
                    if let CoreError::RateLimit { retry_after_secs } = &e {
                        delay = Duration::from_secs(*retry_after_secs);
                    }

                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(30));
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl SampleSource for HttpSampleSource {
    async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot, CoreError> {
        let snapshot: TelemetrySnapshot = self
            .request_json(reqwest::Method::GET, "/api/data")
            .await?;
        debug!("스냅샷 수신: {}개 포인트", snapshot.chart_data.len());
        Ok(snapshot)
    }

    async fn fetch_config(&self) -> Result<RemoteConfig, CoreError> {
        let config: RemoteConfig = self
            .execute_with_retry(self.config_retries, || {
                self.request_json(reqwest::Method::GET, "/api/config")
            })
            .await?;
        debug!(
            "세션 설정 수신: target={}, max_points={}",
            config.target, config.max_points
        );
        Ok(config)
    }

    async fn reset(&self) -> Result<ResetResponse, CoreError> {
        // 리셋은 사용자 명령이므로 재시도하지 않는다
        let resp: ResetResponse = self
            .request_json(reqwest::Method::POST, "/api/reset")
            .await?;
        debug!("원격 리셋 응답: {}", resp.message);
        Ok(resp)
    }
}
