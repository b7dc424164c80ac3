//! # pingdeck-network
//!
//! 샘플 소스 네트워크 어댑터.
//! 원격 프로브 서비스의 REST API(`/api/data`, `/api/config`, `/api/reset`)와
//! 통신하며 HTTP 상태 코드를 `CoreError`로 세분화한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use pingdeck_network::http_client::HttpSampleSource;
//! use std::time::Duration;
//!
//! let source = HttpSampleSource::new("http://localhost:5000", Duration::from_secs(30))?;
//! ```

pub mod http_client;
