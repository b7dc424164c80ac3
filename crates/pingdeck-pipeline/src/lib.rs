//! # pingdeck-pipeline
//!
//! 텔레메트리 파이프라인.
//! 샘플 소스를 주기적으로 폴링해 슬라이딩 윈도우에 수용하고,
//! 파생 통계와 차트 프로젝션을 계산해 표시 계층에 넘긴다.
//!
//! 흐름: [`scheduler`] → 샘플 소스 → [`window`] → [`projector`] → 표시 계층.
//! [`dashboard`]가 이 구성요소들을 하나로 묶는다.

pub mod dashboard;
pub mod error;
pub mod projector;
pub mod scheduler;
pub mod stats;
pub mod window;
