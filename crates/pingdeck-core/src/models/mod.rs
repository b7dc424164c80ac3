//! pingdeck 도메인 모델.
//!
//! 샘플, 세션 설정, 샘플 소스와의 HTTP 계약 타입을 정의한다.

pub mod contract;
pub mod sample;
pub mod session;
