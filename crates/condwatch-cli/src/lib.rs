//! 조건검색 감시 CLI.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 조건식 실시간 감시 (`watch`)
//! - 조건식 목록 조회 (`conditions`)
//! - 저장된 세션 파일 조회 (`show`)
//! - 적용 중인 설정 출력 (`config`)

pub mod commands;

pub use commands::*;
