//! CLI 명령어 구현 모듈.

pub mod conditions;
pub mod output;
pub mod session;
pub mod show;
pub mod watch;
