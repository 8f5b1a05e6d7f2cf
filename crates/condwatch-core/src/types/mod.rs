//! 공통 기본 타입.

mod code;
mod screen;

pub use code::StockCode;
pub use screen::ScreenId;
