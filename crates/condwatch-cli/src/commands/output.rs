//! 추적 목록 출력 형식.

use anyhow::{Context, Result};
use condwatch_core::{ConditionCatalog, TrackedStock};

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(anyhow::anyhow!("Invalid format: {}. Use: table, json", s)),
        }
    }
}

/// 추적 목록을 지정 형식의 문자열로 만듭니다.
pub fn render_tracked(stocks: &[TrackedStock], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(format_table(stocks)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(stocks).context("Failed to serialize tracked stocks")
        }
    }
}

/// 테이블 형식 출력.
pub fn format_table(stocks: &[TrackedStock]) -> String {
    let mut output = String::new();

    output.push_str(&format!("{:<8} {:<20} {}\n", "CODE", "FIRST_SEEN", "CONDITION"));
    output.push_str(&"-".repeat(48));
    output.push('\n');

    for stock in stocks {
        output.push_str(&format!(
            "{:<8} {:<20} {}\n",
            stock.code.as_str(),
            stock.first_seen_display(),
            stock.condition_name
        ));
    }

    output.push('\n');
    output.push_str(&format!("Total: {} stocks", stocks.len()));
    output
}

/// 조건식 목록 테이블.
pub fn format_catalog(catalog: &ConditionCatalog) -> String {
    let mut output = String::new();

    output.push_str(&format!("{:<6} {}\n", "INDEX", "NAME"));
    output.push_str(&"-".repeat(32));
    output.push('\n');

    for entry in catalog.entries() {
        output.push_str(&format!("{:<6} {}\n", entry.index, entry.name));
    }

    output.push('\n');
    output.push_str(&format!("Total: {} conditions", catalog.len()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use condwatch_core::{parse_timestamp, StockCode};

    fn sample() -> Vec<TrackedStock> {
        vec![
            TrackedStock::new(
                StockCode::parse("005930").unwrap(),
                parse_timestamp("2024-07-15 09:00:01").unwrap(),
                "급등주",
            ),
            TrackedStock::new(
                StockCode::parse("000660").unwrap(),
                parse_timestamp("2024-07-15 09:00:05").unwrap(),
                "급등주",
            ),
        ]
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("TABLE").unwrap(), OutputFormat::Table);
        assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::parse("csv").is_err());
    }

    #[test]
    fn test_format_table() {
        let table = format_table(&sample());
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("CODE"));
        assert!(lines[2].starts_with("005930   2024-07-15 09:00:01"));
        assert!(lines[3].starts_with("000660"));
        assert_eq!(lines.last().copied(), Some("Total: 2 stocks"));
    }

    #[test]
    fn test_render_json_keeps_order() {
        let json = render_tracked(&sample(), OutputFormat::Json).unwrap();
        let parsed: Vec<TrackedStock> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_format_catalog() {
        let catalog = ConditionCatalog::parse("000^급등주;001^신고가;").unwrap();
        let table = format_catalog(&catalog);
        assert!(table.contains("0      급등주"));
        assert!(table.contains("1      신고가"));
        assert!(table.ends_with("Total: 2 conditions"));
    }
}
