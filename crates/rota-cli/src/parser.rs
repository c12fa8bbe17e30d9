use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_english::{parse_date_string, Dialect};
use rota_core::dates::DateOrder;

/// Parses a user-entered instant: RFC 3339 first, then English expressions
/// such as "tomorrow", "next friday" or "2025-09-12".
pub fn parse_when(input: &str, reference: DateTime<Utc>, order: DateOrder) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(input.trim()) {
        return Ok(instant.with_timezone(&Utc));
    }
    let dialect = match order {
        DateOrder::Dmy => Dialect::Uk,
        DateOrder::Mdy => Dialect::Us,
    };
    parse_date_string(input, reference, dialect)
        .map_err(|e| anyhow::anyhow!("Failed to parse date '{}': {}", input, e))
}
