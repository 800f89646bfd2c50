//! Italian number and amount parsing.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::FieldParseError;

/// Parse an Italian-formatted number (e.g., "1.234,56", "99,62" or "1234.56").
///
/// A comma is always the decimal separator when present. A lone dot is read
/// as a thousands separator only when every group after it has three digits.
pub fn parse_italian_decimal(s: &str) -> Result<Decimal, FieldParseError> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };

    if digits.is_empty() || digits.contains('-') || !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(FieldParseError::Number(s.to_string()));
    }

    let normalized = match (digits.rfind(','), digits.rfind('.')) {
        (Some(c), Some(d)) if c > d => digits.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => digits.replace(',', ""),
        (Some(_), None) => digits.replace(',', "."),
        (None, Some(_)) if is_thousands_grouping(digits) => digits.replace('.', ""),
        _ => digits.to_string(),
    };

    let value = Decimal::from_str(&normalized).map_err(|_| FieldParseError::Number(s.to_string()))?;
    Ok(if negative { -value } else { value })
}

fn is_thousands_grouping(s: &str) -> bool {
    let mut groups = s.split('.');
    let head_ok = groups.next().is_some_and(|g| (1..=3).contains(&g.len()));
    head_ok && groups.all(|g| g.len() == 3)
}
