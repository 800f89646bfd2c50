//! Italian date parsing.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FieldParseError;

lazy_static! {
    static ref DATE_DMY: Regex = Regex::new(
        r"^(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})$"
    ).unwrap();

    static ref DATE_YMD: Regex = Regex::new(
        r"^(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})$"
    ).unwrap();

    static ref DATE_ITALIAN_LONG: Regex = Regex::new(
        r"(?i)^(\d{1,2})\s+([a-z]+)\s+(\d{4})$"
    ).unwrap();
}

/// Parse a date written as `DD/MM/YYYY`, `DD-MM-YY`, `YYYY-MM-DD` or
/// `15 maggio 2024`.
pub fn parse_italian_date(s: &str) -> Result<NaiveDate, FieldParseError> {
    let s = s.trim();
    let invalid = || FieldParseError::Date(s.to_string());

    let (year, month, day) = if let Some(caps) = DATE_DMY.captures(s) {
        (parse_year(&caps[3]), caps[2].parse().unwrap_or(0), caps[1].parse().unwrap_or(0))
    } else if let Some(caps) = DATE_YMD.captures(s) {
        (caps[1].parse().unwrap_or(0), caps[2].parse().unwrap_or(0), caps[3].parse().unwrap_or(0))
    } else if let Some(caps) = DATE_ITALIAN_LONG.captures(s) {
        let month = italian_month_to_number(&caps[2]).ok_or_else(invalid)?;
        (caps[3].parse().unwrap_or(0), month, caps[1].parse().unwrap_or(0))
    } else {
        return Err(invalid());
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 { 2000 + year } else { year }
}

fn italian_month_to_number(month: &str) -> Option<u32> {
    let number = match month.to_lowercase().as_str() {
        "gennaio" => 1,
        "febbraio" => 2,
        "marzo" => 3,
        "aprile" => 4,
        "maggio" => 5,
        "giugno" => 6,
        "luglio" => 7,
        "agosto" => 8,
        "settembre" => 9,
        "ottobre" => 10,
        "novembre" => 11,
        "dicembre" => 12,
        _ => return None,
    };
    Some(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_dmy_separators() {
        assert_eq!(parse_italian_date("15/05/2024").unwrap(), ymd(2024, 5, 15));
        assert_eq!(parse_italian_date("15-05-2024").unwrap(), ymd(2024, 5, 15));
        assert_eq!(parse_italian_date("15.05.2024").unwrap(), ymd(2024, 5, 15));
    }

    #[test]
    fn test_two_digit_year() {
        assert_eq!(parse_italian_date("1/3/24").unwrap(), ymd(2024, 3, 1));
    }

    #[test]
    fn test_iso_and_long_form() {
        assert_eq!(parse_italian_date("2024-06-30").unwrap(), ymd(2024, 6, 30));
        assert_eq!(parse_italian_date("30 Giugno 2024").unwrap(), ymd(2024, 6, 30));
    }

    #[test]
    fn test_invalid_dates() {
        assert!(parse_italian_date("31/02/2024").is_err());
        assert!(parse_italian_date("15 brumaio 2024").is_err());
        assert!(parse_italian_date("domani").is_err());
    }
}
