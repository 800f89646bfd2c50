//! Identifier shapes: customer codes, PDR, partita IVA.

use crate::error::FieldParseError;

/// Normalize an alphanumeric code: strip inner whitespace, uppercase, and
/// require at least one digit.
pub fn normalize_code(s: &str) -> Result<String, FieldParseError> {
    let code: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    let well_formed = !code.is_empty()
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '/' || c == '-')
        && code.chars().any(|c| c.is_ascii_digit());

    if well_formed {
        Ok(code)
    } else {
        Err(FieldParseError::Shape(s.to_string()))
    }
}

/// Validate an Italian partita IVA (11 digits, Luhn-style check digit).
pub fn validate_partita_iva(piva: &str) -> bool {
    let digits: Vec<u32> = piva.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != 11 || piva.chars().filter(|c| c.is_ascii_digit()).count() != 11 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .take(10)
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    (10 - sum % 10) % 10 == digits[10]
}

/// Accept a partita IVA only when its check digit is valid.
pub fn checked_partita_iva(s: &str) -> Result<String, FieldParseError> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if validate_partita_iva(&digits) {
        Ok(digits)
    } else {
        Err(FieldParseError::Shape(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_partita_iva() {
        assert!(validate_partita_iva("00743110157"));
        assert!(validate_partita_iva("06655971007"));
        assert!(!validate_partita_iva("12345678901"));
        assert!(!validate_partita_iva("0074311015"));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("cl987654321").unwrap(), "CL987654321");
        assert_eq!(normalize_code("G 4").unwrap(), "G4");
        assert!(normalize_code("ABCDEF").is_err());
        assert!(normalize_code("AB_12").is_err());
    }

    #[test]
    fn test_checked_partita_iva() {
        assert_eq!(checked_partita_iva("00743110157").unwrap(), "00743110157");
        assert!(checked_partita_iva("12345678901").is_err());
    }
}
