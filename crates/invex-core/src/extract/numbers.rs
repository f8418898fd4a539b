//! Numeric value parsing for captured tokens.

use crate::error::ExtractError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a money/quantity token, tolerating thousands separators and a
/// leading currency marker (`$1,234.56`, `1 234.56`).
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, ExtractError> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| !matches!(c, ',' | ' '))
        .collect();

    Decimal::from_str(&cleaned).map_err(|_| ExtractError::Parse {
        field,
        value: raw.to_string(),
    })
}

/// Parse a token that may carry an OCR-misread letter `O` for zero.
pub fn parse_decimal_lenient(field: &'static str, raw: &str) -> Result<Decimal, ExtractError> {
    let normalized: String = raw
        .chars()
        .map(|c| if c == 'O' || c == 'o' { '0' } else { c })
        .collect();
    parse_decimal(field, &normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_decimal_plain() {
        assert_eq!(parse_decimal("qty", "10.0").unwrap(), dec!(10.0));
    }

    #[test]
    fn test_parse_decimal_thousands() {
        assert_eq!(parse_decimal("amount", "1,234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal("amount", "$2,500.00").unwrap(), dec!(2500.00));
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        let err = parse_decimal("qty", "abc").unwrap_err();
        assert!(matches!(err, ExtractError::Parse { field: "qty", .. }));
    }

    #[test]
    fn test_parse_decimal_lenient_ocr_zero() {
        assert_eq!(parse_decimal_lenient("qty", "1O.5").unwrap(), dec!(10.5));
    }

    #[test]
    fn test_parse_decimal_lenient_passthrough() {
        assert_eq!(parse_decimal_lenient("qty", "10.5").unwrap(), dec!(10.5));
    }
}
