//! Date parsing and formatting.
//!
//! Source documents print dates day-first (`01/02/2024`, `1.2.24`,
//! `01-Feb-24`). Output tables want a long display form and a `YYYY MM`
//! month bucket for the "For The Month Of" column.

use crate::error::ExtractError;
use chrono::NaiveDate;

/// Parse a day-first date in any of the layouts seen on invoices.
pub fn parse_dmy(raw: &str) -> Result<NaiveDate, ExtractError> {
    let cleaned = raw.trim().replace('.', "/").replace('-', "/");
    let parts: Vec<&str> = cleaned.split('/').collect();
    if parts.len() == 3 {
        // 01/Feb/24 style survives the separator rewrite
        if parts[1].chars().any(|c| c.is_ascii_alphabetic()) {
            let joined = format!("{}-{}-{}", parts[0], parts[1], parts[2]);
            let fmt = if parts[2].len() == 2 { "%d-%b-%y" } else { "%d-%b-%Y" };
            if let Ok(date) = NaiveDate::parse_from_str(&joined, fmt) {
                return Ok(date);
            }
        } else {
            let fmt = if parts[2].len() == 2 { "%d/%m/%y" } else { "%d/%m/%Y" };
            if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
                return Ok(date);
            }
        }
    }

    Err(ExtractError::Parse {
        field: "date",
        value: raw.to_string(),
    })
}

/// Month bucket (`2024 02`) for the "For The Month Of" column.
pub fn month_bucket(date: NaiveDate) -> String {
    date.format("%Y %m").to_string()
}

/// Long display form (`01 Feb 2024`).
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

/// Short display form (`01-Feb-24`) used by PANU and ISLAND tables.
pub fn short_date(date: NaiveDate) -> String {
    date.format("%d-%b-%y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_dmy_slash_full_year() {
        let d = parse_dmy("01/02/2024").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_parse_dmy_dots_short_year() {
        let d = parse_dmy("1.2.24").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_parse_dmy_month_name() {
        let d = parse_dmy("01-Feb-24").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_parse_dmy_rejects_garbage() {
        assert!(parse_dmy("tomorrow").is_err());
        assert!(parse_dmy("32/13/2024").is_err());
    }

    #[test]
    fn test_formatting() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(month_bucket(d), "2024 02");
        assert_eq!(display_date(d), "01 Feb 2024");
        assert_eq!(short_date(d), "01-Feb-24");
    }
}
