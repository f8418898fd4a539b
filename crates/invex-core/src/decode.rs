//! Description decoding: grade / slump / retardant attributes embedded
//! in free-text line-item descriptions, plus the subcon→zone lookup.

use crate::error::ExtractError;
use crate::model::DecodedCode;
use lazy_static::lazy_static;
use regex::Regex;

/// Numeric grade suffix → concrete grade label.
const GRADES: &[(&str, &str)] = &[
    ("10", "C12/10"),
    ("15", "C12/15"),
    ("20", "C16/20"),
    ("25", "C20/25"),
    ("30", "C25/30"),
    ("35", "C28/35"),
    ("40", "C32/40"),
    ("45", "C35/45"),
    ("50", "C40/50"),
    ("55", "C45/55"),
    ("60", "C50/60"),
];

lazy_static! {
    // PANU style: GR 40 SL 160-210MM 4HR RTD
    static ref PANU_GRADE: Regex = Regex::new(r"GR\s*(\d+)").unwrap();
    static ref PANU_SLUMP: Regex =
        Regex::new(r"\b(\d{2,4}\s*-\s*\d{2,4}\s*[Mm][Mm])\b").unwrap();
    static ref PANU_DURATION: Regex = Regex::new(r"\b(\d+\s*HR)\b").unwrap();

    // ISLAND style: G40 160-210 4H RTD
    static ref ISLAND_GRADE: Regex = Regex::new(r"\bG(\d{2})\b").unwrap();
    static ref ISLAND_SLUMP: Regex = Regex::new(r"\b(\d{3}-\d{3})\b").unwrap();
    static ref ISLAND_DURATION: Regex = Regex::new(r"\b(\d{1,2}H)\b").unwrap();

    static ref RTD: Regex = Regex::new(r"\bRTD\b").unwrap();

    // ACS retardation duration, e.g. "4HR" or "4 H"
    static ref ACS_DURATION: Regex = Regex::new(r"\b(\d+\s*[Hh][Rr]?)\b").unwrap();
}

/// Map a grade code to its label through the fixed table. The code may
/// be the full token (`GR 40`, `G40`); only the trailing two digits are
/// significant. Unknown codes are an error: the table is exhaustive for
/// every grade the vendors sell, so a miss means a misread.
pub fn grade_label(code: &str) -> Result<&'static str, ExtractError> {
    let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
    let suffix = if digits.len() >= 2 {
        &digits[digits.len() - 2..]
    } else {
        digits.as_str()
    };
    GRADES
        .iter()
        .find(|(key, _)| *key == suffix)
        .map(|(_, label)| *label)
        .ok_or_else(|| ExtractError::UnknownGrade(code.to_string()))
}

/// Zone code for a subcontractor. Unknown subcons fall through to the
/// subcon code itself.
pub fn zone_for(subcon: &str) -> String {
    match subcon.to_uppercase().as_str() {
        "CSBP" => "A".to_string(),
        "BBR" => "B".to_string(),
        _ => subcon.to_string(),
    }
}

/// Output unit for an aggregate description: surcharge lines are billed
/// per trip, everything else per cubic metre.
pub fn unit_for(description: &str) -> &'static str {
    if description.contains("UNDERLOAD CHARGES") {
        "trip"
    } else {
        "m3"
    }
}

/// ACS descriptions only carry the retardant attributes; grade and
/// slump columns stay empty for this vendor.
pub fn decode_acs(description: &str) -> DecodedCode {
    let rtd = RTD.find(description).map(|m| m.as_str().to_string());
    let mut duration = ACS_DURATION
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace(' ', "").to_uppercase());

    if rtd.is_some() {
        if let Some(d) = duration.as_mut() {
            if !d.ends_with('R') {
                d.push('R');
            }
        }
    }

    DecodedCode {
        grade: None,
        slump: None,
        retardant: rtd,
        duration,
    }
}

/// PANU: `GR 40 SL 160-210MM 4HR RTD`. Grade token present but not in
/// the table is fatal for the file.
pub fn decode_panu(description: &str) -> Result<DecodedCode, ExtractError> {
    let grade = match PANU_GRADE.captures(description) {
        Some(caps) => Some(grade_label(&caps[1])?.to_string()),
        None => None,
    };

    Ok(DecodedCode {
        grade,
        slump: PANU_SLUMP
            .captures(description)
            .map(|c| c[1].replace(' ', "").to_uppercase()),
        retardant: RTD.find(description).map(|m| m.as_str().to_string()),
        duration: PANU_DURATION
            .captures(description)
            .map(|c| c[1].replace(' ', "")),
    })
}

/// ISLAND: `G40 160-210 4H RTD`. Slump gets the `MM` suffix and the
/// duration the `R` suffix the output schema expects.
pub fn decode_island(description: &str) -> Result<DecodedCode, ExtractError> {
    let grade = match ISLAND_GRADE.captures(description) {
        Some(caps) => Some(grade_label(&caps[1])?.to_string()),
        None => None,
    };

    Ok(DecodedCode {
        grade,
        slump: ISLAND_SLUMP
            .captures(description)
            .map(|c| format!("{}MM", c[1].trim())),
        retardant: RTD.find(description).map(|m| m.as_str().to_string()),
        duration: ISLAND_DURATION
            .captures(description)
            .map(|c| format!("{}R", c[1].trim())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_grade_label_table() {
        assert_eq!(grade_label("GR 40").unwrap(), "C32/40");
        assert_eq!(grade_label("G25").unwrap(), "C20/25");
        assert_eq!(grade_label("60").unwrap(), "C50/60");
    }

    #[test]
    fn test_grade_label_unknown_is_fatal() {
        let err = grade_label("GR 99").unwrap_err();
        assert!(matches!(err, ExtractError::UnknownGrade(_)));
    }

    #[test]
    fn test_zone_for() {
        assert_eq!(zone_for("CSBP"), "A");
        assert_eq!(zone_for("bbr"), "B");
        assert_eq!(zone_for("KKL"), "KKL");
    }

    #[test]
    fn test_unit_for() {
        assert_eq!(unit_for("READY MIX - UNDERLOAD CHARGES - 2.5m3"), "trip");
        assert_eq!(unit_for("READY MIX GR 40"), "m3");
    }

    #[test]
    fn test_decode_panu_full() {
        let code = decode_panu("GR 40 SL 160-210MM 4HR RTD").unwrap();
        assert_eq!(code.grade.as_deref(), Some("C32/40"));
        assert_eq!(code.slump.as_deref(), Some("160-210MM"));
        assert_eq!(code.retardant.as_deref(), Some("RTD"));
        assert_eq!(code.duration.as_deref(), Some("4HR"));
    }

    #[test]
    fn test_decode_panu_plain_description() {
        let code = decode_panu("TRANSPORT CHARGES").unwrap();
        assert_eq!(code, DecodedCode::default());
    }

    #[test]
    fn test_decode_island() {
        let code = decode_island("G30 160-210 4H RTD").unwrap();
        assert_eq!(code.grade.as_deref(), Some("C25/30"));
        assert_eq!(code.slump.as_deref(), Some("160-210MM"));
        assert_eq!(code.duration.as_deref(), Some("4HR"));
        assert_eq!(code.retardant.as_deref(), Some("RTD"));
    }

    #[test]
    fn test_decode_acs_appends_r_with_rtd() {
        let code = decode_acs("READY MIX 4H RTD");
        assert_eq!(code.duration.as_deref(), Some("4HR"));
        assert_eq!(code.retardant.as_deref(), Some("RTD"));
        assert_eq!(code.grade, None);
    }
}
