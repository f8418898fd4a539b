//! Field extraction primitives shared by all vendor profiles.
//!
//! Each profile scans acquired text lines with its own regexes; the
//! machinery here covers the two behaviors every profile shares: header
//! fields captured at most once per document, and line-item rows parsed
//! by a primary pattern with a split fallback for wrapped lines.

pub mod dates;
pub mod numbers;
pub mod underload;

use crate::error::ExtractError;
use crate::model::LineItemEntry;
use regex::Regex;
use rust_decimal::Decimal;

/// A header field captured once per document. Later matches on a
/// filled slot are ignored; continuation pages repeat the header.
#[derive(Debug, Default)]
pub struct HeaderSlot {
    value: Option<String>,
}

impl HeaderSlot {
    /// Apply a pattern to one line; capture group 1 fills the slot if
    /// it is still empty.
    pub fn scan(&mut self, pattern: &Regex, line: &str) {
        if self.value.is_some() {
            return;
        }
        if let Some(caps) = pattern.captures(line) {
            if let Some(m) = caps.get(1) {
                self.value = Some(m.as_str().trim().to_string());
            }
        }
    }

    /// Fill directly, keeping first-match-wins semantics.
    pub fn fill(&mut self, value: impl Into<String>) {
        if self.value.is_none() {
            self.value = Some(value.into());
        }
    }

    pub fn is_filled(&self) -> bool {
        self.value.is_some()
    }

    pub fn take(self) -> Option<String> {
        self.value
    }
}

/// Captured line-item fields before numeric parsing and date
/// formatting. All fields are raw match text.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub date: String,
    pub do_number: String,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
    pub amount: Option<String>,
}

/// Line-item row grammar: a primary single-line pattern plus an
/// optional two-part fallback for rows the renderer wrapped across two
/// physical lines.
///
/// All patterns use named groups `date`, `do_no`, `desc`, `qty`,
/// `price` and optionally `amount`.
pub struct LineGrammar {
    primary: Regex,
    fallback_head: Option<Regex>,
    fallback_tail: Option<Regex>,
}

impl LineGrammar {
    pub fn new(primary: Regex) -> Self {
        Self {
            primary,
            fallback_head: None,
            fallback_tail: None,
        }
    }

    /// Add a two-part fallback: `head` matches the line carrying the
    /// date and DO number, `tail` the following line carrying the
    /// numeric fields.
    pub fn with_fallback(mut self, head: Regex, tail: Regex) -> Self {
        self.fallback_head = Some(head);
        self.fallback_tail = Some(tail);
        self
    }

    /// Match one line against the primary pattern.
    pub fn match_line(&self, line: &str) -> Option<RawRow> {
        self.primary.captures(line).map(|caps| RawRow {
            date: named(&caps, "date"),
            do_number: named(&caps, "do_no"),
            description: named(&caps, "desc"),
            quantity: named(&caps, "qty"),
            unit_price: named(&caps, "price"),
            amount: caps.name("amount").map(|m| m.as_str().to_string()),
        })
    }

    /// Match a wrapped row split across two adjacent lines. The head
    /// supplies date/DO/description, the tail the numeric fields (and
    /// possibly a description remainder).
    pub fn match_split(&self, head_line: &str, tail_line: &str) -> Option<RawRow> {
        let head = self.fallback_head.as_ref()?.captures(head_line)?;
        let tail = self.fallback_tail.as_ref()?.captures(tail_line)?;

        let mut description = named(&head, "desc");
        let tail_desc = named(&tail, "desc");
        if !tail_desc.is_empty() {
            if !description.is_empty() {
                description.push(' ');
            }
            description.push_str(&tail_desc);
        }

        Some(RawRow {
            date: named(&head, "date"),
            do_number: named(&head, "do_no"),
            description,
            quantity: named(&tail, "qty"),
            unit_price: named(&tail, "price"),
            amount: tail.name("amount").map(|m| m.as_str().to_string()),
        })
    }
}

fn named(caps: &regex::Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

impl RawRow {
    /// Parse the captured text into a typed entry. A trailing
    /// partial-load marker is stripped here; callers that need the flag
    /// check [`RawRow::is_underloaded`] first.
    pub fn into_entry(self) -> Result<LineItemEntry, ExtractError> {
        let date = dates::parse_dmy(&self.date)?;
        let quantity = numbers::parse_decimal("quantity", &self.quantity)?;
        let unit_price = numbers::parse_decimal("unit price", &self.unit_price)?;
        let amount = match &self.amount {
            Some(raw) => Some(numbers::parse_decimal("amount", raw)?),
            None => None,
        };
        let (description, _) = underload::strip_marker(&self.description);

        Ok(LineItemEntry {
            for_month: dates::month_bucket(date),
            delivery_date: dates::display_date(date),
            do_number: self.do_number,
            description,
            quantity,
            unit_price,
            amount,
        })
    }

    /// True when the raw description carries the partial-load marker,
    /// trailing or mid-text.
    pub fn is_underloaded(&self) -> bool {
        self.description.contains('*')
    }
}

/// Compute `quantity * unit_price` rounded to cents, used for the
/// computed-subtotal column emitted beside the printed one.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Decimal {
    (quantity * unit_price).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn grammar() -> LineGrammar {
        LineGrammar::new(
            Regex::new(
                r"^(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<do_no>[A-Z]{2}\d{8})\s+(?P<desc>.+?)\s+(?P<qty>\d+\.\d+)\s+CU\s+(?P<price>\d+\.\d{2})\s+(?P<amount>[\d,]+\.\d{2})$",
            )
            .unwrap(),
        )
        .with_fallback(
            Regex::new(r"^(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<do_no>[A-Z]{2}\d{8})\s+(?P<desc>.+)$")
                .unwrap(),
            Regex::new(
                r"^(?P<desc>.*?)\s*(?P<qty>\d+\.\d+)\s+CU\s+(?P<price>\d+\.\d{2})\s+(?P<amount>[\d,]+\.\d{2})$",
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_header_slot_first_match_wins() {
        let pattern = Regex::new(r"INVOICE NO:\s*(\d+)").unwrap();
        let mut slot = HeaderSlot::default();
        slot.scan(&pattern, "INVOICE NO: 123456");
        slot.scan(&pattern, "INVOICE NO: 999999");
        assert_eq!(slot.take(), Some("123456".to_string()));
    }

    #[test]
    fn test_primary_line_match() {
        let row = grammar()
            .match_line("01/02/2024 AB12345678 READY MIX 10.0 CU 50.00 500.00")
            .unwrap();
        assert_eq!(row.do_number, "AB12345678");
        assert_eq!(row.description, "READY MIX");

        let entry = row.into_entry().unwrap();
        assert_eq!(entry.for_month, "2024 02");
        assert_eq!(entry.delivery_date, "01 Feb 2024");
        assert_eq!(entry.quantity, dec!(10.0));
        assert_eq!(entry.unit_price, dec!(50.00));
        assert_eq!(entry.amount, Some(dec!(500.00)));
    }

    #[test]
    fn test_split_line_match() {
        let g = grammar();
        assert!(g.match_line("01/02/2024 AB12345678 READY MIX GRADE").is_none());
        let row = g
            .match_split(
                "01/02/2024 AB12345678 READY MIX GRADE",
                "C25 2.5 CU 95.00 237.50",
            )
            .unwrap();
        assert_eq!(row.description, "READY MIX GRADE C25");
        assert_eq!(row.quantity, "2.5");
    }

    #[test]
    fn test_underload_marker_detected_and_stripped() {
        let row = grammar()
            .match_line("01/02/2024 AB12345678 READY MIX * 2.5 CU 95.00 237.50")
            .unwrap();
        assert!(row.is_underloaded());
        let entry = row.clone().into_entry().unwrap();
        assert_eq!(entry.description, "READY MIX");
    }

    #[test]
    fn test_line_total_rounds_to_cents() {
        assert_eq!(line_total(dec!(2.5), dec!(95.333)), dec!(238.33));
    }
}
