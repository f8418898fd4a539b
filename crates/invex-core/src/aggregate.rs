//! Per-description aggregation within one invoice document.

use crate::decode::unit_for;
use crate::extract::line_total;
use crate::model::LineItemEntry;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Rollup for one unique description: first-seen unit price, summed
/// quantity across every entry sharing the description.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionAggregate {
    pub description: String,
    pub unit: &'static str,
    /// Unit price of the first occurrence. Later occurrences with a
    /// different price are not revalidated.
    pub unit_price: Decimal,
    pub total_quantity: Decimal,
}

impl DescriptionAggregate {
    /// `total_quantity * unit_price`, rounded to cents.
    pub fn subtotal(&self) -> Decimal {
        line_total(self.total_quantity, self.unit_price)
    }
}

/// Aggregates in first-occurrence order.
#[derive(Debug, Default)]
pub struct DescriptionAggregates {
    items: Vec<DescriptionAggregate>,
    index: HashMap<String, usize>,
}

impl DescriptionAggregates {
    pub fn from_entries(entries: &[LineItemEntry]) -> Self {
        let mut aggregates = Self::default();
        for entry in entries {
            aggregates.push(entry);
        }
        aggregates
    }

    pub fn push(&mut self, entry: &LineItemEntry) {
        match self.index.get(&entry.description) {
            Some(&i) => {
                self.items[i].total_quantity += entry.quantity;
            }
            None => {
                self.index.insert(entry.description.clone(), self.items.len());
                self.items.push(DescriptionAggregate {
                    description: entry.description.clone(),
                    unit: unit_for(&entry.description),
                    unit_price: entry.unit_price,
                    total_quantity: entry.quantity,
                });
            }
        }
    }

    /// Number of unique descriptions (K).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Aggregate for the i-th unique description, in first-seen order.
    /// Used to populate the leading rows of a document block.
    pub fn get(&self, i: usize) -> Option<&DescriptionAggregate> {
        self.items.get(i)
    }

    /// Sum of per-description subtotals. Emitted beside the printed
    /// subtotal, never used to correct it.
    pub fn computed_total(&self) -> Decimal {
        self.items.iter().map(|a| a.subtotal()).sum()
    }

    /// Difference against the printed subtotal when one was extracted.
    /// Non-fatal; surfaced in the batch report for manual review.
    pub fn discrepancy(&self, printed_subtotal: Option<Decimal>) -> Option<Decimal> {
        let printed = printed_subtotal?;
        let diff = self.computed_total() - printed;
        if diff.is_zero() { None } else { Some(diff) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn entry(desc: &str, qty: Decimal, price: Decimal) -> LineItemEntry {
        LineItemEntry {
            for_month: "2024 02".to_string(),
            delivery_date: "01 Feb 2024".to_string(),
            do_number: "12345678".to_string(),
            description: desc.to_string(),
            quantity: qty,
            unit_price: price,
            amount: None,
        }
    }

    #[test]
    fn test_first_seen_order_and_summed_quantity() {
        let entries = vec![
            entry("GR 40", dec!(8.0), dec!(100.00)),
            entry("GR 25", dec!(4.0), dec!(90.00)),
            entry("GR 40", dec!(2.0), dec!(100.00)),
        ];
        let aggs = DescriptionAggregates::from_entries(&entries);
        assert_eq!(aggs.len(), 2);
        assert_eq!(aggs.get(0).unwrap().description, "GR 40");
        assert_eq!(aggs.get(0).unwrap().total_quantity, dec!(10.0));
        assert_eq!(aggs.get(1).unwrap().description, "GR 25");
        assert_eq!(aggs.get(1).unwrap().total_quantity, dec!(4.0));
    }

    #[test]
    fn test_unit_price_is_first_seen() {
        let entries = vec![
            entry("GR 40", dec!(8.0), dec!(100.00)),
            entry("GR 40", dec!(2.0), dec!(120.00)),
        ];
        let aggs = DescriptionAggregates::from_entries(&entries);
        assert_eq!(aggs.get(0).unwrap().unit_price, dec!(100.00));
    }

    #[test]
    fn test_quantity_roundtrip_matches_manual_sum() {
        let entries = vec![
            entry("GR 40", dec!(8.0), dec!(100.00)),
            entry("GR 25", dec!(4.0), dec!(90.00)),
            entry("GR 40", dec!(2.5), dec!(100.00)),
        ];
        let aggs = DescriptionAggregates::from_entries(&entries);
        let manual: Decimal = entries
            .iter()
            .filter(|e| e.description == "GR 40")
            .map(|e| e.quantity)
            .sum();
        assert_eq!(aggs.get(0).unwrap().total_quantity, manual);
    }

    #[test]
    fn test_underload_aggregate_billed_per_trip() {
        let entries = vec![entry(
            " - UNDERLOAD CHARGES - 2.5m3",
            dec!(1),
            dec!(48.00),
        )];
        let aggs = DescriptionAggregates::from_entries(&entries);
        assert_eq!(aggs.get(0).unwrap().unit, "trip");
    }

    #[test]
    fn test_discrepancy_flag() {
        let entries = vec![entry("GR 40", dec!(10.0), dec!(50.00))];
        let aggs = DescriptionAggregates::from_entries(&entries);
        assert_eq!(aggs.computed_total(), dec!(500.00));
        assert_eq!(aggs.discrepancy(Some(dec!(500.00))), None);
        assert_eq!(aggs.discrepancy(Some(dec!(490.00))), Some(dec!(10.00)));
        assert_eq!(aggs.discrepancy(None), None);
    }
}
