//! Partial-load (underload) surcharge handling.
//!
//! Deliveries below a full truckload carry a surcharge billed as a
//! separate line. The per-quantity rates are fixed in half-cube steps.

use crate::error::ExtractError;
use crate::model::LineItemEntry;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Surcharge rates by delivered quantity, in half-cube steps.
const RATES: &[(Decimal, Decimal)] = &[
    (dec!(1.0), dec!(66.00)),
    (dec!(1.5), dec!(60.00)),
    (dec!(2.0), dec!(54.00)),
    (dec!(2.5), dec!(48.00)),
    (dec!(3.0), dec!(42.00)),
    (dec!(3.5), dec!(36.00)),
    (dec!(4.0), dec!(30.00)),
    (dec!(4.5), dec!(24.00)),
    (dec!(5.0), dec!(18.00)),
    (dec!(5.5), dec!(12.00)),
    (dec!(6.0), dec!(6.00)),
];

/// Surcharge rate for an underloaded quantity. Quantities outside the
/// table (full loads, or anything off the half-cube grid) are an error:
/// a flagged row without a defined rate means the flag was misread.
pub fn surcharge_rate(quantity: Decimal) -> Result<Decimal, ExtractError> {
    RATES
        .iter()
        .find(|(qty, _)| *qty == quantity.normalize())
        .map(|(_, rate)| *rate)
        .ok_or_else(|| ExtractError::SurchargeRate(quantity.to_string()))
}

/// Synthesized surcharge line for an underloaded delivery. Shares the
/// delivery's date and DO number; quantity 1 at the table rate.
pub fn surcharge_entry(delivery: &LineItemEntry) -> Result<LineItemEntry, ExtractError> {
    let rate = surcharge_rate(delivery.quantity)?;
    Ok(surcharge_entry_with_rate(delivery, rate))
}

/// Surcharge line at an explicitly printed rate (vendors that append a
/// literal UNDERLOAD CHARGES line instead of flagging the delivery).
pub fn surcharge_entry_with_rate(delivery: &LineItemEntry, rate: Decimal) -> LineItemEntry {
    LineItemEntry {
        for_month: delivery.for_month.clone(),
        delivery_date: delivery.delivery_date.clone(),
        do_number: delivery.do_number.clone(),
        description: format!(
            "{} - UNDERLOAD CHARGES - {}m3",
            delivery.description, delivery.quantity
        ),
        quantity: dec!(1),
        unit_price: rate,
        amount: Some(rate),
    }
}

/// Strip a trailing partial-load marker from a description, returning
/// the cleaned text and whether the marker was present.
pub fn strip_marker(description: &str) -> (String, bool) {
    let trimmed = description.trim_end();
    if let Some(stripped) = trimmed.strip_suffix('*') {
        (stripped.trim_end().to_string(), true)
    } else {
        (trimmed.to_string(), false)
    }
}
