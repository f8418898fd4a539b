//! Data model for extracted invoice documents.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Header fields of one invoice document.
///
/// Every field is optional: a document whose header lines are not
/// recognized still produces line-item rows with empty header cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderFields {
    /// Invoice / reference number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    /// Invoice date, already display-formatted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,

    /// Subcontractor code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcon: Option<String>,

    /// Site / location code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Building label (PANU, ISLAND).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,

    /// Subtotal as printed on the invoice. Emitted side by side with the
    /// computed total; never used to correct the extracted rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed_subtotal: Option<Decimal>,
}

/// One delivery / charge line within an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemEntry {
    /// Month bucket derived from the delivery date (`YYYY MM`).
    pub for_month: String,

    /// Delivery date, display-formatted.
    pub delivery_date: String,

    /// Delivery-order number.
    pub do_number: String,

    /// Raw description text (partial-load marker already stripped).
    pub description: String,

    /// Delivered quantity.
    pub quantity: Decimal,

    /// Unit price.
    pub unit_price: Decimal,

    /// Line amount as printed, when the grammar captured one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

/// One fully extracted source PDF.
///
/// Constructed per input file, consumed once when its rows are merged
/// into the batch table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceDocument {
    /// Source file name (no directory).
    pub file_name: String,

    /// Header fields, each captured at most once (first match wins).
    pub header: HeaderFields,

    /// Recognized line items, in document order.
    pub entries: Vec<LineItemEntry>,
}

/// Attributes decoded from a line-item description by pattern
/// decomposition. Purely derived; independent per entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedCode {
    /// Concrete grade label, mapped through the fixed grade table.
    pub grade: Option<String>,

    /// Slump value (e.g. `160-210MM`).
    pub slump: Option<String>,

    /// `RTD` when a retardant was used.
    pub retardant: Option<String>,

    /// Retardation duration (e.g. `4HR`).
    pub duration: Option<String>,
}

/// Annotation row sourced from the companion spreadsheet, keyed by
/// delivery-order number. Populated fields vary per profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationRecord {
    /// Delivery-order number the record is keyed by.
    pub do_number: String,

    /// Site contact name.
    pub contact_name: Option<String>,

    /// Site contact number.
    pub contact_number: Option<String>,

    /// Combined `name contact` field (PANU comment decomposition).
    pub name_and_contact: Option<String>,

    /// Structural element / bored pile / location label.
    pub location: Option<String>,

    /// Name of the signee / purchaser representative.
    pub signee: Option<String>,

    /// Raw order/delivery comment text.
    pub comment: Option<String>,

    /// License-plate code decomposed from the comment.
    pub license_plate: Option<String>,

    /// Gate code decomposed from the comment.
    pub gate: Option<String>,

    /// Subcontractor name (ISLAND spreadsheet).
    pub subcon: Option<String>,

    /// Zone derived from the subcontractor.
    pub zone: Option<String>,
}
