//! PANU profile: native-text invoices with a two-part fallback grammar
//! for wrapped rows, `*` partial-load markers priced from the fixed
//! rate table, grade/slump/retardant decoding, and an order-comment
//! spreadsheet decomposed into annotation columns.

use crate::acquire::pdf;
use crate::aggregate::DescriptionAggregates;
use crate::annotate::AnnotationTable;
use crate::decode;
use crate::error::Result;
use crate::extract::{dates, line_total, underload, LineGrammar, RawRow};
use crate::model::{HeaderFields, InvoiceDocument, LineItemEntry};
use crate::profiles::acs::file_name_of;
use crate::profiles::{fill_annotation_columns, FileBlock, VendorPipeline};
use crate::table::{Cell, OutputTable};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use tracing::debug;

pub const COLUMNS: &[&str] = &[
    "Inv No.",
    "Date",
    "Description",
    "Total Qty",
    "Unit",
    "Unit Rate",
    "Subtotal Amount",
    "Total Amt per Inv",
    "Invoice No.",
    "For Month (YYYY MM)",
    "Location/Site",
    "Zone",
    "Purchaser Personnel Name & Contact",
    "Bored Pile No.: OR Location ***",
    "LP",
    "Gate No.",
    "Comments at Order Time",
    "Name of signee",
    "Building",
    "Subcons",
    "DO Date",
    "DO No.",
    "Description2",
    "Conc. Grade",
    "Conc. Slump",
    "Admix. 1",
    "Admix. 2",
    "Admix. 3",
    "Qty",
    "Vendor Invoice Unit Rate (S$)",
    "Subtotal (S$)",
    "Calculated Subtotal (S$)",
];

lazy_static! {
    static ref NINE_DIGITS: Regex = Regex::new(r"\d{9}").unwrap();
    static ref DMY: Regex = Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap();

    // LOCATION/SITE TUAS AVE 1 (VSMC-CSBP - TOWER 2)
    static ref LOC_SITE: Regex = Regex::new(
        r"LOCATION/SITE\s+[A-Z\s]+\d+[\s-]*\(\s*(?P<site>(?:[A-Za-z0-9]+-)?\s*(?P<subcon>[A-Za-z0-9\s]+?)(?:\s*-\s*(?P<building>[A-Za-z0-9\s]+?))?)\s*\)"
    )
    .unwrap();

    static ref LINE: Regex = Regex::new(
        r"^(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<do_no>\d{8})\s+(?P<desc>.*?)\s+(?P<qty>(?:\d{1,3},)*\d+(?:\.\d{2})?)\s+(?P<price>(?:\d{1,3},)*\d+(?:\.\d{2})?)\s+(?P<amount>(?:\d{1,3},)*\d+(?:\.\d{2})?)$"
    )
    .unwrap();

    // Wrapped rows: date/DO/leading description on one line, the
    // percentage-admixture tail plus the numeric fields on the next.
    static ref SPLIT_HEAD: Regex =
        Regex::new(r"^(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<do_no>\d{8})\s+(?P<desc>.*)$").unwrap();
    static ref SPLIT_TAIL: Regex = Regex::new(
        r"^(?P<desc>\d+%[A-Za-z]+(?:&[A-Za-z]+)*)\s*\*?\s*(?P<qty>\d{1,3}(?:,\d{3})*\.\d{2})\s+(?P<price>\d{1,3}(?:,\d{3})*\.\d{2})\s+(?P<amount>\d{1,3}(?:,\d{3})*\.\d{2})$"
    )
    .unwrap();
}

fn grammar() -> LineGrammar {
    LineGrammar::new(LINE.clone()).with_fallback(SPLIT_HEAD.clone(), SPLIT_TAIL.clone())
}

/// Scan one document's text lines into header fields and entries.
/// Underloaded deliveries (a `*` anywhere in the description) expand
/// into the delivery row plus a synthesized surcharge row.
pub fn parse_lines(file_name: &str, lines: &[String]) -> Result<InvoiceDocument> {
    let grammar = grammar();
    let mut header = HeaderFields::default();
    let mut entries: Vec<LineItemEntry> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let upper = line.to_uppercase();

        // Invoice number and date sit on the line after their labels
        if header.invoice_number.is_none() && upper.contains("INVOICE NO") {
            if let Some(next) = lines.get(i + 1) {
                if let Some(m) = NINE_DIGITS.find(next) {
                    header.invoice_number = Some(m.as_str().to_string());
                }
            }
        }
        if header.invoice_date.is_none() && upper.contains("DATE") {
            if let Some(next) = lines.get(i + 1) {
                if let Some(m) = DMY.find(next) {
                    if let Ok(date) = dates::parse_dmy(m.as_str()) {
                        header.invoice_date = Some(dates::short_date(date));
                    }
                }
            }
        }

        if let Some(caps) = LOC_SITE.captures(line) {
            if header.subcon.is_none() {
                header.subcon = Some(caps["subcon"].trim().to_uppercase());
                header.location = Some(caps["site"].trim().to_uppercase());
                header.building = caps
                    .name("building")
                    .map(|m| m.as_str().trim().to_uppercase());
            }
        }

        if upper.contains("SUB-TOTAL") && header.printed_subtotal.is_none() {
            if let Some(value) = line.split('$').next_back() {
                header.printed_subtotal =
                    crate::extract::numbers::parse_decimal("subtotal", value).ok();
            }
        }

        if let Some(raw) = grammar.match_line(line) {
            push_entry(&mut entries, raw, false)?;
            continue;
        }

        if i > 0 {
            let tail_marker = line.contains('*');
            if let Some(raw) = grammar.match_split(&lines[i - 1], line) {
                push_entry(&mut entries, raw, tail_marker)?;
            }
        }
    }

    debug!("{}: {} line items", file_name, entries.len());

    Ok(InvoiceDocument {
        file_name: file_name.to_string(),
        header,
        entries,
    })
}

fn push_entry(entries: &mut Vec<LineItemEntry>, mut raw: RawRow, tail_marker: bool) -> Result<()> {
    // The marker may sit mid-description, not only at the end
    let underloaded = tail_marker || raw.is_underloaded();
    if underloaded {
        raw.description = raw.description.replace('*', "").trim().to_string();
    }

    let entry = raw.into_entry()?;
    if underloaded {
        let surcharge = underload::surcharge_entry(&entry)?;
        entries.push(entry);
        entries.push(surcharge);
    } else {
        entries.push(entry);
    }
    Ok(())
}

/// One output row, fields in [`COLUMNS`] order; serialized to cells
/// only when pushed.
#[derive(Default)]
struct PanuRow {
    invoice_number: Cell,
    invoice_date: Cell,
    agg_description: Cell,
    agg_quantity: Cell,
    agg_unit: Cell,
    agg_unit_rate: Cell,
    agg_subtotal: Cell,
    total_amount: Cell,
    invoice_number_2: Cell,
    for_month: Cell,
    location: Cell,
    zone: Cell,
    name_and_contact: Cell,
    pile_location: Cell,
    license_plate: Cell,
    gate: Cell,
    comment: Cell,
    signee: Cell,
    building: Cell,
    subcon: Cell,
    do_date: Cell,
    do_number: Cell,
    description: Cell,
    grade: Cell,
    slump: Cell,
    admix_1: Cell,
    admix_2: Cell,
    admix_3: Cell,
    quantity: Cell,
    unit_rate: Cell,
    subtotal: Cell,
    calculated_subtotal: Cell,
}

impl PanuRow {
    fn into_cells(self) -> Vec<Cell> {
        vec![
            self.invoice_number,
            self.invoice_date,
            self.agg_description,
            self.agg_quantity,
            self.agg_unit,
            self.agg_unit_rate,
            self.agg_subtotal,
            self.total_amount,
            self.invoice_number_2,
            self.for_month,
            self.location,
            self.zone,
            self.name_and_contact,
            self.pile_location,
            self.license_plate,
            self.gate,
            self.comment,
            self.signee,
            self.building,
            self.subcon,
            self.do_date,
            self.do_number,
            self.description,
            self.grade,
            self.slump,
            self.admix_1,
            self.admix_2,
            self.admix_3,
            self.quantity,
            self.unit_rate,
            self.subtotal,
            self.calculated_subtotal,
        ]
    }
}

/// Assemble one document block in the PANU schema.
pub fn document_block(doc: &InvoiceDocument) -> Result<FileBlock> {
    let aggregates = DescriptionAggregates::from_entries(&doc.entries);
    let subcon = doc.header.subcon.clone().unwrap_or_default();
    let zone = decode::zone_for(&subcon);

    let mut table = OutputTable::new(COLUMNS.to_vec());
    for (i, entry) in doc.entries.iter().enumerate() {
        let code = decode::decode_panu(&entry.description)?;

        let mut row = PanuRow::default();
        if i == 0 {
            row.invoice_number = Cell::opt_text(doc.header.invoice_number.clone());
            row.invoice_date = Cell::opt_text(doc.header.invoice_date.clone());
            row.total_amount = Cell::opt_number(doc.header.printed_subtotal);
        }
        if let Some(agg) = aggregates.get(i) {
            row.agg_description = Cell::text(agg.description.clone());
            row.agg_quantity = Cell::Number(agg.total_quantity);
            row.agg_unit = Cell::text(agg.unit);
            row.agg_unit_rate = Cell::Number(agg.unit_price);
            row.agg_subtotal = Cell::Number(agg.subtotal());
        }
        row.invoice_number_2 = Cell::opt_text(doc.header.invoice_number.clone());
        row.for_month = Cell::text(entry.for_month.clone());
        row.location = Cell::opt_text(doc.header.location.clone());
        row.zone = Cell::text(zone.clone());
        row.building = Cell::opt_text(doc.header.building.clone());
        row.subcon = Cell::text(subcon.clone());
        row.do_date = Cell::text(entry.delivery_date.clone());
        row.do_number = Cell::text(entry.do_number.clone());
        row.description = Cell::text(entry.description.clone());
        row.grade = Cell::opt_text(code.grade);
        row.slump = Cell::opt_text(code.slump);
        row.admix_1 = Cell::opt_text(code.retardant);
        row.admix_2 = Cell::opt_text(code.duration);
        row.quantity = Cell::Number(entry.quantity);
        row.unit_rate = Cell::Number(entry.unit_price);
        row.subtotal = Cell::opt_number(entry.amount);
        row.calculated_subtotal = Cell::Number(line_total(entry.quantity, entry.unit_price));
        table.push_row(row.into_cells());
    }

    let mut block = FileBlock::new(table);
    block.subtotal_discrepancy = aggregates.discrepancy(doc.header.printed_subtotal);
    Ok(block)
}

pub struct PanuPipeline;

impl VendorPipeline for PanuPipeline {
    fn columns(&self) -> &'static [&'static str] {
        COLUMNS
    }

    fn process_file(&self, path: &Path) -> Result<FileBlock> {
        let text = pdf::extract_page_lines(path)?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let doc = parse_lines(&file_name_of(path), &lines)?;
        document_block(&doc)
    }

    fn load_annotations(&self, sheet: &Path) -> Result<AnnotationTable> {
        Ok(AnnotationTable::from_panu_sheet(sheet)?)
    }

    fn apply_annotations(&self, table: &mut OutputTable, annotations: &AnnotationTable) {
        fill_annotation_columns(
            table,
            annotations,
            "DO No.",
            &[
                ("Purchaser Personnel Name & Contact", |r| {
                    r.name_and_contact.as_ref()
                }),
                ("Bored Pile No.: OR Location ***", |r| r.location.as_ref()),
                ("LP", |r| r.license_plate.as_ref()),
                ("Gate No.", |r| r.gate.as_ref()),
                ("Comments at Order Time", |r| r.comment.as_ref()),
                ("Name of signee", |r| r.signee.as_ref()),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_header_fields_on_following_lines() {
        let doc = parse_lines(
            "inv.pdf",
            &lines(&[
                "INVOICE NO",
                "123456789",
                "DATE",
                "01/02/2024",
                "LOCATION/SITE TUAS AVE 1 (VSMC-CSBP - TOWER 2)",
            ]),
        )
        .unwrap();
        assert_eq!(doc.header.invoice_number.as_deref(), Some("123456789"));
        assert_eq!(doc.header.invoice_date.as_deref(), Some("01-Feb-24"));
        assert_eq!(doc.header.subcon.as_deref(), Some("CSBP"));
        assert_eq!(doc.header.building.as_deref(), Some("TOWER 2"));
    }

    #[test]
    fn test_primary_line_and_decoding() {
        let doc = parse_lines(
            "inv.pdf",
            &lines(&["01/02/2024 12345678 GR 40 SL 160-210MM 4HR RTD 9.00 101.00 909.00"]),
        )
        .unwrap();
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.entries[0].quantity, dec!(9.00));

        let block = document_block(&doc).unwrap();
        let grade_idx = block.table.column_index("Conc. Grade").unwrap();
        let slump_idx = block.table.column_index("Conc. Slump").unwrap();
        assert_eq!(block.table.rows[0][grade_idx], Cell::text("C32/40"));
        assert_eq!(block.table.rows[0][slump_idx], Cell::text("160-210MM"));
    }

    #[test]
    fn test_underload_marker_expands_to_two_rows() {
        let doc = parse_lines(
            "inv.pdf",
            &lines(&["01/02/2024 12345678 GR 40 SL 160-210MM * 2.00 101.00 202.00"]),
        )
        .unwrap();
        assert_eq!(doc.entries.len(), 2);
        assert_eq!(doc.entries[0].description, "GR 40 SL 160-210MM");
        let surcharge = &doc.entries[1];
        assert_eq!(surcharge.quantity, dec!(1));
        // quantity 2.0 maps to 54.00 in the fixed rate table
        assert_eq!(surcharge.unit_price, dec!(54.00));
        assert_eq!(
            surcharge.description,
            "GR 40 SL 160-210MM - UNDERLOAD CHARGES - 2.00m3"
        );
    }

    #[test]
    fn test_split_row_reconstruction() {
        let doc = parse_lines(
            "inv.pdf",
            &lines(&[
                "01/02/2024 12345678 GR 40 SL 160-210MM",
                "4%SRA&PLAST 9.00 101.00 909.00",
            ]),
        )
        .unwrap();
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(
            doc.entries[0].description,
            "GR 40 SL 160-210MM 4%SRA&PLAST"
        );
        assert_eq!(doc.entries[0].unit_price, dec!(101.00));
    }

    #[test]
    fn test_calculated_subtotal_column() {
        let doc = parse_lines(
            "inv.pdf",
            &lines(&["01/02/2024 12345678 GR 25 7.50 90.00 675.00"]),
        )
        .unwrap();
        let block = document_block(&doc).unwrap();
        let calc_idx = block
            .table
            .column_index("Calculated Subtotal (S$)")
            .unwrap();
        assert_eq!(block.table.rows[0][calc_idx], Cell::Number(dec!(675.00)));
    }
}
