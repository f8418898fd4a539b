//! Companion-spreadsheet annotations.
//!
//! Batches may include one workbook whose rows annotate invoice line
//! items by delivery-order number. The true header row sits below a
//! free-form title block and is located by cell count; the row directly
//! under the header is a repeated subheader and is skipped.

use crate::error::SheetError;
use crate::model::AnnotationRecord;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// A header row must have more populated cells than any title line.
const MIN_HEADER_CELLS: usize = 7;

lazy_static! {
    // Comment decomposition (PANU order comments)
    static ref NAME_CONTACT: Regex =
        Regex::new(r"(?P<name>[A-Za-z\s]+)\s+(?P<number>\d{8})").unwrap();
    static ref PILE: Regex =
        Regex::new(r"\b(?P<pile>[CcFfPp]?\s*-?\s*\d{3})\b").unwrap();
    static ref LICENSE_PLATE: Regex =
        Regex::new(r"(?P<lp>[lL][pP]\s*-?\s*\d+)").unwrap();
    static ref GATE: Regex =
        Regex::new(r"(?P<gate>[Gg][Aa][Tt][Ee]\s*-?\s*\d+)").unwrap();

    // ISLAND spreadsheet fields
    static ref SITE_PERSON: Regex =
        Regex::new(r"(?P<name>[A-Z\s]+)\s+(?P<contact>\d{8})").unwrap();
    static ref PARENTHESIZED: Regex = Regex::new(r"\((.*?)\)").unwrap();
    static ref LEADING_ALPHA: Regex = Regex::new(r"^([A-Za-z]+)").unwrap();
    static ref ALPHA_NUMBER: Regex =
        Regex::new(r"([A-Za-z]+)\s*-?\s*([0-9]+)").unwrap();
}

/// A loaded worksheet with its header row resolved.
pub struct SheetTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SheetTable {
    /// Load the first worksheet, locating the header row by scanning
    /// for the first row with more than [`MIN_HEADER_CELLS`] populated
    /// cells. Everything above is a title block and is dropped, as is
    /// the subheader row directly below.
    pub fn load(path: &Path) -> Result<Self, SheetError> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| SheetError::Open(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(SheetError::Empty)?
            .map_err(|e| SheetError::Open(e.to_string()))?;

        let all_rows: Vec<&[Data]> = range.rows().collect();
        let header_idx = all_rows
            .iter()
            .position(|row| row.iter().filter(|c| !c.is_empty()).count() > MIN_HEADER_CELLS)
            .ok_or(SheetError::HeaderNotFound)?;

        let headers = all_rows[header_idx]
            .iter()
            .map(cell_text)
            .collect::<Vec<_>>();
        let rows = all_rows[header_idx + 2..]
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        Ok(Self { headers, rows })
    }

    /// Index of a required column by header name.
    pub fn column(&self, name: &str) -> Result<usize, SheetError> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| SheetError::MissingColumn(name.to_string()))
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        // Integral floats are the common xlsx encoding for DO numbers
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.as_string().unwrap_or_default().trim().to_string(),
    }
}

/// Annotation records keyed by delivery-order number.
#[derive(Debug, Default)]
pub struct AnnotationTable {
    records: HashMap<String, AnnotationRecord>,
}

impl AnnotationTable {
    /// Record for a DO number; `None` means the invoice row keeps empty
    /// annotation cells (left-join semantics).
    pub fn get(&self, do_number: &str) -> Option<&AnnotationRecord> {
        self.records.get(do_number)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn insert(&mut self, record: AnnotationRecord) {
        if !record.do_number.is_empty() {
            self.records.insert(record.do_number.clone(), record);
        }
    }

    /// ACS summary sheet: ticket number, site contact, structural
    /// element, purchaser representative.
    pub fn from_acs_sheet(path: &Path) -> Result<Self, SheetError> {
        let sheet = SheetTable::load(path)?;
        let do_col = sheet.column("TICKET NUMBER")?;
        let contact_col = sheet.column("SITE CONTACT NO")?;
        let element_col = sheet.column("STRUCTURAL ELEMENT")?;
        let rep_col = sheet.column("PURCHASER REPRESENTATIVE")?;

        let mut table = Self::default();
        for row in sheet.rows() {
            table.insert(AnnotationRecord {
                do_number: cell(row, do_col),
                contact_number: opt_cell(row, contact_col),
                location: opt_cell(row, element_col),
                contact_name: opt_cell(row, rep_col),
                ..Default::default()
            });
        }
        Ok(table)
    }

    /// PANU summary sheet: the order comment is a compound field that
    /// is decomposed into name+contact, pile, license plate and gate.
    pub fn from_panu_sheet(path: &Path) -> Result<Self, SheetError> {
        let sheet = SheetTable::load(path)?;
        let do_col = sheet.column("DO No")?;
        let comment_col = sheet.column("Comments at Order Time")?;
        let signee_col = sheet.column("Name of signee")?;

        let mut table = Self::default();
        for row in sheet.rows() {
            let comment = cell(row, comment_col);
            let decomposed = decompose_comment(&comment);
            table.insert(AnnotationRecord {
                do_number: cell(row, do_col),
                name_and_contact: decomposed.name_and_contact,
                location: decomposed.pile,
                license_plate: decomposed.license_plate,
                gate: decomposed.gate,
                comment: if comment.is_empty() { None } else { Some(comment) },
                signee: opt_cell(row, signee_col),
                ..Default::default()
            });
        }
        Ok(table)
    }

    /// ISLAND summary sheet: site person splits into name + contact,
    /// the project location prefers its parenthesized part, and the
    /// project name's leading word is the subcon (zone via lookup).
    pub fn from_island_sheet(path: &Path) -> Result<Self, SheetError> {
        let sheet = SheetTable::load(path)?;
        let do_col = sheet.column("TICKET NUMBER")?;
        let rep_col = sheet.column("PURCHASER REPRESENTATIVE")?;
        let location_col = sheet.column("PROJECT LOCATION")?;
        let project_col = sheet.column("PROJECT NAME")?;
        let person_col = sheet.column("SITE PERSON")?;

        let mut table = Self::default();
        for row in sheet.rows() {
            let person = cell(row, person_col);
            let (name, contact) = match SITE_PERSON.captures(&person) {
                Some(caps) => (
                    Some(caps["name"].trim().to_string()),
                    Some(caps["contact"].to_string()),
                ),
                None => (None, None),
            };

            let subcon = LEADING_ALPHA
                .captures(&cell(row, project_col))
                .map(|c| c[1].to_string());
            let zone = subcon.as_deref().and_then(|s| match s {
                "CSBP" => Some("A".to_string()),
                "BBR" => Some("B".to_string()),
                _ => None,
            });

            table.insert(AnnotationRecord {
                do_number: cell(row, do_col),
                signee: opt_cell(row, rep_col),
                location: island_location(&cell(row, location_col)),
                contact_name: name,
                contact_number: contact,
                subcon,
                zone,
                ..Default::default()
            });
        }
        Ok(table)
    }
}

fn cell(row: &[String], col: usize) -> String {
    row.get(col).cloned().unwrap_or_default()
}

fn opt_cell(row: &[String], col: usize) -> Option<String> {
    let value = cell(row, col);
    if value.is_empty() { None } else { Some(value) }
}

/// Decomposed fields of one PANU order comment.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DecomposedComment {
    pub name_and_contact: Option<String>,
    pub pile: Option<String>,
    pub license_plate: Option<String>,
    pub gate: Option<String>,
}

/// Pull name+contact, pile, license plate and gate out of a free-text
/// order comment. Fields that don't appear stay empty.
pub fn decompose_comment(comment: &str) -> DecomposedComment {
    let name_and_contact = NAME_CONTACT.captures(comment).map(|caps| {
        format!(
            "{} {}",
            title_case(caps["name"].trim()),
            caps["number"].trim()
        )
    });

    let pile = PILE
        .captures(comment)
        .map(|caps| standardize_field(&normalize_pile(caps["pile"].trim()), "-"));

    let license_plate = LICENSE_PLATE
        .captures(comment)
        .map(|caps| standardize_field(&caps["lp"].to_uppercase(), " "));

    let gate = GATE
        .captures(comment)
        .map(|caps| title_case(caps["gate"].trim()));

    DecomposedComment {
        name_and_contact,
        pile,
        license_plate,
        gate,
    }
}

// A bare 3-digit pile number means a "C" bored pile.
fn normalize_pile(pile: &str) -> String {
    if pile.len() == 3 && pile.chars().all(|c| c.is_ascii_digit()) {
        format!("C{pile}")
    } else {
        pile.to_uppercase()
    }
}

/// Rejoin an alpha prefix and its number with a fixed connector
/// (`lp 12` → `LP 12`, `C - 101` → `C-101`).
fn standardize_field(value: &str, connector: &str) -> String {
    match ALPHA_NUMBER.captures(value) {
        Some(caps) => format!("{}{}{}", &caps[1], connector, &caps[2]),
        None => value.to_string(),
    }
}

/// ISLAND project locations prefer the parenthesized part and get a
/// dash inserted between the alpha prefix and its number.
fn island_location(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let inner = PARENTHESIZED
        .captures(raw)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| raw.to_string());
    Some(standardize_field(inner.to_uppercase().trim(), "-"))
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
