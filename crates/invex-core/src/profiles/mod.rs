//! Vendor profiles.
//!
//! Each vendor's invoice layout gets its own pipeline: a bespoke set of
//! header patterns, a line-item grammar, decoding rules and an output
//! schema. The batch layer drives every profile through the
//! [`VendorPipeline`] trait.

pub mod acs;
pub mod brc;
pub mod gw;
pub mod island;
pub mod panu;
pub mod sinmix;

use crate::acquire::ocr::{OcrEngine, TesseractEngine};
use crate::acquire::raster::{PageRenderer, PdftoppmRenderer};
use crate::annotate::AnnotationTable;
use crate::config::OcrConfig;
use crate::error::Result;
use crate::model::AnnotationRecord;
use crate::table::{Cell, OutputTable};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The supported vendor layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Acs,
    Brc,
    Panu,
    Sinmix,
    Gw,
    Island,
}

impl Profile {
    pub fn all() -> &'static [Profile] {
        &[
            Profile::Acs,
            Profile::Brc,
            Profile::Panu,
            Profile::Sinmix,
            Profile::Gw,
            Profile::Island,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Profile::Acs => "ACS",
            Profile::Brc => "BRC",
            Profile::Panu => "PANU",
            Profile::Sinmix => "SINMIX",
            Profile::Gw => "GW",
            Profile::Island => "ISLAND",
        }
    }

    /// Whether the profile reads scans rather than a text layer.
    pub fn needs_ocr(&self) -> bool {
        matches!(
            self,
            Profile::Brc | Profile::Sinmix | Profile::Gw | Profile::Island
        )
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACS" => Ok(Profile::Acs),
            "BRC" => Ok(Profile::Brc),
            "PANU" => Ok(Profile::Panu),
            "SINMIX" => Ok(Profile::Sinmix),
            "GW" => Ok(Profile::Gw),
            "ISLAND" => Ok(Profile::Island),
            other => Err(format!("unknown profile: {other}")),
        }
    }
}

/// One processed file's contribution to the batch table.
#[derive(Debug)]
pub struct FileBlock {
    /// Rows for this file (no trailing separator; the batch adds it).
    pub table: OutputTable,
    /// Pages that yielded nothing usable (SINMIX contrast sweep).
    pub failed_pages: Vec<u32>,
    /// Difference between computed and printed subtotal, when both are
    /// known and disagree.
    pub subtotal_discrepancy: Option<rust_decimal::Decimal>,
}

impl FileBlock {
    pub fn new(table: OutputTable) -> Self {
        Self {
            table,
            failed_pages: Vec::new(),
            subtotal_discrepancy: None,
        }
    }
}

/// One vendor's end-to-end pipeline over a single file, plus its
/// spreadsheet-annotation hooks. Implementations are pure given their
/// file inputs.
pub trait VendorPipeline {
    /// Output schema, fixed per vendor.
    fn columns(&self) -> &'static [&'static str];

    /// Acquire, extract and aggregate one PDF into an output block.
    fn process_file(&self, path: &Path) -> Result<FileBlock>;

    /// Load the companion spreadsheet. Profiles without annotation
    /// support accept and ignore it.
    fn load_annotations(&self, _sheet: &Path) -> Result<AnnotationTable> {
        Ok(AnnotationTable::default())
    }

    /// Fill annotation columns across the accumulated cross-file table.
    fn apply_annotations(&self, _table: &mut OutputTable, _annotations: &AnnotationTable) {}
}

/// Construct the pipeline for a profile, resolving external OCR
/// binaries only when the profile needs them.
pub fn build_pipeline(profile: Profile, config: &OcrConfig) -> Result<Box<dyn VendorPipeline>> {
    Ok(match profile {
        Profile::Acs => Box::new(acs::AcsPipeline),
        Profile::Panu => Box::new(panu::PanuPipeline),
        Profile::Brc => {
            Box::new(brc::BrcPipeline::new(ocr_stack(config)?, config.render_dpi))
        }
        Profile::Gw => Box::new(gw::GwPipeline::new(ocr_stack(config)?, config.render_dpi_high)),
        Profile::Island => {
            Box::new(island::IslandPipeline::new(ocr_stack(config)?, config.render_dpi))
        }
        Profile::Sinmix => Box::new(sinmix::SinmixPipeline::new(
            ocr_stack(config)?,
            config.render_dpi,
            config.max_contrast,
        )),
    })
}

/// Renderer + engine pair for scan-based profiles.
pub struct OcrStack {
    pub renderer: Box<dyn PageRenderer>,
    pub engine: Box<dyn OcrEngine>,
}

fn ocr_stack(config: &OcrConfig) -> Result<OcrStack> {
    Ok(OcrStack {
        renderer: Box::new(PdftoppmRenderer::from_config(config)?),
        engine: Box::new(TesseractEngine::from_config(config)?),
    })
}

/// Page ranges of each delivery order in a scanned multi-DO file: a
/// range ends on every page that printed a subtotal. Trailing pages
/// without one belong to no range.
pub(crate) fn delivery_ranges(subtotal_pages: &[bool]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (i, has_subtotal) in subtotal_pages.iter().enumerate() {
        if *has_subtotal {
            ranges.push((start, i));
            start = i + 1;
        }
    }
    ranges
}

/// Most frequent present value among per-page reads of the same field.
/// Scan noise corrupts individual pages; the majority within a
/// delivery-order range is taken as the true value. Ties go to the
/// value seen first.
pub(crate) fn majority(values: &[Option<String>]) -> Option<String> {
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }

    let mut best: Option<&String> = None;
    let mut best_count = 0;
    for value in values.iter().flatten() {
        let count = counts[value.as_str()];
        if count > best_count {
            best = Some(value);
            best_count = count;
        }
    }
    best.cloned()
}

/// Left-join annotation fields onto a table: for every row whose DO
/// cell has a matching record, fill the named columns from the record.
/// Rows without a match keep empty cells; unmatched records are simply
/// never read.
pub(crate) fn fill_annotation_columns(
    table: &mut OutputTable,
    annotations: &AnnotationTable,
    do_column: &str,
    fields: &[(&str, fn(&AnnotationRecord) -> Option<&String>)],
) {
    let Some(do_idx) = table.column_index(do_column) else {
        return;
    };
    let targets: Vec<(usize, fn(&AnnotationRecord) -> Option<&String>)> = fields
        .iter()
        .filter_map(|(name, get)| table.column_index(name).map(|i| (i, *get)))
        .collect();

    for row in &mut table.rows {
        let Cell::Text(do_number) = &row[do_idx] else {
            continue;
        };
        let Some(record) = annotations.get(do_number) else {
            continue;
        };
        for (idx, get) in &targets {
            if let Some(value) = get(record) {
                row[*idx] = Cell::text(value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profile_round_trip_names() {
        for profile in Profile::all() {
            assert_eq!(Profile::from_str(profile.name()).unwrap(), *profile);
        }
        assert!(Profile::from_str("XYZ").is_err());
    }

    #[test]
    fn test_delivery_ranges_split_on_subtotal_pages() {
        assert_eq!(
            delivery_ranges(&[false, true, false, true]),
            vec![(0, 1), (2, 3)]
        );
        // trailing pages without a subtotal belong to no range
        assert_eq!(delivery_ranges(&[true, false]), vec![(0, 0)]);
        assert_eq!(delivery_ranges(&[false, false]), vec![]);
    }

    #[test]
    fn test_majority_repairs_misreads() {
        let values = vec![
            Some("12345678".to_string()),
            Some("12845678".to_string()),
            Some("12345678".to_string()),
            None,
        ];
        assert_eq!(majority(&values).as_deref(), Some("12345678"));
        assert_eq!(majority(&[None, None]), None);
        // ties go to the value seen first
        let tied = vec![Some("a".to_string()), Some("b".to_string())];
        assert_eq!(majority(&tied).as_deref(), Some("a"));
    }

    #[test]
    fn test_fill_annotation_columns_is_left_join() {
        let mut table = OutputTable::new(vec!["DO No.", "Signee"]);
        table.push_row(vec![Cell::text("11111111"), Cell::Empty]);
        table.push_row(vec![Cell::text("22222222"), Cell::Empty]);

        let mut annotations = AnnotationTable::default();
        annotations_insert(&mut annotations, "11111111", "Lee");
        // A record with no matching invoice row never appears
        annotations_insert(&mut annotations, "99999999", "Ghost");

        fill_annotation_columns(
            &mut table,
            &annotations,
            "DO No.",
            &[("Signee", |r| r.signee.as_ref())],
        );

        assert_eq!(table.rows[0][1], Cell::text("Lee"));
        assert_eq!(table.rows[1][1], Cell::Empty);
        assert_eq!(table.len(), 2);
    }

    fn annotations_insert(table: &mut AnnotationTable, do_number: &str, signee: &str) {
        let record = AnnotationRecord {
            do_number: do_number.to_string(),
            signee: Some(signee.to_string()),
            ..Default::default()
        };
        table.insert(record);
    }
}
