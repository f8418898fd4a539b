//! Batch driver: runs one vendor pipeline over a list of files,
//! collecting failures per file instead of aborting the batch.
//!
//! File blocks are concatenated in input order, each followed by one
//! blank separator row. The annotation spreadsheet, when present, is
//! joined once over the accumulated table at the end.

use crate::error::Result;
use crate::profiles::VendorPipeline;
use crate::table::OutputTable;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of one input file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Extraction succeeded; the file's rows are in the batch table.
    Extracted {
        rows: usize,
        /// Pages that yielded nothing usable.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        failed_pages: Vec<u32>,
        /// Computed-vs-printed subtotal difference, when both are known
        /// and disagree. Informational only.
        #[serde(skip_serializing_if = "Option::is_none")]
        subtotal_discrepancy: Option<Decimal>,
    },
    /// Extraction failed; no rows from this file.
    Failed { error: String },
}

/// Per-file entry in the batch report.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_name: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }
}

/// Accumulated result of one batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Concatenated output rows, input order preserved.
    pub table: OutputTable,
    /// One report per input file, input order preserved.
    pub reports: Vec<FileReport>,
}

impl BatchOutcome {
    pub fn failure_count(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failure()).count()
    }
}

/// Run `pipeline` over every PDF, in order. A file that fails to
/// extract is reported and skipped; the batch keeps going. `progress`
/// is called once per file with the number of files completed so far.
pub fn run(
    pipeline: &dyn VendorPipeline,
    pdf_paths: &[PathBuf],
    sheet_path: Option<&Path>,
    mut progress: impl FnMut(usize, &FileReport),
) -> Result<BatchOutcome> {
    let mut table = OutputTable::new(pipeline.columns().to_vec());
    let mut reports = Vec::with_capacity(pdf_paths.len());

    for (done, path) in pdf_paths.iter().enumerate() {
        let file_name = file_name_of(path);
        let status = match pipeline.process_file(path) {
            Ok(block) => {
                debug!("{}: {} rows", file_name, block.table.len());
                let status = FileStatus::Extracted {
                    rows: block.table.len(),
                    failed_pages: block.failed_pages,
                    subtotal_discrepancy: block.subtotal_discrepancy,
                };
                table.append(block.table);
                status
            }
            Err(e) => {
                warn!("{}: {}", file_name, e);
                FileStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        let report = FileReport { file_name, status };
        progress(done + 1, &report);
        reports.push(report);
    }

    if let Some(sheet) = sheet_path {
        let annotations = pipeline.load_annotations(sheet)?;
        debug!("loaded {} annotation records", annotations.len());
        pipeline.apply_annotations(&mut table, &annotations);
    }

    Ok(BatchOutcome { table, reports })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::AnnotationTable;
    use crate::error::{ExtractError, InvexError};
    use crate::model::AnnotationRecord;
    use crate::profiles::FileBlock;
    use crate::table::Cell;
    use pretty_assertions::assert_eq;

    /// Pipeline that fails on any path containing "bad" and otherwise
    /// emits one row holding the file's DO number.
    struct StubPipeline;

    impl VendorPipeline for StubPipeline {
        fn columns(&self) -> &'static [&'static str] {
            &["DO No.", "Signee"]
        }

        fn process_file(&self, path: &Path) -> Result<FileBlock> {
            if path.to_string_lossy().contains("bad") {
                return Err(InvexError::Extract(ExtractError::NoLineItems));
            }
            let mut table = OutputTable::new(self.columns().to_vec());
            table.push_row(vec![Cell::text("11111111"), Cell::Empty]);
            Ok(FileBlock::new(table))
        }

        fn load_annotations(&self, _sheet: &Path) -> Result<AnnotationTable> {
            let mut annotations = AnnotationTable::default();
            annotations.insert(AnnotationRecord {
                do_number: "11111111".to_string(),
                signee: Some("Lee".to_string()),
                ..Default::default()
            });
            Ok(annotations)
        }

        fn apply_annotations(&self, table: &mut OutputTable, annotations: &AnnotationTable) {
            crate::profiles::fill_annotation_columns(
                table,
                annotations,
                "DO No.",
                &[("Signee", |r| r.signee.as_ref())],
            );
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_failure_skips_file_but_not_batch() {
        let outcome = run(
            &StubPipeline,
            &paths(&["a.pdf", "bad.pdf", "c.pdf"]),
            None,
            |_, _| {},
        )
        .unwrap();

        assert_eq!(outcome.reports.len(), 3);
        assert_eq!(outcome.failure_count(), 1);
        assert!(outcome.reports[1].is_failure());
        // two good files, each block closed by its separator row
        assert_eq!(outcome.table.len(), 4);
        assert!(outcome.table.rows[1].iter().all(Cell::is_empty));
        assert!(outcome.table.rows[3].iter().all(Cell::is_empty));
    }

    #[test]
    fn test_single_file_block_ends_with_separator() {
        let outcome = run(&StubPipeline, &paths(&["a.pdf"]), None, |_, _| {}).unwrap();
        // one entry row plus the blank separator closing the block
        assert_eq!(outcome.table.len(), 2);
        assert!(outcome.table.rows[1].iter().all(Cell::is_empty));
    }

    #[test]
    fn test_progress_called_per_file() {
        let mut seen = Vec::new();
        run(&StubPipeline, &paths(&["a.pdf", "b.pdf"]), None, |done, report| {
            seen.push((done, report.file_name.clone()));
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![(1, "a.pdf".to_string()), (2, "b.pdf".to_string())]
        );
    }

    #[test]
    fn test_annotations_joined_once_over_whole_batch() {
        let outcome = run(
            &StubPipeline,
            &paths(&["a.pdf", "b.pdf"]),
            Some(Path::new("summary.xlsx")),
            |_, _| {},
        )
        .unwrap();

        let signee = outcome.table.column_index("Signee").unwrap();
        assert_eq!(outcome.table.rows[0][signee], Cell::text("Lee"));
        assert_eq!(outcome.table.rows[2][signee], Cell::text("Lee"));
        // separator row untouched by the join
        assert!(outcome.table.rows[1][signee].is_empty());
    }
}
