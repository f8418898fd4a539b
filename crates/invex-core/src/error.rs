//! Error types for the invex-core library.

use thiserror::Error;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Page acquisition error (PDF text, raster, OCR, table grid).
    #[error("acquisition error: {0}")]
    Acquire(#[from] AcquireError),

    /// Field extraction / decoding error.
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Spreadsheet annotation error.
    #[error("spreadsheet error: {0}")]
    Sheet(#[from] SheetError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while acquiring text or tables from a page.
#[derive(Error, Debug)]
pub enum AcquireError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract embedded text.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Page rasterization through the external renderer failed.
    #[error("failed to rasterize page {page}: {reason}")]
    Raster { page: u32, reason: String },

    /// Text recognition through the external OCR binary failed.
    #[error("OCR failed: {0}")]
    Recognition(String),

    /// A required external binary could not be located.
    #[error("executable not found on PATH: {0}")]
    BinaryNotFound(String),

    /// No table header row was found among the detected cells.
    #[error("table header not found on page {0}")]
    TableHeaderNotFound(u32),

    /// Detected table columns do not line up across pages.
    #[error("table column mismatch: expected {expected} columns, found {found}")]
    ColumnMismatch { expected: usize, found: usize },
}

/// Errors raised during field extraction and description decoding.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Failed to parse a captured value.
    #[error("failed to parse {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    /// A decoded grade code has no entry in the grade table.
    #[error("unknown concrete grade code: {0:?}")]
    UnknownGrade(String),

    /// A quantity has no entry in the underload surcharge rate table.
    #[error("no surcharge rate for quantity {0}")]
    SurchargeRate(String),

    /// An order reference did not map to any known subcontractor.
    #[error("unrecognized order reference: {0:?}")]
    UnknownOrderRef(String),

    /// No line-item rows were recognized in the document.
    #[error("no line items found")]
    NoLineItems,
}

/// Errors raised while reading the companion spreadsheet.
#[derive(Error, Debug)]
pub enum SheetError {
    /// Failed to open/parse the workbook.
    #[error("failed to open spreadsheet: {0}")]
    Open(String),

    /// The workbook has no sheets.
    #[error("spreadsheet has no sheets")]
    Empty,

    /// No row with enough populated cells was found.
    #[error("header row not found in spreadsheet")]
    HeaderNotFound,

    /// A required column is missing from the located header row.
    #[error("missing spreadsheet column: {0:?}")]
    MissingColumn(String),
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
