//! Core library for vendor invoice line-item extraction.
//!
//! This crate provides:
//! - Page acquisition (PDF text layer, rasterization, OCR, cell grids)
//! - Six vendor profiles (ACS, BRC, PANU, SINMIX, GW, ISLAND) behind a
//!   common pipeline trait
//! - Description decoding (concrete grades, slump, retardants) and
//!   underload surcharge synthesis
//! - Companion-spreadsheet annotation joins keyed by DO number
//! - A collect-and-continue batch driver with per-file reports

pub mod acquire;
pub mod aggregate;
pub mod annotate;
pub mod batch;
pub mod config;
pub mod decode;
pub mod error;
pub mod extract;
pub mod model;
pub mod profiles;
pub mod table;

pub use batch::{BatchOutcome, FileReport, FileStatus};
pub use config::{InvexConfig, OcrConfig};
pub use error::{InvexError, Result};
pub use model::{AnnotationRecord, HeaderFields, InvoiceDocument, LineItemEntry};
pub use profiles::{build_pipeline, FileBlock, Profile, VendorPipeline};
pub use table::{Cell, OutputTable};
