//! Text recognition through an external OCR binary.

use crate::config::OcrConfig;
use crate::error::AcquireError;
use crate::acquire::raster::{binarize, PageRenderer};
use crate::acquire::resolve_binary;
use image::GrayImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Text recognition over a preprocessed page image.
pub trait OcrEngine {
    fn recognize(&self, image: &GrayImage) -> Result<String, AcquireError>;
}

/// Engine shelling out to the `tesseract` binary.
pub struct TesseractEngine {
    binary: PathBuf,
}

impl TesseractEngine {
    pub fn from_config(config: &OcrConfig) -> Result<Self, AcquireError> {
        let binary = resolve_binary(config.tesseract_path.as_deref(), "tesseract")?;
        Ok(Self { binary })
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &GrayImage) -> Result<String, AcquireError> {
        let dir = tempfile::tempdir().map_err(|e| AcquireError::Recognition(e.to_string()))?;
        let img_path = dir.path().join("page.png");
        image
            .save(&img_path)
            .map_err(|e| AcquireError::Recognition(e.to_string()))?;

        let output = Command::new(&self.binary)
            .arg(&img_path)
            .arg("stdout")
            .output()
            .map_err(|e| AcquireError::Recognition(e.to_string()))?;

        if !output.status.success() {
            return Err(AcquireError::Recognition(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Rasterize one page, binarize it and recognize its text, returning
/// trimmed lines.
pub fn ocr_page_lines(
    renderer: &dyn PageRenderer,
    engine: &dyn OcrEngine,
    pdf: &Path,
    page: u32,
    dpi: u32,
) -> Result<Vec<String>, AcquireError> {
    let rendered = renderer.render(pdf, page, dpi)?;
    let binary = binarize(&rendered);
    let text = engine.recognize(&binary)?;
    debug!("OCR page {}: {} chars", page, text.len());
    Ok(text.lines().map(|l| l.trim_end().to_string()).collect())
}
