//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the invex pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// Directory holding uploaded invoice files.
    pub upload_dir: PathBuf,

    /// Directory for batch output workbooks.
    pub output_dir: PathBuf,

    /// OCR / rasterization configuration.
    pub ocr: OcrConfig,

    /// Profile names offered to the caller.
    pub profiles: Vec<String>,
}

impl Default for InvexConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
            ocr: OcrConfig::default(),
            profiles: crate::profiles::Profile::all()
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
        }
    }
}

/// OCR and rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Path to the tesseract binary. Resolved from PATH when unset.
    pub tesseract_path: Option<PathBuf>,

    /// Path to the pdftoppm binary. Resolved from PATH when unset.
    pub pdftoppm_path: Option<PathBuf>,

    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// DPI for high-resolution scans (GW-style ruled tables).
    pub render_dpi_high: u32,

    /// Maximum contrast level for the enhancement sweep.
    pub max_contrast: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            pdftoppm_path: None,
            render_dpi: 300,
            render_dpi_high: 500,
            max_contrast: 6,
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
