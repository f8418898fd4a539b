//! Page rasterization and image preprocessing for OCR.

use crate::config::OcrConfig;
use crate::error::AcquireError;
use crate::acquire::resolve_binary;
use image::GrayImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Renders a single PDF page to a grayscale image.
pub trait PageRenderer {
    /// Render `page` (1-indexed) at the given DPI.
    fn render(&self, pdf: &Path, page: u32, dpi: u32) -> Result<GrayImage, AcquireError>;
}

/// Renderer shelling out to poppler's `pdftoppm`.
pub struct PdftoppmRenderer {
    binary: PathBuf,
}

impl PdftoppmRenderer {
    pub fn from_config(config: &OcrConfig) -> Result<Self, AcquireError> {
        let binary = resolve_binary(config.pdftoppm_path.as_deref(), "pdftoppm")?;
        Ok(Self { binary })
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn render(&self, pdf: &Path, page: u32, dpi: u32) -> Result<GrayImage, AcquireError> {
        let dir = tempfile::tempdir().map_err(|e| AcquireError::Raster {
            page,
            reason: e.to_string(),
        })?;
        let prefix = dir.path().join("page");

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-gray")
            .args(["-r", &dpi.to_string()])
            .args(["-f", &page.to_string()])
            .args(["-l", &page.to_string()])
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| AcquireError::Raster {
                page,
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AcquireError::Raster {
                page,
                reason: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        // pdftoppm appends the page number to the prefix
        let produced = std::fs::read_dir(dir.path())
            .map_err(|e| AcquireError::Raster {
                page,
                reason: e.to_string(),
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|p| p.extension().is_some_and(|ext| ext == "png"))
            .ok_or_else(|| AcquireError::Raster {
                page,
                reason: "renderer produced no image".to_string(),
            })?;

        debug!("rasterized page {} at {} dpi", page, dpi);

        let img = image::open(&produced).map_err(|e| AcquireError::Raster {
            page,
            reason: e.to_string(),
        })?;
        Ok(img.to_luma8())
    }
}

/// Binarize a grayscale page with an automatically chosen (Otsu)
/// threshold, separating print from background before recognition.
pub fn binarize(image: &GrayImage) -> GrayImage {
    let threshold = otsu_threshold(image);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
    }
    out
}

/// Linear contrast enhancement around mid-gray. `factor` 1 is identity;
/// the SINMIX pipeline sweeps 1..=max until a DO number is readable.
pub fn enhance_contrast(image: &GrayImage, factor: u32) -> GrayImage {
    if factor <= 1 {
        return image.clone();
    }
    let factor = factor as f32;
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let value = 128.0 + (pixel.0[0] as f32 - 128.0) * factor;
        pixel.0[0] = value.clamp(0.0, 255.0) as u8;
    }
    out
}

fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u32; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total = image.pixels().len() as f64;
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(v, &count)| v as f64 * count as f64)
        .sum();

    let mut sum_bg = 0.0;
    let mut weight_bg = 0.0;
    let mut best_variance = 0.0;
    let mut best_threshold = 0u8;

    for (value, &count) in histogram.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }

        sum_bg += value as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_threshold = value as u8;
        }
    }

    best_threshold
}
