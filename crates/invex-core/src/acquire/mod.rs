//! Page acquisition: native PDF text, OCR over rasterized pages, and
//! whitespace-grid table detection.

pub mod grid;
pub mod ocr;
pub mod pdf;
pub mod raster;

use crate::error::AcquireError;
use std::path::{Path, PathBuf};

/// Resolve an external binary: an explicitly configured path wins,
/// otherwise the first match on PATH.
pub fn resolve_binary(configured: Option<&Path>, name: &str) -> Result<PathBuf, AcquireError> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(AcquireError::BinaryNotFound(
            path.to_string_lossy().into_owned(),
        ));
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| AcquireError::BinaryNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_binary_missing() {
        let err = resolve_binary(None, "definitely-not-a-real-binary-xyz").unwrap_err();
        assert!(matches!(err, AcquireError::BinaryNotFound(_)));
    }

    #[test]
    fn test_resolve_binary_configured_path_must_exist() {
        let err = resolve_binary(Some(Path::new("/nonexistent/tesseract")), "tesseract");
        assert!(err.is_err());
    }
}
