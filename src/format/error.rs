//! Error types for sidecar and raster persistence.

use thiserror::Error;

/// Errors that can occur while reading or writing a layer's files.
#[derive(Error, Debug)]
pub enum SidecarError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raster encode or decode error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl SidecarError {
    /// Whether this error is a missing file, which is a valid state rather
    /// than a failure for both rasters and sidecars.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SidecarError::Io(err) if err.kind() == std::io::ErrorKind::NotFound)
    }
}
