//! On-disk persistence for layer metadata.
//!
//! Every raster file can carry a sidecar file (same base name, `.im`
//! extension) holding the layer's shapes, view state, color mapping and
//! geographic transform. The schema evolves additively: unknown keys are
//! ignored and missing keys fall back to the in-memory defaults.

mod error;
pub mod sidecar;

pub use error::SidecarError;
pub use sidecar::{LayerRecord, ShapeRecord};
