//! Sidecar record types and file I/O.
//!
//! The sidecar is a JSON document written next to its raster:
//!
//! ```json
//! {
//!   "name": "Vegetation Density",
//!   "shapes": { "Roi Poly": [ { "name": "Roi Poly", "shape": "polygon", ... } ] },
//!   "position": [12.0, -4.5],
//!   "scale": 1.25,
//!   "colormap": [[0, 0, 0], [255, 255, 255]],
//!   "maprange": [0.0, 1.0],
//!   "transform": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!   "flags": "color"
//! }
//! ```
//!
//! All keys are optional on load; absent keys keep whatever the layer
//! already holds.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{file, style};
use crate::format::error::SidecarError;
use crate::geometry::{AffineTransform, ImagePoint};
use crate::model::{RasterMode, Shape, ShapeForm};

/// Serialized form of one [`Shape`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeRecord {
    #[serde(default)]
    pub name: String,

    /// Form tag: `rectangle`, `ellipse`, `polygon`, `polyline` or `line`.
    #[serde(rename = "shape", default)]
    pub form: String,

    #[serde(default)]
    pub points: Vec<[f64; 2]>,

    #[serde(rename = "lineColor", default = "default_line_color")]
    pub line_color: [u8; 3],

    #[serde(rename = "lineWidth", default = "default_line_width")]
    pub line_width: u32,

    #[serde(default = "default_true")]
    pub visible: bool,

    #[serde(default)]
    pub drawing: bool,
}

fn default_line_color() -> [u8; 3] {
    style::DEFAULT_LINE_COLOR
}

fn default_line_width() -> u32 {
    style::DEFAULT_LINE_WIDTH
}

fn default_true() -> bool {
    true
}

impl ShapeRecord {
    pub fn from_shape(shape: &Shape) -> Self {
        Self {
            name: shape.name.clone(),
            form: shape.form.tag().to_string(),
            points: shape.points.iter().map(|p| [p.x, p.y]).collect(),
            line_color: shape.line_color,
            line_width: shape.line_width,
            visible: shape.visible,
            drawing: shape.drawing,
        }
    }

    /// Rebuild the in-memory shape. Returns `None` when the form tag is not
    /// one this version understands; the caller logs and skips the record.
    pub fn to_shape(&self) -> Option<Shape> {
        let form = ShapeForm::from_tag(&self.form)?;
        let mut shape = Shape::new(form, &self.name)
            .with_style(self.line_color, self.line_width)
            .with_points(
                self.points
                    .iter()
                    .map(|p| ImagePoint::new(p[0], p[1]))
                    .collect(),
            );
        shape.visible = self.visible;
        shape.drawing = self.drawing;
        Some(shape)
    }
}

/// Serialized form of a layer's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRecord {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub shapes: BTreeMap<String, Vec<ShapeRecord>>,

    #[serde(default = "default_position")]
    pub position: [f64; 2],

    #[serde(default = "default_scale")]
    pub scale: f64,

    #[serde(default)]
    pub colormap: Option<Vec<[u8; 3]>>,

    #[serde(default = "default_maprange")]
    pub maprange: [f64; 2],

    /// 2x3 or 3x3 geographic transform matrix.
    #[serde(default)]
    pub transform: Option<Vec<Vec<f64>>>,

    /// Raster decode mode marker.
    #[serde(default)]
    pub flags: Option<RasterMode>,
}

fn default_position() -> [f64; 2] {
    [0.0, 0.0]
}

fn default_scale() -> f64 {
    1.0
}

fn default_maprange() -> [f64; 2] {
    [0.0, 1.0]
}

impl LayerRecord {
    /// Decode the transform rows, logging and dropping a malformed matrix.
    pub fn decoded_transform(&self) -> Option<AffineTransform> {
        let rows = self.transform.as_ref()?;
        let transform = AffineTransform::from_rows(rows);
        if transform.is_none() {
            log::warn!("sidecar transform has invalid dimensions, ignoring");
        }
        transform
    }
}

/// Path of the sidecar belonging to a raster file (extension swapped).
pub fn sidecar_path(raster_path: &Path) -> PathBuf {
    raster_path.with_extension(file::SIDECAR_EXT)
}

/// Read and parse a sidecar file.
pub fn read(path: &Path) -> Result<LayerRecord, SidecarError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Write a sidecar file.
pub fn write(path: &Path, record: &LayerRecord) -> Result<(), SidecarError> {
    let json = serde_json::to_string(record)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_shape() -> Shape {
        Shape::new(ShapeForm::Polygon, "Roi Poly")
            .with_style([255, 0, 0], 3)
            .with_points(vec![
                ImagePoint::new(0.5, 0.25),
                ImagePoint::new(10.0, 0.0),
                ImagePoint::new(10.0, 10.0),
                ImagePoint::new(0.0, 10.0),
            ])
    }

    #[test]
    fn test_shape_record_roundtrip() {
        let shape = square_shape();
        let record = ShapeRecord::from_shape(&shape);
        let json = serde_json::to_string(&record).unwrap();
        let parsed: ShapeRecord = serde_json::from_str(&json).unwrap();
        let restored = parsed.to_shape().unwrap();
        assert_eq!(restored, shape);
    }

    #[test]
    fn test_layer_record_roundtrip() {
        let mut shapes = BTreeMap::new();
        shapes.insert(
            "Roi Poly".to_string(),
            vec![ShapeRecord::from_shape(&square_shape())],
        );
        let record = LayerRecord {
            name: "Vegetation Density".to_string(),
            shapes,
            position: [12.0, -4.5],
            scale: 1.25,
            colormap: Some(vec![[0, 0, 0], [128, 64, 32], [255, 255, 255]]),
            maprange: [0.0, 0.73],
            transform: Some(AffineTransform::identity().to_rows()),
            flags: Some(RasterMode::Color),
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: LayerRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.name, record.name);
        assert_eq!(parsed.position, record.position);
        assert_eq!(parsed.scale, record.scale);
        assert_eq!(parsed.colormap, record.colormap);
        assert_eq!(parsed.maprange, record.maprange);
        assert_eq!(parsed.decoded_transform(), Some(AffineTransform::identity()));
        assert_eq!(parsed.flags, Some(RasterMode::Color));
        let restored = parsed.shapes["Roi Poly"][0].to_shape().unwrap();
        assert_eq!(restored, square_shape());
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let record: LayerRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.name, "");
        assert!(record.shapes.is_empty());
        assert_eq!(record.position, [0.0, 0.0]);
        assert_eq!(record.scale, 1.0);
        assert_eq!(record.colormap, None);
        assert_eq!(record.maprange, [0.0, 1.0]);
        assert_eq!(record.decoded_transform(), None);
        assert_eq!(record.flags, None);

        let shape: ShapeRecord = serde_json::from_str(r#"{"shape": "line"}"#).unwrap();
        assert_eq!(shape.line_color, [0, 0, 0]);
        assert_eq!(shape.line_width, 2);
        assert!(shape.visible);
        assert!(!shape.drawing);
    }

    #[test]
    fn test_unknown_form_tag_is_rejected() {
        let record: ShapeRecord = serde_json::from_str(r#"{"shape": "torus"}"#).unwrap();
        assert!(record.to_shape().is_none());
    }

    #[test]
    fn test_3x3_transform_is_accepted() {
        let json = r#"{"transform": [[2.0, 0.0, 1.0], [0.0, 2.0, 1.0], [0.0, 0.0, 1.0]]}"#;
        let record: LayerRecord = serde_json::from_str(json).unwrap();
        let transform = record.decoded_transform().unwrap();
        assert_eq!(transform.rows()[0], [2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_sidecar_path_swaps_extension() {
        assert_eq!(
            sidecar_path(Path::new("/tmp/project/veg_mask.png")),
            PathBuf::from("/tmp/project/veg_mask.im")
        );
    }

    #[test]
    fn test_read_write_file() {
        let path = std::env::temp_dir().join("cropmap_sidecar_rw_test.im");
        let record = LayerRecord {
            name: "Crop Field".to_string(),
            shapes: BTreeMap::new(),
            position: [1.0, 2.0],
            scale: 2.0,
            colormap: None,
            maprange: [0.0, 1.0],
            transform: None,
            flags: Some(RasterMode::Grayscale),
        };
        write(&path, &record).unwrap();
        let loaded = read(&path).unwrap();
        assert_eq!(loaded.name, "Crop Field");
        assert_eq!(loaded.flags, Some(RasterMode::Grayscale));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_corrupt_sidecar_is_an_error() {
        let path = std::env::temp_dir().join("cropmap_sidecar_corrupt_test.im");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(read(&path), Err(SidecarError::Json(_))));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_sidecar_is_not_found() {
        let path = std::env::temp_dir().join("cropmap_sidecar_missing_test.im");
        let err = read(&path).unwrap_err();
        assert!(err.is_not_found());
    }
}
