//! A raster layer with its vector shapes and persistence metadata.

use std::collections::BTreeMap;
use std::path::PathBuf;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::sidecar::{self, LayerRecord, ShapeRecord};
use crate::format::SidecarError;
use crate::geometry::{AffineTransform, GeoPoint, ImagePoint, Size};
use crate::model::Shape;

/// Decode mode for a layer's raster file.
///
/// Mask layers are stored and decoded as single-channel grayscale; photo and
/// density layers as color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterMode {
    #[default]
    Color,
    Grayscale,
}

/// Geographic query attempted on a layer without calibration.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("layer has no geographic transform")]
pub struct NoTransform;

/// One named raster image plus its associated vector shapes and view state.
///
/// A layer whose raster file does not exist is "empty": it holds no pixel
/// data and must not be bound to the canvas. Empty is a valid state, not an
/// error.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub file_path: PathBuf,
    pub mode: RasterMode,
    /// Decoded raster, absent while the layer is empty.
    pub image: Option<DynamicImage>,
    /// Shape-category name to ordered shape list.
    pub shapes: BTreeMap<String, Vec<Shape>>,
    /// Last-used view offset, persisted for UX continuity.
    pub view_position: [f64; 2],
    /// Last-used zoom, persisted for UX continuity.
    pub view_scale: f64,
    /// Color ramp for layers that visualize a continuous quantity.
    pub colormap: Option<Vec<[u8; 3]>>,
    /// Value range the colormap spans.
    pub map_range: [f64; 2],
    /// Pixel-to-geographic calibration, absent until the layer has been
    /// geo-normalized.
    pub transform: Option<AffineTransform>,
}

impl Layer {
    /// Create a layer bound to a raster path and load whatever exists on
    /// disk.
    pub fn open(name: impl Into<String>, file_path: impl Into<PathBuf>, mode: RasterMode) -> Self {
        let mut layer = Self {
            name: name.into(),
            file_path: file_path.into(),
            mode,
            image: None,
            shapes: BTreeMap::new(),
            view_position: [0.0, 0.0],
            view_scale: 1.0,
            colormap: None,
            map_range: [0.0, 1.0],
            transform: None,
        };
        layer.load();
        layer
    }

    /// Read the raster and its sidecar from disk.
    ///
    /// A missing raster leaves the layer empty. A missing sidecar leaves the
    /// metadata at its defaults. An unreadable or corrupt sidecar is logged
    /// and ignored; the raster still loads.
    pub fn load(&mut self) {
        if !self.file_path.is_file() {
            log::debug!("layer '{}' has no raster at {:?}", self.name, self.file_path);
            self.image = None;
            return;
        }

        match image::open(&self.file_path) {
            Ok(decoded) => self.image = Some(decode_raster(decoded, self.mode)),
            Err(err) => {
                log::error!("failed to decode raster {:?}: {}", self.file_path, err);
                self.image = None;
                return;
            }
        }

        let sidecar_path = sidecar::sidecar_path(&self.file_path);
        match sidecar::read(&sidecar_path) {
            Ok(record) => self.apply_record(record),
            Err(err) if err.is_not_found() => {}
            Err(err) => {
                log::warn!("ignoring unreadable sidecar {:?}: {}", sidecar_path, err);
            }
        }
    }

    /// Write the raster and its sidecar to disk.
    ///
    /// A no-op when the layer has no path or no pixel data. Failures are not
    /// fatal: in-memory state is untouched and the caller surfaces the error
    /// as a notification so the user can retry.
    pub fn save(&self) -> Result<(), SidecarError> {
        let Some(image) = &self.image else {
            return Ok(());
        };
        if self.file_path.as_os_str().is_empty() {
            return Ok(());
        }

        image.save(&self.file_path)?;
        sidecar::write(&sidecar::sidecar_path(&self.file_path), &self.to_record())?;
        log::debug!("saved layer '{}' to {:?}", self.name, self.file_path);
        Ok(())
    }

    /// Whether the layer holds no pixel data.
    pub fn is_empty(&self) -> bool {
        self.image.is_none()
    }

    /// Raster dimensions, if any pixels are held.
    pub fn image_size(&self) -> Option<Size> {
        self.image
            .as_ref()
            .map(|img| Size::new(f64::from(img.width()), f64::from(img.height())))
    }

    /// Whether the view state still has its construction defaults, meaning
    /// the layer has never been shown and should be fit to its container.
    pub fn has_default_view(&self) -> bool {
        self.view_scale == 1.0 && self.view_position == [0.0, 0.0]
    }

    /// Replace the raster pixels, e.g. with an analysis result.
    pub fn set_image(&mut self, image: DynamicImage) {
        self.image = Some(image);
    }

    /// Read accessor for one shape category.
    pub fn shapes_for(&self, name: &str) -> Option<&[Shape]> {
        self.shapes.get(name).map(Vec::as_slice)
    }

    /// RGB color of the raster pixel at an image-space point, if inside the
    /// raster.
    pub fn probe_color(&self, point: ImagePoint) -> Option<[u8; 3]> {
        let image = self.image.as_ref()?;
        if point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let (x, y) = (point.x as u32, point.y as u32);
        if x >= image.width() || y >= image.height() {
            return None;
        }
        let pixel = image.get_pixel(x, y);
        Some([pixel[0], pixel[1], pixel[2]])
    }

    /// Map an image pixel to geographic coordinates through the layer's
    /// transform.
    pub fn pixel_to_geo(&self, point: ImagePoint) -> Result<GeoPoint, NoTransform> {
        self.transform
            .as_ref()
            .map(|t| t.apply(point))
            .ok_or(NoTransform)
    }

    /// Merge recognized sidecar fields onto the current state.
    fn apply_record(&mut self, record: LayerRecord) {
        if let Some(transform) = record.decoded_transform() {
            self.transform = Some(transform);
        }
        if !record.name.is_empty() {
            self.name = record.name;
        }
        self.view_position = record.position;
        self.view_scale = record.scale;
        if record.colormap.is_some() {
            self.colormap = record.colormap;
        }
        self.map_range = record.maprange;
        if let Some(mode) = record.flags {
            self.mode = mode;
        }
        for (name, shape_records) in record.shapes {
            let shapes: Vec<Shape> = shape_records
                .iter()
                .filter_map(|r| {
                    let shape = r.to_shape();
                    if shape.is_none() {
                        log::warn!("skipping shape '{}' with unknown form '{}'", r.name, r.form);
                    }
                    shape
                })
                .collect();
            self.shapes.insert(name, shapes);
        }
    }

    fn to_record(&self) -> LayerRecord {
        LayerRecord {
            name: self.name.clone(),
            shapes: self
                .shapes
                .iter()
                .map(|(name, shapes)| {
                    (
                        name.clone(),
                        shapes.iter().map(ShapeRecord::from_shape).collect(),
                    )
                })
                .collect(),
            position: self.view_position,
            scale: self.view_scale,
            colormap: self.colormap.clone(),
            maprange: self.map_range,
            transform: self.transform.as_ref().map(AffineTransform::to_rows),
            flags: Some(self.mode),
        }
    }
}

/// Post-process a decoded raster according to the layer's mode.
///
/// Color rasters with an alpha channel get near-transparent pixels blanked
/// to black before the alpha channel is dropped; transparent borders from
/// orthophoto stitching would otherwise show up as arbitrary colors.
fn decode_raster(decoded: DynamicImage, mode: RasterMode) -> DynamicImage {
    match mode {
        RasterMode::Grayscale => DynamicImage::ImageLuma8(decoded.to_luma8()),
        RasterMode::Color => {
            if decoded.color().has_alpha() {
                let mut rgba = decoded.to_rgba8();
                for pixel in rgba.pixels_mut() {
                    if pixel[3] < 200 {
                        pixel[0] = 0;
                        pixel[1] = 0;
                        pixel[2] = 0;
                    }
                }
                DynamicImage::ImageRgba8(rgba).to_rgb8().into()
            } else {
                DynamicImage::ImageRgb8(decoded.to_rgb8())
            }
        }
    }
}
