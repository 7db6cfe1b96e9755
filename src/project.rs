//! Project state: the fixed set of named layers and the mapping pipeline.
//!
//! A project is a directory holding one raster (plus sidecar) per layer and
//! a JSON settings file. The pipeline wires the analysis collaborator's
//! outputs into layers and shapes; the algorithms themselves live behind
//! [`FieldAnalysis`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{
    mask_from_image, mask_to_image, rows_to_points, Colormap, FieldAnalysis, RowDetectParams,
};
use crate::constants::{file, style};
use crate::geometry::{clamp_poly_to_bounds, AffineTransform, ImagePoint, Size};
use crate::model::{Layer, RasterMode, Shape, ShapeForm};

pub const LAYER_CROP_FIELD: &str = "Crop Field";
pub const LAYER_NORM_FIELD: &str = "Norm Field";
pub const LAYER_VEG_MASK: &str = "Vegetation Mask";
pub const LAYER_WEED_MASK: &str = "Weed Mask";
pub const LAYER_VEG_DENSITY: &str = "Vegetation Density";
pub const LAYER_WEED_DENSITY: &str = "Weed Density";
pub const LAYER_ROI_MASK: &str = "Roi Mask";

/// Every layer a project owns, in list order.
pub const LAYERS: [&str; 7] = [
    LAYER_CROP_FIELD,
    LAYER_NORM_FIELD,
    LAYER_VEG_MASK,
    LAYER_WEED_MASK,
    LAYER_VEG_DENSITY,
    LAYER_WEED_DENSITY,
    LAYER_ROI_MASK,
];

pub const SHAPE_ROWS_RIDGES: &str = "Row Ridges";
pub const SHAPE_ROWS_FURROWS: &str = "Row Furrows";
pub const SHAPE_ROWS_DIR: &str = "Rows Direction";
pub const SHAPE_ROI_POLY: &str = "Roi Poly";

/// Every shape category the workflow produces.
pub const SHAPES: [&str; 4] = [
    SHAPE_ROWS_RIDGES,
    SHAPE_ROWS_FURROWS,
    SHAPE_ROWS_DIR,
    SHAPE_ROI_POLY,
];

/// Errors that can occur loading or saving a project.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// One or more layers failed to save; in-memory state is unaffected
    #[error("failed to save layers: {}", failed.join(", "))]
    Save { failed: Vec<String> },
}

/// Per-project settings: paths, pipeline toggles, analysis parameters and
/// shape styling.
///
/// Persisted as a JSON `.agf` file in the project directory. Every field is
/// optional on load and falls back to its default, so settings files survive
/// schema additions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    pub project_name: String,
    pub project_path: PathBuf,
    /// Source orthophoto the crop-field layer is imported from.
    pub crop_field_image_path: PathBuf,
    /// Ground resolution in pixels per meter.
    pub resolution: f64,

    pub run_segment_veg: bool,
    pub run_detect_rows: bool,
    pub run_map_veg: bool,
    pub run_map_weeds: bool,

    pub segment_veg_thr: f64,
    /// Expected crop-row separation in meters.
    pub rows_separation: f64,

    pub roi_auto_detect: bool,
    /// User-drawn ROI polygon, if any; wins over auto-detection.
    pub roi_polygon: Option<Vec<[f64; 2]>>,
    pub roi_trim: bool,

    pub dir_auto_detect: bool,
    /// Crop-row direction in radians, used when auto-detection is off.
    pub rows_direction: f64,
    pub rows_dir_window_width: f64,
    pub rows_dir_window_height: f64,

    pub rows_detect_extent_thr: f64,
    pub rows_detect_max_extent: f64,
    pub rows_detect_fusion_thr: f64,
    pub rows_detect_link_thr: u32,

    pub maps_cell_width: f64,
    pub maps_cell_height: f64,
    pub maps_colormap: Colormap,

    /// Layer shown on the canvas, restored on reopen.
    pub shown_layer_name: String,
    /// Per-category visibility, applied to freshly built shapes.
    pub shapes_visible: BTreeMap<String, bool>,

    pub roi_color: [u8; 3],
    pub rows_dir_color: [u8; 3],
    pub rows_ridges_color: [u8; 3],
    pub rows_furrows_color: [u8; 3],
    pub draw_line_width: u32,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            project_path: PathBuf::new(),
            crop_field_image_path: PathBuf::new(),
            resolution: 20.0,
            run_segment_veg: true,
            run_detect_rows: true,
            run_map_veg: true,
            run_map_weeds: true,
            segment_veg_thr: 1.0,
            rows_separation: 0.7,
            roi_auto_detect: true,
            roi_polygon: None,
            roi_trim: true,
            dir_auto_detect: true,
            rows_direction: 0.0,
            rows_dir_window_width: 30.0,
            rows_dir_window_height: 20.0,
            rows_detect_extent_thr: 0.1,
            rows_detect_max_extent: 5.0,
            rows_detect_fusion_thr: 0.1,
            rows_detect_link_thr: 3,
            maps_cell_width: 5.0,
            maps_cell_height: 5.0,
            maps_colormap: Colormap::Jet,
            shown_layer_name: String::new(),
            shapes_visible: BTreeMap::new(),
            roi_color: [255, 0, 0],
            rows_dir_color: [0, 255, 0],
            rows_ridges_color: [255, 0, 255],
            rows_furrows_color: [255, 255, 0],
            draw_line_width: style::DEFAULT_LINE_WIDTH,
        }
    }
}

impl ProjectSettings {
    /// Path of the settings file inside the project directory.
    pub fn settings_path(&self) -> PathBuf {
        self.project_path
            .join(format!("{}.{}", self.project_name, file::PROJECT_EXT))
    }

    pub fn save(&self) -> Result<(), ProjectError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(self.settings_path(), json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn visible(&self, shape_name: &str) -> bool {
        self.shapes_visible.get(shape_name).copied().unwrap_or(true)
    }
}

/// A loaded project: settings plus its fixed set of named layers.
pub struct Project {
    pub settings: ProjectSettings,
    layers: BTreeMap<String, Layer>,
}

impl Project {
    /// Build the project's layers from its directory, importing the source
    /// crop image on first open.
    pub fn open(settings: ProjectSettings) -> Self {
        let mut project = Self {
            settings,
            layers: BTreeMap::new(),
        };
        project.build_layers();
        project
    }

    /// File name of a layer's raster inside the project directory.
    pub fn layer_file_name(layer_name: &str) -> String {
        let base: Vec<String> = layer_name
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        format!("{}.{}", base.join("_"), file::LAYER_IMAGE_EXT)
    }

    fn build_layers(&mut self) {
        let modes = [
            (LAYER_CROP_FIELD, RasterMode::Color),
            (LAYER_NORM_FIELD, RasterMode::Color),
            (LAYER_VEG_DENSITY, RasterMode::Color),
            (LAYER_VEG_MASK, RasterMode::Grayscale),
            (LAYER_WEED_DENSITY, RasterMode::Color),
            (LAYER_WEED_MASK, RasterMode::Grayscale),
            (LAYER_ROI_MASK, RasterMode::Grayscale),
        ];
        self.layers = modes
            .into_iter()
            .map(|(name, mode)| {
                let path = self.settings.project_path.join(Self::layer_file_name(name));
                (name.to_string(), Layer::open(name, path, mode))
            })
            .collect();

        let needs_import = self
            .layers
            .get(LAYER_CROP_FIELD)
            .is_some_and(Layer::is_empty)
            && self.settings.crop_field_image_path.is_file();
        if needs_import {
            self.import_crop_image();
        }
    }

    /// Import the source orthophoto into the crop-field layer.
    fn import_crop_image(&mut self) {
        let source = self.settings.crop_field_image_path.clone();
        let image = match image::open(&source) {
            Ok(image) => import_orthophoto(image),
            Err(err) => {
                log::error!("failed to import crop image {:?}: {}", source, err);
                return;
            }
        };
        log::info!("📂 imported crop image from {:?}", source);
        if let Some(crop) = self.layers.get_mut(LAYER_CROP_FIELD) {
            crop.set_image(image);
            save_layer(crop);
        }
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.get_mut(name)
    }

    /// Layer names with pixel data, the ones offered for display.
    pub fn selectable_layers(&self) -> Vec<&str> {
        LAYERS
            .iter()
            .copied()
            .filter(|name| self.layers.get(*name).is_some_and(|l| !l.is_empty()))
            .collect()
    }

    /// Select the shown layer; empty layers are refused.
    pub fn set_shown_layer(&mut self, name: &str) -> bool {
        match self.layers.get(name) {
            Some(layer) if !layer.is_empty() => {
                self.settings.shown_layer_name = name.to_string();
                true
            }
            _ => {
                log::warn!("layer '{name}' is empty or unknown, not selecting");
                false
            }
        }
    }

    pub fn shown_layer_mut(&mut self) -> Option<&mut Layer> {
        let name = self.settings.shown_layer_name.clone();
        self.layers.get_mut(&name).filter(|l| !l.is_empty())
    }

    /// Apply the persisted per-category visibility to a layer's shapes.
    pub fn apply_shape_visibility(&self, layer: &mut Layer) {
        for (name, visible) in &self.settings.shapes_visible {
            if let Some(shapes) = layer.shapes.get_mut(name) {
                for shape in shapes {
                    shape.visible = *visible;
                }
            }
        }
    }

    /// Persist the settings file and every layer.
    ///
    /// Layer failures are collected rather than aborting; the summary error
    /// is meant for a single user notification and in-memory state stays
    /// untouched so the save can be retried.
    pub fn save(&self) -> Result<(), ProjectError> {
        if self.settings.project_name.is_empty() {
            return Ok(());
        }
        self.settings.save()?;

        let mut failed = Vec::new();
        for layer in self.layers.values() {
            if let Err(err) = layer.save() {
                log::error!("failed to save layer '{}': {}", layer.name, err);
                failed.push(layer.name.clone());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(ProjectError::Save { failed })
        }
    }

    /// Run the mapping pipeline against the analysis collaborator.
    ///
    /// Each stage is skipped (with a log line) when its inputs are missing;
    /// nothing here is fatal.
    pub fn run(&mut self, analysis: &dyn FieldAnalysis) {
        if self.settings.run_segment_veg {
            self.run_segment_veg(analysis);
        }
        if self.settings.run_detect_rows {
            self.run_detect_rows(analysis);
        }
        if self.settings.run_map_veg {
            self.run_density_map(analysis, LAYER_VEG_MASK, LAYER_VEG_DENSITY);
        }
        if self.settings.run_map_weeds {
            self.run_map_weeds(analysis);
        }
    }

    fn image_of(&self, name: &str) -> Option<DynamicImage> {
        self.layers.get(name).and_then(|l| l.image.clone())
    }

    fn run_segment_veg(&mut self, analysis: &dyn FieldAnalysis) {
        let Some(crop_image) = self.image_of(LAYER_CROP_FIELD) else {
            log::warn!("crop field is empty, skipping vegetation segmentation");
            return;
        };
        let crop_transform = self.layers.get(LAYER_CROP_FIELD).and_then(|l| l.transform);

        let mask = analysis.segment_vegetation(&crop_image.to_rgb8(), self.settings.segment_veg_thr);
        log::info!("🌱 segmented vegetation: {}x{} mask", mask.dim().1, mask.dim().0);

        if let Some(veg) = self.layers.get_mut(LAYER_VEG_MASK) {
            veg.set_image(DynamicImage::ImageLuma8(mask_to_image(&mask)));
            veg.transform = crop_transform;
            save_layer(veg);
        }
    }

    fn run_detect_rows(&mut self, analysis: &dyn FieldAnalysis) {
        let se = self.settings.clone();
        let Some(veg_image) = self.image_of(LAYER_VEG_MASK) else {
            log::warn!("vegetation mask is empty, skipping row detection");
            return;
        };
        let Some(crop_image) = self.image_of(LAYER_CROP_FIELD) else {
            log::warn!("crop field is empty, skipping row detection");
            return;
        };

        let veg_mask = mask_from_image(&veg_image.to_luma8());
        let (rows, cols) = veg_mask.dim();
        let bounds = Size::new(cols as f64, rows as f64);

        // ROI: user-drawn polygon wins, then auto-detection, then the full
        // image rectangle
        let mut roi_poly = vec![
            ImagePoint::new(0.0, 0.0),
            ImagePoint::new(bounds.width, 0.0),
            ImagePoint::new(bounds.width, bounds.height),
            ImagePoint::new(0.0, bounds.height),
        ];
        if let Some(stored) = &se.roi_polygon {
            roi_poly = stored.iter().map(|p| ImagePoint::new(p[0], p[1])).collect();
        } else if se.roi_auto_detect {
            match analysis.detect_roi(&veg_mask, se.rows_separation, se.resolution) {
                Ok(poly) => roi_poly = poly,
                Err(err) => log::error!("ROI detection failed: {err}"),
            }
        }
        let roi_poly = clamp_poly_to_bounds(&roi_poly, bounds);

        if let Some(crop) = self.layers.get_mut(LAYER_CROP_FIELD) {
            let mut shape = Shape::new(ShapeForm::Polygon, SHAPE_ROI_POLY)
                .with_style(se.roi_color, se.draw_line_width)
                .with_points(roi_poly.clone());
            shape.visible = se.visible(SHAPE_ROI_POLY);
            crop.shapes.insert(SHAPE_ROI_POLY.to_string(), vec![shape]);
        }

        let mut rows_dir = se.rows_direction;
        if se.dir_auto_detect {
            rows_dir = analysis.detect_direction(
                &veg_mask,
                se.resolution,
                (se.rows_dir_window_height, se.rows_dir_window_width),
            );
            log::info!("📐 detected row direction: {:.3} rad", rows_dir);

            // Arrow from the image center indicating the detected direction
            let center = ImagePoint::new((cols / 2) as f64, (rows / 2) as f64);
            let length = (bounds.width / 2.0).min(bounds.height / 2.0);
            let dx = (rows_dir.cos() * length).clamp(0.0, bounds.width - 1.0);
            let dy = (rows_dir.sin() * length).clamp(0.0, bounds.height - 1.0);
            let tip = ImagePoint::new(center.x + dx, center.y + dy);

            if let Some(crop) = self.layers.get_mut(LAYER_CROP_FIELD) {
                let mut shape = Shape::line(SHAPE_ROWS_DIR, center, tip)
                    .with_style(se.rows_dir_color, se.draw_line_width);
                shape.visible = se.visible(SHAPE_ROWS_DIR);
                crop.shapes.insert(SHAPE_ROWS_DIR.to_string(), vec![shape]);
            }
        }

        // Normalize the mask and the photo against the same ROI/direction
        let veg_norm = analysis.norm_image(&veg_image, &roi_poly, rows_dir, se.roi_trim, true);
        let norm = analysis.norm_image(&crop_image, &roi_poly, rows_dir, se.roi_trim, false);

        let mut transform = norm.transform;
        if let Some(prior) = self.layers.get(LAYER_CROP_FIELD).and_then(|l| l.transform) {
            transform = AffineTransform::compose(&prior, &transform);
        }

        let norm_size = (norm.image.width(), norm.image.height());
        let roi_mask = analysis.poly_mask(&norm.roi, norm_size);

        if let Some(veg) = self.layers.get_mut(LAYER_VEG_MASK) {
            veg.set_image(DynamicImage::ImageLuma8(veg_norm.image.to_luma8()));
            veg.transform = Some(transform);
        }
        if let Some(norm_field) = self.layers.get_mut(LAYER_NORM_FIELD) {
            norm_field.set_image(norm.image);
            norm_field.transform = Some(transform);
        }
        if let Some(roi_layer) = self.layers.get_mut(LAYER_ROI_MASK) {
            roi_layer.set_image(DynamicImage::ImageLuma8(mask_to_image(&roi_mask)));
            roi_layer.transform = Some(transform);
        }

        // Row detection runs on the normalized mask
        let veg_mask_norm = mask_from_image(&veg_norm.image.to_luma8());
        let params = RowDetectParams {
            row_sep: se.rows_separation,
            extent_max: se.rows_detect_max_extent,
            extent_thr: se.rows_detect_extent_thr,
            fusion_thr: se.rows_detect_fusion_thr,
            link_thr: se.rows_detect_link_thr,
            resolution: se.resolution,
        };
        let detection = analysis.detect_rows(&veg_mask_norm, &roi_mask, &params);
        log::info!(
            "🚜 detected {} ridges, {} furrows",
            detection.ridges.len(),
            detection.furrows.len()
        );

        let ridge_shapes = row_shapes(
            &detection.ridges,
            SHAPE_ROWS_RIDGES,
            se.rows_ridges_color,
            se.draw_line_width,
            se.visible(SHAPE_ROWS_RIDGES),
        );
        let furrow_shapes = row_shapes(
            &detection.furrows,
            SHAPE_ROWS_FURROWS,
            se.rows_furrows_color,
            se.draw_line_width,
            se.visible(SHAPE_ROWS_FURROWS),
        );
        for name in [LAYER_NORM_FIELD, LAYER_VEG_MASK] {
            if let Some(layer) = self.layers.get_mut(name) {
                layer
                    .shapes
                    .insert(SHAPE_ROWS_RIDGES.to_string(), ridge_shapes.clone());
                layer
                    .shapes
                    .insert(SHAPE_ROWS_FURROWS.to_string(), furrow_shapes.clone());
            }
        }

        for name in [
            LAYER_CROP_FIELD,
            LAYER_NORM_FIELD,
            LAYER_VEG_MASK,
            LAYER_ROI_MASK,
        ] {
            if let Some(layer) = self.layers.get_mut(name) {
                save_layer(layer);
            }
        }
    }

    fn run_map_weeds(&mut self, analysis: &dyn FieldAnalysis) {
        let Some(norm_image) = self.image_of(LAYER_NORM_FIELD) else {
            log::warn!("normalized field is empty, skipping weed mapping");
            return;
        };
        let Some(veg_image) = self.image_of(LAYER_VEG_MASK) else {
            log::warn!("vegetation mask is empty, skipping weed mapping");
            return;
        };
        let crop_rows: Vec<Vec<ImagePoint>> = self
            .layers
            .get(LAYER_VEG_MASK)
            .and_then(|l| l.shapes_for(SHAPE_ROWS_RIDGES))
            .map(|shapes| shapes.iter().map(|s| s.points.clone()).collect())
            .unwrap_or_default();

        let veg_mask = mask_from_image(&veg_image.to_luma8());
        let weed_mask = analysis.segment_weeds(&norm_image.to_rgb8(), &veg_mask, &crop_rows);

        if let Some(weed) = self.layers.get_mut(LAYER_WEED_MASK) {
            weed.set_image(DynamicImage::ImageLuma8(mask_to_image(&weed_mask)));
        }
        self.run_density_map(analysis, LAYER_WEED_MASK, LAYER_WEED_DENSITY);
    }

    /// Compute a density map for a mask layer and render it through the
    /// project colormap.
    fn run_density_map(&mut self, analysis: &dyn FieldAnalysis, mask_name: &str, density_name: &str) {
        let se = self.settings.clone();
        let Some(mask_image) = self.image_of(mask_name) else {
            log::warn!("{mask_name} is empty, skipping density map");
            return;
        };
        let Some(roi_image) = self.image_of(LAYER_ROI_MASK) else {
            log::warn!("ROI mask is empty, skipping density map");
            return;
        };

        let mask = mask_from_image(&mask_image.to_luma8());
        let roi = mask_from_image(&roi_image.to_luma8());
        let density = analysis.mask_density(
            &mask,
            &roi,
            (se.maps_cell_width, se.maps_cell_height),
            se.resolution,
        );
        let render = analysis.render_colormap(&density, se.maps_colormap);

        let min = density.iter().copied().fold(f32::INFINITY, f32::min);
        let max = density.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let map_range = if min.is_finite() && max.is_finite() {
            [f64::from(min), f64::from(max)]
        } else {
            [0.0, 1.0]
        };
        log::info!(
            "🗺️ {density_name}: range [{:.4}, {:.4}]",
            map_range[0],
            map_range[1]
        );

        let transform = self.layers.get(LAYER_VEG_MASK).and_then(|l| l.transform);
        if let Some(layer) = self.layers.get_mut(density_name) {
            layer.set_image(DynamicImage::ImageRgb8(render.image));
            layer.colormap = Some(render.ramp);
            layer.map_range = map_range;
            layer.transform = transform;
            save_layer(layer);
        }
    }
}

/// Blank near-transparent orthophoto pixels before dropping alpha; stitching
/// borders would otherwise show as arbitrary colors.
fn import_orthophoto(image: DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        let mut rgba = image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            if pixel[3] < 200 {
                pixel[0] = 0;
                pixel[1] = 0;
                pixel[2] = 0;
            }
        }
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}

fn row_shapes(
    lines: &[ndarray::Array2<f64>],
    name: &str,
    color: [u8; 3],
    width: u32,
    visible: bool,
) -> Vec<Shape> {
    lines
        .iter()
        .map(|line| {
            let mut shape = Shape::new(ShapeForm::Polyline, name)
                .with_style(color, width)
                .with_points(rows_to_points(line));
            shape.visible = visible;
            shape
        })
        .collect()
}

fn save_layer(layer: &Layer) {
    if let Err(err) = layer.save() {
        log::error!("failed to save layer '{}': {}", layer.name, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisError, ColormapRender, NormalizedImage, RowsDetection};
    use image::{Rgb, RgbImage};
    use ndarray::{array, Array2};

    /// Deterministic stand-in for the external analysis library.
    struct StubAnalysis;

    impl FieldAnalysis for StubAnalysis {
        fn segment_vegetation(&self, image: &RgbImage, _threshold: f64) -> Array2<u8> {
            let (width, height) = image.dimensions();
            Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
                if image.get_pixel(col as u32, row as u32)[1] > 100 {
                    255
                } else {
                    0
                }
            })
        }

        fn detect_roi(
            &self,
            veg_mask: &Array2<u8>,
            _row_sep: f64,
            _resolution: f64,
        ) -> Result<Vec<ImagePoint>, AnalysisError> {
            let (rows, cols) = veg_mask.dim();
            // Deliberately exceeds the image bounds to exercise trimming
            Ok(vec![
                ImagePoint::new(-10.0, -10.0),
                ImagePoint::new(cols as f64 + 10.0, -10.0),
                ImagePoint::new(cols as f64 + 10.0, rows as f64 + 10.0),
                ImagePoint::new(-10.0, rows as f64 + 10.0),
            ])
        }

        fn detect_direction(
            &self,
            _veg_mask: &Array2<u8>,
            _resolution: f64,
            _window_shape: (f64, f64),
        ) -> f64 {
            0.5
        }

        fn norm_image(
            &self,
            image: &DynamicImage,
            roi_poly: &[ImagePoint],
            _rows_direction: f64,
            _roi_trim: bool,
            _is_mask: bool,
        ) -> NormalizedImage {
            NormalizedImage {
                image: image.clone(),
                roi: roi_poly.to_vec(),
                transform: AffineTransform::new([[2.0, 0.0, 1.0], [0.0, 2.0, 1.0]]),
            }
        }

        fn detect_rows(
            &self,
            _veg_mask: &Array2<u8>,
            _roi_mask: &Array2<u8>,
            _params: &RowDetectParams,
        ) -> RowsDetection {
            RowsDetection {
                ridges: vec![array![[1.0, 0.0], [1.0, 5.0]]],
                furrows: vec![array![[3.0, 0.0], [3.0, 5.0]], array![[7.0, 0.0], [7.0, 5.0]]],
            }
        }

        fn segment_weeds(
            &self,
            _image: &RgbImage,
            veg_mask: &Array2<u8>,
            _crop_rows: &[Vec<ImagePoint>],
        ) -> Array2<u8> {
            Array2::zeros(veg_mask.dim())
        }

        fn poly_mask(&self, _poly: &[ImagePoint], size: (u32, u32)) -> Array2<u8> {
            Array2::from_elem((size.1 as usize, size.0 as usize), 255)
        }

        fn mask_density(
            &self,
            _mask: &Array2<u8>,
            _roi_mask: &Array2<u8>,
            _cell_size: (f64, f64),
            _resolution: f64,
        ) -> Array2<f32> {
            array![[0.02, 0.04], [0.01, 0.05]]
        }

        fn render_colormap(&self, values: &Array2<f32>, _colormap: Colormap) -> ColormapRender {
            let (rows, cols) = values.dim();
            ColormapRender {
                image: RgbImage::from_pixel(cols as u32, rows as u32, Rgb([0, 0, 255])),
                ramp: vec![[0, 0, 255], [255, 0, 0]],
            }
        }
    }

    fn project_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cropmap_project_{tag}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn green_field(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([40, 180, 40]))
    }

    fn test_settings(dir: &Path) -> ProjectSettings {
        let crop_source = dir.join("source.png");
        DynamicImage::ImageRgb8(green_field(20, 10))
            .save(&crop_source)
            .unwrap();
        ProjectSettings {
            project_name: "field-a".to_string(),
            project_path: dir.to_path_buf(),
            crop_field_image_path: crop_source,
            ..ProjectSettings::default()
        }
    }

    #[test]
    fn test_layer_file_names() {
        assert_eq!(Project::layer_file_name(LAYER_CROP_FIELD), "crop_field.png");
        assert_eq!(
            Project::layer_file_name(LAYER_VEG_DENSITY),
            "vegetation_density.png"
        );
    }

    #[test]
    fn test_open_imports_crop_image() {
        let dir = project_dir("import");
        let project = Project::open(test_settings(&dir));

        let crop = project.layer(LAYER_CROP_FIELD).unwrap();
        assert!(!crop.is_empty());
        assert!(dir.join("crop_field.png").exists());
        assert!(project.layer(LAYER_WEED_MASK).unwrap().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_layers_are_not_selectable() {
        let dir = project_dir("selectable");
        let mut project = Project::open(test_settings(&dir));

        assert_eq!(project.selectable_layers(), vec![LAYER_CROP_FIELD]);
        assert!(project.set_shown_layer(LAYER_CROP_FIELD));
        assert!(!project.set_shown_layer(LAYER_WEED_MASK));
        assert_eq!(project.settings.shown_layer_name, LAYER_CROP_FIELD);
        assert!(project.shown_layer_mut().is_some());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_pipeline_builds_layers_and_shapes() {
        let dir = project_dir("pipeline");
        let mut project = Project::open(test_settings(&dir));
        project.run(&StubAnalysis);

        // Vegetation segmentation filled the mask layer
        let veg = project.layer(LAYER_VEG_MASK).unwrap();
        assert!(!veg.is_empty());

        // ROI polygon was trimmed into the image bounds
        let crop = project.layer(LAYER_CROP_FIELD).unwrap();
        let roi = &crop.shapes_for(SHAPE_ROI_POLY).unwrap()[0];
        assert_eq!(roi.form, ShapeForm::Polygon);
        assert!(roi
            .points
            .iter()
            .all(|p| (0.0..=20.0).contains(&p.x) && (0.0..=10.0).contains(&p.y)));

        // Direction arrow exists and starts at the image center
        let arrow = &crop.shapes_for(SHAPE_ROWS_DIR).unwrap()[0];
        assert_eq!(arrow.form, ShapeForm::Line);
        assert_eq!(arrow.points[0], ImagePoint::new(10.0, 5.0));

        // Row polylines arrive in (x, y) order on both normalized layers
        let norm = project.layer(LAYER_NORM_FIELD).unwrap();
        let ridges = norm.shapes_for(SHAPE_ROWS_RIDGES).unwrap();
        assert_eq!(ridges.len(), 1);
        assert_eq!(ridges[0].points[1], ImagePoint::new(5.0, 1.0));
        assert_eq!(veg.shapes_for(SHAPE_ROWS_FURROWS).unwrap().len(), 2);

        // Normalization calibrated the derived layers
        let expected = AffineTransform::new([[2.0, 0.0, 1.0], [0.0, 2.0, 1.0]]);
        assert_eq!(norm.transform, Some(expected));
        assert_eq!(project.layer(LAYER_ROI_MASK).unwrap().transform, Some(expected));

        // Density layers carry colormap and value range for the legend
        let density = project.layer(LAYER_VEG_DENSITY).unwrap();
        assert!(!density.is_empty());
        assert_eq!(density.colormap, Some(vec![[0, 0, 255], [255, 0, 0]]));
        assert!((density.map_range[0] - 0.01).abs() < 1e-9);
        assert!((density.map_range[1] - 0.05).abs() < 1e-9);
        assert!(!project.layer(LAYER_WEED_DENSITY).unwrap().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_prior_transform_is_composed() {
        let dir = project_dir("compose");
        let mut project = Project::open(test_settings(&dir));
        let prior = AffineTransform::new([[1.0, 0.0, 100.0], [0.0, 1.0, 200.0]]);
        project.layer_mut(LAYER_CROP_FIELD).unwrap().transform = Some(prior);

        project.run(&StubAnalysis);

        let step = AffineTransform::new([[2.0, 0.0, 1.0], [0.0, 2.0, 1.0]]);
        let expected = AffineTransform::compose(&prior, &step);
        assert_eq!(
            project.layer(LAYER_NORM_FIELD).unwrap().transform,
            Some(expected)
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_stored_roi_polygon_wins_over_detection() {
        let dir = project_dir("storedroi");
        let mut settings = test_settings(&dir);
        settings.roi_polygon = Some(vec![[1.0, 1.0], [19.0, 1.0], [19.0, 9.0], [1.0, 9.0]]);
        let mut project = Project::open(settings);
        project.run(&StubAnalysis);

        let crop = project.layer(LAYER_CROP_FIELD).unwrap();
        let roi = &crop.shapes_for(SHAPE_ROI_POLY).unwrap()[0];
        assert_eq!(roi.points[0], ImagePoint::new(1.0, 1.0));
        assert_eq!(roi.points[2], ImagePoint::new(19.0, 9.0));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_pipeline_without_inputs_is_harmless() {
        let dir = project_dir("noinputs");
        let settings = ProjectSettings {
            project_name: "empty".to_string(),
            project_path: dir.clone(),
            ..ProjectSettings::default()
        };
        let mut project = Project::open(settings);
        project.run(&StubAnalysis);
        assert!(project.layer(LAYER_VEG_MASK).unwrap().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_settings_roundtrip_with_missing_fields() {
        let dir = project_dir("settings");
        let settings = test_settings(&dir);
        settings.save().unwrap();
        let loaded = ProjectSettings::load(&settings.settings_path()).unwrap();
        assert_eq!(loaded.project_name, "field-a");
        assert_eq!(loaded.resolution, 20.0);

        // A sparse file from an older version keeps defaults elsewhere
        let sparse: ProjectSettings =
            serde_json::from_str(r#"{"project_name": "old", "rows_separation": 0.9}"#).unwrap();
        assert_eq!(sparse.project_name, "old");
        assert_eq!(sparse.rows_separation, 0.9);
        assert!(sparse.run_segment_veg);
        assert_eq!(sparse.maps_colormap, Colormap::Jet);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_save_persists_layers_and_settings() {
        let dir = project_dir("saveall");
        let mut project = Project::open(test_settings(&dir));
        project.run(&StubAnalysis);
        project.save().unwrap();

        assert!(dir.join("field-a.agf").exists());
        assert!(dir.join("vegetation_mask.png").exists());
        assert!(dir.join("vegetation_mask.im").exists());

        // A fresh open restores the pipeline results from disk
        let reopened = Project::open(ProjectSettings::load(&dir.join("field-a.agf")).unwrap());
        let norm = reopened.layer(LAYER_NORM_FIELD).unwrap();
        assert!(norm.shapes_for(SHAPE_ROWS_RIDGES).is_some());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_import_blanks_transparent_pixels() {
        let dir = project_dir("alpha");
        let source = dir.join("source.png");
        let mut img = image::RgbaImage::from_pixel(4, 4, image::Rgba([90, 160, 90, 255]));
        img.put_pixel(0, 0, image::Rgba([90, 160, 90, 50]));
        DynamicImage::ImageRgba8(img).save(&source).unwrap();

        let settings = ProjectSettings {
            project_name: "alpha".to_string(),
            project_path: dir.clone(),
            crop_field_image_path: source,
            ..ProjectSettings::default()
        };
        let project = Project::open(settings);
        let crop = project.layer(LAYER_CROP_FIELD).unwrap();
        assert_eq!(crop.probe_color(ImagePoint::new(0.0, 0.0)), Some([0, 0, 0]));
        assert_eq!(
            crop.probe_color(ImagePoint::new(1.0, 0.0)),
            Some([90, 160, 90])
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
