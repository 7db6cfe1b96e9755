//! Boundary to the external field-analysis library.
//!
//! Segmentation, row detection, normalization and density mapping are not
//! implemented here; the pipeline consumes them through [`FieldAnalysis`] as
//! black-box producers of mask arrays, polygons, angles, transforms and
//! pseudo-colored rasters. This module also owns the adapter functions that
//! reconcile the detector's array conventions with the canvas.

use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::Array2;
use thiserror::Error;

use crate::geometry::{AffineTransform, ImagePoint};

/// Failure reported by the analysis collaborator.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AnalysisError {
    message: String,
}

impl AnalysisError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Colormap choices offered for density maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    Hot,
    Hsv,
    #[default]
    Jet,
    Cool,
    Autumn,
}

impl Colormap {
    /// Display name for UI listings.
    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Hot => "Hot",
            Colormap::Hsv => "HSV",
            Colormap::Jet => "Jet",
            Colormap::Cool => "Cool",
            Colormap::Autumn => "Autumn",
        }
    }

    pub fn all() -> &'static [Colormap] {
        &[
            Colormap::Hot,
            Colormap::Hsv,
            Colormap::Jet,
            Colormap::Cool,
            Colormap::Autumn,
        ]
    }
}

/// Parameters for crop-row detection.
#[derive(Debug, Clone, Copy)]
pub struct RowDetectParams {
    /// Expected row separation in meters.
    pub row_sep: f64,
    /// Largest lateral extent a row segment may span.
    pub extent_max: f64,
    pub extent_thr: f64,
    pub fusion_thr: f64,
    pub link_thr: u32,
    /// Ground resolution in pixels per meter.
    pub resolution: f64,
}

/// Result of geo-normalizing an image against an ROI and row direction.
pub struct NormalizedImage {
    pub image: DynamicImage,
    /// ROI polygon in the normalized image's pixel space.
    pub roi: Vec<ImagePoint>,
    /// Maps normalized pixels back through the crop/warp step.
    pub transform: AffineTransform,
}

/// Detected crop-row centerlines, in the detector's (row, col) order.
pub struct RowsDetection {
    pub ridges: Vec<Array2<f64>>,
    pub furrows: Vec<Array2<f64>>,
}

/// Pseudo-colored rendering of a scalar map.
pub struct ColormapRender {
    pub image: RgbImage,
    /// The ramp actually used, for the legend.
    pub ramp: Vec<[u8; 3]>,
}

/// The image-analysis capability the mapping pipeline consumes.
pub trait FieldAnalysis {
    /// Segment vegetation pixels out of a crop-field photo.
    fn segment_vegetation(&self, image: &RgbImage, threshold: f64) -> Array2<u8>;

    /// Detect the region-of-interest polygon on a vegetation mask.
    fn detect_roi(
        &self,
        veg_mask: &Array2<u8>,
        row_sep: f64,
        resolution: f64,
    ) -> Result<Vec<ImagePoint>, AnalysisError>;

    /// Detect the dominant crop-row direction, in radians.
    fn detect_direction(
        &self,
        veg_mask: &Array2<u8>,
        resolution: f64,
        window_shape: (f64, f64),
    ) -> f64;

    /// Rotate/crop an image so crop rows run horizontally inside the ROI.
    fn norm_image(
        &self,
        image: &DynamicImage,
        roi_poly: &[ImagePoint],
        rows_direction: f64,
        roi_trim: bool,
        is_mask: bool,
    ) -> NormalizedImage;

    /// Detect row ridge and furrow centerlines on a normalized mask.
    fn detect_rows(
        &self,
        veg_mask: &Array2<u8>,
        roi_mask: &Array2<u8>,
        params: &RowDetectParams,
    ) -> RowsDetection;

    /// Segment weeds using the detected crop rows as keep-out lines.
    fn segment_weeds(
        &self,
        image: &RgbImage,
        veg_mask: &Array2<u8>,
        crop_rows: &[Vec<ImagePoint>],
    ) -> Array2<u8>;

    /// Rasterize an ROI polygon into a mask of the given (width, height).
    fn poly_mask(&self, poly: &[ImagePoint], size: (u32, u32)) -> Array2<u8>;

    /// Coverage density of a mask per map cell.
    fn mask_density(
        &self,
        mask: &Array2<u8>,
        roi_mask: &Array2<u8>,
        cell_size: (f64, f64),
        resolution: f64,
    ) -> Array2<f32>;

    /// Render a scalar map through a colormap, full scale.
    fn render_colormap(&self, values: &Array2<f32>, colormap: Colormap) -> ColormapRender;
}

/// Convert one detected polyline from detector order to canvas order.
///
/// Contract: the detector returns points as (row, col); the canvas expects
/// (x, y) with x horizontal. Every crossing of this boundary goes through
/// here.
pub fn rows_to_points(line: &Array2<f64>) -> Vec<ImagePoint> {
    line.rows()
        .into_iter()
        .map(|point| ImagePoint::new(point[1], point[0]))
        .collect()
}

/// Convert canvas points back into a detector (row, col) array.
pub fn points_to_rows(points: &[ImagePoint]) -> Array2<f64> {
    let mut line = Array2::zeros((points.len(), 2));
    for (i, point) in points.iter().enumerate() {
        line[[i, 0]] = point.y;
        line[[i, 1]] = point.x;
    }
    line
}

/// View a grayscale mask as an ndarray, (rows, cols) indexed.
pub fn mask_from_image(image: &GrayImage) -> Array2<u8> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        image.get_pixel(col as u32, row as u32)[0]
    })
}

/// Materialize a mask array as a grayscale raster for layer storage.
pub fn mask_to_image(mask: &Array2<u8>) -> GrayImage {
    let (rows, cols) = mask.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        image::Luma([mask[[y as usize, x as usize]]])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rows_to_points_swaps_order() {
        // (row, col) = (5, 10) must become (x, y) = (10, 5)
        let line = array![[5.0, 10.0], [6.0, 20.0]];
        let points = rows_to_points(&line);
        assert_eq!(points[0], ImagePoint::new(10.0, 5.0));
        assert_eq!(points[1], ImagePoint::new(20.0, 6.0));
    }

    #[test]
    fn test_points_to_rows_swaps_back() {
        let points = [ImagePoint::new(10.0, 5.0), ImagePoint::new(20.0, 6.0)];
        let line = points_to_rows(&points);
        assert_eq!(line[[0, 0]], 5.0);
        assert_eq!(line[[0, 1]], 10.0);
        assert_eq!(line[[1, 0]], 6.0);
        assert_eq!(line[[1, 1]], 20.0);
    }

    #[test]
    fn test_row_order_roundtrip() {
        let line = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        assert_eq!(points_to_rows(&rows_to_points(&line)), line);
    }

    #[test]
    fn test_mask_image_conversion() {
        let mut mask = Array2::zeros((3, 4));
        mask[[1, 2]] = 255u8;
        let image = mask_to_image(&mask);
        // (rows, cols) = (3, 4) means a 4x3 raster
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(2, 1)[0], 255);
        assert_eq!(mask_from_image(&image), mask);
    }
}
