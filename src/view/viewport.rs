//! Pan/zoom state for the displayed layer.

use crate::constants::zoom;
use crate::geometry::{ImagePoint, Rect, ScreenPoint, Size};

/// Pan/zoom state bound to one layer at a time.
///
/// `scale` is screen pixels per image pixel; `position` is the offset of the
/// image's top-left corner in the containing view. The rendered size is kept
/// inside a fixed bound so the image can neither vanish nor grow absurd.
#[derive(Debug, Clone)]
pub struct ViewPort {
    scale: f64,
    position: [f64; 2],
    image_size: Size,
    container_size: Size,
    size_limits: (f64, f64),
}

impl ViewPort {
    pub fn new(image_size: Size, container_size: Size) -> Self {
        Self {
            scale: 1.0,
            position: [0.0, 0.0],
            image_size,
            container_size,
            size_limits: (zoom::RENDERED_MIN, zoom::RENDERED_MAX),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    pub fn image_size(&self) -> Size {
        self.image_size
    }

    /// Restore persisted view state, e.g. from a layer's sidecar.
    pub fn set_view(&mut self, scale: f64, position: [f64; 2]) {
        self.scale = scale;
        self.position = position;
    }

    pub fn set_container_size(&mut self, size: Size) {
        self.container_size = size;
    }

    /// Image rectangle in container coordinates at the current view state.
    pub fn rect(&self) -> Rect {
        let rendered = self.rendered_size();
        Rect::new(
            self.position[0],
            self.position[1],
            rendered.width,
            rendered.height,
        )
    }

    pub fn rendered_size(&self) -> Size {
        self.image_size.scaled(self.scale)
    }

    /// Fit the whole image into the container and center it.
    pub fn fit_to_container(&mut self) {
        if self.image_size.width <= 0.0 || self.image_size.height <= 0.0 {
            return;
        }
        self.scale = (self.container_size.width / self.image_size.width)
            .min(self.container_size.height / self.image_size.height);
        self.center();
    }

    fn center(&mut self) {
        let rendered = self.rendered_size();
        self.position = [
            (self.container_size.width - rendered.width) / 2.0,
            (self.container_size.height - rendered.height) / 2.0,
        ];
    }

    /// Zoom by a multiplicative factor, keeping the current widget center
    /// fixed.
    ///
    /// The request is rejected (state untouched, returns `false`) when the
    /// candidate's larger rendered dimension would leave the configured
    /// bounds.
    pub fn zoom_by(&mut self, factor: f64) -> bool {
        let scale = factor * self.scale;
        let max_dim = self.image_size.scaled(scale).max_dim();
        if max_dim <= self.size_limits.0 || max_dim >= self.size_limits.1 {
            log::debug!("zoom to {scale:.3} rejected, rendered dim {max_dim:.0} out of bounds");
            return false;
        }

        let old_center = self.rect().center();
        self.scale = scale;
        let rendered = self.rendered_size();
        self.position = [
            old_center.x - rendered.width / 2.0,
            old_center.y - rendered.height / 2.0,
        ];
        true
    }

    /// Smooth wheel response: one wheel notch is one zoom step, fractional
    /// deltas give fractional steps.
    pub fn wheel_factor(delta: f64) -> f64 {
        zoom::STEP.powf(delta / zoom::WHEEL_UNIT)
    }

    /// Translate the view by a pointer delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.position[0] += dx;
        self.position[1] += dy;
    }

    /// Map a point local to the displayed image region into image pixels.
    ///
    /// The viewport offset is already subtracted caller-side; only the scale
    /// remains.
    pub fn screen_to_image(&self, point: ScreenPoint) -> ImagePoint {
        ImagePoint::new(point.x / self.scale, point.y / self.scale)
    }
}
