//! The canvas: one layer bound to a viewport and the tool state machine.
//!
//! The surrounding application owns the layers; the canvas receives the
//! currently bound one by reference with each call. View changes are written
//! back into the layer's persisted view state so pan/zoom survive a reload.

use crate::constants::style;
use crate::event::{Event, MouseButton};
use crate::geometry::{GeoPoint, Rect, ScreenPoint, Size};
use crate::model::{Layer, NoTransform};
use crate::render::{DrawCommand, Frame};
use crate::view::tools::{CursorIcon, DrawingController};
use crate::view::ViewPort;

/// Interaction facade over a viewport and a drawing controller.
pub struct Canvas {
    viewport: ViewPort,
    controller: DrawingController,
    container_size: Size,
}

impl Canvas {
    pub fn new(container_size: Size) -> Self {
        Self {
            viewport: ViewPort::new(Size::default(), container_size),
            controller: DrawingController::new(),
            container_size,
        }
    }

    pub fn viewport(&self) -> &ViewPort {
        &self.viewport
    }

    pub fn controller(&self) -> &DrawingController {
        &self.controller
    }

    pub fn cursor(&self) -> CursorIcon {
        self.controller.cursor()
    }

    /// Bind a layer for display. Restores the layer's persisted view state,
    /// or fits the image to the container when the layer has never been
    /// shown. Returns `false` (and binds nothing) for an empty layer.
    pub fn show_layer(&mut self, layer: &mut Layer) -> bool {
        let Some(image_size) = layer.image_size() else {
            log::warn!("refusing to show empty layer '{}'", layer.name);
            return false;
        };

        self.viewport = ViewPort::new(image_size, self.container_size);
        if layer.has_default_view() {
            self.viewport.fit_to_container();
            sync_view(&self.viewport, layer);
        } else {
            self.viewport
                .set_view(layer.view_scale, layer.view_position);
        }
        log::debug!(
            "showing layer '{}' at {:.3}x",
            layer.name,
            self.viewport.scale()
        );
        true
    }

    /// React to a container resize; a never-adjusted view refits.
    pub fn resize(&mut self, container_size: Size, layer: Option<&mut Layer>) {
        self.container_size = container_size;
        self.viewport.set_container_size(container_size);
        if let Some(layer) = layer {
            if layer.has_default_view() {
                self.viewport.fit_to_container();
                sync_view(&self.viewport, layer);
            }
        }
    }

    /// Dispatch one input event against the bound layer. A no-op without
    /// one.
    pub fn handle_event(&mut self, event: &Event, layer: Option<&mut Layer>) {
        match event {
            Event::MousePressed {
                button,
                position,
                global,
            } => {
                self.controller
                    .mouse_pressed(layer, &mut self.viewport, *button, *position, *global);
            }
            Event::MouseMoved { position, global } => {
                self.controller
                    .mouse_moved(layer, &mut self.viewport, *position, *global);
            }
            Event::MouseReleased { button } => self.controller.mouse_released(*button),
            Event::MouseDoubleClicked { button } => {
                if *button == MouseButton::Left {
                    if let Some(layer) = layer {
                        self.viewport.fit_to_container();
                        sync_view(&self.viewport, layer);
                    }
                }
            }
            Event::MouseWheel { delta } => {
                self.zoom_by(ViewPort::wheel_factor(*delta), layer);
            }
            Event::KeyPressed { key } => self.controller.key_pressed(layer, *key),
        }
    }

    pub fn zoom_in(&mut self, layer: Option<&mut Layer>) {
        self.zoom_by(crate::constants::zoom::STEP, layer);
    }

    pub fn zoom_out(&mut self, layer: Option<&mut Layer>) {
        self.zoom_by(1.0 / crate::constants::zoom::STEP, layer);
    }

    fn zoom_by(&mut self, factor: f64, layer: Option<&mut Layer>) {
        let Some(layer) = layer else { return };
        if self.viewport.zoom_by(factor) {
            sync_view(&self.viewport, layer);
        }
    }

    /// Switch to the pan tool.
    pub fn set_tool_pan(&mut self, layer: Option<&mut Layer>) {
        self.controller.set_tool_pan(layer);
    }

    /// Switch to the info-probe tool.
    pub fn set_tool_probe_info(&mut self, layer: Option<&mut Layer>) {
        self.controller.set_tool_probe_info(layer);
    }

    /// Switch to the (reserved) selection tool.
    pub fn set_tool_select(&mut self, layer: Option<&mut Layer>) {
        self.controller.set_tool_select(layer);
    }

    /// Arm interactive polygon drawing for a category.
    pub fn set_tool_draw_polygon(
        &mut self,
        layer: Option<&mut Layer>,
        name: &str,
        line_color: [u8; 3],
        line_width: u32,
    ) {
        self.controller
            .set_tool_draw_polygon(layer, name, line_color, line_width);
    }

    /// Arm interactive line drawing for a category.
    pub fn set_tool_draw_line(
        &mut self,
        layer: Option<&mut Layer>,
        name: &str,
        line_color: [u8; 3],
        line_width: u32,
    ) {
        self.controller
            .set_tool_draw_line(layer, name, line_color, line_width);
    }

    /// Toggle visibility of one category, or of all shapes when `name` is
    /// `None`.
    pub fn set_shape_visible(layer: Option<&mut Layer>, name: Option<&str>, visible: bool) {
        let Some(layer) = layer else { return };
        match name {
            None => {
                for shapes in layer.shapes.values_mut() {
                    for shape in shapes {
                        shape.visible = visible;
                    }
                }
            }
            Some(name) => {
                if let Some(shapes) = layer.shapes.get_mut(name) {
                    for shape in shapes {
                        shape.visible = visible;
                    }
                }
            }
        }
    }

    /// Delete one category, or every shape when `name` is `None`.
    pub fn delete_shape(layer: Option<&mut Layer>, name: Option<&str>) {
        let Some(layer) = layer else { return };
        match name {
            None => layer.shapes.clear(),
            Some(name) => {
                layer.shapes.remove(name);
            }
        }
    }

    /// Geographic coordinate of a displayed point, if the layer is
    /// calibrated.
    pub fn geo_at(&self, layer: &Layer, position: ScreenPoint) -> Result<GeoPoint, NoTransform> {
        layer.pixel_to_geo(self.viewport.screen_to_image(position))
    }

    /// Paint the bound layer: raster first, then every visible shape of
    /// every category in image space under the painter scale, then the probe
    /// overlay.
    pub fn paint(&self, layer: &Layer) -> Frame {
        let mut frame = Frame::new(self.viewport.scale());
        let rendered = self.viewport.rendered_size();
        frame.push(DrawCommand::Raster {
            rect: Rect::new(0.0, 0.0, rendered.width, rendered.height),
        });
        for shapes in layer.shapes.values() {
            for shape in shapes {
                if shape.visible {
                    shape.draw(&mut frame);
                }
            }
        }
        if let Some(info) = self.controller.info_overlay() {
            frame.push(DrawCommand::Text {
                text: info.text.clone(),
                position: info.position,
                size: style::INFO_TEXT_SIZE,
            });
        }
        frame
    }
}

fn sync_view(viewport: &ViewPort, layer: &mut Layer) {
    layer.view_scale = viewport.scale();
    layer.view_position = viewport.position();
}
