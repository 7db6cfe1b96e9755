//! The interactive tool state machine.
//!
//! All pointer and key events against the bound layer go through
//! [`DrawingController`]; it owns the active tool, the cursor icon, the
//! in-progress shape reference and the info overlay, so the invariants (at
//! most one shape being drawn, overlay visibility tied to the probe tool)
//! hold by construction. Every operation is a silent no-op when no layer is
//! bound.

use crate::constants::threshold;
use crate::event::{Key, MouseButton};
use crate::geometry::ScreenPoint;
use crate::model::{Layer, Shape, ShapeForm};
use crate::view::ViewPort;

/// The currently active interaction tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveTool {
    /// Drag to translate the view. Never mutates geometry.
    #[default]
    Pan,
    /// Author the current shape point by point.
    Draw,
    /// Click to sample the raster pixel under the cursor.
    ProbeInfo,
    /// Reserved for future shape selection.
    Select,
}

/// Cursor the surrounding view should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorIcon {
    OpenHand,
    ClosedHand,
    Crosshair,
    /// Crosshair variant shown when a press would close the polygon.
    ClosePolygon,
    Arrow,
}

/// Pixel-probe result anchored near the press position.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoOverlay {
    pub text: String,
    pub position: ScreenPoint,
}

/// Tool state machine for the canvas.
#[derive(Debug, Default)]
pub struct DrawingController {
    tool: ActiveTool,
    cursor: Option<CursorIcon>,
    /// Global pointer position the pan drag was last anchored at.
    drag_anchor: Option<ScreenPoint>,
    /// Category of the shape currently being authored. The shape itself
    /// lives in the layer's mapping so it renders while being drawn.
    current_category: Option<String>,
    info: Option<InfoOverlay>,
}

impl DrawingController {
    pub fn new() -> Self {
        Self {
            tool: ActiveTool::Pan,
            cursor: Some(CursorIcon::OpenHand),
            drag_anchor: None,
            current_category: None,
            info: None,
        }
    }

    pub fn tool(&self) -> ActiveTool {
        self.tool
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor.unwrap_or(CursorIcon::Arrow)
    }

    pub fn info_overlay(&self) -> Option<&InfoOverlay> {
        self.info.as_ref()
    }

    /// Switch to the pan tool.
    pub fn set_tool_pan(&mut self, layer: Option<&mut Layer>) {
        self.unset_tool(layer);
        self.tool = ActiveTool::Pan;
        self.cursor = Some(CursorIcon::OpenHand);
    }

    /// Switch to the info-probe tool. No-op without a bound layer.
    pub fn set_tool_probe_info(&mut self, layer: Option<&mut Layer>) {
        let Some(layer) = layer else { return };
        self.unset_tool(Some(layer));
        self.tool = ActiveTool::ProbeInfo;
        self.cursor = Some(CursorIcon::Arrow);
    }

    /// Switch to the (reserved) selection tool.
    pub fn set_tool_select(&mut self, layer: Option<&mut Layer>) {
        self.unset_tool(layer);
        self.tool = ActiveTool::Select;
        self.cursor = Some(CursorIcon::Arrow);
    }

    /// Arm polygon drawing: a fresh in-progress polygon replaces the named
    /// category's shape list. No-op without a bound layer.
    pub fn set_tool_draw_polygon(
        &mut self,
        layer: Option<&mut Layer>,
        name: &str,
        line_color: [u8; 3],
        line_width: u32,
    ) {
        self.start_drawing(layer, ShapeForm::Polygon, name, line_color, line_width);
    }

    /// Arm line drawing, same mechanics capped at two points.
    pub fn set_tool_draw_line(
        &mut self,
        layer: Option<&mut Layer>,
        name: &str,
        line_color: [u8; 3],
        line_width: u32,
    ) {
        self.start_drawing(layer, ShapeForm::Line, name, line_color, line_width);
    }

    fn start_drawing(
        &mut self,
        layer: Option<&mut Layer>,
        form: ShapeForm,
        name: &str,
        line_color: [u8; 3],
        line_width: u32,
    ) {
        let Some(layer) = layer else { return };
        self.unset_tool(Some(layer));

        let name = if name.is_empty() {
            (layer.shapes.len() + 1).to_string()
        } else {
            name.to_string()
        };
        let mut shape = Shape::new(form, &name).with_style(line_color, line_width);
        shape.drawing = true;
        layer.shapes.insert(name.clone(), vec![shape]);

        log::debug!("🖌️ drawing {} '{}'", form.tag(), name);
        self.current_category = Some(name);
        self.tool = ActiveTool::Draw;
        self.cursor = Some(CursorIcon::Crosshair);
    }

    /// Primary-button press.
    pub fn mouse_pressed(
        &mut self,
        layer: Option<&mut Layer>,
        viewport: &mut ViewPort,
        button: MouseButton,
        position: ScreenPoint,
        global: ScreenPoint,
    ) {
        let Some(layer) = layer else { return };
        if button != MouseButton::Left {
            return;
        }
        match self.tool {
            ActiveTool::Pan => {
                self.drag_anchor = Some(global);
                self.cursor = Some(CursorIcon::ClosedHand);
            }
            ActiveTool::Draw => self.draw_press(layer, viewport, position),
            ActiveTool::ProbeInfo => self.probe_press(layer, viewport, position),
            ActiveTool::Select => {}
        }
    }

    /// Pointer move; pans while dragging, tracks the live tail while
    /// drawing.
    pub fn mouse_moved(
        &mut self,
        layer: Option<&mut Layer>,
        viewport: &mut ViewPort,
        position: ScreenPoint,
        global: ScreenPoint,
    ) {
        let Some(layer) = layer else { return };
        match self.tool {
            ActiveTool::Pan => {
                if let Some(anchor) = self.drag_anchor {
                    viewport.pan_by(global.x - anchor.x, global.y - anchor.y);
                    layer.view_position = viewport.position();
                    self.drag_anchor = Some(global);
                }
            }
            ActiveTool::Draw => self.draw_move(layer, viewport, position),
            _ => {}
        }
    }

    /// Primary-button release ends a pan drag.
    pub fn mouse_released(&mut self, button: MouseButton) {
        if button == MouseButton::Left && self.tool == ActiveTool::Pan {
            self.drag_anchor = None;
            self.cursor = Some(CursorIcon::OpenHand);
        }
    }

    /// Escape discards the in-progress shape.
    pub fn key_pressed(&mut self, layer: Option<&mut Layer>, key: Key) {
        let Some(layer) = layer else { return };
        if key == Key::Escape && self.tool == ActiveTool::Draw {
            self.cancel_drawing(layer);
        }
    }

    fn draw_press(&mut self, layer: &mut Layer, viewport: &ViewPort, position: ScreenPoint) {
        let Some(category) = self.current_category.clone() else {
            return;
        };
        let point = viewport.screen_to_image(position);
        let mut finish = false;

        let Some(shape) = layer.shapes.get_mut(&category).and_then(|s| s.last_mut()) else {
            return;
        };
        if !shape.form.is_path() {
            return;
        }
        if shape.form == ShapeForm::Line && shape.points.len() == 2 {
            // Both endpoints already placed, any further press ends the line
            finish = true;
        } else if shape.form == ShapeForm::Polygon
            && shape.points.len() >= threshold::POLYGON_JOIN_MIN_POINTS
            && point.manhattan_to(&shape.points[0]) < threshold::POLYGON_JOIN
        {
            // Close by joining to the first vertex: the press point is not
            // added and the live tail is discarded
            shape.points.pop();
            finish = true;
        } else {
            // Committed point plus the live tail that tracks the cursor
            shape.points.push(point);
            shape.points.push(point);
        }

        if finish {
            self.end_drawing(layer);
        }
    }

    fn draw_move(&mut self, layer: &mut Layer, viewport: &ViewPort, position: ScreenPoint) {
        let Some(category) = &self.current_category else {
            return;
        };
        let Some(shape) = layer.shapes.get_mut(category).and_then(|s| s.last_mut()) else {
            return;
        };
        if !shape.form.is_path() || shape.points.is_empty() {
            return;
        }

        let point = viewport.screen_to_image(position);
        let tail = shape.points.len() - 1;
        shape.points[tail] = point;

        if shape.form == ShapeForm::Polygon
            && shape.points.len() >= threshold::POLYGON_JOIN_MIN_POINTS
        {
            self.cursor = if point.manhattan_to(&shape.points[0]) < threshold::POLYGON_JOIN {
                Some(CursorIcon::ClosePolygon)
            } else {
                Some(CursorIcon::Crosshair)
            };
        }
    }

    fn probe_press(&mut self, layer: &Layer, viewport: &ViewPort, position: ScreenPoint) {
        let point = viewport.screen_to_image(position);
        if let Some([r, g, b]) = layer.probe_color(point) {
            let text = format!(
                "RGB color: ({r}, {g}, {b})\nPosition: ({:.0}, {:.0})",
                point.x, point.y
            );
            log::debug!("🔍 probe at ({:.0}, {:.0}): ({r}, {g}, {b})", point.x, point.y);
            self.info = Some(InfoOverlay { text, position });
        }
    }

    fn end_drawing(&mut self, layer: &mut Layer) {
        if let Some(category) = self.current_category.take() {
            if let Some(shape) = layer.shapes.get_mut(&category).and_then(|s| s.last_mut()) {
                shape.drawing = false;
                log::debug!(
                    "✅ finished '{}' with {} points",
                    category,
                    shape.points.len()
                );
            }
        }
        self.tool = ActiveTool::Pan;
        self.cursor = Some(CursorIcon::OpenHand);
    }

    fn cancel_drawing(&mut self, layer: &mut Layer) {
        if let Some(category) = self.current_category.take() {
            remove_last_shape(layer, &category);
            log::debug!("❌ drawing of '{}' cancelled", category);
        }
        self.tool = ActiveTool::Pan;
        self.cursor = Some(CursorIcon::OpenHand);
    }

    /// Deactivate the current tool symmetrically: hide the probe overlay,
    /// discard an unfinished shape.
    fn unset_tool(&mut self, layer: Option<&mut Layer>) {
        match self.tool {
            ActiveTool::ProbeInfo => {
                self.info = None;
            }
            ActiveTool::Draw => {
                if let Some(layer) = layer {
                    if let Some(category) = self.current_category.take() {
                        let unfinished = layer
                            .shapes
                            .get(&category)
                            .and_then(|s| s.last())
                            .is_some_and(|s| s.drawing);
                        if unfinished {
                            remove_last_shape(layer, &category);
                            log::debug!("❌ discarded unfinished '{}'", category);
                        }
                    }
                }
            }
            _ => {}
        }
        self.drag_anchor = None;
    }
}

/// Drop the most recent shape of a category; an emptied category key is
/// removed entirely.
fn remove_last_shape(layer: &mut Layer, category: &str) {
    if let Some(shapes) = layer.shapes.get_mut(category) {
        shapes.pop();
        if shapes.is_empty() {
            layer.shapes.remove(category);
        }
    }
}
