//! Vector shape annotations drawn over a layer raster.

use crate::constants::style;
use crate::geometry::ImagePoint;
use crate::render::{DrawCommand, Frame};

/// The closed set of geometric forms a shape can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeForm {
    /// Two opposite corner points.
    Rectangle,
    /// Inscribed in the rectangle spanned by two corner points.
    Ellipse,
    /// Closed outline once finished; open preview while being drawn.
    Polygon,
    /// Open point sequence.
    Polyline,
    /// Open path capped at exactly two points.
    Line,
}

impl ShapeForm {
    /// Stable tag used in the sidecar file.
    pub fn tag(&self) -> &'static str {
        match self {
            ShapeForm::Rectangle => "rectangle",
            ShapeForm::Ellipse => "ellipse",
            ShapeForm::Polygon => "polygon",
            ShapeForm::Polyline => "polyline",
            ShapeForm::Line => "line",
        }
    }

    /// Parse a sidecar tag back into a form.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "rectangle" => Some(ShapeForm::Rectangle),
            "ellipse" => Some(ShapeForm::Ellipse),
            "polygon" => Some(ShapeForm::Polygon),
            "polyline" => Some(ShapeForm::Polyline),
            "line" => Some(ShapeForm::Line),
            _ => None,
        }
    }

    /// Whether this form is authored point-by-point with a live tail.
    pub fn is_path(&self) -> bool {
        matches!(
            self,
            ShapeForm::Polygon | ShapeForm::Polyline | ShapeForm::Line
        )
    }
}

/// A named vector annotation on a layer.
///
/// Geometry is stored in image-pixel coordinates and never rescaled; the
/// painter applies the current zoom at draw time. While `drawing` is set the
/// last point is the live tail tracking the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Category name; the key of the owning layer's shape list.
    pub name: String,
    pub form: ShapeForm,
    pub points: Vec<ImagePoint>,
    pub line_color: [u8; 3],
    pub line_width: u32,
    pub visible: bool,
    /// True only while the shape is being interactively authored.
    pub drawing: bool,
}

impl Shape {
    /// Create an empty shape of the given form with default styling.
    pub fn new(form: ShapeForm, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            form,
            points: Vec::new(),
            line_color: style::DEFAULT_LINE_COLOR,
            line_width: style::DEFAULT_LINE_WIDTH,
            visible: true,
            drawing: false,
        }
    }

    pub fn with_style(mut self, line_color: [u8; 3], line_width: u32) -> Self {
        self.line_color = line_color;
        self.line_width = line_width;
        self
    }

    pub fn with_points(mut self, points: Vec<ImagePoint>) -> Self {
        self.points = points;
        self
    }

    /// Rectangle from two opposite corners.
    pub fn rectangle(name: impl Into<String>, corner1: ImagePoint, corner2: ImagePoint) -> Self {
        Self::new(ShapeForm::Rectangle, name).with_points(vec![corner1, corner2])
    }

    /// Ellipse inscribed in the rectangle spanned by two corners.
    pub fn ellipse(name: impl Into<String>, corner1: ImagePoint, corner2: ImagePoint) -> Self {
        Self::new(ShapeForm::Ellipse, name).with_points(vec![corner1, corner2])
    }

    /// Straight segment between two endpoints.
    pub fn line(name: impl Into<String>, from: ImagePoint, to: ImagePoint) -> Self {
        Self::new(ShapeForm::Line, name).with_points(vec![from, to])
    }

    /// Emit this shape's outline into a frame, in image-pixel space.
    ///
    /// Shapes with fewer than two points have nothing meaningful to render
    /// and are skipped.
    pub fn draw(&self, frame: &mut Frame) {
        if self.points.len() < 2 {
            return;
        }
        match self.form {
            ShapeForm::Rectangle => frame.push(DrawCommand::StrokeRect {
                p1: self.points[0],
                p2: self.points[1],
                color: self.line_color,
                width: self.line_width,
            }),
            ShapeForm::Ellipse => frame.push(DrawCommand::StrokeEllipse {
                p1: self.points[0],
                p2: self.points[1],
                color: self.line_color,
                width: self.line_width,
            }),
            ShapeForm::Polygon => frame.push(DrawCommand::Polyline {
                points: self.points.clone(),
                color: self.line_color,
                width: self.line_width,
                // The in-progress edge to the cursor stays visible but the
                // outline is not auto-closed until drawing ends.
                closed: !self.drawing,
            }),
            ShapeForm::Polyline => frame.push(DrawCommand::Polyline {
                points: self.points.clone(),
                color: self.line_color,
                width: self.line_width,
                closed: false,
            }),
            ShapeForm::Line => frame.push(DrawCommand::Polyline {
                points: self.points[..2].to_vec(),
                color: self.line_color,
                width: self.line_width,
                closed: false,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_tag_roundtrip() {
        for form in [
            ShapeForm::Rectangle,
            ShapeForm::Ellipse,
            ShapeForm::Polygon,
            ShapeForm::Polyline,
            ShapeForm::Line,
        ] {
            assert_eq!(ShapeForm::from_tag(form.tag()), Some(form));
        }
        assert_eq!(ShapeForm::from_tag("blob"), None);
    }

    #[test]
    fn test_single_point_shape_draws_nothing() {
        let shape = Shape::new(ShapeForm::Polygon, "Roi Poly")
            .with_points(vec![ImagePoint::new(1.0, 1.0)]);
        let mut frame = Frame::new(1.0);
        shape.draw(&mut frame);
        assert!(frame.commands.is_empty());
    }

    #[test]
    fn test_polygon_open_while_drawing() {
        let mut shape = Shape::new(ShapeForm::Polygon, "Roi Poly").with_points(vec![
            ImagePoint::new(0.0, 0.0),
            ImagePoint::new(10.0, 0.0),
            ImagePoint::new(10.0, 10.0),
        ]);
        shape.drawing = true;

        let mut frame = Frame::new(1.0);
        shape.draw(&mut frame);
        assert!(matches!(
            frame.commands[0],
            DrawCommand::Polyline { closed: false, .. }
        ));

        shape.drawing = false;
        let mut frame = Frame::new(1.0);
        shape.draw(&mut frame);
        assert!(matches!(
            frame.commands[0],
            DrawCommand::Polyline { closed: true, .. }
        ));
    }

    #[test]
    fn test_line_caps_at_two_points() {
        let shape = Shape::new(ShapeForm::Line, "Rows Direction").with_points(vec![
            ImagePoint::new(0.0, 0.0),
            ImagePoint::new(5.0, 5.0),
            ImagePoint::new(9.0, 9.0),
        ]);
        let mut frame = Frame::new(1.0);
        shape.draw(&mut frame);
        match &frame.commands[0] {
            DrawCommand::Polyline { points, .. } => assert_eq!(points.len(), 2),
            other => panic!("expected polyline, got {other:?}"),
        }
    }
}
