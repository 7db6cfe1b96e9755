//! Retained draw-command painter surface.
//!
//! The canvas does not render pixels itself; painting produces a list of
//! draw commands that the surrounding renderer executes. Shape geometry is
//! emitted in image-pixel space and scaled once at draw time through the
//! frame's painter scale, so stored points never depend on the zoom level.

use crate::geometry::{ImagePoint, Rect, ScreenPoint};

/// A draw command to be executed during rendering.
///
/// `Raster`, `ColorRamp` and `Text` are in screen space; the stroke commands
/// are in image space and subject to [`Frame::scale`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Blit the bound layer's raster into `rect`.
    Raster { rect: Rect },
    /// Draw a vertical color-ramp strip, first color at the top.
    ColorRamp { rect: Rect, colors: Vec<[u8; 3]> },
    /// Stroke the rectangle spanned by two opposite corners.
    StrokeRect {
        p1: ImagePoint,
        p2: ImagePoint,
        color: [u8; 3],
        width: u32,
    },
    /// Stroke the ellipse inscribed in the rectangle spanned by two corners.
    StrokeEllipse {
        p1: ImagePoint,
        p2: ImagePoint,
        color: [u8; 3],
        width: u32,
    },
    /// Stroke an open or closed point sequence.
    Polyline {
        points: Vec<ImagePoint>,
        color: [u8; 3],
        width: u32,
        closed: bool,
    },
    /// Draw a text run anchored at `position`.
    Text {
        text: String,
        position: ScreenPoint,
        size: f64,
    },
}

/// One painted frame: a painter scale plus the commands drawn under it.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Painter-level zoom applied to image-space commands at draw time.
    pub scale: f64,
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

/// Glyph measurements the legend uses for label layout.
///
/// The renderer owns the real font; this is the fixed-pitch approximation it
/// hands to layout code.
#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
}

impl TextMetrics {
    /// Width of a single-line text run.
    pub fn text_width(&self, text: &str) -> f64 {
        self.char_width * text.chars().count() as f64
    }
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 14.0,
        }
    }
}
