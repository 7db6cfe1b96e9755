//! Input events the canvas responds to.
//!
//! Positions come in two flavors: `position` is local to the displayed image
//! region (its top-left corner is the origin, the viewport offset already
//! subtracted by the caller), while `global` is the pointer position in the
//! containing view, used to anchor pan drags independent of the moving image.

use crate::geometry::ScreenPoint;

/// Events delivered to the canvas by the surrounding application.
#[derive(Debug, Clone)]
pub enum Event {
    /// Mouse button pressed.
    MousePressed {
        button: MouseButton,
        position: ScreenPoint,
        global: ScreenPoint,
    },
    /// Mouse button released.
    MouseReleased { button: MouseButton },
    /// Mouse moved.
    MouseMoved {
        position: ScreenPoint,
        global: ScreenPoint,
    },
    /// Mouse button double-clicked.
    MouseDoubleClicked { button: MouseButton },
    /// Mouse wheel scrolled, in wheel-delta units (one notch = 120).
    MouseWheel { delta: f64 },
    /// Keyboard key pressed.
    KeyPressed { key: Key },
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Keyboard keys (the subset the canvas reacts to).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Space,
    Delete,
}
