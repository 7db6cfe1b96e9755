//! Interaction and layout constants shared across the canvas components.

/// Interaction threshold constants.
pub mod threshold {
    /// Manhattan distance (image pixels) to the first polygon vertex that
    /// closes the polygon.
    pub const POLYGON_JOIN: f64 = 20.0;
    /// A polygon needs this many buffered points (including the live tail)
    /// before the join test is considered.
    pub const POLYGON_JOIN_MIN_POINTS: usize = 4;
}

/// Zoom constants.
pub mod zoom {
    /// Multiplicative step for one zoom-in/zoom-out action.
    pub const STEP: f64 = 1.25;
    /// Wheel delta corresponding to one full zoom step.
    pub const WHEEL_UNIT: f64 = 120.0;
    /// Smallest allowed rendered dimension (screen pixels).
    pub const RENDERED_MIN: f64 = 128.0;
    /// Largest allowed rendered dimension (screen pixels).
    pub const RENDERED_MAX: f64 = 8192.0;
}

/// Color-scale legend constants.
pub mod legend {
    /// Number of tick labels along the color bar.
    pub const TICK_COUNT: usize = 4;
    /// Width of the color bar itself.
    pub const BAR_WIDTH: f64 = 50.0;
    /// Gap between the bar and its labels.
    pub const LABEL_MARGIN: f64 = 5.0;
    /// Below this maximum absolute tick value, labels switch to scientific
    /// notation.
    pub const SCIENTIFIC_BELOW: f64 = 0.1;
}

/// Shape styling defaults.
pub mod style {
    /// Default shape outline width.
    pub const DEFAULT_LINE_WIDTH: u32 = 2;
    /// Default shape outline color.
    pub const DEFAULT_LINE_COLOR: [u8; 3] = [0, 0, 0];
    /// Info-probe overlay text size.
    pub const INFO_TEXT_SIZE: f64 = 12.0;
}

/// File naming conventions.
pub mod file {
    /// Extension of the per-raster sidecar metadata file.
    pub const SIDECAR_EXT: &str = "im";
    /// Extension of the project settings file.
    pub const PROJECT_EXT: &str = "agf";
    /// Extension used for layer raster files inside a project directory.
    pub const LAYER_IMAGE_EXT: &str = "png";
}
