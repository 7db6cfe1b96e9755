//! Color-scale legend for pseudo-colored layers.
//!
//! Pure rendering component: given a layer's color ramp and value range it
//! lays out a vertical color bar with evenly spaced numeric tick labels. It
//! never mutates layer state and is rebuilt whenever the shown layer's
//! colormap or range changes.

use crate::constants::legend;
use crate::geometry::{Rect, ScreenPoint};
use crate::render::{DrawCommand, TextMetrics};

/// Legend layout and label state for one colormap/range pair.
#[derive(Debug, Clone)]
pub struct ColorScaleLegend {
    colormap: Vec<[u8; 3]>,
    labels: Vec<String>,
    /// Tick positions as fractions of the bar height.
    label_pos: Vec<f64>,
    /// Vertical nudge per label so the first and last stay inside the bar.
    label_offset: Vec<f64>,
    label_max_width: f64,
    margin: f64,
    width_hint: f64,
    metrics: TextMetrics,
}

impl ColorScaleLegend {
    pub fn new(metrics: TextMetrics) -> Self {
        let mut this = Self {
            colormap: Vec::new(),
            labels: Vec::new(),
            label_pos: Vec::new(),
            label_offset: Vec::new(),
            label_max_width: 0.0,
            margin: 0.0,
            width_hint: 0.0,
            metrics,
        };
        this.set_color_map(None, None);
        this
    }

    /// Rebuild the legend for a new ramp and value range. `None` falls back
    /// to a black-to-white ramp over `[0, 1]`.
    pub fn set_color_map(&mut self, colormap: Option<&[[u8; 3]]>, limits: Option<[f64; 2]>) {
        let colormap = colormap.unwrap_or(&[[0, 0, 0], [255, 255, 255]]);
        let limits = limits.unwrap_or([0.0, 1.0]);
        let count = legend::TICK_COUNT;

        self.colormap = colormap.to_vec();
        self.labels = format_tick_labels(limits, count);
        self.label_pos = (0..count)
            .map(|i| i as f64 / (count - 1) as f64)
            .collect();

        // Nudge every label toward the bar; the first sits fully below its
        // tick and the last fully above, so both stay inside the widget
        let line = self.metrics.line_height;
        self.label_offset = vec![0.3 * line; count];
        self.label_offset[0] = line;
        self.label_offset[count - 1] = 0.0;

        self.label_max_width = self
            .labels
            .iter()
            .map(|label| self.metrics.text_width(label))
            .fold(0.0, f64::max);

        self.margin = self
            .label_offset
            .iter()
            .copied()
            .fold(0.0, f64::max);
        self.width_hint = legend::BAR_WIDTH
            + self.label_max_width
            + legend::LABEL_MARGIN
            + 2.0 * self.margin
            + 1.0;
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Width the widget should reserve: bar, widest label, margins.
    pub fn width_hint(&self) -> f64 {
        self.width_hint
    }

    /// Emit the color bar and tick labels for the given widget rectangle.
    pub fn paint(&self, widget: Rect) -> Vec<DrawCommand> {
        let x = widget.x + self.margin;
        let y = widget.y + self.margin;
        let w = widget.width - 2.0 * self.margin - legend::LABEL_MARGIN - self.label_max_width - 1.0;
        let h = widget.height - 2.0 * self.margin;

        let mut commands = vec![DrawCommand::ColorRamp {
            rect: Rect::new(x, y, w, h),
            colors: self.colormap.clone(),
        }];

        let label_x = x + w + legend::LABEL_MARGIN;
        for (i, label) in self.labels.iter().enumerate() {
            let label_y = y + h * self.label_pos[i] + self.label_offset[i];
            commands.push(DrawCommand::Text {
                text: label.clone(),
                position: ScreenPoint::new(label_x, label_y),
                size: self.metrics.line_height,
            });
        }
        commands
    }
}

/// Format evenly spaced tick values across a range: fixed-point normally,
/// scientific notation when every tick is smaller in magnitude than the
/// small-value threshold.
fn format_tick_labels(limits: [f64; 2], count: usize) -> Vec<String> {
    let step = (limits[1] - limits[0]) / (count - 1) as f64;
    let values: Vec<f64> = (0..count).map(|i| limits[0] + i as f64 * step).collect();
    let max_abs = values.iter().map(|v| v.abs()).fold(0.0, f64::max);

    if max_abs >= legend::SCIENTIFIC_BELOW {
        values.iter().map(|v| format!("{v:.2}")).collect()
    } else {
        values.iter().map(|v| format!("{v:.2E}")).collect()
    }
}
