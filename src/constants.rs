//! Shared constants for the canvas core.
//!
//! This module centralizes hardcoded values for zoom limits, stroke
//! widths, handle geometry and persistence timing.

/// Zoom limits and step factors.
pub mod zoom {
    /// Minimum stage scale
    pub const MIN: f32 = 0.1;
    /// Maximum stage scale
    pub const MAX: f32 = 10.0;
    /// Multiplier per mouse-wheel notch
    pub const WHEEL_FACTOR: f32 = 1.1;
    /// Multiplier for keyboard/button zoom steps
    pub const STEP_FACTOR: f32 = 1.2;
}

/// Fit-to-screen layout.
pub mod fit {
    /// Total margin (in screen px) left around the fitted image
    pub const MARGIN: f32 = 40.0;
}

/// Rectangle stroke styling. All widths are screen px; the render layer
/// divides by the current scale so strokes stay visually constant.
pub mod stroke {
    /// Stroke width of an unselected annotation rectangle
    pub const BASE_WIDTH: f32 = 2.0;
    /// Stroke width of the selected annotation rectangle
    pub const SELECTED_WIDTH: f32 = 3.0;
    /// Dash pattern for missing-region rectangles
    pub const MISSING_DASH: [f32; 2] = [10.0, 5.0];
    /// Dash pattern for the transient draft rectangle while drawing
    pub const DRAFT_DASH: [f32; 2] = [5.0, 5.0];
}

/// Corner resize handle geometry (screen px, scaled like strokes).
pub mod handle {
    /// Handle circle diameter
    pub const DIAMETER: f32 = 8.0;
    /// Handle outline stroke width
    pub const STROKE_WIDTH: f32 = 1.0;
    /// Extra grab slop around a handle for pointer hit-testing
    pub const HIT_SLOP: f32 = 2.0;
}

/// Annotation label styling (screen px, scaled like strokes).
pub mod label {
    /// Label font size
    pub const FONT_SIZE: f32 = 14.0;
    /// Vertical offset of the label above the box top edge
    pub const OFFSET_Y: f32 = 25.0;
}

/// Persistence timing.
pub mod save {
    use std::time::Duration;

    /// Quiet window after the last edit before a debounced save fires
    pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(2000);
    /// Interval of the independent background flush
    pub const PERIODIC_INTERVAL: Duration = Duration::from_secs(30);
}
