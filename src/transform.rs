//! View transform mathematics.
//!
//! Screen-to-image coordinate conversion under pan, zoom and rotation,
//! plus fit-to-screen computation. Extracted for testability: nothing
//! here touches the store or the renderer.
//!
//! The stage applies pan then uniform scale; the image itself is
//! rotated about its own center. `screen_to_image` inverts that full
//! stack.

use crate::annotation::Point;
use crate::constants::{fit, zoom};

/// Per-canvas view state: uniform scale, pan offset and rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Uniform stage scale, clamped to `[zoom::MIN, zoom::MAX]`.
    pub scale: f32,
    /// Stage pan offset in screen px.
    pub position: Point,
    /// Rotation in degrees, normalized into `[0, 360)`.
    pub rotation: f32,
}

impl ViewTransform {
    /// Identity transform: scale 1, no pan, no rotation.
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            position: Point::new(0.0, 0.0),
            rotation: 0.0,
        }
    }

    /// Clamp a scale into the allowed zoom range.
    pub fn clamp_scale(scale: f32) -> f32 {
        scale.clamp(zoom::MIN, zoom::MAX)
    }

    /// Normalize an angle in degrees into `[0, 360)`.
    pub fn normalize_angle(angle: f32) -> f32 {
        let normalized = angle % 360.0;
        if normalized < 0.0 {
            normalized + 360.0
        } else {
            normalized
        }
    }

    /// Set the scale so the point under `anchor` (screen space) stays
    /// fixed while zooming. The new scale is clamped.
    pub fn zoom_at(&self, new_scale: f32, anchor: Point) -> Self {
        let clamped = Self::clamp_scale(new_scale);
        // Stage-space point under the anchor before zooming
        let img_x = (anchor.x - self.position.x) / self.scale;
        let img_y = (anchor.y - self.position.y) / self.scale;
        Self {
            scale: clamped,
            position: Point::new(anchor.x - img_x * clamped, anchor.y - img_y * clamped),
            rotation: self.rotation,
        }
    }

    /// Zoom in by the step factor, anchored at `anchor`.
    pub fn zoom_in(&self, anchor: Point) -> Self {
        self.zoom_at(self.scale * zoom::STEP_FACTOR, anchor)
    }

    /// Zoom out by the step factor, anchored at `anchor`.
    pub fn zoom_out(&self, anchor: Point) -> Self {
        self.zoom_at(self.scale / zoom::STEP_FACTOR, anchor)
    }

    /// One wheel notch: factor 1.1 per notch, anchored at the pointer.
    /// Positive `delta_y` (scroll down) zooms out.
    pub fn wheel_zoom(&self, delta_y: f32, pointer: Point) -> Self {
        let new_scale = if delta_y > 0.0 {
            self.scale / zoom::WHEEL_FACTOR
        } else {
            self.scale * zoom::WHEEL_FACTOR
        };
        self.zoom_at(new_scale, pointer)
    }

    /// Reset to 1:1 scale with no pan. Rotation is preserved.
    pub fn reset_zoom(&self) -> Self {
        Self {
            scale: 1.0,
            position: Point::new(0.0, 0.0),
            rotation: self.rotation,
        }
    }

    /// Translate the stage by a screen-space delta.
    pub fn pan_by(&self, dx: f32, dy: f32) -> Self {
        Self {
            scale: self.scale,
            position: Point::new(self.position.x + dx, self.position.y + dy),
            rotation: self.rotation,
        }
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_clockwise(&self) -> Self {
        self.rotate_to(self.rotation + 90.0)
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_counter_clockwise(&self) -> Self {
        self.rotate_to(self.rotation - 90.0)
    }

    /// Set an absolute rotation angle, normalized into `[0, 360)`.
    pub fn rotate_to(&self, angle: f32) -> Self {
        Self {
            scale: self.scale,
            position: self.position,
            rotation: Self::normalize_angle(angle),
        }
    }

    /// Compute the transform that scales and centers the (possibly
    /// rotated) image in the viewport, leaving `fit::MARGIN` screen px
    /// of total margin.
    pub fn fit_to_screen(
        image_size: (f32, f32),
        viewport_size: (f32, f32),
        rotation: f32,
    ) -> Self {
        let rotation = Self::normalize_angle(rotation);
        let (ew, eh) = effective_size(image_size, rotation);
        let (vw, vh) = viewport_size;

        let scale_x = (vw - fit::MARGIN) / ew.max(1.0);
        let scale_y = (vh - fit::MARGIN) / eh.max(1.0);
        let scale = Self::clamp_scale(scale_x.min(scale_y));

        // The rotated image's bounding box is centered on the image
        // center, so centering it reduces to placing that center at
        // the viewport center.
        let center_x = image_size.0 / 2.0;
        let center_y = image_size.1 / 2.0;
        Self {
            scale,
            position: Point::new(vw / 2.0 - scale * center_x, vh / 2.0 - scale * center_y),
            rotation,
        }
    }

    /// Convert a screen-space point to untransformed image pixel space,
    /// inverting pan, scale and the rotation about the image center.
    pub fn screen_to_image(&self, point: Point, image_size: (f32, f32)) -> Point {
        let stage_x = (point.x - self.position.x) / self.scale;
        let stage_y = (point.y - self.position.y) / self.scale;
        rotate_about_center(
            Point::new(stage_x, stage_y),
            image_size,
            -self.rotation,
        )
    }

    /// Convert an image-space point to screen space.
    pub fn image_to_screen(&self, point: Point, image_size: (f32, f32)) -> Point {
        let rotated = rotate_about_center(point, image_size, self.rotation);
        Point::new(
            self.position.x + rotated.x * self.scale,
            self.position.y + rotated.y * self.scale,
        )
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Bounding box of the image after rotation: width and height mix via
/// |cos| and |sin| when the angle is not a multiple of 180 degrees.
fn effective_size(image_size: (f32, f32), rotation: f32) -> (f32, f32) {
    let (w, h) = image_size;
    if rotation % 180.0 == 0.0 {
        (w, h)
    } else {
        let radians = rotation.to_radians();
        let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
        (w * cos + h * sin, w * sin + h * cos)
    }
}

fn rotate_about_center(point: Point, image_size: (f32, f32), angle_deg: f32) -> Point {
    if angle_deg % 360.0 == 0.0 {
        return point;
    }
    let cx = image_size.0 / 2.0;
    let cy = image_size.1 / 2.0;
    let radians = angle_deg.to_radians();
    let (sin, cos) = radians.sin_cos();
    let dx = point.x - cx;
    let dy = point.y - cy;
    Point::new(cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
}
