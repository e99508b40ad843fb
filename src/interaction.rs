//! Interaction state machine vocabulary.
//!
//! Modes, pointer-drag states and keyboard commands consumed by the
//! editor. The types here are renderer-agnostic: the host translates
//! its own pointer/keyboard events into these and feeds them to
//! [`crate::editor::CanvasEditor`].

use crate::annotation::{AnnotationId, Corner, Point};

/// Interaction mode of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Select, pan, move and resize existing annotations.
    #[default]
    Select,
    /// Drag on empty space draws a new bounding box.
    Draw,
}

impl Mode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Select => "Select",
            Mode::Draw => "Draw",
        }
    }
}

/// Pointer-drag state between pointer-down and pointer-up.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    /// No drag in progress.
    #[default]
    Idle,
    /// Drawing a new box; the start corner is fixed in image space.
    Drawing { start: Point },
    /// Panning the stage; `last` is the previous pointer position in
    /// screen space.
    Panning { last: Point },
    /// Moving an annotation body; `grab_offset` is the image-space
    /// offset from the box origin to the grab point.
    Moving {
        id: AnnotationId,
        grab_offset: Point,
    },
    /// Dragging a corner resize handle; the opposite corner stays
    /// anchored.
    Resizing { id: AnnotationId, corner: Corner },
}

impl DragState {
    /// Whether a new box is actively being drawn.
    pub fn is_drawing(&self) -> bool {
        matches!(self, DragState::Drawing { .. })
    }

    /// Whether any drag is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, DragState::Idle)
    }
}

/// Keyboard commands understood by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Delete the selected annotation (`Delete`/`Backspace`).
    DeleteSelected,
    /// Clear the selection (`Escape`).
    Deselect,
    /// Zoom in one step (`+`/`=`).
    ZoomIn,
    /// Zoom out one step (`-`).
    ZoomOut,
    /// Reset to 1:1 zoom (`0`).
    ResetZoom,
    /// Fit the image to the viewport (`f`/`F`).
    FitToScreen,
    /// Rotate 90 degrees clockwise (`r`, `Ctrl+ArrowRight`).
    RotateClockwise,
    /// Rotate 90 degrees counter-clockwise (`Shift+R`, `Ctrl+ArrowLeft`).
    RotateCounterClockwise,
}

impl KeyCommand {
    /// Map a DOM-style key name plus modifiers to a command.
    ///
    /// Returns `None` for keys the canvas does not handle, so the host
    /// can let them propagate.
    pub fn from_key(key: &str, shift: bool, ctrl: bool) -> Option<Self> {
        match key {
            "Delete" | "Backspace" => Some(KeyCommand::DeleteSelected),
            "Escape" => Some(KeyCommand::Deselect),
            "+" | "=" => Some(KeyCommand::ZoomIn),
            "-" => Some(KeyCommand::ZoomOut),
            "0" => Some(KeyCommand::ResetZoom),
            "f" | "F" => Some(KeyCommand::FitToScreen),
            "r" | "R" => {
                if shift {
                    Some(KeyCommand::RotateCounterClockwise)
                } else {
                    Some(KeyCommand::RotateClockwise)
                }
            }
            "ArrowLeft" if ctrl => Some(KeyCommand::RotateCounterClockwise),
            "ArrowRight" if ctrl => Some(KeyCommand::RotateClockwise),
            _ => None,
        }
    }

    /// Whether this command changes the view rather than the
    /// annotations. View commands are ignored while a draw is active.
    pub fn is_view_command(&self) -> bool {
        matches!(
            self,
            KeyCommand::ZoomIn
                | KeyCommand::ZoomOut
                | KeyCommand::ResetZoom
                | KeyCommand::FitToScreen
                | KeyCommand::RotateClockwise
                | KeyCommand::RotateCounterClockwise
        )
    }
}
