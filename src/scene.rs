//! Retained render layer.
//!
//! Keeps drawable groups synchronized 1:1 with the annotation store.
//! Each group holds everything a renderer needs to draw one annotation:
//! the rectangle with its style, an optional label placed above the
//! box, and four corner resize handles. All stroke widths, handle radii
//! and font sizes are divided by the current scale so they stay
//! visually constant in screen px at any zoom level.

use crate::annotation::{Annotation, AnnotationId, BBox, Corner, Level};
use crate::constants::{handle, label, stroke};
use crate::store::AnnotationStore;

/// RGBA color, components in 0-1.
pub type Color = [f32; 4];

/// Stroke and fill palette for annotation overlays.
pub mod colors {
    use super::Color;

    /// Text annotation stroke (blue)
    pub const TEXT: Color = [0.0, 0.482, 1.0, 1.0];
    /// Text annotation fill
    pub const TEXT_FILL: Color = [0.0, 0.482, 1.0, 0.1];
    /// Missing region stroke (red)
    pub const MISSING: Color = [0.863, 0.208, 0.271, 1.0];
    /// Missing region fill
    pub const MISSING_FILL: Color = [0.863, 0.208, 0.271, 0.2];
    /// Selected annotation highlight stroke (red)
    pub const SELECTED: Color = [0.863, 0.208, 0.271, 1.0];
    /// Character-level stroke in review mode (green)
    pub const LEVEL_CHARACTER: Color = [0.157, 0.655, 0.271, 1.0];
    /// Word-level stroke in review mode (blue)
    pub const LEVEL_WORD: Color = TEXT;
    /// Line-level stroke in review mode (yellow)
    pub const LEVEL_LINE: Color = [1.0, 0.757, 0.027, 1.0];
    /// Paragraph-level stroke in review mode (purple)
    pub const LEVEL_PARAGRAPH: Color = [0.435, 0.259, 0.757, 1.0];
    /// Handle outline (white)
    pub const HANDLE_OUTLINE: Color = [1.0, 1.0, 1.0, 1.0];
}

/// How annotations are styled and which affordances are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Editing: per-type colors, handles on the selected annotation.
    #[default]
    Edit,
    /// Read-only review: per-level colors, no handles.
    Review,
}

/// Rectangle styling for one annotation or the draft box.
#[derive(Debug, Clone, PartialEq)]
pub struct RectStyle {
    pub stroke: Color,
    pub fill: Color,
    /// Stroke width in stage units (already divided by scale).
    pub stroke_width: f32,
    /// Dash pattern in stage units, solid if `None`.
    pub dash: Option<[f32; 2]>,
}

/// Label text drawn above an annotation rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelNode {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Font size in stage units (already divided by scale).
    pub font_size: f32,
    pub color: Color,
}

/// One corner resize handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleNode {
    pub corner: Corner,
    pub x: f32,
    pub y: f32,
    /// Radius in stage units (already divided by scale).
    pub radius: f32,
    pub stroke_width: f32,
    pub fill: Color,
    pub stroke: Color,
    pub visible: bool,
}

/// Drawable group for one annotation: rectangle, optional label and
/// four corner handles.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGroup {
    pub id: AnnotationId,
    pub bbox: BBox,
    pub style: RectStyle,
    pub label: Option<LabelNode>,
    pub handles: [HandleNode; 4],
    pub selected: bool,
}

/// Transient dashed rectangle shown while drawing a new box.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRect {
    pub bbox: BBox,
    pub style: RectStyle,
}

/// The retained layer: one group per annotation plus the draft box.
#[derive(Debug, Clone, Default)]
pub struct RenderLayer {
    mode: RenderMode,
    groups: Vec<RenderGroup>,
    draft: Option<DraftRect>,
}

impl RenderLayer {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            groups: Vec::new(),
            draft: None,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }

    /// Drawable groups in store order.
    pub fn groups(&self) -> &[RenderGroup] {
        &self.groups
    }

    /// Look up the group for an annotation id.
    pub fn group(&self, id: &str) -> Option<&RenderGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// The in-progress draft rectangle, if a draw is active.
    pub fn draft(&self) -> Option<&DraftRect> {
        self.draft.as_ref()
    }

    /// Rebuild groups from the store. Called after every store or
    /// selection change and after every scale change, keeping the
    /// mapping exactly 1:1: a deleted annotation's group is gone when
    /// this returns.
    pub fn sync(&mut self, store: &AnnotationStore, scale: f32) {
        let selected = store.selected();
        self.groups = store
            .iter()
            .map(|ann| build_group(ann, selected == Some(ann.id.as_str()), self.mode, scale))
            .collect();
    }

    /// Show or update the draft rectangle while drawing.
    pub fn set_draft(&mut self, bbox: BBox, scale: f32) {
        self.draft = Some(DraftRect {
            bbox,
            style: RectStyle {
                stroke: colors::TEXT,
                fill: colors::TEXT_FILL,
                stroke_width: stroke::BASE_WIDTH / scale,
                dash: Some(scale_dash(stroke::DRAFT_DASH, scale)),
            },
        });
    }

    /// Destroy the draft rectangle. Always called on pointer-up,
    /// whether or not the draw committed.
    pub fn clear_draft(&mut self) {
        self.draft = None;
    }

    /// Drop all groups and the draft, e.g. when switching images.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.draft = None;
    }
}

fn build_group(ann: &Annotation, selected: bool, mode: RenderMode, scale: f32) -> RenderGroup {
    let (stroke_color, fill) = base_colors(ann, mode);
    let stroke_color = if selected && mode == RenderMode::Edit {
        colors::SELECTED
    } else {
        stroke_color
    };
    let stroke_width = if selected && mode == RenderMode::Edit {
        stroke::SELECTED_WIDTH / scale
    } else {
        stroke::BASE_WIDTH / scale
    };
    let dash = ann
        .is_missing_region()
        .then(|| scale_dash(stroke::MISSING_DASH, scale));

    let label_node = (!ann.label.is_empty()).then(|| LabelNode {
        text: ann.label.clone(),
        x: ann.bbox.x,
        y: ann.bbox.y - label::OFFSET_Y / scale,
        font_size: label::FONT_SIZE / scale,
        color: stroke_color,
    });

    let show_handles = selected && mode == RenderMode::Edit;
    let handles = Corner::all().map(|corner| {
        let pos = ann.bbox.corner(corner);
        HandleNode {
            corner,
            x: pos.x,
            y: pos.y,
            radius: handle::DIAMETER / 2.0 / scale,
            stroke_width: handle::STROKE_WIDTH / scale,
            fill: colors::TEXT,
            stroke: colors::HANDLE_OUTLINE,
            visible: show_handles,
        }
    });

    RenderGroup {
        id: ann.id.clone(),
        bbox: ann.bbox,
        style: RectStyle {
            stroke: stroke_color,
            fill,
            stroke_width,
            dash,
        },
        label: label_node,
        handles,
        selected,
    }
}

fn base_colors(ann: &Annotation, mode: RenderMode) -> (Color, Color) {
    if ann.is_missing_region() {
        return (colors::MISSING, colors::MISSING_FILL);
    }
    match mode {
        RenderMode::Edit => (colors::TEXT, colors::TEXT_FILL),
        RenderMode::Review => {
            let stroke_color = match ann.level {
                Level::Character => colors::LEVEL_CHARACTER,
                Level::Word => colors::LEVEL_WORD,
                Level::Line => colors::LEVEL_LINE,
                Level::Paragraph => colors::LEVEL_PARAGRAPH,
            };
            let fill = [stroke_color[0], stroke_color[1], stroke_color[2], 0.1];
            (stroke_color, fill)
        }
    }
}

fn scale_dash(dash: [f32; 2], scale: f32) -> [f32; 2] {
    [dash[0] / scale, dash[1] / scale]
}
