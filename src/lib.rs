//! Inscripta canvas - annotation canvas core for manuscript OCR datasets
//!
//! Renderer-agnostic state machine for drawing, selecting, moving and
//! resizing bounding-box annotations over manuscript images, with
//! pan/zoom/rotate view math, a retained render scene and debounced
//! persistence through an injected sink.

mod annotation;
mod constants;
mod editor;
mod error;
mod interaction;
mod persistence;
mod scene;
mod store;
mod transform;

pub use annotation::{
    missing_region_label, Annotation, AnnotationId, AnnotationKind, AnnotationPatch,
    AnnotationType, BBox, Corner, DamageReason, Direction, Level, MissingRegion, Point,
    MIN_BBOX_SIZE,
};
pub use constants::{fit, handle, label, save, stroke, zoom};
pub use editor::{
    AnnotationDefaults, CanvasEditor, ImageInfo, LoadTicket, Notice, Severity, Viewport,
};
pub use error::CanvasError;
pub use interaction::{DragState, KeyCommand, Mode};
pub use persistence::{AnnotationSink, SaveScheduler};
pub use scene::{
    colors, Color, DraftRect, HandleNode, LabelNode, RectStyle, RenderGroup, RenderLayer,
    RenderMode,
};
pub use store::AnnotationStore;
pub use transform::ViewTransform;
