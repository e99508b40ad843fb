//! Annotation data model.
//!
//! Core types for labeled regions on a manuscript image: geometry
//! (points and bounding boxes), the annotation record itself, and the
//! partial-update patch applied from property panels.
//!
//! All geometry is in untransformed image pixel space. Wire names match
//! the backend JSON (`annotation_type`, `max_chars`, `created_at`, ...).

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for an annotation, generated client-side.
pub type AnnotationId = String;

/// Minimum width/height (image px) for a drawn box to be committed.
pub const MIN_BBOX_SIZE: f32 = 10.0;

/// A 2D point in image or screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An axis-aligned bounding box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    /// Top-left corner X coordinate
    pub x: f32,
    /// Top-left corner Y coordinate
    pub y: f32,
    /// Width of the box (non-negative once committed)
    pub width: f32,
    /// Height of the box (non-negative once committed)
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a normalized box from two opposite corners, in any drag
    /// direction. Width and height come out non-negative with `x,y` at
    /// the top-left.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Check whether both dimensions exceed the commit threshold.
    pub fn meets_min_size(&self) -> bool {
        self.width > MIN_BBOX_SIZE && self.height > MIN_BBOX_SIZE
    }

    /// Check if a point is inside the box.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Get the top-left corner.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Get the position of a specific corner.
    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::TopLeft => Point::new(self.x, self.y),
            Corner::TopRight => Point::new(self.x + self.width, self.y),
            Corner::BottomRight => Point::new(self.x + self.width, self.y + self.height),
            Corner::BottomLeft => Point::new(self.x, self.y + self.height),
        }
    }
}

/// The four corners of a bounding box, in handle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    /// All corners in handle order (clockwise from top-left).
    pub fn all() -> [Corner; 4] {
        [
            Corner::TopLeft,
            Corner::TopRight,
            Corner::BottomRight,
            Corner::BottomLeft,
        ]
    }

    /// The diagonally opposite corner, which stays anchored during a
    /// resize drag.
    pub fn opposite(&self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomRight => Corner::TopLeft,
            Corner::BottomLeft => Corner::TopRight,
        }
    }
}

/// Shape tag carried on the wire. Only axis-aligned boxes exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    #[default]
    Bbox,
}

/// Whether a region transcribes text or marks an illegible gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationType {
    #[default]
    Text,
    MissingRegion,
}

/// Granularity of a text annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Character,
    #[default]
    Word,
    Line,
    Paragraph,
}

/// Reading direction of the transcribed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Rtl,
    Ltr,
}

/// Cause of damage for a missing region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageReason {
    #[default]
    Damaged,
    Eroded,
    Illegible,
    Faded,
    Torn,
    Stained,
    Other,
}

/// Fields present only on missing-region annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingRegion {
    /// Estimated number of characters lost
    pub max_chars: u32,
    /// Cause of the damage
    pub reason: DamageReason,
    /// Free-text annotator notes
    #[serde(default)]
    pub notes: String,
}

impl Default for MissingRegion {
    fn default() -> Self {
        Self {
            max_chars: 5,
            reason: DamageReason::Damaged,
            notes: String::new(),
        }
    }
}

/// Placeholder label for a missing region with `max_chars` lost characters.
pub fn missing_region_label(max_chars: u32) -> String {
    format!("[مفقود: {} أحرف]", max_chars)
}

/// One labeled region on one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Opaque unique identifier, generated client-side at creation.
    pub id: AnnotationId,
    /// Shape tag, always `"bbox"`.
    #[serde(rename = "type", default)]
    pub kind: AnnotationKind,
    /// Text region or missing-region marker.
    pub annotation_type: AnnotationType,
    /// Granularity; meaningful only for text annotations.
    #[serde(default)]
    pub level: Level,
    /// Transcription label; auto-generated placeholder for missing regions.
    #[serde(default)]
    pub label: String,
    /// Region geometry in untransformed image pixel space.
    pub bbox: BBox,
    /// Reading direction.
    #[serde(default)]
    pub direction: Direction,
    /// Annotator confidence, 0-100.
    #[serde(default = "default_confidence")]
    pub confidence: u8,
    /// Creation time as unix milliseconds.
    pub created_at: u64,
    /// Missing-region-only fields, flattened on the wire. A flattened
    /// `Option` writes nothing when `None` and reads absent fields as
    /// `None`.
    #[serde(flatten)]
    pub missing: Option<MissingRegion>,
}

fn default_confidence() -> u8 {
    90
}

impl Annotation {
    /// Create a new text annotation.
    pub fn new_text(bbox: BBox, level: Level, direction: Direction, confidence: u8) -> Self {
        Self {
            id: generate_id(),
            kind: AnnotationKind::Bbox,
            annotation_type: AnnotationType::Text,
            level,
            label: String::new(),
            bbox,
            direction,
            confidence: confidence.min(100),
            created_at: unix_millis(),
            missing: None,
        }
    }

    /// Create a new missing-region annotation. The label is the
    /// auto-generated placeholder derived from `max_chars`.
    pub fn new_missing(bbox: BBox, region: MissingRegion, confidence: u8) -> Self {
        let label = missing_region_label(region.max_chars);
        Self {
            id: generate_id(),
            kind: AnnotationKind::Bbox,
            annotation_type: AnnotationType::MissingRegion,
            level: Level::default(),
            label,
            bbox,
            direction: Direction::default(),
            confidence: confidence.min(100),
            created_at: unix_millis(),
            missing: Some(region),
        }
    }

    /// Whether this annotation marks a missing region.
    pub fn is_missing_region(&self) -> bool {
        self.annotation_type == AnnotationType::MissingRegion
    }
}

/// Partial field update for an annotation, applied from the property
/// panel or a geometry drag. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub label: Option<String>,
    pub level: Option<Level>,
    pub direction: Option<Direction>,
    pub confidence: Option<u8>,
    pub bbox: Option<BBox>,
    pub max_chars: Option<u32>,
    pub reason: Option<DamageReason>,
    pub notes: Option<String>,
}

impl AnnotationPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn confidence(mut self, confidence: u8) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn max_chars(mut self, max_chars: u32) -> Self {
        self.max_chars = Some(max_chars);
        self
    }

    pub fn reason(mut self, reason: DamageReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Apply this patch to an annotation.
    ///
    /// Changing `max_chars` on a missing region regenerates the
    /// placeholder label; an explicit `label` in the same patch wins.
    pub fn apply(&self, annotation: &mut Annotation) {
        if let Some(level) = self.level {
            annotation.level = level;
        }
        if let Some(direction) = self.direction {
            annotation.direction = direction;
        }
        if let Some(confidence) = self.confidence {
            annotation.confidence = confidence.min(100);
        }
        if let Some(bbox) = self.bbox {
            annotation.bbox = bbox;
        }
        if annotation.is_missing_region() {
            if let Some(region) = annotation.missing.as_mut() {
                if let Some(max_chars) = self.max_chars {
                    region.max_chars = max_chars;
                    annotation.label = missing_region_label(max_chars);
                }
                if let Some(reason) = self.reason {
                    region.reason = reason;
                }
                if let Some(notes) = &self.notes {
                    region.notes = notes.clone();
                }
            }
        }
        if let Some(label) = &self.label {
            annotation.label = label.clone();
        }
    }
}

/// Generate a unique annotation id: timestamp plus a process-local
/// counter, so no RNG dependency is needed.
pub fn generate_id() -> AnnotationId {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("ann_{}_{:06x}", unix_millis(), seq)
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
