//! Annotation storage for the currently loaded image.
//!
//! Exactly one store exists per loaded image; switching images replaces
//! the store contents wholesale. Insertion order is preserved so saves
//! and rendering are deterministic.

use crate::annotation::{Annotation, AnnotationId, AnnotationPatch, Point};

/// Ordered list of annotation records plus the single selection.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    /// All annotations in insertion order.
    annotations: Vec<Annotation>,
    /// Currently selected annotation id, at most one.
    selected_id: Option<AnnotationId>,
    /// Set when annotations or selection change; cleared after the
    /// render layer resyncs.
    dirty: bool,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            annotations: Vec::new(),
            selected_id: None,
            dirty: true,
        }
    }

    /// Check whether the store changed since the last `clear_dirty`.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag. Call after resyncing the render layer.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Replace the list wholesale, e.g. after fetching annotations for
    /// a newly loaded image. Clears the selection.
    pub fn replace(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations;
        self.selected_id = None;
        self.mark_dirty();
        log::debug!("store: replaced with {} annotations", self.annotations.len());
    }

    /// Append an annotation; the new annotation becomes selected.
    pub fn add(&mut self, annotation: Annotation) {
        self.selected_id = Some(annotation.id.clone());
        self.annotations.push(annotation);
        self.mark_dirty();
    }

    /// Remove an annotation by id. If it was selected, selection
    /// becomes none. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        if self.selected_id.as_deref() == Some(id) {
            self.selected_id = None;
        }
        self.mark_dirty();
        Some(self.annotations.remove(index))
    }

    /// Apply a partial field update. Unknown ids are a no-op.
    pub fn update(&mut self, id: &str, patch: &AnnotationPatch) {
        if let Some(annotation) = self.annotations.iter_mut().find(|a| a.id == id) {
            patch.apply(annotation);
            self.dirty = true;
        }
    }

    /// Get an annotation by id.
    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Read-only iteration in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    /// The annotation list as a slice, in insertion order.
    pub fn list(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Remove all annotations and the selection.
    pub fn clear(&mut self) {
        if !self.annotations.is_empty() || self.selected_id.is_some() {
            self.mark_dirty();
        }
        self.annotations.clear();
        self.selected_id = None;
    }

    /// Select an annotation (or none). Selecting a new one implicitly
    /// deselects the previous.
    pub fn select(&mut self, id: Option<AnnotationId>) {
        if let Some(id) = &id {
            if self.get(id).is_none() {
                return;
            }
        }
        if self.selected_id != id {
            self.selected_id = id;
            self.mark_dirty();
        }
    }

    /// Get the selected annotation id, if any.
    pub fn selected(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    /// Get the selected annotation record, if any.
    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selected_id.as_deref().and_then(|id| self.get(id))
    }

    /// Find the topmost annotation containing an image-space point.
    /// Later insertions render on top, so iterate newest first.
    pub fn hit_test(&self, point: Point) -> Option<&str> {
        self.annotations
            .iter()
            .rev()
            .find(|a| a.bbox.contains(point))
            .map(|a| a.id.as_str())
    }
}
