//! Debounced persistence scheduling.
//!
//! Coalesces bursts of annotation edits into a single backend save.
//! Two mechanisms run side by side:
//! 1. **Debounce**: each mutation restarts a quiet window; the save
//!    fires only once the window elapses with no further edits.
//! 2. **Periodic flush**: an independent interval that saves while an
//!    image is loaded, as a safety net regardless of debounce state.
//!
//! All timing methods take an explicit `now` so tests are
//! deterministic; the `_at`-free wrappers use the wall clock.

use std::time::Duration;
use web_time::Instant;

use crate::annotation::Annotation;
use crate::constants::save;
use crate::error::CanvasError;

/// Destination for the full annotation list of one image.
///
/// Backed by the REST API in production; the editor only sees this
/// trait. The backend accepts whole-list overwrites idempotently, so
/// there is no request queueing: a save in flight never blocks local
/// edits, which are simply captured by the next save.
pub trait AnnotationSink {
    /// Persist the complete annotation list for an image.
    fn save(&mut self, image_id: &str, annotations: &[Annotation]) -> Result<(), CanvasError>;
}

/// Tracks when a debounced or periodic save is due.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    /// Quiet window after the last edit before a debounced save fires.
    debounce_delay: Duration,
    /// Interval of the independent background flush.
    periodic_interval: Duration,
    /// Time of the last mutation that needs saving.
    last_change: Option<Instant>,
    /// Time the background flush last fired (or was armed).
    last_periodic: Option<Instant>,
    /// Whether there are unsaved changes.
    dirty: bool,
}

impl SaveScheduler {
    pub fn new() -> Self {
        Self {
            debounce_delay: save::DEBOUNCE_DELAY,
            periodic_interval: save::PERIODIC_INTERVAL,
            last_change: None,
            last_periodic: None,
            dirty: false,
        }
    }

    /// Set the debounce quiet window.
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Set the background flush interval.
    pub fn with_periodic_interval(mut self, interval: Duration) -> Self {
        self.periodic_interval = interval;
        self
    }

    /// Record a mutation, (re)starting the debounce window.
    pub fn mark_dirty_at(&mut self, now: Instant) {
        self.dirty = true;
        self.last_change = Some(now);
        log::trace!("save scheduler: marked dirty");
    }

    /// Record a mutation at the current time.
    pub fn mark_dirty(&mut self) {
        self.mark_dirty_at(Instant::now());
    }

    /// Check if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the debounced save is due: there are unsaved changes and
    /// the quiet window has elapsed since the last one.
    pub fn debounce_due_at(&self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        let Some(last_change) = self.last_change else {
            return false;
        };
        now.saturating_duration_since(last_change) >= self.debounce_delay
    }

    /// Start the background flush clock, e.g. when an image loads.
    pub fn arm_periodic_at(&mut self, now: Instant) {
        self.last_periodic = Some(now);
    }

    /// Whether the background flush is due. Independent of the
    /// debounce: fires on schedule even while edits keep arriving.
    pub fn periodic_due_at(&self, now: Instant) -> bool {
        match self.last_periodic {
            Some(last) => now.saturating_duration_since(last) >= self.periodic_interval,
            None => false,
        }
    }

    /// Record that the background flush fired.
    pub fn mark_periodic_at(&mut self, now: Instant) {
        self.last_periodic = Some(now);
    }

    /// Record a successful save. Clears the dirty flag and cancels any
    /// pending debounced save, so a manual save is never followed by a
    /// redundant debounced one.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
        self.last_change = None;
        log::trace!("save scheduler: marked saved");
    }

    /// Record a failed save. Local state stays the source of truth:
    /// the dirty flag is kept and the quiet window restarts, so the
    /// next quiet period retries instead of hammering the backend.
    pub fn mark_save_failed_at(&mut self, now: Instant) {
        self.last_change = Some(now);
        log::trace!("save scheduler: save failed, will retry");
    }

    /// Reset all timing state, e.g. when switching images.
    pub fn reset(&mut self) {
        self.last_change = None;
        self.last_periodic = None;
        self.dirty = false;
    }
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new()
    }
}
