//! The annotation canvas editor.
//!
//! [`CanvasEditor`] owns the annotation store, view transform, render
//! layer and save scheduler for one canvas, and is constructed with an
//! injected [`AnnotationSink`] instead of reaching into any global
//! application object. The host feeds it pointer positions (screen
//! space), key commands and image-load results; it exposes the render
//! layer for whatever renderer the host uses.
//!
//! No method panics: failures degrade to a [`Notice`] on the editor's
//! queue so one bad event can never break subsequent interaction.

use web_time::Instant;

use crate::annotation::{
    Annotation, AnnotationPatch, AnnotationType, BBox, Corner, DamageReason, Direction, Level,
    MissingRegion, Point, MIN_BBOX_SIZE,
};
use crate::constants::handle;
use crate::error::CanvasError;
use crate::interaction::{DragState, KeyCommand, Mode};
use crate::persistence::{AnnotationSink, SaveScheduler};
use crate::scene::{RenderLayer, RenderMode};
use crate::store::AnnotationStore;
use crate::transform::ViewTransform;

/// Metadata for a loaded image. Dimensions are in image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// Backend identifier of the image.
    pub id: String,
    pub width: f32,
    pub height: f32,
}

/// Canvas viewport size in screen px.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Values read from the property panel at the moment an annotation is
/// created.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDefaults {
    pub annotation_type: AnnotationType,
    pub level: Level,
    pub direction: Direction,
    pub confidence: u8,
    pub max_chars: u32,
    pub reason: DamageReason,
    pub notes: String,
}

impl Default for AnnotationDefaults {
    fn default() -> Self {
        Self {
            annotation_type: AnnotationType::Text,
            level: Level::Word,
            direction: Direction::Rtl,
            confidence: 90,
            max_chars: 5,
            reason: DamageReason::Damaged,
            notes: String::new(),
        }
    }
}

impl AnnotationDefaults {
    fn build(&self, bbox: BBox) -> Annotation {
        match self.annotation_type {
            AnnotationType::Text => {
                Annotation::new_text(bbox, self.level, self.direction, self.confidence)
            }
            AnnotationType::MissingRegion => Annotation::new_missing(
                bbox,
                MissingRegion {
                    max_chars: self.max_chars,
                    reason: self.reason,
                    notes: self.notes.clone(),
                },
                self.confidence,
            ),
        }
    }
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A transient user-facing notification (toast) emitted by the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Handle returned by [`CanvasEditor::begin_image_load`]. Async load
/// results carry it back so stale responses can be discarded.
pub type LoadTicket = u64;

/// Renderer-agnostic annotation canvas for one image at a time.
pub struct CanvasEditor<S: AnnotationSink> {
    store: AnnotationStore,
    layer: RenderLayer,
    transform: ViewTransform,
    scheduler: SaveScheduler,
    sink: S,
    viewport: Viewport,
    mode: Mode,
    drag: DragState,
    defaults: AnnotationDefaults,
    image: Option<ImageInfo>,
    pending_image: Option<ImageInfo>,
    generation: LoadTicket,
    notices: Vec<Notice>,
}

impl<S: AnnotationSink> CanvasEditor<S> {
    /// Create an editor in edit mode with an injected persistence sink.
    pub fn new(viewport: Viewport, sink: S) -> Self {
        Self {
            store: AnnotationStore::new(),
            layer: RenderLayer::new(RenderMode::Edit),
            transform: ViewTransform::identity(),
            scheduler: SaveScheduler::new(),
            sink,
            viewport,
            mode: Mode::Select,
            drag: DragState::Idle,
            defaults: AnnotationDefaults::default(),
            image: None,
            pending_image: None,
            generation: 0,
            notices: Vec::new(),
        }
    }

    /// Override the save scheduler, e.g. to shorten timings in tests.
    pub fn with_scheduler(mut self, scheduler: SaveScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The annotation list in insertion order.
    pub fn annotations(&self) -> &[Annotation] {
        self.store.list()
    }

    /// The selected annotation id, if any.
    pub fn selected(&self) -> Option<&str> {
        self.store.selected()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    /// The retained render layer for the host's renderer to draw.
    pub fn render_layer(&self) -> &RenderLayer {
        &self.layer
    }

    /// The currently loaded image, if any.
    pub fn image(&self) -> Option<&ImageInfo> {
        self.image.as_ref()
    }

    pub fn defaults(&self) -> &AnnotationDefaults {
        &self.defaults
    }

    /// Replace the creation-time defaults (from the property panel).
    pub fn set_defaults(&mut self, defaults: AnnotationDefaults) {
        self.defaults = defaults;
    }

    /// Drain pending user-facing notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Switch between edit and review rendering. Review is read-only:
    /// selection and view commands still work, but draws, moves,
    /// resizes, patches and deletes are ignored.
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.layer.set_mode(mode);
        self.refresh();
    }

    /// Update the viewport, e.g. on container resize.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    // ------------------------------------------------------------------
    // Image load lifecycle (last-load-wins)
    // ------------------------------------------------------------------

    /// Start loading a new image. Synchronously tears down the previous
    /// image's annotations, render groups, draft and selection, so
    /// nothing from the old image can render over the new one. Returns
    /// a ticket the async results must carry.
    pub fn begin_image_load(&mut self, info: ImageInfo) -> LoadTicket {
        self.generation += 1;
        self.store.clear();
        self.layer.clear();
        self.drag = DragState::Idle;
        self.scheduler.reset();
        self.image = None;
        self.pending_image = Some(info);
        log::debug!("image load started, generation {}", self.generation);
        self.generation
    }

    /// The image finished loading and is ready to display. Resets the
    /// view: rotation 0, fit to screen, centered. Returns false if the
    /// ticket is stale (a newer load has started).
    pub fn image_ready(&mut self, ticket: LoadTicket) -> bool {
        if ticket != self.generation {
            log::debug!("stale image load (ticket {ticket}) discarded");
            return false;
        }
        let Some(info) = self.pending_image.take() else {
            return false;
        };
        self.transform = ViewTransform::fit_to_screen(
            (info.width, info.height),
            (self.viewport.width, self.viewport.height),
            0.0,
        );
        log::info!("image {} loaded ({}x{})", info.id, info.width, info.height);
        self.image = Some(info);
        self.scheduler.arm_periodic_at(Instant::now());
        self.refresh();
        true
    }

    /// The image failed to load or decode. No canvas state is mutated
    /// beyond dropping the pending load; the user sees a notice.
    pub fn image_failed(&mut self, ticket: LoadTicket, message: impl Into<String>) {
        if ticket != self.generation {
            return;
        }
        let message = message.into();
        log::error!("image load failed: {message}");
        self.pending_image = None;
        self.notices
            .push(Notice::error(CanvasError::image_load(message).to_string()));
    }

    /// The annotation fetch for this image completed. A fetch failure
    /// is treated as zero annotations, reported as a warning rather
    /// than a hard error. Stale responses are discarded.
    pub fn annotations_loaded(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Annotation>, CanvasError>,
    ) {
        if ticket != self.generation {
            log::debug!("stale annotation response (ticket {ticket}) discarded");
            return;
        }
        match result {
            Ok(annotations) => {
                self.store.replace(annotations);
            }
            Err(err) => {
                log::warn!("failed to load annotations: {err}");
                self.store.replace(Vec::new());
                self.notices.push(Notice::warning(err.to_string()));
            }
        }
        self.refresh();
    }

    // ------------------------------------------------------------------
    // Mode and selection
    // ------------------------------------------------------------------

    /// Switch between select and draw mode. Switching to select forces
    /// deselection and cancels any in-progress draw.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.drag.is_drawing() {
            self.layer.clear_draft();
            self.drag = DragState::Idle;
        }
        self.mode = mode;
        if mode == Mode::Select {
            self.store.select(None);
        }
        log::debug!("mode: {}", mode.name());
        self.refresh();
    }

    /// Select an annotation by id, deselecting any previous one.
    pub fn select(&mut self, id: Option<String>) {
        self.store.select(id);
        self.refresh();
    }

    /// Delete the selected annotation, if any. Ignored in review mode.
    pub fn delete_selected(&mut self) {
        if !self.can_edit() {
            return;
        }
        let Some(id) = self.store.selected().map(String::from) else {
            return;
        };
        if self.store.remove(&id).is_some() {
            log::debug!("deleted annotation {id}");
            self.scheduler.mark_dirty();
        }
        self.refresh();
    }

    /// Apply a property-panel patch to the selected annotation.
    pub fn update_selected(&mut self, patch: AnnotationPatch) {
        let Some(id) = self.store.selected().map(String::from) else {
            return;
        };
        self.update_annotation(&id, patch);
    }

    /// Apply a patch to an annotation by id. Unknown ids are a no-op,
    /// and review mode ignores patches entirely.
    pub fn update_annotation(&mut self, id: &str, patch: AnnotationPatch) {
        if !self.can_edit() || self.store.get(id).is_none() {
            return;
        }
        self.store.update(id, &patch);
        self.scheduler.mark_dirty();
        self.refresh();
    }

    // ------------------------------------------------------------------
    // Pointer events (screen space)
    // ------------------------------------------------------------------

    /// Pointer pressed. Starts a draw, pan, move or resize depending on
    /// mode and what is under the pointer.
    pub fn on_pointer_down(&mut self, screen: Point) {
        let image_point = self.to_image(screen);

        // Resize handles of the selected annotation win over body hits
        if let Some((id, corner)) = self.hit_handle(image_point) {
            self.drag = DragState::Resizing { id, corner };
            return;
        }

        if let Some(hit) = self.store.hit_test(image_point).map(String::from) {
            // Clicking an annotation selects it regardless of mode;
            // a body drag only moves it when editing
            let origin = self
                .store
                .get(&hit)
                .map(|a| a.bbox.origin())
                .unwrap_or_default();
            self.store.select(Some(hit.clone()));
            if self.can_edit() {
                self.drag = DragState::Moving {
                    id: hit,
                    grab_offset: Point::new(image_point.x - origin.x, image_point.y - origin.y),
                };
            }
            self.refresh();
            return;
        }

        // Empty canvas space: draw when possible, otherwise pan
        if self.can_edit() && self.mode == Mode::Draw && self.image.is_some() {
            self.drag = DragState::Drawing { start: image_point };
            self.layer.set_draft(
                BBox::new(image_point.x, image_point.y, 0.0, 0.0),
                self.transform.scale,
            );
        } else {
            self.drag = DragState::Panning { last: screen };
        }
    }

    /// Pointer moved. Updates the active draw, pan, move or resize.
    pub fn on_pointer_move(&mut self, screen: Point) {
        match self.drag.clone() {
            DragState::Idle => {}
            DragState::Drawing { start } => {
                let current = self.to_image(screen);
                self.layer
                    .set_draft(BBox::from_corners(start, current), self.transform.scale);
            }
            DragState::Panning { last } => {
                self.transform = self.transform.pan_by(screen.x - last.x, screen.y - last.y);
                self.drag = DragState::Panning { last: screen };
            }
            DragState::Moving { id, grab_offset } => {
                let current = self.to_image(screen);
                let Some(bbox) = self.store.get(&id).map(|a| a.bbox) else {
                    self.drag = DragState::Idle;
                    return;
                };
                let moved = BBox::new(
                    current.x - grab_offset.x,
                    current.y - grab_offset.y,
                    bbox.width,
                    bbox.height,
                );
                self.store.update(&id, &AnnotationPatch::new().bbox(moved));
                self.scheduler.mark_dirty();
                self.refresh();
            }
            DragState::Resizing { id, corner } => {
                let current = self.to_image(screen);
                let Some(bbox) = self.store.get(&id).map(|a| a.bbox) else {
                    self.drag = DragState::Idle;
                    return;
                };
                let resized = resize_to_corner(bbox, corner, current);
                self.store.update(&id, &AnnotationPatch::new().bbox(resized));
                self.scheduler.mark_dirty();
                self.refresh();
            }
        }
    }

    /// Pointer released. Commits or discards a draw, ends pans and
    /// drags. The draft rectangle is always destroyed here.
    pub fn on_pointer_up(&mut self, screen: Point) {
        let drag = std::mem::take(&mut self.drag);
        if let DragState::Drawing { start } = drag {
            let end = self.to_image(screen);
            let bbox = BBox::from_corners(start, end);
            self.layer.clear_draft();
            if bbox.meets_min_size() {
                let annotation = self.defaults.build(bbox);
                log::debug!(
                    "created annotation {} at ({:.0},{:.0}) {}x{}",
                    annotation.id,
                    bbox.x,
                    bbox.y,
                    bbox.width,
                    bbox.height
                );
                self.store.add(annotation);
                self.scheduler.mark_dirty();
            } else {
                log::debug!(
                    "discarded draw below minimum size ({}x{})",
                    bbox.width,
                    bbox.height
                );
            }
            self.refresh();
        }
    }

    /// Mouse wheel: always zooms, anchored on the pointer, clamped.
    pub fn on_wheel(&mut self, delta_y: f32, pointer: Point) {
        self.transform = self.transform.wheel_zoom(delta_y, pointer);
        self.refresh();
    }

    // ------------------------------------------------------------------
    // Keyboard commands
    // ------------------------------------------------------------------

    /// Execute a keyboard command. View commands (zoom/rotate) are
    /// ignored while a draw is active.
    pub fn on_key(&mut self, command: KeyCommand) {
        if command.is_view_command() && self.drag.is_drawing() {
            log::debug!("view command {command:?} ignored while drawing");
            return;
        }
        match command {
            KeyCommand::DeleteSelected => self.delete_selected(),
            KeyCommand::Deselect => self.select(None),
            KeyCommand::ZoomIn => {
                self.transform = self.transform.zoom_in(self.viewport.center());
                self.refresh();
            }
            KeyCommand::ZoomOut => {
                self.transform = self.transform.zoom_out(self.viewport.center());
                self.refresh();
            }
            KeyCommand::ResetZoom => {
                self.transform = self.transform.reset_zoom();
                self.refresh();
            }
            KeyCommand::FitToScreen => self.fit_to_screen(),
            KeyCommand::RotateClockwise => {
                self.transform = self.transform.rotate_clockwise();
                self.refresh();
            }
            KeyCommand::RotateCounterClockwise => {
                self.transform = self.transform.rotate_counter_clockwise();
                self.refresh();
            }
        }
    }

    /// Fit the current image to the viewport, honoring rotation.
    pub fn fit_to_screen(&mut self) {
        let Some(info) = &self.image else {
            return;
        };
        self.transform = ViewTransform::fit_to_screen(
            (info.width, info.height),
            (self.viewport.width, self.viewport.height),
            self.transform.rotation,
        );
        self.refresh();
    }

    /// Rotate to an absolute angle, normalized into [0, 360).
    pub fn rotate_to(&mut self, angle: f32) {
        self.transform = self.transform.rotate_to(angle);
        self.refresh();
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Save immediately, bypassing the debounce and cancelling any
    /// pending debounced save. Without a loaded image this reports an
    /// error notice instead of silently doing nothing.
    pub fn save_now(&mut self) {
        if self.image.is_none() {
            self.notices
                .push(Notice::error(CanvasError::NoImage.to_string()));
            return;
        }
        if self.do_save(Instant::now()) {
            self.notices.push(Notice::info("annotations saved"));
        }
    }

    /// Drive the save timers. Call periodically from the host's event
    /// loop; saves fire here when the debounce quiet window or the
    /// background flush interval has elapsed.
    pub fn tick(&mut self, now: Instant) {
        if self.image.is_none() {
            return;
        }
        if self.scheduler.debounce_due_at(now) || self.scheduler.periodic_due_at(now) {
            self.do_save(now);
        }
    }

    /// Any successful save restarts the background flush clock, so a
    /// flush never fires right on the heels of another save.
    fn do_save(&mut self, now: Instant) -> bool {
        let Some(info) = &self.image else {
            return false;
        };
        match self.sink.save(&info.id, self.store.list()) {
            Ok(()) => {
                self.scheduler.mark_saved();
                self.scheduler.mark_periodic_at(now);
                log::debug!(
                    "saved {} annotations for image {}",
                    self.store.len(),
                    info.id
                );
                true
            }
            Err(err) => {
                // Local state stays the source of truth; the next save
                // attempt reconciles.
                log::warn!("save failed: {err}");
                self.scheduler.mark_save_failed_at(now);
                self.notices.push(Notice::error(err.to_string()));
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Whether annotation mutations are allowed; review mode is
    /// strictly read-only.
    fn can_edit(&self) -> bool {
        self.layer.mode() == RenderMode::Edit
    }

    fn image_size(&self) -> (f32, f32) {
        self.image
            .as_ref()
            .map(|i| (i.width, i.height))
            .unwrap_or((0.0, 0.0))
    }

    fn to_image(&self, screen: Point) -> Point {
        self.transform.screen_to_image(screen, self.image_size())
    }

    /// Hit-test the selected annotation's corner handles, in image
    /// space with the grab radius converted from screen px.
    fn hit_handle(&self, point: Point) -> Option<(String, Corner)> {
        if !self.can_edit() {
            return None;
        }
        let selected = self.store.selected_annotation()?;
        let radius = (handle::DIAMETER / 2.0 + handle::HIT_SLOP) / self.transform.scale;
        for corner in Corner::all() {
            if selected.bbox.corner(corner).distance_to(point) <= radius {
                return Some((selected.id.clone(), corner));
            }
        }
        None
    }

    fn refresh(&mut self) {
        self.layer.sync(&self.store, self.transform.scale);
        self.store.clear_dirty();
    }
}

/// Resize a box by dragging `corner` to `target` while the opposite
/// corner stays anchored. All four corners behave symmetrically. The
/// result is always normalized (non-negative dimensions, top-left
/// anchored) and clamped to the minimum size, so malformed geometry is
/// never stored even mid-drag.
fn resize_to_corner(bbox: BBox, corner: Corner, target: Point) -> BBox {
    let anchor = bbox.corner(corner.opposite());
    let width = (target.x - anchor.x).abs().max(MIN_BBOX_SIZE);
    let height = (target.y - anchor.y).abs().max(MIN_BBOX_SIZE);
    let x = if target.x < anchor.x {
        anchor.x - width
    } else {
        anchor.x
    };
    let y = if target.y < anchor.y {
        anchor.y - height
    } else {
        anchor.y
    };
    BBox::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    /// Sink that records every save and can be told to fail.
    #[derive(Clone, Default)]
    struct RecordingSink {
        saves: Rc<RefCell<Vec<(String, Vec<Annotation>)>>>,
        fail: Rc<RefCell<bool>>,
    }

    impl AnnotationSink for RecordingSink {
        fn save(&mut self, image_id: &str, annotations: &[Annotation]) -> Result<(), CanvasError> {
            if *self.fail.borrow() {
                return Err(CanvasError::save("backend unavailable"));
            }
            self.saves
                .borrow_mut()
                .push((image_id.to_string(), annotations.to_vec()));
            Ok(())
        }
    }

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Editor with a 1000x800 image fitted 1:1 in a 1040x840 viewport,
    /// so screen space is image space offset by (20, 20).
    fn editor_with_image() -> (CanvasEditor<RecordingSink>, RecordingSink) {
        init_logs();
        let sink = RecordingSink::default();
        let mut editor = CanvasEditor::new(Viewport::new(1040.0, 840.0), sink.clone());
        let ticket = editor.begin_image_load(ImageInfo {
            id: "img-1".to_string(),
            width: 1000.0,
            height: 800.0,
        });
        assert!(editor.image_ready(ticket));
        editor.annotations_loaded(ticket, Ok(Vec::new()));
        assert_eq!(editor.transform().scale, 1.0);
        assert_eq!(editor.transform().position, Point::new(20.0, 20.0));
        (editor, sink)
    }

    fn screen(x: f32, y: f32) -> Point {
        Point::new(x + 20.0, y + 20.0)
    }

    fn draw_box(editor: &mut CanvasEditor<RecordingSink>, from: (f32, f32), to: (f32, f32)) {
        editor.set_mode(Mode::Draw);
        editor.on_pointer_down(screen(from.0, from.1));
        editor.on_pointer_move(screen(to.0, to.1));
        editor.on_pointer_up(screen(to.0, to.1));
    }

    #[test]
    fn test_draw_commits_normalized_bbox_in_all_quadrants() {
        let cases = [
            ((50.0, 50.0), (100.0, 100.0)),
            ((100.0, 100.0), (50.0, 50.0)), // dragging up-left
            ((100.0, 50.0), (50.0, 100.0)),
            ((50.0, 100.0), (100.0, 50.0)),
        ];
        for (from, to) in cases {
            let (mut editor, _) = editor_with_image();
            draw_box(&mut editor, from, to);

            assert_eq!(editor.annotations().len(), 1, "case {from:?} -> {to:?}");
            let bbox = editor.annotations()[0].bbox;
            assert_eq!(bbox, BBox::new(50.0, 50.0, 50.0, 50.0));
        }
    }

    #[test]
    fn test_draw_below_min_size_is_discarded() {
        let (mut editor, _) = editor_with_image();
        draw_box(&mut editor, (50.0, 50.0), (60.0, 200.0)); // width == 10
        assert!(editor.annotations().is_empty());

        draw_box(&mut editor, (50.0, 50.0), (200.0, 58.0)); // height < 10
        assert!(editor.annotations().is_empty());
    }

    #[test]
    fn test_draft_destroyed_on_pointer_up_regardless_of_outcome() {
        let (mut editor, _) = editor_with_image();
        editor.set_mode(Mode::Draw);

        editor.on_pointer_down(screen(50.0, 50.0));
        editor.on_pointer_move(screen(55.0, 55.0));
        assert!(editor.render_layer().draft().is_some());
        editor.on_pointer_up(screen(55.0, 55.0));
        assert!(editor.render_layer().draft().is_none());

        editor.on_pointer_down(screen(50.0, 50.0));
        editor.on_pointer_move(screen(150.0, 150.0));
        assert!(editor.render_layer().draft().is_some());
        editor.on_pointer_up(screen(150.0, 150.0));
        assert!(editor.render_layer().draft().is_none());
        assert_eq!(editor.annotations().len(), 1);
    }

    #[test]
    fn test_new_annotation_becomes_selected() {
        let (mut editor, _) = editor_with_image();
        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));
        let id = editor.annotations()[0].id.clone();
        assert_eq!(editor.selected(), Some(id.as_str()));
        // Selected annotation shows its handles
        let group = editor.render_layer().group(&id).expect("group");
        assert!(group.handles.iter().all(|h| h.visible));
    }

    #[test]
    fn test_click_selects_topmost_in_any_mode() {
        let (mut editor, _) = editor_with_image();
        draw_box(&mut editor, (0.0, 0.0), (200.0, 200.0));
        draw_box(&mut editor, (250.0, 0.0), (400.0, 120.0));
        let first = editor.annotations()[0].id.clone();

        // Still in draw mode: clicking an annotation selects, not draws
        editor.on_pointer_down(screen(100.0, 100.0));
        editor.on_pointer_up(screen(100.0, 100.0));
        assert_eq!(editor.selected(), Some(first.as_str()));
        assert_eq!(editor.annotations().len(), 2);
    }

    #[test]
    fn test_drag_moves_annotation_body() {
        let (mut editor, _) = editor_with_image();
        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));
        editor.set_mode(Mode::Select);

        // Grab the middle and drag by (30, 40). Grab point is not a handle.
        editor.on_pointer_down(screen(100.0, 100.0));
        editor.on_pointer_move(screen(130.0, 140.0));
        editor.on_pointer_up(screen(130.0, 140.0));

        let bbox = editor.annotations()[0].bbox;
        assert_eq!(bbox, BBox::new(80.0, 90.0, 100.0, 100.0));
    }

    #[test]
    fn test_all_four_handles_resize_symmetrically() {
        for (corner_pos, target, expected) in [
            // top-left dragged outward, bottom-right anchored at (150,150)
            ((50.0, 50.0), (30.0, 40.0), BBox::new(30.0, 40.0, 120.0, 110.0)),
            // bottom-right dragged outward, top-left anchored
            ((150.0, 150.0), (180.0, 170.0), BBox::new(50.0, 50.0, 130.0, 120.0)),
            // top-right dragged, bottom-left anchored at (50,150)
            ((150.0, 50.0), (170.0, 30.0), BBox::new(50.0, 30.0, 120.0, 120.0)),
            // bottom-left dragged, top-right anchored at (150,50)
            ((50.0, 150.0), (40.0, 160.0), BBox::new(40.0, 50.0, 110.0, 110.0)),
        ] {
            let (mut editor, _) = editor_with_image();
            draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));

            editor.on_pointer_down(screen(corner_pos.0, corner_pos.1));
            editor.on_pointer_move(screen(target.0, target.1));
            editor.on_pointer_up(screen(target.0, target.1));

            assert_eq!(editor.annotations()[0].bbox, expected, "corner {corner_pos:?}");
        }
    }

    #[test]
    fn test_resize_clamps_to_minimum_size() {
        let (mut editor, _) = editor_with_image();
        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));

        // Drag bottom-right almost onto the anchored top-left corner
        editor.on_pointer_down(screen(150.0, 150.0));
        editor.on_pointer_move(screen(51.0, 51.0));
        editor.on_pointer_up(screen(51.0, 51.0));

        let bbox = editor.annotations()[0].bbox;
        assert_eq!(bbox.width, MIN_BBOX_SIZE);
        assert_eq!(bbox.height, MIN_BBOX_SIZE);
        assert!(bbox.width > 0.0 && bbox.height > 0.0);
    }

    #[test]
    fn test_pan_in_select_mode_translates_stage() {
        let (mut editor, _) = editor_with_image();
        editor.on_pointer_down(Point::new(500.0, 500.0));
        editor.on_pointer_move(Point::new(540.0, 470.0));
        editor.on_pointer_up(Point::new(540.0, 470.0));

        assert_eq!(editor.transform().position, Point::new(60.0, -10.0));
        assert!(editor.annotations().is_empty());
    }

    #[test]
    fn test_delete_key_removes_selected() {
        let (mut editor, _) = editor_with_image();
        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));
        draw_box(&mut editor, (200.0, 200.0), (300.0, 300.0));
        assert_eq!(editor.annotations().len(), 2);

        editor.on_key(KeyCommand::DeleteSelected);
        assert_eq!(editor.annotations().len(), 1);
        assert_eq!(editor.selected(), None);

        // Nothing selected: delete is a no-op
        editor.on_key(KeyCommand::DeleteSelected);
        assert_eq!(editor.annotations().len(), 1);
    }

    #[test]
    fn test_escape_deselects() {
        let (mut editor, _) = editor_with_image();
        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));
        assert!(editor.selected().is_some());
        editor.on_key(KeyCommand::Deselect);
        assert_eq!(editor.selected(), None);
    }

    #[test]
    fn test_view_commands_ignored_while_drawing() {
        let (mut editor, _) = editor_with_image();
        editor.set_mode(Mode::Draw);
        editor.on_pointer_down(screen(50.0, 50.0));
        editor.on_pointer_move(screen(100.0, 100.0));

        let before = *editor.transform();
        editor.on_key(KeyCommand::ZoomIn);
        editor.on_key(KeyCommand::RotateClockwise);
        assert_eq!(*editor.transform(), before);

        // After finishing the draw they work again
        editor.on_pointer_up(screen(100.0, 100.0));
        editor.on_key(KeyCommand::RotateClockwise);
        assert_eq!(editor.transform().rotation, 90.0);
    }

    #[test]
    fn test_switching_to_select_cancels_draw_and_deselects() {
        let (mut editor, _) = editor_with_image();
        draw_box(&mut editor, (300.0, 300.0), (400.0, 400.0));

        editor.on_pointer_down(screen(50.0, 50.0));
        editor.on_pointer_move(screen(100.0, 100.0));
        assert!(editor.render_layer().draft().is_some());

        editor.set_mode(Mode::Select);
        assert!(editor.render_layer().draft().is_none());
        assert_eq!(editor.selected(), None);
        // The in-progress draw never committed
        assert_eq!(editor.annotations().len(), 1);
    }

    #[test]
    fn test_wheel_zoom_is_clamped() {
        let (mut editor, _) = editor_with_image();
        for _ in 0..200 {
            editor.on_wheel(-1.0, Point::new(500.0, 400.0));
        }
        assert_eq!(editor.transform().scale, 10.0);
        for _ in 0..400 {
            editor.on_wheel(1.0, Point::new(500.0, 400.0));
        }
        assert!((editor.transform().scale - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_switching_images_discards_previous_state() {
        let (mut editor, _) = editor_with_image();
        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));
        let old_ticket = editor.generation;

        let new_ticket = editor.begin_image_load(ImageInfo {
            id: "img-2".to_string(),
            width: 600.0,
            height: 600.0,
        });
        // Store and render layer are empty before anything arrives
        assert!(editor.annotations().is_empty());
        assert!(editor.render_layer().groups().is_empty());
        assert_eq!(editor.selected(), None);

        // A late annotation response for the old image is discarded
        editor.annotations_loaded(
            old_ticket,
            Ok(vec![Annotation::new_text(
                BBox::new(0.0, 0.0, 50.0, 50.0),
                Level::Word,
                Direction::Rtl,
                90,
            )]),
        );
        assert!(editor.annotations().is_empty());

        assert!(editor.image_ready(new_ticket));
        editor.annotations_loaded(new_ticket, Ok(Vec::new()));
        assert_eq!(editor.image().map(|i| i.id.as_str()), Some("img-2"));
    }

    #[test]
    fn test_stale_image_ready_loses_to_newer_load() {
        let (mut editor, _) = editor_with_image();
        let ticket_a = editor.begin_image_load(ImageInfo {
            id: "img-a".to_string(),
            width: 100.0,
            height: 100.0,
        });
        let ticket_b = editor.begin_image_load(ImageInfo {
            id: "img-b".to_string(),
            width: 200.0,
            height: 200.0,
        });

        assert!(!editor.image_ready(ticket_a));
        assert!(editor.image_ready(ticket_b));
        assert_eq!(editor.image().map(|i| i.id.as_str()), Some("img-b"));
    }

    #[test]
    fn test_annotation_load_failure_means_zero_annotations() {
        let sink = RecordingSink::default();
        let mut editor = CanvasEditor::new(Viewport::new(1040.0, 840.0), sink);
        let ticket = editor.begin_image_load(ImageInfo {
            id: "img-1".to_string(),
            width: 1000.0,
            height: 800.0,
        });
        assert!(editor.image_ready(ticket));
        editor.annotations_loaded(ticket, Err(CanvasError::annotation_load("timeout")));

        assert!(editor.annotations().is_empty());
        let notices = editor.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Warning);
    }

    #[test]
    fn test_image_load_failure_reports_notice() {
        let sink = RecordingSink::default();
        let mut editor = CanvasEditor::new(Viewport::new(1040.0, 840.0), sink);
        let ticket = editor.begin_image_load(ImageInfo {
            id: "img-1".to_string(),
            width: 1000.0,
            height: 800.0,
        });
        editor.image_failed(ticket, "decode error");

        assert!(editor.image().is_none());
        let notices = editor.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
    }

    #[test]
    fn test_debounce_coalesces_burst_into_one_save() {
        let (mut editor, sink) = editor_with_image();
        let t0 = Instant::now();

        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));
        draw_box(&mut editor, (200.0, 200.0), (300.0, 300.0));
        editor.update_selected(AnnotationPatch::new().label("𐩺𐩢"));

        // Inside the quiet window: nothing saved yet
        editor.tick(t0 + Duration::from_millis(1000));
        assert_eq!(sink.saves.borrow().len(), 0);

        // After the quiet window: exactly one save with the full list
        editor.tick(t0 + Duration::from_secs(10));
        let saves = sink.saves.borrow();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].0, "img-1");
        assert_eq!(saves[0].1.len(), 2);
    }

    #[test]
    fn test_manual_save_is_immediate_and_cancels_debounce() {
        let (mut editor, sink) = editor_with_image();
        let t0 = Instant::now();

        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));
        editor.save_now();
        assert_eq!(sink.saves.borrow().len(), 1);

        // The pending debounced save was cancelled
        editor.tick(t0 + Duration::from_secs(10));
        assert_eq!(sink.saves.borrow().len(), 1);

        let notices = editor.take_notices();
        assert!(notices.iter().any(|n| n.severity == Severity::Info));
    }

    #[test]
    fn test_periodic_flush_fires_even_when_clean() {
        let (mut editor, sink) = editor_with_image();
        let t0 = Instant::now();

        editor.tick(t0 + Duration::from_secs(29));
        assert_eq!(sink.saves.borrow().len(), 0);

        editor.tick(t0 + Duration::from_secs(31));
        assert_eq!(sink.saves.borrow().len(), 1);
    }

    #[test]
    fn test_save_failure_keeps_local_state_and_retries() {
        let (mut editor, sink) = editor_with_image();
        *sink.fail.borrow_mut() = true;

        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));
        editor.save_now();

        // Failure reported, local state retained
        let notices = editor.take_notices();
        assert!(notices.iter().any(|n| n.severity == Severity::Error));
        assert_eq!(editor.annotations().len(), 1);
        assert_eq!(sink.saves.borrow().len(), 0);

        // Backend recovers: the next quiet window reconciles
        *sink.fail.borrow_mut() = false;
        editor.tick(Instant::now() + Duration::from_secs(5));
        assert_eq!(sink.saves.borrow().len(), 1);
        assert_eq!(sink.saves.borrow()[0].1.len(), 1);
    }

    #[test]
    fn test_missing_region_defaults_and_label_update() {
        let (mut editor, _) = editor_with_image();
        editor.set_defaults(AnnotationDefaults {
            annotation_type: AnnotationType::MissingRegion,
            max_chars: 7,
            ..Default::default()
        });
        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));

        let ann = &editor.annotations()[0];
        assert!(ann.is_missing_region());
        assert_eq!(ann.label, crate::annotation::missing_region_label(7));

        editor.update_selected(AnnotationPatch::new().max_chars(3));
        assert_eq!(
            editor.annotations()[0].label,
            crate::annotation::missing_region_label(3)
        );
    }

    #[test]
    fn test_draw_ignored_without_image() {
        let sink = RecordingSink::default();
        let mut editor = CanvasEditor::new(Viewport::new(1040.0, 840.0), sink);
        editor.set_mode(Mode::Draw);
        editor.on_pointer_down(Point::new(100.0, 100.0));
        editor.on_pointer_move(Point::new(200.0, 200.0));
        editor.on_pointer_up(Point::new(200.0, 200.0));
        assert!(editor.annotations().is_empty());
        assert!(editor.render_layer().draft().is_none());
    }

    #[test]
    fn test_review_mode_is_read_only() {
        let (mut editor, sink) = editor_with_image();
        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));
        editor.save_now();
        let saved = sink.saves.borrow().len();
        editor.set_render_mode(RenderMode::Review);

        // Body drag selects but does not move
        let before = editor.annotations()[0].bbox;
        editor.on_pointer_down(screen(100.0, 100.0));
        editor.on_pointer_move(screen(130.0, 140.0));
        editor.on_pointer_up(screen(130.0, 140.0));
        assert!(editor.selected().is_some());
        assert_eq!(editor.annotations()[0].bbox, before);

        // Handle drag does not resize
        editor.on_pointer_down(screen(50.0, 50.0));
        editor.on_pointer_move(screen(30.0, 30.0));
        editor.on_pointer_up(screen(30.0, 30.0));
        assert_eq!(editor.annotations()[0].bbox, before);

        // Delete and property patches are ignored
        editor.on_key(KeyCommand::DeleteSelected);
        assert_eq!(editor.annotations().len(), 1);
        editor.update_selected(AnnotationPatch::new().confidence(10));
        assert_eq!(editor.annotations()[0].confidence, 90);

        // Drawing is disabled; empty-space drags pan instead
        editor.set_mode(Mode::Draw);
        editor.on_pointer_down(screen(500.0, 500.0));
        editor.on_pointer_move(screen(540.0, 470.0));
        editor.on_pointer_up(screen(540.0, 470.0));
        assert_eq!(editor.annotations().len(), 1);
        assert!(editor.render_layer().draft().is_none());
        assert_eq!(editor.transform().position, Point::new(60.0, -10.0));

        // None of it marked anything dirty, so nothing else saves
        editor.tick(Instant::now() + Duration::from_secs(10));
        assert_eq!(sink.saves.borrow().len(), saved);
    }

    #[test]
    fn test_save_without_image_reports_error() {
        init_logs();
        let sink = RecordingSink::default();
        let mut editor = CanvasEditor::new(Viewport::new(1040.0, 840.0), sink.clone());
        editor.save_now();

        assert_eq!(sink.saves.borrow().len(), 0);
        let notices = editor.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
    }

    #[test]
    fn test_successful_save_restarts_periodic_clock() {
        let (mut editor, sink) = editor_with_image();
        let t0 = Instant::now();

        draw_box(&mut editor, (50.0, 50.0), (150.0, 150.0));
        // Debounced save fires here, restarting the flush clock
        editor.tick(t0 + Duration::from_secs(29));
        assert_eq!(sink.saves.borrow().len(), 1);

        // The original flush moment passes quietly
        editor.tick(t0 + Duration::from_secs(31));
        assert_eq!(sink.saves.borrow().len(), 1);

        // One interval after the save, the flush fires again
        editor.tick(t0 + Duration::from_secs(60));
        assert_eq!(sink.saves.borrow().len(), 2);
    }
}
