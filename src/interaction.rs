//! Pointer hit-testing and the drag state machine.
//!
//! ```text
//!            pointer_down (hit)
//!   Idle ─────────────────────────▶ Dragging { target, grab }
//!    ▲                                 │  pointer_move: update target
//!    └──────── pointer_up / leave ─────┘
//! ```
//!
//! Pointer positions arrive already normalized to the sheet; see
//! [`normalize_pointer`]. Updates are applied live while dragging, so
//! release has nothing to commit.

use crate::geometry::{NormPoint, PixelRect};
use crate::scene::{PhotoId, PhotoPatch, Scene, TextElement, TextId, TextPatch};
use crate::transform::{Sheet, slot_rect, to_sheet_pixels};

/// Text width measurement used to size text hit boxes.
pub trait TextMeasure {
    /// Advance width of `text` rendered at `px` sheet units.
    fn line_width(&self, family: &str, text: &str, px: f32) -> f64;
}

/// Sizing of text hit boxes, in sheet units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HitParams {
    /// Display font size to sheet units.
    pub text_scale: f64,
    /// Vertical text line height as a multiple of font size.
    pub vertical_line_factor: f64,
    /// Added to each hit box dimension.
    pub padding: f64,
}

impl Default for HitParams {
    fn default() -> Self {
        Self {
            text_scale: 2.0,
            vertical_line_factor: 2.4,
            padding: 80.0,
        }
    }
}

/// The element a drag moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DragTarget {
    /// Moves within its slot.
    Photo(PhotoId),
    /// Moves anywhere on the sheet.
    Text(TextId),
}

/// Pointer drag state.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum DragState {
    /// No button held over an element.
    #[default]
    Idle,
    /// An element follows the pointer.
    Dragging {
        /// Element being moved.
        target: DragTarget,
        /// Pointer minus the target's reference point at grab time, in the
        /// target's own coordinates (slot-relative for photos, normalized
        /// sheet for texts).
        grab: NormPoint,
    },
}

/// What a pointer-down does.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PointerMode {
    /// Grab and drag elements.
    #[default]
    Arrange,
    /// Place a new text at the pointer.
    AddText,
}

/// What a pointer event did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerOutcome {
    /// Nothing hit, or the move fell outside the target's bounds.
    Ignored,
    /// A drag started on this element.
    Grabbed(DragTarget),
    /// The dragged element moved.
    Moved(DragTarget),
    /// A drag ended.
    Released,
    /// A text was placed at the pointer.
    TextAdded(TextId),
}

impl PointerOutcome {
    /// Whether the scene changed.
    pub fn mutated(self) -> bool {
        matches!(self, Self::Moved(_) | Self::TextAdded(_))
    }
}

/// Normalize a surface-local pointer position by the surface's displayed
/// size. Values outside `[0, 1]` are kept; clamping is per target.
pub fn normalize_pointer(local: (f64, f64), displayed: (f64, f64)) -> Option<NormPoint> {
    let (w, h) = displayed;
    if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
        return None;
    }
    let p = NormPoint::new(local.0 / w, local.1 / h);
    p.is_finite().then_some(p)
}

/// Axis-aligned hit box of a text in sheet units, centered on its position.
pub fn text_hit_box(
    text: &TextElement,
    sheet: &Sheet,
    measure: &dyn TextMeasure,
    params: &HitParams,
) -> PixelRect {
    let size = f64::from(text.font_size()) * params.text_scale;
    let (width, height) = if sheet.orientation.is_landscape() {
        let lines = text.content().chars().count() as f64;
        let line_height = f64::from(text.font_size()) * params.vertical_line_factor;
        (size, lines * line_height)
    } else {
        let width = measure.line_width(text.font_family(), text.content(), size as f32);
        (width, size)
    };
    let width = width + params.padding;
    let height = height + params.padding;
    let (cx, cy) = to_sheet_pixels(text.position(), sheet);
    PixelRect::new(cx - width / 2.0, cy - height / 2.0, width, height)
}

/// Drag state machine over a [`Scene`].
#[derive(Clone, Debug, Default)]
pub struct Interaction {
    state: DragState,
    mode: PointerMode,
    params: HitParams,
}

impl Interaction {
    /// Idle, arranging, with the given hit parameters.
    pub fn new(params: HitParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Current drag state.
    pub fn state(&self) -> DragState {
        self.state
    }

    /// Whether an element is being dragged.
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Current pointer mode.
    pub fn mode(&self) -> PointerMode {
        self.mode
    }

    /// Mode persists until changed.
    pub fn set_mode(&mut self, mode: PointerMode) {
        self.mode = mode;
        self.state = DragState::Idle;
    }

    /// Hit-box parameters in use.
    pub fn params(&self) -> &HitParams {
        &self.params
    }

    /// First element under `p`: texts in list order, then photos.
    pub fn hit_test(
        &self,
        scene: &Scene,
        p: NormPoint,
        measure: &dyn TextMeasure,
    ) -> Option<(DragTarget, NormPoint)> {
        let sheet = scene.sheet();
        let (px, py) = to_sheet_pixels(p, &sheet);

        for text in scene.texts() {
            if text_hit_box(text, &sheet, measure, &self.params).contains(px, py) {
                return Some((DragTarget::Text(text.id()), p.sub(text.position())));
            }
        }
        for photo in scene.photos() {
            if slot_rect(photo.slot(), &sheet).contains(px, py) {
                let grab = photo.slot().relative(p).sub(photo.offset());
                return Some((DragTarget::Photo(photo.id()), grab));
            }
        }
        None
    }

    /// Press at `p`: grab the topmost element, or place a text in
    /// [`PointerMode::AddText`].
    pub fn pointer_down(
        &mut self,
        scene: &mut Scene,
        p: NormPoint,
        measure: &dyn TextMeasure,
    ) -> PointerOutcome {
        if !p.is_finite() {
            return PointerOutcome::Ignored;
        }
        match self.mode {
            PointerMode::AddText => {
                self.state = DragState::Idle;
                PointerOutcome::TextAdded(scene.add_text(Some(p)))
            }
            PointerMode::Arrange => match self.hit_test(scene, p, measure) {
                Some((target, grab)) => {
                    log::debug!("grabbed {target:?}");
                    self.state = DragState::Dragging { target, grab };
                    PointerOutcome::Grabbed(target)
                }
                None => {
                    self.state = DragState::Idle;
                    PointerOutcome::Ignored
                }
            },
        }
    }

    /// Move the dragged element so the grab point follows `p`. Photos only
    /// move while `p` is inside their slot; texts are clamped to the sheet.
    pub fn pointer_move(&mut self, scene: &mut Scene, p: NormPoint) -> PointerOutcome {
        let DragState::Dragging { target, grab } = self.state else {
            return PointerOutcome::Ignored;
        };
        if !p.is_finite() {
            return PointerOutcome::Ignored;
        }
        let applied = match target {
            DragTarget::Text(id) => scene.update_text(id, TextPatch {
                position: Some(p.sub(grab)),
                ..TextPatch::default()
            }),
            DragTarget::Photo(id) => {
                let Some(slot) = scene.photo(id).map(|photo| *photo.slot()) else {
                    self.state = DragState::Idle;
                    return PointerOutcome::Ignored;
                };
                if !slot.contains(p) {
                    return PointerOutcome::Ignored;
                }
                scene.update_photo(id, PhotoPatch {
                    offset: Some(slot.relative(p).sub(grab)),
                    ..PhotoPatch::default()
                })
            }
        };
        match applied {
            Ok(()) => PointerOutcome::Moved(target),
            Err(e) => {
                // Target vanished mid-drag.
                log::debug!("drag ended: {e}");
                self.state = DragState::Idle;
                PointerOutcome::Ignored
            }
        }
    }

    /// End any drag.
    pub fn pointer_up(&mut self) -> PointerOutcome {
        let was = core::mem::take(&mut self.state);
        match was {
            DragState::Dragging { .. } => PointerOutcome::Released,
            DragState::Idle => PointerOutcome::Ignored,
        }
    }

    /// Leaving the surface ends a drag like a release does.
    pub fn pointer_leave(&mut self) -> PointerOutcome {
        self.pointer_up()
    }

    /// Drop any drag without an event, e.g. after the scene was reset.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ImageSource;
    use crate::geometry::Size;
    use crate::layout::Catalog;
    use crate::scene::SceneRules;

    /// Every character is `px` wide.
    struct Monospace;

    impl TextMeasure for Monospace {
        fn line_width(&self, _family: &str, text: &str, px: f32) -> f64 {
            text.chars().count() as f64 * f64::from(px)
        }
    }

    fn scene(layout: &str) -> Scene {
        Scene::new(
            Catalog::builtin().get(layout).unwrap().clone(),
            SceneRules::default(),
        )
    }

    fn add_photo(scene: &mut Scene) -> PhotoId {
        scene
            .add_photo(ImageSource::from_bytes("p", Vec::new()), Size::new(100, 100))
            .unwrap()
    }

    // ── pointer normalization ───────────────────────────────────────────

    #[test]
    fn normalize_uses_displayed_size() {
        let p = normalize_pointer((200.0, 150.0), (400.0, 600.0)).unwrap();
        assert_eq!(p, NormPoint::new(0.5, 0.25));
        assert_eq!(
            normalize_pointer((-40.0, 900.0), (400.0, 600.0)),
            Some(NormPoint::new(-0.1, 1.5))
        );
        assert!(normalize_pointer((1.0, 1.0), (0.0, 600.0)).is_none());
    }

    // ── hit testing ─────────────────────────────────────────────────────

    #[test]
    fn text_hit_box_horizontal() {
        let mut s = scene("grid-4");
        let id = s.add_text(None);
        let text = s.text(id).unwrap();
        // "Enter text" = 10 chars at 60 units, plus 80 padding each way.
        let r = text_hit_box(text, &s.sheet(), &Monospace, &HitParams::default());
        assert!((r.width - 680.0).abs() < 1e-9);
        assert!((r.height - 140.0).abs() < 1e-9);
        assert!((r.center().0 - 800.0).abs() < 1e-9);
    }

    #[test]
    fn text_hit_box_vertical_on_landscape() {
        let mut s = scene("horizontal-2");
        let id = s.add_text(None);
        let text = s.text(id).unwrap();
        let r = text_hit_box(text, &s.sheet(), &Monospace, &HitParams::default());
        assert!((r.width - 140.0).abs() < 1e-9);
        // 10 chars × 30 × 2.4 + 80
        assert!((r.height - 800.0).abs() < 1e-9);
    }

    #[test]
    fn texts_win_over_photos() {
        let mut s = scene("single");
        add_photo(&mut s);
        let text = s.add_text(None);
        let mut i = Interaction::default();
        assert_eq!(
            i.pointer_down(&mut s, NormPoint::CENTER, &Monospace),
            PointerOutcome::Grabbed(DragTarget::Text(text))
        );
    }

    #[test]
    fn photo_hit_uses_slot_not_image_bounds() {
        let mut s = scene("grid-4");
        let id = add_photo(&mut s);
        let mut i = Interaction::default();
        // Slot corner, far outside a 100×100 image drawn at the center.
        let corner = NormPoint::new(0.03, 0.03);
        assert_eq!(
            i.pointer_down(&mut s, corner, &Monospace),
            PointerOutcome::Grabbed(DragTarget::Photo(id))
        );
    }

    #[test]
    fn miss_stays_idle() {
        let mut s = scene("grid-4");
        add_photo(&mut s);
        let mut i = Interaction::default();
        assert_eq!(
            i.pointer_down(&mut s, NormPoint::new(0.01, 0.01), &Monospace),
            PointerOutcome::Ignored
        );
        assert_eq!(i.state(), DragState::Idle);
    }

    // ── dragging ────────────────────────────────────────────────────────

    #[test]
    fn photo_drag_preserves_grab_point() {
        let mut s = scene("grid-4");
        let id = add_photo(&mut s);
        let slot = *s.photo(id).unwrap().slot();
        let mut i = Interaction::default();
        let start = NormPoint::new(slot.x + slot.width * 0.75, slot.y + slot.height * 0.5);
        i.pointer_down(&mut s, start, &Monospace);
        // No jump on grab.
        assert_eq!(s.photo(id).unwrap().offset(), NormPoint::ZERO);

        let to = NormPoint::new(start.x - slot.width * 0.5, start.y + slot.height * 0.25);
        assert_eq!(i.pointer_move(&mut s, to), PointerOutcome::Moved(DragTarget::Photo(id)));
        let offset = s.photo(id).unwrap().offset();
        assert!((offset.x + 0.5).abs() < 1e-9 && (offset.y - 0.25).abs() < 1e-9);
    }

    #[test]
    fn photo_drag_outside_slot_is_noop() {
        let mut s = scene("grid-4");
        let id = add_photo(&mut s);
        let slot = *s.photo(id).unwrap().slot();
        let mut i = Interaction::default();
        let center = NormPoint::new(slot.x + slot.width / 2.0, slot.y + slot.height / 2.0);
        i.pointer_down(&mut s, center, &Monospace);
        i.pointer_move(&mut s, NormPoint::new(center.x + 0.1, center.y));
        let last = s.photo(id).unwrap().offset();

        for outside in [
            NormPoint::new(0.9, 0.9),
            NormPoint::new(-1.0, 0.2),
            NormPoint::new(0.2, 3.0),
        ] {
            assert_eq!(i.pointer_move(&mut s, outside), PointerOutcome::Ignored);
            assert_eq!(s.photo(id).unwrap().offset(), last);
        }
        assert!(i.is_dragging());
    }

    #[test]
    fn text_drag_clamps_per_axis() {
        let mut s = scene("grid-4");
        let id = s.add_text(None);
        let mut i = Interaction::default();
        i.pointer_down(&mut s, NormPoint::CENTER, &Monospace);
        i.pointer_move(&mut s, NormPoint::new(-5.0, 5.0));
        assert_eq!(s.text(id).unwrap().position(), NormPoint::new(0.0, 1.0));
    }

    #[test]
    fn release_and_leave_clear_session() {
        let mut s = scene("grid-4");
        s.add_text(None);
        let mut i = Interaction::default();
        i.pointer_down(&mut s, NormPoint::CENTER, &Monospace);
        assert_eq!(i.pointer_up(), PointerOutcome::Released);
        assert_eq!(i.pointer_up(), PointerOutcome::Ignored);
        i.pointer_down(&mut s, NormPoint::CENTER, &Monospace);
        assert_eq!(i.pointer_leave(), PointerOutcome::Released);
        assert_eq!(i.pointer_move(&mut s, NormPoint::CENTER), PointerOutcome::Ignored);
    }

    #[test]
    fn add_text_mode_places_without_dragging() {
        let mut s = scene("grid-4");
        let mut i = Interaction::default();
        i.set_mode(PointerMode::AddText);
        let at = NormPoint::new(0.2, 0.7);
        let PointerOutcome::TextAdded(id) = i.pointer_down(&mut s, at, &Monospace) else {
            panic!("expected a new text");
        };
        assert_eq!(s.text(id).unwrap().position(), at);
        assert!(!i.is_dragging());
        // Sticky until changed.
        assert!(matches!(
            i.pointer_down(&mut s, at, &Monospace),
            PointerOutcome::TextAdded(_)
        ));
        assert_eq!(s.texts().len(), 2);
    }

    #[test]
    fn deleted_target_ends_drag() {
        let mut s = scene("grid-4");
        let id = s.add_text(None);
        let mut i = Interaction::default();
        i.pointer_down(&mut s, NormPoint::CENTER, &Monospace);
        s.delete_text(id).unwrap();
        assert_eq!(i.pointer_move(&mut s, NormPoint::CENTER), PointerOutcome::Ignored);
        assert!(!i.is_dragging());
    }
}
