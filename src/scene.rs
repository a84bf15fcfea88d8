//! The live scene: active layout, photo elements and text elements.
//!
//! Every mutation goes through a named operation on [`Scene`], and every
//! operation normalizes its inputs: offsets are clamped to `[-1, 1]`, text
//! positions to `[0, 1]`, scales are floored, rotations wrapped, and
//! non-finite values ignored.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::decode::ImageSource;
use crate::error::{Error, Result};
use crate::fit::fit_scale;
use crate::geometry::{NormPoint, Size};
use crate::layout::{Layout, Slot};
use crate::raster::Color;
use crate::transform::{Sheet, slot_rect};

/// Tolerance when grouping photos into rows for reading order.
const ROW_TOLERANCE: f64 = 0.01;

/// Stable identifier of a photo element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhotoId(pub u64);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "photo#{}", self.0)
    }
}

/// Stable identifier of a text element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextId(pub u64);

impl fmt::Display for TextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "text#{}", self.0)
    }
}

/// A decoded photo placed in one slot.
///
/// The slot rectangle is copied at creation so the element stays
/// addressable on its own.
#[derive(Clone, Debug)]
pub struct PhotoElement {
    id: PhotoId,
    source: ImageSource,
    native: Size,
    slot_index: usize,
    slot: Slot,
    offset: NormPoint,
    scale: f64,
    rotation: f64,
}

impl PhotoElement {
    /// Stable identifier.
    pub fn id(&self) -> PhotoId {
        self.id
    }

    /// Source bytes, re-decoded by the export pass.
    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    /// Native pixel size of the decoded source.
    pub fn native(&self) -> Size {
        self.native
    }

    /// Index of the occupied slot in the layout.
    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    /// Frame of the occupied slot, in normalized sheet coordinates.
    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    /// Offset from the slot center as a fraction of slot extent, `[-1, 1]`.
    pub fn offset(&self) -> NormPoint {
        self.offset
    }

    /// Multiplier on the native pixel size, in sheet units per pixel.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Degrees clockwise, `[-180, 180]`.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }
}

/// A text label positioned on the sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct TextElement {
    id: TextId,
    content: String,
    position: NormPoint,
    font_family: String,
    font_size: f32,
    color: Color,
    rotation: f64,
}

impl TextElement {
    /// Stable identifier.
    pub fn id(&self) -> TextId {
        self.id
    }

    /// Text to draw, possibly empty.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Center of the text in normalized sheet coordinates.
    pub fn position(&self) -> NormPoint {
        self.position
    }

    /// Requested family name, resolved by [`FontBook`](crate::text::FontBook).
    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    /// Display font size in pixels.
    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Fill color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Degrees clockwise about the text center, `[-180, 180]`.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }
}

/// Partial update of a photo. `None` fields are left untouched.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PhotoPatch {
    /// Clamped to `[-1, 1]` on each axis.
    pub offset: Option<NormPoint>,
    /// Floored at [`SceneRules::min_scale`].
    pub scale: Option<f64>,
    /// Wrapped into `[-180, 180]`.
    pub rotation: Option<f64>,
}

/// Partial update of a text. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextPatch {
    pub content: Option<String>,
    /// Clamped into the sheet.
    pub position: Option<NormPoint>,
    pub font_family: Option<String>,
    /// Clamped to the rules' font size bounds.
    pub font_size: Option<f32>,
    pub color: Option<Color>,
    /// Wrapped into `[-180, 180]`.
    pub rotation: Option<f64>,
}

impl TextPatch {
    /// Set the color from a CSS color string.
    pub fn with_css_color(mut self, css: &str) -> Result<Self> {
        self.color = Some(Color::parse(css)?);
        Ok(self)
    }
}

/// Zoom button direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Zoom {
    In,
    Out,
}

/// Initial values for newly added texts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    /// Placeholder content.
    pub content: String,
    /// Family name looked up in the font book.
    pub font_family: String,
    /// Display size in pixels.
    pub font_size: f32,
    /// Fill color.
    pub color: Color,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            content: "Enter text".into(),
            font_family: "Arial".into(),
            font_size: 30.0,
            color: Color::BLACK,
        }
    }
}

/// Numeric bounds the scene enforces at its mutation boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneRules {
    /// Portrait working sheet in sheet units.
    pub sheet: Size,
    /// Style of newly added texts.
    pub text_defaults: TextDefaults,
    /// Smallest accepted font size.
    pub font_size_min: f32,
    /// Largest accepted font size.
    pub font_size_max: f32,
    /// Scale change per zoom button press.
    pub zoom_step: f64,
    /// Floor for scales set by hand or by zooming. Fit scales may go lower.
    pub min_scale: f64,
}

impl Default for SceneRules {
    fn default() -> Self {
        Self {
            sheet: Size::new(1600, 2400),
            text_defaults: TextDefaults::default(),
            font_size_min: 12.0,
            font_size_max: 48.0,
            zoom_step: 0.01,
            min_scale: 0.01,
        }
    }
}

/// Single owner of the composition.
#[derive(Clone, Debug)]
pub struct Scene {
    layout: Layout,
    rules: SceneRules,
    photos: Vec<PhotoElement>,
    texts: Vec<TextElement>,
    next_id: u64,
    revision: u64,
}

impl Scene {
    /// An empty scene on `layout`.
    pub fn new(layout: Layout, rules: SceneRules) -> Self {
        Self {
            layout,
            rules,
            photos: Vec::new(),
            texts: Vec::new(),
            next_id: 1,
            revision: 0,
        }
    }

    /// Active layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Bounds in effect.
    pub fn rules(&self) -> &SceneRules {
        &self.rules
    }

    /// Working sheet of the active layout.
    pub fn sheet(&self) -> Sheet {
        Sheet::for_layout(&self.layout, self.rules.sheet)
    }

    /// Photos in insertion (draw) order.
    pub fn photos(&self) -> &[PhotoElement] {
        &self.photos
    }

    /// Texts in insertion (draw) order.
    pub fn texts(&self) -> &[TextElement] {
        &self.texts
    }

    /// Look up a photo by id.
    pub fn photo(&self, id: PhotoId) -> Option<&PhotoElement> {
        self.photos.iter().find(|p| p.id == id)
    }

    /// Look up a text by id.
    pub fn text(&self, id: TextId) -> Option<&TextElement> {
        self.texts.iter().find(|t| t.id == id)
    }

    /// Bumped by every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn photo_mut(&mut self, id: PhotoId) -> Result<&mut PhotoElement> {
        self.photos
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(Error::UnknownPhoto(id))
    }

    fn text_mut(&mut self, id: TextId) -> Result<&mut TextElement> {
        self.texts
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::UnknownText(id))
    }

    // ── layout ──────────────────────────────────────────────────────────

    /// Switch layouts. Always clears every photo and text.
    pub fn set_layout(&mut self, layout: Layout) {
        log::debug!(
            "layout {} -> {}, clearing {} photos and {} texts",
            self.layout.id(),
            layout.id(),
            self.photos.len(),
            self.texts.len()
        );
        self.layout = layout;
        self.photos.clear();
        self.texts.clear();
        self.touch();
    }

    // ── photos ──────────────────────────────────────────────────────────

    /// Lowest slot index no photo occupies.
    pub fn next_free_slot(&self) -> Option<usize> {
        (0..self.layout.slot_count()).find(|i| !self.photos.iter().any(|p| p.slot_index == *i))
    }

    /// Place a decoded image into the next free slot at its fit scale.
    pub fn add_photo(&mut self, source: ImageSource, native: Size) -> Result<PhotoId> {
        let slot_index = self.next_free_slot().ok_or(Error::NoFreeSlot)?;
        let slot = *self.layout.slot(slot_index).ok_or(Error::NoFreeSlot)?;
        let scale = self.fit_for(&slot, native)?;
        let id = PhotoId(self.allocate_id());
        log::debug!(
            "{id} '{}' {}x{} -> slot {slot_index} at scale {scale:.4}",
            source.label(),
            native.width,
            native.height
        );
        self.photos.push(PhotoElement {
            id,
            source,
            native,
            slot_index,
            slot,
            offset: NormPoint::ZERO,
            scale,
            rotation: 0.0,
        });
        self.touch();
        Ok(id)
    }

    /// Fit scale for `native` in `slot`. Not floored by `min_scale`: a very
    /// wide image may need less to stay inside a contain frame.
    fn fit_for(&self, slot: &Slot, native: Size) -> Result<f64> {
        let frame = slot_rect(slot, &self.sheet());
        Ok(fit_scale(native, frame.width, frame.height, self.layout.fit_policy())?)
    }

    /// Apply a partial update. Non-finite values are ignored.
    pub fn update_photo(&mut self, id: PhotoId, patch: PhotoPatch) -> Result<()> {
        let min_scale = self.rules.min_scale;
        let photo = self.photo_mut(id)?;
        if let Some(offset) = patch.offset.filter(|o| o.is_finite()) {
            photo.offset = offset.clamp_each(-1.0, 1.0);
        }
        if let Some(scale) = patch.scale.filter(|s| s.is_finite()) {
            photo.scale = scale.max(min_scale);
        }
        if let Some(rotation) = patch.rotation.filter(|r| r.is_finite()) {
            photo.rotation = normalize_degrees(rotation);
        }
        self.touch();
        Ok(())
    }

    /// Step a photo's scale by the zoom step; returns the new scale.
    pub fn zoom_photo(&mut self, id: PhotoId, zoom: Zoom) -> Result<f64> {
        let step = self.rules.zoom_step;
        let current = self.photo(id).ok_or(Error::UnknownPhoto(id))?.scale;
        let scale = match zoom {
            Zoom::In => current + step,
            Zoom::Out => current - step,
        };
        self.update_photo(id, PhotoPatch {
            scale: Some(scale),
            ..PhotoPatch::default()
        })?;
        Ok(self.photo(id).map_or(scale, |p| p.scale))
    }

    /// Re-run the fit for a photo and re-center it. Rotation is kept.
    pub fn fit_photo(&mut self, id: PhotoId) -> Result<()> {
        let photo = self.photo(id).ok_or(Error::UnknownPhoto(id))?;
        let scale = self.fit_for(&photo.slot, photo.native)?;
        let photo = self.photo_mut(id)?;
        photo.scale = scale;
        photo.offset = NormPoint::ZERO;
        self.touch();
        Ok(())
    }

    /// Copy one photo's scale onto every photo. Offsets and rotations stay.
    pub fn apply_scale_to_all(&mut self, from: PhotoId) -> Result<()> {
        let scale = self.photo(from).ok_or(Error::UnknownPhoto(from))?.scale;
        for photo in &mut self.photos {
            photo.scale = scale;
        }
        self.touch();
        Ok(())
    }

    /// Remove a photo, freeing its slot.
    pub fn delete_photo(&mut self, id: PhotoId) -> Result<()> {
        let index = self
            .photos
            .iter()
            .position(|p| p.id == id)
            .ok_or(Error::UnknownPhoto(id))?;
        self.photos.remove(index);
        self.touch();
        Ok(())
    }

    /// Photos sorted top-to-bottom then left-to-right by slot, for listing.
    /// Draw order is unaffected.
    pub fn photos_in_reading_order(&self) -> Vec<&PhotoElement> {
        let mut ordered: Vec<_> = self.photos.iter().collect();
        ordered.sort_by(|a, b| {
            if (a.slot.y - b.slot.y).abs() < ROW_TOLERANCE {
                a.slot.x.total_cmp(&b.slot.x)
            } else {
                a.slot.y.total_cmp(&b.slot.y)
            }
        });
        ordered
    }

    // ── texts ───────────────────────────────────────────────────────────

    /// Add a text with the default style at `at`, or at sheet center.
    pub fn add_text(&mut self, at: Option<NormPoint>) -> TextId {
        let position = at
            .filter(|p| p.is_finite())
            .map_or(NormPoint::CENTER, |p| p.clamp_each(0.0, 1.0));
        let defaults = self.rules.text_defaults.clone();
        let id = TextId(self.allocate_id());
        self.texts.push(TextElement {
            id,
            content: defaults.content,
            position,
            font_family: defaults.font_family,
            font_size: defaults
                .font_size
                .clamp(self.rules.font_size_min, self.rules.font_size_max),
            color: defaults.color,
            rotation: 0.0,
        });
        self.touch();
        id
    }

    /// Apply a partial update. Non-finite values are ignored.
    pub fn update_text(&mut self, id: TextId, patch: TextPatch) -> Result<()> {
        let (min, max) = (self.rules.font_size_min, self.rules.font_size_max);
        let text = self.text_mut(id)?;
        if let Some(content) = patch.content {
            text.content = content;
        }
        if let Some(position) = patch.position.filter(|p| p.is_finite()) {
            text.position = position.clamp_each(0.0, 1.0);
        }
        if let Some(family) = patch.font_family {
            text.font_family = family;
        }
        if let Some(size) = patch.font_size.filter(|s| s.is_finite()) {
            text.font_size = size.clamp(min, max);
        }
        if let Some(color) = patch.color {
            text.color = color;
        }
        if let Some(rotation) = patch.rotation.filter(|r| r.is_finite()) {
            text.rotation = normalize_degrees(rotation);
        }
        self.touch();
        Ok(())
    }

    /// Remove a text.
    pub fn delete_text(&mut self, id: TextId) -> Result<()> {
        let index = self
            .texts
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::UnknownText(id))?;
        self.texts.remove(index);
        self.touch();
        Ok(())
    }
}

/// Wrap degrees into `[-180, 180]`, keeping `180` itself.
fn normalize_degrees(deg: f64) -> f64 {
    if (-180.0..=180.0).contains(&deg) {
        return deg;
    }
    (deg + 180.0).rem_euclid(360.0) - 180.0
}
