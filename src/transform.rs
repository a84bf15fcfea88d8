//! Mapping between normalized, slot-relative and sheet-unit coordinates.
//!
//! All functions are pure; each element gets its own freshly composed
//! [`Transform`]. Builders chain with `pre_*`, so the last operation named
//! is the first one applied to a point.

use tiny_skia::Transform;

use crate::geometry::{NormPoint, PixelRect, Size};
use crate::layout::{Layout, Slot};
use crate::orientation::SheetOrientation;
use crate::scene::{PhotoElement, TextElement};

/// Working sheet of the active layout, in sheet units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sheet {
    /// Width in sheet units.
    pub width: f64,
    /// Height in sheet units.
    pub height: f64,
    /// Orientation the sheet was derived for.
    pub orientation: SheetOrientation,
}

impl Sheet {
    /// Sheet for `layout`, given the portrait base size.
    pub fn for_layout(layout: &Layout, portrait: Size) -> Self {
        Self::new(layout.orientation(), portrait)
    }

    /// Sheet of `orientation` over the portrait base size.
    pub fn new(orientation: SheetOrientation, portrait: Size) -> Self {
        let size = orientation.sheet_size(portrait);
        Self {
            width: size.width as f64,
            height: size.height as f64,
            orientation,
        }
    }

    /// Integer size of the sheet.
    pub fn size(&self) -> Size {
        Size::new(self.width.round() as u32, self.height.round() as u32)
    }
}

/// Normalized sheet point to sheet units.
pub fn to_sheet_pixels(p: NormPoint, sheet: &Sheet) -> (f64, f64) {
    (p.x * sheet.width, p.y * sheet.height)
}

/// A slot's rectangle in sheet units.
pub fn slot_rect(slot: &Slot, sheet: &Sheet) -> PixelRect {
    PixelRect::new(
        slot.x * sheet.width,
        slot.y * sheet.height,
        slot.width * sheet.width,
        slot.height * sheet.height,
    )
}

/// Photo-local space to sheet units: origin at the slot center shifted by
/// the element's offset, rotated by its rotation.
pub fn element_transform(photo: &PhotoElement, sheet: &Sheet) -> Transform {
    let rect = slot_rect(photo.slot(), sheet);
    let (cx, cy) = rect.center();
    let offset = photo.offset();
    let x = cx + offset.x * rect.width;
    let y = cy + offset.y * rect.height;
    Transform::from_translate(x as f32, y as f32)
        .pre_concat(Transform::from_rotate(photo.rotation() as f32))
}

/// Image pixel space to sheet units. The image is drawn centered on the
/// element origin at `native × scale`.
pub fn image_transform(photo: &PhotoElement, sheet: &Sheet, image: Size) -> Transform {
    let scale = photo.scale();
    let draw_w = image.width as f64 * scale;
    let draw_h = image.height as f64 * scale;
    element_transform(photo, sheet)
        .pre_translate((-draw_w / 2.0) as f32, (-draw_h / 2.0) as f32)
        .pre_scale(scale as f32, scale as f32)
}

/// Text anchor in sheet units; text is centered here.
pub fn text_transform(text: &TextElement, sheet: &Sheet) -> Transform {
    let (x, y) = to_sheet_pixels(text.position(), sheet);
    Transform::from_translate(x as f32, y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ImageSource;
    use crate::layout::Catalog;
    use crate::scene::{PhotoPatch, Scene, SceneRules};
    use tiny_skia::Point;

    fn portrait() -> Sheet {
        Sheet::new(SheetOrientation::Portrait, Size::new(1600, 2400))
    }

    #[test]
    fn normalized_round_trip() {
        let sheets = [
            portrait(),
            Sheet::new(SheetOrientation::Landscape, Size::new(1600, 2400)),
        ];
        for sheet in sheets {
            for i in 0..=10 {
                for j in 0..=10 {
                    let p = NormPoint::new(i as f64 / 10.0, j as f64 / 10.0);
                    let (px, py) = to_sheet_pixels(p, &sheet);
                    let back = NormPoint::new(px / sheet.width, py / sheet.height);
                    assert!((back.x - p.x).abs() < 1e-12 && (back.y - p.y).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn landscape_layout_uses_swapped_sheet() {
        let catalog = Catalog::builtin();
        let sheet = Sheet::for_layout(catalog.get("horizontal-2").unwrap(), Size::new(1600, 2400));
        assert_eq!(sheet.size(), Size::new(2400, 1600));
    }

    #[test]
    fn slot_rect_in_sheet_units() {
        let slot = Slot::new(0.025, 0.025, 0.4625, 0.4125);
        let r = slot_rect(&slot, &portrait());
        assert!((r.x - 40.0).abs() < 1e-9);
        assert!((r.y - 60.0).abs() < 1e-9);
        assert!((r.width - 740.0).abs() < 1e-9);
        assert!((r.height - 990.0).abs() < 1e-9);
    }

    #[test]
    fn image_transform_places_rotated_image_at_offset_center() {
        let catalog = Catalog::builtin();
        let mut scene = Scene::new(catalog.get("grid-4").unwrap().clone(), SceneRules::default());
        let id = scene
            .add_photo(ImageSource::from_bytes("a", Vec::new()), Size::new(100, 50))
            .unwrap();
        scene
            .update_photo(id, PhotoPatch {
                offset: Some(NormPoint::new(0.25, -0.5)),
                rotation: Some(90.0),
                ..PhotoPatch::default()
            })
            .unwrap();
        let photo = scene.photo(id).unwrap();
        let s = photo.scale() as f32;
        let t = image_transform(photo, &scene.sheet(), Size::new(100, 50));

        // Slot 0 is centered at (410, 555); the offset moves that to (595, 60).
        let mut p = [Point::from_xy(50.0, 25.0), Point::from_xy(0.0, 0.0)];
        t.map_points(&mut p);
        assert!((p[0].x - 595.0).abs() < 1e-2 && (p[0].y - 60.0).abs() < 1e-2);
        // A clockwise quarter turn carries the top-left corner to the top-right.
        assert!((p[1].x - (595.0 + 25.0 * s)).abs() < 1e-2);
        assert!((p[1].y - (60.0 - 50.0 * s)).abs() < 1e-2);
    }
}
