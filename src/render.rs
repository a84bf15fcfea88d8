//! Preview and export passes over a [`Scene`].
//!
//! A [`Pass`] fixes the mapping from sheet units to output pixels. The
//! preview pass is a plain scale; the export pass fits the sheet onto the
//! paper and, for landscape sheets, turns it a quarter about the paper
//! center. Every draw call composes its element transform under that base,
//! so the same drawing code serves both passes.
//!
//! Draw order is fixed: background, guides, photos in scene order, texts in
//! scene order.

use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tiny_skia::Transform;

use crate::decode::DecodeCache;
use crate::error::{Error, Result};
use crate::geometry::Size;
use crate::raster::{Color, Surface};
use crate::scene::{PhotoElement, Scene, TextElement};
use crate::text::FontBook;
use crate::transform::{Sheet, image_transform, slot_rect, text_transform};

/// Visual constants shared by both passes.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderStyle {
    /// Sheet fill behind everything else.
    pub background: Color,
    /// Slot outline color in the preview.
    pub guide_color: Color,
    /// Guide stroke width in sheet units.
    pub guide_width: f32,
    /// Display font size to sheet units.
    pub text_scale: f64,
    /// Vertical text line height as a multiple of font size.
    pub vertical_line_factor: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            guide_color: Color([0xe5, 0xe7, 0xeb, 255]),
            guide_width: 2.0,
            text_scale: 2.0,
            vertical_line_factor: 2.4,
        }
    }
}

/// Output geometry of one render pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pass {
    /// Sheet units to output pixels.
    pub base: Transform,
    /// Output surface size.
    pub output: Size,
    /// Output pixels per sheet unit, used to rasterize text sharply.
    pub px_per_unit: f64,
    /// Whether slot outlines are drawn.
    pub guides: bool,
}

impl Pass {
    /// Interactive pass at `scale` output pixels per sheet unit.
    pub fn preview(sheet: &Sheet, scale: f64, guides: bool) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        Self {
            base: Transform::from_scale(scale as f32, scale as f32),
            output: Size::new(
                (sheet.width * scale).round().max(1.0) as u32,
                (sheet.height * scale).round().max(1.0) as u32,
            ),
            px_per_unit: scale,
            guides,
        }
    }

    /// Full-resolution pass onto portrait `paper`. Landscape sheets are
    /// rotated 90° about the paper center.
    pub fn export(sheet: &Sheet, paper: Size) -> Self {
        let turn = sheet.orientation.paper_turn();
        let (rot_w, rot_h) = if turn.swaps_axes() {
            (sheet.height, sheet.width)
        } else {
            (sheet.width, sheet.height)
        };
        let pw = f64::from(paper.width);
        let ph = f64::from(paper.height);
        let k = (pw / rot_w).min(ph / rot_h);
        let base = turn
            .about_center(
                (sheet.width * k) as f32,
                (sheet.height * k) as f32,
                pw as f32,
                ph as f32,
            )
            .pre_scale(k as f32, k as f32);
        Self {
            base,
            output: paper,
            px_per_unit: k,
            guides: false,
        }
    }
}

/// Draw the whole scene.
pub fn draw_scene(
    surface: &mut Surface,
    pass: &Pass,
    scene: &Scene,
    images: &DecodeCache,
    fonts: &FontBook,
    style: &RenderStyle,
) {
    let sheet = scene.sheet();
    surface.fill(style.background);
    if pass.guides {
        draw_guides(surface, pass, scene, style);
    }
    for photo in scene.photos() {
        draw_photo(surface, pass, &sheet, photo, images);
    }
    draw_texts(surface, pass, scene, fonts, style);
}

/// Outline every slot of the active layout.
pub fn draw_guides(surface: &mut Surface, pass: &Pass, scene: &Scene, style: &RenderStyle) {
    let sheet = scene.sheet();
    for slot in scene.layout().slots() {
        let rect = slot_rect(slot, &sheet);
        surface.stroke_rect(rect, pass.base, style.guide_width, style.guide_color);
    }
}

/// Draw one photo clipped to its slot. Photos without decoded pixels are
/// skipped.
pub fn draw_photo(
    surface: &mut Surface,
    pass: &Pass,
    sheet: &Sheet,
    photo: &PhotoElement,
    images: &DecodeCache,
) {
    let Some(image) = images.get(photo.id()) else {
        log::debug!("{}: no decoded pixels, skipped", photo.id());
        return;
    };
    let Some(clip) = surface.clip_mask(slot_rect(photo.slot(), sheet), pass.base) else {
        log::debug!("{}: slot has no drawable area, skipped", photo.id());
        return;
    };
    let size = Size::new(image.width(), image.height());
    let to_output = pass.base.pre_concat(image_transform(photo, sheet, size));
    surface.draw_image(image, to_output, Some(&clip));
}

/// Draw every text, stacked vertically on landscape sheets.
pub fn draw_texts(
    surface: &mut Surface,
    pass: &Pass,
    scene: &Scene,
    fonts: &FontBook,
    style: &RenderStyle,
) {
    let sheet = scene.sheet();
    let vertical = sheet.orientation.is_landscape();
    for text in scene.texts() {
        if vertical {
            draw_vertical_text(surface, pass, &sheet, text, fonts, style);
        } else {
            draw_horizontal_text(surface, pass, &sheet, text, fonts, style);
        }
    }
}

fn draw_horizontal_text(
    surface: &mut Surface,
    pass: &Pass,
    sheet: &Sheet,
    text: &TextElement,
    fonts: &FontBook,
    style: &RenderStyle,
) {
    let px = f64::from(text.font_size()) * style.text_scale * pass.px_per_unit;
    let run = fonts.line_mask(text.font_family(), text.content(), px as f32);
    let s = (run.scale / pass.px_per_unit) as f32;
    let to_output = pass
        .base
        .pre_concat(text_transform(text, sheet))
        .pre_concat(Transform::from_rotate(text.rotation() as f32))
        .pre_scale(s, s)
        .pre_translate(-(run.mask.width as f32) / 2.0, -(run.mask.height as f32) / 2.0);
    surface.draw_mask(&run.mask, to_output, text.color());
}

/// One character per line, centered on the position; rotation is ignored.
fn draw_vertical_text(
    surface: &mut Surface,
    pass: &Pass,
    sheet: &Sheet,
    text: &TextElement,
    fonts: &FontBook,
    style: &RenderStyle,
) {
    let px = f64::from(text.font_size()) * style.text_scale * pass.px_per_unit;
    let line_height = f64::from(text.font_size()) * style.vertical_line_factor;
    let count = text.content().chars().count();
    let top = -(count as f64) * line_height / 2.0 + line_height / 2.0;
    let anchor = pass.base.pre_concat(text_transform(text, sheet));
    for (i, ch) in text.content().chars().enumerate() {
        let run = fonts.char_mask(text.font_family(), ch, px as f32);
        let s = (run.scale / pass.px_per_unit) as f32;
        let to_output = anchor
            .pre_translate(0.0, (top + i as f64 * line_height) as f32)
            .pre_scale(s, s)
            .pre_translate(-(run.mask.width as f32) / 2.0, -(run.mask.height as f32) / 2.0);
        surface.draw_mask(&run.mask, to_output, text.color());
    }
}

/// Lossless PNG encoding of a rendered sheet.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    PngEncoder::new(&mut out)
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
        .map_err(Error::Encode)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ImageSource;
    use crate::geometry::NormPoint;
    use crate::layout::Catalog;
    use crate::orientation::SheetOrientation;
    use crate::scene::{PhotoId, PhotoPatch, SceneRules, TextPatch};
    use image::Rgba;
    use tiny_skia::Point;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn map(t: Transform, x: f64, y: f64) -> (f64, f64) {
        let mut p = [Point::from_xy(x as f32, y as f32)];
        t.map_points(&mut p);
        (f64::from(p[0].x), f64::from(p[0].y))
    }

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-2 && (a.1 - b.1).abs() < 1e-2
    }

    fn scene_with(layout: &str, sheet: Size) -> Scene {
        let catalog = Catalog::builtin();
        let rules = SceneRules {
            sheet,
            ..SceneRules::default()
        };
        Scene::new(catalog.get(layout).unwrap().clone(), rules)
    }

    /// Add a solid red photo and cache its pixels.
    fn red_photo(scene: &mut Scene, cache: &mut DecodeCache, size: Size) -> PhotoId {
        let id = scene
            .add_photo(ImageSource::from_bytes("red", Vec::new()), size)
            .unwrap();
        cache.insert(id, RgbaImage::from_pixel(size.width, size.height, Rgba(RED)));
        id
    }

    fn render(scene: &Scene, pass: &Pass, cache: &DecodeCache) -> RgbaImage {
        let mut surface = Surface::new(pass.output).unwrap();
        draw_scene(&mut surface, pass, scene, cache, &FontBook::new(), &RenderStyle::default());
        surface.to_image()
    }

    /// Every inked output pixel must map back inside `id`'s slot.
    fn assert_ink_inside_slot(scene: &Scene, pass: &Pass, image: &RgbaImage, id: PhotoId) {
        let sheet = scene.sheet();
        let slot = slot_rect(scene.photo(id).unwrap().slot(), &sheet);
        let back = pass.base.invert().unwrap();
        let mut inked = 0usize;
        for (x, y, px) in image.enumerate_pixels() {
            if px.0 == WHITE {
                continue;
            }
            inked += 1;
            let (sx, sy) = map(back, f64::from(x) + 0.5, f64::from(y) + 0.5);
            assert!(
                sx >= slot.x - 1e-3
                    && sx <= slot.right() + 1e-3
                    && sy >= slot.y - 1e-3
                    && sy <= slot.bottom() + 1e-3,
                "ink at output ({x}, {y}) is sheet ({sx:.2}, {sy:.2}), outside {slot:?}"
            );
        }
        // The photo overfills its slot, so roughly the whole slot is inked.
        let slot_px = slot.width * slot.height * pass.px_per_unit * pass.px_per_unit;
        assert!(inked as f64 > slot_px * 0.8, "only {inked} of ~{slot_px:.0} pixels inked");
    }

    fn push_to_corner(scene: &mut Scene, id: PhotoId) {
        let scale = scene.photo(id).unwrap().scale() * 40.0;
        scene
            .update_photo(id, PhotoPatch {
                offset: Some(NormPoint::new(0.9, -0.8)),
                scale: Some(scale),
                rotation: Some(37.0),
            })
            .unwrap();
    }

    // ── passes ──────────────────────────────────────────────────────────

    #[test]
    fn preview_pass_scales_sheet() {
        let sheet = Sheet::new(SheetOrientation::Portrait, Size::new(1600, 2400));
        let pass = Pass::preview(&sheet, 0.25, true);
        assert_eq!(pass.output, Size::new(400, 600));
        assert!(close(map(pass.base, 1600.0, 2400.0), (400.0, 600.0)));
    }

    #[test]
    fn portrait_export_is_plain_scale() {
        let sheet = Sheet::new(SheetOrientation::Portrait, Size::new(1600, 2400));
        let pass = Pass::export(&sheet, Size::new(1200, 1800));
        assert_eq!(pass.output, Size::new(1200, 1800));
        assert!(close(map(pass.base, 0.0, 0.0), (0.0, 0.0)));
        assert!(close(map(pass.base, 1600.0, 2400.0), (1200.0, 1800.0)));
        assert!(!pass.guides);
    }

    #[test]
    fn landscape_export_turns_sheet_onto_portrait_paper() {
        let sheet = Sheet::new(SheetOrientation::Landscape, Size::new(1600, 2400));
        assert_eq!(sheet.size(), Size::new(2400, 1600));
        let pass = Pass::export(&sheet, Size::new(1600, 2400));
        assert_eq!(pass.output, Size::new(1600, 2400));
        // Sheet top-left lands at paper top-right; top-right at bottom-right.
        assert!(close(map(pass.base, 0.0, 0.0), (1600.0, 0.0)));
        assert!(close(map(pass.base, 2400.0, 0.0), (1600.0, 2400.0)));
        assert!(close(map(pass.base, 2400.0, 1600.0), (0.0, 2400.0)));
        assert!(close(map(pass.base, 1200.0, 800.0), (800.0, 1200.0)));
    }

    // ── clipping ────────────────────────────────────────────────────────

    #[test]
    fn photos_are_clipped_to_their_slot() {
        let mut scene = scene_with("grid-4", Size::new(40, 60));
        let mut cache = DecodeCache::default();
        let id = red_photo(&mut scene, &mut cache, Size::new(4, 4));
        scene
            .update_photo(id, PhotoPatch {
                scale: Some(100.0),
                ..PhotoPatch::default()
            })
            .unwrap();

        let pass = Pass::preview(&scene.sheet(), 1.0, false);
        let out = render(&scene, &pass, &cache);

        // Slot 0 spans x 1..19.5, y 1.5..26.25 on a 40×60 sheet.
        assert_eq!(out.get_pixel(10, 10).0, RED);
        assert_eq!(out.get_pixel(30, 10).0, WHITE);
        assert_eq!(out.get_pixel(10, 40).0, WHITE);
        assert_eq!(out.get_pixel(0, 0).0, WHITE);
    }

    #[test]
    fn rotated_offset_photo_stays_in_slot() {
        let mut scene = scene_with("grid-4", Size::new(160, 240));
        let mut cache = DecodeCache::default();
        let id = red_photo(&mut scene, &mut cache, Size::new(30, 20));
        push_to_corner(&mut scene, id);

        let pass = Pass::preview(&scene.sheet(), 1.0, false);
        let out = render(&scene, &pass, &cache);
        assert_ink_inside_slot(&scene, &pass, &out, id);
    }

    #[test]
    fn rotated_offset_photo_stays_in_slot_on_turned_paper() {
        let mut scene = scene_with("horizontal-2", Size::new(120, 180));
        let mut cache = DecodeCache::default();
        let id = red_photo(&mut scene, &mut cache, Size::new(30, 20));
        push_to_corner(&mut scene, id);

        let pass = Pass::export(&scene.sheet(), Size::new(120, 180));
        let out = render(&scene, &pass, &cache);
        assert_eq!(out.dimensions(), (120, 180));
        assert_ink_inside_slot(&scene, &pass, &out, id);
    }

    // ── drawing ─────────────────────────────────────────────────────────

    #[test]
    fn texts_draw_over_photos() {
        let mut scene = scene_with("single", Size::new(200, 300));
        let mut cache = DecodeCache::default();
        let photo = scene
            .add_photo(ImageSource::from_bytes("blue", Vec::new()), Size::new(10, 10))
            .unwrap();
        cache.insert(photo, RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255])));
        let text = scene.add_text(None);
        scene
            .update_text(text, TextPatch {
                content: Some("\u{2588}".into()),
                ..TextPatch::default()
            })
            .unwrap();

        let pass = Pass::preview(&scene.sheet(), 1.0, false);
        let out = render(&scene, &pass, &cache);
        assert_eq!(out.get_pixel(100, 150).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(20, 20).0, [0, 0, 255, 255]);
    }

    #[test]
    fn guides_outline_slots_in_preview_only() {
        let scene = scene_with("grid-4", Size::new(160, 240));
        let cache = DecodeCache::default();
        let preview = render(&scene, &Pass::preview(&scene.sheet(), 1.0, true), &cache);
        // Slot 0's left edge sits at x = 4.
        assert_ne!(preview.get_pixel(4, 50).0, WHITE);
        assert_eq!(preview.get_pixel(40, 50).0, WHITE);

        let export = render(&scene, &Pass::export(&scene.sheet(), Size::new(160, 240)), &cache);
        assert!(export.pixels().all(|p| p.0 == WHITE));
    }

    #[test]
    fn missing_image_is_skipped() {
        let mut scene = scene_with("single", Size::new(40, 60));
        scene
            .add_photo(ImageSource::from_bytes("gone", Vec::new()), Size::new(4, 4))
            .unwrap();
        let pass = Pass::preview(&scene.sheet(), 1.0, false);
        let out = render(&scene, &pass, &DecodeCache::default());
        assert!(out.pixels().all(|p| p.0 == WHITE));
    }

    #[test]
    fn png_encoding_is_lossless() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(2, 1, Rgba([1, 2, 3, 4]));
        let png = encode_png(&img).unwrap();
        let back = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(back, img);
    }
}
