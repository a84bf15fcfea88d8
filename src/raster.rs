//! The RGBA drawing surface, backed by a tiny-skia [`Pixmap`].
//!
//! Everything is drawn through a [`Transform`] from the element's own space
//! to output pixels. Clipping to a slot is a [`Mask`] built from the slot
//! rectangle under the pass transform, so a rotated output (the landscape
//! export) clips exactly like the preview does.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};

use crate::error::{Error, Result};
use crate::geometry::{PixelRect, Size};

/// Straight-alpha RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 4]);

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    /// Opaque white.
    pub const WHITE: Self = Self([255, 255, 255, 255]);

    /// Parse any CSS color (`#rrggbb`, `rgb(…)`, named colors, …).
    pub fn parse(s: &str) -> Result<Self> {
        csscolorparser::parse(s.trim())
            .map(|c| Self(c.to_rgba8()))
            .map_err(|_| Error::InvalidColor(s.to_owned()))
    }

    /// `#rrggbb`, or `#rrggbbaa` when not opaque.
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    fn to_skia(self) -> tiny_skia::Color {
        let [r, g, b, a] = self.0;
        tiny_skia::Color::from_rgba8(r, g, b, a)
    }

    fn paint(self) -> Paint<'static> {
        let [r, g, b, a] = self.0;
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        paint
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

/// Single-channel coverage bitmap (glyph runs).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoverageMask {
    /// Width in mask pixels.
    pub width: u32,
    /// Height in mask pixels.
    pub height: u32,
    /// Row-major coverage, `0` empty to `255` full.
    pub coverage: Vec<u8>,
}

impl CoverageMask {
    /// An all-empty mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0; width as usize * height as usize],
        }
    }

    /// Whether the mask has no area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Max-combine `other` into `self` with its top-left at `(x, y)`.
    pub fn blit_max(&mut self, other: &Self, x: i64, y: i64) {
        for oy in 0..other.height {
            let ty = y + i64::from(oy);
            if ty < 0 || ty >= i64::from(self.height) {
                continue;
            }
            for ox in 0..other.width {
                let tx = x + i64::from(ox);
                if tx < 0 || tx >= i64::from(self.width) {
                    continue;
                }
                let src = other.coverage[oy as usize * other.width as usize + ox as usize];
                let dst = &mut self.coverage[ty as usize * self.width as usize + tx as usize];
                *dst = (*dst).max(src);
            }
        }
    }

    /// Tint the mask with `color`, coverage scaling its alpha.
    fn to_pixmap(&self, color: Color) -> Option<Pixmap> {
        let mut pixmap = Pixmap::new(self.width, self.height)?;
        let [r, g, b, a] = color.0;
        for (dst, &c) in pixmap.pixels_mut().iter_mut().zip(&self.coverage) {
            let alpha = (u16::from(a) * u16::from(c) / 255) as u8;
            *dst = ColorU8::from_rgba(r, g, b, alpha).premultiply();
        }
        Some(pixmap)
    }
}

/// Copy decoded pixels into a premultiplied pixmap. `None` for an empty image.
pub fn pixmap_from_image(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn allocate(size: Size) -> Result<Pixmap> {
    Pixmap::new(size.width, size.height).ok_or(Error::Surface(size))
}

/// The drawing surface shared by the preview and export passes.
#[derive(Clone, Debug)]
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    /// A transparent surface. Fails for an empty or oversized `size`.
    pub fn new(size: Size) -> Result<Self> {
        Ok(Self {
            pixmap: allocate(size)?,
        })
    }

    /// Current size in output pixels.
    pub fn size(&self) -> Size {
        Size::new(self.pixmap.width(), self.pixmap.height())
    }

    /// Straight-alpha copy of the pixels.
    pub fn to_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.pixmap.width(), self.pixmap.height());
        for (dst, src) in image.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        image
    }

    /// Reallocate at `size`; contents become transparent.
    pub fn resize(&mut self, size: Size) -> Result<()> {
        if self.size() != size {
            self.pixmap = allocate(size)?;
        }
        Ok(())
    }

    /// Temporarily resize for another pass. The guard restores the current
    /// size and pixels when dropped, on success and error paths alike.
    pub fn resized_for(&mut self, size: Size) -> Result<ResizeGuard<'_>> {
        let saved = core::mem::replace(&mut self.pixmap, allocate(size)?);
        Ok(ResizeGuard {
            surface: self,
            saved: Some(saved),
        })
    }

    /// Replace every pixel with `color`.
    pub fn fill(&mut self, color: Color) {
        self.pixmap.fill(color.to_skia());
    }

    /// Mask keeping the output pixels whose centers fall inside the
    /// sheet-unit `rect`.
    pub fn clip_mask(&self, rect: PixelRect, sheet_to_output: Transform) -> Option<Mask> {
        let path = PathBuilder::from_rect(rect.to_rect()?);
        let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
        mask.fill_path(&path, FillRule::Winding, false, sheet_to_output);
        Some(mask)
    }

    /// Stroke the outline of a sheet-unit rectangle, `line_width` in sheet
    /// units.
    pub fn stroke_rect(
        &mut self,
        rect: PixelRect,
        sheet_to_output: Transform,
        line_width: f32,
        color: Color,
    ) {
        let Some(rect) = rect.to_rect() else {
            return;
        };
        let stroke = Stroke {
            width: line_width,
            ..Stroke::default()
        };
        let path = PathBuilder::from_rect(rect);
        self.pixmap
            .stroke_path(&path, &color.paint(), &stroke, sheet_to_output, None);
    }

    /// Draw `image` bilinearly through `image_to_output`, keeping only the
    /// pixels `clip` lets through.
    pub fn draw_image(&mut self, image: &Pixmap, image_to_output: Transform, clip: Option<&Mask>) {
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, image.as_ref(), &paint, image_to_output, clip);
    }

    /// Paint `color` through a coverage mask placed by `mask_to_output`.
    pub fn draw_mask(&mut self, mask: &CoverageMask, mask_to_output: Transform, color: Color) {
        if mask.is_empty() {
            return;
        }
        if let Some(tinted) = mask.to_pixmap(color) {
            self.draw_image(&tinted, mask_to_output, None);
        }
    }
}

/// Restores a [`Surface`] to its pre-export state on drop.
pub struct ResizeGuard<'a> {
    surface: &'a mut Surface,
    saved: Option<Pixmap>,
}

impl core::ops::Deref for ResizeGuard<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        &*self.surface
    }
}

impl core::ops::DerefMut for ResizeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        &mut *self.surface
    }
}

impl Drop for ResizeGuard<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.surface.pixmap = saved;
        }
    }
}
