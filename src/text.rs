//! Font faces, glyph rasterization and the font readiness gate.
//!
//! Faces registered with [`FontBook::add_face`] are rasterized with fontdue.
//! Any family without a registered face falls back to the built-in 8×8
//! bitmap font, so text always renders even when no font ever loads.

use std::collections::HashMap;
use std::time::Duration;

use font8x8::{BASIC_FONTS, BLOCK_FONTS, LATIN_FONTS, UnicodeFonts};
use fontdue::{Font, FontSettings};

use crate::error::{Error, Result};
use crate::interaction::TextMeasure;
use crate::raster::CoverageMask;

/// Cell size of the fallback bitmap font.
const CELL: u32 = 8;

/// A rasterized run of glyphs.
#[derive(Clone, Debug)]
pub struct GlyphRun {
    /// Coverage of the whole run, baseline-aligned.
    pub mask: CoverageMask,
    /// Output pixels per mask pixel.
    pub scale: f64,
}

/// Loaded font faces keyed by family.
#[derive(Default)]
pub struct FontBook {
    faces: HashMap<String, Font>,
}

impl core::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.faces.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FontBook {
    /// An empty book; every family uses the bitmap font.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a face. Family lookup is case-insensitive.
    pub fn add_face(&mut self, family: &str, bytes: &[u8]) -> Result<()> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|reason| Error::Font {
            family: family.to_owned(),
            reason,
        })?;
        self.faces.insert(family.to_lowercase(), font);
        Ok(())
    }

    /// Whether `family` has a registered outline face.
    pub fn has_face(&self, family: &str) -> bool {
        self.faces.contains_key(&family.to_lowercase())
    }

    fn face(&self, family: &str) -> Option<&Font> {
        self.faces.get(&family.to_lowercase())
    }

    /// Horizontal advance of `text` at `px` pixels.
    pub fn line_width(&self, family: &str, text: &str, px: f32) -> f64 {
        match self.face(family) {
            Some(font) => text
                .chars()
                .map(|ch| f64::from(font.metrics(ch, px).advance_width))
                .sum(),
            None => text.chars().count() as f64 * f64::from(px),
        }
    }

    /// Rasterize one line of text at `px` pixels.
    pub fn line_mask(&self, family: &str, text: &str, px: f32) -> GlyphRun {
        match self.face(family) {
            Some(font) => outline_line(font, text, px),
            None => bitmap_line(text, px),
        }
    }

    /// Rasterize a single character, used for vertical text.
    pub fn char_mask(&self, family: &str, ch: char, px: f32) -> GlyphRun {
        let mut buf = [0u8; 4];
        self.line_mask(family, ch.encode_utf8(&mut buf), px)
    }
}

impl TextMeasure for FontBook {
    fn line_width(&self, family: &str, text: &str, px: f32) -> f64 {
        FontBook::line_width(self, family, text, px)
    }
}

fn outline_line(font: &Font, text: &str, px: f32) -> GlyphRun {
    let (ascent, descent) = font
        .horizontal_line_metrics(px)
        .map_or((px * 0.8, -px * 0.2), |m| (m.ascent, m.descent));
    let width: f32 = text.chars().map(|ch| font.metrics(ch, px).advance_width).sum();
    let mut mask = CoverageMask::new(
        width.ceil().max(1.0) as u32,
        (ascent - descent).ceil().max(1.0) as u32,
    );

    let mut pen = 0.0f32;
    for ch in text.chars() {
        let (metrics, coverage) = font.rasterize(ch, px);
        let glyph = CoverageMask {
            width: metrics.width as u32,
            height: metrics.height as u32,
            coverage,
        };
        let x = (pen + metrics.xmin as f32).round() as i64;
        let y = (ascent - metrics.ymin as f32 - metrics.height as f32).round() as i64;
        mask.blit_max(&glyph, x, y);
        pen += metrics.advance_width;
    }
    GlyphRun { mask, scale: 1.0 }
}

fn bitmap_line(text: &str, px: f32) -> GlyphRun {
    let count = text.chars().count() as u32;
    let mut mask = CoverageMask::new((count * CELL).max(1), CELL);
    for (i, ch) in text.chars().enumerate() {
        let Some(rows) = BASIC_FONTS
            .get(ch)
            .or_else(|| LATIN_FONTS.get(ch))
            .or_else(|| BLOCK_FONTS.get(ch))
        else {
            continue;
        };
        for (y, row) in rows.iter().enumerate() {
            for x in 0..CELL {
                if row & (1 << x) != 0 {
                    let idx = y * mask.width as usize + i * CELL as usize + x as usize;
                    mask.coverage[idx] = 255;
                }
            }
        }
    }
    GlyphRun {
        mask,
        scale: f64::from(px) / f64::from(CELL),
    }
}

/// Encoded face as delivered by a font loader.
#[derive(Clone, Debug)]
pub struct FontFace {
    /// Family name texts refer to.
    pub family: String,
    /// TrueType or OpenType data.
    pub bytes: Vec<u8>,
}

/// Outcome of the one-time font wait.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FontStatus {
    /// Not resolved yet; previews wait.
    Pending,
    /// Every face loaded.
    Ready,
    /// Loading failed or timed out; missing families use the bitmap font.
    Degraded,
}

/// One-time readiness gate for the font set.
#[derive(Debug)]
pub struct FontGate {
    status: FontStatus,
}

impl Default for FontGate {
    fn default() -> Self {
        Self {
            status: FontStatus::Pending,
        }
    }
}

impl FontGate {
    /// Current status.
    pub fn status(&self) -> FontStatus {
        self.status
    }

    /// Whether the wait is over, either way.
    pub fn is_resolved(&self) -> bool {
        self.status != FontStatus::Pending
    }

    /// Wait for `faces` at most `timeout` and register what arrives. The
    /// result is cached; later calls return it without polling `faces`.
    pub async fn await_ready<F>(
        &mut self,
        faces: F,
        timeout: Duration,
        book: &mut FontBook,
    ) -> FontStatus
    where
        F: Future<Output = Result<Vec<FontFace>>>,
    {
        if self.is_resolved() {
            return self.status;
        }
        self.status = match tokio::time::timeout(timeout, faces).await {
            Ok(Ok(faces)) => {
                let mut status = FontStatus::Ready;
                for face in faces {
                    if let Err(e) = book.add_face(&face.family, &face.bytes) {
                        log::warn!("{e}; using fallback glyphs");
                        status = FontStatus::Degraded;
                    }
                }
                status
            }
            Ok(Err(e)) => {
                log::warn!("font loading failed: {e}; using fallback glyphs");
                FontStatus::Degraded
            }
            Err(_) => {
                log::warn!("fonts not ready after {timeout:?}; using fallback glyphs");
                FontStatus::Degraded
            }
        };
        log::debug!("font gate resolved: {:?}", self.status);
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_width_is_char_count_times_size() {
        let book = FontBook::new();
        assert_eq!(book.line_width("Arial", "abcd", 10.0), 40.0);
        assert!(!book.has_face("Arial"));
    }

    #[test]
    fn fallback_mask_has_ink() {
        let book = FontBook::new();
        let run = book.line_mask("Arial", "Hi", 16.0);
        assert_eq!(run.mask.width, 16);
        assert_eq!(run.mask.height, 8);
        assert_eq!(run.scale, 2.0);
        assert!(run.mask.coverage.iter().any(|&c| c == 255));
    }

    #[test]
    fn fallback_space_is_blank() {
        let run = FontBook::new().char_mask("Arial", ' ', 8.0);
        assert!(run.mask.coverage.iter().all(|&c| c == 0));
    }

    #[test]
    fn invalid_face_is_font_error() {
        let mut book = FontBook::new();
        let err = book.add_face("Broken", b"not a font").unwrap_err();
        assert!(matches!(err, Error::Font { ref family, .. } if family == "Broken"));
        assert!(!book.has_face("broken"));
    }

    #[tokio::test]
    async fn gate_ready_with_no_faces() {
        let mut gate = FontGate::default();
        let mut book = FontBook::new();
        let status = gate
            .await_ready(async { Ok::<_, Error>(Vec::new()) }, Duration::from_millis(50), &mut book)
            .await;
        assert_eq!(status, FontStatus::Ready);
        assert!(gate.is_resolved());
    }

    #[tokio::test]
    async fn gate_degrades_on_bad_face_and_caches() {
        let mut gate = FontGate::default();
        let mut book = FontBook::new();
        let faces = vec![FontFace {
            family: "Broken".into(),
            bytes: vec![0; 8],
        }];
        let status = gate
            .await_ready(async move { Ok::<_, Error>(faces) }, Duration::from_millis(50), &mut book)
            .await;
        assert_eq!(status, FontStatus::Degraded);

        // Cached: the second future is never polled.
        let again = gate
            .await_ready(
                async { Err::<Vec<FontFace>, _>(Error::Print("unreachable".into())) },
                Duration::from_millis(50),
                &mut book,
            )
            .await;
        assert_eq!(again, FontStatus::Degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_times_out_instead_of_blocking() {
        let mut gate = FontGate::default();
        let mut book = FontBook::new();
        let never = std::future::pending::<Result<Vec<FontFace>>>();
        let status = gate.await_ready(never, Duration::from_secs(3), &mut book).await;
        assert_eq!(status, FontStatus::Degraded);
    }
}
