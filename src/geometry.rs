//! Points and rectangles in the crate's three coordinate spaces.
//!
//! - **normalized**: fractions of the sheet, `0.0..=1.0` on each axis
//! - **sheet units**: working-resolution pixels of the active sheet
//! - **output pixels**: pixels of whatever surface a pass draws into
//!
//! Points move between sheet units and output pixels through
//! [`tiny_skia::Transform`] values built in [`transform`](crate::transform)
//! and [`render`](crate::render). Scene state stays in `f64`; transforms are
//! `f32` because that is what the rasterizer consumes.

use serde::{Deserialize, Serialize};
use tiny_skia::Rect;

/// Width × height dimensions in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either axis is zero.
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height.
    pub fn aspect(self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// A point in normalized or slot-relative coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormPoint {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component, growing downwards.
    pub y: f64,
}

impl NormPoint {
    /// Sheet center.
    pub const CENTER: Self = Self { x: 0.5, y: 0.5 };
    /// Origin. For slot-relative offsets this is the slot center.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`.
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Whether neither component is NaN or infinite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Clamp each axis independently into `min..=max`.
    pub fn clamp_each(self, min: f64, max: f64) -> Self {
        Self::new(self.x.clamp(min, max), self.y.clamp(min, max))
    }
}

/// Axis-aligned rectangle with floating-point coordinates.
///
/// Used for sheet-unit and output-pixel rectangles alike; the caller knows
/// which space it is in.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PixelRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl PixelRect {
    /// Create a rectangle from its top-left corner and extent.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Center point.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment on all four edges.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// The same rectangle in tiny-skia's `f32` form, `None` when an extent
    /// is negative or a coordinate is not finite.
    pub fn to_rect(&self) -> Option<Rect> {
        Rect::from_xywh(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_edge_inclusive() {
        let r = PixelRect::new(1.0, 1.0, 2.0, 2.0);
        assert!(r.contains(1.0, 3.0));
        assert!(!r.contains(0.999, 2.0));
    }

    #[test]
    fn clamp_each_axis_independently() {
        let p = NormPoint::new(-5.0, 5.0).clamp_each(0.0, 1.0);
        assert_eq!(p, NormPoint::new(0.0, 1.0));
    }

    #[test]
    fn to_rect_rejects_inverted_and_nan() {
        assert!(PixelRect::new(0.0, 0.0, -1.0, 4.0).to_rect().is_none());
        assert!(PixelRect::new(f64::NAN, 0.0, 1.0, 4.0).to_rect().is_none());
        let r = PixelRect::new(2.0, 3.0, 4.0, 5.0).to_rect().unwrap();
        assert_eq!((r.left(), r.top(), r.right(), r.bottom()), (2.0, 3.0, 6.0, 8.0));
    }

    #[test]
    fn aspect_and_empty() {
        assert!((Size::new(2400, 1600).aspect() - 1.5).abs() < 1e-12);
        assert!(Size::new(0, 5).is_empty());
        assert!(!Size::new(1, 1).is_empty());
    }
}
