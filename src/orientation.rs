//! Sheet orientation and quarter-turn rotations for paper output.

use serde::{Deserialize, Serialize};

use tiny_skia::Transform;

use crate::geometry::Size;

/// Working orientation of a layout's sheet.
///
/// The physical print medium is always portrait. A landscape sheet is
/// composed on swapped axes and turned a quarter on export.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetOrientation {
    /// Taller than wide; matches the paper.
    #[default]
    Portrait,
    /// Wider than tall; turned a quarter on export.
    Landscape,
}

impl SheetOrientation {
    /// Whether the sheet is composed on swapped axes.
    pub fn is_landscape(self) -> bool {
        self == Self::Landscape
    }

    /// Working sheet size for a portrait base size.
    pub fn sheet_size(self, portrait: Size) -> Size {
        self.paper_turn().transform_dimensions(portrait.width, portrait.height)
    }

    /// Rotation that puts a sheet of this orientation upright on portrait paper.
    pub fn paper_turn(self) -> QuarterTurn {
        match self {
            Self::Portrait => QuarterTurn::IDENTITY,
            Self::Landscape => QuarterTurn::ROTATE_90,
        }
    }
}

/// Rotation by a multiple of 90° clockwise.
///
/// ```text
///     0°         90°
///     ┌──────┐   ┌───┐
///     │ F    │   │ F │
///     └──────┘   │   │
///                └───┘
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct QuarterTurn {
    /// Quarter turns clockwise (0-3).
    pub turns: u8,
}

impl QuarterTurn {
    /// No rotation.
    pub const IDENTITY: Self = Self { turns: 0 };
    /// A quarter turn clockwise.
    pub const ROTATE_90: Self = Self { turns: 1 };
    /// A half turn.
    pub const ROTATE_180: Self = Self { turns: 2 };
    /// Three quarter turns clockwise.
    pub const ROTATE_270: Self = Self { turns: 3 };

    /// Whether this is a whole number of full turns.
    pub fn is_identity(self) -> bool {
        self.turns & 3 == 0
    }

    /// Whether this rotation swaps width and height.
    pub fn swaps_axes(self) -> bool {
        self.turns % 2 == 1
    }

    /// Apply `self` first, then `other`.
    pub fn compose(self, other: Self) -> Self {
        Self {
            turns: (self.turns + other.turns) & 3,
        }
    }

    /// `self.compose(self.inverse()) == IDENTITY`.
    pub fn inverse(self) -> Self {
        Self {
            turns: (4 - (self.turns & 3)) & 3,
        }
    }

    /// Clockwise rotation in degrees, `0..360`.
    pub fn degrees(self) -> f32 {
        f32::from(self.turns & 3) * 90.0
    }

    /// Dimensions after rotation.
    pub fn transform_dimensions(self, w: u32, h: u32) -> Size {
        if self.swaps_axes() {
            Size::new(h, w)
        } else {
            Size::new(w, h)
        }
    }

    /// Transform that rotates content of `content_w × content_h` about its
    /// center and re-centers it on a `target_w × target_h` surface.
    ///
    /// For [`ROTATE_90`](Self::ROTATE_90) with a landscape content box
    /// sized to the transposed target, the content exactly covers the target.
    pub fn about_center(
        self,
        content_w: f32,
        content_h: f32,
        target_w: f32,
        target_h: f32,
    ) -> Transform {
        Transform::from_translate(target_w / 2.0, target_h / 2.0)
            .pre_concat(Transform::from_rotate(self.degrees()))
            .pre_translate(-content_w / 2.0, -content_h / 2.0)
    }
}
