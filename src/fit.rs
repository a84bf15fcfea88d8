//! Fit-to-frame scale computation.
//!
//! Computes the multiplier that maps an image's native pixels onto a slot
//! frame in sheet units, and the bounded size used to downsample large
//! sources before they are placed.
//!
//! # Example
//!
//! ```
//! use printsheet::{FitPolicy, Size, fit_scale};
//!
//! // 3000×2000 landscape photo into a 1536×2304 portrait frame.
//! let cover = fit_scale(Size::new(3000, 2000), 1536.0, 2304.0, FitPolicy::Cover).unwrap();
//! assert!((cover - 1.152).abs() < 1e-9);
//!
//! let contain = fit_scale(Size::new(3000, 2000), 1536.0, 2304.0, FitPolicy::Contain).unwrap();
//! assert!((contain - 0.512).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use crate::geometry::Size;

/// How an image is fitted into its slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Scale to fill the frame, overflow is clipped by the slot.
    /// Preserves aspect ratio.
    Cover,
    /// Scale to fit entirely inside the frame, leaving margin on one axis.
    /// Preserves aspect ratio.
    Contain,
}

impl FitPolicy {
    /// Policy used when a layout does not name one: a lone slot is filled,
    /// slots that share a sheet show their whole image.
    pub fn for_slot_count(slots: usize) -> Self {
        if slots == 1 { Self::Cover } else { Self::Contain }
    }
}

/// Fit computation error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FitError {
    /// Image has zero width or height.
    ZeroSourceDimension,
    /// Frame width or height is zero, negative or not finite.
    DegenerateFrame,
}

impl core::fmt::Display for FitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroSourceDimension => f.write_str("image has a zero dimension"),
            Self::DegenerateFrame => f.write_str("frame has no usable area"),
        }
    }
}

impl std::error::Error for FitError {}

/// Scale that fits an image of `image` native pixels into a
/// `frame_w × frame_h` frame under `policy`.
///
/// Cover guarantees `scale·w ≥ frame_w` and `scale·h ≥ frame_h`; contain
/// guarantees both `≤`. Either way one axis matches the frame exactly.
pub fn fit_scale(
    image: Size,
    frame_w: f64,
    frame_h: f64,
    policy: FitPolicy,
) -> Result<f64, FitError> {
    if image.is_empty() {
        return Err(FitError::ZeroSourceDimension);
    }
    if !(frame_w.is_finite() && frame_h.is_finite() && frame_w > 0.0 && frame_h > 0.0) {
        return Err(FitError::DegenerateFrame);
    }

    let iw = image.width as f64;
    let ih = image.height as f64;
    let scale = match policy {
        FitPolicy::Cover => (frame_w / iw).max(frame_h / ih),
        FitPolicy::Contain => {
            // Compare in pixel space: a normalized slot aspect on a
            // non-square sheet would pick the wrong constraining axis.
            if image.aspect() > frame_w / frame_h {
                frame_w / iw
            } else {
                frame_h / ih
            }
        }
    };
    Ok(scale)
}

/// Dimensions of `source` after shrinking to fit within `max`, preserving
/// aspect ratio. Never upscales; sources already within bounds are returned
/// unchanged.
pub fn bounded_size(source: Size, max: Size) -> Size {
    if source.is_empty() || max.is_empty() {
        return source;
    }
    if source.width <= max.width && source.height <= max.height {
        return source;
    }

    let ratio_w = max.width as f64 / source.width as f64;
    let ratio_h = max.height as f64 / source.height as f64;
    if ratio_w <= ratio_h {
        // Width constrains.
        let h = (source.height as f64 * ratio_w).round().max(1.0) as u32;
        Size::new(max.width, h.min(max.height))
    } else {
        let w = (source.width as f64 * ratio_h).round().max(1.0) as u32;
        Size::new(w.min(max.width), max.height)
    }
}
