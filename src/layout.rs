//! Slot layouts and the layout catalog.
//!
//! A [`Layout`] is an immutable, validated sequence of [`Slot`] rectangles in
//! normalized sheet coordinates. The [`Catalog`] holds the layouts a user can
//! choose from, either the built-in set or one loaded from JSON:
//!
//! ```
//! use printsheet::Catalog;
//!
//! let catalog = Catalog::from_json(r#"[
//!     {"id": "duo", "name": "Duo", "slots": [
//!         {"x": 0.0, "y": 0.0, "width": 1.0, "height": 0.5},
//!         {"x": 0.0, "y": 0.5, "width": 1.0, "height": 0.5}
//!     ]}
//! ]"#).unwrap();
//! assert_eq!(catalog.get("duo").unwrap().slot_count(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fit::FitPolicy;
use crate::geometry::NormPoint;
use crate::orientation::SheetOrientation;

/// Slot counts a layout may have.
pub const SLOT_COUNTS: [usize; 4] = [1, 2, 4, 9];

/// Slot count at which uploads are downsampled before placement.
pub const DENSE_SLOT_COUNT: usize = 9;

const EDGE_TOLERANCE: f64 = 1e-9;

/// Fixed rectangular region of the sheet, normalized to `0.0..=1.0`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Left edge as a fraction of sheet width.
    pub x: f64,
    /// Top edge as a fraction of sheet height.
    pub y: f64,
    /// Fraction of sheet width.
    pub width: f64,
    /// Fraction of sheet height.
    pub height: f64,
}

impl Slot {
    /// Create a slot. Validation happens when it joins a [`Layout`].
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Inclusive containment of a normalized sheet point.
    pub fn contains(&self, p: NormPoint) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Offset of `p` from the slot center as a fraction of slot extent.
    pub fn relative(&self, p: NormPoint) -> NormPoint {
        NormPoint::new(
            (p.x - self.x - self.width / 2.0) / self.width,
            (p.y - self.y - self.height / 2.0) / self.height,
        )
    }

    fn validate(&self) -> core::result::Result<(), &'static str> {
        let values = [self.x, self.y, self.width, self.height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err("slot coordinates must be finite");
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err("slot extent must be positive");
        }
        if self.x < -EDGE_TOLERANCE
            || self.y < -EDGE_TOLERANCE
            || self.x + self.width > 1.0 + EDGE_TOLERANCE
            || self.y + self.height > 1.0 + EDGE_TOLERANCE
        {
            return Err("slot lies outside the unit square");
        }
        Ok(())
    }
}

/// Wire form of a layout, validated into [`Layout`].
#[derive(Clone, Debug, Deserialize)]
struct LayoutRecord {
    id: String,
    name: String,
    slots: Vec<Slot>,
    #[serde(default)]
    orientation: SheetOrientation,
    #[serde(default)]
    fit: Option<FitPolicy>,
}

impl TryFrom<LayoutRecord> for Layout {
    type Error = Error;

    fn try_from(record: LayoutRecord) -> Result<Self> {
        let layout = Layout::new(record.id, record.name, record.slots)?
            .with_orientation(record.orientation);
        Ok(match record.fit {
            Some(fit) => layout.with_fit(fit),
            None => layout,
        })
    }
}

/// Immutable slot layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayoutRecord")]
pub struct Layout {
    id: String,
    name: String,
    slots: Vec<Slot>,
    orientation: SheetOrientation,
    #[serde(skip_serializing_if = "Option::is_none")]
    fit: Option<FitPolicy>,
}

impl Layout {
    /// Validate and build a portrait layout with the default fit policy.
    pub fn new(id: impl Into<String>, name: impl Into<String>, slots: Vec<Slot>) -> Result<Self> {
        let id = id.into();
        let invalid = |reason| Error::InvalidLayout {
            id: id.clone(),
            reason,
        };
        if id.is_empty() {
            return Err(invalid("layout id is empty"));
        }
        if !SLOT_COUNTS.contains(&slots.len()) {
            return Err(invalid("slot count must be 1, 2, 4 or 9"));
        }
        for slot in &slots {
            slot.validate().map_err(invalid)?;
        }
        Ok(Self {
            id,
            name: name.into(),
            slots,
            orientation: SheetOrientation::Portrait,
            fit: None,
        })
    }

    /// The same layout composed on a sheet of `orientation`.
    pub fn with_orientation(mut self, orientation: SheetOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// The same layout with an explicit fit policy.
    pub fn with_fit(mut self, fit: FitPolicy) -> Self {
        self.fit = Some(fit);
        self
    }

    /// Stable identifier used for selection.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slots in reading order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slot at `index` in reading order.
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Number of slots: 1, 2, 4 or 9.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Orientation of the working sheet.
    pub fn orientation(&self) -> SheetOrientation {
        self.orientation
    }

    /// Explicit fit policy, or the slot-count default.
    pub fn fit_policy(&self) -> FitPolicy {
        self.fit
            .unwrap_or_else(|| FitPolicy::for_slot_count(self.slots.len()))
    }

    /// Whether uploads into this layout are downsampled first.
    pub fn downsamples_uploads(&self) -> bool {
        self.slots.len() == DENSE_SLOT_COUNT
    }
}

/// Ordered set of layouts offered to the user.
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    layouts: Vec<Layout>,
}

impl Catalog {
    /// The five stock layouts for 4×6 print paper.
    pub fn builtin() -> Self {
        let grid = |cols: usize, rows: usize, x0: f64, y0: f64, w: f64, h: f64, dx: f64, dy: f64| {
            let mut slots = Vec::with_capacity(cols * rows);
            for row in 0..rows {
                for col in 0..cols {
                    slots.push(Slot::new(
                        x0 + dx * col as f64,
                        y0 + dy * row as f64,
                        w,
                        h,
                    ));
                }
            }
            slots
        };

        let layouts = vec![
            Layout {
                id: "single".into(),
                name: "1x1 (1 photo)".into(),
                slots: vec![Slot::new(0.02, 0.02, 0.96, 0.96)],
                orientation: SheetOrientation::Portrait,
                fit: None,
            },
            Layout {
                id: "vertical-2".into(),
                name: "1x2 vertical (2 photos)".into(),
                slots: grid(1, 2, 0.05, 0.025, 0.9, 0.41, 0.0, 0.44),
                orientation: SheetOrientation::Portrait,
                fit: None,
            },
            Layout {
                id: "horizontal-2".into(),
                name: "1x2 horizontal (2 photos)".into(),
                slots: grid(2, 1, 0.025, 0.02, 0.4375, 0.96, 0.4625, 0.0),
                orientation: SheetOrientation::Landscape,
                fit: None,
            },
            Layout {
                id: "grid-4".into(),
                name: "2x2 (4 photos)".into(),
                slots: grid(2, 2, 0.025, 0.025, 0.4625, 0.4125, 0.4875, 0.4375),
                orientation: SheetOrientation::Portrait,
                fit: None,
            },
            Layout {
                id: "grid-9".into(),
                name: "3x3 (9 photos)".into(),
                slots: grid(3, 3, 0.025, 0.025, 0.3, 0.27, 0.325, 0.295),
                orientation: SheetOrientation::Portrait,
                fit: None,
            },
        ];
        Self { layouts }
    }

    /// Parse a JSON array of layout records. Every record is validated.
    pub fn from_json(json: &str) -> Result<Self> {
        let layouts: Vec<Layout> = serde_json::from_str(json)?;
        Ok(Self { layouts })
    }

    /// Layout with this id.
    pub fn get(&self, id: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.id == id)
    }

    /// Every layout in catalog order.
    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    /// First layout in catalog order.
    pub fn first(&self) -> Option<&Layout> {
        self.layouts.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_slot_geometry() {
        let catalog = Catalog::builtin();
        let ids: Vec<_> = catalog.layouts().iter().map(Layout::id).collect();
        assert_eq!(ids, ["single", "vertical-2", "horizontal-2", "grid-4", "grid-9"]);

        let grid4 = catalog.get("grid-4").unwrap();
        let last = grid4.slot(3).unwrap();
        assert!((last.x - 0.5125).abs() < 1e-12);
        assert!((last.y - 0.4625).abs() < 1e-12);

        let grid9 = catalog.get("grid-9").unwrap();
        let last = grid9.slot(8).unwrap();
        assert!((last.x - 0.675).abs() < 1e-12);
        assert!((last.y - 0.615).abs() < 1e-12);

        let horizontal = catalog.get("horizontal-2").unwrap();
        assert!((horizontal.slot(1).unwrap().x - 0.4875).abs() < 1e-12);
        assert!(horizontal.orientation().is_landscape());
    }

    #[test]
    fn default_fit_policies() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.get("single").unwrap().fit_policy(), FitPolicy::Cover);
        for id in ["vertical-2", "horizontal-2", "grid-4", "grid-9"] {
            assert_eq!(catalog.get(id).unwrap().fit_policy(), FitPolicy::Contain, "{id}");
        }
        assert!(catalog.get("grid-9").unwrap().downsamples_uploads());
        assert!(!catalog.get("grid-4").unwrap().downsamples_uploads());
    }

    #[test]
    fn rejects_unsupported_slot_count() {
        let slots = vec![Slot::new(0.0, 0.0, 0.3, 0.3); 3];
        assert!(matches!(
            Layout::new("three", "Three", slots),
            Err(Error::InvalidLayout { .. })
        ));
    }

    #[test]
    fn rejects_slot_outside_sheet() {
        let slots = vec![Slot::new(0.5, 0.0, 0.6, 1.0)];
        assert!(Layout::new("wide", "Wide", slots).is_err());
        let slots = vec![Slot::new(0.0, 0.0, 0.0, 1.0)];
        assert!(Layout::new("flat", "Flat", slots).is_err());
    }

    #[test]
    fn json_record_with_explicit_fields() {
        let catalog = Catalog::from_json(
            r#"[{"id": "poster", "name": "Poster", "orientation": "landscape", "fit": "contain",
                 "slots": [{"x": 0.1, "y": 0.1, "width": 0.8, "height": 0.8}]}]"#,
        )
        .unwrap();
        let poster = catalog.get("poster").unwrap();
        assert_eq!(poster.fit_policy(), FitPolicy::Contain);
        assert!(poster.orientation().is_landscape());
    }

    #[test]
    fn json_validation_errors_surface() {
        let err = Catalog::from_json(
            r#"[{"id": "bad", "name": "Bad",
                 "slots": [{"x": 2.0, "y": 0.0, "width": 0.5, "height": 0.5}]}]"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn slot_relative_offset() {
        let slot = Slot::new(0.2, 0.2, 0.4, 0.2);
        let center = slot.relative(NormPoint::new(0.4, 0.3));
        assert!(center.x.abs() < 1e-12 && center.y.abs() < 1e-12);
        let right_edge = slot.relative(NormPoint::new(0.6, 0.3));
        assert!((right_edge.x - 0.5).abs() < 1e-12);
    }
}
