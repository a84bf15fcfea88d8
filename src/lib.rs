//! Photo print-sheet compositing: slot layouts, fit modes, pointer-driven
//! arrangement and orientation-aware export.
//!
//! Photos are placed into the slots of a [`Layout`], moved, scaled and
//! rotated within them, labelled with text, and rendered either as a
//! debounced preview or as a full-resolution PNG on portrait paper.
//!
//! # Modules
//!
//! - [`geometry`] — sizes, normalized points, rectangles
//! - [`orientation`] — sheet orientation and quarter-turn paper rotation
//! - [`layout`] — slots, layouts and the layout catalog
//! - [`fit`] — cover/contain fit scale and bounded downsample sizing
//! - [`transform`] — normalized ↔ sheet units, per-element transforms
//! - [`scene`] — the mutable scene of photos and texts
//! - [`interaction`] — hit testing and the drag state machine
//! - [`text`] — font faces, glyph masks and the font readiness gate
//! - [`raster`] — the RGBA drawing surface
//! - [`decode`] — image sources, background decoding, decode cache
//! - [`schedule`] — preview debounce
//! - [`render`] — preview and export passes
//! - [`engine`] — the facade tying it together
//! - [`config`] — engine configuration

#![forbid(unsafe_code)]

pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod fit;
pub mod geometry;
pub mod interaction;
pub mod layout;
pub mod orientation;
pub mod raster;
pub mod render;
pub mod scene;
pub mod schedule;
pub mod text;
pub mod transform;

pub use config::EngineConfig;
pub use decode::{DecodeCache, ImageSource};
pub use engine::{
    Engine, ExportMode, ExportOutput, NotReady, PrintSink, RenderOutcome, UploadReport,
};
pub use error::{Error, Result};
pub use fit::{FitError, FitPolicy, bounded_size, fit_scale};
pub use geometry::{NormPoint, PixelRect, Size};
pub use interaction::{
    DragState, DragTarget, HitParams, Interaction, PointerMode, PointerOutcome, TextMeasure,
    normalize_pointer,
};
pub use layout::{Catalog, Layout, Slot};
pub use orientation::{QuarterTurn, SheetOrientation};
pub use raster::{Color, Surface};
pub use render::{Pass, RenderStyle};
pub use scene::{
    PhotoElement, PhotoId, PhotoPatch, Scene, SceneRules, TextDefaults, TextElement, TextId,
    TextPatch, Zoom,
};
pub use schedule::PreviewScheduler;
pub use text::{FontBook, FontFace, FontGate, FontStatus};
pub use transform::Sheet;
