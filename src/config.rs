//! Engine configuration.
//!
//! Every field has a default, so a JSON document only needs the values it
//! changes:
//!
//! ```
//! use printsheet::EngineConfig;
//!
//! let config = EngineConfig::from_json(
//!     r#"{"debounce_ms": 50, "paper": {"width": 1200, "height": 1800}}"#,
//! )
//! .unwrap();
//! assert_eq!(config.debounce_ms, 50);
//! assert_eq!(config.sheet.width, 1600);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::Size;
use crate::interaction::HitParams;
use crate::raster::Color;
use crate::render::RenderStyle;
use crate::scene::{SceneRules, TextDefaults};

/// Every tunable of the engine. Missing JSON fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Portrait working sheet in sheet units.
    pub sheet: Size,
    /// Export target in pixels, portrait.
    pub paper: Size,
    /// Preview output pixels per sheet unit.
    pub preview_scale: f64,
    /// Quiet period before a preview renders.
    pub debounce_ms: u64,
    /// How long to wait for fonts before falling back.
    pub font_timeout_ms: u64,
    /// Upload cap for dense layouts.
    pub downsample_max: Size,
    /// JPEG quality of downsampled uploads, 1-100.
    pub downsample_quality: u8,
    /// Display font size to sheet units.
    pub text_scale: f64,
    /// Vertical text line height as a multiple of font size.
    pub vertical_line_factor: f64,
    /// Extra sheet units around a text's hit box.
    pub text_hit_padding: f64,
    /// Sheet fill behind every photo.
    pub background: Color,
    /// Slot outline color in previews.
    pub guide_color: Color,
    /// Guide stroke width in sheet units.
    pub guide_width: f64,
    /// Whether the preview starts with slot outlines.
    pub show_guides: bool,
    /// Content and style of newly added texts.
    pub default_text: TextDefaults,
    /// Inclusive font size bounds.
    pub font_size_range: (f32, f32),
    /// Scale change per zoom step.
    pub zoom_step: f64,
    /// Scale floor for zoom and edits.
    pub min_scale: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sheet: Size::new(1600, 2400),
            paper: Size::new(1600, 2400),
            preview_scale: 1.0,
            debounce_ms: 30,
            font_timeout_ms: 3000,
            downsample_max: Size::new(1200, 1200),
            downsample_quality: 85,
            text_scale: 2.0,
            vertical_line_factor: 2.4,
            text_hit_padding: 80.0,
            background: Color::WHITE,
            guide_color: Color([0xe5, 0xe7, 0xeb, 255]),
            guide_width: 2.0,
            show_guides: true,
            default_text: TextDefaults::default(),
            font_size_range: (12.0, 48.0),
            zoom_step: 0.01,
            min_scale: 0.01,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject sizes, scales and ranges the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| <serde_json::Error as serde::de::Error>::custom(msg);
        if self.sheet.is_empty() || self.paper.is_empty() {
            return Err(invalid("sheet and paper must be non-empty").into());
        }
        if !(self.preview_scale.is_finite() && self.preview_scale > 0.0) {
            return Err(invalid("preview_scale must be positive").into());
        }
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return Err(invalid("min_scale must be positive").into());
        }
        let (lo, hi) = self.font_size_range;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi) {
            return Err(invalid("font_size_range must be an increasing positive pair").into());
        }
        Ok(())
    }

    /// [`debounce_ms`](Self::debounce_ms) as a duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// [`font_timeout_ms`](Self::font_timeout_ms) as a duration.
    pub fn font_timeout(&self) -> Duration {
        Duration::from_millis(self.font_timeout_ms)
    }

    /// Bounds for the scene.
    pub fn scene_rules(&self) -> SceneRules {
        SceneRules {
            sheet: self.sheet,
            text_defaults: self.default_text.clone(),
            font_size_min: self.font_size_range.0,
            font_size_max: self.font_size_range.1,
            zoom_step: self.zoom_step,
            min_scale: self.min_scale,
        }
    }

    /// Text hit-box parameters.
    pub fn hit_params(&self) -> HitParams {
        HitParams {
            text_scale: self.text_scale,
            vertical_line_factor: self.vertical_line_factor,
            padding: self.text_hit_padding,
        }
    }

    /// Visual constants for both passes.
    pub fn render_style(&self) -> RenderStyle {
        RenderStyle {
            background: self.background,
            guide_color: self.guide_color,
            guide_width: self.guide_width as f32,
            text_scale: self.text_scale,
            vertical_line_factor: self.vertical_line_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn defaults_match_derived_parts() {
        let config = EngineConfig::default();
        assert_eq!(config.scene_rules(), SceneRules::default());
        assert_eq!(config.hit_params(), HitParams::default());
        assert_eq!(config.render_style(), RenderStyle::default());
        assert_eq!(config.debounce(), Duration::from_millis(30));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r##"{"background": "#fafafa", "default_text": {"font_family": "Georgia"}}"##,
        )
        .unwrap();
        assert_eq!(config.background, Color([0xfa, 0xfa, 0xfa, 255]));
        assert_eq!(config.default_text.font_family, "Georgia");
        assert_eq!(config.default_text.content, "Enter text");
        assert_eq!(config.font_size_range, (12.0, 48.0));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"preview_scale": 0}"#),
            Err(Error::Config(_))
        ));
        assert!(EngineConfig::from_json(r#"{"font_size_range": [48, 12]}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"background": "chartreuse-ish"}"#).is_err());
    }

    #[test]
    fn serializes_colors_as_hex() {
        let json = serde_json::to_string(&EngineConfig::default()).unwrap();
        assert!(json.contains(r##""guide_color":"#e5e7eb""##));
    }
}
