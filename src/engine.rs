//! The [`Engine`] facade: one scene, one drawing surface, two passes.
//!
//! All operations take `&mut self`. A preview and an export can never run
//! at the same time, and neither can two exports.
//!
//! ```no_run
//! use printsheet::{Catalog, Engine, EngineConfig, ExportMode, FontFace, ImageSource};
//!
//! # async fn demo() -> printsheet::Result<()> {
//! let mut engine = Engine::new(EngineConfig::default(), Catalog::builtin())?;
//! engine.await_fonts(async { Ok::<Vec<FontFace>, printsheet::Error>(Vec::new()) }).await;
//! engine.select_layout("grid-4")?;
//! let photo = ImageSource::from_path("holiday.jpg").await?;
//! engine.upload(vec![photo]).await;
//! engine.export(ExportMode::SaveToFile("sheet.png".into())).await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::decode::{DecodeCache, ImageSource, bound_source_async, decode_all};
use crate::error::{Error, Result};
use crate::geometry::Size;
use crate::interaction::{Interaction, PointerMode, PointerOutcome, normalize_pointer};
use crate::layout::Catalog;
use crate::raster::Surface;
use crate::render::{Pass, draw_scene, encode_png};
use crate::scene::{PhotoId, Scene};
use crate::schedule::PreviewScheduler;
use crate::text::{FontBook, FontFace, FontGate, FontStatus};

/// Platform print facility.
pub trait PrintSink {
    /// Hand a rendered sheet to the printer.
    fn print(&mut self, png: &[u8], size: Size) -> Result<()>;
}

/// Where an export goes.
pub enum ExportMode<'a> {
    /// Write the PNG to this path.
    SaveToFile(PathBuf),
    /// Hand the PNG to a print facility.
    Print(&'a mut dyn PrintSink),
}

/// A finished export.
#[derive(Clone, Debug)]
pub struct ExportOutput {
    /// Output pixels, always the portrait paper size.
    pub size: Size,
    /// Encoded sheet.
    pub png: Vec<u8>,
    /// Photos left out because their source failed to decode.
    pub skipped: Vec<PhotoId>,
}

/// Why a preview did not draw.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NotReady {
    /// No surface is attached, or it could not be sized for the pass.
    NoSurface,
    /// The font gate has not resolved yet.
    FontsPending,
}

/// What a preview request did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The surface now shows the current scene.
    Rendered,
    /// Nothing pending, or the window has not elapsed.
    NotDue,
    /// Pass abandoned; the next trigger retries.
    NotReady(NotReady),
}

/// Result of one [`Engine::upload`] batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// New photos in upload order.
    pub added: Vec<PhotoId>,
    /// Labels dropped because every slot was taken.
    pub dropped: Vec<String>,
    /// Labels that failed to decode.
    pub failed: Vec<String>,
}

/// Owns the scene, the decode cache, the fonts and the preview surface.
pub struct Engine {
    config: EngineConfig,
    catalog: Catalog,
    scene: Scene,
    interaction: Interaction,
    cache: DecodeCache,
    fonts: FontBook,
    font_gate: FontGate,
    scheduler: PreviewScheduler,
    surface: Option<Surface>,
    show_guides: bool,
}

impl Engine {
    /// Start on the first layout of `catalog`.
    pub fn new(config: EngineConfig, catalog: Catalog) -> Result<Self> {
        config.validate()?;
        let layout = catalog.first().cloned().ok_or_else(|| Error::InvalidLayout {
            id: String::new(),
            reason: "catalog is empty",
        })?;
        Ok(Self {
            scene: Scene::new(layout, config.scene_rules()),
            interaction: Interaction::new(config.hit_params()),
            scheduler: PreviewScheduler::new(config.debounce()),
            show_guides: config.show_guides,
            cache: DecodeCache::default(),
            fonts: FontBook::new(),
            font_gate: FontGate::default(),
            surface: None,
            catalog,
            config,
        })
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Layouts offered for selection.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The current composition.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Pointer state.
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Registered font faces.
    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Outcome of the font gate so far.
    pub fn font_status(&self) -> FontStatus {
        self.font_gate.status()
    }

    /// Preview debounce state.
    pub fn scheduler(&self) -> &PreviewScheduler {
        &self.scheduler
    }

    /// The attached preview surface, if any.
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Attach the preview surface and schedule a render onto it.
    pub fn attach_surface(&mut self, surface: Surface) {
        self.surface = Some(surface);
        self.request_preview();
    }

    /// Take the preview surface away; previews report `NoSurface` until
    /// another is attached.
    pub fn detach_surface(&mut self) -> Option<Surface> {
        self.surface.take()
    }

    /// Toggle slot outlines in the preview.
    pub fn set_show_guides(&mut self, show: bool) {
        self.show_guides = show;
        self.request_preview();
    }

    fn request_preview(&mut self) {
        self.scheduler.trigger(tokio::time::Instant::now());
    }

    // ── scene ───────────────────────────────────────────────────────────

    /// Switch layouts by id. The scene is cleared.
    pub fn select_layout(&mut self, id: &str) -> Result<()> {
        let layout = self.catalog.get(id).cloned().ok_or_else(|| Error::InvalidLayout {
            id: id.to_owned(),
            reason: "not in catalog",
        })?;
        self.scene.set_layout(layout);
        self.cache.clear();
        self.interaction.cancel();
        self.request_preview();
        Ok(())
    }

    /// Run a scene mutation and schedule a preview if it succeeds.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Scene) -> Result<R>) -> Result<R> {
        let out = f(&mut self.scene)?;
        self.cache.retain(&self.scene);
        self.request_preview();
        Ok(out)
    }

    /// Decode a batch concurrently, then place the images in upload order.
    /// Sources beyond the free slots are dropped; undecodable ones are
    /// skipped.
    pub async fn upload(&mut self, sources: Vec<ImageSource>) -> UploadReport {
        let mut report = UploadReport::default();
        let decoded = decode_all(sources.clone()).await;
        let dense = self.scene.layout().downsamples_uploads();

        for (source, result) in sources.into_iter().zip(decoded) {
            let image = match result {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("'{}' skipped: {e}", source.label());
                    report.failed.push(source.label().to_owned());
                    continue;
                }
            };
            if self.scene.next_free_slot().is_none() {
                log::warn!("'{}' dropped: no free slot", source.label());
                report.dropped.push(source.label().to_owned());
                continue;
            }
            let label = source.label().to_owned();
            let (source, image) = if dense {
                let max = self.config.downsample_max;
                match bound_source_async(source, image, max, self.config.downsample_quality).await {
                    Ok(bounded) => bounded,
                    Err(e) => {
                        log::warn!("'{label}' skipped: {e}");
                        report.failed.push(label);
                        continue;
                    }
                }
            } else {
                (source, image)
            };
            let native = Size::new(image.width(), image.height());
            match self.scene.add_photo(source, native) {
                Ok(id) => {
                    self.cache.insert(id, image);
                    report.added.push(id);
                }
                Err(e) => {
                    log::warn!("'{label}' skipped: {e}");
                    report.failed.push(label);
                }
            }
        }
        if !report.added.is_empty() {
            self.request_preview();
        }
        report
    }

    // ── pointer ─────────────────────────────────────────────────────────

    /// Whether presses arrange elements or place new texts.
    pub fn pointer_mode(&self) -> PointerMode {
        self.interaction.mode()
    }

    /// Switch pointer mode; a drag in progress is cancelled.
    pub fn set_pointer_mode(&mut self, mode: PointerMode) {
        self.interaction.set_mode(mode);
    }

    /// Pointer press at surface-local `local` on a surface displayed at
    /// `displayed` size.
    pub fn pointer_down(&mut self, local: (f64, f64), displayed: (f64, f64)) -> PointerOutcome {
        let Some(p) = normalize_pointer(local, displayed) else {
            return PointerOutcome::Ignored;
        };
        let outcome = self.interaction.pointer_down(&mut self.scene, p, &self.fonts);
        self.after_pointer(outcome)
    }

    /// Pointer motion; moves the dragged element, if any.
    pub fn pointer_move(&mut self, local: (f64, f64), displayed: (f64, f64)) -> PointerOutcome {
        let Some(p) = normalize_pointer(local, displayed) else {
            return PointerOutcome::Ignored;
        };
        let outcome = self.interaction.pointer_move(&mut self.scene, p);
        self.after_pointer(outcome)
    }

    /// Pointer release; ends any drag.
    pub fn pointer_up(&mut self) -> PointerOutcome {
        self.interaction.pointer_up()
    }

    /// Pointer left the surface; ends any drag.
    pub fn pointer_leave(&mut self) -> PointerOutcome {
        self.interaction.pointer_leave()
    }

    fn after_pointer(&mut self, outcome: PointerOutcome) -> PointerOutcome {
        if outcome.mutated() {
            self.request_preview();
        }
        outcome
    }

    // ── fonts ───────────────────────────────────────────────────────────

    /// Resolve the font gate once. Gives up after the configured timeout
    /// and renders with fallback glyphs.
    pub async fn await_fonts<F>(&mut self, faces: F) -> FontStatus
    where
        F: Future<Output = Result<Vec<FontFace>>>,
    {
        let timeout = self.config.font_timeout();
        let status = self.font_gate.await_ready(faces, timeout, &mut self.fonts).await;
        self.request_preview();
        status
    }

    // ── preview ─────────────────────────────────────────────────────────

    /// Render if the debounce window has elapsed.
    pub async fn poll_preview(&mut self) -> RenderOutcome {
        if !self.scheduler.take_due(tokio::time::Instant::now()) {
            return RenderOutcome::NotDue;
        }
        self.run_preview().await
    }

    /// Wait out the pending window, then render.
    pub async fn settle_preview(&mut self) -> RenderOutcome {
        let Some(deadline) = self.scheduler.deadline() else {
            return RenderOutcome::NotDue;
        };
        tokio::time::sleep_until(deadline).await;
        self.poll_preview().await
    }

    /// Render immediately, bypassing the debounce.
    pub async fn render_preview_now(&mut self) -> RenderOutcome {
        if !self.scheduler.take_now() {
            return RenderOutcome::NotDue;
        }
        self.run_preview().await
    }

    async fn run_preview(&mut self) -> RenderOutcome {
        let outcome = self.preview_pass().await;
        self.scheduler.finish();
        outcome
    }

    async fn preview_pass(&mut self) -> RenderOutcome {
        if !self.font_gate.is_resolved() {
            log::debug!("preview not ready: fonts pending");
            return RenderOutcome::NotReady(NotReady::FontsPending);
        }
        if self.surface.is_none() {
            log::debug!("preview not ready: no surface");
            return RenderOutcome::NotReady(NotReady::NoSurface);
        }
        self.cache.ensure(&self.scene).await;

        let started = Instant::now();
        let sheet = self.scene.sheet();
        let pass = Pass::preview(&sheet, self.config.preview_scale, self.show_guides);
        let style = self.config.render_style();
        let Some(surface) = self.surface.as_mut() else {
            return RenderOutcome::NotReady(NotReady::NoSurface);
        };
        if let Err(e) = surface.resize(pass.output) {
            log::error!("preview skipped: {e}");
            return RenderOutcome::NotReady(NotReady::NoSurface);
        }
        draw_scene(surface, &pass, &self.scene, &self.cache, &self.fonts, &style);
        log::debug!(
            "preview {}x{} rendered in {:?}",
            pass.output.width,
            pass.output.height,
            started.elapsed()
        );
        RenderOutcome::Rendered
    }

    // ── export ──────────────────────────────────────────────────────────

    /// Render at paper resolution from freshly decoded sources and deliver
    /// the PNG. The attached surface, if any, is borrowed for the pass and
    /// restored afterwards.
    pub async fn export(&mut self, mode: ExportMode<'_>) -> Result<ExportOutput> {
        let result = self.export_inner(mode).await;
        if let Err(e) = &result {
            log::error!("export failed: {e}");
        }
        result
    }

    async fn export_inner(&mut self, mode: ExportMode<'_>) -> Result<ExportOutput> {
        let started = Instant::now();
        let sheet = self.scene.sheet();
        let pass = Pass::export(&sheet, self.config.paper);
        let style = self.config.render_style();

        // Every photo decodes (or fails) before anything is drawn.
        let mut fresh = DecodeCache::default();
        let skipped = fresh.ensure(&self.scene).await;

        let mut scratch;
        let surface = match self.surface.as_mut() {
            Some(surface) => surface,
            None => {
                scratch = Surface::new(pass.output)?;
                &mut scratch
            }
        };
        let image = {
            let mut target = surface.resized_for(pass.output)?;
            draw_scene(&mut target, &pass, &self.scene, &fresh, &self.fonts, &style);
            target.to_image()
        };

        let png = tokio::task::spawn_blocking(move || encode_png(&image))
            .await
            .map_err(Error::Background)??;
        match mode {
            ExportMode::SaveToFile(path) => {
                tokio::fs::write(&path, &png).await?;
                log::debug!("export written to {}", path.display());
            }
            ExportMode::Print(sink) => sink.print(&png, pass.output)?,
        }
        log::debug!(
            "export {}x{} ({} photos, {} skipped) in {:?}",
            pass.output.width,
            pass.output.height,
            self.scene.photos().len(),
            skipped.len(),
            started.elapsed()
        );
        Ok(ExportOutput {
            size: pass.output,
            png,
            skipped,
        })
    }
}
