//! Image sources, background decoding and the per-photo decode cache.
//!
//! Decoding runs on tokio's blocking pool. Batches are joined with a
//! barrier: [`decode_all`] resolves only after every source has either
//! decoded or failed, and results come back in submission order no matter
//! which finished first.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use image::RgbaImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tiny_skia::Pixmap;

use crate::error::{Error, Result};
use crate::fit::bounded_size;
use crate::geometry::Size;
use crate::raster::pixmap_from_image;
use crate::scene::{PhotoId, Scene};

/// Opaque encoded image bytes plus a label for logs.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageSource {
    label: Arc<str>,
    bytes: Arc<[u8]>,
}

impl ImageSource {
    /// Wrap encoded bytes already in memory.
    pub fn from_bytes(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let label: String = label.into();
        let bytes: Vec<u8> = bytes.into();
        Self {
            label: label.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file into memory. The file name becomes the label.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let label = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::from_bytes(label, bytes))
    }

    /// Name used in logs and upload reports.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The encoded image.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSource")
            .field("label", &self.label)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Decode on the calling thread.
pub fn decode(source: &ImageSource) -> Result<RgbaImage> {
    let image = image::load_from_memory(source.bytes()).map_err(Error::Decode)?;
    Ok(image.to_rgba8())
}

/// Decode on the blocking pool.
pub async fn decode_async(source: ImageSource) -> Result<RgbaImage> {
    tokio::task::spawn_blocking(move || decode(&source))
        .await
        .map_err(Error::Background)?
}

/// Decode every source concurrently and wait for all of them.
pub async fn decode_all(sources: Vec<ImageSource>) -> Vec<Result<RgbaImage>> {
    join_all(sources.into_iter().map(decode_async)).await
}

/// Shrink `image` to fit within `max` and re-encode it as JPEG.
///
/// Returns the new source with the image decoded back from it, so later
/// re-decodes of the source reproduce exactly what is cached. Images already
/// within bounds come back untouched.
pub fn bound_source(
    source: ImageSource,
    image: RgbaImage,
    max: Size,
    quality: u8,
) -> Result<(ImageSource, RgbaImage)> {
    let native = Size::new(image.width(), image.height());
    let target = bounded_size(native, max);
    if target == native {
        return Ok((source, image));
    }

    let resized =
        image::imageops::resize(&image, target.width, target.height, FilterType::Lanczos3);
    let rgb = image::DynamicImage::ImageRgba8(resized).to_rgb8();
    let mut bytes = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(Error::Encode)?;

    log::debug!(
        "downsampled '{}' {}x{} -> {}x{} ({} bytes)",
        source.label(),
        native.width,
        native.height,
        target.width,
        target.height,
        bytes.get_ref().len()
    );
    let bounded = ImageSource::from_bytes(source.label(), bytes.into_inner());
    let decoded = decode(&bounded)?;
    Ok((bounded, decoded))
}

/// [`bound_source`] on the blocking pool.
pub async fn bound_source_async(
    source: ImageSource,
    image: RgbaImage,
    max: Size,
    quality: u8,
) -> Result<(ImageSource, RgbaImage)> {
    tokio::task::spawn_blocking(move || bound_source(source, image, max, quality))
        .await
        .map_err(Error::Background)?
}

/// Decoded pixels per photo, ready to draw, plus the photos whose decode
/// failed.
#[derive(Debug, Default)]
pub struct DecodeCache {
    images: HashMap<PhotoId, Pixmap>,
    failed: HashSet<PhotoId>,
}

impl DecodeCache {
    /// Store decoded pixels for `id`. An empty image counts as a failure.
    pub fn insert(&mut self, id: PhotoId, image: RgbaImage) {
        match pixmap_from_image(&image) {
            Some(pixmap) => {
                self.failed.remove(&id);
                self.images.insert(id, pixmap);
            }
            None => {
                log::warn!("{id}: decoded to an empty image, skipping");
                self.images.remove(&id);
                self.failed.insert(id);
            }
        }
    }

    /// Pixels for `id`, if decoded.
    pub fn get(&self, id: PhotoId) -> Option<&Pixmap> {
        self.images.get(&id)
    }

    /// Whether `id` is known not to decode.
    pub fn has_failed(&self, id: PhotoId) -> bool {
        self.failed.contains(&id)
    }

    /// Number of decoded photos.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Forget every entry, failures included.
    pub fn clear(&mut self) {
        self.images.clear();
        self.failed.clear();
    }

    /// Drop entries for photos no longer in `scene`.
    pub fn retain(&mut self, scene: &Scene) {
        self.images.retain(|id, _| scene.photo(*id).is_some());
        self.failed.retain(|id| scene.photo(*id).is_some());
    }

    /// Decode every photo in `scene` that is neither cached nor known to
    /// fail. Returns the ids that could not be decoded.
    pub async fn ensure(&mut self, scene: &Scene) -> Vec<PhotoId> {
        let missing: Vec<_> = scene
            .photos()
            .iter()
            .filter(|p| !self.images.contains_key(&p.id()) && !self.failed.contains(&p.id()))
            .map(|p| (p.id(), p.source().clone()))
            .collect();
        if !missing.is_empty() {
            let (ids, sources): (Vec<_>, Vec<_>) = missing.into_iter().unzip();
            for (id, result) in ids.into_iter().zip(decode_all(sources).await) {
                match result {
                    Ok(image) => self.insert(id, image),
                    Err(e) => {
                        log::warn!("{id}: decode failed, skipping: {e}");
                        self.failed.insert(id);
                    }
                }
            }
        }
        scene
            .photos()
            .iter()
            .map(|p| p.id())
            .filter(|id| self.failed.contains(id))
            .collect()
    }
}
