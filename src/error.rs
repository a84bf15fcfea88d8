//! Crate error type.

use core::fmt;

use crate::fit::FitError;
use crate::geometry::Size;
use crate::scene::{PhotoId, TextId};

/// Errors surfaced at the engine boundary.
///
/// Conditions the pipeline recovers from on its own (a photo that fails to
/// decode mid-pass, a missing surface, a font that never loads) are logged
/// and do not show up here.
#[derive(Debug)]
pub enum Error {
    /// Image bytes could not be decoded.
    Decode(image::ImageError),
    /// Output image could not be encoded.
    Encode(image::ImageError),
    /// Filesystem failure while reading a source or writing an export.
    Io(std::io::Error),
    /// Every slot of the active layout already holds a photo.
    NoFreeSlot,
    /// No photo with this id in the scene.
    UnknownPhoto(PhotoId),
    /// No text with this id in the scene.
    UnknownText(TextId),
    /// A layout record failed validation.
    InvalidLayout { id: String, reason: &'static str },
    /// A color string was not a recognised CSS color.
    InvalidColor(String),
    /// A font face could not be parsed.
    Font { family: String, reason: &'static str },
    /// Configuration or catalog JSON was malformed.
    Config(serde_json::Error),
    /// A photo could not be fitted to its slot.
    Fit(FitError),
    /// A background decode or encode task panicked or was cancelled.
    Background(tokio::task::JoinError),
    /// The print facility rejected the output.
    Print(String),
    /// A drawing surface of this size could not be allocated.
    Surface(Size),
}

/// Result alias for this crate.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "image decode failed: {e}"),
            Self::Encode(e) => write!(f, "image encode failed: {e}"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::NoFreeSlot => f.write_str("no free slot in the active layout"),
            Self::UnknownPhoto(id) => write!(f, "unknown photo {id}"),
            Self::UnknownText(id) => write!(f, "unknown text {id}"),
            Self::InvalidLayout { id, reason } => write!(f, "invalid layout '{id}': {reason}"),
            Self::InvalidColor(s) => write!(f, "invalid color '{s}'"),
            Self::Font { family, reason } => write!(f, "font '{family}' unusable: {reason}"),
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Fit(e) => write!(f, "fit failed: {e}"),
            Self::Background(e) => write!(f, "background task failed: {e}"),
            Self::Surface(size) => {
                write!(f, "cannot allocate a {}x{} surface", size.width, size.height)
            }
            Self::Print(msg) => write!(f, "print failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(e) | Self::Encode(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Fit(e) => Some(e),
            Self::Background(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FitError> for Error {
    fn from(e: FitError) -> Self {
        Self::Fit(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e)
    }
}
