// Error module
// Typed failures surfaced to the user as a single line

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between loading a logo and setting a wallpaper
#[derive(Debug, Error)]
pub enum Error {
    /// The composited bitmap could not be produced or encoded to PNG
    #[error("Could not convert the image: {0}")]
    ImageConversion(String),

    /// The desktop rejected the wallpaper for a display
    #[error("Could not set the wallpaper on display {display}: {reason}")]
    WallpaperSet { display: String, reason: String },

    #[error("No display is available")]
    NoDisplayAvailable,

    /// Talking to the display server failed
    #[error("Could not query displays: {0}")]
    DisplayQuery(String),

    #[error("Background color is unavailable: {0:?}")]
    BackgroundColorUnavailable(String),

    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedFileType(PathBuf),

    #[error("The image has no alpha channel; use a PNG with transparency")]
    MissingAlphaChannel,

    #[error("Logo ratio must be greater than 0 and at most 1, got {0}")]
    InvalidRatio(f64),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Background worker stopped")]
    WorkerStopped,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with a short description of what was attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
