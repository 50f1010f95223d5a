//! Error types for the moodboard engine

use thiserror::Error;

use crate::item::ItemId;

/// Result type alias for board operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or driving a board
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The image source could not be turned into a bitmap
    #[error("Image decode failed: {0}")]
    DecodeError(String),

    /// The quantizer could not derive colors from a bitmap
    #[error("Quantization failed: {0}")]
    QuantizeError(String),

    /// Writing to the clipboard failed
    #[error("Clipboard write failed: {0}")]
    ClipboardError(String),

    /// Producing or delivering an export failed
    #[error("Export failed: {0}")]
    ExportError(String),

    /// No item with this id is on the board
    #[error("Unknown board item {0}")]
    UnknownItem(ItemId),

    /// The item has no palette (not an image, not computed yet, or failed)
    #[error("Board item {0} has no palette")]
    NoPalette(ItemId),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "decode")]
impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::DecodeError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
