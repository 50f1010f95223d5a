//! Moodboard engine
//!
//! Palette extraction and adaptive masonry layout for image moodboards. Images
//! and text notes are placed on a board, each image gets a small dominant-color
//! palette that can be inspected, copied and exported as SVG, and the board's
//! masonry geometry is kept consistent while asynchronous work (decoding,
//! quantization, clipboard writes, size transitions) completes.
//!
//! # Features
//!
//! - **Deterministic palettes**: median cut quantization, exactly K colors
//! - **Ordered pipeline**: decode → quantize → present → relayout per item
//! - **Swappable collaborators**: decoder, quantizer, masonry engine,
//!   clipboard and download sink are traits injected at construction
//!
//! # Example
//!
//! ```no_run
//! use moodboard::{BoardConfig, CandidateFile};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut board = moodboard::new_board(BoardConfig::default())?;
//! let bytes = std::fs::read("photo.png")?;
//! let ids = board.upload(vec![CandidateFile::new("photo.png", "image/png", bytes)]);
//! board.settle().await;
//! board.download_palette(ids[0])?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod error;
pub use error::{Error, Result};

pub mod board;
pub mod color;
pub mod controller;
pub mod coordinator;
pub mod ingest;
pub mod item;
pub mod palette;

// Clipboard and download services
pub mod platform;

// Masonry geometry and paint commands
pub mod rendering;

pub use board::Board;
pub use color::Color;
pub use controller::{BoardController, BoardSnapshot, Collaborators, Key, OverlayRegion, Routed, Stage};
pub use coordinator::LayoutCoordinator;
pub use ingest::{Bitmap, CandidateFile, Decoder, ImageSource};
pub use item::{BoardItem, BoxSize, ItemId, ItemRegion, ItemState};
pub use palette::{MedianCut, Palette, Quantizer};

/// Largest accepted pixel size for any configured length.
pub const MAX_EXTENT: u32 = 1 << 16;

/// Largest accepted palette size.
pub const MAX_PALETTE_SIZE: usize = 256;

/// Configuration for a board
///
/// Defaults reproduce the reference behavior: five colors per palette,
/// 100px export swatches, a two second "copied" acknowledgment and a 15px
/// masonry gutter.
///
/// # Examples
///
/// ```
/// let cfg = moodboard::BoardConfig::default();
/// assert_eq!(cfg.palette_size, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Number of colors in every palette (K)
    pub palette_size: usize,
    /// Side of one exported swatch in pixels
    pub swatch_size: u32,
    /// How long a "copied" acknowledgment stays visible
    pub copy_ack_ms: u64,
    /// Duration of the compact/detailed size transition (0 => settles at once)
    pub expand_transition_ms: u64,
    /// Width of the grid container
    pub container_width: u32,
    /// Width of one masonry column (and of every item)
    pub column_width: u32,
    /// Space between columns and between stacked items
    pub gutter: u32,
    /// Height of the compact chip row
    pub chip_height: u32,
    /// Height of one detailed palette row
    pub detail_row_height: u32,
    /// Line height of note text
    pub note_line_height: u32,
    /// Average glyph width used to wrap note text
    pub note_char_width: u32,
    /// Inner padding of notes
    pub note_padding: u32,
    /// A note never measures fewer lines than this
    pub note_min_lines: u32,
    /// Note fill in rendered snapshots
    pub note_background: Color,
    /// Quantizer pixel sampling step (1 = every pixel)
    pub sample_step: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            palette_size: 5,
            swatch_size: 100,
            copy_ack_ms: 2000,
            expand_transition_ms: 300,
            container_width: 1000,
            column_width: 240,
            gutter: 15,
            chip_height: 24,
            detail_row_height: 28,
            note_line_height: 20,
            note_char_width: 8,
            note_padding: 12,
            note_min_lines: 1,
            note_background: Color::new(255, 247, 196),
            sample_step: 1,
        }
    }
}

impl BoardConfig {
    /// Parse a JSON config; missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.palette_size == 0 || self.palette_size > MAX_PALETTE_SIZE {
            return Err(Error::ConfigError(format!(
                "palette_size must be between 1 and {}",
                MAX_PALETTE_SIZE
            )));
        }
        let extents = [
            ("swatch_size", self.swatch_size),
            ("container_width", self.container_width),
            ("column_width", self.column_width),
            ("gutter", self.gutter),
            ("chip_height", self.chip_height),
            ("detail_row_height", self.detail_row_height),
            ("note_line_height", self.note_line_height),
            ("note_char_width", self.note_char_width),
            ("note_padding", self.note_padding),
        ];
        if let Some((name, _)) = extents.iter().find(|(_, v)| *v > MAX_EXTENT) {
            return Err(Error::ConfigError(format!("{} must be at most {}", name, MAX_EXTENT)));
        }
        if self.swatch_size == 0 {
            return Err(Error::ConfigError("swatch_size must be at least 1".to_string()));
        }
        if self.column_width == 0 {
            return Err(Error::ConfigError("column_width must be at least 1".to_string()));
        }
        if self.note_char_width == 0 || self.note_line_height == 0 {
            return Err(Error::ConfigError("note metrics must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Create a board controller with the default collaborators: the `image`
/// crate decoder, median cut, column masonry, an in-memory clipboard and an
/// in-memory download sink.
#[cfg(feature = "decode")]
pub fn new_board(config: BoardConfig) -> Result<BoardController> {
    let collaborators = Collaborators::defaults(&config);
    BoardController::with_collaborators(config, collaborators)
}
