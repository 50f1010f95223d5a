//! Palettes and their two linked presentations.
//!
//! A [`Palette`] is computed once per image and never changes afterwards. The
//! [`PaletteView`] carries the presentation state shared by the compact chip
//! row and the detailed list: the `expanded` flag, the per-row "copied"
//! acknowledgments and the pending size transition.

pub mod export;
pub mod quantize;

use serde::Serialize;

use crate::color::Color;
use crate::{Error, Result};

pub use export::{to_vector_document, DownloadHandle, PALETTE_FILENAME, SVG_NS};
pub use quantize::{MedianCut, Quantizer};

/// Exactly K colors in quantizer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Build a palette of exactly `size` colors from quantizer output. Extra
    /// colors are dropped; a short list is padded by cycling it in order.
    pub fn from_colors(colors: Vec<Color>, size: usize) -> Result<Self> {
        if colors.is_empty() {
            return Err(Error::QuantizeError("quantizer returned no colors".to_string()));
        }
        if size == 0 {
            return Err(Error::QuantizeError("palette size must be at least 1".to_string()));
        }
        let colors = colors.iter().copied().cycle().take(size).collect();
        Ok(Self { colors })
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<Color> {
        self.colors.get(row).copied()
    }

    pub fn hex_strings(&self) -> Vec<String> {
        self.colors.iter().map(Color::to_hex).collect()
    }
}

#[derive(Debug, Clone, Default)]
struct RowAck {
    generation: u64,
    visible: bool,
}

/// Presentation state of one item's palette.
#[derive(Debug, Clone)]
pub struct PaletteView {
    expanded: bool,
    acks: Vec<RowAck>,
    transition: u64,
    settling: bool,
}

impl PaletteView {
    pub fn new(rows: usize) -> Self {
        Self { expanded: false, acks: vec![RowAck::default(); rows], transition: 0, settling: false }
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Flip between compact and detailed. Returns the id of the size
    /// transition this starts; only its settle signal may trigger a relayout.
    pub fn toggle(&mut self) -> u64 {
        self.expanded = !self.expanded;
        self.transition += 1;
        self.settling = true;
        self.transition
    }

    /// Accept a settle signal. `true` only for the latest transition, and only
    /// once.
    pub fn settle(&mut self, transition: u64) -> bool {
        if self.settling && transition == self.transition {
            self.settling = false;
            true
        } else {
            false
        }
    }

    /// Show the "copied" acknowledgment on a row, restarting its timer.
    /// Returns the generation the matching expiry must carry.
    pub fn acknowledge(&mut self, row: usize) -> Option<u64> {
        let ack = self.acks.get_mut(row)?;
        ack.generation += 1;
        ack.visible = true;
        Some(ack.generation)
    }

    /// Hide a row's acknowledgment if `generation` is still its latest copy.
    pub fn expire(&mut self, row: usize, generation: u64) -> bool {
        match self.acks.get_mut(row) {
            Some(ack) if ack.visible && ack.generation == generation => {
                ack.visible = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_acknowledged(&self, row: usize) -> bool {
        self.acks.get(row).is_some_and(|a| a.visible)
    }
}
