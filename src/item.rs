//! Board items: images with their palette, and text notes.

use serde::Serialize;
use std::fmt;

use crate::ingest::{Bitmap, ImageSource};
use crate::palette::{Palette, PaletteView};
use crate::BoardConfig;

/// Stable identity of a board item, allocated by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rendered box dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoxSize {
    pub width: u32,
    pub height: u32,
}

impl BoxSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Lifecycle of an item. Notes go straight to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemState {
    Created,
    Decoding,
    PaletteComputing,
    Ready,
    /// The source could not be decoded; the item can only be deleted.
    Failed,
    Deleted,
}

/// Clickable regions of an item. Each region owns its handler; only the body
/// opens the lightbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRegion {
    Body,
    DeleteButton,
    PaletteContainer,
    PaletteRow(usize),
    NoteText,
}

#[derive(Debug)]
pub struct ImageItem {
    pub id: ItemId,
    pub source: ImageSource,
    pub state: ItemState,
    /// Natural pixel size once decoded.
    pub natural: Option<BoxSize>,
    pub palette: Option<Palette>,
    pub view: Option<PaletteView>,
}

impl ImageItem {
    pub fn new(id: ItemId, source: ImageSource) -> Self {
        Self { id, source, state: ItemState::Created, natural: None, palette: None, view: None }
    }

    pub fn decoded(&mut self, bitmap: &Bitmap) {
        self.natural = Some(BoxSize::new(bitmap.width, bitmap.height));
        self.state = ItemState::PaletteComputing;
    }

    pub fn attach_palette(&mut self, palette: Palette) {
        self.view = Some(PaletteView::new(palette.len()));
        self.palette = Some(palette);
    }

    pub fn is_expanded(&self) -> bool {
        self.view.as_ref().is_some_and(PaletteView::is_expanded)
    }

    /// Height of the image scaled to the column width.
    pub fn image_height(&self, width: u32) -> u32 {
        match self.natural {
            Some(n) if n.width > 0 => {
                ((width as u64 * n.height as u64 + n.width as u64 / 2) / n.width as u64) as u32
            }
            _ => 0,
        }
    }

    pub fn palette_height(&self, config: &BoardConfig) -> u32 {
        match &self.palette {
            None => 0,
            Some(p) if self.is_expanded() => config.chip_height + config.detail_row_height * p.len() as u32,
            Some(_) => config.chip_height,
        }
    }

    pub fn box_size(&self, config: &BoardConfig) -> BoxSize {
        let width = config.column_width;
        BoxSize::new(width, self.image_height(width) + self.palette_height(config))
    }
}

#[derive(Debug)]
pub struct NoteItem {
    pub id: ItemId,
    pub text: String,
    pub state: ItemState,
    pub height: u32,
}

impl NoteItem {
    pub fn new(id: ItemId, config: &BoardConfig) -> Self {
        Self { id, text: String::new(), state: ItemState::Ready, height: measure_note("", config) }
    }

    /// Replace the text and re-measure. Returns the new height.
    pub fn set_text(&mut self, text: String, config: &BoardConfig) -> u32 {
        self.height = measure_note(&text, config);
        self.text = text;
        self.height
    }

    pub fn box_size(&self, config: &BoardConfig) -> BoxSize {
        BoxSize::new(config.column_width, self.height)
    }
}

/// Wrap note text to the column's content width. Words longer than a line
/// are broken hard; explicit newlines are kept.
pub fn wrap_note(text: &str, config: &BoardConfig) -> Vec<String> {
    let content_w = config.column_width.saturating_sub(config.note_padding * 2);
    let chars_per_line = (content_w / config.note_char_width.max(1)).max(1) as usize;

    let mut lines = Vec::new();
    for para in text.split('\n') {
        let mut cur = String::new();
        let mut cur_len = 0usize;
        for word in para.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            if cur_len > 0 && cur_len + 1 + word.len() > chars_per_line {
                lines.push(std::mem::take(&mut cur));
                cur_len = 0;
            }
            while word.len() > chars_per_line {
                if cur_len > 0 {
                    lines.push(std::mem::take(&mut cur));
                    cur_len = 0;
                }
                let rest = word.split_off(chars_per_line);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            if word.is_empty() {
                continue;
            }
            if cur_len > 0 {
                cur.push(' ');
                cur_len += 1;
            }
            cur_len += word.len();
            cur.extend(word);
        }
        lines.push(cur);
    }
    lines
}

/// Height an auto-growing note needs for `text`.
pub fn measure_note(text: &str, config: &BoardConfig) -> u32 {
    let lines = (wrap_note(text, config).len() as u32).max(config.note_min_lines);
    lines
        .saturating_mul(config.note_line_height)
        .saturating_add(config.note_padding.saturating_mul(2))
}

#[derive(Debug)]
pub enum BoardItem {
    Image(ImageItem),
    Note(NoteItem),
}

impl BoardItem {
    pub fn id(&self) -> ItemId {
        match self {
            BoardItem::Image(i) => i.id,
            BoardItem::Note(n) => n.id,
        }
    }

    pub fn state(&self) -> ItemState {
        match self {
            BoardItem::Image(i) => i.state,
            BoardItem::Note(n) => n.state,
        }
    }

    pub fn set_state(&mut self, state: ItemState) {
        match self {
            BoardItem::Image(i) => i.state = state,
            BoardItem::Note(n) => n.state = state,
        }
    }

    pub fn box_size(&self, config: &BoardConfig) -> BoxSize {
        match self {
            BoardItem::Image(i) => i.box_size(config),
            BoardItem::Note(n) => n.box_size(config),
        }
    }

    pub fn as_image(&self) -> Option<&ImageItem> {
        match self {
            BoardItem::Image(i) => Some(i),
            BoardItem::Note(_) => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut ImageItem> {
        match self {
            BoardItem::Image(i) => Some(i),
            BoardItem::Note(_) => None,
        }
    }

    pub fn as_note_mut(&mut self) -> Option<&mut NoteItem> {
        match self {
            BoardItem::Note(n) => Some(n),
            BoardItem::Image(_) => None,
        }
    }
}
