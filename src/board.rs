//! The board: items in display order, most recent first.

use crate::item::{BoardItem, ImageItem, ItemId, NoteItem};
use crate::ingest::ImageSource;
use crate::BoardConfig;

#[derive(Debug, Default)]
pub struct Board {
    items: Vec<BoardItem>,
    next_id: u64,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> ItemId {
        self.next_id += 1;
        ItemId(self.next_id)
    }

    /// Create an image item at the front of the board.
    pub fn prepend_image(&mut self, source: ImageSource) -> ItemId {
        let id = self.allocate();
        self.items.insert(0, BoardItem::Image(ImageItem::new(id, source)));
        id
    }

    /// Create an empty note at the front of the board.
    pub fn prepend_note(&mut self, config: &BoardConfig) -> ItemId {
        let id = self.allocate();
        self.items.insert(0, BoardItem::Note(NoteItem::new(id, config)));
        id
    }

    pub fn remove(&mut self, id: ItemId) -> Option<BoardItem> {
        let pos = self.items.iter().position(|i| i.id() == id)?;
        Some(self.items.remove(pos))
    }

    pub fn get(&self, id: ItemId) -> Option<&BoardItem> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut BoardItem> {
        self.items.iter_mut().find(|i| i.id() == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(BoardItem::id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoardItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
