//! Layout coordination.
//!
//! The coordinator owns the authoritative list of tracked items and the last
//! computed geometry. Mutations that may change a box size or membership call
//! [`LayoutCoordinator::request_relayout`]; the controller calls
//! [`LayoutCoordinator::flush`] once at the end of every operation or event,
//! so any number of requests made while handling it yield one relayout.

use crate::board::Board;
use crate::item::{BoxSize, ItemId};
use crate::rendering::{Geometry, MasonryEngine};
use crate::BoardConfig;

pub struct LayoutCoordinator {
    engine: Box<dyn MasonryEngine>,
    tracked: Vec<ItemId>,
    geometry: Geometry,
    dirty: bool,
    relayouts: u64,
}

impl LayoutCoordinator {
    pub fn new(engine: Box<dyn MasonryEngine>) -> Self {
        Self { engine, tracked: Vec::new(), geometry: Geometry::default(), dirty: false, relayouts: 0 }
    }

    /// Register an item added at the end of the board.
    pub fn note_appended(&mut self, id: ItemId) {
        self.tracked.push(id);
        self.engine.appended(id);
    }

    /// Register an item added at the front of the board.
    pub fn note_prepended(&mut self, id: ItemId) {
        self.tracked.insert(0, id);
        self.engine.prepended(id);
    }

    /// Stop tracking an item. Returns `false` if it was not tracked.
    pub fn note_removed(&mut self, id: ItemId) -> bool {
        let Some(pos) = self.tracked.iter().position(|t| *t == id) else {
            return false;
        };
        self.tracked.remove(pos);
        self.engine.removed(id);
        true
    }

    pub fn request_relayout(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Run the pending relayout, if any. Returns whether one ran.
    pub fn flush(&mut self, board: &Board, config: &BoardConfig) -> bool {
        if !self.dirty {
            return false;
        }
        self.relayout(board, config);
        true
    }

    /// Recompute positions for every tracked item from its current box size.
    pub fn relayout(&mut self, board: &Board, config: &BoardConfig) -> &Geometry {
        debug_assert_eq!(self.tracked, board.ids(), "tracked set diverged from the board");
        let boxes: Vec<(ItemId, BoxSize)> = self
            .tracked
            .iter()
            .filter_map(|id| match board.get(*id) {
                Some(item) => Some((*id, item.box_size(config))),
                None => {
                    log::error!("tracked item {} is not on the board", id);
                    None
                }
            })
            .collect();
        self.geometry = self.engine.layout(&boxes);
        self.dirty = false;
        self.relayouts += 1;
        log::debug!("relayout #{} over {} items", self.relayouts, boxes.len());
        &self.geometry
    }

    pub fn tracked(&self) -> &[ItemId] {
        &self.tracked
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Number of relayouts run so far.
    pub fn relayout_count(&self) -> u64 {
        self.relayouts
    }
}
