/// Masonry layout: column packing of variable-height boxes

use serde::Serialize;

use crate::item::{BoxSize, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub id: ItemId,
    pub rect: Rect,
}

/// Positions for every tracked item, in tracked order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub placements: Vec<Placement>,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn rect_of(&self, id: ItemId) -> Option<Rect> {
        self.placements.iter().find(|p| p.id == id).map(|p| p.rect)
    }
}

/// The masonry engine. It is told about membership changes and asked to lay
/// out an ordered list of boxes; the result must not overlap.
pub trait MasonryEngine: Send {
    fn appended(&mut self, _id: ItemId) {}
    fn prepended(&mut self, _id: ItemId) {}
    fn removed(&mut self, _id: ItemId) {}
    fn layout(&mut self, boxes: &[(ItemId, BoxSize)]) -> Geometry;
}

/// Shortest-column packing with a fixed column width and gutter.
#[derive(Debug, Clone)]
pub struct ColumnMasonry {
    pub container_width: u32,
    pub column_width: u32,
    pub gutter: u32,
}

impl ColumnMasonry {
    pub fn new(container_width: u32, column_width: u32, gutter: u32) -> Self {
        Self { container_width, column_width, gutter }
    }

    pub fn columns(&self) -> usize {
        let stride = self.column_width.saturating_add(self.gutter);
        ((self.container_width.saturating_add(self.gutter) / stride.max(1)) as usize).max(1)
    }
}

impl MasonryEngine for ColumnMasonry {
    fn layout(&mut self, boxes: &[(ItemId, BoxSize)]) -> Geometry {
        let cols = self.columns();
        let stride = self.column_width.saturating_add(self.gutter).max(1);
        let mut heights = vec![0u32; cols];
        let mut placements = Vec::with_capacity(boxes.len());

        for &(id, size) in boxes {
            let span = ((size.width.saturating_add(self.gutter) as f64 / stride as f64).ceil() as usize).clamp(1, cols);
            // Lowest top edge over every window of `span` adjacent columns;
            // leftmost wins ties.
            let (col, top) = (0..=cols - span)
                .map(|c| (c, heights[c..c + span].iter().copied().max().unwrap_or(0)))
                .min_by_key(|&(c, top)| (top, c))
                .unwrap_or((0, 0));
            let rect = Rect {
                x: (col as u32).saturating_mul(stride).min(i32::MAX as u32) as i32,
                y: top.min(i32::MAX as u32) as i32,
                width: size.width,
                height: size.height,
            };
            for h in &mut heights[col..col + span] {
                *h = top.saturating_add(size.height).saturating_add(self.gutter);
            }
            placements.push(Placement { id, rect });
        }

        let height = heights.iter().copied().max().unwrap_or(0).saturating_sub(self.gutter);
        let used = (cols as u32).saturating_mul(stride).saturating_sub(self.gutter);
        Geometry { placements, width: used, height }
    }
}
