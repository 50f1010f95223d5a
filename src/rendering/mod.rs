//! Rendering: masonry geometry and paint commands

pub mod layout;
pub mod paint;

pub use layout::{ColumnMasonry, Geometry, MasonryEngine, Placement, Rect};
pub use paint::{paint_item, render_board_svg, PaintCommand};
