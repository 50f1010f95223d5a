/// Paint commands for board items and a whole-board SVG snapshot

use std::fmt::Write as _;

use super::layout::{Geometry, Rect};
use crate::board::Board;
use crate::color::Color;
use crate::item::{wrap_note, BoardItem, ImageItem};
use crate::palette::SVG_NS;
use crate::BoardConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
    },
    Image {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        href: String,
    },
}

fn paint_image(item: &ImageItem, rect: Rect, config: &BoardConfig, out: &mut Vec<PaintCommand>) {
    let img_h = item.image_height(rect.width);
    out.push(PaintCommand::Image {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: img_h,
        href: item.source.to_data_url(),
    });
    let (Some(palette), Some(view)) = (&item.palette, &item.view) else {
        return;
    };

    // Compact row: equal-width chips filling the item width.
    let top = rect.y + img_h as i32;
    let n = palette.len() as u32;
    let chip_w = rect.width / n.max(1);
    for (i, color) in palette.colors().iter().enumerate() {
        let i = i as u32;
        let width = if i + 1 == n { rect.width - chip_w * i } else { chip_w };
        out.push(PaintCommand::SolidRect {
            x: rect.x + (chip_w * i) as i32,
            y: top,
            width,
            height: config.chip_height,
            color: *color,
        });
    }
    if !view.is_expanded() {
        return;
    }

    // Detailed list: swatch plus hex label per row.
    let mut y = top + config.chip_height as i32;
    let row_h = config.detail_row_height;
    for (row, color) in palette.colors().iter().enumerate() {
        out.push(PaintCommand::SolidRect { x: rect.x, y, width: row_h, height: row_h, color: *color });
        let label = if view.is_acknowledged(row) {
            format!("{} copied", color.to_hex())
        } else {
            color.to_hex()
        };
        out.push(PaintCommand::Text { x: rect.x + row_h as i32 + 6, y: y + row_h as i32 / 2, text: label });
        y += row_h as i32;
    }
}

/// Paint commands for one item placed at `rect`.
pub fn paint_item(item: &BoardItem, rect: Rect, config: &BoardConfig) -> Vec<PaintCommand> {
    let mut out = Vec::new();
    match item {
        BoardItem::Image(img) => paint_image(img, rect, config, &mut out),
        BoardItem::Note(note) => {
            out.push(PaintCommand::SolidRect {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                color: config.note_background,
            });
            let mut y = rect.y + config.note_padding as i32;
            for line in wrap_note(&note.text, config) {
                y += config.note_line_height as i32;
                out.push(PaintCommand::Text { x: rect.x + config.note_padding as i32, y, text: line });
            }
        }
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Render the board as laid out in `geometry`. Items without a placement are
/// skipped.
pub fn render_board_svg(board: &Board, geometry: &Geometry, config: &BoardConfig) -> String {
    let mut svg = String::new();
    let _ = write!(svg, r#"<svg xmlns="{}" width="{}" height="{}">"#, SVG_NS, geometry.width, geometry.height);
    for item in board.iter() {
        let Some(rect) = geometry.rect_of(item.id()) else { continue };
        for cmd in paint_item(item, rect, config) {
            let _ = match cmd {
                PaintCommand::SolidRect { x, y, width, height, color } => write!(
                    svg,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                    x,
                    y,
                    width,
                    height,
                    color.to_css_rgb()
                ),
                PaintCommand::Text { x, y, text } => {
                    write!(svg, r#"<text x="{}" y="{}">{}</text>"#, x, y, escape(&text))
                }
                PaintCommand::Image { x, y, width, height, href } => write!(
                    svg,
                    r#"<image x="{}" y="{}" width="{}" height="{}" href="{}"/>"#,
                    x, y, width, height, href
                ),
            };
        }
    }
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{Bitmap, ImageSource};
    use crate::palette::Palette;

    #[test]
    fn collapsed_palette_paints_chips_only() {
        let cfg = BoardConfig::default();
        let mut board = Board::new();
        let id = board.prepend_image(ImageSource::new("a", "image/png", vec![0]));
        let img = board.get_mut(id).unwrap().as_image_mut().unwrap();
        img.decoded(&Bitmap::solid(10, 10, Color::new(255, 0, 0)));
        img.attach_palette(Palette::from_colors(vec![Color::new(255, 0, 0)], 5).unwrap());

        let rect = Rect { x: 0, y: 0, width: 240, height: 264 };
        let cmds = paint_item(board.get(id).unwrap(), rect, &cfg);
        let chips = cmds.iter().filter(|c| matches!(c, PaintCommand::SolidRect { .. })).count();
        assert_eq!(chips, 5);
        assert!(!cmds.iter().any(|c| matches!(c, PaintCommand::Text { .. })));

        board.get_mut(id).unwrap().as_image_mut().unwrap().view.as_mut().unwrap().toggle();
        let cmds = paint_item(board.get(id).unwrap(), rect, &cfg);
        let labels: Vec<_> = cmds
            .iter()
            .filter_map(|c| match c {
                PaintCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["#FF0000"; 5]);
    }

    #[test]
    fn note_text_is_escaped_in_snapshot() {
        let cfg = BoardConfig::default();
        let mut board = Board::new();
        let id = board.prepend_note(&cfg);
        board.get_mut(id).unwrap().as_note_mut().unwrap().set_text("a < b".into(), &cfg);
        let geometry = Geometry {
            placements: vec![crate::rendering::Placement { id, rect: Rect { x: 0, y: 0, width: 240, height: 44 } }],
            width: 240,
            height: 44,
        };
        let svg = render_board_svg(&board, &geometry, &cfg);
        assert!(svg.contains("a &lt; b"));
    }
}
