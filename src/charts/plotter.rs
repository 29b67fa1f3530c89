//! Chart Plotter Module
//! Draws the interactive treemap with the egui painter.

use crate::charts::layout::{hit_test, layout, Bounds, LayoutStyle, Tile, TreemapNode};
use crate::data::{HexColor, TreemapData};
use egui::{Align2, Color32, FontId, Rect, RichText, Rounding, Sense, Stroke};

/// Fill of the focused (top) tile.
pub const ROOT_COLOR: Color32 = Color32::from_rgb(211, 211, 211); // lightgrey
pub const CORNER_RADIUS: f32 = 5.0;

const LEGEND_STEPS: usize = 64;

pub fn to_color32(color: HexColor) -> Color32 {
    Color32::from_rgb(color.r, color.g, color.b)
}

/// Readable label color over a fill.
pub fn label_color(fill: HexColor) -> Color32 {
    if fill.luminance() > 0.6 {
        Color32::from_rgb(30, 30, 30)
    } else {
        Color32::WHITE
    }
}

/// Parent of a hierarchy path; the root's parent is the root.
pub fn parent_path(path: &[String]) -> Vec<String> {
    path.split_last()
        .map(|(_, rest)| rest.to_vec())
        .unwrap_or_default()
}

fn to_rect(bounds: Bounds) -> Rect {
    Rect::from_min_size(
        egui::pos2(bounds.x as f32, bounds.y as f32),
        egui::vec2(bounds.w as f32, bounds.h as f32),
    )
}

pub fn tile_color(data: &TreemapData, tile: &Tile<'_>) -> HexColor {
    if tile.level == 0 {
        HexColor::new(ROOT_COLOR.r(), ROOT_COLOR.g(), ROOT_COLOR.b())
    } else {
        data.gradient.color_for(tile.node.color, data.color_domain)
    }
}

/// Creates the treemap visualization.
pub struct TreemapPlotter;

impl TreemapPlotter {
    /// Draw `focus` and its descendants in the remaining space. Returns the
    /// new focus path when the user clicked a tile.
    pub fn draw_treemap(
        ui: &mut egui::Ui,
        data: &TreemapData,
        focus: &TreemapNode,
    ) -> Option<Vec<String>> {
        let size = ui.available_size();
        let (rect, response) = ui.allocate_exact_size(size, Sense::click());
        let painter = ui.painter_at(rect);

        let bounds = Bounds::new(
            rect.min.x as f64,
            rect.min.y as f64,
            rect.width() as f64,
            rect.height() as f64,
        );
        let tiles = layout(focus, bounds, &LayoutStyle::default());

        let hovered = response
            .hover_pos()
            .and_then(|pos| hit_test(&tiles, pos.x as f64, pos.y as f64));

        for tile in &tiles {
            let r = to_rect(tile.bounds);
            let fill = tile_color(data, tile);
            painter.rect_filled(r, Rounding::same(CORNER_RADIUS), to_color32(fill));

            let is_hovered = hovered.is_some_and(|h| std::ptr::eq(h.node, tile.node));
            let stroke = if is_hovered {
                Stroke::new(2.0, Color32::from_rgb(40, 40, 40))
            } else {
                Stroke::new(1.0, Color32::WHITE)
            };
            painter.rect_stroke(r, Rounding::same(CORNER_RADIUS), stroke);

            if r.width() > 30.0 && r.height() > 14.0 {
                let label = if tile.level == 0 && tile.node.path.is_empty() {
                    TreemapNode::ROOT_LABEL.to_string()
                } else {
                    tile.node.label.clone()
                };
                painter.with_clip_rect(r.shrink(2.0)).text(
                    r.min + egui::vec2(4.0, 2.0),
                    Align2::LEFT_TOP,
                    label,
                    FontId::proportional(12.0),
                    label_color(fill),
                );
            }
        }

        let mut new_focus = None;
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                if let Some(tile) = hit_test(&tiles, pos.x as f64, pos.y as f64) {
                    let target = if tile.level == 0 || tile.node.is_leaf() {
                        parent_path(&tile.node.path)
                    } else {
                        tile.node.path.clone()
                    };
                    if target != focus.path {
                        new_focus = Some(target);
                    }
                }
            }
        }

        if let Some(tile) = hovered {
            response.on_hover_ui_at_pointer(|ui| {
                Self::draw_tooltip(ui, data, tile.node);
            });
        }

        new_focus
    }

    fn draw_tooltip(ui: &mut egui::Ui, data: &TreemapData, node: &TreemapNode) {
        let title = if node.path.is_empty() {
            TreemapNode::ROOT_LABEL.to_string()
        } else {
            node.path.join(" / ")
        };
        ui.label(RichText::new(title).strong());
        ui.label(format!(
            "{}: {:.0}",
            data.size_metric.label(),
            node.raw_size
        ));
        let color_label = if node.is_leaf() {
            data.metric.label().to_string()
        } else {
            format!("{} (weighted mean)", data.metric.label())
        };
        ui.label(format!("{}: {:.3}", color_label, node.color));
        if node.is_leaf() {
            let flag = if node.priority_leaves > 0 { "yes" } else { "no" };
            ui.label(format!("Priority: {}", flag));
        } else {
            ui.label(format!(
                "{} leaves, {} priority",
                node.leaves, node.priority_leaves
            ));
        }
    }

    /// Horizontal color bar with the color-domain bounds.
    pub fn draw_color_legend(ui: &mut egui::Ui, data: &TreemapData) {
        ui.horizontal(|ui| {
            let (min, max) = data.color_domain;
            ui.label(RichText::new(data.metric.format_value(min)).size(11.0));

            let (rect, _) = ui.allocate_exact_size(egui::vec2(200.0, 12.0), Sense::hover());
            let painter = ui.painter_at(rect);
            let step = rect.width() / LEGEND_STEPS as f32;
            for i in 0..LEGEND_STEPS {
                let t = i as f64 / (LEGEND_STEPS - 1) as f64;
                let segment = Rect::from_min_size(
                    rect.min + egui::vec2(i as f32 * step, 0.0),
                    egui::vec2(step + 0.5, rect.height()),
                );
                painter.rect_filled(segment, 0.0, to_color32(data.gradient.sample(t)));
            }

            ui.label(RichText::new(data.metric.format_value(max)).size(11.0));
            ui.label(RichText::new(data.metric.label()).size(11.0).strong());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_root_is_root() {
        assert!(parent_path(&[]).is_empty());
        assert_eq!(
            parent_path(&["Cat".to_string(), "Sub".to_string()]),
            vec!["Cat".to_string()]
        );
    }

    #[test]
    fn label_color_contrasts_with_fill() {
        assert_eq!(label_color(HexColor::new(240, 240, 240)), Color32::from_rgb(30, 30, 30));
        assert_eq!(label_color(HexColor::new(5, 150, 105)), Color32::WHITE);
    }
}
