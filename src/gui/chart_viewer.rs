//! Chart Viewer Widget
//! Central panel showing the treemap, a breadcrumb of the focused path and
//! the color legend.

use crate::charts::{TreemapNode, TreemapPlotter};
use crate::data::TreemapData;
use egui::{Color32, RichText};

/// Treemap display with click-to-zoom focus.
#[derive(Default)]
pub struct TreemapViewer {
    pub data: Option<TreemapData>,
    root: Option<TreemapNode>,
    /// Path of the focused node; empty shows the whole hierarchy.
    pub focus: Vec<String>,
    title: String,
    message: Option<String>,
}

impl TreemapViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show new data. The focus survives when its node still exists.
    pub fn set_data(&mut self, data: TreemapData, title: &str) {
        let root = TreemapNode::build(&data);
        if root.find(&self.focus).is_none() {
            self.focus.clear();
        }
        self.root = Some(root);
        self.data = Some(data);
        self.title = title.to_string();
        self.message = None;
    }

    /// Drop the chart and show `message` instead.
    pub fn clear(&mut self, message: &str) {
        self.data = None;
        self.root = None;
        self.message = Some(message.to_string());
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// The node currently drawn at the top of the treemap.
    pub fn focus_node(&self) -> Option<&TreemapNode> {
        let root = self.root.as_ref()?;
        Some(root.find(&self.focus).unwrap_or(root))
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let (Some(data), Some(root)) = (&self.data, &self.root) else {
            let text = self.message.as_deref().unwrap_or("No Data");
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new(text).size(20.0).color(Color32::GRAY));
            });
            return;
        };

        let mut new_focus: Option<Vec<String>> = None;

        ui.horizontal(|ui| {
            ui.label(RichText::new(&self.title).size(18.0).strong());
            ui.label(
                RichText::new(format!("{} rows, filtered by {}", data.len(), data.metric.label()))
                    .size(12.0)
                    .color(Color32::GRAY),
            );
        });

        ui.horizontal(|ui| {
            if ui.link(TreemapNode::ROOT_LABEL).clicked() {
                new_focus = Some(Vec::new());
            }
            for depth in 0..self.focus.len() {
                ui.label("›");
                if ui.link(&self.focus[depth]).clicked() {
                    new_focus = Some(self.focus[..=depth].to_vec());
                }
            }
        });

        TreemapPlotter::draw_color_legend(ui, data);
        ui.add_space(4.0);

        let node = root.find(&self.focus).unwrap_or(root);
        if let Some(path) = TreemapPlotter::draw_treemap(ui, data, node) {
            new_focus = Some(path);
        }

        if let Some(path) = new_focus {
            tracing::debug!(focus = ?path, "treemap focus changed");
            self.focus = path;
        }
    }
}
