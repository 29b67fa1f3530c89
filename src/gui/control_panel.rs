//! Control Panel Widget
//! Left side panel with data source, metric, range and priority controls.

use crate::config::AppConfig;
use crate::data::Metric;
use crate::stats::{HistogramBin, MetricSummary};
use egui::{Color32, ComboBox, RichText};
use egui_plot::{Bar, BarChart, Plot, VLine};
use std::path::PathBuf;

/// Widget values; every change re-runs the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSettings {
    pub data_root: PathBuf,
    /// Selected subdirectory of `data_root`; `None` reads `data_root` itself.
    pub source: Option<String>,
    /// Name of the selected dashboard.
    pub dashboard: String,
    pub metric: Metric,
    pub range: (f64, f64),
    pub priority_only: bool,
    pub use_prefilter: bool,
}

impl UserSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let first = config.dashboards.first();
        Self {
            data_root: config.data_root.clone(),
            source: None,
            dashboard: first.map(|d| d.name.clone()).unwrap_or_default(),
            metric: first.map(|d| d.default_metric()).unwrap_or(Metric::Position),
            range: (0.0, 0.0),
            priority_only: false,
            use_prefilter: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Left side control panel.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub sources: Vec<String>,
    pub bounds: Option<(f64, f64)>,
    pub summary: Option<MetricSummary>,
    pub histogram: Vec<HistogramBin>,
    pub status: String,
    pub status_kind: StatusKind,
    pub export_enabled: bool,
}

impl ControlPanel {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            settings: UserSettings::from_config(config),
            sources: Vec::new(),
            bounds: None,
            summary: None,
            histogram: Vec::new(),
            status: "Ready".to_string(),
            status_kind: StatusKind::Info,
            export_enabled: false,
        }
    }

    pub fn set_status(&mut self, kind: StatusKind, status: &str) {
        self.status_kind = kind;
        self.status = status.to_string();
    }

    /// Replace the metric summary and reset the range to its full extent.
    pub fn update_summary(&mut self, summary: Option<MetricSummary>, histogram: Vec<HistogramBin>) {
        self.bounds = summary.as_ref().map(|s| s.slider_bounds());
        if let Some(bounds) = self.bounds {
            self.settings.range = bounds;
        }
        self.summary = summary;
        self.histogram = histogram;
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui, config: &AppConfig) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🗺 Trendmap")
                    .size(22.0)
                    .color(Color32::from_rgb(5, 150, 105)),
            );
            ui.label(
                RichText::new("Treemap Trends")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let root_text = self.settings.data_root.display().to_string();
                    ui.label(RichText::new(&root_text).size(12.0));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Browse").clicked() {
                            action = ControlPanelAction::BrowseDataRoot;
                        }
                        if ui.small_button("⟳").on_hover_text("Rescan").clicked() {
                            action = ControlPanelAction::ReloadSources;
                        }
                    });
                });

                if !self.sources.is_empty() {
                    let selected = self.settings.source.clone().unwrap_or_default();
                    ComboBox::from_id_salt("source")
                        .width(200.0)
                        .selected_text(&selected)
                        .show_ui(ui, |ui| {
                            for source in &self.sources {
                                if ui.selectable_label(selected == *source, source).clicked()
                                    && selected != *source
                                {
                                    self.settings.source = Some(source.clone());
                                    action = ControlPanelAction::SelectionChanged;
                                }
                            }
                        });
                }
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Dashboard Section =====
        ui.label(RichText::new("⚙️ Dashboard").size(14.0).strong());
        ui.add_space(5.0);

        for dashboard in &config.dashboards {
            let selected = self.settings.dashboard == dashboard.name;
            if ui.radio(selected, &dashboard.title).clicked() && !selected {
                self.settings.dashboard = dashboard.name.clone();
                self.settings.metric = dashboard.default_metric();
                action = ControlPanelAction::SelectionChanged;
            }
        }

        let Some(dashboard) = config.dashboard(&self.settings.dashboard) else {
            return action;
        };

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.add_sized([110.0, 20.0], egui::Label::new("Metric:"));
            ComboBox::from_id_salt("metric")
                .width(150.0)
                .selected_text(self.settings.metric.label())
                .show_ui(ui, |ui| {
                    for metric in &dashboard.metrics {
                        if ui
                            .selectable_label(self.settings.metric == *metric, metric.label())
                            .clicked()
                            && self.settings.metric != *metric
                        {
                            self.settings.metric = *metric;
                            action = ControlPanelAction::SelectionChanged;
                        }
                    }
                });
        });

        if let Some(threshold) = &dashboard.prefilter {
            let label = format!(
                "Only {} > {}",
                threshold.metric.label(),
                threshold.metric.format_value(threshold.min_exclusive)
            );
            if ui.checkbox(&mut self.settings.use_prefilter, label).changed() {
                action = ControlPanelAction::SelectionChanged;
            }
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Filter Section =====
        ui.label(RichText::new("🔧 Filters").size(14.0).strong());
        ui.add_space(5.0);

        if let Some((min, max)) = self.bounds {
            let metric = self.settings.metric;
            let (mut lo, mut hi) = self.settings.range;

            let lo_response = ui.add(
                egui::Slider::new(&mut lo, min..=max)
                    .step_by(metric.step())
                    .fixed_decimals(metric.decimals())
                    .text("Min"),
            );
            let hi_response = ui.add(
                egui::Slider::new(&mut hi, min..=max)
                    .step_by(metric.step())
                    .fixed_decimals(metric.decimals())
                    .text("Max"),
            );

            if lo > hi {
                if lo_response.changed() {
                    hi = lo;
                } else {
                    lo = hi;
                }
            }
            self.settings.range = (lo, hi);

            let committed = |r: &egui::Response| r.drag_stopped() || (r.changed() && !r.dragged());
            if committed(&lo_response) || committed(&hi_response) {
                action = ControlPanelAction::FilterChanged;
            }

            ui.label(
                RichText::new(format!(
                    "Filtering {}: {} - {}",
                    metric.label(),
                    metric.format_value(lo),
                    metric.format_value(hi)
                ))
                .size(11.0)
                .color(Color32::GRAY),
            );

            self.draw_histogram(ui);
        } else {
            ui.label(RichText::new("No values to filter").color(Color32::GRAY));
        }

        ui.add_space(5.0);
        if ui
            .checkbox(&mut self.settings.priority_only, "Priority subcategories only")
            .changed()
        {
            action = ControlPanelAction::FilterChanged;
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Export Section =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.export_enabled, |ui| {
                let png = egui::Button::new(RichText::new("🖼 Export PNG").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(png).clicked() {
                    action = ControlPanelAction::ExportPng;
                }
                ui.add_space(5.0);
                ui.horizontal(|ui| {
                    if ui.button("Export CSV").clicked() {
                        action = ControlPanelAction::ExportCsv;
                    }
                    if ui.button("Export JSON").clicked() {
                        action = ControlPanelAction::ExportJson;
                    }
                });
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        let status_color = match self.status_kind {
            StatusKind::Error => Color32::from_rgb(220, 53, 69),
            StatusKind::Warning => Color32::from_rgb(243, 156, 18),
            StatusKind::Success => Color32::from_rgb(40, 167, 69),
            StatusKind::Info => Color32::GRAY,
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    fn draw_histogram(&self, ui: &mut egui::Ui) {
        if self.histogram.is_empty() {
            return;
        }
        let bars: Vec<Bar> = self
            .histogram
            .iter()
            .map(|bin| Bar::new(bin.center(), bin.count as f64).width(bin.width()))
            .collect();
        let (lo, hi) = self.settings.range;

        Plot::new("metric_histogram")
            .height(90.0)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .show_axes([true, false])
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).color(Color32::from_rgb(197, 207, 196)));
                plot_ui.vline(VLine::new(lo).color(Color32::from_rgb(5, 150, 105)));
                plot_ui.vline(VLine::new(hi).color(Color32::from_rgb(239, 68, 68)));
            });

        if let Some(summary) = &self.summary {
            ui.label(
                RichText::new(format!(
                    "n={}  mean={:.2}  median={:.2}  p5-p95={:.2}-{:.2}",
                    summary.count, summary.mean, summary.median, summary.p05, summary.p95
                ))
                .size(10.0)
                .color(Color32::GRAY),
            );
        }
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseDataRoot,
    ReloadSources,
    /// Source, dashboard, metric or threshold changed: range bounds reset.
    SelectionChanged,
    /// Range or priority toggle changed.
    FilterChanged,
    ExportPng,
    ExportCsv,
    ExportJson,
}
