//! Trendmap Main Application
//! Main window with control panel and treemap viewer. Every interaction
//! re-runs the data pipeline synchronously from the source files.

use crate::charts::StaticTreemapRenderer;
use crate::config::{AppConfig, DashboardConfig};
use crate::data::export::{self, ExportError};
use crate::data::{list_sources, DataPipeline, PipelineError, TreemapData};
use crate::gui::control_panel::StatusKind;
use crate::gui::{ControlPanel, ControlPanelAction, TreemapViewer};
use crate::stats::StatsCalculator;
use egui::SidePanel;
use std::path::PathBuf;

const EXPORT_WIDTH: u32 = 1600;
const EXPORT_HEIGHT: u32 = 1000;
const HISTOGRAM_BINS: usize = 30;

/// Main application window.
pub struct TrendmapApp {
    config: AppConfig,
    control_panel: ControlPanel,
    viewer: TreemapViewer,
}

impl TrendmapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let mut app = Self {
            control_panel: ControlPanel::new(&config),
            viewer: TreemapViewer::new(),
            config,
        };
        app.reload_sources();
        app.handle_selection_changed();
        app
    }

    fn dashboard(&self) -> Option<&DashboardConfig> {
        self.config.dashboard(&self.control_panel.settings.dashboard)
    }

    /// Rescan the data root for source directories.
    fn reload_sources(&mut self) {
        let root = self.control_panel.settings.data_root.clone();
        match list_sources(&root) {
            Ok(sources) => {
                let keep = self
                    .control_panel
                    .settings
                    .source
                    .as_ref()
                    .is_some_and(|s| sources.contains(s));
                if !keep {
                    self.control_panel.settings.source = sources.first().cloned();
                }
                tracing::debug!(root = %root.display(), sources = sources.len(), "scanned data root");
                self.control_panel.sources = sources;
            }
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "cannot list data root");
                self.control_panel.sources.clear();
                self.control_panel.settings.source = None;
            }
        }
    }

    fn handle_browse_data_root(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_directory(&self.control_panel.settings.data_root)
            .pick_folder()
        {
            self.control_panel.settings.data_root = path;
            self.control_panel.settings.source = None;
            self.reload_sources();
            self.handle_selection_changed();
        }
    }

    /// Source, dashboard or metric changed: recompute range bounds, then draw.
    fn handle_selection_changed(&mut self) {
        let Some(dashboard) = self.dashboard().cloned() else {
            self.control_panel
                .set_status(StatusKind::Error, "No dashboard configured");
            return;
        };

        let settings = &mut self.control_panel.settings;
        if !dashboard.metrics.contains(&settings.metric) {
            settings.metric = dashboard.default_metric();
        }

        let sources = dashboard.sources(&settings.data_root, settings.source.as_deref());
        let config =
            dashboard.pipeline_config(settings.metric, None, false, settings.use_prefilter);

        let values = DataPipeline::load(&sources, &dashboard.columns, &config).and_then(
            |(metrics, priorities)| DataPipeline::candidate_values(&metrics, &priorities, &config),
        );

        match values {
            Ok(values) => {
                let summary = StatsCalculator::summarize(config.metric, &values);
                let histogram = StatsCalculator::histogram(&values, HISTOGRAM_BINS);
                self.control_panel.update_summary(summary, histogram);
                self.handle_filter_changed();
            }
            Err(err) => {
                self.control_panel.update_summary(None, Vec::new());
                self.show_error(&err);
            }
        }
    }

    /// Range or priority toggle changed: re-run the pipeline.
    fn handle_filter_changed(&mut self) {
        let Some(dashboard) = self.dashboard().cloned() else {
            return;
        };
        let settings = &self.control_panel.settings;
        let sources = dashboard.sources(&settings.data_root, settings.source.as_deref());
        let range = self.control_panel.bounds.map(|_| settings.range);
        let config = dashboard.pipeline_config(
            settings.metric,
            range,
            settings.priority_only,
            settings.use_prefilter,
        );

        match DataPipeline::prepare(&sources, &dashboard.columns, &config, &self.config.palette) {
            Ok(data) => self.show_data(data, &dashboard.title),
            Err(err) => self.show_error(&err),
        }
    }

    fn show_data(&mut self, data: TreemapData, title: &str) {
        let rows = data.len();
        self.viewer.set_data(data, title);
        self.control_panel.export_enabled = self.viewer.has_data();
        self.control_panel
            .set_status(StatusKind::Success, &format!("Showing {} rows", rows));
    }

    fn show_error(&mut self, err: &PipelineError) {
        let (kind, message) = match err {
            PipelineError::MissingSource(_) => (StatusKind::Error, err.to_string()),
            PipelineError::EmptyResult(_) => (StatusKind::Warning, err.to_string()),
            _ => (StatusKind::Error, format!("Error: {}", err)),
        };
        tracing::info!(error = %err, "pipeline stopped");
        self.viewer.clear(&message);
        self.control_panel.export_enabled = self.viewer.has_data();
        self.control_panel.set_status(kind, &message);
    }

    fn pick_export_path(extension: &str, label: &str) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter(label, &[extension])
            .set_file_name(format!("treemap.{}", extension))
            .save_file()
    }

    fn handle_export(&mut self, action: &ControlPanelAction) {
        let (Some(data), Some(focus)) = (&self.viewer.data, self.viewer.focus_node()) else {
            self.control_panel
                .set_status(StatusKind::Warning, "Nothing to export");
            return;
        };

        let (extension, label) = match action {
            ControlPanelAction::ExportPng => ("png", "PNG Image"),
            ControlPanelAction::ExportCsv => ("csv", "CSV Files"),
            _ => ("json", "JSON Files"),
        };
        let Some(path) = Self::pick_export_path(extension, label) else {
            return; // User cancelled
        };

        let result: Result<(), ExportError> = match action {
            ControlPanelAction::ExportPng => StaticTreemapRenderer::render_png_file(
                data,
                focus,
                &path,
                EXPORT_WIDTH,
                EXPORT_HEIGHT,
            ),
            ControlPanelAction::ExportCsv => export::write_csv(data, &path),
            _ => export::write_json(data, &path),
        };

        match result {
            Ok(()) => {
                self.control_panel.set_status(
                    StatusKind::Success,
                    &format!("Exported {}", path.display()),
                );
                if matches!(action, ControlPanelAction::ExportPng) {
                    if let Err(err) = open::that(&path) {
                        tracing::warn!(path = %path.display(), error = %err, "cannot open export");
                    }
                }
            }
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "export failed");
                self.control_panel
                    .set_status(StatusKind::Error, &format!("Export error: {}", err));
            }
        }
    }
}

impl eframe::App for TrendmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui, &self.config);

                    match action {
                        ControlPanelAction::BrowseDataRoot => self.handle_browse_data_root(),
                        ControlPanelAction::ReloadSources => {
                            self.reload_sources();
                            self.handle_selection_changed();
                        }
                        ControlPanelAction::SelectionChanged => self.handle_selection_changed(),
                        ControlPanelAction::FilterChanged => self.handle_filter_changed(),
                        ControlPanelAction::ExportPng
                        | ControlPanelAction::ExportCsv
                        | ControlPanelAction::ExportJson => self.handle_export(&action),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Treemap Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            self.viewer.show(ui);
        });
    }
}
