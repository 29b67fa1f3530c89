//! Trendmap - Treemap dashboards for search-query and entity metrics
//!
//! A Rust application for filtering CSV metrics and exploring them as treemaps.

use anyhow::Context;
use eframe::egui;
use tracing_subscriber::EnvFilter;
use trendmap::config::AppConfig;
use trendmap::gui::TrendmapApp;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(data_root = %config.data_root.display(), "starting trendmap");

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([1000.0, 600.0])
            .with_title("Trendmap"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Trendmap",
        options,
        Box::new(move |cc| Ok(Box::new(TrendmapApp::new(cc, config)))),
    )
    .map_err(|err| anyhow::anyhow!("failed to start UI: {err}"))
}
