//! GUI module - User interface components

mod app;
mod chart_viewer;
mod control_panel;

pub use app::TrendmapApp;
pub use chart_viewer::TreemapViewer;
pub use control_panel::{ControlPanel, ControlPanelAction, StatusKind, UserSettings};
