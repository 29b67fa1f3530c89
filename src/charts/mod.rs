//! Charts module - Treemap layout and rendering

mod layout;
mod plotter;
mod renderer;

pub use layout::{hit_test, layout, squarify, Bounds, LayoutStyle, Tile, TreemapNode};
pub use plotter::{parent_path, TreemapPlotter};
pub use renderer::StaticTreemapRenderer;
