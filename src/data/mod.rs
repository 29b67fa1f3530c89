//! Data module - CSV loading, joining and treemap preparation

pub mod export;
mod loader;
mod metric;
mod pipeline;
mod processor;
mod sources;

pub use loader::{
    parse_flag, DataLoader, HierarchyColumns, HierarchyPath, LoaderError, MetricRow, MetricTable,
    PriorityTable, PRIORITY_COLUMN,
};
pub use metric::{Gradient, HexColor, Metric, MetricError, Orientation, Palette};
pub use pipeline::{DataPipeline, PipelineConfig, PipelineError, TreemapData, TreemapRow};
pub use processor::{DataProcessor, JoinedRow, ProcessorError, Stage, Threshold, SCALE_EPSILON};
pub use sources::{list_sources, SourcePaths};
