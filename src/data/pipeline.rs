//! Treemap Data Pipeline
//! One parameterized pass from source files to the row set the treemap draws.

use crate::data::loader::{DataLoader, HierarchyColumns, LoaderError, MetricTable, PriorityTable};
use crate::data::metric::{Gradient, Metric, Orientation, Palette};
use crate::data::processor::{DataProcessor, JoinedRow, ProcessorError, Stage, Threshold};
use crate::data::sources::SourcePaths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Data source not found: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("No data to display: nothing left after {0}")]
    EmptyResult(Stage),
    #[error("Invalid range: {lo} > {hi}")]
    InvalidRange { lo: f64, hi: f64 },
    #[error(transparent)]
    Load(LoaderError),
}

impl PipelineError {
    pub fn is_missing_source(&self) -> bool {
        matches!(self, PipelineError::MissingSource(_))
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, PipelineError::EmptyResult(_))
    }
}

impl From<LoaderError> for PipelineError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::MissingSource(path) => PipelineError::MissingSource(path),
            other => PipelineError::Load(other),
        }
    }
}

impl From<ProcessorError> for PipelineError {
    fn from(err: ProcessorError) -> Self {
        match err {
            ProcessorError::EmptyResult(stage) => PipelineError::EmptyResult(stage),
            ProcessorError::InvalidRange { lo, hi } => PipelineError::InvalidRange { lo, hi },
        }
    }
}

/// Everything one dashboard interaction selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Filtered and colored by.
    pub metric: Metric,
    /// Summed when aggregating, scaled for node size.
    pub size_metric: Metric,
    pub aggregate: bool,
    pub orientation: Orientation,
    pub priority_only: bool,
    /// Closed range over `metric`; `None` keeps every non-null value.
    pub range: Option<(f64, f64)>,
    pub prefilter: Option<Threshold>,
}

impl PipelineConfig {
    pub fn for_metric(metric: Metric, size_metric: Metric) -> Self {
        Self {
            metric,
            size_metric,
            aggregate: false,
            orientation: metric.orientation(),
            priority_only: false,
            range: None,
            prefilter: None,
        }
    }

    pub fn aggregated(mut self, aggregate: bool) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn with_range(mut self, lo: f64, hi: f64) -> Self {
        self.range = Some((lo, hi));
        self
    }

    pub fn with_priority_only(mut self, priority_only: bool) -> Self {
        self.priority_only = priority_only;
        self
    }

    pub fn with_prefilter(mut self, prefilter: Option<Threshold>) -> Self {
        self.prefilter = prefilter;
        self
    }

    /// Metric columns the source file must provide.
    pub fn required_metrics(&self) -> Vec<Metric> {
        let mut required = vec![self.metric, self.size_metric];
        if let Some(threshold) = &self.prefilter {
            required.push(threshold.metric);
        }
        required.sort();
        required.dedup();
        required
    }
}

/// One treemap leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreemapRow {
    pub category: String,
    pub subcategory: String,
    pub leaf: String,
    pub priority: bool,
    /// Scaled size in `(0, 1 + SCALE_EPSILON]`.
    pub size: f64,
    pub raw_size: f64,
    pub color: f64,
}

/// The finalized dataset handed to chart rendering and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreemapData {
    pub rows: Vec<TreemapRow>,
    pub path_columns: [String; 3],
    pub value_column: String,
    pub raw_size_column: String,
    pub color_column: String,
    pub metric: Metric,
    pub size_metric: Metric,
    pub gradient: Gradient,
    /// Observed `(min, max)` of the color column.
    pub color_domain: (f64, f64),
}

impl TreemapData {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Runs the preparation pipeline. Holds no state between runs.
pub struct DataPipeline;

impl DataPipeline {
    /// Load both tables for `config` from `sources`.
    pub fn load(
        sources: &SourcePaths,
        columns: &HierarchyColumns,
        config: &PipelineConfig,
    ) -> Result<(MetricTable, PriorityTable), PipelineError> {
        let (metrics, priorities) =
            DataLoader::load(sources, columns, &config.required_metrics())?;
        if metrics.is_empty() {
            return Err(PipelineError::EmptyResult(Stage::Load));
        }
        Ok((metrics, priorities))
    }

    /// Load and transform in one call.
    pub fn prepare(
        sources: &SourcePaths,
        columns: &HierarchyColumns,
        config: &PipelineConfig,
        palette: &Palette,
    ) -> Result<TreemapData, PipelineError> {
        let (metrics, priorities) = Self::load(sources, columns, config)?;
        Self::transform(&metrics, &priorities, columns, config, palette)
    }

    /// Values of `config.metric` after join, prefilter and aggregation, the
    /// population range widgets choose from.
    pub fn candidate_values(
        metrics: &MetricTable,
        priorities: &PriorityTable,
        config: &PipelineConfig,
    ) -> Result<Vec<f64>, PipelineError> {
        let rows = Self::base_rows(metrics, priorities, config)?;
        Ok(rows.iter().filter_map(|r| r.value(config.metric)).collect())
    }

    /// Join, prefilter, aggregate, filter and scale loaded tables.
    pub fn transform(
        metrics: &MetricTable,
        priorities: &PriorityTable,
        columns: &HierarchyColumns,
        config: &PipelineConfig,
        palette: &Palette,
    ) -> Result<TreemapData, PipelineError> {
        let rows = Self::base_rows(metrics, priorities, config)?;
        let rows = DataProcessor::filter_priority(rows, config.priority_only)?;
        tracing::debug!(rows = rows.len(), priority_only = config.priority_only, "priority filter");

        let rows = match config.range {
            Some((lo, hi)) => DataProcessor::filter_range(rows, config.metric, lo, hi)?,
            None => {
                let kept: Vec<JoinedRow> = rows
                    .into_iter()
                    .filter(|r| r.value(config.metric).is_some())
                    .collect();
                if kept.is_empty() {
                    return Err(PipelineError::EmptyResult(Stage::Range));
                }
                kept
            }
        };
        tracing::debug!(rows = rows.len(), range = ?config.range, "range filter");

        let raw_sizes: Vec<Option<f64>> =
            rows.iter().map(|r| r.value(config.size_metric)).collect();
        let sizes = DataProcessor::log_minmax_scale(&raw_sizes);

        let treemap_rows: Vec<TreemapRow> = rows
            .into_iter()
            .zip(raw_sizes)
            .zip(sizes)
            .filter_map(|((row, raw_size), size)| {
                let color = row.value(config.metric)?;
                Some(TreemapRow {
                    category: row.path.category,
                    subcategory: row.path.subcategory,
                    leaf: row.path.leaf,
                    priority: row.priority,
                    size,
                    raw_size: raw_size.unwrap_or(0.0),
                    color,
                })
            })
            .collect();

        let color_domain = treemap_rows.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), row| (min.min(row.color), max.max(row.color)),
        );

        tracing::info!(
            metric = config.metric.key(),
            rows = treemap_rows.len(),
            "prepared treemap data"
        );

        Ok(TreemapData {
            rows: treemap_rows,
            path_columns: columns.names(),
            value_column: format!("{}_scaled", config.size_metric.column()),
            raw_size_column: config.size_metric.column().to_string(),
            color_column: config.metric.column().to_string(),
            metric: config.metric,
            size_metric: config.size_metric,
            gradient: config.orientation.gradient(palette),
            color_domain,
        })
    }

    fn base_rows(
        metrics: &MetricTable,
        priorities: &PriorityTable,
        config: &PipelineConfig,
    ) -> Result<Vec<JoinedRow>, PipelineError> {
        if metrics.is_empty() {
            return Err(PipelineError::EmptyResult(Stage::Load));
        }

        let mut rows = DataProcessor::join_priority(&metrics.rows, priorities);
        tracing::debug!(rows = rows.len(), priorities = priorities.len(), "joined priority table");

        if let Some(threshold) = &config.prefilter {
            rows = DataProcessor::apply_threshold(rows, threshold)?;
            tracing::debug!(rows = rows.len(), min_exclusive = threshold.min_exclusive, "prefilter");
        }

        if config.aggregate {
            rows = DataProcessor::aggregate(rows, config.size_metric);
            tracing::debug!(groups = rows.len(), "aggregated rows");
        }

        Ok(rows)
    }
}
