//! Stats module - Metric summaries for range widgets

mod calculator;

pub use calculator::{HistogramBin, MetricSummary, StatsCalculator};
