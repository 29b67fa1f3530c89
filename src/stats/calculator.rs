//! Statistics Calculator Module
//! Summaries of a metric column used to seed and annotate range widgets.

use crate::data::Metric;
use statrs::statistics::{Data, Median, OrderStatistics, Statistics};

/// Descriptive statistics of one metric over the candidate rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub metric: Metric,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p05: f64,
    pub p95: f64,
}

/// One histogram bar, `[start, end)` except the last which is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

pub struct StatsCalculator;

impl StatsCalculator {
    /// Summarize finite values; `None` when there are none.
    pub fn summarize(metric: Metric, values: &[f64]) -> Option<MetricSummary> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }

        let min = Statistics::min(finite.iter());
        let max = Statistics::max(finite.iter());
        let mean = Statistics::mean(finite.iter());

        let mut data = Data::new(finite.clone());
        let median = data.median();
        let p05 = data.percentile(5);
        let p95 = data.percentile(95);

        Some(MetricSummary {
            metric,
            count: finite.len(),
            min,
            max,
            mean,
            median,
            p05,
            p95,
        })
    }

    /// Equal-width histogram over the observed range.
    pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || bins == 0 {
            return Vec::new();
        }

        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max <= min {
            return vec![HistogramBin {
                start: min - 0.5,
                end: min + 0.5,
                count: finite.len(),
            }];
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for v in &finite {
            let idx = (((v - min) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                start: min + i as f64 * width,
                end: min + (i + 1) as f64 * width,
                count,
            })
            .collect()
    }
}

impl MetricSummary {
    /// Slider bounds that contain every observed value. Integer-step
    /// metrics widen to whole numbers.
    pub fn slider_bounds(&self) -> (f64, f64) {
        if self.metric.decimals() == 0 {
            (self.min.floor(), self.max.ceil())
        } else {
            let scale = 10f64.powi(self.metric.decimals() as i32);
            ((self.min * scale).floor() / scale, (self.max * scale).ceil() / scale)
        }
    }
}
