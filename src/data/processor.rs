//! Data Processor Module
//! Join, aggregation, filtering and size scaling of metric rows.

use crate::data::loader::{HierarchyPath, MetricRow, PriorityTable};
use crate::data::metric::Metric;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Added to every scaled size so no treemap node has zero area.
pub const SCALE_EPSILON: f64 = 1e-6;

/// Pipeline stage that produced an empty row set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Prefilter,
    Priority,
    Range,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Prefilter => "authority threshold",
            Stage::Priority => "priority filter",
            Stage::Range => "range filter",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("No rows left after {0}")]
    EmptyResult(Stage),
    #[error("Invalid range: {lo} > {hi}")]
    InvalidRange { lo: f64, hi: f64 },
}

/// Metric row after the priority join; the flag is always resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub path: HierarchyPath,
    pub metrics: BTreeMap<Metric, f64>,
    pub priority: bool,
}

impl JoinedRow {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }
}

/// Keep rows whose `metric` is strictly greater than `min_exclusive`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub metric: Metric,
    pub min_exclusive: f64,
}

/// Stateless row transformations shared by every dashboard.
pub struct DataProcessor;

impl DataProcessor {
    /// Left-join rows to the priority table on subcategory. The table is
    /// authoritative: a row's own flag is discarded, unlisted
    /// subcategories are not priority.
    pub fn join_priority(rows: &[MetricRow], table: &PriorityTable) -> Vec<JoinedRow> {
        rows.iter()
            .map(|row| JoinedRow {
                path: row.path.clone(),
                metrics: row.metrics.clone(),
                priority: table.lookup(&row.path.subcategory).unwrap_or(false),
            })
            .collect()
    }

    /// Apply an authority threshold. Rows with a null value are dropped.
    pub fn apply_threshold(
        rows: Vec<JoinedRow>,
        threshold: &Threshold,
    ) -> Result<Vec<JoinedRow>, ProcessorError> {
        let kept: Vec<JoinedRow> = rows
            .into_iter()
            .filter(|row| {
                row.value(threshold.metric)
                    .is_some_and(|v| v > threshold.min_exclusive)
            })
            .collect();
        Self::non_empty(kept, Stage::Prefilter)
    }

    /// Collapse rows sharing a full hierarchy path. `sum_metric` is summed,
    /// every other metric is averaged over its non-null values. Groups come
    /// out in first-appearance order.
    pub fn aggregate(rows: Vec<JoinedRow>, sum_metric: Metric) -> Vec<JoinedRow> {
        struct Group {
            path: HierarchyPath,
            priority: bool,
            sums: BTreeMap<Metric, f64>,
            counts: BTreeMap<Metric, usize>,
        }

        let mut index: HashMap<HierarchyPath, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();

        for row in rows {
            let slot = match index.get(&row.path) {
                Some(&slot) => slot,
                None => {
                    index.insert(row.path.clone(), groups.len());
                    groups.push(Group {
                        path: row.path.clone(),
                        priority: row.priority,
                        sums: BTreeMap::new(),
                        counts: BTreeMap::new(),
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[slot];
            // Flags are broadcast per subcategory, so this is a no-op after a join.
            group.priority |= row.priority;
            for (metric, value) in row.metrics {
                *group.sums.entry(metric).or_insert(0.0) += value;
                *group.counts.entry(metric).or_insert(0) += 1;
            }
        }

        groups
            .into_iter()
            .map(|group| {
                let metrics = group
                    .sums
                    .iter()
                    .map(|(&metric, &sum)| {
                        let value = if metric == sum_metric {
                            sum
                        } else {
                            sum / group.counts[&metric] as f64
                        };
                        (metric, value)
                    })
                    .collect();
                JoinedRow {
                    path: group.path,
                    metrics,
                    priority: group.priority,
                }
            })
            .collect()
    }

    /// Return all rows, or only priority rows when `priority_only` is set.
    pub fn filter_priority(
        rows: Vec<JoinedRow>,
        priority_only: bool,
    ) -> Result<Vec<JoinedRow>, ProcessorError> {
        if !priority_only {
            return Ok(rows);
        }
        let kept = rows.into_iter().filter(|row| row.priority).collect();
        Self::non_empty(kept, Stage::Priority)
    }

    /// Keep rows with `lo <= value <= hi`. Null values never match.
    pub fn filter_range(
        rows: Vec<JoinedRow>,
        metric: Metric,
        lo: f64,
        hi: f64,
    ) -> Result<Vec<JoinedRow>, ProcessorError> {
        if lo.is_nan() || hi.is_nan() || lo > hi {
            return Err(ProcessorError::InvalidRange { lo, hi });
        }
        let kept = rows
            .into_iter()
            .filter(|row| row.value(metric).is_some_and(|v| lo <= v && v <= hi))
            .collect();
        Self::non_empty(kept, Stage::Range)
    }

    /// `minmax(log1p(max(raw, 0))) + SCALE_EPSILON`. Null raw values count
    /// as zero; an all-equal input normalizes to zero.
    pub fn log_minmax_scale(raw: &[Option<f64>]) -> Vec<f64> {
        let logs: Vec<f64> = raw
            .iter()
            .map(|v| v.unwrap_or(0.0).max(0.0).ln_1p())
            .collect();

        let min = logs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;

        logs.iter()
            .map(|&v| {
                let normalized = if span.is_finite() && span > 0.0 {
                    (v - min) / span
                } else {
                    0.0
                };
                normalized + SCALE_EPSILON
            })
            .collect()
    }

    fn non_empty(rows: Vec<JoinedRow>, stage: Stage) -> Result<Vec<JoinedRow>, ProcessorError> {
        if rows.is_empty() {
            Err(ProcessorError::EmptyResult(stage))
        } else {
            Ok(rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(leaf: &str, priority: bool, metrics: &[(Metric, f64)]) -> JoinedRow {
        JoinedRow {
            path: HierarchyPath::new("A", "X", leaf),
            metrics: metrics.iter().copied().collect(),
            priority,
        }
    }

    #[test]
    fn join_overwrites_row_flag_and_defaults_to_false() {
        let rows = vec![
            MetricRow::new(HierarchyPath::new("Cat", "Sub", "q1")).with_priority(Some(false)),
            MetricRow::new(HierarchyPath::new("Cat", "Other", "q2")).with_priority(Some(true)),
            MetricRow::new(HierarchyPath::new("Cat", "Sub", "q3")),
        ];
        let table = PriorityTable::from_entries(vec![("Sub", Some(true))]);

        let out = DataProcessor::join_priority(&rows, &table);
        let flags: Vec<bool> = out.iter().map(|r| r.priority).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn aggregate_sums_count_and_averages_score() {
        let rows = vec![
            joined("Y", false, &[(Metric::Count, 3.0), (Metric::TaScore, 10.0)]),
            joined("Z", false, &[(Metric::Count, 1.0), (Metric::TaScore, 50.0)]),
            joined("Y", false, &[(Metric::Count, 5.0), (Metric::TaScore, 20.0)]),
        ];
        let out = DataProcessor::aggregate(rows, Metric::Count);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].path.leaf, "Y");
        assert_eq!(out[0].value(Metric::Count), Some(8.0));
        assert_eq!(out[0].value(Metric::TaScore), Some(15.0));
        assert_eq!(out[1].path.leaf, "Z");
    }

    #[test]
    fn aggregate_mean_skips_nulls() {
        let rows = vec![
            joined("Y", false, &[(Metric::Count, 2.0), (Metric::TaScore, 30.0)]),
            joined("Y", false, &[(Metric::Count, 2.0)]),
        ];
        let out = DataProcessor::aggregate(rows, Metric::Count);
        assert_eq!(out[0].value(Metric::TaScore), Some(30.0));
        assert_eq!(out[0].value(Metric::Count), Some(4.0));
    }

    #[test]
    fn priority_only_with_no_matches_is_empty_result() {
        let rows = vec![joined("q1", false, &[]), joined("q2", false, &[])];
        assert_eq!(
            DataProcessor::filter_priority(rows.clone(), true),
            Err(ProcessorError::EmptyResult(Stage::Priority))
        );
        assert_eq!(DataProcessor::filter_priority(rows, false).map(|r| r.len()), Ok(2));
    }

    #[test]
    fn range_filter_is_inclusive_and_drops_nulls() {
        let rows = vec![
            joined("lo", false, &[(Metric::Position, 1.0)]),
            joined("mid", false, &[(Metric::Position, 5.5)]),
            joined("hi", false, &[(Metric::Position, 10.0)]),
            joined("out", false, &[(Metric::Position, 10.5)]),
            joined("null", false, &[]),
        ];
        let out = DataProcessor::filter_range(rows, Metric::Position, 1.0, 10.0).expect("rows");
        let leaves: Vec<&str> = out.iter().map(|r| r.path.leaf.as_str()).collect();
        assert_eq!(leaves, vec!["lo", "mid", "hi"]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let rows = vec![joined("q", false, &[(Metric::Ctr, 0.5)])];
        assert!(matches!(
            DataProcessor::filter_range(rows, Metric::Ctr, 0.9, 0.1),
            Err(ProcessorError::InvalidRange { .. })
        ));
    }

    #[test]
    fn threshold_is_strict() {
        let rows = vec![
            joined("at", false, &[(Metric::TaScore, 40.0)]),
            joined("above", false, &[(Metric::TaScore, 40.5)]),
            joined("null", false, &[]),
        ];
        let threshold = Threshold {
            metric: Metric::TaScore,
            min_exclusive: 40.0,
        };
        let out = DataProcessor::apply_threshold(rows, &threshold).expect("rows");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.leaf, "above");
    }

    #[test]
    fn scale_maps_extremes_and_floors_negatives() {
        let scaled = DataProcessor::log_minmax_scale(&[Some(0.0), Some(99.0), Some(-5.0), None]);
        assert_eq!(scaled[0], SCALE_EPSILON);
        assert!((scaled[1] - (1.0 + SCALE_EPSILON)).abs() < 1e-12);
        assert_eq!(scaled[2], SCALE_EPSILON);
        assert_eq!(scaled[3], SCALE_EPSILON);
    }

    #[test]
    fn scale_of_equal_values_is_epsilon() {
        let scaled = DataProcessor::log_minmax_scale(&[Some(7.0), Some(7.0)]);
        assert_eq!(scaled, vec![SCALE_EPSILON, SCALE_EPSILON]);
    }
}
