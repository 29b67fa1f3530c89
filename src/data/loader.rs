//! CSV Data Loader Module
//! Loads the metrics table and the priority table using Polars.

use crate::data::metric::Metric;
use crate::data::sources::SourcePaths;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Column holding the raw priority indicator, in both tables.
pub const PRIORITY_COLUMN: &str = "priority";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Data source not found: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("Column '{column}' missing from {}", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
}

/// Names of the three hierarchy columns in the metrics file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyColumns {
    pub category: String,
    pub subcategory: String,
    pub leaf: String,
}

impl Default for HierarchyColumns {
    fn default() -> Self {
        Self {
            category: "catg".to_string(),
            subcategory: "subcatg".to_string(),
            leaf: "query".to_string(),
        }
    }
}

impl HierarchyColumns {
    pub fn with_leaf(leaf: &str) -> Self {
        Self {
            leaf: leaf.to_string(),
            ..Self::default()
        }
    }

    pub fn names(&self) -> [String; 3] {
        [
            self.category.clone(),
            self.subcategory.clone(),
            self.leaf.clone(),
        ]
    }
}

/// Fully populated `category → subcategory → leaf` path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HierarchyPath {
    pub category: String,
    pub subcategory: String,
    pub leaf: String,
}

impl HierarchyPath {
    pub fn new(category: &str, subcategory: &str, leaf: &str) -> Self {
        Self {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            leaf: leaf.to_string(),
        }
    }
}

/// One query or entity as read from the metrics file.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub path: HierarchyPath,
    /// Non-null metric values; an absent key is a null cell.
    pub metrics: BTreeMap<Metric, f64>,
    pub priority: Option<bool>,
}

impl MetricRow {
    pub fn new(path: HierarchyPath) -> Self {
        Self {
            path,
            metrics: BTreeMap::new(),
            priority: None,
        }
    }

    pub fn with_metric(mut self, metric: Metric, value: f64) -> Self {
        self.metrics.insert(metric, value);
        self
    }

    pub fn with_priority(mut self, priority: Option<bool>) -> Self {
        self.priority = priority;
        self
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }
}

/// Metrics file contents after path validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    pub rows: Vec<MetricRow>,
    /// Metric columns present in the source file.
    pub metrics: Vec<Metric>,
    /// Rows dropped because part of the hierarchy path was blank.
    pub dropped_rows: usize,
}

impl MetricTable {
    pub fn from_rows(rows: Vec<MetricRow>) -> Self {
        let mut metrics: Vec<Metric> = rows
            .iter()
            .flat_map(|row| row.metrics.keys().copied())
            .collect();
        metrics.sort();
        metrics.dedup();
        Self {
            rows,
            metrics,
            dropped_rows: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Subcategory → priority flag. Subcategories that are not listed are not
/// priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityTable {
    flags: HashMap<String, bool>,
}

impl PriorityTable {
    /// Build from `(subcategory, flag)` entries. A subcategory listed more
    /// than once is priority when any of its entries is.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<bool>)>,
        S: Into<String>,
    {
        let mut flags: HashMap<String, bool> = HashMap::new();
        let mut conflicts = 0usize;
        for (subcategory, flag) in entries {
            let flag = flag.unwrap_or(false);
            match flags.entry(subcategory.into()) {
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    if *entry.get() != flag {
                        conflicts += 1;
                    }
                    *entry.get_mut() |= flag;
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(flag);
                }
            }
        }
        if conflicts > 0 {
            tracing::warn!(conflicts, "priority table lists conflicting flags for a subcategory");
        }
        Self { flags }
    }

    /// Flag for a subcategory; `None` when it is not listed.
    pub fn lookup(&self, subcategory: &str) -> Option<bool> {
        self.flags.get(subcategory).copied()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Parse a boolean-like cell. Anything unrecognised is absent.
pub fn parse_flag(raw: &str) -> Option<bool> {
    let value = raw.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        "" => None,
        other => other.parse::<f64>().ok().map(|v| v != 0.0),
    }
}

/// Handles CSV loading with Polars. Stateless: every call reads from disk.
pub struct DataLoader;

impl DataLoader {
    /// Load both tables of a data source. Both files are checked before
    /// either is read.
    pub fn load(
        sources: &SourcePaths,
        columns: &HierarchyColumns,
        required: &[Metric],
    ) -> Result<(MetricTable, PriorityTable), LoaderError> {
        for path in [&sources.metrics, &sources.priorities] {
            if !path.is_file() {
                return Err(LoaderError::MissingSource(path.clone()));
            }
        }

        let metrics = Self::load_metrics(&sources.metrics, columns, required)?;
        let priorities = Self::load_priorities(&sources.priorities, &columns.subcategory)?;
        Ok((metrics, priorities))
    }

    /// Read a CSV file into a DataFrame. Columns named in `dtypes` that the
    /// file has are read with that type instead of an inferred one.
    pub fn read_csv(path: &Path, dtypes: &[(&str, DataType)]) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::MissingSource(path.to_path_buf()));
        }

        let header = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect_schema()?;
        let overwrite: Schema = dtypes
            .iter()
            .filter(|(name, _)| header.contains(name))
            .map(|(name, dtype)| (PlSmallStr::from(*name), dtype.clone()))
            .collect();

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_dtype_overwrite(Some(Arc::new(overwrite)))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;
        Ok(df)
    }

    /// Load the metrics table, dropping rows with a partial hierarchy path.
    /// `required` metric columns must exist; other known metrics are read
    /// when present.
    pub fn load_metrics(
        path: &Path,
        columns: &HierarchyColumns,
        required: &[Metric],
    ) -> Result<MetricTable, LoaderError> {
        let mut dtypes: Vec<(&str, DataType)> = [
            columns.category.as_str(),
            columns.subcategory.as_str(),
            columns.leaf.as_str(),
            PRIORITY_COLUMN,
        ]
        .into_iter()
        .map(|name| (name, DataType::String))
        .collect();
        dtypes.extend(Metric::ALL.iter().map(|m| (m.column(), DataType::Float64)));
        let df = Self::read_csv(path, &dtypes)?;

        for name in [&columns.category, &columns.subcategory, &columns.leaf] {
            Self::require_column(&df, path, name)?;
        }
        for metric in required {
            Self::require_column(&df, path, metric.column())?;
        }

        let categories = string_values(&df, &columns.category)?;
        let subcategories = string_values(&df, &columns.subcategory)?;
        let leaves = string_values(&df, &columns.leaf)?;

        let present: Vec<Metric> = Metric::ALL
            .into_iter()
            .filter(|m| df.get_column_index(m.column()).is_some())
            .collect();
        let metric_values: Vec<(Metric, Vec<Option<f64>>)> = present
            .iter()
            .map(|&m| float_values(&df, m.column()).map(|values| (m, values)))
            .collect::<Result<_, _>>()?;

        let raw_priority = if df.get_column_index(PRIORITY_COLUMN).is_some() {
            Some(string_values(&df, PRIORITY_COLUMN)?)
        } else {
            None
        };

        let mut rows = Vec::with_capacity(df.height());
        let mut dropped_rows = 0usize;

        for i in 0..df.height() {
            let (Some(category), Some(subcategory), Some(leaf)) =
                (&categories[i], &subcategories[i], &leaves[i])
            else {
                dropped_rows += 1;
                continue;
            };

            let mut row = MetricRow::new(HierarchyPath::new(category, subcategory, leaf));
            for (metric, values) in &metric_values {
                if let Some(v) = values[i] {
                    row.metrics.insert(*metric, v);
                }
            }
            row.priority = raw_priority
                .as_ref()
                .and_then(|flags| flags[i].as_deref())
                .and_then(parse_flag);
            rows.push(row);
        }

        tracing::debug!(
            path = %path.display(),
            rows = rows.len(),
            dropped_rows,
            "loaded metrics table"
        );

        Ok(MetricTable {
            rows,
            metrics: present,
            dropped_rows,
        })
    }

    /// Load the subcategory → priority table.
    pub fn load_priorities(
        path: &Path,
        subcategory_col: &str,
    ) -> Result<PriorityTable, LoaderError> {
        let df = Self::read_csv(
            path,
            &[
                (subcategory_col, DataType::String),
                (PRIORITY_COLUMN, DataType::String),
            ],
        )?;
        Self::require_column(&df, path, subcategory_col)?;
        Self::require_column(&df, path, PRIORITY_COLUMN)?;

        let subcategories = string_values(&df, subcategory_col)?;
        let flags = string_values(&df, PRIORITY_COLUMN)?;

        let table = PriorityTable::from_entries(
            subcategories
                .into_iter()
                .zip(flags)
                .filter_map(|(sub, flag)| sub.map(|s| (s, flag.as_deref().and_then(parse_flag)))),
        );

        tracing::debug!(path = %path.display(), entries = table.len(), "loaded priority table");
        Ok(table)
    }

    fn require_column(df: &DataFrame, path: &Path, name: &str) -> Result<(), LoaderError> {
        if df.get_column_index(name).is_some() {
            Ok(())
        } else {
            Err(LoaderError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
        }
    }
}

/// String cells of a column; blank cells are `None`.
fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, PolarsError> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let ca = series.str()?;
    Ok(ca
        .into_iter()
        .map(|v| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .collect())
}

/// Numeric cells of a column; unparseable and non-finite cells are `None`.
fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, PolarsError> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let ca = series.f64()?;
    Ok(ca.into_iter().map(|v| v.filter(|x| x.is_finite())).collect())
}
