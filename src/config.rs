//! Application Configuration
//! Dashboard presets, data root and palette, read from JSON.

use crate::data::{HierarchyColumns, Metric, Palette, PipelineConfig, SourcePaths, Threshold};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "TRENDMAP_CONFIG";
/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "trendmap.json";
pub const DEFAULT_PRIORITY_FILE: &str = "priority.csv";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// One dashboard: which file it reads and how the pipeline is parameterized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub name: String,
    pub title: String,
    pub metrics_file: String,
    #[serde(default = "default_priority_file")]
    pub priority_file: String,
    #[serde(default)]
    pub columns: HierarchyColumns,
    /// Metrics offered in the metric selector, first is the default.
    pub metrics: Vec<Metric>,
    pub size_metric: Metric,
    #[serde(default)]
    pub aggregate: bool,
    #[serde(default)]
    pub prefilter: Option<Threshold>,
}

fn default_priority_file() -> String {
    DEFAULT_PRIORITY_FILE.to_string()
}

impl DashboardConfig {
    /// Search-query performance (position, CTR, impressions per query).
    pub fn gsc() -> Self {
        Self {
            name: "gsc".to_string(),
            title: "GSC Trends Treemap".to_string(),
            metrics_file: "full_matrix.csv".to_string(),
            priority_file: default_priority_file(),
            columns: HierarchyColumns::with_leaf("query"),
            metrics: vec![Metric::Position, Metric::Ctr, Metric::Impressions],
            size_metric: Metric::Impressions,
            aggregate: false,
            prefilter: Some(Threshold {
                metric: Metric::TaScore,
                min_exclusive: 40.0,
            }),
        }
    }

    /// Entity trends (count and topical authority per entity).
    pub fn entities() -> Self {
        Self {
            name: "entities".to_string(),
            title: "Entities Trends Treemap".to_string(),
            metrics_file: "grouped_matrix.csv".to_string(),
            priority_file: default_priority_file(),
            columns: HierarchyColumns::with_leaf("entity"),
            metrics: vec![Metric::TaScore],
            size_metric: Metric::Count,
            aggregate: true,
            prefilter: Some(Threshold {
                metric: Metric::TaScore,
                min_exclusive: 40.0,
            }),
        }
    }

    pub fn default_metric(&self) -> Metric {
        self.metrics.first().copied().unwrap_or(self.size_metric)
    }

    pub fn sources(&self, data_root: &Path, source: Option<&str>) -> SourcePaths {
        SourcePaths::resolve(data_root, source, &self.metrics_file, &self.priority_file)
    }

    /// Pipeline configuration for one interaction.
    pub fn pipeline_config(
        &self,
        metric: Metric,
        range: Option<(f64, f64)>,
        priority_only: bool,
        use_prefilter: bool,
    ) -> PipelineConfig {
        let mut config = PipelineConfig::for_metric(metric, self.size_metric)
            .aggregated(self.aggregate)
            .with_priority_only(priority_only)
            .with_prefilter(if use_prefilter { self.prefilter } else { None });
        config.range = range;
        config
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default = "default_dashboards")]
    pub dashboards: Vec<DashboardConfig>,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_dashboards() -> Vec<DashboardConfig> {
    vec![DashboardConfig::gsc(), DashboardConfig::entities()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            palette: Palette::default(),
            dashboards: default_dashboards(),
        }
    }
}

impl AppConfig {
    /// Read the file named by `TRENDMAP_CONFIG`, else `trendmap.json` if it
    /// exists, else use the built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_path(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_path(local);
        }
        tracing::debug!("no config file, using defaults");
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::info!(path = %path.display(), dashboards = config.dashboards.len(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dashboards.is_empty() {
            return Err(ConfigError::Invalid("no dashboards configured".to_string()));
        }
        for dashboard in &self.dashboards {
            if dashboard.metrics.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "dashboard '{}' offers no metrics",
                    dashboard.name
                )));
            }
            if dashboard.metrics_file.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "dashboard '{}' has no metrics file",
                    dashboard.name
                )));
            }
        }
        Ok(())
    }

    pub fn dashboard(&self, name: &str) -> Option<&DashboardConfig> {
        self.dashboards.iter().find(|d| d.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_both_dashboards() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        let gsc = config.dashboard("gsc").expect("gsc");
        assert_eq!(gsc.default_metric(), Metric::Position);
        assert!(!gsc.aggregate);
        let entities = config.dashboard("entities").expect("entities");
        assert!(entities.aggregate);
        assert_eq!(entities.size_metric, Metric::Count);
        assert_eq!(entities.columns.leaf, "entity");
    }

    #[test]
    fn dashboard_metrics_accept_columns_and_labels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trendmap.json");
        std::fs::write(
            &path,
            r#"{ "dashboards": [ {
                "name": "authority", "title": "Authority", "metrics_file": "m.csv",
                "metrics": ["TA_score", "CTR", "Topical Authority"], "size_metric": "Impressions"
            } ] }"#,
        )
        .expect("write");

        let config = AppConfig::from_path(&path).expect("config");
        let dashboard = config.dashboard("authority").expect("authority");
        assert_eq!(
            dashboard.metrics,
            vec![Metric::TaScore, Metric::Ctr, Metric::TaScore]
        );
        assert_eq!(dashboard.size_metric, Metric::Impressions);
        assert!(config.dashboard("gsc").is_none());

        let json = serde_json::to_value(dashboard).expect("json");
        assert_eq!(json["metrics"][0], "ta_score");
        assert_eq!(json["size_metric"], "impressions");
    }

    #[test]
    fn unknown_dashboard_metric_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trendmap.json");
        std::fs::write(
            &path,
            r#"{ "dashboards": [ {
                "name": "q", "title": "Q", "metrics_file": "q.csv",
                "metrics": ["bounce"], "size_metric": "impressions"
            } ] }"#,
        )
        .expect("write");

        assert!(matches!(AppConfig::from_path(&path), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trendmap.json");
        std::fs::write(
            &path,
            r##"{ "data_root": "/srv/trends", "palette": { "good": "#00ff00", "middle": "#cccccc", "bad": "#ff0000" } }"##,
        )
        .expect("write");

        let config = AppConfig::from_path(&path).expect("config");
        assert_eq!(config.data_root, PathBuf::from("/srv/trends"));
        assert_eq!(config.palette.good.to_string(), "#00ff00");
        assert_eq!(config.dashboards.len(), 2);
    }

    #[test]
    fn custom_dashboard_without_threshold() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trendmap.json");
        std::fs::write(
            &path,
            r#"{ "dashboards": [ {
                "name": "queries", "title": "Queries", "metrics_file": "q.csv",
                "metrics": ["ctr", "position"], "size_metric": "impressions"
            } ] }"#,
        )
        .expect("write");

        let config = AppConfig::from_path(&path).expect("config");
        let dashboard = &config.dashboards[0];
        assert_eq!(dashboard.priority_file, DEFAULT_PRIORITY_FILE);
        assert_eq!(dashboard.prefilter, None);
        assert_eq!(dashboard.columns, HierarchyColumns::default());

        let pipeline = dashboard.pipeline_config(Metric::Ctr, Some((0.1, 0.5)), true, true);
        assert_eq!(pipeline.range, Some((0.1, 0.5)));
        assert!(pipeline.priority_only);
        assert_eq!(pipeline.size_metric, Metric::Impressions);
    }

    #[test]
    fn rejects_malformed_and_empty_configs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").expect("write");
        assert!(matches!(AppConfig::from_path(&bad), Err(ConfigError::Json { .. })));

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, r#"{ "dashboards": [] }"#).expect("write");
        assert!(matches!(AppConfig::from_path(&empty), Err(ConfigError::Invalid(_))));

        let missing = dir.path().join("missing.json");
        assert!(matches!(AppConfig::from_path(&missing), Err(ConfigError::Io { .. })));
    }
}
