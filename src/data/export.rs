//! Dataset Export
//! Writes prepared treemap data as CSV (via Polars) or JSON.

use crate::data::pipeline::TreemapData;
use polars::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Render error: {0}")]
    Render(String),
}

/// Build a DataFrame with the hierarchy, priority, size and color columns.
pub fn to_dataframe(data: &TreemapData) -> Result<DataFrame, ExportError> {
    let [category_col, subcategory_col, leaf_col] = &data.path_columns;

    let mut columns = vec![
        Column::new(
            category_col.as_str().into(),
            data.rows.iter().map(|r| r.category.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            subcategory_col.as_str().into(),
            data.rows.iter().map(|r| r.subcategory.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            leaf_col.as_str().into(),
            data.rows.iter().map(|r| r.leaf.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "priority".into(),
            data.rows.iter().map(|r| r.priority).collect::<Vec<_>>(),
        ),
        Column::new(
            data.value_column.as_str().into(),
            data.rows.iter().map(|r| r.size).collect::<Vec<_>>(),
        ),
    ];

    // Size and color share a column when the dashboard sizes by its own metric.
    if data.raw_size_column != data.color_column {
        columns.push(Column::new(
            data.raw_size_column.as_str().into(),
            data.rows.iter().map(|r| r.raw_size).collect::<Vec<_>>(),
        ));
    }
    columns.push(Column::new(
        data.color_column.as_str().into(),
        data.rows.iter().map(|r| r.color).collect::<Vec<_>>(),
    ));

    Ok(DataFrame::new(columns)?)
}

pub fn write_csv(data: &TreemapData, path: &Path) -> Result<(), ExportError> {
    let mut df = to_dataframe(data)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    tracing::info!(path = %path.display(), rows = df.height(), "exported CSV");
    Ok(())
}

pub fn write_json(data: &TreemapData, path: &Path) -> Result<(), ExportError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, data)?;
    tracing::info!(path = %path.display(), rows = data.len(), "exported JSON");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::metric::{Metric, Palette};
    use crate::data::pipeline::TreemapRow;

    fn sample(metric: Metric, size_metric: Metric) -> TreemapData {
        TreemapData {
            rows: vec![TreemapRow {
                category: "Cat".to_string(),
                subcategory: "Sub".to_string(),
                leaf: "q1".to_string(),
                priority: true,
                size: 1e-6,
                raw_size: 100.0,
                color: 5.0,
            }],
            path_columns: ["catg".into(), "subcatg".into(), "query".into()],
            value_column: format!("{}_scaled", size_metric.column()),
            raw_size_column: size_metric.column().to_string(),
            color_column: metric.column().to_string(),
            metric,
            size_metric,
            gradient: metric.orientation().gradient(&Palette::default()),
            color_domain: (5.0, 5.0),
        }
    }

    #[test]
    fn dataframe_has_hierarchy_size_and_color_columns() {
        let df = to_dataframe(&sample(Metric::Position, Metric::Impressions)).expect("frame");
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "catg",
                "subcatg",
                "query",
                "priority",
                "impressions_scaled",
                "impressions",
                "position"
            ]
        );
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn shared_size_and_color_column_is_written_once() {
        let df = to_dataframe(&sample(Metric::Impressions, Metric::Impressions)).expect("frame");
        assert_eq!(df.width(), 6);
    }

    #[test]
    fn writes_csv_and_json_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = sample(Metric::Position, Metric::Impressions);

        let csv_path = dir.path().join("treemap.csv");
        write_csv(&data, &csv_path).expect("csv");
        let csv = std::fs::read_to_string(&csv_path).expect("read csv");
        assert!(csv.starts_with("catg,subcatg,query,priority,impressions_scaled"));
        assert!(csv.contains("Cat,Sub,q1,true"));

        let json_path = dir.path().join("treemap.json");
        write_json(&data, &json_path).expect("json");
        let parsed: TreemapData =
            serde_json::from_reader(File::open(&json_path).expect("open")).expect("parse");
        assert_eq!(parsed, data);
    }
}
