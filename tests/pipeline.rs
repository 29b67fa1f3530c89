//! End-to-end pipeline runs over CSV fixtures.

use std::fs;
use std::path::Path;
use trendmap::config::DashboardConfig;
use trendmap::data::{
    DataPipeline, HierarchyColumns, Metric, Palette, PipelineConfig, PipelineError, SourcePaths,
    Stage, SCALE_EPSILON,
};

const GSC_METRICS: &str = "\
catg,subcatg,query,position,ctr,impressions,TA_score
Cat,Sub,q1,5,0.12,100,55
Cat,Sub,q2,50,0.01,10,60
Cat,Other,q3,10,0.30,1000,41
Dog,Leash,q4,2.5,0.50,0,90
Dog,Leash,q5,,0.20,30,80
Dog,Bowl,q6,8,0.05,5,40
";

const ENTITY_METRICS: &str = "\
catg,subcatg,entity,count,TA_score
A,X,Y,3,10
A,X,Y,5,20
A,X,Z,1,70
B,W,V,4,
";

fn write_source(dir: &Path, metrics_file: &str, metrics: &str, priorities: &str) -> SourcePaths {
    fs::write(dir.join(metrics_file), metrics).expect("write metrics");
    fs::write(dir.join("priority.csv"), priorities).expect("write priorities");
    SourcePaths::resolve(dir, None, metrics_file, "priority.csv")
}

fn gsc_source(dir: &Path) -> SourcePaths {
    write_source(
        dir,
        "full_matrix.csv",
        GSC_METRICS,
        "subcatg,priority\nSub,True\nLeash,false\nBowl,\n",
    )
}

#[test]
fn scenario_position_range_keeps_q1_with_priority() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sources = write_source(
        dir.path(),
        "full_matrix.csv",
        "catg,subcatg,query,position,impressions,priority\nCat,Sub,q1,5,100,\nCat,Sub,q2,50,10,\n",
        "subcatg,priority\nSub,true\n",
    );
    let config =
        PipelineConfig::for_metric(Metric::Position, Metric::Impressions).with_range(0.0, 10.0);

    let data = DataPipeline::prepare(
        &sources,
        &HierarchyColumns::default(),
        &config,
        &Palette::default(),
    )
    .expect("treemap data");

    assert_eq!(data.len(), 1);
    assert_eq!(data.rows[0].leaf, "q1");
    assert!(data.rows[0].priority);
}

#[test]
fn identical_inputs_give_identical_outputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sources = gsc_source(dir.path());
    let dashboard = DashboardConfig::gsc();
    let config = dashboard.pipeline_config(Metric::Ctr, Some((0.0, 1.0)), false, true);

    let first =
        DataPipeline::prepare(&sources, &dashboard.columns, &config, &Palette::default())
            .expect("first run");
    let second =
        DataPipeline::prepare(&sources, &dashboard.columns, &config, &Palette::default())
            .expect("second run");

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("json"),
        serde_json::to_string(&second).expect("json")
    );
}

#[test]
fn gsc_dashboard_applies_threshold_join_and_scale() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sources = gsc_source(dir.path());
    let dashboard = DashboardConfig::gsc();
    let config = dashboard.pipeline_config(Metric::Position, None, false, true);

    let data = DataPipeline::prepare(&sources, &dashboard.columns, &config, &Palette::default())
        .expect("treemap data");

    // q6 fails TA_score > 40, q5 has no position.
    let leaves: Vec<&str> = data.rows.iter().map(|r| r.leaf.as_str()).collect();
    assert_eq!(leaves, vec!["q1", "q2", "q3", "q4"]);

    for row in &data.rows {
        assert_eq!(row.priority, row.subcategory == "Sub");
        assert!(row.size > 0.0 && row.size <= 1.0 + SCALE_EPSILON);
    }

    let q3 = data.rows.iter().find(|r| r.leaf == "q3").expect("q3");
    let q4 = data.rows.iter().find(|r| r.leaf == "q4").expect("q4");
    assert!((q3.size - (1.0 + SCALE_EPSILON)).abs() < 1e-12);
    assert_eq!(q4.size, SCALE_EPSILON);
    assert_eq!(data.color_domain, (2.5, 50.0));
}

#[test]
fn priority_only_without_priority_rows_is_empty_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sources = gsc_source(dir.path());
    let dashboard = DashboardConfig::gsc();
    // Only the "Dog" rows fall in this range, and neither Dog subcategory is priority.
    let config = dashboard.pipeline_config(Metric::Position, Some((1.0, 3.0)), true, true);

    let err = DataPipeline::prepare(&sources, &dashboard.columns, &config, &Palette::default())
        .expect_err("no priority rows in range");
    assert!(err.is_empty_result());
    assert!(matches!(err, PipelineError::EmptyResult(Stage::Range)));

    let config = dashboard.pipeline_config(Metric::Position, None, true, true);
    let data = DataPipeline::prepare(&sources, &dashboard.columns, &config, &Palette::default())
        .expect("priority rows");
    let leaves: Vec<&str> = data.rows.iter().map(|r| r.leaf.as_str()).collect();
    assert_eq!(leaves, vec!["q1", "q2"]);
}

#[test]
fn range_bounds_are_inclusive() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sources = gsc_source(dir.path());
    let dashboard = DashboardConfig::gsc();
    let config = dashboard.pipeline_config(Metric::Position, Some((5.0, 10.0)), false, true);

    let data = DataPipeline::prepare(&sources, &dashboard.columns, &config, &Palette::default())
        .expect("rows");
    let leaves: Vec<&str> = data.rows.iter().map(|r| r.leaf.as_str()).collect();
    assert_eq!(leaves, vec!["q1", "q3"]);
}

#[test]
fn missing_files_signal_missing_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dashboard = DashboardConfig::gsc();
    let sources = dashboard.sources(dir.path(), Some("absent"));
    let config = dashboard.pipeline_config(Metric::Position, None, false, true);

    let err = DataPipeline::prepare(&sources, &dashboard.columns, &config, &Palette::default())
        .expect_err("nothing on disk");
    assert!(err.is_missing_source());
}

#[test]
fn entity_dashboard_groups_and_averages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sources = write_source(
        dir.path(),
        "grouped_matrix.csv",
        ENTITY_METRICS,
        "subcatg,priority\nX,true\n",
    );
    let dashboard = DashboardConfig::entities();
    let config = dashboard.pipeline_config(Metric::TaScore, None, false, false);

    let data = DataPipeline::prepare(&sources, &dashboard.columns, &config, &Palette::default())
        .expect("entity data");

    // B/W/V has no score and drops out of the color column.
    assert_eq!(data.len(), 2);
    let y = &data.rows[0];
    assert_eq!((y.category.as_str(), y.subcategory.as_str(), y.leaf.as_str()), ("A", "X", "Y"));
    assert_eq!(y.raw_size, 8.0);
    assert_eq!(y.color, 15.0);
    assert!(y.priority);
    assert_eq!(data.value_column, "count_scaled");
    assert_eq!(data.color_column, "TA_score");
    assert_eq!(data.path_columns[2], "entity");

    let palette = Palette::default();
    assert_eq!(data.gradient.stops(), &[palette.bad, palette.middle, palette.good]);
}

#[test]
fn entity_threshold_applies_before_grouping() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sources = write_source(
        dir.path(),
        "grouped_matrix.csv",
        ENTITY_METRICS,
        "subcatg,priority\nW,false\n",
    );
    let dashboard = DashboardConfig::entities();
    let config = dashboard.pipeline_config(Metric::TaScore, None, false, true);

    let data = DataPipeline::prepare(&sources, &dashboard.columns, &config, &Palette::default())
        .expect("entity data");
    assert_eq!(data.len(), 1);
    assert_eq!(data.rows[0].leaf, "Z");
    assert!(!data.rows[0].priority);
}

#[test]
fn zero_padded_subcategories_join_their_priority() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sources = write_source(
        dir.path(),
        "full_matrix.csv",
        "catg,subcatg,query,position,impressions\nCat,007,0042,5,100\nCat,abc,x,6,10\n",
        "subcatg,priority\n007,true\n",
    );
    let config = PipelineConfig::for_metric(Metric::Position, Metric::Impressions);

    let data = DataPipeline::prepare(
        &sources,
        &HierarchyColumns::default(),
        &config,
        &Palette::default(),
    )
    .expect("treemap data");

    let row = &data.rows[0];
    assert_eq!((row.subcategory.as_str(), row.leaf.as_str()), ("007", "0042"));
    assert!(row.priority);
    assert!(!data.rows[1].priority);
}
