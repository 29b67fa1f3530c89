//! Trendmap - Treemap dashboards for search-query and entity metrics
//!
//! Loads metric and priority CSVs, joins, aggregates, filters and scales them
//! into the hierarchical dataset a treemap draws.

pub mod charts;
pub mod config;
pub mod data;
pub mod gui;
pub mod stats;
