//! Metric Catalogue
//! Metric columns, widget semantics and the color-gradient orientation lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
    #[error("Invalid hex color: {0}")]
    InvalidColor(String),
}

/// A numeric column the dashboards can size, color or filter by.
/// Serialized as its `key`; deserializes from any spelling `FromStr` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    Position,
    Ctr,
    Impressions,
    Count,
    TaScore,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Position,
        Metric::Ctr,
        Metric::Impressions,
        Metric::Count,
        Metric::TaScore,
    ];

    /// Column name in the source CSV files.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Position => "position",
            Metric::Ctr => "ctr",
            Metric::Impressions => "impressions",
            Metric::Count => "count",
            Metric::TaScore => "TA_score",
        }
    }

    /// Stable snake_case key used in configuration files.
    pub fn key(self) -> &'static str {
        match self {
            Metric::Position => "position",
            Metric::Ctr => "ctr",
            Metric::Impressions => "impressions",
            Metric::Count => "count",
            Metric::TaScore => "ta_score",
        }
    }

    /// Human readable label for widgets and chart titles.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Position => "Position",
            Metric::Ctr => "CTR",
            Metric::Impressions => "Impressions",
            Metric::Count => "Count",
            Metric::TaScore => "Topical Authority",
        }
    }

    pub fn orientation(self) -> Orientation {
        match self {
            Metric::Position => Orientation::LowerIsBetter,
            _ => Orientation::HigherIsBetter,
        }
    }

    /// Slider step for range widgets.
    pub fn step(self) -> f64 {
        match self {
            Metric::Ctr => 0.01,
            _ => 1.0,
        }
    }

    /// Decimal places shown by range widgets.
    pub fn decimals(self) -> usize {
        match self {
            Metric::Ctr => 2,
            _ => 0,
        }
    }

    /// Format a value the way range widgets display it.
    pub fn format_value(self, value: f64) -> String {
        format!("{:.*}", self.decimals(), value)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = MetricError;

    /// Accepts the label, the CSV column or the snake_case name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| {
                wanted.eq_ignore_ascii_case(m.label())
                    || wanted.eq_ignore_ascii_case(m.column())
                    || wanted.eq_ignore_ascii_case(m.key())
            })
            .ok_or_else(|| MetricError::UnknownMetric(wanted.to_string()))
    }
}

impl TryFrom<String> for Metric {
    type Error = MetricError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.key().to_string()
    }
}

/// Which end of a metric's value range is semantically "good".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    LowerIsBetter,
    HigherIsBetter,
}

impl Orientation {
    /// Ordered 3-stop gradient, low value first.
    pub fn gradient(self, palette: &Palette) -> Gradient {
        match self {
            Orientation::LowerIsBetter => Gradient([palette.good, palette.middle, palette.bad]),
            Orientation::HigherIsBetter => Gradient([palette.bad, palette.middle, palette.good]),
        }
    }
}

/// 24-bit RGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation in RGB space, `t` clamped to [0, 1].
    pub fn lerp(self, other: HexColor, t: f64) -> HexColor {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        HexColor::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// Relative luminance in [0, 1], used to pick a readable label color.
    pub fn luminance(self) -> f64 {
        (0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
    }
}

impl FromStr for HexColor {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(MetricError::InvalidColor(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| MetricError::InvalidColor(s.to_string()))
        };
        Ok(HexColor::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for HexColor {
    type Error = MetricError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Semantic treemap colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub good: HexColor,
    pub middle: HexColor,
    pub bad: HexColor,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            good: HexColor::new(0x05, 0x96, 0x69),
            middle: HexColor::new(0xc5, 0xcf, 0xc4),
            bad: HexColor::new(0xef, 0x44, 0x44),
        }
    }
}

/// Ordered three-stop continuous color scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gradient(pub [HexColor; 3]);

impl Gradient {
    pub fn stops(&self) -> &[HexColor; 3] {
        &self.0
    }

    /// Color at position `t` in [0, 1]; stops sit at 0, 0.5 and 1.
    pub fn sample(&self, t: f64) -> HexColor {
        let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
        let [low, mid, high] = self.0;
        if t <= 0.5 {
            low.lerp(mid, t * 2.0)
        } else {
            mid.lerp(high, (t - 0.5) * 2.0)
        }
    }

    /// Color for `value` given the observed `(min, max)` domain.
    /// A degenerate domain maps every value to the middle stop.
    pub fn color_for(&self, value: f64, domain: (f64, f64)) -> HexColor {
        let (min, max) = domain;
        let span = max - min;
        if !span.is_finite() || span <= 0.0 {
            return self.0[1];
        }
        self.sample((value - min) / span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_gradient_runs_good_to_bad() {
        let palette = Palette::default();
        let gradient = Metric::Position.orientation().gradient(&palette);
        assert_eq!(gradient.stops(), &[palette.good, palette.middle, palette.bad]);
    }

    #[test]
    fn higher_is_better_metrics_run_bad_to_good() {
        let palette = Palette::default();
        for metric in [Metric::Ctr, Metric::Impressions, Metric::Count, Metric::TaScore] {
            let gradient = metric.orientation().gradient(&palette);
            assert_eq!(
                gradient.stops(),
                &[palette.bad, palette.middle, palette.good],
                "{metric}"
            );
        }
    }

    #[test]
    fn parses_metric_names_case_insensitively() {
        assert_eq!("CTR".parse::<Metric>().unwrap(), Metric::Ctr);
        assert_eq!("ta_score".parse::<Metric>().unwrap(), Metric::TaScore);
        assert_eq!("TA_score".parse::<Metric>().unwrap(), Metric::TaScore);
        assert_eq!(" impressions ".parse::<Metric>().unwrap(), Metric::Impressions);
        assert!(matches!(
            "bounce".parse::<Metric>(),
            Err(MetricError::UnknownMetric(_))
        ));
    }

    #[test]
    fn hex_color_round_trips_through_text() {
        let color: HexColor = "#059669".parse().unwrap();
        assert_eq!(color, HexColor::new(5, 150, 105));
        assert_eq!(color.to_string(), "#059669");
        assert!("#05966".parse::<HexColor>().is_err());
        assert!("zz9669".parse::<HexColor>().is_err());
    }

    #[test]
    fn gradient_hits_stops_at_ends_and_middle() {
        let palette = Palette::default();
        let gradient = Gradient([palette.bad, palette.middle, palette.good]);
        assert_eq!(gradient.sample(0.0), palette.bad);
        assert_eq!(gradient.sample(0.5), palette.middle);
        assert_eq!(gradient.sample(1.0), palette.good);
        assert_eq!(gradient.sample(7.0), palette.good);
    }

    #[test]
    fn degenerate_domain_uses_middle_stop() {
        let palette = Palette::default();
        let gradient = Metric::Ctr.orientation().gradient(&palette);
        assert_eq!(gradient.color_for(3.0, (3.0, 3.0)), palette.middle);
    }
}
