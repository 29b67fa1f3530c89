//! Static Chart Renderer
//! Renders the treemap to a PNG image.
//!
//! Layout:
//! 1. Title: "{metric} treemap" with the active path
//! 2. Treemap tiles, same squarified layout as the interactive view
//! 3. Color bar with the color-domain bounds underneath

use crate::charts::layout::{layout, Bounds, LayoutStyle, TreemapNode};
use crate::charts::plotter::tile_color;
use crate::data::export::ExportError;
use crate::data::{HexColor, TreemapData};
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use std::io::Cursor;
use std::path::Path;

const TITLE_H: u32 = 36;
const LEGEND_H: u32 = 40;
const MARGIN: u32 = 10;
const LEGEND_STEPS: u32 = 100;
const MIN_EXTENT: u32 = 200;

fn rgb(color: HexColor) -> RGBColor {
    RGBColor(color.r, color.g, color.b)
}

fn render_err(err: impl std::fmt::Display) -> ExportError {
    ExportError::Render(err.to_string())
}

pub struct StaticTreemapRenderer;

impl StaticTreemapRenderer {
    /// Render `focus` of `data` into PNG bytes.
    pub fn render_png(
        data: &TreemapData,
        focus: &TreemapNode,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, ExportError> {
        if width < MIN_EXTENT || height < MIN_EXTENT {
            return Err(ExportError::Render(format!(
                "image size {}x{} is too small",
                width, height
            )));
        }

        let mut buffer = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;
            let mut labels = true;

            let title = if focus.path.is_empty() {
                format!("{} treemap", data.metric.label())
            } else {
                format!("{} treemap: {}", data.metric.label(), focus.path.join(" / "))
            };
            Self::draw_text(
                &root,
                title,
                (MARGIN as i32, MARGIN as i32),
                ("sans-serif", 20).into_font().color(&BLACK),
                &mut labels,
            );

            let chart = Bounds::new(
                MARGIN as f64,
                (TITLE_H + MARGIN) as f64,
                (width - 2 * MARGIN) as f64,
                (height - TITLE_H - LEGEND_H - 2 * MARGIN) as f64,
            );
            let tiles = layout(focus, chart, &LayoutStyle::default());
            let label_style = ("sans-serif", 12).into_font();

            for tile in &tiles {
                let b = tile.bounds;
                let corners = [
                    (b.x.round() as i32, b.y.round() as i32),
                    (b.max_x().round() as i32, b.max_y().round() as i32),
                ];
                let fill = tile_color(data, tile);
                root.draw(&Rectangle::new(corners, rgb(fill).filled()))
                    .map_err(render_err)?;
                root.draw(&Rectangle::new(corners, WHITE.stroke_width(1)))
                    .map_err(render_err)?;

                if b.w > 40.0 && b.h > 16.0 {
                    let text_color = if fill.luminance() > 0.6 { BLACK } else { WHITE };
                    let label = Self::fit_label(&tile.node.label, b.w);
                    Self::draw_text(
                        &root,
                        label,
                        (b.x as i32 + 4, b.y as i32 + 3),
                        label_style.clone().color(&text_color),
                        &mut labels,
                    );
                }
            }

            Self::draw_legend(&root, data, width, height, &mut labels)?;
            root.present().map_err(render_err)?;
        }

        let img = RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| ExportError::Render("pixel buffer size mismatch".to_string()))?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(render_err)?;
        Ok(bytes)
    }

    /// Render and write to `path`.
    pub fn render_png_file(
        data: &TreemapData,
        focus: &TreemapNode,
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), ExportError> {
        let bytes = Self::render_png(data, focus, width, height)?;
        std::fs::write(path, bytes)?;
        tracing::info!(path = %path.display(), width, height, "exported treemap image");
        Ok(())
    }

    fn draw_legend<DB: DrawingBackend>(
        root: &DrawingArea<DB, plotters::coord::Shift>,
        data: &TreemapData,
        width: u32,
        height: u32,
        labels: &mut bool,
    ) -> Result<(), ExportError> {
        let bar_w = (width / 3).max(LEGEND_STEPS);
        let bar_h = 12i32;
        let x0 = ((width - bar_w) / 2) as i32;
        let y0 = (height - LEGEND_H) as i32 + 4;
        let step = bar_w as f64 / LEGEND_STEPS as f64;

        for i in 0..LEGEND_STEPS {
            let t = i as f64 / (LEGEND_STEPS - 1) as f64;
            let left = x0 + (i as f64 * step) as i32;
            let right = x0 + ((i + 1) as f64 * step).ceil() as i32;
            root.draw(&Rectangle::new(
                [(left, y0), (right, y0 + bar_h)],
                rgb(data.gradient.sample(t)).filled(),
            ))
            .map_err(render_err)?;
        }

        let (min, max) = data.color_domain;
        let style = ("sans-serif", 12).into_font().color(&BLACK);
        Self::draw_text(
            root,
            data.metric.format_value(min),
            (x0 - 40, y0),
            style.clone(),
            labels,
        );
        Self::draw_text(
            root,
            data.metric.format_value(max),
            (x0 + bar_w as i32 + 6, y0),
            style.clone(),
            labels,
        );
        Self::draw_text(
            root,
            data.metric.label().to_string(),
            (x0, y0 + bar_h + 4),
            style,
            labels,
        );
        Ok(())
    }

    /// Draw text while `enabled`. The first failure (usually no usable
    /// font) disables text for the rest of the image.
    fn draw_text<DB: DrawingBackend>(
        root: &DrawingArea<DB, plotters::coord::Shift>,
        text: String,
        pos: (i32, i32),
        style: TextStyle<'_>,
        enabled: &mut bool,
    ) {
        if !*enabled {
            return;
        }
        if let Err(err) = root.draw(&Text::new(text, pos, style)) {
            tracing::warn!(error = %err, "cannot draw text, rendering without labels");
            *enabled = false;
        }
    }

    /// Truncate a label to roughly fit `width` pixels at 12px.
    fn fit_label(label: &str, width: f64) -> String {
        let max_chars = ((width - 8.0) / 7.0).max(1.0) as usize;
        if label.chars().count() <= max_chars {
            label.to_string()
        } else {
            let kept: String = label.chars().take(max_chars.saturating_sub(1)).collect();
            format!("{}…", kept)
        }
    }
}
