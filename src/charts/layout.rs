//! Treemap Layout Module
//! Builds the category → subcategory → leaf hierarchy and lays it out with the
//! squarified algorithm (Bruls, Huizing & van Wijk).

use crate::data::TreemapData;
use std::collections::HashMap;

/// Axis-aligned rectangle in chart coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f64 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.w
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.h
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.max_x() && py >= self.y && py <= self.max_y()
    }

    /// Shrink by the given margins; `None` when nothing is left.
    pub fn inset(&self, left: f64, top: f64, right: f64, bottom: f64) -> Option<Bounds> {
        let w = self.w - left - right;
        let h = self.h - top - bottom;
        if w <= 0.0 || h <= 0.0 {
            None
        } else {
            Some(Bounds::new(self.x + left, self.y + top, w, h))
        }
    }
}

/// Node of the treemap hierarchy. Parent sizes are the sum of their
/// children; parent colors are the size-weighted mean of their children.
#[derive(Debug, Clone, PartialEq)]
pub struct TreemapNode {
    pub label: String,
    /// Labels from the top level down to this node; empty for the root.
    pub path: Vec<String>,
    pub size: f64,
    pub raw_size: f64,
    pub color: f64,
    pub leaves: usize,
    pub priority_leaves: usize,
    pub children: Vec<TreemapNode>,
}

impl TreemapNode {
    pub const ROOT_LABEL: &'static str = "All";

    fn empty(label: &str, path: Vec<String>) -> Self {
        Self {
            label: label.to_string(),
            path,
            size: 0.0,
            raw_size: 0.0,
            color: 0.0,
            leaves: 0,
            priority_leaves: 0,
            children: Vec::new(),
        }
    }

    /// Build the three-level hierarchy. Children keep first-appearance order.
    pub fn build(data: &TreemapData) -> TreemapNode {
        let mut root = TreemapNode::empty(Self::ROOT_LABEL, Vec::new());
        let mut categories: HashMap<String, usize> = HashMap::new();
        let mut subcategories: HashMap<(String, String), usize> = HashMap::new();

        for row in &data.rows {
            let cat_idx = *categories.entry(row.category.clone()).or_insert_with(|| {
                root.children.push(TreemapNode::empty(
                    &row.category,
                    vec![row.category.clone()],
                ));
                root.children.len() - 1
            });
            let category = &mut root.children[cat_idx];

            let sub_key = (row.category.clone(), row.subcategory.clone());
            let sub_idx = *subcategories.entry(sub_key).or_insert_with(|| {
                category.children.push(TreemapNode::empty(
                    &row.subcategory,
                    vec![row.category.clone(), row.subcategory.clone()],
                ));
                category.children.len() - 1
            });
            let subcategory = &mut category.children[sub_idx];

            subcategory.children.push(TreemapNode {
                label: row.leaf.clone(),
                path: vec![
                    row.category.clone(),
                    row.subcategory.clone(),
                    row.leaf.clone(),
                ],
                size: row.size,
                raw_size: row.raw_size,
                color: row.color,
                leaves: 1,
                priority_leaves: usize::from(row.priority),
                children: Vec::new(),
            });
        }

        root.roll_up();
        root
    }

    /// Recompute aggregates of interior nodes from their children.
    fn roll_up(&mut self) {
        if self.children.is_empty() {
            return;
        }
        let mut size = 0.0;
        let mut raw_size = 0.0;
        let mut weighted_color = 0.0;
        let mut leaves = 0;
        let mut priority_leaves = 0;
        for child in &mut self.children {
            child.roll_up();
            size += child.size;
            raw_size += child.raw_size;
            weighted_color += child.color * child.size;
            leaves += child.leaves;
            priority_leaves += child.priority_leaves;
        }
        self.size = size;
        self.raw_size = raw_size;
        self.color = if size > 0.0 { weighted_color / size } else { 0.0 };
        self.leaves = leaves;
        self.priority_leaves = priority_leaves;
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Descend along `path`; an empty path is this node.
    pub fn find(&self, path: &[String]) -> Option<&TreemapNode> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        self.children
            .iter()
            .find(|child| &child.label == first)
            .and_then(|child| child.find(rest))
    }
}

/// Spacing of nested tiles, in chart units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutStyle {
    pub padding: f64,
    pub header: f64,
    /// Tiles narrower or shorter than this are not emitted.
    pub min_extent: f64,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            padding: 2.0,
            header: 18.0,
            min_extent: 1.0,
        }
    }
}

/// A laid-out node. `level` is relative to the focused node (0).
#[derive(Debug, Clone)]
pub struct Tile<'a> {
    pub bounds: Bounds,
    pub node: &'a TreemapNode,
    pub level: usize,
}

/// Lay out `focus` and its descendants inside `bounds`. Parents precede
/// their children, so painting in order nests correctly.
pub fn layout<'a>(focus: &'a TreemapNode, bounds: Bounds, style: &LayoutStyle) -> Vec<Tile<'a>> {
    let mut tiles = vec![Tile {
        bounds,
        node: focus,
        level: 0,
    }];
    layout_children(focus, bounds, 1, style, &mut tiles);
    tiles
}

fn layout_children<'a>(
    node: &'a TreemapNode,
    bounds: Bounds,
    level: usize,
    style: &LayoutStyle,
    tiles: &mut Vec<Tile<'a>>,
) {
    if node.is_leaf() {
        return;
    }
    let Some(inner) = bounds.inset(style.padding, style.header, style.padding, style.padding)
    else {
        return;
    };

    let sizes: Vec<f64> = node.children.iter().map(|c| c.size).collect();
    for (child, rect) in node.children.iter().zip(squarify(&sizes, inner)) {
        if rect.w < style.min_extent || rect.h < style.min_extent {
            continue;
        }
        tiles.push(Tile {
            bounds: rect,
            node: child,
            level,
        });
        layout_children(child, rect, level + 1, style, tiles);
    }
}

/// Deepest tile under a point.
pub fn hit_test<'t, 'a>(tiles: &'t [Tile<'a>], x: f64, y: f64) -> Option<&'t Tile<'a>> {
    tiles.iter().rev().find(|tile| tile.bounds.contains(x, y))
}

/// Squarified partition of `bounds` with areas proportional to `sizes`.
/// Rectangles are returned in input order; non-positive sizes get an empty
/// rectangle.
pub fn squarify(sizes: &[f64], bounds: Bounds) -> Vec<Bounds> {
    let mut out = vec![Bounds::new(bounds.x, bounds.y, 0.0, 0.0); sizes.len()];
    let total: f64 = sizes.iter().filter(|s| **s > 0.0).sum();
    if total <= 0.0 || bounds.area() <= 0.0 {
        return out;
    }

    let scale = bounds.area() / total;
    let mut order: Vec<usize> = (0..sizes.len()).filter(|&i| sizes[i] > 0.0).collect();
    order.sort_by(|&a, &b| {
        sizes[b]
            .partial_cmp(&sizes[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let areas: Vec<(usize, f64)> = order.iter().map(|&i| (i, sizes[i] * scale)).collect();

    let mut rem = bounds;
    let mut start = 0;
    while start < areas.len() {
        let side = rem.w.min(rem.h);
        let mut end = start + 1;
        while end < areas.len()
            && worst_ratio(&areas[start..=end], side) <= worst_ratio(&areas[start..end], side)
        {
            end += 1;
        }

        let row = &areas[start..end];
        let row_area: f64 = row.iter().map(|(_, a)| a).sum();

        if rem.w >= rem.h {
            // Column along the left edge.
            let thickness = if rem.h > 0.0 { row_area / rem.h } else { 0.0 };
            let mut y = rem.y;
            for &(i, area) in row {
                let h = if thickness > 0.0 { area / thickness } else { 0.0 };
                out[i] = Bounds::new(rem.x, y, thickness, h);
                y += h;
            }
            rem.x += thickness;
            rem.w = (rem.w - thickness).max(0.0);
        } else {
            // Row along the top edge.
            let thickness = if rem.w > 0.0 { row_area / rem.w } else { 0.0 };
            let mut x = rem.x;
            for &(i, area) in row {
                let w = if thickness > 0.0 { area / thickness } else { 0.0 };
                out[i] = Bounds::new(x, rem.y, w, thickness);
                x += w;
            }
            rem.y += thickness;
            rem.h = (rem.h - thickness).max(0.0);
        }

        start = end;
    }

    out
}

/// Worst aspect ratio of a strip of `row` laid along a side of length `side`.
fn worst_ratio(row: &[(usize, f64)], side: f64) -> f64 {
    let sum: f64 = row.iter().map(|(_, a)| a).sum();
    let max = row.iter().map(|(_, a)| *a).fold(f64::NEG_INFINITY, f64::max);
    let min = row.iter().map(|(_, a)| *a).fold(f64::INFINITY, f64::min);
    if sum <= 0.0 || side <= 0.0 || min <= 0.0 {
        return f64::INFINITY;
    }
    let side2 = side * side;
    let sum2 = sum * sum;
    (side2 * max / sum2).max(sum2 / (side2 * min))
}
