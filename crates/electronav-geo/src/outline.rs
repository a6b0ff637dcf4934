//! Atlas structure outlines on a resolved slice

use crate::slice::{extract_slab, voxel_to_mm, Axis, SliceDescriptor};
use electronav_core::models::VolumeLayer;
use geo::{Area, Centroid, Coord, LineString, Polygon};
use ndarray::Array2;
use serde::Serialize;

/// Moore neighbourhood, clockwise from north in (row, column) steps
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

/// Index of west in `NEIGHBOURS`
const WEST: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureOutline {
    pub label: f32,
    pub axis: Axis,
    /// Closed polylines in scanner millimetres, on the slice plane
    pub contours: Vec<Vec<[f64; 3]>>,
    /// Where to place the label text
    pub anchor: Option<[f64; 3]>,
}

impl StructureOutline {
    fn empty(label: f32, axis: Axis) -> Self {
        Self { label, axis, contours: Vec::new(), anchor: None }
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }
}

/// Trace the outer boundary of every 8-connected component of `mask`.
///
/// Components are visited in raster order. Each contour starts at the
/// component's first pixel in raster order and is closed by repeating it,
/// except for isolated pixels which yield a single point.
pub fn trace_boundaries(mask: &Array2<bool>) -> Vec<Vec<(usize, usize)>> {
    let mut labels = Array2::<usize>::zeros(mask.dim());
    let mut contours = Vec::new();
    let mut next_label = 0;

    for ((r, c), &set) in mask.indexed_iter() {
        if set && labels[(r, c)] == 0 {
            next_label += 1;
            fill_component(mask, &mut labels, (r, c), next_label);
            contours.push(trace_component(&labels, next_label, (r, c)));
        }
    }
    contours
}

fn step(p: (isize, isize), direction: usize) -> (isize, isize) {
    (p.0 + NEIGHBOURS[direction].0, p.1 + NEIGHBOURS[direction].1)
}

fn cell(labels: &Array2<usize>, p: (isize, isize)) -> Option<usize> {
    if p.0 < 0 || p.1 < 0 {
        return None;
    }
    labels.get((p.0 as usize, p.1 as usize)).copied()
}

fn fill_component(mask: &Array2<bool>, labels: &mut Array2<usize>, seed: (usize, usize), label: usize) {
    let mut stack = vec![seed];
    labels[seed] = label;
    while let Some((r, c)) = stack.pop() {
        for direction in 0..NEIGHBOURS.len() {
            let (nr, nc) = step((r as isize, c as isize), direction);
            if nr < 0 || nc < 0 {
                continue;
            }
            let n = (nr as usize, nc as usize);
            if mask.get(n).copied().unwrap_or(false) && labels[n] == 0 {
                labels[n] = label;
                stack.push(n);
            }
        }
    }
}

/// Moore-neighbour tracing with Jacob's stopping criterion
fn trace_component(labels: &Array2<usize>, label: usize, start: (usize, usize)) -> Vec<(usize, usize)> {
    let inside = |p: (isize, isize)| cell(labels, p) == Some(label);
    let start = (start.0 as isize, start.1 as isize);
    let mut contour = vec![(start.0 as usize, start.1 as usize)];

    // the raster-order first pixel always has an empty west neighbour
    let mut backtrack = WEST;
    let mut current = start;
    let mut first_step: Option<(isize, isize)> = None;
    let limit = 4 * labels.len() + 16;

    for _ in 0..limit {
        let found = (1..=NEIGHBOURS.len())
            .map(|k| (backtrack + k) % NEIGHBOURS.len())
            .map(|d| (d, step(current, d)))
            .find(|&(_, p)| inside(p));
        let Some((direction, next)) = found else {
            break;
        };

        if current == start {
            match first_step {
                None => first_step = Some(next),
                Some(first) if first == next => break,
                Some(_) => {}
            }
        }

        let previous = step(current, (direction + NEIGHBOURS.len() - 1) % NEIGHBOURS.len());
        let offset = (previous.0 - next.0, previous.1 - next.1);
        backtrack = NEIGHBOURS.iter().position(|&n| n == offset).unwrap_or(WEST);
        current = next;
        contour.push((current.0 as usize, current.1 as usize));
    }
    contour
}

/// Outline of atlas `label` on an already resolved slice of `layer`.
///
/// The label is folded the same way the layer's samples were, so either
/// hemisphere's code finds the structure. Smoothing never applies here.
pub fn structure_outline(layer: &VolumeLayer, slice: &SliceDescriptor, label: f32) -> StructureOutline {
    let axis = slice.axis;
    if !slice.valid {
        return StructureOutline::empty(label, axis);
    }

    let wanted = match layer.folding() {
        Some(folding) if !layer.is_base() => folding.fold(label),
        _ => label,
    };
    let fixed = axis.fixed();
    let slab = extract_slab(layer.samples(), axis, (slice.index_vox[fixed] - 1) as usize);
    let mask = slab.mapv(|v| (v - wanted).abs() < 0.5);
    if !mask.iter().any(|&m| m) {
        return StructureOutline::empty(label, axis);
    }

    let (row_axis, col_axis) = axis.display_axes();
    let to_mm = |(r, c): (usize, usize)| {
        let mut p = [0.0; 3];
        p[fixed] = slice.position_mm;
        p[row_axis] = voxel_to_mm(layer, row_axis, (r + 1) as f64);
        p[col_axis] = voxel_to_mm(layer, col_axis, (c + 1) as f64);
        p
    };

    let contours: Vec<Vec<[f64; 3]>> = trace_boundaries(&mask)
        .into_iter()
        .map(|contour| contour.into_iter().map(to_mm).collect())
        .collect();

    let anchor = label_anchor(&contours, row_axis, col_axis);
    tracing::debug!(label, axis = %axis, contours = contours.len(), "Traced structure outline");
    StructureOutline { label, axis, contours, anchor }
}

/// Centroid of the largest contour by enclosed area
fn label_anchor(contours: &[Vec<[f64; 3]>], row_axis: usize, col_axis: usize) -> Option<[f64; 3]> {
    let (contour, polygon) = contours
        .iter()
        .map(|contour| {
            let ring: Vec<Coord<f64>> =
                contour.iter().map(|p| Coord { x: p[col_axis], y: p[row_axis] }).collect();
            (contour, Polygon::new(LineString::new(ring), vec![]))
        })
        .max_by(|(_, a), (_, b)| a.unsigned_area().total_cmp(&b.unsigned_area()))?;

    let mut anchor = *contour.first()?;
    if let Some(centre) = polygon.centroid() {
        anchor[col_axis] = centre.x();
        anchor[row_axis] = centre.y();
    }
    Some(anchor)
}
