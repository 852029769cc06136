//! Pairwise overlap kernels and per-proposal best-match reduction.

use ndarray::{Array2, ArrayView2, Axis};

use crate::target::bbox::{BBox, BoxConvention};

/// Computes the overlap matrix between two box sets.
///
/// Implementations receive `N x 4` and `M x 4` views in (x1, y1, x2, y2)
/// order and must return an `N x M` matrix with values in `[0, 1]`,
/// including the empty `N x 0` / `0 x M` cases.
pub trait OverlapKernel {
    fn overlaps(&self, boxes: ArrayView2<f32>, query_boxes: ArrayView2<f32>) -> Array2<f32>;
}

/// Intersection-over-Union kernel. Defaults to inclusive pixel extents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iou {
    pub convention: BoxConvention,
}

impl Iou {
    pub fn new(convention: BoxConvention) -> Self {
        Self { convention }
    }
}

impl OverlapKernel for Iou {
    fn overlaps(&self, boxes: ArrayView2<f32>, query_boxes: ArrayView2<f32>) -> Array2<f32> {
        let boxes_a: Vec<BBox> = boxes.outer_iter().map(BBox::from_row).collect();
        let boxes_b: Vec<BBox> = query_boxes.outer_iter().map(BBox::from_row).collect();

        let mut overlaps = Array2::zeros((boxes_a.len(), boxes_b.len()));
        for (i, a) in boxes_a.iter().enumerate() {
            for (j, b) in boxes_b.iter().enumerate() {
                overlaps[[i, j]] = a.iou(b, self.convention);
            }
        }
        overlaps
    }
}

/// Row-wise max and argmax of an overlap matrix.
///
/// Ties resolve to the first column reaching the maximum. With zero columns
/// every max is 0 and no best match exists.
pub fn max_overlaps(overlaps: &Array2<f32>) -> (Vec<f32>, Vec<Option<usize>>) {
    overlaps
        .axis_iter(Axis(0))
        .map(|row| {
            let mut best: Option<(usize, f32)> = None;
            for (j, &value) in row.iter().enumerate() {
                match best {
                    Some((_, current)) if value <= current => {}
                    _ => best = Some((j, value)),
                }
            }
            match best {
                Some((j, value)) => (value, Some(j)),
                None => (0.0, None),
            }
        })
        .unzip()
}
