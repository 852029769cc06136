//! Box-delta encoding between proposals and their matched ground truth.

use ndarray::{Array1, Array2, ArrayView2, Axis, stack};

use crate::target::bbox::BoxConvention;

/// Encodes target boxes relative to source boxes and decodes them back.
///
/// `decode(sources, encode(sources, targets))` must reproduce `targets`.
pub trait BoxEncoder {
    /// `K x 4` sources and targets in (x1, y1, x2, y2) -> `K x 4` deltas.
    fn encode(&self, sources: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32>;

    /// `K x 4` sources and deltas -> `K x 4` boxes in (x1, y1, x2, y2).
    fn decode(&self, sources: ArrayView2<f32>, deltas: ArrayView2<f32>) -> Array2<f32>;
}

/// Standard (dx, dy, dw, dh) parameterization.
///
/// `dx = wx * (gx - px) / pw`, `dw = ww * ln(gw / pw)` and likewise for y/h.
#[derive(Debug, Clone, Copy)]
pub struct DeltaEncoder {
    pub weights: (f32, f32, f32, f32),
    pub convention: BoxConvention,
    /// Upper clamp on `dw`/`dh` before exponentiation when decoding.
    pub bbox_xform_clip: f32,
}

impl Default for DeltaEncoder {
    fn default() -> Self {
        Self::new((1.0, 1.0, 1.0, 1.0), BoxConvention::Pixel)
    }
}

impl DeltaEncoder {
    /// Create a new [`DeltaEncoder`] with a `bbox_xform_clip` of `ln(1000/16)`.
    pub fn new(weights: (f32, f32, f32, f32), convention: BoxConvention) -> Self {
        Self {
            weights,
            convention,
            bbox_xform_clip: (1000_f32 / 16_f32).ln(),
        }
    }

    pub fn with_clip(mut self, bbox_xform_clip: f32) -> Self {
        self.bbox_xform_clip = bbox_xform_clip;
        self
    }
}

/// Widths, heights and centers of every row.
fn geometry(
    boxes: ArrayView2<f32>,
    offset: f32,
) -> (Array1<f32>, Array1<f32>, Array1<f32>, Array1<f32>) {
    let widths = &boxes.column(2) - &boxes.column(0) + offset;
    let heights = &boxes.column(3) - &boxes.column(1) + offset;
    let center_x = &boxes.column(0) + &(0.5 * &widths);
    let center_y = &boxes.column(1) + &(0.5 * &heights);
    (widths, heights, center_x, center_y)
}

impl BoxEncoder for DeltaEncoder {
    fn encode(&self, sources: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32> {
        let offset = self.convention.extent_offset();
        let (src_w, src_h, src_cx, src_cy) = geometry(sources, offset);
        let (gt_w, gt_h, gt_cx, gt_cy) = geometry(targets, offset);
        let (wx, wy, ww, wh) = self.weights;

        let dx = wx * (&gt_cx - &src_cx) / &src_w;
        let dy = wy * (&gt_cy - &src_cy) / &src_h;
        let dw = ww * (&gt_w / &src_w).mapv(f32::ln);
        let dh = wh * (&gt_h / &src_h).mapv(f32::ln);

        stack![Axis(1), dx, dy, dw, dh]
    }

    fn decode(&self, sources: ArrayView2<f32>, deltas: ArrayView2<f32>) -> Array2<f32> {
        let offset = self.convention.extent_offset();
        let (widths, heights, center_x, center_y) = geometry(sources, offset);
        let (wx, wy, ww, wh) = self.weights;

        let dx = &deltas.column(0) / wx;
        let dy = &deltas.column(1) / wy;
        // clamp to avoid overflow in exp
        let dw = (&deltas.column(2) / ww).mapv(|x| x.min(self.bbox_xform_clip));
        let dh = (&deltas.column(3) / wh).mapv(|x| x.min(self.bbox_xform_clip));

        let pred_center_x = &dx * &widths + &center_x;
        let pred_center_y = &dy * &heights + &center_y;
        let pred_w = dw.mapv(f32::exp) * &widths;
        let pred_h = dh.mapv(f32::exp) * &heights;

        let x1 = &pred_center_x - &(0.5 * &pred_w);
        let y1 = &pred_center_y - &(0.5 * &pred_h);
        let x2 = &pred_center_x + &(0.5 * &pred_w) - offset;
        let y2 = &pred_center_y + &(0.5 * &pred_h) - offset;

        stack![Axis(1), x1, y1, x2, y2]
    }
}
