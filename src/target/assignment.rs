//! Output of a target-assignment pass.

use ndarray::{Array1, Array2, s};

use crate::error::{Error, Result};
use crate::target::label::ProposalLabel;

/// Per-call sampling counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplingSummary {
    /// Proposals that passed the inside-image filter
    pub num_inside: usize,
    /// Foreground proposals before subsampling
    pub foreground_candidates: usize,
    /// `floor(foreground_fraction * batch_size)`
    pub foreground_wanted: usize,
    pub foreground_kept: usize,
    /// Background proposals before subsampling
    pub background_candidates: usize,
    /// `batch_size - foreground_kept`
    pub background_wanted: usize,
    pub background_kept: usize,
}

impl SamplingSummary {
    /// Fewer foreground candidates than the batch asked for.
    pub fn has_foreground_shortfall(&self) -> bool {
        self.foreground_candidates < self.foreground_wanted
    }

    pub fn disabled_foreground(&self) -> usize {
        self.foreground_candidates - self.foreground_kept
    }

    /// Proposals that take part in the training batch.
    pub fn batch_len(&self) -> usize {
        self.foreground_kept + self.background_kept
    }
}

/// Labels and regression targets for every input proposal.
#[derive(Debug, Clone)]
pub struct TargetAssignment {
    /// One label per input proposal, in input order
    pub labels: Vec<ProposalLabel>,
    /// `N x 4` (dx, dy, dw, dh); zero for every non-foreground row
    pub bbox_targets: Array2<f32>,
    pub summary: SamplingSummary,
    pub(crate) num_classes: usize,
}

impl TargetAssignment {
    /// Object classes (background excluded) the labels were assigned over.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in their numeric encoding (see [`ProposalLabel::raw`]).
    pub fn raw_labels(&self) -> Array1<i32> {
        self.labels.iter().map(|l| l.raw()).collect()
    }

    /// Indices of proposals labelled foreground.
    pub fn foreground_indices(&self) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.is_foreground().then_some(i))
            .collect()
    }

    /// Expand the `N x 4` targets into a class-specific `N x 4 * (num_classes + 1)`
    /// layout.
    ///
    /// Only the column block of each foreground row's label (`class + 1`)
    /// holds its targets; the matching block of the weights matrix is set to
    /// `inside_weights`. Block 0 (background) is always zero. Fails with
    /// [`Error::InvalidClass`] if a label was edited to a class outside
    /// `0..num_classes`.
    pub fn expand_per_class(
        &self,
        inside_weights: [f32; 4],
    ) -> Result<(Array2<f32>, Array2<f32>)> {
        let n = self.labels.len();
        let width = 4 * (self.num_classes + 1);
        let mut targets = Array2::<f32>::zeros((n, width));
        let mut weights = Array2::<f32>::zeros((n, width));

        for (index, label) in self.labels.iter().enumerate() {
            if let ProposalLabel::Foreground(class) = *label {
                let class = class as usize;
                if class >= self.num_classes {
                    return Err(Error::InvalidClass {
                        row: index,
                        class: class as f32,
                        num_classes: self.num_classes,
                    });
                }
                let start = 4 * (class + 1);
                let end = start + 4;
                targets
                    .slice_mut(s![index, start..end])
                    .assign(&self.bbox_targets.row(index));
                weights
                    .slice_mut(s![index, start..end])
                    .assign(&Array1::from(inside_weights.to_vec()));
            }
        }

        Ok((targets, weights))
    }
}
