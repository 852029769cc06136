//! Training-target assignment for the second stage of two-stage (R-CNN style)
//! object detectors.
//!
//! Given region proposals and ground-truth boxes, [`ProposalTargetAssigner`]
//! labels every proposal as foreground, background or ignored, subsamples a
//! class-balanced minibatch, and computes box regression targets for the
//! retained positives.

mod error;
pub mod target;

pub use error::{Error, Result};
pub use target::{
    BBox, BoxConvention, BoxEncoder, DeltaEncoder, ImageSize, Iou, OverlapKernel, ProposalLabel,
    ProposalTargetAssigner, SamplingSummary, SeedPolicy, TargetAssignment, TargetConfig,
    TargetNormalization,
};
