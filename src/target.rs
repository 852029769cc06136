mod assigner;
mod assignment;
mod bbox;
mod config;
mod encoder;
mod label;
mod overlap;
mod sampling;
mod unmap;

pub use assigner::ProposalTargetAssigner;
pub use assignment::{SamplingSummary, TargetAssignment};
pub use bbox::{BBox, BoxConvention, ImageSize};
pub use config::{SeedPolicy, TargetConfig, TargetNormalization};
pub use encoder::{BoxEncoder, DeltaEncoder};
pub use label::ProposalLabel;
pub use overlap::{Iou, OverlapKernel, max_overlaps};
pub use sampling::choose_without_replacement;
pub use unmap::{unmap, unmap_rows};
