//! Error type shared by every stage of target assignment.

use thiserror::Error;

/// Errors raised while validating inputs or running target assignment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Configuration rejected at construction time.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// An input array has the wrong number of columns.
    #[error("invalid shape for {what}: expected {expected} columns, got {got}")]
    InvalidShape {
        what: &'static str,
        expected: &'static str,
        got: usize,
    },

    /// A coordinate or class value is NaN or infinite.
    #[error("non-finite value in {what} at row {row}")]
    NonFinite { what: &'static str, row: usize },

    /// A box has `x2 < x1` or `y2 < y1`.
    #[error("inverted box in {what} at row {row}")]
    InvertedBox { what: &'static str, row: usize },

    /// A ground-truth class id is negative, fractional or `>= num_classes`.
    #[error("invalid class {class} for ground truth row {row} (num_classes = {num_classes})")]
    InvalidClass {
        row: usize,
        class: f32,
        num_classes: usize,
    },

    /// Image height or width is zero.
    #[error("invalid image size {height}x{width}")]
    InvalidImageSize { height: u32, width: u32 },

    /// Scatter indices are out of range, unsorted or mismatched in length.
    #[error("invalid index map: {0}")]
    InvalidIndexMap(String),

    /// Sampling without replacement was asked for more items than exist.
    #[error("cannot sample {requested} items without replacement from {available}")]
    SampleExceedsPopulation { requested: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
