use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the assigner seeds its sampling generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Reseed with the same value before every call, so identical inputs
    /// always produce identical samples.
    Fixed(u64),
    /// Seed once at construction; successive calls continue one stream.
    Stream(u64),
    /// Seed once from the thread-local OS-backed generator.
    Entropy,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        SeedPolicy::Fixed(0)
    }
}

/// Per-component statistics used to standardize regression targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetNormalization {
    pub means: [f32; 4],
    pub stds: [f32; 4],
}

impl TargetNormalization {
    pub fn new(means: [f32; 4], stds: [f32; 4]) -> Self {
        Self { means, stds }
    }

    /// `(target - mean) / std`, component-wise.
    #[inline]
    pub fn apply(&self, target: [f32; 4]) -> [f32; 4] {
        std::array::from_fn(|k| (target[k] - self.means[k]) / self.stds[k])
    }
}

fn default_batch_size() -> usize {
    64
}

fn default_foreground_fraction() -> f32 {
    0.25
}

fn default_foreground_threshold() -> f32 {
    0.5
}

fn default_background_threshold_high() -> f32 {
    0.5
}

fn default_background_threshold_low() -> f32 {
    0.1
}

/// Configuration for the [`ProposalTargetAssigner`](crate::ProposalTargetAssigner).
///
/// Only `num_classes` is required when deserializing; everything else falls
/// back to the defaults of [`TargetConfig::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Number of object classes, background excluded.
    pub num_classes: usize,
    /// Proposals kept per image after subsampling.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Share of the batch reserved for foreground proposals.
    #[serde(default = "default_foreground_fraction")]
    pub foreground_fraction: f32,
    /// Minimum IoU (inclusive) for a proposal to be foreground.
    #[serde(default = "default_foreground_threshold")]
    pub foreground_threshold: f32,
    /// Upper IoU bound (exclusive) for background.
    #[serde(default = "default_background_threshold_high")]
    pub background_threshold_high: f32,
    /// Lower IoU bound (exclusive) for background.
    #[serde(default = "default_background_threshold_low")]
    pub background_threshold_low: f32,
    #[serde(default)]
    pub seed: SeedPolicy,
    #[serde(default)]
    pub normalization: Option<TargetNormalization>,
}

impl TargetConfig {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            batch_size: default_batch_size(),
            foreground_fraction: default_foreground_fraction(),
            foreground_threshold: default_foreground_threshold(),
            background_threshold_high: default_background_threshold_high(),
            background_threshold_low: default_background_threshold_low(),
            seed: SeedPolicy::default(),
            normalization: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_foreground_fraction(mut self, fraction: f32) -> Self {
        self.foreground_fraction = fraction;
        self
    }

    pub fn with_foreground_threshold(mut self, threshold: f32) -> Self {
        self.foreground_threshold = threshold;
        self
    }

    /// Set the open background interval `(low, high)`.
    pub fn with_background_thresholds(mut self, low: f32, high: f32) -> Self {
        self.background_threshold_low = low;
        self.background_threshold_high = high;
        self
    }

    pub fn with_seed(mut self, seed: SeedPolicy) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_normalization(mut self, normalization: TargetNormalization) -> Self {
        self.normalization = Some(normalization);
        self
    }

    /// `floor(foreground_fraction * batch_size)`.
    pub fn foreground_per_batch(&self) -> usize {
        (self.foreground_fraction * self.batch_size as f32).floor() as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(Error::InvalidConfig("num_classes must be at least 1".into()));
        }
        if self.num_classes > i32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "num_classes {} does not fit the i32 label encoding",
                self.num_classes
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }

        let unit = [
            ("foreground_fraction", self.foreground_fraction),
            ("foreground_threshold", self.foreground_threshold),
            ("background_threshold_high", self.background_threshold_high),
            ("background_threshold_low", self.background_threshold_low),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }

        // IoU 0 is reached by disjoint and zero-area boxes alike.
        if self.foreground_threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "foreground_threshold must be positive, got {}",
                self.foreground_threshold
            )));
        }
        if self.background_threshold_low > self.background_threshold_high {
            return Err(Error::InvalidConfig(format!(
                "background_threshold_low ({}) exceeds background_threshold_high ({})",
                self.background_threshold_low, self.background_threshold_high
            )));
        }
        // Background and foreground ranges must not overlap.
        if self.background_threshold_high > self.foreground_threshold {
            return Err(Error::InvalidConfig(format!(
                "background_threshold_high ({}) exceeds foreground_threshold ({})",
                self.background_threshold_high, self.foreground_threshold
            )));
        }

        if let Some(norm) = &self.normalization {
            let finite_means = norm.means.iter().all(|m| m.is_finite());
            let positive_stds = norm.stds.iter().all(|s| s.is_finite() && *s > 0.0);
            if !finite_means || !positive_stds {
                return Err(Error::InvalidConfig(
                    "normalization needs finite means and positive finite stds".into(),
                ));
            }
        }

        Ok(())
    }
}
