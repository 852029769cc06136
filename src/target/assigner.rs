//! Proposal target assignment: labels, class-balanced sampling and box
//! regression targets for the second stage of a two-stage detector.

use ndarray::{ArrayView1, ArrayView2, Axis, s};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::{Error, Result};
use crate::target::assignment::TargetAssignment;
use crate::target::bbox::{BBox, ImageSize};
use crate::target::config::{SeedPolicy, TargetConfig};
use crate::target::encoder::{BoxEncoder, DeltaEncoder};
use crate::target::label::ProposalLabel;
use crate::target::overlap::{Iou, OverlapKernel, max_overlaps};
use crate::target::sampling;
use crate::target::unmap::{unmap, unmap_rows};

fn rng_for(seed: SeedPolicy) -> ChaCha8Rng {
    match seed {
        SeedPolicy::Fixed(seed) | SeedPolicy::Stream(seed) => ChaCha8Rng::seed_from_u64(seed),
        SeedPolicy::Entropy => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}

/// Strip the optional leading batch-index column.
fn proposal_boxes(proposals: ArrayView2<f32>) -> Result<ArrayView2<f32>> {
    match proposals.ncols() {
        4 => Ok(proposals),
        5 => Ok(proposals.slice_move(s![.., 1..])),
        got => Err(Error::InvalidShape {
            what: "proposals",
            expected: "4 (x1, y1, x2, y2) or 5 (batch, x1, y1, x2, y2)",
            got,
        }),
    }
}

fn validate_boxes(boxes: ArrayView2<f32>, what: &'static str) -> Result<()> {
    for (row, values) in boxes.outer_iter().enumerate() {
        let bbox = BBox::from_row(values);
        if !bbox.is_finite() {
            return Err(Error::NonFinite { what, row });
        }
        if bbox.is_inverted() {
            return Err(Error::InvertedBox { what, row });
        }
    }
    Ok(())
}

/// Check `M x 5` ground truth and return the class id of every row.
fn ground_truth_classes(gt_boxes: ArrayView2<f32>, num_classes: usize) -> Result<Vec<u32>> {
    if gt_boxes.ncols() != 5 {
        return Err(Error::InvalidShape {
            what: "ground truth",
            expected: "5 (x1, y1, x2, y2, class)",
            got: gt_boxes.ncols(),
        });
    }
    validate_boxes(gt_boxes.slice(s![.., ..4]), "ground truth")?;

    gt_boxes
        .column(4)
        .iter()
        .enumerate()
        .map(|(row, &class)| {
            if !class.is_finite() {
                return Err(Error::NonFinite {
                    what: "ground truth",
                    row,
                });
            }
            if class < 0.0 || class.fract() != 0.0 || class >= num_classes as f32 {
                return Err(Error::InvalidClass {
                    row,
                    class,
                    num_classes,
                });
            }
            Ok(class as u32)
        })
        .collect()
}

/// Computes training targets for region proposals.
///
/// Overlap and box encoding are pluggable through `O` and `E`; the defaults
/// are IoU and the standard delta parameterization, both measuring boxes in
/// inclusive pixel coordinates ([`BoxConvention::Pixel`](crate::BoxConvention)).
#[derive(Debug, Clone)]
pub struct ProposalTargetAssigner<O = Iou, E = DeltaEncoder> {
    config: TargetConfig,
    overlap: O,
    encoder: E,
    rng: ChaCha8Rng,
}

impl ProposalTargetAssigner {
    pub fn new(config: TargetConfig) -> Result<Self> {
        Self::with_kernels(config, Iou::default(), DeltaEncoder::default())
    }
}

impl<O: OverlapKernel, E: BoxEncoder> ProposalTargetAssigner<O, E> {
    pub fn with_kernels(config: TargetConfig, overlap: O, encoder: E) -> Result<Self> {
        config.validate()?;
        let rng = rng_for(config.seed);
        Ok(Self {
            config,
            overlap,
            encoder,
            rng,
        })
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Label and compute regression targets for every proposal.
    ///
    /// # Arguments
    /// * `proposals` - `N x 4` (x1, y1, x2, y2) or `N x 5` with a leading batch index
    /// * `gt_boxes` - `M x 5` (x1, y1, x2, y2, class), class in `0..num_classes`
    /// * `image` - bounds used to discard proposals crossing the image border
    ///
    /// Sampling draws from the internal generator according to the configured
    /// [`SeedPolicy`].
    pub fn assign(
        &mut self,
        proposals: ArrayView2<f32>,
        gt_boxes: ArrayView2<f32>,
        image: ImageSize,
    ) -> Result<TargetAssignment> {
        if let SeedPolicy::Fixed(seed) = self.config.seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }
        let mut rng = self.rng.clone();
        let assignment = self.assign_with_rng(proposals, gt_boxes, image, &mut rng)?;
        self.rng = rng;
        Ok(assignment)
    }

    /// Same as [`assign`](Self::assign) but draws samples from `rng`,
    /// leaving the internal generator untouched.
    pub fn assign_with_rng<R: Rng + ?Sized>(
        &self,
        proposals: ArrayView2<f32>,
        gt_boxes: ArrayView2<f32>,
        image: ImageSize,
        rng: &mut R,
    ) -> Result<TargetAssignment> {
        // Step 0: Validate everything before any sampling happens
        if image.height == 0 || image.width == 0 {
            return Err(Error::InvalidImageSize {
                height: image.height,
                width: image.width,
            });
        }
        let all_proposals = proposal_boxes(proposals)?;
        validate_boxes(all_proposals, "proposals")?;
        let gt_classes = ground_truth_classes(gt_boxes, self.config.num_classes)?;
        let gt_coords = gt_boxes.slice(s![.., ..4]);

        let num_proposals = all_proposals.nrows();

        // Step 1: Keep only proposals fully inside the image
        let inds_inside: Vec<usize> = all_proposals
            .outer_iter()
            .enumerate()
            .filter_map(|(i, row)| BBox::from_row(row).is_inside(image).then_some(i))
            .collect();
        let inside = all_proposals.select(Axis(0), &inds_inside);

        // Step 2: Best ground truth per proposal
        let overlaps = self.overlap.overlaps(inside.view(), gt_coords);
        let (max_overlap, best_gt) = max_overlaps(&overlaps);

        // Step 3: Background, then foreground on top
        let cfg = &self.config;
        let mut labels: Vec<ProposalLabel> = max_overlap
            .iter()
            .zip(&best_gt)
            .map(|(&iou, gt)| match gt {
                Some(g) if iou >= cfg.foreground_threshold => {
                    ProposalLabel::Foreground(gt_classes[*g])
                }
                _ if iou > cfg.background_threshold_low
                    && iou < cfg.background_threshold_high =>
                {
                    ProposalLabel::Background
                }
                _ => ProposalLabel::Ignore,
            })
            .collect();

        // Step 4: Subsample to the batch size
        let summary = sampling::subsample(
            &mut labels,
            cfg.batch_size,
            cfg.foreground_per_batch(),
            rng,
        )?;

        // Step 5: Regression targets for the surviving foreground
        let positive_inds: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.is_foreground().then_some(i))
            .collect();
        let positive_gt: Vec<usize> = positive_inds
            .iter()
            .filter_map(|&i| best_gt[i])
            .collect();

        let positive_boxes = inside.select(Axis(0), &positive_inds);
        let matched_gt = gt_coords.select(Axis(0), &positive_gt);
        let mut positive_targets = self
            .encoder
            .encode(positive_boxes.view(), matched_gt.view());

        if let Some(norm) = &cfg.normalization {
            for mut row in positive_targets.outer_iter_mut() {
                let normalized = norm.apply([row[0], row[1], row[2], row[3]]);
                for (dst, src) in row.iter_mut().zip(normalized) {
                    *dst = src;
                }
            }
        }
        if let Some(row) = positive_targets
            .outer_iter()
            .position(|t| t.iter().any(|v| !v.is_finite()))
        {
            return Err(Error::NonFinite {
                what: "regression targets",
                row: inds_inside[positive_inds[row]],
            });
        }

        // Step 6: Unmap back to the full proposal set
        let inside_targets = unmap_rows(
            positive_targets.view(),
            inds_inside.len(),
            &positive_inds,
            0.0,
        )?;
        let bbox_targets = unmap_rows(inside_targets.view(), num_proposals, &inds_inside, 0.0)?;
        let labels = unmap(
            ArrayView1::from(&labels[..]),
            num_proposals,
            &inds_inside,
            ProposalLabel::Ignore,
        )?
        .to_vec();

        debug!(
            proposals = num_proposals,
            inside = summary.num_inside,
            gt = gt_classes.len(),
            foreground = summary.foreground_kept,
            background = summary.background_kept,
            disabled = summary.disabled_foreground(),
            "assigned proposal targets"
        );

        Ok(TargetAssignment {
            labels,
            bbox_targets,
            summary,
            num_classes: cfg.num_classes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::bbox::BoxConvention;
    use ndarray::array;

    fn assigner(num_classes: usize) -> ProposalTargetAssigner {
        ProposalTargetAssigner::new(TargetConfig::new(num_classes)).unwrap()
    }

    #[test]
    fn test_batch_column_is_stripped() {
        let proposals = array![[0.0, 0.0, 0.0, 100.0, 100.0]];
        let gt = array![[0.0, 0.0, 100.0, 100.0, 2.0]];
        let out = assigner(3)
            .assign(proposals.view(), gt.view(), ImageSize::new(200, 200))
            .unwrap();
        assert_eq!(out.labels, vec![ProposalLabel::Foreground(2)]);
    }

    #[test]
    fn test_threshold_boundaries() {
        // 100x100 inclusive pixels
        let gt = array![[0.0, 0.0, 99.0, 99.0, 0.0]];
        // IoU 0.5, 0.1, 0.4 and 0.05 against the ground truth.
        let proposals = array![
            [0.0, 0.0, 49.0, 99.0],
            [0.0, 0.0, 9.0, 99.0],
            [0.0, 0.0, 39.0, 99.0],
            [0.0, 0.0, 4.0, 99.0]
        ];
        let out = assigner(1)
            .assign(proposals.view(), gt.view(), ImageSize::new(200, 200))
            .unwrap();
        assert_eq!(
            out.labels,
            vec![
                ProposalLabel::Foreground(0),
                ProposalLabel::Ignore,
                ProposalLabel::Background,
                ProposalLabel::Ignore,
            ]
        );
    }

    #[test]
    fn test_half_overlap_in_pixels_is_foreground() {
        // 100 shared pixels out of a 200 pixel union.
        let gt = array![[0.0, 0.0, 9.0, 19.0, 0.0]];
        let proposals = array![[0.0, 0.0, 9.0, 9.0]];
        let out = assigner(1)
            .assign(proposals.view(), gt.view(), ImageSize::new(50, 50))
            .unwrap();
        assert_eq!(out.labels, vec![ProposalLabel::Foreground(0)]);

        let continuous = ProposalTargetAssigner::with_kernels(
            TargetConfig::new(1),
            Iou::new(BoxConvention::Continuous),
            DeltaEncoder::new((1.0, 1.0, 1.0, 1.0), BoxConvention::Continuous),
        )
        .unwrap()
        .assign(proposals.view(), gt.view(), ImageSize::new(50, 50))
        .unwrap();
        // 81 / 171 under continuous extents
        assert_eq!(continuous.labels, vec![ProposalLabel::Background]);
    }

    #[test]
    fn test_zero_width_boxes_never_become_foreground() {
        let config = TargetConfig::new(1)
            .with_foreground_threshold(1e-3)
            .with_background_thresholds(0.0, 0.0);
        let mut continuous = ProposalTargetAssigner::with_kernels(
            config,
            Iou::new(BoxConvention::Continuous),
            DeltaEncoder::new((1.0, 1.0, 1.0, 1.0), BoxConvention::Continuous),
        )
        .unwrap();
        let image = ImageSize::new(200, 200);

        let gt = array![[0.0, 0.0, 100.0, 100.0, 0.0]];
        let flat_proposal = array![[150.0, 150.0, 150.0, 160.0]];
        let out = continuous.assign(flat_proposal.view(), gt.view(), image).unwrap();
        assert_eq!(out.labels, vec![ProposalLabel::Ignore]);
        assert!(out.bbox_targets.iter().all(|v| v.is_finite()));

        let flat_gt = array![[10.0, 10.0, 10.0, 50.0, 0.0]];
        let proposals = array![[0.0, 0.0, 20.0, 60.0]];
        let out = continuous.assign(proposals.view(), flat_gt.view(), image).unwrap();
        assert_eq!(out.labels, vec![ProposalLabel::Ignore]);
        assert!(out.bbox_targets.iter().all(|v| v.is_finite()));
    }

    /// Reports full overlap for every pair.
    struct Everything;

    impl OverlapKernel for Everything {
        fn overlaps(
            &self,
            boxes: ArrayView2<f32>,
            query_boxes: ArrayView2<f32>,
        ) -> ndarray::Array2<f32> {
            ndarray::Array2::ones((boxes.nrows(), query_boxes.nrows()))
        }
    }

    #[test]
    fn test_non_finite_targets_are_rejected() {
        let mut assigner = ProposalTargetAssigner::with_kernels(
            TargetConfig::new(1),
            Everything,
            DeltaEncoder::new((1.0, 1.0, 1.0, 1.0), BoxConvention::Continuous),
        )
        .unwrap();
        let gt = array![[0.0, 0.0, 100.0, 100.0, 0.0]];
        let proposals = array![[-5.0, 0.0, 10.0, 10.0], [150.0, 150.0, 150.0, 160.0]];
        assert_eq!(
            assigner
                .assign(proposals.view(), gt.view(), ImageSize::new(200, 200))
                .unwrap_err(),
            Error::NonFinite {
                what: "regression targets",
                row: 1
            }
        );
    }

    #[test]
    fn test_gap_between_background_and_foreground_is_ignored() {
        let config = TargetConfig::new(1)
            .with_foreground_threshold(0.7)
            .with_background_thresholds(0.1, 0.5);
        let mut assigner = ProposalTargetAssigner::new(config).unwrap();
        let gt = array![[0.0, 0.0, 99.0, 99.0, 0.0]];
        let proposals = array![[0.0, 0.0, 59.0, 99.0]];
        let out = assigner
            .assign(proposals.view(), gt.view(), ImageSize::new(200, 200))
            .unwrap();
        assert_eq!(out.labels, vec![ProposalLabel::Ignore]);
    }

    #[test]
    fn test_rejects_malformed_input() {
        let mut assigner = assigner(2);
        let image = ImageSize::new(100, 100);
        let gt = array![[0.0, 0.0, 10.0, 10.0, 0.0]];

        let bad_shape = array![[0.0, 0.0, 10.0]];
        assert!(matches!(
            assigner.assign(bad_shape.view(), gt.view(), image),
            Err(Error::InvalidShape { got: 3, .. })
        ));

        let nan = array![[0.0, f32::NAN, 10.0, 10.0]];
        assert!(matches!(
            assigner.assign(nan.view(), gt.view(), image),
            Err(Error::NonFinite { row: 0, .. })
        ));

        let inverted = array![[10.0, 0.0, 0.0, 10.0]];
        assert!(matches!(
            assigner.assign(inverted.view(), gt.view(), image),
            Err(Error::InvertedBox { .. })
        ));

        let proposals = array![[0.0, 0.0, 10.0, 10.0]];
        let bad_class = array![[0.0, 0.0, 10.0, 10.0, 2.0]];
        assert!(matches!(
            assigner.assign(proposals.view(), bad_class.view(), image),
            Err(Error::InvalidClass { row: 0, .. })
        ));
        let fractional = array![[0.0, 0.0, 10.0, 10.0, 0.5]];
        assert!(assigner.assign(proposals.view(), fractional.view(), image).is_err());
        let gt_four_cols = array![[0.0, 0.0, 10.0, 10.0]];
        assert!(assigner.assign(proposals.view(), gt_four_cols.view(), image).is_err());

        assert!(matches!(
            assigner.assign(proposals.view(), gt.view(), ImageSize::new(0, 100)),
            Err(Error::InvalidImageSize { .. })
        ));
    }

    #[test]
    fn test_normalization_is_applied_to_positives() {
        let norm = crate::target::config::TargetNormalization::new(
            [0.0, 0.0, 0.0, 0.0],
            [0.1, 0.1, 0.2, 0.2],
        );
        let mut plain = assigner(1);
        let mut normalized =
            ProposalTargetAssigner::new(TargetConfig::new(1).with_normalization(norm)).unwrap();

        let gt = array![[0.0, 0.0, 99.0, 99.0, 0.0]];
        let proposals = array![[10.0, 0.0, 99.0, 99.0], [0.0, 0.0, 29.0, 99.0]];
        let image = ImageSize::new(200, 200);

        let a = plain.assign(proposals.view(), gt.view(), image).unwrap();
        let b = normalized.assign(proposals.view(), gt.view(), image).unwrap();

        assert_eq!(a.labels, b.labels);
        for k in 0..4 {
            let expected = a.bbox_targets[[0, k]] / norm.stds[k];
            assert!((b.bbox_targets[[0, k]] - expected).abs() < 1e-5);
        }
        assert!(b.bbox_targets.row(1).iter().all(|&v| v == 0.0));
    }
}
