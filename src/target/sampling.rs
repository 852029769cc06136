//! Class-balanced subsampling of labelled proposals.

use rand::Rng;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::target::assignment::SamplingSummary;
use crate::target::label::ProposalLabel;

/// Uniformly pick `amount` distinct elements of `candidates`.
///
/// The result keeps the order in which elements were drawn.
pub fn choose_without_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    candidates: &[usize],
    amount: usize,
) -> Result<Vec<usize>> {
    if amount > candidates.len() {
        return Err(Error::SampleExceedsPopulation {
            requested: amount,
            available: candidates.len(),
        });
    }
    Ok(rand::seq::index::sample(rng, candidates.len(), amount)
        .into_iter()
        .map(|i| candidates[i])
        .collect())
}

fn indices_where(labels: &[ProposalLabel], pred: impl Fn(ProposalLabel) -> bool) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter_map(|(i, &label)| pred(label).then_some(i))
        .collect()
}

/// Cap foreground at `foreground_wanted` and fill the rest of `batch_size`
/// with background.
///
/// Excess foreground becomes [`ProposalLabel::DisabledForeground`]; excess
/// background becomes [`ProposalLabel::Ignore`].
pub(crate) fn subsample<R: Rng + ?Sized>(
    labels: &mut [ProposalLabel],
    batch_size: usize,
    foreground_wanted: usize,
    rng: &mut R,
) -> Result<SamplingSummary> {
    let fg_inds = indices_where(labels, ProposalLabel::is_foreground);
    if fg_inds.len() > foreground_wanted {
        let disable = choose_without_replacement(rng, &fg_inds, fg_inds.len() - foreground_wanted)?;
        trace!(count = disable.len(), "disabling excess foreground proposals");
        for i in disable {
            labels[i] = labels[i].disable();
        }
    } else if fg_inds.len() < foreground_wanted {
        warn!(
            found = fg_inds.len(),
            wanted = foreground_wanted,
            "fewer foreground proposals than the batch asks for"
        );
    }

    let foreground_kept = labels.iter().filter(|l| l.is_foreground()).count();
    let background_wanted = batch_size.saturating_sub(foreground_kept);

    let bg_inds = indices_where(labels, ProposalLabel::is_background);
    if bg_inds.len() > background_wanted {
        let excess = choose_without_replacement(rng, &bg_inds, bg_inds.len() - background_wanted)?;
        trace!(count = excess.len(), "ignoring excess background proposals");
        for i in excess {
            labels[i] = ProposalLabel::Ignore;
        }
    }

    let background_kept = labels.iter().filter(|l| l.is_background()).count();

    Ok(SamplingSummary {
        num_inside: labels.len(),
        foreground_candidates: fg_inds.len(),
        foreground_wanted,
        foreground_kept,
        background_candidates: bg_inds.len(),
        background_wanted,
        background_kept,
    })
}
