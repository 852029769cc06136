/// Training label of a single proposal.
///
/// Class ids are the 0-based ground-truth classes; the numeric encoding in
/// [`ProposalLabel::raw`] shifts them by one so that 0 stays background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProposalLabel {
    /// Not part of the training batch
    #[default]
    Ignore,
    /// Negative sample
    Background,
    /// Positive sample matched to a ground-truth class
    Foreground(u32),
    /// Foreground candidate dropped by subsampling, kept for diagnostics
    DisabledForeground(u32),
}

impl ProposalLabel {
    /// Numeric encoding: `-1` ignore, `0` background, `class + 1`
    /// foreground, `-(class + 1)` disabled foreground.
    ///
    /// A disabled foreground of class 0 encodes as `-1`, the same value as
    /// `Ignore`; match on the enum when the distinction matters.
    #[inline]
    pub fn raw(self) -> i32 {
        match self {
            ProposalLabel::Ignore => -1,
            ProposalLabel::Background => 0,
            ProposalLabel::Foreground(class) => class as i32 + 1,
            ProposalLabel::DisabledForeground(class) => -(class as i32 + 1),
        }
    }

    #[inline]
    pub fn is_foreground(self) -> bool {
        matches!(self, ProposalLabel::Foreground(_))
    }

    #[inline]
    pub fn is_background(self) -> bool {
        matches!(self, ProposalLabel::Background)
    }

    /// Whether the proposal takes part in the training batch.
    #[inline]
    pub fn is_sampled(self) -> bool {
        matches!(self, ProposalLabel::Foreground(_) | ProposalLabel::Background)
    }

    /// Ground-truth class, for both active and disabled foreground.
    #[inline]
    pub fn class_id(self) -> Option<u32> {
        match self {
            ProposalLabel::Foreground(class) | ProposalLabel::DisabledForeground(class) => {
                Some(class)
            }
            _ => None,
        }
    }

    /// Turn an active foreground label into its disabled form.
    #[inline]
    pub fn disable(self) -> Self {
        match self {
            ProposalLabel::Foreground(class) => ProposalLabel::DisabledForeground(class),
            other => other,
        }
    }
}
