use thiserror::Error;

use spindle_common::types::MessageId;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum Error {
    /// Reroll on a reply whose parent starts the chain; there is nothing to
    /// regenerate a sibling of.
    #[error("cannot reroll: the replied-to message has no parent of its own")]
    InvalidReroll,

    /// A command that only makes sense as a reply was sent without one.
    #[error("you need to reply to a message to use `{command}`")]
    ReplyRequired { command: &'static str },

    /// The fetch-hop safety ceiling was exceeded; the chain is cyclic or
    /// degenerate.
    #[error("reply chain exceeded {max_hops} fetches at message {at}")]
    HopCeiling { max_hops: usize, at: MessageId },

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl Error {
    /// True when the failure is the user's to fix; surfaced as a corrective
    /// reply instead of being logged as a bug.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidReroll
                | Self::ReplyRequired { .. }
                | Self::Source(SourceError::NotFound { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
