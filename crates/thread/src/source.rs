//! Message fetching seam.
//!
//! The engine never owns platform messages; it reads snapshots through this
//! trait. The Discord implementation lives in `spindle-discord`.

use {async_trait::async_trait, thiserror::Error};

use spindle_common::types::{ChannelRef, MessageId, ThreadMessage};

#[derive(Debug, Error)]
pub enum SourceError {
    /// The id is invalid, deleted, or inaccessible.
    #[error("message {id} not found")]
    NotFound { channel: ChannelRef, id: MessageId },

    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SourceError {
    #[must_use]
    pub fn transport(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Fetch a message by identifier within a channel.
///
/// Implementations should prefer an in-memory recency cache before a remote
/// fetch; within one resolution the same id may be requested more than once.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch(
        &self,
        channel: ChannelRef,
        id: MessageId,
    ) -> Result<ThreadMessage, SourceError>;
}
