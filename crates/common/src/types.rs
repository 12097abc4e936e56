//! Core data model shared by the thread engine, the backends, and the
//! Discord plumbing.

use serde::{Deserialize, Serialize};

/// Opaque platform message identifier (Discord snowflake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque sender identifier. The bot's own id is passed explicitly wherever
/// self-authorship matters; there is no ambient "current client" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(pub u64);

/// Channel the reply chain lives in. Fetches are always scoped to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelRef(pub u64);

/// One chat entry as seen by the resolution engine.
///
/// Owned snapshots: the engine only reads these, it never writes back to the
/// platform. `raw_text` is the displayed content with mentions rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: MessageId,
    pub author_id: AuthorId,
    pub raw_text: String,
    /// Message this one replies to; `None` starts a chain.
    pub parent_id: Option<MessageId>,
    /// True if the message carries non-text media.
    pub has_attachment: bool,
}

impl ThreadMessage {
    pub fn is_authored_by(&self, bot: AuthorId) -> bool {
        self.author_id == bot
    }
}

/// Which completion model family a resolution should be generated with.
///
/// Selected by `!instruct` during chain traversal and returned alongside the
/// resolved prompt, so concurrent resolutions cannot race on shared state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Plain continuation of the prompt text.
    #[default]
    Normal,
    /// Instruction-following model; the prompt is a directive, not a prefix.
    Instruct,
}
