//! Reply-chain traversal: turns a chain of reply-linked messages into one
//! ordered prompt.

use tracing::{debug, warn};

use spindle_common::types::{ChannelRef, GenerationMode, MessageId, ThreadMessage};

use crate::{
    commands::{Command, CommandSet},
    error::{Error, Result},
    normalize::Normalizer,
    source::MessageSource,
};

/// Content-contributing hops walked before a chain is truncated to the
/// triggering message. `continue`/`reroll` skips do not consume this budget,
/// so a user can continue arbitrarily many times without losing context.
pub const MAX_DEPTH: usize = 64;

/// Hard ceiling on total fetches per resolution, skips included. The reply
/// graph comes from outside and nothing guarantees it is acyclic.
pub const MAX_HOPS: usize = 512;

/// A fully resolved chain: the assembled prompt plus the generation mode any
/// `!instruct` along the way selected. Returning the mode (instead of setting
/// shared state) keeps concurrent resolutions independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub prompt: String,
    pub mode: GenerationMode,
}

/// `continue`, `reroll`, and `archive` only make sense as replies; catch the
/// confused case before any traversal starts.
pub fn require_reply_target(message: &ThreadMessage, commands: &CommandSet) -> Result<()> {
    if message.parent_id.is_some() {
        return Ok(());
    }
    for command in [Command::Continue, Command::Reroll, Command::Archive] {
        if commands.contains(command) {
            return Err(Error::ReplyRequired {
                command: command.name(),
            });
        }
    }
    Ok(())
}

/// Walks reply chains through a [`MessageSource`] and assembles prompts.
pub struct ThreadResolver<S> {
    source: S,
    normalizer: Normalizer,
}

impl<S: MessageSource> ThreadResolver<S> {
    pub fn new(source: S, normalizer: Normalizer) -> Self {
        Self { source, normalizer }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Resolve the chain ending at `start` into a single prompt.
    ///
    /// Rules, in precedence order at each visited message:
    ///
    /// 1. no parent, or the depth budget is spent (and we are not archiving):
    ///    the message's own cleaned text ends the walk;
    /// 2. `continue`: the message is pure instruction — move to the parent at
    ///    the same depth, contributing no text;
    /// 3. `reroll`: skip the parent and move to the grandparent at the same
    ///    depth, regenerating a sibling response to the same stimulus; a
    ///    parent without its own parent makes the reroll invalid;
    /// 4. otherwise: this message contributes its cleaned text, an unbroken
    ///    run of parent `continue` instructions collapses to its ultimate
    ///    target, and the walk moves there one depth deeper.
    ///
    /// Fragments are joined oldest-to-newest with no separator: the backend
    /// continues text mid-stream, so each fragment picks up exactly where
    /// the previous one stopped. Archiving ignores the depth budget (the
    /// whole chain is captured) and emphasizes human-authored fragments.
    pub async fn resolve(
        &self,
        channel: ChannelRef,
        start: &ThreadMessage,
        archiving: bool,
    ) -> Result<Resolution> {
        let mut mode = GenerationMode::Normal;
        // Collected newest-to-oldest, reversed once at the end.
        let mut fragments: Vec<String> = Vec::new();
        let mut current = start.clone();
        let mut depth = 0usize;
        let mut hops = 0usize;

        loop {
            let commands = CommandSet::parse(self.normalizer.detag(&current.raw_text));
            if commands.contains(Command::Instruct) {
                mode = GenerationMode::Instruct;
            }

            let Some(parent_id) = current.parent_id else {
                fragments.push(self.normalizer.clean(&current, &commands, archiving));
                break;
            };
            if depth >= MAX_DEPTH && !archiving {
                fragments.push(self.normalizer.clean(&current, &commands, archiving));
                break;
            }

            if commands.contains(Command::Continue) {
                current = self.fetch(channel, parent_id, &mut hops).await?;
                continue;
            }

            if commands.contains(Command::Reroll) {
                let parent = self.fetch(channel, parent_id, &mut hops).await?;
                let Some(grandparent_id) = parent.parent_id else {
                    return Err(Error::InvalidReroll);
                };
                current = self.fetch(channel, grandparent_id, &mut hops).await?;
                continue;
            }

            // Ancestor walk: the one step that accumulates text.
            fragments.push(self.normalizer.clean(&current, &commands, archiving));

            let mut parent = self.fetch(channel, parent_id, &mut hops).await?;
            loop {
                let parent_commands = CommandSet::parse(self.normalizer.detag(&parent.raw_text));
                if parent_commands.contains(Command::Instruct) {
                    mode = GenerationMode::Instruct;
                }
                match parent.parent_id {
                    Some(next) if parent_commands.contains(Command::Continue) => {
                        parent = self.fetch(channel, next, &mut hops).await?;
                    },
                    _ => break,
                }
            }

            depth += 1;
            current = parent;
        }

        fragments.reverse();
        let prompt = fragments.concat();
        debug!(
            start = %start.id,
            chars = prompt.len(),
            depth,
            hops,
            mode = ?mode,
            archiving,
            "thread resolved"
        );
        Ok(Resolution { prompt, mode })
    }

    async fn fetch(
        &self,
        channel: ChannelRef,
        id: MessageId,
        hops: &mut usize,
    ) -> Result<ThreadMessage> {
        *hops += 1;
        if *hops > MAX_HOPS {
            warn!(%id, max_hops = MAX_HOPS, "reply chain hit the fetch ceiling");
            return Err(Error::HopCeiling {
                max_hops: MAX_HOPS,
                at: id,
            });
        }
        Ok(self.source.fetch(channel, id).await?)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use {async_trait::async_trait, spindle_common::types::AuthorId};

    use {super::*, crate::source::SourceError};

    const BOT: AuthorId = AuthorId(1);
    const USER: AuthorId = AuthorId(2);
    const CHANNEL: ChannelRef = ChannelRef(7);

    struct MapSource {
        messages: HashMap<MessageId, ThreadMessage>,
    }

    #[async_trait]
    impl MessageSource for MapSource {
        async fn fetch(
            &self,
            channel: ChannelRef,
            id: MessageId,
        ) -> std::result::Result<ThreadMessage, SourceError> {
            self.messages
                .get(&id)
                .cloned()
                .ok_or(SourceError::NotFound { channel, id })
        }
    }

    fn message(id: u64, author: AuthorId, text: &str, parent: Option<u64>) -> ThreadMessage {
        ThreadMessage {
            id: MessageId(id),
            author_id: author,
            raw_text: text.to_string(),
            parent_id: parent.map(MessageId),
            has_attachment: false,
        }
    }

    fn resolver(messages: Vec<ThreadMessage>) -> ThreadResolver<MapSource> {
        let source = MapSource {
            messages: messages.into_iter().map(|m| (m.id, m)).collect(),
        };
        ThreadResolver::new(source, Normalizer::new("<@1>", BOT))
    }

    async fn resolve(
        messages: Vec<ThreadMessage>,
        start: u64,
        archiving: bool,
    ) -> Result<Resolution> {
        let start = messages
            .iter()
            .find(|m| m.id == MessageId(start))
            .cloned()
            .unwrap();
        resolver(messages).resolve(CHANNEL, &start, archiving).await
    }

    #[tokio::test]
    async fn plain_chain_concatenates_in_order() {
        let messages = vec![
            message(1, USER, "one", None),
            message(2, BOT, "two", Some(1)),
            message(3, USER, "three", Some(2)),
        ];
        let resolution = resolve(messages, 3, false).await.unwrap();
        assert_eq!(resolution.prompt, "onetwothree");
        assert_eq!(resolution.mode, GenerationMode::Normal);
    }

    #[tokio::test]
    async fn join_policy_example() {
        let messages = vec![
            message(1, USER, "Once upon a time", None),
            message(2, USER, "!continue", Some(1)),
            message(3, USER, "there was a fox", Some(2)),
        ];
        let resolution = resolve(messages, 3, false).await.unwrap();
        assert_eq!(resolution.prompt, "Once upon a timethere was a fox");
    }

    #[tokio::test]
    async fn continue_trigger_matches_resolving_parent_directly() {
        let messages = vec![
            message(1, USER, "a beginning", None),
            message(2, BOT, "a middle", Some(1)),
            message(3, USER, "<@1> !continue", Some(2)),
        ];
        let via_continue = resolve(messages.clone(), 3, false).await.unwrap();
        let direct = resolve(messages, 2, false).await.unwrap();
        assert_eq!(via_continue, direct);
    }

    #[tokio::test]
    async fn continue_run_collapses_to_ultimate_target() {
        let messages = vec![
            message(1, USER, "root", None),
            message(2, USER, "!c", Some(1)),
            message(3, USER, "!continue", Some(2)),
            message(4, USER, "tail", Some(3)),
        ];
        let resolution = resolve(messages, 4, false).await.unwrap();
        assert_eq!(resolution.prompt, "roottail");
    }

    #[tokio::test]
    async fn reroll_without_grandparent_is_invalid() {
        let messages = vec![
            message(1, USER, "root", None),
            message(2, USER, "<@1> !reroll", Some(1)),
        ];
        let err = resolve(messages, 2, false).await.unwrap_err();
        assert!(matches!(err, Error::InvalidReroll));
        assert!(err.is_user_error());
    }

    #[tokio::test]
    async fn reroll_skips_both_intermediate_texts() {
        let messages = vec![
            message(1, USER, "stimulus", None),
            message(2, BOT, "rejected response", Some(1)),
            message(3, USER, "!r", Some(2)),
        ];
        let resolution = resolve(messages, 3, false).await.unwrap();
        assert_eq!(resolution.prompt, "stimulus");
    }

    #[tokio::test]
    async fn instruct_anywhere_switches_mode() {
        let messages = vec![
            message(1, USER, "<@1> !i tell a story about a cabbage", None),
            message(2, BOT, " and so on", Some(1)),
            message(3, USER, "more please", Some(2)),
        ];
        let resolution = resolve(messages, 3, false).await.unwrap();
        assert_eq!(resolution.mode, GenerationMode::Instruct);
        assert_eq!(
            resolution.prompt,
            "tell a story about a cabbageand so onmore please"
        );
    }

    #[tokio::test]
    async fn depth_budget_truncates_long_chains() {
        let mut messages = vec![message(1, USER, "m1;", None)];
        for i in 2..=70 {
            messages.push(message(i, USER, &format!("m{i};"), Some(i - 1)));
        }
        let resolution = resolve(messages, 70, false).await.unwrap();
        // MAX_DEPTH ancestor hops plus the triggering message itself.
        let expected: String = (70 - MAX_DEPTH as u64..=70).map(|i| format!("m{i};")).collect();
        assert_eq!(resolution.prompt, expected);
    }

    #[tokio::test]
    async fn archiving_ignores_depth_budget() {
        let mut messages = vec![message(1, BOT, "m1;", None)];
        for i in 2..=70 {
            messages.push(message(i, BOT, &format!("m{i};"), Some(i - 1)));
        }
        let resolution = resolve(messages, 70, true).await.unwrap();
        let expected: String = (1..=70u64).map(|i| format!("m{i};")).collect();
        assert_eq!(resolution.prompt, expected);
    }

    #[tokio::test]
    async fn archiving_emphasizes_human_fragments() {
        let messages = vec![
            message(1, USER, "a seed", None),
            message(2, BOT, " grew tall", Some(1)),
            message(3, BOT, " and bloomed", Some(2)),
        ];
        let resolution = resolve(messages, 3, true).await.unwrap();
        assert_eq!(resolution.prompt, "**a seed**grew talland bloomed");
    }

    #[tokio::test]
    async fn cyclic_continue_chain_hits_hop_ceiling() {
        let messages = vec![
            message(1, USER, "!c", Some(2)),
            message(2, USER, "!c", Some(1)),
        ];
        let err = resolve(messages, 1, false).await.unwrap_err();
        assert!(matches!(err, Error::HopCeiling { .. }));
        assert!(!err.is_user_error());
    }

    #[tokio::test]
    async fn missing_parent_propagates_not_found() {
        let messages = vec![message(2, USER, "reply into the void", Some(1))];
        let err = resolve(messages, 2, false).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Source(SourceError::NotFound {
                id: MessageId(1),
                ..
            })
        ));
        assert!(err.is_user_error());
    }

    #[test]
    fn reply_bound_commands_require_a_target() {
        let orphan = message(1, USER, "!reroll", None);
        let commands = CommandSet::parse(&orphan.raw_text);
        let err = require_reply_target(&orphan, &commands).unwrap_err();
        assert!(matches!(err, Error::ReplyRequired { command: "reroll" }));

        let plain = message(1, USER, "just words", None);
        let commands = CommandSet::parse(&plain.raw_text);
        assert!(require_reply_target(&plain, &commands).is_ok());

        let replying = message(2, USER, "!c", Some(1));
        let commands = CommandSet::parse(&replying.raw_text);
        assert!(require_reply_target(&replying, &commands).is_ok());
    }
}
