//! Raw message text → prompt fragment.

use spindle_common::types::{AuthorId, ThreadMessage};

use crate::commands::CommandSet;

/// Braille blank wrapped around generated replies so the platform's
/// trailing-whitespace stripping cannot truncate them. Stripped before any
/// text is reused as input.
pub const MESSAGE_END: char = '\u{2800}';

/// Cleans raw message text into a prompt fragment.
///
/// Holds the bot's mention tag and identity explicitly; there is no ambient
/// "current client" state.
#[derive(Debug, Clone)]
pub struct Normalizer {
    mention: String,
    bot: AuthorId,
}

impl Normalizer {
    pub fn new(mention: impl Into<String>, bot: AuthorId) -> Self {
        Self {
            mention: mention.into(),
            bot,
        }
    }

    /// Strip the leading bot-mention tag and exactly one following space,
    /// when present at the start of the text.
    pub fn detag<'a>(&self, text: &'a str) -> &'a str {
        let text = text.trim_start();
        match text.strip_prefix(&self.mention) {
            Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
            None => text,
        }
    }

    /// Normalize a message into a prompt fragment: mention tag off, consumed
    /// command tokens out, sentinel gone, surrounding whitespace trimmed.
    ///
    /// With `bold_if_human`, text not authored by the bot is wrapped in `**`
    /// emphasis, at most once. Idempotent: reapplying with the same inputs
    /// produces the same string.
    pub fn clean(
        &self,
        message: &ThreadMessage,
        commands: &CommandSet,
        bold_if_human: bool,
    ) -> String {
        let detagged = self.detag(&message.raw_text);
        let decommanded = strip_command_tokens(detagged, commands);
        let content = decommanded.replace(MESSAGE_END, "");
        let content = content.trim();

        if bold_if_human
            && !message.is_authored_by(self.bot)
            && !content.is_empty()
            && !is_emphasized(content)
        {
            return format!("**{content}**");
        }
        content.to_string()
    }
}

/// Drop whitespace-delimited tokens consumed as commands, preserving line
/// structure. Runs of blanks collapse to single spaces on lines that are
/// re-joined, which keeps the operation stable under reapplication.
fn strip_command_tokens(text: &str, commands: &CommandSet) -> String {
    if commands.is_empty() {
        return text.to_string();
    }
    text.lines()
        .map(|line| {
            line.split_whitespace()
                .filter(|word| !commands.consumed(word))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_emphasized(content: &str) -> bool {
    content.len() >= 4 && content.starts_with("**") && content.ends_with("**")
}
