//! Static usage text for `!help`.

use spindle_thread::MAX_BEST_OF;

/// Returned for `!help`; no resolution is performed.
pub fn usage(mention: &str) -> String {
    format!(
        "How to use this bot\n\n\
         Mention {mention} in a message or reply to one of its messages. \
         Writing text prompts the bot to continue the text.\n\n\
         Commands:\n\
         `!continue` (`!c`, or just `continue`) - in a reply: continue writing from that message\n\
         `!reroll` (`!r`, or just `reroll`) - in a reply: write a new response to that message's parent\n\
         `!archive` (or just `archive`) - in a reply: save the whole story up to that message in the archive channel\n\
         `!instruct` (`!i`) - treat your text as an instruction, e.g. `!i Tell a story about a cabbage`\n\
         `!draw` (`!d`) - render the thread as an image instead of text\n\
         `!2`..`!{MAX_BEST_OF}` - sample that many candidates and keep the best\n\
         `!help` (`!h`) - show this message"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_names_every_command() {
        let text = usage("@Spindle");
        for token in [
            "!continue", "!c", "!reroll", "!r", "!archive", "!instruct", "!i", "!draw", "!d",
            "!help", "!h",
        ] {
            assert!(text.contains(token), "usage text missing {token}");
        }
        assert!(text.contains("@Spindle"));
    }
}
