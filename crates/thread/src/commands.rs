//! Inline command parsing.
//!
//! Commands ride inside ordinary message text as sigil-prefixed tokens
//! (`!continue`, `!r`, `!3`). A handful of bare words also count when they
//! make up the entire message body, so a casual one-word reply works without
//! the sigil.

use std::collections::BTreeSet;

/// Prefix that marks a token as a command.
pub const SIGIL: char = '!';

/// Widest `!n` sampling request honored; anything above is ignored.
pub const MAX_BEST_OF: u8 = 3;

/// Bare words accepted as commands when they are the whole message body.
const PLAIN_COMMANDS: [&str; 3] = ["continue", "reroll", "archive"];

/// Recognized commands. Unknown `!tokens` parse into the set (and are later
/// stripped from prompt text) but map to none of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Continue,
    Reroll,
    Archive,
    Instruct,
    Draw,
    Help,
}

impl Command {
    /// Accepted token spellings, without the sigil.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Continue => &["continue", "c"],
            Self::Reroll => &["reroll", "r"],
            Self::Archive => &["archive"],
            Self::Instruct => &["instruct", "i"],
            Self::Draw => &["draw", "d"],
            Self::Help => &["help", "h"],
        }
    }

    /// Canonical user-facing name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Reroll => "reroll",
            Self::Archive => "archive",
            Self::Instruct => "instruct",
            Self::Draw => "draw",
            Self::Help => "help",
        }
    }
}

/// The command tokens found in one message, parsed once and reused by all
/// logic operating on that message. Immutable and side-effect free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet {
    /// Sigil-prefixed tokens as matched, lowercased.
    tokens: BTreeSet<String>,
    /// Bare allow-listed word making up the whole body, if any.
    bare: Option<&'static str>,
}

impl CommandSet {
    /// Parse message text (mention tag already stripped).
    ///
    /// Every whitespace-delimited token starting with the sigil is recorded
    /// lowercased. A body that is nothing but a bare allow-listed word
    /// synthesizes the corresponding command.
    pub fn parse(text: &str) -> Self {
        let body = text.trim();
        let tokens = body
            .split_whitespace()
            .filter(|word| word.starts_with(SIGIL))
            .map(str::to_lowercase)
            .collect();
        let lowered = body.to_lowercase();
        let bare = PLAIN_COMMANDS
            .iter()
            .find(|word| **word == lowered)
            .copied();
        Self { tokens, bare }
    }

    pub fn contains(&self, command: Command) -> bool {
        command.aliases().iter().any(|alias| {
            self.tokens.contains(&format!("{SIGIL}{alias}")) || self.bare == Some(*alias)
        })
    }

    /// Requested sampling width: the largest `!n` with `2 <= n <= MAX_BEST_OF`
    /// present in the message, or 1 when none is.
    pub fn best_of(&self) -> u8 {
        (2..=MAX_BEST_OF)
            .rev()
            .find(|n| self.tokens.contains(&format!("{SIGIL}{n}")))
            .unwrap_or(1)
    }

    /// Whether `word` was consumed as a command token of this message.
    ///
    /// Matching is by whole token, so prose that merely contains a
    /// command-looking substring is never touched by the normalizer.
    pub fn consumed(&self, word: &str) -> bool {
        let lowered = word.to_lowercase();
        if word.starts_with(SIGIL) && self.tokens.contains(&lowered) {
            return true;
        }
        self.bare.is_some_and(|bare| bare == lowered)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.bare.is_none()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("!continue the story", Command::Continue)]
    #[case("!c", Command::Continue)]
    #[case("!reroll", Command::Reroll)]
    #[case("!r please", Command::Reroll)]
    #[case("!archive", Command::Archive)]
    #[case("!instruct write a poem", Command::Instruct)]
    #[case("!i do it", Command::Instruct)]
    #[case("!draw a fox", Command::Draw)]
    #[case("!d a fox", Command::Draw)]
    #[case("!help", Command::Help)]
    #[case("!h", Command::Help)]
    #[case("!CONTINUE", Command::Continue)]
    fn sigil_tokens_parse(#[case] text: &str, #[case] expected: Command) {
        assert!(CommandSet::parse(text).contains(expected));
    }

    #[rstest]
    #[case("continue", Command::Continue)]
    #[case("reroll", Command::Reroll)]
    #[case("archive", Command::Archive)]
    #[case("  Continue  ", Command::Continue)]
    fn bare_words_count_when_whole_body(#[case] text: &str, #[case] expected: Command) {
        assert!(CommandSet::parse(text).contains(expected));
    }

    #[test]
    fn bare_word_inside_prose_is_not_a_command() {
        let set = CommandSet::parse("please continue the story");
        assert!(!set.contains(Command::Continue));
        assert!(set.is_empty());
    }

    #[test]
    fn no_commands_yields_empty_set() {
        let set = CommandSet::parse("once upon a time");
        assert!(set.is_empty());
        assert_eq!(set.best_of(), 1);
    }

    #[test]
    fn largest_best_of_wins() {
        let set = CommandSet::parse("!3 some text !2");
        assert_eq!(set.best_of(), 3);
    }

    #[test]
    fn best_of_out_of_range_is_ignored() {
        assert_eq!(CommandSet::parse("!4").best_of(), 1);
        assert_eq!(CommandSet::parse("!1").best_of(), 1);
        assert_eq!(CommandSet::parse("!0").best_of(), 1);
    }

    #[test]
    fn unknown_sigil_tokens_are_consumed_but_map_to_nothing() {
        let set = CommandSet::parse("!frobnicate hello");
        assert!(!set.is_empty());
        assert!(set.consumed("!frobnicate"));
        assert!(!set.contains(Command::Continue));
        assert!(!set.contains(Command::Help));
    }

    #[test]
    fn consumed_matches_whole_tokens_only() {
        let set = CommandSet::parse("!r reroll the dice");
        assert!(set.consumed("!r"));
        assert!(set.consumed("!R"));
        assert!(!set.consumed("reroll"));
        assert!(!set.consumed("dice"));
    }
}
