//! Thread resolution engine.
//!
//! Interprets a linear reply chain of chat messages as a structured
//! conversation: parses inline commands out of free text, decides how far
//! back to walk and which messages to skip or merge, and produces a single
//! normalized prompt (or, for archival, a paginated transcript).

pub mod archive;
pub mod commands;
pub mod error;
pub mod normalize;
pub mod resolver;
pub mod source;

pub use {
    archive::paginate,
    commands::{Command, CommandSet, MAX_BEST_OF},
    error::{Error, Result},
    normalize::{MESSAGE_END, Normalizer},
    resolver::{MAX_DEPTH, MAX_HOPS, Resolution, ThreadResolver, require_reply_target},
    source::{MessageSource, SourceError},
};
