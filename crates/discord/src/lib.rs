//! Discord front end for spindle.
//!
//! Connects the serenity gateway to the thread resolution engine and the
//! generation backends: inbound mentions are resolved into prompts, replies
//! carry the generated continuation back into the chain.

pub mod config;
pub mod handler;
pub mod help;
pub mod relay;
pub mod source;

pub use {config::DiscordConfig, handler::SpindleHandler};
