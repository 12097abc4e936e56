//! Shared types and error scaffolding used across all spindle crates.

pub mod error;
pub mod types;

pub use error::FromMessage;
