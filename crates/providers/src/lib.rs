//! Generation backends: text completion and image generation.
//!
//! The thread engine treats both as opaque request/response calls; this
//! crate supplies the traits and an OpenAI-compatible HTTP implementation.

pub mod backend;
pub mod error;
pub mod openai;

pub use {
    backend::{
        CompletionBackend, CompletionRequest, CompletionResponse, ImageBackend, ImageRequest,
        ImageResponse,
    },
    error::{Error, Result},
    openai::{OpenAiBackend, OpenAiConfig},
};
