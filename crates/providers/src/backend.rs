//! Backend traits and request/response types.

use async_trait::async_trait;

use spindle_common::types::GenerationMode;

use crate::error::Result;

/// One text-completion call. `best_of` asks the backend to sample that many
/// candidates server-side; the first returned choice is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub mode: GenerationMode,
    pub prompt: String,
    pub max_tokens: u32,
    pub best_of: u8,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    /// Model that actually served the request.
    pub model: String,
}

/// One image-generation call. `size` is the square pixel dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct ImageResponse {
    /// Where the rendered image can be fetched from.
    pub url: String,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(&self, request: ImageRequest) -> Result<ImageResponse>;
}
