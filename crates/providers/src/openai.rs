//! OpenAI-compatible completion and image client.

use {
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::{debug, info},
};

use spindle_common::types::GenerationMode;

use crate::{
    backend::{
        CompletionBackend, CompletionRequest, CompletionResponse, ImageBackend, ImageRequest,
        ImageResponse,
    },
    error::{Context, Error, Result},
};

/// Settings for the hosted API. Model names map one-to-one onto
/// [`GenerationMode`].
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key, sent as a bearer token.
    pub api_key: Secret<String>,
    /// Scheme and host, no trailing slash (e.g. `https://api.openai.com`).
    pub base_url: String,
    /// Model used for plain continuations.
    pub completion_model: String,
    /// Model used when the chain selected instruct mode.
    pub instruct_model: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("completion_model", &self.completion_model)
            .field("instruct_model", &self.instruct_model)
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::new(String::new()),
            base_url: "https://api.openai.com".into(),
            completion_model: "curie".into(),
            instruct_model: "curie-instruct-beta".into(),
        }
    }
}

/// HTTP client for the completion and image endpoints.
pub struct OpenAiBackend {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiBackend {
    #[must_use]
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn model_for(&self, mode: GenerationMode) -> &str {
        match mode {
            GenerationMode::Normal => &self.config.completion_model,
            GenerationMode::Instruct => &self.config.instruct_model,
        }
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    best_of: u8,
}

#[derive(Deserialize)]
struct CompletionReply {
    model: String,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    text: String,
}

#[derive(Serialize)]
struct ImageBody<'a> {
    prompt: &'a str,
    n: u8,
    size: String,
}

#[derive(Deserialize)]
struct ImageReply {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    url: String,
}

#[derive(Deserialize)]
struct ApiErrorReply {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Turn a non-success response into [`Error::Api`], relaying the API's own
/// error message when it sends one.
async fn api_error(response: reqwest::Response, what: &str) -> Error {
    let status = response.status();
    let message = match response.json::<ApiErrorReply>().await {
        Ok(reply) => reply.error.message,
        Err(_) => format!("{what} request failed with status {status}"),
    };
    Error::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait::async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = self.model_for(request.mode);
        debug!(
            model,
            prompt_chars = request.prompt.len(),
            best_of = request.best_of,
            "requesting completion"
        );

        let response = self
            .client
            .post(format!("{}/v1/completions", self.config.base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&CompletionBody {
                model,
                prompt: &request.prompt,
                max_tokens: request.max_tokens,
                best_of: request.best_of,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, "completion").await);
        }

        let reply: CompletionReply = response.json().await?;
        let text = reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .context("backend returned no completion choices")?;

        info!(model = %reply.model, completion_chars = text.len(), "completion received");
        Ok(CompletionResponse {
            text,
            model: reply.model,
        })
    }
}

#[async_trait::async_trait]
impl ImageBackend for OpenAiBackend {
    async fn generate(&self, request: ImageRequest) -> Result<ImageResponse> {
        debug!(
            prompt_chars = request.prompt.len(),
            size = request.size,
            "requesting image"
        );

        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.config.base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&ImageBody {
                prompt: &request.prompt,
                n: 1,
                size: format!("{0}x{0}", request.size),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, "image").await);
        }

        let reply: ImageReply = response.json().await?;
        let url = reply
            .data
            .into_iter()
            .next()
            .map(|datum| datum.url)
            .context("backend returned no image data")?;

        info!("image received");
        Ok(ImageResponse { url })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    fn backend(base_url: String) -> OpenAiBackend {
        OpenAiBackend::new(OpenAiConfig {
            api_key: Secret::new("test-key".into()),
            base_url,
            ..OpenAiConfig::default()
        })
    }

    fn completion_request(mode: GenerationMode) -> CompletionRequest {
        CompletionRequest {
            mode,
            prompt: "Once upon a time".into(),
            max_tokens: 64,
            best_of: 1,
        }
    }

    #[tokio::test]
    async fn completion_uses_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/completions")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "curie",
                "prompt": "Once upon a time",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"model":"curie","choices":[{"text":" there was"},{"text":" it rained"}]}"#,
            )
            .create_async()
            .await;

        let response = backend(server.url())
            .complete(completion_request(GenerationMode::Normal))
            .await
            .unwrap();
        assert_eq!(response.text, " there was");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn instruct_mode_selects_instruct_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/completions")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "curie-instruct-beta",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"curie-instruct-beta","choices":[{"text":"A cabbage."}]}"#)
            .create_async()
            .await;

        backend(server.url())
            .complete(completion_request(GenerationMode::Instruct))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_message_is_relayed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/images/generations")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"message":"Your prompt was rejected"}}"#)
            .create_async()
            .await;

        let err = backend(server.url())
            .generate(ImageRequest {
                prompt: "something disallowed".into(),
                size: 512,
            })
            .await
            .unwrap_err();
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Your prompt was rejected");
            },
            other => panic!("expected Error::Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"curie","choices":[]}"#)
            .create_async()
            .await;

        let err = backend(server.url())
            .complete(completion_request(GenerationMode::Normal))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no completion choices"));
    }
}
