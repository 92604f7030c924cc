//! OpenAI chat completions in JSON mode, used to write copy from a description.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::{endpoint, read_body};
use crate::config::GeneratorConfig;
use crate::error::ShopcopyError;

const PROVIDER: &str = "OpenAI";

/// Request body for POST /v1/chat/completions
/// Docs: https://platform.openai.com/docs/api-reference/chat/create
#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Talks to an OpenAI text model.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: Url,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl OpenAiClient {
    /// Creates a client from the generator config.
    pub fn new(client: reqwest::Client, config: &GeneratorConfig) -> Self {
        Self {
            client,
            api_key: config.openai_api_key.clone(),
            model: config.text_model.clone(),
            base_url: config.openai_base_url.clone(),
        }
    }

    /// Sends one user message and returns the raw content of the JSON-mode reply.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn complete_json(&self, prompt: &str) -> Result<String, ShopcopyError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ShopcopyError::MissingApiKey(PROVIDER))?;
        let url = endpoint(&self.base_url, "v1/chat/completions")?;
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!("Sending description to {}", url);
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let raw = read_body(PROVIDER, response).await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&raw).map_err(|err| {
            ShopcopyError::MalformedResponse(format!("unexpected {PROVIDER} response: {err}"))
        })?;
        extract_content(parsed)
    }
}

fn extract_content(response: ChatCompletionResponse) -> Result<String, ShopcopyError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or(ShopcopyError::EmptyResponse(PROVIDER))?;
    if let Some(refusal) = message.refusal {
        return Err(ShopcopyError::ContentBlocked(refusal));
    }
    message
        .content
        .filter(|content| !content.trim().is_empty())
        .ok_or(ShopcopyError::EmptyResponse(PROVIDER))
}
