//! Gemini `generateContent`, used to look at the product image.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::{endpoint, read_body};
use crate::config::GeneratorConfig;
use crate::encoded_image::EncodedImage;
use crate::error::ShopcopyError;

const PROVIDER: &str = "Gemini";

/// Request body for POST /v1beta/models/{model}:generateContent
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    InlineData(InlineData<'a>),
    Text(&'a str),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

/// Talks to a vision-capable Gemini model.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: Url,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl GeminiClient {
    /// Creates a client from the generator config.
    pub fn new(client: reqwest::Client, config: &GeneratorConfig) -> Self {
        Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.vision_model.clone(),
            base_url: config.gemini_base_url.clone(),
        }
    }

    /// Asks for free text about the image.
    pub async fn describe(
        &self,
        image: &EncodedImage,
        instruction: &str,
    ) -> Result<String, ShopcopyError> {
        self.generate(image, instruction, None).await
    }

    /// Asks for a JSON answer about the image, using the model's JSON mode.
    pub async fn generate_json(
        &self,
        image: &EncodedImage,
        instruction: &str,
    ) -> Result<String, ShopcopyError> {
        self.generate(
            image,
            instruction,
            Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        )
        .await
    }

    #[instrument(skip_all, fields(model = %self.model, media_type = %image.media_type(), bytes = image.len()))]
    async fn generate(
        &self,
        image: &EncodedImage,
        instruction: &str,
        generation_config: Option<GenerationConfig>,
    ) -> Result<String, ShopcopyError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ShopcopyError::MissingApiKey(PROVIDER))?;
        let url = endpoint(
            &self.base_url,
            &format!("v1beta/models/{}:generateContent", self.model),
        )?;

        let (mime_type, data) = image.parts();
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData(InlineData { mime_type, data }),
                    Part::Text(instruction),
                ],
            }],
            generation_config,
        };

        debug!("Sending image to {}", url);
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let raw = read_body(PROVIDER, response).await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&raw).map_err(|err| {
            ShopcopyError::MalformedResponse(format!("unexpected {PROVIDER} response: {err}"))
        })?;
        extract_text(parsed)
    }
}

/// Pulls the text out of the first candidate, refusing blocked or empty answers.
fn extract_text(response: GenerateContentResponse) -> Result<String, ShopcopyError> {
    if let Some(feedback) = response.prompt_feedback
        && let Some(reason) = feedback.block_reason
    {
        return Err(ShopcopyError::ContentBlocked(
            feedback
                .block_reason_message
                .unwrap_or_else(|| format!("prompt blocked: {reason}")),
        ));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(ShopcopyError::EmptyResponse(PROVIDER))?;

    if let Some(reason) = candidate.finish_reason.as_deref()
        && matches!(
            reason,
            "SAFETY" | "RECITATION" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII"
        )
    {
        return Err(ShopcopyError::ContentBlocked(format!(
            "stopped by {PROVIDER} safety filter: {reason}"
        )));
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ShopcopyError::EmptyResponse(PROVIDER));
    }
    Ok(text)
}
