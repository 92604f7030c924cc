//! The image → description → copy pipeline.
//!
//! Both variants end in a [`GenerationOutcome`], so callers never deal with raw errors.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{GeneratorConfig, Variant};
use crate::constants::{GENERIC_FAILURE_MESSAGE, META_DESCRIPTION_LIMIT, META_TITLE_LIMIT};
use crate::copy::GenerationResult;
use crate::encoded_image::EncodedImage;
use crate::error::ShopcopyError;
use crate::providers::{GeminiClient, OpenAiClient, http_client};

/// Fixed instruction sent with the image in the two-stage pipeline.
pub const DESCRIBE_INSTRUCTION: &str = "Describe this product image in detail. \
Cover what the product is, its colors, materials, shape, style, notable features \
and who it is likely for. Only describe what is visible.";

/// Fixed instruction for the single-stage pipeline.
pub const LISTING_INSTRUCTION: &str = r#"You are an e-commerce copywriter. Look at this product image and return a JSON object with exactly these fields:
- "title": a concise, appealing product title
- "description": a persuasive product description of two to four sentences
- "tags": an array of exactly 5 short search tags

Return only the JSON object."#;

/// Builds the copywriter prompt, the description goes in verbatim.
pub fn copy_prompt(description: &str) -> String {
    format!(
        r#"You are an expert e-commerce copywriter and SEO specialist. Using the product description below, write marketing copy and return it as a JSON object with exactly these six fields:
- "title": a catchy product title
- "shortDescription": one or two sentences for product cards
- "longDescription": a detailed, persuasive description of two or three paragraphs
- "metaTitle": an SEO title of at most {META_TITLE_LIMIT} characters
- "metaDescription": an SEO meta description of at most {META_DESCRIPTION_LIMIT} characters
- "keywords": an array of 5 to 7 relevant search keywords

Product description:
{description}"#
    )
}

/// How a generation cycle ended.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// Everything parsed, here's the whole result
    Success {
        /// The generated copy
        result: GenerationResult,
    },
    /// Something failed along the way
    Failure {
        /// What to tell the user
        reason: String,
    },
}

impl GenerationOutcome {
    /// Folds a pipeline result into an outcome, falling back to a generic reason.
    pub fn from_result(result: Result<GenerationResult, ShopcopyError>) -> Self {
        match result {
            Ok(result) => Self::Success { result },
            Err(err) => Self::Failure {
                reason: err.to_string(),
            },
        }
    }

    /// True for [`GenerationOutcome::Success`]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure reason to show, with the generic fallback for blank reasons.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason } if reason.trim().is_empty() => Some(GENERIC_FAILURE_MESSAGE),
            Self::Failure { reason } => Some(reason),
        }
    }
}

/// Runs the configured pipeline against the providers.
#[derive(Clone, Debug)]
pub struct Generator {
    variant: Variant,
    vision: GeminiClient,
    copywriter: OpenAiClient,
}

impl Generator {
    /// Builds the provider clients.
    pub fn new(config: &GeneratorConfig) -> Result<Self, ShopcopyError> {
        let client = http_client(config.request_timeout)?;
        Ok(Self {
            variant: config.variant,
            vision: GeminiClient::new(client.clone(), config),
            copywriter: OpenAiClient::new(client, config),
        })
    }

    /// Which pipeline this runs.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Runs one cycle for `image` and never returns an error.
    pub async fn run(&self, image: &EncodedImage) -> GenerationOutcome {
        let outcome = GenerationOutcome::from_result(self.try_run(image).await);
        match &outcome {
            GenerationOutcome::Success { .. } => info!("{} generation succeeded", self.variant),
            GenerationOutcome::Failure { reason } => {
                warn!("{} generation failed: {}", self.variant, reason)
            }
        }
        outcome
    }

    /// Runs one cycle, propagating the first failure.
    pub async fn try_run(&self, image: &EncodedImage) -> Result<GenerationResult, ShopcopyError> {
        match self.variant {
            Variant::TwoStage => {
                let description = self.vision.describe(image, DESCRIBE_INSTRUCTION).await?;
                info!(
                    "Got a {} character description, asking for copy",
                    description.chars().count()
                );
                let raw = self
                    .copywriter
                    .complete_json(&copy_prompt(&description))
                    .await?;
                GenerationResult::parse_marketing(&raw)
            }
            Variant::SingleStage => {
                let raw = self.vision.generate_json(image, LISTING_INSTRUCTION).await?;
                GenerationResult::parse_listing(&raw)
            }
        }
    }
}
