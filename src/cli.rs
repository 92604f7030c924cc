//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::time::Duration;
use url::Url;

use crate::config::{GeneratorConfig, Variant};
use crate::constants::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_OPENAI_BASE_URL, DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL,
};

#[derive(clap::Args, Debug, Clone)]
/// Model provider options, shared by the server and the command line tool
pub struct ProviderOptions {
    #[clap(long, value_enum, default_value_t = Variant::TwoStage, env = "SHOPCOPY_VARIANT")]
    /// Which pipeline to run, defaults to `two-stage`.
    /// Env: SHOPCOPY_VARIANT
    pub variant: Variant,

    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    /// Gemini API key for the vision model.
    /// Env: GEMINI_API_KEY
    pub gemini_api_key: Option<String>,

    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    /// OpenAI API key for the copywriting model, two-stage only.
    /// Env: OPENAI_API_KEY
    pub openai_api_key: Option<String>,

    #[clap(long, default_value = DEFAULT_VISION_MODEL, env = "SHOPCOPY_VISION_MODEL")]
    /// Gemini model used to look at the image.
    /// Env: SHOPCOPY_VISION_MODEL
    pub vision_model: String,

    #[clap(long, default_value = DEFAULT_TEXT_MODEL, env = "SHOPCOPY_TEXT_MODEL")]
    /// OpenAI model used to write the copy.
    /// Env: SHOPCOPY_TEXT_MODEL
    pub text_model: String,

    #[clap(long, default_value = DEFAULT_GEMINI_BASE_URL, env = "SHOPCOPY_GEMINI_BASE_URL")]
    /// Gemini API base URL.
    /// Env: SHOPCOPY_GEMINI_BASE_URL
    pub gemini_base_url: Url,

    #[clap(long, default_value = DEFAULT_OPENAI_BASE_URL, env = "SHOPCOPY_OPENAI_BASE_URL")]
    /// OpenAI API base URL.
    /// Env: SHOPCOPY_OPENAI_BASE_URL
    pub openai_base_url: Url,

    #[clap(long, default_value = "120", env = "SHOPCOPY_REQUEST_TIMEOUT")]
    /// Seconds to wait on each model call, defaults to `120`.
    /// Env: SHOPCOPY_REQUEST_TIMEOUT
    pub request_timeout: u64,
}

impl ProviderOptions {
    /// Builds the generator configuration, dropping blank keys.
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            variant: self.variant,
            gemini_api_key: non_blank(self.gemini_api_key.as_deref()),
            openai_api_key: non_blank(self.openai_api_key.as_deref()),
            vision_model: self.vision_model.clone(),
            text_model: self.text_model.clone(),
            gemini_base_url: self.gemini_base_url.clone(),
            openai_base_url: self.openai_base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "SHOPCOPY_DEBUG")]
    /// Enable debug logging. Env: SHOPCOPY_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "SHOPCOPY_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: SHOPCOPY_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "SHOPCOPY_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: SHOPCOPY_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(flatten)]
    /// Model provider options
    pub providers: ProviderOptions,
}
