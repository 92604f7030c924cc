//! Config handling

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::log::LevelFilter;
use tracing::warn;
use url::Url;

use crate::constants::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_OPENAI_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECONDS,
    DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL,
};

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("tower_sessions", LevelFilter::Warn)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Which pipeline turns an image into copy.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Vision model describes the image, a text model writes six fields of marketing copy.
    #[default]
    TwoStage,
    /// Vision model answers directly with a title, description and tags in JSON mode.
    SingleStage,
}

impl Variant {
    /// Human readable label for the page header
    pub fn label(self) -> &'static str {
        match self {
            Variant::TwoStage => "Two-stage (vision → copywriter)",
            Variant::SingleStage => "Single-stage (vision, JSON mode)",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::TwoStage => write!(f, "two-stage"),
            Variant::SingleStage => write!(f, "single-stage"),
        }
    }
}

/// Everything the generation pipeline needs to talk to the model providers.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Pipeline variant
    pub variant: Variant,
    /// Gemini key, used by both variants
    pub gemini_api_key: Option<String>,
    /// OpenAI key, only used by the two-stage variant
    pub openai_api_key: Option<String>,
    /// Gemini model identifier
    pub vision_model: String,
    /// OpenAI model identifier
    pub text_model: String,
    /// Gemini API base URL
    pub gemini_base_url: Url,
    /// OpenAI API base URL
    pub openai_base_url: Url,
    /// Per-request timeout for model calls
    pub request_timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        #[allow(clippy::expect_used)]
        let gemini_base_url =
            Url::parse(DEFAULT_GEMINI_BASE_URL).expect("default Gemini URL is valid");
        #[allow(clippy::expect_used)]
        let openai_base_url =
            Url::parse(DEFAULT_OPENAI_BASE_URL).expect("default OpenAI URL is valid");
        Self {
            variant: Variant::default(),
            gemini_api_key: None,
            openai_api_key: None,
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            gemini_base_url,
            openai_base_url,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        }
    }
}

impl GeneratorConfig {
    /// Keys the selected variant needs but doesn't have.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gemini_api_key.is_none() {
            missing.push("GEMINI_API_KEY");
        }
        if self.variant == Variant::TwoStage && self.openai_api_key.is_none() {
            missing.push("OPENAI_API_KEY");
        }
        missing
    }

    /// Logs a warning for each key the variant will need at generation time.
    pub fn warn_missing_keys(&self) {
        for key in self.missing_keys() {
            warn!(
                "{} is not set, {} generation will fail until it is",
                key, self.variant
            );
        }
    }
}
