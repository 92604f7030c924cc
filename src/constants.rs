//! Shared constants for things
//!

/// Default Gemini model used for image description.
pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";

/// Default OpenAI model used to turn a description into copy.
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";

/// Where the Gemini API lives.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Where the OpenAI API lives.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Seconds before an outbound model request is abandoned.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 120;

/// Upload ceiling for the image form, the axum default of 2MiB is too small for phone photos.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Meta titles longer than this get truncated by search engines.
pub const META_TITLE_LIMIT: usize = 60;

/// Meta descriptions longer than this get truncated by search engines.
pub const META_DESCRIPTION_LIMIT: usize = 160;

/// Shown when a failed cycle has nothing better to say.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while generating copy. Please try again.";

/// Media type used when neither the browser nor the bytes tell us anything.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Seconds between page refreshes while a cycle is running.
pub const LOADING_REFRESH_SECONDS: u64 = 2;

#[cfg(test)]
/// Sample description used in tests
pub const TEST_DESCRIPTION: &str = "red running sneaker with white sole";
