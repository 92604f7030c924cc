//! Clients for the model providers the pipeline chains together.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::ShopcopyError;

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// Longest slice of an error body we keep in messages.
const MAX_ERROR_BODY: usize = 500;

/// Builds the shared HTTP client.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ShopcopyError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ShopcopyError::from)
}

/// Joins an API path onto a base URL, treating the base as a directory.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, ShopcopyError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

/// Reads a provider response, turning non-success statuses into [`ShopcopyError::Api`].
pub(crate) async fn read_body(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<String, ShopcopyError> {
    let status = response.status();
    let body = response.text().await?;
    debug!("{} responded {}: {}", provider, status, body);
    if !status.is_success() {
        return Err(ShopcopyError::Api {
            provider,
            status: status.as_u16(),
            message: api_error_message(&body),
        });
    }
    Ok(body)
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Both providers wrap failures as `{"error": {"message": ...}}`, fall back to the raw body.
fn api_error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY {
        let mut cut: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
        cut.push('…');
        cut
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let base = Url::parse("http://127.0.0.1:8080").expect("url");
        assert_eq!(
            endpoint(&base, "/v1/chat/completions")
                .expect("join")
                .as_str(),
            "http://127.0.0.1:8080/v1/chat/completions"
        );

        let proxied = Url::parse("https://proxy.example.org/openai").expect("url");
        assert_eq!(
            endpoint(&proxied, "v1/chat/completions")
                .expect("join")
                .as_str(),
            "https://proxy.example.org/openai/v1/chat/completions"
        );

        let gemini = Url::parse("https://generativelanguage.googleapis.com").expect("url");
        assert_eq!(
            endpoint(&gemini, "v1beta/models/gemini-2.5-flash:generateContent")
                .expect("join")
                .as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_api_error_message() {
        assert_eq!(
            api_error_message(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#),
            "API key not valid"
        );
        assert_eq!(api_error_message("  upstream down \n"), "upstream down");
        let long = "x".repeat(MAX_ERROR_BODY + 10);
        assert_eq!(
            api_error_message(&long).chars().count(),
            MAX_ERROR_BODY + 1
        );
    }
}
