//! Error handling

use std::fmt;

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{debug, info};

/// Errors for the shopcopy application, both HTTP-facing and generation failures.
#[derive(Debug)]
pub enum ShopcopyError {
    /// When you didn't do the right thing
    BadRequest,
    /// Missing or invalid session/CSRF token
    Unauthorized,
    /// When a requested resource is not found
    NotFound(String),
    /// When an internal server error occurs
    InternalServerError(String),
    /// The request body went over the upload limit
    PayloadTooLarge,

    /// No API key configured for the named provider
    MissingApiKey(&'static str),
    /// A provider answered with a non-success status
    Api {
        /// Provider name, eg `Gemini`
        provider: &'static str,
        /// HTTP status code
        status: u16,
        /// Body or error message returned by the provider
        message: String,
    },
    /// Transport level failure talking to a provider
    Network(reqwest::Error),
    /// The provider refused the prompt
    ContentBlocked(String),
    /// The provider answered but returned no usable text
    EmptyResponse(&'static str),
    /// The model's answer wasn't the JSON shape we asked for
    MalformedResponse(String),
    /// An image payload couldn't be decoded
    InvalidImage(String),
}

impl fmt::Display for ShopcopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShopcopyError::BadRequest => write!(f, "bad request"),
            ShopcopyError::Unauthorized => write!(f, "invalid or missing session"),
            ShopcopyError::NotFound(what) => write!(f, "not found: {what}"),
            ShopcopyError::InternalServerError(message) => {
                write!(f, "internal server error: {message}")
            }
            ShopcopyError::PayloadTooLarge => write!(f, "upload is too large"),
            ShopcopyError::MissingApiKey(provider) => {
                write!(f, "no API key configured for {provider}")
            }
            ShopcopyError::Api {
                provider,
                status,
                message,
            } => write!(f, "{provider} API error {status}: {message}"),
            ShopcopyError::Network(err) => write!(f, "network error: {err}"),
            ShopcopyError::ContentBlocked(reason) => write!(f, "content blocked: {reason}"),
            ShopcopyError::EmptyResponse(provider) => {
                write!(f, "{provider} returned an empty response")
            }
            ShopcopyError::MalformedResponse(message) => {
                write!(f, "the model returned malformed JSON: {message}")
            }
            ShopcopyError::InvalidImage(message) => write!(f, "invalid image: {message}"),
        }
    }
}

impl std::error::Error for ShopcopyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShopcopyError::Network(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ShopcopyError {
    fn from(err: reqwest::Error) -> Self {
        ShopcopyError::Network(err)
    }
}

impl From<std::io::Error> for ShopcopyError {
    fn from(err: std::io::Error) -> Self {
        ShopcopyError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for ShopcopyError {
    fn from(err: axum::http::Error) -> Self {
        ShopcopyError::InternalServerError(err.to_string())
    }
}

impl From<url::ParseError> for ShopcopyError {
    fn from(err: url::ParseError) -> Self {
        ShopcopyError::InternalServerError(err.to_string())
    }
}

impl From<MultipartError> for ShopcopyError {
    fn from(err: MultipartError) -> Self {
        debug!("Multipart error: {}", err.body_text());
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ShopcopyError::PayloadTooLarge
        } else {
            ShopcopyError::BadRequest
        }
    }
}

impl From<askama::Error> for ShopcopyError {
    fn from(err: askama::Error) -> Self {
        ShopcopyError::InternalServerError(err.to_string())
    }
}

impl IntoResponse for ShopcopyError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ShopcopyError::BadRequest => {
                info!("Bad request received");
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Bad Request"));
                *response.status_mut() = axum::http::StatusCode::BAD_REQUEST;
                response
            }
            ShopcopyError::InvalidImage(message) => {
                info!("Invalid image received: {}", message);
                let mut response = axum::response::Response::new(axum::body::Body::from(
                    format!("Bad Request: {message}"),
                ));
                *response.status_mut() = axum::http::StatusCode::BAD_REQUEST;
                response
            }
            ShopcopyError::Unauthorized => {
                info!("Unauthorized request received");
                let mut response = axum::response::Response::new(axum::body::Body::from(
                    "Unauthorized: invalid or missing session.",
                ));
                *response.status_mut() = axum::http::StatusCode::UNAUTHORIZED;
                response
            }
            ShopcopyError::NotFound(url) => {
                tracing::debug!("404 {url}");
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Not Found"));
                *response.status_mut() = axum::http::StatusCode::NOT_FOUND;
                response
            }
            ShopcopyError::PayloadTooLarge => {
                info!("Upload over the size limit rejected");
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Payload Too Large"));
                *response.status_mut() = StatusCode::PAYLOAD_TOO_LARGE;
                response
            }
            ShopcopyError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Internal server error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
            other => {
                tracing::error!("Upstream failure: {}", other);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Bad Gateway"));
                *response.status_mut() = axum::http::StatusCode::BAD_GATEWAY;
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShopcopyError::Api {
            provider: "OpenAI",
            status: 401,
            message: "Incorrect API key provided".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "OpenAI API error 401: Incorrect API key provided"
        );
        assert_eq!(
            ShopcopyError::MissingApiKey("Gemini").to_string(),
            "no API key configured for Gemini"
        );
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ShopcopyError::BadRequest.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ShopcopyError::NotFound("/image".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ShopcopyError::EmptyResponse("Gemini").into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ShopcopyError::PayloadTooLarge.into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
