//! In-memory image payloads: raw bytes plus the media type they were declared or sniffed as.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose;
use regex::Regex;
use tracing::debug;

use crate::constants::FALLBACK_MEDIA_TYPE;
use crate::error::ShopcopyError;

#[allow(clippy::expect_used)]
static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:(?P<media>[^;,]*)(?P<params>(?:;[^;,]*)*),(?P<payload>.*)$")
        .expect("data URI regex compiles")
});

/// An uploaded file held in memory, ready for preview and for model requests.
///
/// Nothing checks that the bytes really are an image, the model gets whatever the user picked.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    media_type: String,
    data: Vec<u8>,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl EncodedImage {
    /// Wraps bytes with an explicit media type.
    pub fn new(media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            data,
        }
    }

    /// Builds an image from an upload, trusting the declared type when there is a useful one.
    ///
    /// Returns `None` when the upload is empty, which is what a form sends when no file was chosen.
    pub fn from_upload(declared: Option<&str>, data: Vec<u8>) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        let media_type = resolve_media_type(declared, &data);
        Some(Self { media_type, data })
    }

    /// Reads a file from disk, sniffing the media type from its contents.
    pub async fn from_path(path: &Path) -> Result<Self, ShopcopyError> {
        let data = tokio::fs::read(path).await?;
        Self::from_upload(None, data).ok_or_else(|| {
            ShopcopyError::InvalidImage(format!("{} is empty", path.display()))
        })
    }

    /// Parses a `data:<media type>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, ShopcopyError> {
        let captures = DATA_URI
            .captures(uri.trim())
            .ok_or_else(|| ShopcopyError::InvalidImage("not a data URI".to_string()))?;
        let is_base64 = captures
            .name("params")
            .map(|params| {
                params
                    .as_str()
                    .split(';')
                    .any(|param| param.eq_ignore_ascii_case("base64"))
            })
            .unwrap_or(false);
        if !is_base64 {
            return Err(ShopcopyError::InvalidImage(
                "data URI is not base64 encoded".to_string(),
            ));
        }
        // base64 may arrive wrapped across lines
        let payload: String = captures
            .name("payload")
            .map(|m| m.as_str())
            .unwrap_or("")
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let data = general_purpose::STANDARD
            .decode(&payload)
            .map_err(|err| ShopcopyError::InvalidImage(format!("bad base64 payload: {err}")))?;
        let declared = captures.name("media").map(|m| m.as_str());
        Self::from_upload(declared, data)
            .ok_or_else(|| ShopcopyError::InvalidImage("data URI has no payload".to_string()))
    }

    /// Renders the image as a data URI.
    pub fn to_data_uri(&self) -> String {
        let (media_type, payload) = self.parts();
        format!("data:{media_type};base64,{payload}")
    }

    /// Splits the image into the media type and base64 payload the model APIs want.
    pub fn parts(&self) -> (&str, String) {
        (
            self.media_type.as_str(),
            general_purpose::STANDARD.encode(&self.data),
        )
    }

    /// The declared or sniffed media type.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if there are no bytes, which `from_upload` never produces.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Picks a media type: declared wins unless it's missing or generic, then magic bytes, then octet-stream.
fn resolve_media_type(declared: Option<&str>, data: &[u8]) -> String {
    let declared = declared
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case(FALLBACK_MEDIA_TYPE));
    if let Some(declared) = declared {
        return declared.to_ascii_lowercase();
    }
    match image::guess_format(data) {
        Ok(format) => format.to_mime_type().to_string(),
        Err(err) => {
            debug!("Couldn't sniff upload format: {}", err);
            FALLBACK_MEDIA_TYPE.to_string()
        }
    }
}
