use rand::RngExt;
use rand::distr::Alphanumeric;
use tower_sessions::Session;

use crate::error::ShopcopyError;

const CSRF_TOKEN_KEY: &str = "csrf_token";

/// Length of CSRF session tokens
const CSRF_TOKEN_LENGTH: usize = 32;

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Returns the session's token, minting one on first use.
pub(crate) async fn csrf_token(session: &Session) -> Result<String, ShopcopyError> {
    let existing = session
        .get::<String>(CSRF_TOKEN_KEY)
        .await
        .map_err(|err| ShopcopyError::InternalServerError(err.to_string()))?;
    if let Some(token) = existing {
        return Ok(token);
    }
    let token = generate_token();
    session
        .insert(CSRF_TOKEN_KEY, token.clone())
        .await
        .map_err(|err| ShopcopyError::InternalServerError(err.to_string()))?;
    Ok(token)
}

pub(crate) async fn validate_csrf(session: &Session, token: &str) -> Result<(), ShopcopyError> {
    let stored = session
        .get::<String>(CSRF_TOKEN_KEY)
        .await
        .map_err(|err| ShopcopyError::InternalServerError(err.to_string()))?;
    match stored {
        Some(expected) if !token.is_empty() && expected == token => Ok(()),
        _ => Err(ShopcopyError::Unauthorized),
    }
}
