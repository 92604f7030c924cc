use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::ShopcopyError;

const FLASH_KEY: &str = "flash";

/// One-shot confirmations shown on the next page load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Flash {
    ImageLoaded,
    GenerationStarted,
}

#[derive(Clone, Debug)]
pub(crate) struct FlashMessage {
    pub(crate) text: &'static str,
    pub(crate) class: &'static str,
}

impl Flash {
    fn message(self) -> FlashMessage {
        match self {
            Flash::ImageLoaded => FlashMessage {
                text: "Image loaded. Hit Generate when you're ready.",
                class: "success",
            },
            Flash::GenerationStarted => FlashMessage {
                text: "Generating copy, this page refreshes until it's done.",
                class: "info",
            },
        }
    }
}

pub(crate) async fn set_flash(session: &Session, flash: Flash) -> Result<(), ShopcopyError> {
    session
        .insert(FLASH_KEY, flash)
        .await
        .map_err(|err| ShopcopyError::InternalServerError(err.to_string()))
}

/// Removes the pending flash, so it only shows once.
pub(crate) async fn take_flash_message(
    session: &Session,
) -> Result<Option<FlashMessage>, ShopcopyError> {
    let flash = session
        .remove::<Flash>(FLASH_KEY)
        .await
        .map_err(|err| ShopcopyError::InternalServerError(err.to_string()))?;
    Ok(flash.map(Flash::message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    #[test]
    fn test_flash_messages() {
        assert_eq!(Flash::ImageLoaded.message().class, "success");
        assert_eq!(Flash::GenerationStarted.message().class, "info");
        assert!(
            Flash::GenerationStarted
                .message()
                .text
                .starts_with("Generating copy")
        );
    }

    #[tokio::test]
    async fn test_flash_is_taken_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        assert!(take_flash_message(&session).await.expect("take").is_none());

        set_flash(&session, Flash::ImageLoaded).await.expect("set");
        let message = take_flash_message(&session)
            .await
            .expect("take")
            .expect("pending flash");
        assert_eq!(message.class, "success");
        assert!(take_flash_message(&session).await.expect("take").is_none());
    }
}
