//! JSON endpoints for scripts and other non-browser clients.

use axum::Json;
use chrono::{DateTime, Utc};

use super::prelude::*;
use crate::copy::GenerationResult;
use crate::encoded_image::EncodedImage;
use crate::generation::GenerationOutcome;
use crate::store::GenerationPhase;

#[derive(Deserialize, Debug)]
pub(crate) struct ApiGenerateRequest {
    /// `data:<media type>;base64,<payload>`
    image: String,
}

/// What the store holds right now, for polling.
#[derive(Serialize, Debug)]
pub(crate) struct StoreSnapshot {
    phase: &'static str,
    can_generate: bool,
    has_image: bool,
    result: Option<GenerationResult>,
    generated_at: Option<DateTime<Utc>>,
    notice: Option<String>,
}

fn phase_name(phase: GenerationPhase) -> &'static str {
    match phase {
        GenerationPhase::Idle => "idle",
        GenerationPhase::Loading => "loading",
        GenerationPhase::Succeeded => "succeeded",
        GenerationPhase::Failed => "failed",
    }
}

/// Runs one cycle for the posted image without touching the page's store.
pub(crate) async fn api_generate_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiGenerateRequest>,
) -> Result<Json<GenerationOutcome>, ShopcopyError> {
    let image = EncodedImage::from_data_uri(&request.image)?;
    info!(
        "API generation for {} byte {} image",
        image.len(),
        image.media_type()
    );
    Ok(Json(state.generator.run(&image).await))
}

/// GET /result, the store as JSON. Doesn't consume the pending notice.
pub(crate) async fn result_handler(State(state): State<AppState>) -> Json<StoreSnapshot> {
    let store = state.store.read().await;
    Json(StoreSnapshot {
        phase: phase_name(store.phase()),
        can_generate: store.can_generate(),
        has_image: store.image().is_some(),
        result: store.result().cloned(),
        generated_at: store.generated_at(),
        notice: store.notice().map(str::to_string),
    })
}
