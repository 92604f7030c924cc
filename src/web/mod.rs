//! The single page, its form posts and the supporting routes.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::header::CACHE_CONTROL;
use tokio::sync::RwLock;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing::error;

use crate::constants::MAX_UPLOAD_BYTES;
use crate::copy::FieldKey;
use crate::encoded_image::EncodedImage;
use crate::generation::Generator;
use crate::store::{CycleTicket, ResultStore};

mod api;
mod csrf;
mod flash;
mod prelude;
mod views;

use api::{api_generate_handler, result_handler};
use csrf::{csrf_token, validate_csrf};
use flash::Flash;
use prelude::*;
use views::HomeTemplate;

/// Shared between handlers and the background generation tasks.
#[derive(Clone, Debug)]
pub struct AppState {
    store: Arc<RwLock<ResultStore>>,
    generator: Arc<Generator>,
}

impl AppState {
    /// Wraps a generator with an empty store.
    pub fn new(generator: Generator) -> Self {
        Self {
            store: Arc::new(RwLock::new(ResultStore::new())),
            generator: Arc::new(generator),
        }
    }

    /// The page state, for callers that want to look without going through HTTP.
    pub fn store(&self) -> Arc<RwLock<ResultStore>> {
        self.store.clone()
    }
}

#[derive(Deserialize)]
pub(crate) struct GenerateForm {
    csrf_token: Option<String>,
}

/// GET /
async fn home_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<HomeTemplate, ShopcopyError> {
    let csrf_token = csrf_token(&session).await?;
    let flash = flash::take_flash_message(&session).await?;
    let mut store = state.store.write().await;
    Ok(HomeTemplate::from_store(
        &mut store,
        state.generator.variant().label(),
        csrf_token,
        flash,
    ))
}

/// POST /upload, replaces the current image. An empty file field is a no-op.
async fn upload_handler(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Redirect, ShopcopyError> {
    let mut csrf_token_value: Option<String> = None;
    let mut image: Option<EncodedImage> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "csrf_token" => {
                csrf_token_value = Some(field.text().await?);
            }
            "image" => {
                let declared = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                image = EncodedImage::from_upload(declared.as_deref(), bytes.to_vec());
            }
            _ => {}
        }
    }

    let csrf_token_value = csrf_token_value.ok_or(ShopcopyError::BadRequest)?;
    validate_csrf(&session, &csrf_token_value).await?;

    match image {
        Some(image) => {
            state.store.write().await.load_image(image);
            flash::set_flash(&session, Flash::ImageLoaded).await?;
        }
        None => debug!("Upload had no file, nothing to do"),
    }
    Ok(Redirect::to("/"))
}

/// POST /generate, starts a cycle in the background if the generate control is enabled.
async fn generate_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<GenerateForm>,
) -> Result<Redirect, ShopcopyError> {
    let csrf_token_value = form.csrf_token.ok_or(ShopcopyError::BadRequest)?;
    validate_csrf(&session, &csrf_token_value).await?;

    let ticket = state.store.write().await.begin_cycle();
    if let Some(ticket) = ticket {
        flash::set_flash(&session, Flash::GenerationStarted).await?;
        tokio::spawn(run_cycle(state.clone(), ticket));
    }
    Ok(Redirect::to("/"))
}

/// Runs the pipeline for a ticket and always hands the outcome back to the store.
pub(crate) async fn run_cycle(state: AppState, ticket: CycleTicket) {
    let outcome = state.generator.run(ticket.image()).await;
    state.store.write().await.finish_cycle(ticket, outcome);
}

/// GET /image, the current upload for the preview.
async fn image_handler(State(state): State<AppState>) -> Result<Response, ShopcopyError> {
    let store = state.store.read().await;
    let Some(image) = store.image() else {
        return Err(ShopcopyError::NotFound("/image".to_string()));
    };
    let content_type = HeaderValue::from_str(image.media_type())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CACHE_CONTROL, "no-store")
        .body(axum::body::Body::from(image.bytes().to_vec()))?;
    Ok(response)
}

/// GET /result/{field}, exactly what that field's copy button puts on the clipboard.
async fn result_field_handler(
    State(state): State<AppState>,
    Path(field): Path<String>,
) -> Result<Response, ShopcopyError> {
    let key = FieldKey::parse(&field).ok_or_else(|| ShopcopyError::NotFound(field.clone()))?;
    let store = state.store.read().await;
    let field = store
        .result()
        .and_then(|result| result.field(key))
        .ok_or_else(|| ShopcopyError::NotFound(field.clone()))?;
    Ok((
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        field.copy_text().to_string(),
    )
        .into_response())
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

async fn script_handler() -> impl IntoResponse {
    const SCRIPT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/app.js"));
    ([(CONTENT_TYPE, "text/javascript")], SCRIPT)
}

/// Builds the app with sessions and the upload size limit applied.
pub fn create_router(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
    Router::new()
        .route("/", axum::routing::get(home_handler))
        .route("/upload", axum::routing::post(upload_handler))
        .route("/generate", axum::routing::post(generate_handler))
        .route("/image", axum::routing::get(image_handler))
        .route("/result", axum::routing::get(result_handler))
        .route("/result/{field}", axum::routing::get(result_field_handler))
        .route("/api/generate", axum::routing::post(api_generate_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .route("/static/app.js", axum::routing::get(script_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(session_layer)
        .with_state(state)
}

/// Binds the listener and serves until the process is told to stop.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    generator: Generator,
) -> Result<(), anyhow::Error> {
    info!("Generating with the {} pipeline", generator.variant());
    let app = create_router(AppState::new(generator));

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::config::GeneratorConfig;
    use crate::copy::{GenerationResult, ListingCopy};
    use crate::generation::GenerationOutcome;

    const BOUNDARY: &str = "shopcopy-test-boundary";

    fn setup_state() -> AppState {
        let generator = Generator::new(&GeneratorConfig::default()).expect("build generator");
        AppState::new(generator)
    }

    async fn read_body(response: Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        String::from_utf8_lossy(&bytes).to_string()
    }

    /// Loads the home page, returning the session cookie and CSRF token.
    async fn session_and_token(app: &Router) -> (String, String) {
        let request = Request::builder()
            .method("GET")
            .uri("/")
            .body(Body::empty())
            .expect("build request");
        let response = app.clone().oneshot(request).await.expect("GET /");
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .expect("session cookie")
            .to_string();
        let body = read_body(response).await;
        let marker = r#"name="csrf_token" value=""#;
        let start = body.find(marker).expect("csrf field") + marker.len();
        let token: String = body[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        (cookie, token)
    }

    fn multipart_body(token: &str, file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"csrf_token\"\r\n\r\n{token}\r\n"
            )
            .as_bytes(),
        );
        match file {
            Some((content_type, bytes)) => {
                body.extend_from_slice(
                    format!(
                        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"shoe.png\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
            None => body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"\"\r\nContent-Type: application/octet-stream\r\n\r\n\r\n"
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn upload(app: &Router, cookie: &str, token: &str, file: Option<(&str, &[u8])>) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(COOKIE, cookie)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(token, file)))
            .expect("build request");
        app.clone().oneshot(request).await.expect("POST /upload")
    }

    async fn generate(app: &Router, cookie: &str, token: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri("/generate")
            .header(COOKIE, cookie)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("csrf_token={token}")))
            .expect("build request");
        app.clone().oneshot(request).await.expect("POST /generate")
    }

    async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let request = builder.body(Body::empty()).expect("build request");
        app.clone().oneshot(request).await.expect("GET")
    }

    #[tokio::test]
    async fn home_page_disables_generate_without_image() {
        let app = create_router(setup_state());
        let response = get(&app, "/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert!(body.contains("drag and drop"));
        assert!(body.contains(r#"id="generate-button" disabled"#));
        assert!(!body.contains(r#"src="/image""#));
    }

    #[tokio::test]
    async fn upload_then_preview() {
        let app = create_router(setup_state());
        let (cookie, token) = session_and_token(&app).await;

        let response = upload(&app, &cookie, &token, Some(("image/png", b"fake png bytes"))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).expect("location"), "/");

        let response = get(&app, "/image", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).expect("content type"),
            "image/png"
        );
        assert_eq!(read_body(response).await, "fake png bytes");

        let body = read_body(get(&app, "/", Some(&cookie)).await).await;
        assert!(body.contains("Image loaded."));
        assert!(body.contains(r#"src="/image""#));
        assert!(!body.contains(r#"id="generate-button" disabled"#));
    }

    #[tokio::test]
    async fn empty_upload_is_a_no_op() {
        let state = setup_state();
        let store = state.store();
        let app = create_router(state);
        let (cookie, token) = session_and_token(&app).await;

        let response = upload(&app, &cookie, &token, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(store.read().await.image().is_none());
        assert_eq!(
            get(&app, "/image", None).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn upload_without_valid_csrf_is_rejected() {
        let state = setup_state();
        let store = state.store();
        let app = create_router(state);
        let (cookie, _token) = session_and_token(&app).await;

        let response = upload(&app, &cookie, "wrong", Some(("image/png", b"bytes"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(store.read().await.image().is_none());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let state = setup_state();
        let store = state.store();
        let app = create_router(state);
        let (cookie, token) = session_and_token(&app).await;

        let too_big = vec![0u8; MAX_UPLOAD_BYTES + 1024 * 1024];
        let response = upload(
            &app,
            &cookie,
            &token,
            Some(("image/png", too_big.as_slice())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(store.read().await.image().is_none());
    }

    #[tokio::test]
    async fn generate_checks_csrf() {
        let state = setup_state();
        let store = state.store();
        let app = create_router(state);
        let (cookie, token) = session_and_token(&app).await;
        upload(&app, &cookie, &token, Some(("image/png", b"bytes"))).await;

        let request = Request::builder()
            .method("POST")
            .uri("/generate")
            .header(COOKIE, &cookie)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::empty())
            .expect("build request");
        let response = app.clone().oneshot(request).await.expect("POST /generate");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = generate(&app, &cookie, "wrong").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!store.read().await.is_loading());
    }

    #[tokio::test]
    async fn generate_without_image_is_inert() {
        let state = setup_state();
        let store = state.store();
        let app = create_router(state);
        let (cookie, token) = session_and_token(&app).await;

        let response = generate(&app, &cookie, &token).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(!store.read().await.is_loading());
        let body = read_body(get(&app, "/", Some(&cookie)).await).await;
        assert!(!body.contains("role=\"alert\""));
    }

    #[tokio::test]
    async fn failed_cycle_shows_alert_once() {
        let state = setup_state();
        let store = state.store();
        let app = create_router(state);
        let (cookie, token) = session_and_token(&app).await;
        upload(&app, &cookie, &token, Some(("image/png", b"bytes"))).await;

        let response = generate(&app, &cookie, &token).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        // no keys are configured, so the cycle fails without touching the network
        for _ in 0..100 {
            if !store.read().await.is_loading() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let snapshot: serde_json::Value =
            serde_json::from_str(&read_body(get(&app, "/result", None).await).await)
                .expect("snapshot json");
        assert_eq!(snapshot["phase"], "failed");
        assert_eq!(snapshot["result"], serde_json::Value::Null);
        assert_eq!(snapshot["notice"], "no API key configured for Gemini");

        let body = read_body(get(&app, "/", Some(&cookie)).await).await;
        assert!(body.contains("no API key configured for Gemini"));
        assert!(!body.contains("Generated copy"));
        let body = read_body(get(&app, "/", Some(&cookie)).await).await;
        assert!(!body.contains("no API key configured for Gemini"));
    }

    #[tokio::test]
    async fn result_field_returns_copy_text() {
        let state = setup_state();
        {
            let mut store = state.store.write().await;
            store.load_image(EncodedImage::new("image/png", vec![1]));
            let ticket = store.begin_cycle().expect("ticket");
            store.finish_cycle(
                ticket,
                GenerationOutcome::Success {
                    result: GenerationResult::Listing(ListingCopy {
                        title: "Stoneware Mug".to_string(),
                        description: "Holds 350ml & keeps it hot.".to_string(),
                        tags: vec!["mug".to_string(), "stoneware".to_string()],
                    }),
                },
            );
        }
        let app = create_router(state);

        let response = get(&app, "/result/tags", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_body(response).await, "mug, stoneware");

        let response = get(&app, "/result/description", None).await;
        assert_eq!(read_body(response).await, "Holds 350ml & keeps it hot.");

        assert_eq!(
            get(&app, "/result/meta-title", None).await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get(&app, "/result/price", None).await.status(),
            StatusCode::NOT_FOUND
        );

        let body = read_body(get(&app, "/", None).await).await;
        assert!(body.contains("Stoneware Mug"));
        assert!(body.contains(r#"data-copy="Holds 350ml &#38; keeps it hot.""#));
    }

    #[tokio::test]
    async fn api_generate_rejects_bad_data_uri() {
        let app = create_router(setup_state());
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"image":"not a data uri"}"#))
            .expect("build request");
        let response = app.oneshot(request).await.expect("POST /api/generate");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn api_generate_returns_tagged_failure() {
        let app = create_router(setup_state());
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"image":"data:image/png;base64,aGVsbG8="}"#))
            .expect("build request");
        let response = app.oneshot(request).await.expect("POST /api/generate");
        assert_eq!(response.status(), StatusCode::OK);
        let outcome: serde_json::Value =
            serde_json::from_str(&read_body(response).await).expect("outcome json");
        assert_eq!(outcome["status"], "failure");
        assert_eq!(outcome["reason"], "no API key configured for Gemini");
    }

    #[tokio::test]
    async fn static_assets_are_served() {
        let app = create_router(setup_state());
        let response = get(&app, "/static/app.js", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(read_body(response).await.contains("dataTransfer"));
        let response = get(&app, "/static/styles.css", None).await;
        assert_eq!(
            response.headers().get(CONTENT_TYPE).expect("content type"),
            "text/css"
        );
    }
}
