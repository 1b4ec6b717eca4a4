//! HTTP surface.
//!
//! - `GET /` greeting
//! - `POST /doar` multipart donation (`text`/`texto`, `lat`, `lon`, `audio_file`)
//! - `GET /memorias` located memories for the map
//! - `GET /audio/*` locally vaulted audio, when a local vault is in use

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::memory::{Location, MapMemory};
use crate::pipeline::{AudioJob, Pipeline, PipelineError, TempAudio, audio_extension};
use crate::queue::AudioQueue;
use crate::store::list_located;

/// Shared request state.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub queue: AudioQueue,
    /// Where uploads wait for the background worker.
    pub temp_dir: PathBuf,
}

/// `{status, message}` body returned by `/doar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Greeting {
    message: &'static str,
}

/// Acknowledgement for accepted audio. Sent before any processing happens.
pub const AUDIO_ACCEPTED: &str =
    "Your audio memory was received and is being processed by Eunoia. Thank you!";
pub const TEXT_ACCEPTED: &str = "Text memory received.";
pub const NOTHING_RECEIVED: &str = "No data received.";

/// Errors a handler can answer with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or empty submission. Answered with HTTP 200 and an error body.
    #[error("{0}")]
    Invalid(String),
    #[error("upload too large")]
    TooLarge,
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Invalid(msg) => {
                debug!(%msg, "rejected donation");
                (StatusCode::OK, Json(StatusMessage::error(msg))).into_response()
            }
            ApiError::TooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(StatusMessage::error("upload too large")),
            )
                .into_response(),
            ApiError::Pipeline(e) => {
                error!(error = %e, "request failed");
                internal_error()
            }
            ApiError::Internal(e) => {
                error!(error = ?e, "request failed");
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StatusMessage::error("internal server error")),
    )
        .into_response()
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::TooLarge
        } else {
            ApiError::Invalid(format!("malformed form: {}", e.body_text()))
        }
    }
}

/// Raw fields of a `/doar` form.
#[derive(Debug, Default)]
struct Donation {
    text: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
    audio: Option<(Option<String>, Bytes)>,
}

impl Donation {
    async fn read(mut form: Multipart) -> Result<Self, ApiError> {
        let mut d = Donation::default();
        while let Some(field) = form.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "text" | "texto" => d.text = Some(field.text().await?),
                "lat" => d.lat = Some(field.text().await?),
                "lon" => d.lon = Some(field.text().await?),
                "audio_file" => {
                    let file_name = field.file_name().map(str::to_string);
                    d.audio = Some((file_name, field.bytes().await?));
                }
                other => debug!(field = other, "ignoring unknown form field"),
            }
        }
        Ok(d)
    }

    fn location(&self) -> Result<Option<Location>, ApiError> {
        Ok(Location::from_parts(
            parse_coord("lat", self.lat.as_deref())?,
            parse_coord("lon", self.lon.as_deref())?,
        ))
    }
}

/// Blank counts as absent; anything else must be a finite float.
fn parse_coord(name: &str, raw: Option<&str>) -> Result<Option<f64>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ApiError::Invalid(format!("{name} must be a number"))),
    }
}

async fn greet() -> Json<Greeting> {
    Json(Greeting {
        message: "Eunoia is online and listening to the soul of the world.",
    })
}

async fn donate(
    State(state): State<Arc<AppState>>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Json<StatusMessage>, ApiError> {
    let form = form.map_err(|e| ApiError::Invalid(e.body_text()))?;
    let donation = Donation::read(form).await?;
    let location = donation.location()?;

    if let Some((file_name, bytes)) = donation.audio.filter(|(_, b)| !b.is_empty()) {
        let ext = audio_extension(file_name.as_deref());
        let audio = TempAudio::write(&state.temp_dir, &ext, &bytes)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
        info!(path = %audio.path().display(), "audio donation accepted");
        if let Err(e) = state.queue.enqueue(AudioJob { audio, location }) {
            error!(error = %e, "audio donation dropped");
        }
        return Ok(Json(StatusMessage::success(AUDIO_ACCEPTED)));
    }

    if let Some(text) = donation.text.filter(|t| !t.trim().is_empty()) {
        let id = state.pipeline.submit_text(&text, location).await?;
        debug!(%id, "text donation stored");
        return Ok(Json(StatusMessage::success(TEXT_ACCEPTED)));
    }

    Err(ApiError::Invalid(NOTHING_RECEIVED.into()))
}

async fn memories(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MapMemory>>, ApiError> {
    Ok(Json(list_located(state.pipeline.store.as_ref()).await?))
}

/// Build the application router.
///
/// `audio_dir` is served under `/audio` when the local vault is in use.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize, audio_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/", get(greet))
        .route("/doar", post(donate))
        .route("/memorias", get(memories));
    if let Some(dir) = audio_dir {
        app = app.nest_service("/audio", ServeDir::new(dir));
    }
    app.layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve `app` on `addr` until `shutdown` resolves.
pub async fn serve(
    app: Router,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("http server stopped");
    Ok(())
}
