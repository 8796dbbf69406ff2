//! Pipeline endpoint: audio question plus camera frames in, spoken answer out

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use base64::Engine;
use serde::Serialize;

use super::ApiState;
use crate::frame::{AudioClip, Frame};
use crate::orchestrator::{ProcessRequest, RequestResult};

/// Upload cap for one request (audio plus all frames)
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Build process router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/process", post(process))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Process response: the pipeline result plus the encoded audio
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    #[serde(flatten)]
    pub result: RequestResult,
    pub audio_base64: String,
    pub audio_format: &'static str,
}

/// Parsed multipart upload
struct Upload {
    audio: AudioClip,
    frames: Vec<Frame>,
    max_search_duration: Option<u32>,
}

/// Run the pipeline on an uploaded request
///
/// Multipart fields: `audio` (file, required), `frames` (file, one or more,
/// in capture order), `max_search_duration` (integer seconds, optional).
async fn process(
    State(state): State<Arc<ApiState>>,
    multipart: Multipart,
) -> Result<Json<ProcessResponse>, ProcessError> {
    let upload = read_upload(multipart).await?;
    tracing::info!(
        audio_bytes = upload.audio.data.len(),
        frames = upload.frames.len(),
        max_search_duration = ?upload.max_search_duration,
        "process request received"
    );

    let workdir = tempfile::TempDir::new().map_err(crate::Error::from)?;
    let output = workdir.path().join("response.mp3");

    let result = state
        .orchestrator
        .process(ProcessRequest {
            audio: upload.audio,
            frames: upload.frames,
            output: output.clone(),
            max_search_duration: upload.max_search_duration,
        })
        .await?;

    let audio = tokio::fs::read(&output).await.map_err(crate::Error::from)?;

    Ok(Json(ProcessResponse {
        result,
        audio_base64: base64::engine::general_purpose::STANDARD.encode(audio),
        audio_format: "mp3",
    }))
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ProcessError> {
    let mut audio = None;
    let mut frames = Vec::new();
    let mut max_search_duration = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProcessError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(ToString::to_string);
        let content_type = field.content_type().map(ToString::to_string);

        match name.as_str() {
            "audio" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ProcessError::BadRequest(format!("unreadable audio: {e}")))?;
                if data.is_empty() {
                    return Err(ProcessError::BadRequest("audio file is empty".to_string()));
                }
                audio = Some(AudioClip::new(
                    data.to_vec(),
                    filename.unwrap_or_else(|| "audio.wav".to_string()),
                ));
            }
            "frames" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ProcessError::BadRequest(format!("unreadable frame: {e}")))?;
                let mut frame = Frame::new(
                    data.to_vec(),
                    content_type.unwrap_or_else(|| "image/jpeg".to_string()),
                );
                if let Some(filename) = filename {
                    frame = frame.with_filename(filename);
                }
                frames.push(frame);
            }
            "max_search_duration" => {
                let raw = field.text().await.map_err(|e| {
                    ProcessError::BadRequest(format!("unreadable max_search_duration: {e}"))
                })?;
                let seconds = raw.trim().parse::<u32>().map_err(|_| {
                    ProcessError::BadRequest(format!(
                        "max_search_duration must be a whole number of seconds, got '{raw}'"
                    ))
                })?;
                max_search_duration = Some(seconds);
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let audio =
        audio.ok_or_else(|| ProcessError::BadRequest("audio file is required".to_string()))?;
    if frames.is_empty() {
        return Err(ProcessError::BadRequest(
            "at least one frames part is required".to_string(),
        ));
    }

    Ok(Upload {
        audio,
        frames,
        max_search_duration,
    })
}

/// Process API errors
#[derive(Debug)]
pub enum ProcessError {
    BadRequest(String),
    Pipeline(crate::Error),
}

impl From<crate::Error> for ProcessError {
    fn from(e: crate::Error) -> Self {
        Self::Pipeline(e)
    }
}

impl IntoResponse for ProcessError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Pipeline(e) => {
                let (status, code) = match &e {
                    crate::Error::InvalidInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input"),
                    crate::Error::Stt(_) => (StatusCode::BAD_GATEWAY, "transcription_failed"),
                    crate::Error::Tts(_) => (StatusCode::BAD_GATEWAY, "synthesis_failed"),
                    crate::Error::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
                };
                tracing::error!(error = %e, code, "request failed");
                (status, code, e.to_string())
            }
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
