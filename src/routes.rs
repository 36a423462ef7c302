use axum::Json;
use axum::body::Body;
use axum::extract::multipart::{Field, Multipart};
use axum::extract::Extension;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::ffmpeg;
use crate::job::{self, DeliveryStream, TempFiles};
use crate::logo::LogoPreset;
use crate::middleware::JobId;
use crate::region::WatermarkPosition;

const ALLOWED_VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "webm", "avi"];
const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];

/// Staging chunk granularity for upload writes.
const UPLOAD_CHUNK_BYTES: usize = 1024 * 1024;

#[derive(Serialize)]
pub(crate) struct PresetEntry {
    id: &'static str,
    name: &'static str,
    available: bool,
}

pub(crate) async fn health(Extension(_state): Extension<AppState>) -> impl IntoResponse {
    let ffmpeg_ok = ffmpeg::version_check().await;
    Json(json!({ "status": "healthy", "ffmpeg": ffmpeg_ok }))
}

pub(crate) async fn presets(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let presets: Vec<PresetEntry> = LogoPreset::ALL
        .into_iter()
        .map(|preset| PresetEntry {
            id: preset.id(),
            name: preset.display_name(),
            available: state.logos.is_available(preset),
        })
        .collect();

    Json(json!({ "presets": presets }))
}

struct StagedUpload {
    input: std::path::PathBuf,
    stem: String,
}

/// Stream one multipart file field to a uniquely named temp file, enforcing
/// the byte cap as data arrives. The partial file is tracked in `files`
/// before the first write, so every abort path unlinks it.
async fn stage_video_field(
    state: &AppState,
    field: &mut Field<'_>,
    job_id: &str,
    files: &mut TempFiles,
) -> ApiResult<StagedUpload> {
    let filename = field.file_name().unwrap_or("video").to_string();
    let path = std::path::Path::new(&filename);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if !ALLOWED_VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::validation(format!(
            "Invalid file type. Allowed: {}",
            ALLOWED_VIDEO_EXTENSIONS.map(|e| format!(".{e}")).join(", ")
        )));
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video")
        .to_string();

    let input = state.uploads_dir().join(format!("{job_id}.{extension}"));
    files.track(input.clone());

    let mut file = tokio::fs::File::create(&input)
        .await
        .map_err(|error| ApiError::Internal(error.into()))?;

    let mut written: u64 = 0;
    let mut pending = Vec::with_capacity(UPLOAD_CHUNK_BYTES);
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|error| ApiError::validation(format!("Malformed upload: {error}")))?
    {
        written += chunk.len() as u64;
        if written > state.max_video_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "File too large. Maximum size: {}MB",
                state.max_video_bytes / (1024 * 1024)
            )));
        }

        // Coalesce small multipart chunks into ~1MB writes.
        pending.extend_from_slice(&chunk);
        if pending.len() >= UPLOAD_CHUNK_BYTES {
            file.write_all(&pending)
                .await
                .map_err(|error| ApiError::Internal(error.into()))?;
            pending.clear();
        }
    }
    if !pending.is_empty() {
        file.write_all(&pending)
            .await
            .map_err(|error| ApiError::Internal(error.into()))?;
    }
    file.flush()
        .await
        .map_err(|error| ApiError::Internal(error.into()))?;

    info!(%job_id, %filename, bytes = written, "Upload staged");
    Ok(StagedUpload { input, stem })
}

/// Mints a job id, runs the job, and tags the response with it so the
/// error-logging layer can correlate log lines and expose the id to the
/// caller on every outcome.
pub(crate) async fn process_video(
    Extension(state): Extension<AppState>,
    multipart: Multipart,
) -> Response {
    let job_id = Uuid::new_v4().to_string();
    let mut response = match rebrand_job(&state, &job_id, multipart).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    };
    response.extensions_mut().insert(JobId(job_id));
    response
}

/// One rebranding job end to end: admission, staging, transform, delivery.
/// `files` guards every temp path, so all early returns (and panics) leave
/// the temp directories as they were found.
async fn rebrand_job(
    state: &AppState,
    job_id: &str,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut files = TempFiles::new();

    let mut staged: Option<StagedUpload> = None;
    let mut preset_value: Option<String> = None;
    let mut position_value: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::validation(format!("Malformed multipart body: {error}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                staged = Some(stage_video_field(state, &mut field, job_id, &mut files).await?);
            }
            Some("logo_preset") => {
                preset_value = Some(read_text_field(field).await?);
            }
            Some("watermark_position") => {
                position_value = Some(read_text_field(field).await?);
            }
            _ => {}
        }
    }

    let staged = staged.ok_or_else(|| ApiError::validation("No video file uploaded"))?;

    let preset = match preset_value.as_deref() {
        None => LogoPreset::default(),
        Some(value) => LogoPreset::parse(value).ok_or_else(|| {
            ApiError::validation(
                "Invalid logo preset. Allowed: lakeb2b, champions, ampliz, none",
            )
        })?,
    };

    let position = match position_value.as_deref() {
        None => WatermarkPosition::default(),
        Some(value) => WatermarkPosition::parse(value).ok_or_else(|| {
            ApiError::validation(
                "Invalid watermark position. Allowed: bottom-right, bottom-left, top-right, top-left",
            )
        })?,
    };

    let output = state.outputs_dir().join(format!("{job_id}_processed.mp4"));
    files.track(output.clone());

    info!(
        %job_id,
        preset = preset.id(),
        position = position.as_str(),
        "Processing video"
    );
    job::run_transform(state, job_id, &staged.input, &output, preset, position).await?;

    // Hand the temp files to the body stream; they are unlinked once the
    // response has been fully delivered (or the client goes away).
    let stream = DeliveryStream::open(&output, files)
        .await
        .map_err(|error| ApiError::Internal(error.into()))?;

    let download_name = format!("{}_rebranded.mp4", staged.stem);
    let content_type = mime_guess::from_path(&download_name)
        .first_or_octet_stream()
        .to_string();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{download_name}\""),
        )
        .body(Body::from_stream(stream))
        .map_err(|error| ApiError::Internal(error.into()))?;

    Ok(response)
}

async fn read_text_field(field: Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|error| ApiError::validation(format!("Malformed form field: {error}")))
}

pub(crate) async fn remove_background(
    Extension(state): Extension<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut image: Option<(String, bytes::Bytes)> = None;
    let mut output_format = "png".to_string();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::validation(format!("Malformed multipart body: {error}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
                    return Err(ApiError::validation(format!(
                        "Invalid file type. Allowed: {}",
                        ALLOWED_IMAGE_TYPES.join(", ")
                    )));
                }

                let filename = field.file_name().unwrap_or("image").to_string();
                let mut buffer = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(|error| {
                    ApiError::validation(format!("Malformed upload: {error}"))
                })? {
                    if (buffer.len() + chunk.len()) as u64 > state.max_image_bytes {
                        return Err(ApiError::PayloadTooLarge(format!(
                            "File too large. Maximum size is {}MB.",
                            state.max_image_bytes / (1024 * 1024)
                        )));
                    }
                    buffer.extend_from_slice(&chunk);
                }
                image = Some((filename, bytes::Bytes::from(buffer)));
            }
            Some("output_format") => {
                output_format = read_text_field(field).await?;
            }
            _ => {}
        }
    }

    let (filename, data) = image.ok_or_else(|| ApiError::validation("No image file uploaded"))?;

    let removal = state
        .removal
        .as_ref()
        .ok_or_else(|| ApiError::Upstream("Removal service is not configured".into()))?;

    info!(%filename, output_format, "Removing background");
    let processed = removal
        .remove_background(filename.clone(), data, &output_format)
        .await
        .map_err(|error| ApiError::Upstream(error.to_string()))?;

    let stem = std::path::Path::new(&filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format!("image/{output_format}"))
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={stem}_no_bg.{output_format}"),
        )
        .body(Body::from(processed))
        .map_err(|error| ApiError::Internal(error.into()))?;

    Ok(response)
}

/// Manual cleanup of temp files (operator maintenance).
pub(crate) async fn cleanup(Extension(state): Extension<AppState>) -> ApiResult<impl IntoResponse> {
    state.reset_workspace().await.map_err(|error| {
        error!(%error, "Workspace reset failed");
        ApiError::Internal(error.into())
    })?;

    Ok(Json(json!({ "status": "cleaned" })))
}
