//! Handlers for video uploads.
//!
//! An upload is written to the media root's `uploads/` directory, decoded
//! by the state's frame source factory and run through the detection
//! pipeline within the request.

use axum::extract::{Multipart, State};
use axum::Json;
use base64::Engine;
use roadwatch_core::error::CoreError;
use roadwatch_core::naming::{file_extension, frame_url, video_url};
use roadwatch_core::vehicle::{invalid_vehicle_type_message, VehicleType};
use roadwatch_pipeline::{LabelSource, PipelineError, PipelineOutcome};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Response to `/upload/` and `/report_accident/`.
///
/// Serializes as `{"accident_detected": false}` when nothing was found.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub accident_detected: bool,
    #[serde(flatten)]
    pub accident: Option<AccidentPayload>,
}

#[derive(Debug, Serialize)]
pub struct AccidentPayload {
    pub event_id: Uuid,
    /// `/accident_video/<file>`, or null when the clip is unavailable.
    pub video_path: Option<String>,
    /// `/accident_frame/<file>`, or null when the frame could not be saved.
    pub frame_path: Option<String>,
    /// Base64 JPEG of the detection frame.
    pub frame_base64: String,
    pub vehicle_type: VehicleType,
    /// Where the vehicle type came from.
    pub label_source: LabelSource,
}

/// Fields read from an upload form.
struct UploadForm {
    filename: String,
    data: Vec<u8>,
    vehicle_type: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut vehicle_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.mp4").to_string();
                let data = field.bytes().await?;
                file = Some((filename, data.to_vec()));
            }
            "vehicle_type" => {
                vehicle_type = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let (filename, data) =
        file.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }

    Ok(UploadForm {
        filename,
        data,
        vehicle_type,
    })
}

/// Decode the upload and run detection over it.
async fn process_upload(
    state: &AppState,
    form: UploadForm,
    manual_label: Option<&str>,
) -> AppResult<UploadResponse> {
    let extension = file_extension(&form.filename);
    let upload = state
        .media
        .save_upload(extension.as_deref(), &form.data)
        .await?;
    drop(form.data);

    tracing::info!(
        filename = %form.filename,
        path = %upload.path().display(),
        manual_label,
        "Processing uploaded video",
    );

    let mut source = state
        .sources
        .open(upload.path())
        .await
        .map_err(PipelineError::from)?;
    let outcome = state.pipeline.run(source.as_mut(), manual_label).await?;

    let response = match outcome {
        PipelineOutcome::NoAccident {
            frames_read,
            candidates_checked,
        } => {
            tracing::info!(frames_read, candidates_checked, "Upload processed, no accident");
            UploadResponse {
                accident_detected: false,
                accident: None,
            }
        }
        PipelineOutcome::Accident(report) => UploadResponse {
            accident_detected: true,
            accident: Some(AccidentPayload {
                event_id: report.event_id,
                video_path: report.clip_file.as_deref().map(video_url),
                frame_path: report.frame_file.as_deref().map(frame_url),
                frame_base64: base64::engine::general_purpose::STANDARD
                    .encode(&report.frame_jpeg),
                vehicle_type: report.vehicle_type,
                label_source: report.label_source,
            }),
        },
    };

    Ok(response)
}

/// POST /upload/
///
/// Multipart form with a required `file` and an optional `vehicle_type`. A
/// `vehicle_type` outside the vocabulary is ignored in favour of the vehicle
/// classifier.
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let form = read_upload_form(multipart).await?;
    let manual = form.vehicle_type.clone();
    let response = process_upload(&state, form, manual.as_deref()).await?;
    Ok(Json(response))
}

/// POST /report_accident/
///
/// Like `/upload/`, but `vehicle_type` is required and must be in the
/// vocabulary. It is checked before the video is touched.
pub async fn report_accident(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let form = read_upload_form(multipart).await?;

    let vehicle_type: VehicleType = match form.vehicle_type.as_deref() {
        Some(raw) => raw.parse()?,
        None => {
            return Err(AppError::Core(CoreError::Validation(
                invalid_vehicle_type_message(),
            )))
        }
    };

    let response = process_upload(&state, form, Some(vehicle_type.as_str())).await?;
    Ok(Json(response))
}
