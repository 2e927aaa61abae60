//! Handlers for accident record listings and aggregates.

use axum::extract::State;
use axum::Json;
use roadwatch_core::types::format_listing_timestamp;
use roadwatch_db::models::accident_record::{AccidentRecord, VehicleTypeCount};
use roadwatch_db::repositories::AccidentRecordRepo;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ImageEntry {
    pub timestamp: String,
    pub image_path: Option<String>,
    pub vehicle_type: String,
}

#[derive(Debug, Serialize)]
pub struct ImageListResponse {
    pub images: Vec<ImageEntry>,
}

#[derive(Debug, Serialize)]
pub struct VideoEntry {
    pub timestamp: String,
    pub video_path: Option<String>,
    pub image_path: Option<String>,
    pub vehicle_type: String,
}

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoEntry>,
}

#[derive(Debug, Serialize)]
pub struct VehicleStatsResponse {
    pub vehicle_stats: Vec<VehicleTypeCount>,
}

impl From<AccidentRecord> for ImageEntry {
    fn from(r: AccidentRecord) -> Self {
        Self {
            timestamp: format_listing_timestamp(&r.detected_at),
            image_path: r.image_path,
            vehicle_type: r.vehicle_type,
        }
    }
}

impl From<AccidentRecord> for VideoEntry {
    fn from(r: AccidentRecord) -> Self {
        Self {
            timestamp: format_listing_timestamp(&r.detected_at),
            video_path: r.video_path,
            image_path: r.image_path,
            vehicle_type: r.vehicle_type,
        }
    }
}

/// GET /accident_images/
pub async fn list_images(State(state): State<AppState>) -> AppResult<Json<ImageListResponse>> {
    let records = AccidentRecordRepo::list_all(&state.pool).await?;
    Ok(Json(ImageListResponse {
        images: records.into_iter().map(ImageEntry::from).collect(),
    }))
}

/// GET /accident_videos/
pub async fn list_videos(State(state): State<AppState>) -> AppResult<Json<VideoListResponse>> {
    let records = AccidentRecordRepo::list_all(&state.pool).await?;
    Ok(Json(VideoListResponse {
        videos: records.into_iter().map(VideoEntry::from).collect(),
    }))
}

/// GET /vehicle_types/
///
/// Counts per vehicle type, most frequent first.
pub async fn vehicle_stats(
    State(state): State<AppState>,
) -> AppResult<Json<VehicleStatsResponse>> {
    let vehicle_stats = AccidentRecordRepo::vehicle_type_stats(&state.pool).await?;
    Ok(Json(VehicleStatsResponse { vehicle_stats }))
}
