//! Accident record entity model and DTOs.

use roadwatch_core::types::{DbId, Timestamp};
use roadwatch_core::vehicle::VehicleType;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `accident_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccidentRecord {
    pub id: DbId,
    pub event_id: Uuid,
    pub detected_at: Timestamp,
    /// `videos/<file>`; `None` when the clip could not be assembled.
    pub video_path: Option<String>,
    /// `images/<file>`; `None` when the frame could not be written.
    pub image_path: Option<String>,
    pub vehicle_type: String,
    pub frame_position: i64,
    pub created_at: Timestamp,
}

/// DTO for inserting an accident record.
#[derive(Debug, Clone)]
pub struct CreateAccidentRecord {
    pub event_id: Uuid,
    pub detected_at: Timestamp,
    pub video_path: Option<String>,
    pub image_path: Option<String>,
    pub vehicle_type: VehicleType,
    pub frame_position: i64,
}

/// One row of the per-vehicle-type aggregate.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct VehicleTypeCount {
    pub vehicle_type: String,
    pub count: i64,
}
