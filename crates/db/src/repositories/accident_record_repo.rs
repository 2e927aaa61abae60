//! Repository for the `accident_records` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::accident_record::{AccidentRecord, CreateAccidentRecord, VehicleTypeCount};

const COLUMNS: &str =
    "id, event_id, detected_at, video_path, image_path, vehicle_type, frame_position, created_at";

pub struct AccidentRecordRepo;

impl AccidentRecordRepo {
    /// Insert a record. Fails with a unique violation on
    /// `uq_accident_records_event_id` if the event was already committed.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAccidentRecord,
    ) -> Result<AccidentRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO accident_records (event_id, detected_at, video_path, image_path, vehicle_type, frame_position)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccidentRecord>(&query)
            .bind(input.event_id)
            .bind(input.detected_at)
            .bind(&input.video_path)
            .bind(&input.image_path)
            .bind(input.vehicle_type.as_str())
            .bind(input.frame_position)
            .fetch_one(pool)
            .await
    }

    /// Find the record committed for an event, if any.
    pub async fn find_by_event_id(
        pool: &PgPool,
        event_id: Uuid,
    ) -> Result<Option<AccidentRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM accident_records WHERE event_id = $1");
        sqlx::query_as::<_, AccidentRecord>(&query)
            .bind(event_id)
            .fetch_optional(pool)
            .await
    }

    /// All records in detection order (oldest first).
    pub async fn list_all(pool: &PgPool) -> Result<Vec<AccidentRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM accident_records ORDER BY detected_at ASC, id ASC");
        sqlx::query_as::<_, AccidentRecord>(&query)
            .fetch_all(pool)
            .await
    }

    /// Record counts grouped by vehicle type, most frequent first.
    ///
    /// Ties are broken alphabetically so the ordering is stable.
    pub async fn vehicle_type_stats(pool: &PgPool) -> Result<Vec<VehicleTypeCount>, sqlx::Error> {
        sqlx::query_as::<_, VehicleTypeCount>(
            "SELECT vehicle_type, COUNT(*) AS count \
             FROM accident_records \
             GROUP BY vehicle_type \
             ORDER BY count DESC, vehicle_type ASC",
        )
        .fetch_all(pool)
        .await
    }
}
