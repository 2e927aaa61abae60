//! Record persistence seam.

use async_trait::async_trait;
use roadwatch_db::models::accident_record::CreateAccidentRecord;
use roadwatch_db::repositories::AccidentRecordRepo;
use roadwatch_db::DbPool;
use uuid::Uuid;

const EVENT_ID_CONSTRAINT: &str = "uq_accident_records_event_id";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A record for this event already exists.
    #[error("accident event {0} already recorded")]
    Duplicate(Uuid),
}

/// Durable storage for accident records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert(&self, record: &CreateAccidentRecord) -> Result<(), StoreError>;

    /// Whether a record for `event_id` has been committed.
    async fn contains(&self, event_id: Uuid) -> Result<bool, StoreError>;
}

/// [`RecordSink`] backed by the `accident_records` table.
#[derive(Debug, Clone)]
pub struct PgRecordSink {
    pool: DbPool,
}

impl PgRecordSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSink for PgRecordSink {
    async fn insert(&self, record: &CreateAccidentRecord) -> Result<(), StoreError> {
        match AccidentRecordRepo::create(&self.pool, record).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some("23505")
                    && db_err.constraint() == Some(EVENT_ID_CONSTRAINT) =>
            {
                Err(StoreError::Duplicate(record.event_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn contains(&self, event_id: Uuid) -> Result<bool, StoreError> {
        Ok(AccidentRecordRepo::find_by_event_id(&self.pool, event_id)
            .await?
            .is_some())
    }
}
