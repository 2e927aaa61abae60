use std::sync::Arc;

use roadwatch_pipeline::{AccidentPipeline, ArtifactStore, FrameSourceFactory};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything is behind an `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: roadwatch_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Detection pipeline shared by all upload requests.
    pub pipeline: Arc<AccidentPipeline>,
    /// Media root for published clips and frames.
    pub media: Arc<ArtifactStore>,
    /// Decoder for saved uploads.
    pub sources: Arc<dyn FrameSourceFactory>,
}
