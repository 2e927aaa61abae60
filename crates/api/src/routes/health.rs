use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when every check passes, `degraded` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Whether clips and frames can be written under the media root.
    pub media_writable: bool,
}

/// GET /health -- reports database reachability and media root writability.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = roadwatch_db::health_check(&state.pool).await.is_ok();

    let media_writable = match state.media.check_writable().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Media root is not writable");
            false
        }
    };

    let status = if db_healthy && media_writable {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        media_writable,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
