//! Route definitions for uploads and accident record listings.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{accidents, records};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload/", post(accidents::upload_video))
        .route("/report_accident/", post(accidents::report_accident))
        .route("/accident_images/", get(records::list_images))
        .route("/accident_videos/", get(records::list_videos))
        .route("/vehicle_types/", get(records::vehicle_stats))
}
