//! Route definitions for published accident media.

use axum::routing::get;
use axum::Router;

use crate::handlers::media;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accident_video/{filename}", get(media::get_video))
        .route("/accident_frame/{filename}", get(media::get_frame))
}
