//! Request handlers.
//!
//! Handlers delegate to the pipeline, the repositories in `roadwatch_db` and
//! the artifact store, and map errors via [`AppError`](crate::error::AppError).

pub mod accidents;
pub mod media;
pub mod records;
