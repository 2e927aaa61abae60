//! Shared domain types for the accident detection service.
//!
//! Nothing in here talks to the network or the database. The only I/O is
//! the `ffprobe` wrapper in [`ffmpeg`], which every crate that touches video
//! files goes through.

pub mod error;
pub mod ffmpeg;
pub mod naming;
pub mod types;
pub mod vehicle;
pub mod verdict;
