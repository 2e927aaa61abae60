//! Route tables. All routes are mounted at the root.
//!
//! ```text
//! GET  /health                         service and database health
//!
//! POST /upload/                        upload a video, detect and record
//! POST /report_accident/               same, with a required vehicle type
//! GET  /accident_images/               all records, frame view
//! GET  /accident_videos/               all records, clip view
//! GET  /vehicle_types/                 record counts per vehicle type
//!
//! GET  /accident_video/{filename}      published clip (range requests)
//! GET  /accident_frame/{filename}      published frame
//! ```

pub mod accidents;
pub mod health;
pub mod media;
