//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod accident_record_repo;

pub use accident_record_repo::AccidentRecordRepo;
