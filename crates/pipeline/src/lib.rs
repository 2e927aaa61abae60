//! Accident detection pipeline.
//!
//! ```text
//! FrameSource ──► Sampler ──► RingBuffer (every frame)
//!                    │
//!                    └──► Candidate (every Nth frame) ──► AccidentClassifier
//!                                                           │ first "true"
//!                                                           ▼
//!                 ring snapshot ──► ClipEncoder ──► staging ──► RecordSink ──► publish
//! ```
//!
//! Every upload runs through its own [`AccidentPipeline::run`] call, which
//! owns a fresh ring buffer. Nothing here is shared between uploads except
//! the injected collaborators.

pub mod artifacts;
pub mod clip;
pub mod detection;
pub mod frame;
pub mod labels;
pub mod orchestrator;
pub mod ring_buffer;
pub mod sampler;
pub mod sink;
pub mod source;

pub use artifacts::{ArtifactError, ArtifactStore, RecoveryReport, StagedEvent, UploadedFile};
pub use clip::{assemble_clip, ClipEncoder, ClipError, FfmpegClipEncoder};
pub use detection::{detect_first_accident, Detection, DetectionResult};
pub use frame::Frame;
pub use labels::{resolve_vehicle_type, LabelSource, ResolvedLabel};
pub use orchestrator::{AccidentPipeline, AccidentReport, PipelineConfig, PipelineError, PipelineOutcome};
pub use ring_buffer::{FrameRing, RingBuffer};
pub use sampler::{Candidate, Sampler};
pub use sink::{PgRecordSink, RecordSink, StoreError};
pub use source::{
    DecodeError, FfmpegFrameSource, FfmpegSourceFactory, FrameSource, FrameSourceFactory,
    MemoryFrameSource,
};
