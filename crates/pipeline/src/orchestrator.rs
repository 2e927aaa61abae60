//! One upload, start to finish.

use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::Utc;
use roadwatch_core::naming::{stored_image_path, stored_video_path};
use roadwatch_core::types::Timestamp;
use roadwatch_core::vehicle::VehicleType;
use roadwatch_db::models::accident_record::CreateAccidentRecord;
use roadwatch_vision::{AccidentClassifier, VehicleClassifier};
use uuid::Uuid;

use crate::artifacts::ArtifactStore;
use crate::clip::{assemble_clip, ClipEncoder};
use crate::detection::{detect_first_accident, Detection, DetectionResult};
use crate::frame::Frame;
use crate::labels::{resolve_vehicle_type, LabelSource};
use crate::ring_buffer::FrameRing;
use crate::sampler::Sampler;
use crate::sink::{RecordSink, StoreError};
use crate::source::{DecodeError, FrameSource};

/// Sampling and clip parameters.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Classify every Nth frame.
    pub frame_interval: NonZeroUsize,
    /// Frames kept for the clip, ending at the detection frame.
    pub buffer_capacity: NonZeroUsize,
    /// Clip frame rate when the source does not report one.
    pub clip_fps: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_interval: NonZeroUsize::new(240).unwrap_or(NonZeroUsize::MIN),
            buffer_capacity: NonZeroUsize::new(120).unwrap_or(NonZeroUsize::MIN),
            clip_fps: 30.0,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default |
    /// |-------------------|---------|
    /// | `FRAME_INTERVAL`  | `240`   |
    /// | `BUFFER_CAPACITY` | `120`   |
    /// | `CLIP_FPS`        | `30`    |
    pub fn from_env() -> Self {
        let frame_interval: NonZeroUsize = std::env::var("FRAME_INTERVAL")
            .unwrap_or_else(|_| "240".into())
            .parse()
            .expect("FRAME_INTERVAL must be a positive integer");

        let buffer_capacity: NonZeroUsize = std::env::var("BUFFER_CAPACITY")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("BUFFER_CAPACITY must be a positive integer");

        let clip_fps: f64 = std::env::var("CLIP_FPS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("CLIP_FPS must be a number");
        assert!(
            clip_fps.is_finite() && clip_fps > 0.0,
            "CLIP_FPS must be positive"
        );

        Self {
            frame_interval,
            buffer_capacity,
            clip_fps,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("accident commit task failed: {0}")]
    Commit(#[from] tokio::task::JoinError),
}

/// A committed accident event.
#[derive(Debug, Clone)]
pub struct AccidentReport {
    pub event_id: Uuid,
    pub detected_at: Timestamp,
    /// 0-based position of the detection frame in the source.
    pub position: usize,
    pub vehicle_type: VehicleType,
    pub label_source: LabelSource,
    /// Published clip file name, `None` when the clip could not be built.
    pub clip_file: Option<String>,
    /// Published frame file name, `None` when the frame could not be written.
    pub frame_file: Option<String>,
    /// Number of frames in the clip snapshot.
    pub clip_frames: usize,
    /// JPEG of the detection frame.
    pub frame_jpeg: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    NoAccident {
        frames_read: usize,
        candidates_checked: usize,
    },
    Accident(AccidentReport),
}

/// Runs detection over a frame source and commits the first accident found.
///
/// Holds no per-upload state; every [`run`](Self::run) call owns its own
/// ring buffer, so one pipeline can serve concurrent uploads.
#[derive(Clone)]
pub struct AccidentPipeline {
    config: PipelineConfig,
    accident_classifier: Arc<dyn AccidentClassifier>,
    vehicle_classifier: Arc<dyn VehicleClassifier>,
    encoder: Arc<dyn ClipEncoder>,
    sink: Arc<dyn RecordSink>,
    artifacts: Arc<ArtifactStore>,
}

impl AccidentPipeline {
    pub fn new(
        config: PipelineConfig,
        accident_classifier: Arc<dyn AccidentClassifier>,
        vehicle_classifier: Arc<dyn VehicleClassifier>,
        encoder: Arc<dyn ClipEncoder>,
        sink: Arc<dyn RecordSink>,
        artifacts: Arc<ArtifactStore>,
    ) -> Self {
        Self {
            config,
            accident_classifier,
            vehicle_classifier,
            encoder,
            sink,
            artifacts,
        }
    }

    /// Scan `source` for an accident and, if one is found, persist it.
    ///
    /// `manual_label` is used as the vehicle type when it names one in the
    /// vocabulary; otherwise the detection frame is classified.
    pub async fn run<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        manual_label: Option<&str>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let fps = source
            .frame_rate()
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .unwrap_or(self.config.clip_fps);

        let mut ring = FrameRing::new(self.config.buffer_capacity);
        let mut sampler = Sampler::new(source, &mut ring, self.config.frame_interval);
        let result = detect_first_accident(&mut sampler, self.accident_classifier.as_ref()).await?;
        let frames_read = sampler.frames_read();
        drop(sampler);

        let detection = match result {
            DetectionResult::NotDetected { candidates_checked } => {
                tracing::info!(frames_read, candidates_checked, "No accident detected");
                return Ok(PipelineOutcome::NoAccident {
                    frames_read,
                    candidates_checked,
                });
            }
            DetectionResult::Detected(detection) => detection,
        };

        let clip_frames = ring.snapshot();
        let label = resolve_vehicle_type(
            manual_label,
            &detection.jpeg,
            self.vehicle_classifier.as_ref(),
        )
        .await;

        // Detached: the commit completes even if this future is dropped.
        let pipeline = self.clone();
        let report = tokio::spawn(async move {
            pipeline
                .commit(detection, clip_frames, fps, label.vehicle_type, label.source)
                .await
        })
        .await??;
        Ok(PipelineOutcome::Accident(report))
    }

    /// Stage artifacts, store the record, then publish.
    ///
    /// Artifact write failures only null out the affected path; the record
    /// is stored regardless.
    async fn commit(
        self,
        detection: Detection,
        clip_frames: Vec<Frame>,
        fps: f64,
        vehicle_type: VehicleType,
        label_source: LabelSource,
    ) -> Result<AccidentReport, PipelineError> {
        let event_id = Uuid::new_v4();
        let detected_at = Utc::now();
        let position = detection.candidate.position;

        let mut staged = match self.artifacts.begin(event_id).await {
            Ok(staged) => Some(staged),
            Err(e) => {
                tracing::warn!(%event_id, error = %e, "Failed to create staging directory");
                None
            }
        };

        if let Some(staged) = staged.as_mut() {
            match assemble_clip(self.encoder.as_ref(), &clip_frames, fps, &staged.clip_path()).await {
                Ok(()) => staged.mark_clip_written(),
                Err(e) => tracing::warn!(%event_id, error = %e, "Failed to assemble accident clip"),
            }

            if let Err(e) = self.artifacts.stage_frame(staged, &detection.jpeg).await {
                tracing::warn!(%event_id, error = %e, "Failed to write accident frame");
            }
        }

        let clip_file = staged.as_ref().and_then(|s| s.clip.clone());
        let frame_file = staged.as_ref().and_then(|s| s.frame.clone());

        let record = CreateAccidentRecord {
            event_id,
            detected_at,
            video_path: clip_file.as_deref().map(stored_video_path),
            image_path: frame_file.as_deref().map(stored_image_path),
            vehicle_type,
            frame_position: position as i64,
        };

        match self.sink.insert(&record).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                tracing::warn!(%event_id, "Accident record already stored");
            }
            Err(e) => {
                tracing::error!(%event_id, error = %e, "Failed to store accident record");
                if staged.is_some() {
                    if let Err(cleanup) = self.artifacts.discard(event_id).await {
                        tracing::warn!(%event_id, error = %cleanup, "Failed to discard staged artifacts");
                    }
                }
                return Err(e.into());
            }
        }

        if let Some(staged) = &staged {
            if let Err(e) = self.artifacts.publish(staged).await {
                tracing::error!(
                    %event_id,
                    error = %e,
                    "Failed to publish accident artifacts, left in staging for recovery",
                );
            }
        }

        tracing::info!(
            %event_id,
            position,
            vehicle_type = %vehicle_type,
            clip_frames = clip_frames.len(),
            has_clip = clip_file.is_some(),
            has_frame = frame_file.is_some(),
            "Accident recorded",
        );

        Ok(AccidentReport {
            event_id,
            detected_at,
            position,
            vehicle_type,
            label_source,
            clip_file,
            frame_file,
            clip_frames: clip_frames.len(),
            frame_jpeg: detection.jpeg,
        })
    }
}
