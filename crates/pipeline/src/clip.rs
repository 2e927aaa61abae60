//! Clip assembly from buffered frames.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::frame::Frame;

#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("no frames to encode")]
    Empty,

    #[error("frame {position} is {found:?}, expected {expected:?}")]
    InconsistentDimensions {
        expected: (u32, u32),
        found: (u32, u32),
        position: usize,
    },

    #[error("invalid clip frame rate: {0}")]
    InvalidFrameRate(f64),

    #[error("failed to start ffmpeg: {0}")]
    Spawn(std::io::Error),

    #[error("failed to write frames to ffmpeg: {0}")]
    Write(std::io::Error),

    #[error("ffmpeg encode failed (exit code {exit_code:?}): {stderr}")]
    Ffmpeg {
        exit_code: Option<i32>,
        stderr: String,
    },
}

/// Encodes an ordered run of same-sized frames into a playable video file.
#[async_trait]
pub trait ClipEncoder: Send + Sync {
    async fn encode(&self, frames: &[Frame], fps: f64, output: &Path) -> Result<(), ClipError>;
}

/// Check that `frames` is non-empty, uniformly sized and `fps` is usable.
/// Returns the common dimensions.
pub fn validate_clip(frames: &[Frame], fps: f64) -> Result<(u32, u32), ClipError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(ClipError::InvalidFrameRate(fps));
    }
    let first = frames.first().ok_or(ClipError::Empty)?;
    let expected = first.dimensions();

    for (position, frame) in frames.iter().enumerate().skip(1) {
        let found = frame.dimensions();
        if found != expected {
            return Err(ClipError::InconsistentDimensions {
                expected,
                found,
                position,
            });
        }
    }
    Ok(expected)
}

/// Validate `frames` and hand them to `encoder`. A partially written output
/// file is removed on failure.
pub async fn assemble_clip(
    encoder: &dyn ClipEncoder,
    frames: &[Frame],
    fps: f64,
    output: &Path,
) -> Result<(), ClipError> {
    validate_clip(frames, fps)?;

    if let Err(e) = encoder.encode(frames, fps, output).await {
        if let Err(rm) = tokio::fs::remove_file(output).await {
            if rm.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %output.display(), error = %rm, "Failed to remove partial clip");
            }
        }
        return Err(e);
    }

    tracing::debug!(path = %output.display(), frames = frames.len(), fps, "Clip assembled");
    Ok(())
}

/// H.264 MP4 encoder that streams RGB24 frames into `ffmpeg` stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegClipEncoder;

#[async_trait]
impl ClipEncoder for FfmpegClipEncoder {
    async fn encode(&self, frames: &[Frame], fps: f64, output: &Path) -> Result<(), ClipError> {
        let (width, height) = validate_clip(frames, fps)?;

        let mut child = tokio::process::Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{width}x{height}")])
            .args(["-r", &fps.to_string()])
            .args(["-i", "-"])
            // libx264 with yuv420p needs even dimensions.
            .args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"])
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-movflags", "+faststart"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ClipError::Spawn)?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipError::Spawn(std::io::Error::other("ffmpeg stdin not captured")))?;

        let mut write_result = Ok(());
        for frame in frames {
            if let Err(e) = stdin.write_all(frame.as_rgb()).await {
                write_result = Err(e);
                break;
            }
        }
        if write_result.is_ok() {
            write_result = stdin.shutdown().await;
        }
        drop(stdin);

        let status = child.wait().await.map_err(ClipError::Write)?;
        let stderr = match stderr_task {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(ClipError::Ffmpeg {
                exit_code: status.code(),
                stderr,
            });
        }
        write_result.map_err(ClipError::Write)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;

    use super::*;

    #[derive(Default)]
    struct CountingEncoder {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ClipEncoder for CountingEncoder {
        async fn encode(&self, _frames: &[Frame], _fps: f64, output: &Path) -> Result<(), ClipError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(output, b"partial").await.map_err(ClipError::Write)?;
            if self.fail {
                return Err(ClipError::Ffmpeg {
                    exit_code: Some(1),
                    stderr: "boom".into(),
                });
            }
            Ok(())
        }
    }

    fn frames(dims: &[(u32, u32)]) -> Vec<Frame> {
        dims.iter().map(|&(w, h)| Frame::solid(w, h, [9, 9, 9])).collect()
    }

    #[test]
    fn validate_uniform_frames() {
        assert_eq!(validate_clip(&frames(&[(4, 2); 3]), 30.0).unwrap(), (4, 2));
    }

    #[test]
    fn validate_rejects_bad_input() {
        assert_matches!(validate_clip(&[], 30.0), Err(ClipError::Empty));
        assert_matches!(
            validate_clip(&frames(&[(4, 2), (4, 2), (2, 4)]), 30.0),
            Err(ClipError::InconsistentDimensions { position: 2, found: (2, 4), .. })
        );
        assert_matches!(
            validate_clip(&frames(&[(4, 2)]), 0.0),
            Err(ClipError::InvalidFrameRate(_))
        );
        assert_matches!(
            validate_clip(&frames(&[(4, 2)]), f64::NAN),
            Err(ClipError::InvalidFrameRate(_))
        );
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip.mp4");
        let encoder = CountingEncoder::default();

        let err = assemble_clip(&encoder, &[], 30.0, &output).await.unwrap_err();
        assert_matches!(err, ClipError::Empty);

        let err = assemble_clip(&encoder, &frames(&[(4, 2), (6, 2)]), 30.0, &output)
            .await
            .unwrap_err();
        assert_matches!(err, ClipError::InconsistentDimensions { .. });

        assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn failed_encode_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip.mp4");
        let encoder = CountingEncoder {
            fail: true,
            ..Default::default()
        };

        let err = assemble_clip(&encoder, &frames(&[(4, 2)]), 30.0, &output)
            .await
            .unwrap_err();
        assert_matches!(err, ClipError::Ffmpeg { exit_code: Some(1), .. });
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn successful_encode_keeps_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip.mp4");
        let encoder = CountingEncoder::default();

        assemble_clip(&encoder, &frames(&[(4, 2); 2]), 25.0, &output)
            .await
            .unwrap();
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
        assert!(output.exists());
    }
}
