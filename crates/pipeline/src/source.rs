//! Frame sources.
//!
//! [`FfmpegFrameSource`] decodes a video file by piping `ffmpeg` rawvideo
//! output (RGB24) and slicing it into frames of the probed size.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use roadwatch_core::ffmpeg::{self, FfmpegError, VideoStreamInfo};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;

use crate::frame::Frame;

/// Errors while decoding an uploaded video.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to probe video: {0}")]
    Probe(#[from] FfmpegError),

    #[error("failed to start ffmpeg: {0}")]
    Spawn(std::io::Error),

    #[error("failed to read decoded frames: {0}")]
    Read(std::io::Error),

    #[error("ffmpeg decode failed (exit code {exit_code:?}): {stderr}")]
    Ffmpeg {
        exit_code: Option<i32>,
        stderr: String,
    },
}

/// A finite, non-restartable sequence of frames in presentation order.
#[async_trait]
pub trait FrameSource: Send {
    /// The next frame, or `None` once the source is exhausted.
    async fn next_frame(&mut self) -> Result<Option<Frame>, DecodeError>;

    /// Native frame rate, if known.
    fn frame_rate(&self) -> Option<f64> {
        None
    }
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

/// Frames that are already decoded.
#[derive(Debug, Default)]
pub struct MemoryFrameSource {
    frames: VecDeque<Frame>,
    frame_rate: Option<f64>,
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            frame_rate: None,
        }
    }

    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    /// Frames not yet consumed.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl FrameSource for MemoryFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, DecodeError> {
        Ok(self.frames.pop_front())
    }

    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }
}

// ---------------------------------------------------------------------------
// ffmpeg source
// ---------------------------------------------------------------------------

/// Decodes the first video stream of a file with an `ffmpeg` child process.
///
/// The child is killed if the source is dropped before exhaustion, which is
/// what happens when detection short-circuits.
pub struct FfmpegFrameSource {
    path: PathBuf,
    info: VideoStreamInfo,
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    frames_decoded: usize,
    finished: bool,
}

impl FfmpegFrameSource {
    /// Probe `path` and start decoding it.
    pub async fn open(path: &Path) -> Result<Self, DecodeError> {
        let info = ffmpeg::probe_stream_info(path).await?;

        let mut child = tokio::process::Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-noautorotate", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(DecodeError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DecodeError::Spawn(std::io::Error::other("ffmpeg stdout not captured")))?;

        // Drain stderr concurrently so a chatty decoder cannot fill the pipe
        // and stall while we are blocked on stdout.
        let stderr = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        tracing::debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = ?info.frame_rate,
            "Started ffmpeg decoder",
        );

        Ok(Self {
            path: path.to_path_buf(),
            info,
            child,
            stdout,
            stderr,
            frames_decoded: 0,
            finished: false,
        })
    }

    /// Reap the child and turn a non-zero exit into an error.
    async fn finish(&mut self) -> Result<(), DecodeError> {
        self.finished = true;
        let status = self.child.wait().await.map_err(DecodeError::Read)?;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(DecodeError::Ffmpeg {
                exit_code: status.code(),
                stderr,
            });
        }

        tracing::debug!(
            path = %self.path.display(),
            frames = self.frames_decoded,
            "ffmpeg decoder finished",
        );
        Ok(())
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, DecodeError> {
        if self.finished {
            return Ok(None);
        }

        let frame_len = self.info.rgb_frame_len();
        let mut buf = vec![0u8; frame_len];
        let filled = read_full(&mut self.stdout, &mut buf)
            .await
            .map_err(DecodeError::Read)?;

        if filled < frame_len {
            if filled > 0 {
                tracing::warn!(
                    path = %self.path.display(),
                    bytes = filled,
                    expected = frame_len,
                    "Discarding truncated trailing frame",
                );
            }
            self.finish().await?;
            return Ok(None);
        }

        self.frames_decoded += 1;
        let frame = Frame::from_rgb(self.info.width, self.info.height, buf)
            .ok_or_else(|| DecodeError::Read(std::io::Error::other("frame size mismatch")))?;
        Ok(Some(frame))
    }

    fn frame_rate(&self) -> Option<f64> {
        self.info.frame_rate
    }
}

/// Opens a frame source over an uploaded file.
#[async_trait]
pub trait FrameSourceFactory: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, DecodeError>;
}

/// Decodes uploads with [`FfmpegFrameSource`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegSourceFactory;

#[async_trait]
impl FrameSourceFactory for FfmpegSourceFactory {
    async fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, DecodeError> {
        Ok(Box::new(FfmpegFrameSource::open(path).await?))
    }
}

/// Read until `buf` is full or the reader hits EOF; returns bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
