#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use roadwatch_api::config::ServerConfig;
use roadwatch_api::router::build_app_router;
use roadwatch_api::state::AppState;
use roadwatch_pipeline::{
    AccidentPipeline, ArtifactStore, ClipEncoder, ClipError, DecodeError, FfmpegSourceFactory,
    Frame, FrameSource, FrameSourceFactory, MemoryFrameSource, PgRecordSink, PipelineConfig,
};
use roadwatch_vision::{AccidentClassifier, VehicleClassifier, VisionError};

pub const BOUNDARY: &str = "roadwatch-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(media_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        upload_max_bytes: 1024 * 1024,
        media_root: media_root.to_path_buf(),
    }
}

/// Gives the same verdict for every frame.
pub struct FixedVerdict(pub &'static str);

#[async_trait]
impl AccidentClassifier for FixedVerdict {
    async fn classify_accident(&self, _jpeg: &[u8]) -> Result<String, VisionError> {
        Ok(self.0.to_string())
    }
}

/// Takes longer than any test request timeout.
pub struct StalledClassifier;

#[async_trait]
impl AccidentClassifier for StalledClassifier {
    async fn classify_accident(&self, _jpeg: &[u8]) -> Result<String, VisionError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("False".into())
    }
}

pub struct PanickingClassifier;

#[async_trait]
impl AccidentClassifier for PanickingClassifier {
    async fn classify_accident(&self, _jpeg: &[u8]) -> Result<String, VisionError> {
        panic!("classifier exploded");
    }
}

/// Always answers "car".
pub struct AlwaysCar;

#[async_trait]
impl VehicleClassifier for AlwaysCar {
    async fn classify_vehicle(&self, _jpeg: &[u8]) -> Result<String, VisionError> {
        Ok("car".into())
    }
}

/// Writes a placeholder instead of invoking ffmpeg.
pub struct PlaceholderEncoder;

#[async_trait]
impl ClipEncoder for PlaceholderEncoder {
    async fn encode(&self, _frames: &[Frame], _fps: f64, output: &Path) -> Result<(), ClipError> {
        tokio::fs::write(output, b"mp4").await.map_err(ClipError::Write)
    }
}

/// Ignores the upload and yields `count` solid 32x24 frames at 25 fps.
pub struct SyntheticFrames(pub usize);

#[async_trait]
impl FrameSourceFactory for SyntheticFrames {
    async fn open(&self, _path: &Path) -> Result<Box<dyn FrameSource>, DecodeError> {
        let frames = (0..self.0)
            .map(|i| Frame::solid(32, 24, [(i * 20) as u8, 80, 160]))
            .collect();
        Ok(Box::new(MemoryFrameSource::new(frames).with_frame_rate(25.0)))
    }
}

/// A test application plus the temporary media root it serves from.
pub struct TestApp {
    pub router: Router,
    pub media: Arc<ArtifactStore>,
    _dir: tempfile::TempDir,
}

/// Build the full application router with stub collaborators, using the
/// given database pool and a fresh media root. Uploads are decoded by ffmpeg.
pub async fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(pool, |_| {}).await
}

/// Like [`build_test_app`], with a hook to adjust the config.
pub async fn build_test_app_with(pool: PgPool, adjust: impl FnOnce(&mut ServerConfig)) -> TestApp {
    build_test_app_full(
        pool,
        adjust,
        Arc::new(FixedVerdict("True")),
        Arc::new(FfmpegSourceFactory),
    )
    .await
}

/// Every upload decodes to `frames` synthetic frames, each classified with
/// `verdict`.
pub async fn build_test_app_with_frames(pool: PgPool, frames: usize, verdict: &'static str) -> TestApp {
    build_test_app_full(
        pool,
        |_| {},
        Arc::new(FixedVerdict(verdict)),
        Arc::new(SyntheticFrames(frames)),
    )
    .await
}

pub async fn build_test_app_full(
    pool: PgPool,
    adjust: impl FnOnce(&mut ServerConfig),
    accident: Arc<dyn AccidentClassifier>,
    sources: Arc<dyn FrameSourceFactory>,
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    adjust(&mut config);

    let media = Arc::new(ArtifactStore::new(dir.path()));
    media.ensure_layout().await.unwrap();

    let pipeline = AccidentPipeline::new(
        PipelineConfig::default(),
        accident,
        Arc::new(AlwaysCar),
        Arc::new(PlaceholderEncoder),
        Arc::new(PgRecordSink::new(pool.clone())),
        Arc::clone(&media),
    );

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        pipeline: Arc::new(pipeline),
        media: Arc::clone(&media),
        sources,
    };

    TestApp {
        router: build_app_router(state, &config),
        media,
        _dir: dir,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// One multipart form part.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
