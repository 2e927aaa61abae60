use std::net::SocketAddr;
use std::sync::Arc;

use roadwatch_pipeline::{
    AccidentPipeline, ArtifactStore, FfmpegClipEncoder, FfmpegSourceFactory, PgRecordSink,
    PipelineConfig,
};
use roadwatch_vision::{GeminiClient, GeminiConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roadwatch_api::config::ServerConfig;
use roadwatch_api::router::build_app_router;
use roadwatch_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "roadwatch_api=debug,roadwatch_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let pipeline_config = PipelineConfig::from_env();
    tracing::info!(
        frame_interval = pipeline_config.frame_interval.get(),
        buffer_capacity = pipeline_config.buffer_capacity.get(),
        clip_fps = pipeline_config.clip_fps,
        "Loaded pipeline configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = roadwatch_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    roadwatch_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    roadwatch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Media ---
    let media = Arc::new(ArtifactStore::new(&config.media_root));
    media
        .ensure_layout()
        .await
        .expect("Failed to create media directories");

    let sink = Arc::new(PgRecordSink::new(pool.clone()));
    let recovery = media
        .recover_staging(sink.as_ref())
        .await
        .expect("Failed to recover staged artifacts");
    tracing::info!(
        root = %config.media_root.display(),
        published = recovery.published.len(),
        discarded = recovery.discarded.len(),
        "Media root ready",
    );

    // --- Vision client ---
    let gemini = Arc::new(
        GeminiClient::new(GeminiConfig::from_env()).expect("Failed to build vision client"),
    );
    tracing::info!("Vision client created");

    // --- Pipeline ---
    let pipeline = Arc::new(AccidentPipeline::new(
        pipeline_config,
        gemini.clone(),
        gemini,
        Arc::new(FfmpegClipEncoder),
        sink,
        Arc::clone(&media),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        pipeline,
        media,
        sources: Arc::new(FfmpegSourceFactory),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
