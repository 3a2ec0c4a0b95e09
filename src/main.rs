//! Snapfeeder - On-demand RTSP snapshot server
//!
//! Main entry point for the snapshot server.

use anyhow::Context;
use clap::Parser;
use snapfeeder::{
    camera_registry::{CameraConfig, CameraRegistry},
    frame_source::FfmpegFrameSource,
    image_encoder::JpegImageEncoder,
    state::{AppConfig, AppState},
    web_api,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line overrides; environment variables provide the defaults
#[derive(Debug, Parser)]
#[command(name = "snapfeeder", version, about = "On-demand JPEG snapshots from RTSP cameras")]
struct Cli {
    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Listen address
    #[arg(long)]
    host: Option<String>,

    /// MediaMTX config to read cameras from
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera as <id>=<rtsp-url>; repeatable, replaces the MediaMTX config
    #[arg(long = "camera", value_name = "ID=URL")]
    cameras: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snapfeeder=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Snapfeeder v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let cli = Cli::parse();
    let mut config = AppConfig::default();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(path) = cli.config {
        config.mediamtx_config = path;
    }
    tracing::info!(
        mediamtx_config = %config.mediamtx_config.display(),
        start_timeout_ms = config.start_timeout.as_millis() as u64,
        idle_timeout_sec = config.idle_timeout.as_secs(),
        jpeg_quality = config.jpeg_quality,
        ffmpeg = %config.ffmpeg_bin,
        "Configuration loaded"
    );

    // Camera list: --camera flags win over the MediaMTX config
    let registry = if cli.cameras.is_empty() {
        CameraRegistry::load(&config.mediamtx_config)
            .await
            .with_context(|| format!("loading {}", config.mediamtx_config.display()))?
    } else {
        let cameras = cli
            .cameras
            .iter()
            .map(|arg| CameraConfig::parse_arg(arg))
            .collect::<snapfeeder::Result<Vec<_>>>()?;
        CameraRegistry::new(cameras)?
    };
    if registry.is_empty() {
        anyhow::bail!("no RTSP publishers found in camera configuration");
    }
    for camera in registry.iter() {
        tracing::info!(
            camera_id = %camera.id,
            source = %camera.redacted_address(),
            "Camera registered"
        );
    }

    // Initialize components
    let source = Arc::new(FfmpegFrameSource::new(config.ffmpeg_config()));
    let encoder = Arc::new(JpegImageEncoder::new(config.jpeg_quality));
    let state = AppState::new(config, registry, source, encoder);
    tracing::info!(cameras = state.registry.len(), "SessionManager initialized");

    // Start idle reaper
    let reaper = state.sessions.spawn_reaper();
    tracing::info!(
        interval_ms = state.config.reap_interval.as_millis() as u64,
        "Idle reaper started"
    );

    // Drop cached images of torn down sessions
    let snapshots = state.snapshots.clone();
    let cache_cleanup = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let pruned = snapshots.prune_cache().await;
            if pruned > 0 {
                tracing::debug!(pruned = pruned, "Pruned snapshot cache");
            }
        }
    });

    // Build router
    let app = web_api::create_router(state.clone()).layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Release every source before exiting
    reaper.abort();
    cache_cleanup.abort();
    let stopped = state.sessions.shutdown().await;
    tracing::info!(stopped_sessions = stopped, "Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
