//! vidpress-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON or pretty).
//! 3. Ensure the upload, output and public directories exist.
//! 4. Build the ffmpeg transcoder and probe the binary.
//! 5. Start the artifact sweeper when artifacts are retained.
//! 6. Build the Axum router and start the HTTP server with graceful shutdown.

mod artifact;
mod config;
mod error;
mod middleware;
mod routes;
mod state;
mod upload;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use vidpress_transcode::FfmpegTranscoder;

use crate::config::{ArtifactPolicy, Config};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: VIDPRESS_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "vidpress-server starting");

    // ── 3. Directories ─────────────────────────────────────────────────────────
    for dir in [&cfg.upload_dir, &cfg.output_dir, &cfg.public_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    info!(
        upload_dir = %cfg.upload_dir.display(),
        output_dir = %cfg.output_dir.display(),
        public_dir = %cfg.public_dir.display(),
        "directories ready"
    );

    // ── 4. Transcoder ──────────────────────────────────────────────────────────
    let transcoder = FfmpegTranscoder::new(
        cfg.ffmpeg_bin.clone(),
        cfg.profile.clone(),
        cfg.transcode_timeout,
    );
    let transcoder_version = match transcoder.probe().await {
        Ok(version) => {
            info!(program = %transcoder.program().display(), %version, "transcoder found");
            Some(version)
        }
        Err(e) => {
            warn!(
                program = %transcoder.program().display(),
                error = %e,
                "transcoder probe failed; every /compress request will fail until it is installed"
            );
            None
        }
    };
    info!(
        bitrate = %cfg.profile.video_bitrate,
        width = cfg.profile.width,
        container = %cfg.profile.container,
        timeout_secs = transcoder.timeout().as_secs(),
        "transcode profile"
    );

    // ── 5. Artifact sweeper ────────────────────────────────────────────────────
    if let ArtifactPolicy::Retain { ttl } = cfg.artifact_policy {
        artifact::spawn_sweeper(cfg.output_dir.clone(), ttl, cfg.sweep_interval);
        info!(ttl_secs = ttl.as_secs(), every_secs = cfg.sweep_interval.as_secs(), "artifact sweeper started");
    }

    // ── 6. HTTP server with graceful shutdown ──────────────────────────────────
    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        transcoder: Arc::new(transcoder),
        transcoder_version,
    });

    let app = routes::build(state);
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("vidpress-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => { s.recv().await; }
            Err(e)    => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c   => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
