//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use vidpress_transcode::Transcoder;

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Runs the external transcoder for each upload.
    pub transcoder: Arc<dyn Transcoder>,
    /// First line of `ffmpeg -version` from the startup probe; `None` when
    /// the binary could not be run.
    pub transcoder_version: Option<String>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("profile", self.transcoder.profile())
            .field("transcoder_version", &self.transcoder_version)
            .finish()
    }
}
