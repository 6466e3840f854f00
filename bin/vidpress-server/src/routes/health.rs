//! Liveness and transcoder readiness.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Report server liveness and whether the transcoder answered the startup
/// probe.
///
/// Always HTTP 200. `status` is `"degraded"` when the transcoder binary could
/// not be run, since every `/compress` request will then fail.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is up; `status` tells whether compression is available", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let profile = state.transcoder.profile();
    let available = state.transcoder_version.is_some();

    Json(json!({
        "status": if available { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "transcoder": {
            "available": available,
            "version": state.transcoder_version,
        },
        "profile": {
            "video_bitrate": profile.video_bitrate,
            "width": profile.width,
            "container": profile.container,
        },
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use std::time::Duration;
    use vidpress_transcode::{FfmpegTranscoder, TranscodeProfile};

    fn state(transcoder_version: Option<&str>) -> State<Arc<AppState>> {
        State(Arc::new(AppState {
            config: Arc::new(Config::default()),
            transcoder: Arc::new(FfmpegTranscoder::new(
                "ffmpeg",
                TranscodeProfile::default(),
                Duration::from_secs(1),
            )),
            transcoder_version: transcoder_version.map(str::to_owned),
        }))
    }

    #[tokio::test]
    async fn reports_detected_transcoder() {
        let Json(body) = get_health(state(Some("ffmpeg version 6.1"))).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["transcoder"]["available"], true);
        assert_eq!(body["transcoder"]["version"], "ffmpeg version 6.1");
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn missing_transcoder_is_degraded() {
        let Json(body) = get_health(state(None)).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["transcoder"]["available"], false);
        assert!(body["transcoder"]["version"].is_null());
    }

    #[tokio::test]
    async fn exposes_active_profile() {
        let Json(body) = get_health(state(None)).await;
        assert_eq!(body["profile"]["video_bitrate"], "800k");
        assert_eq!(body["profile"]["width"], 640);
        assert_eq!(body["profile"]["container"], "mp4");
    }
}
