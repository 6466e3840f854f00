//! Video compression endpoint.
//!
//! `POST /compress` takes a multipart upload with a single `video` file part,
//! runs the transcoder over it and streams the result back as an attachment.
//!
//! File lifetimes:
//! - the uploaded input is removed once the response body has been sent or
//!   dropped, or immediately on failure (unless `retain_failed_uploads`);
//! - a partial artifact from a failed or cancelled run is always removed;
//! - a finished artifact follows [`ArtifactPolicy`].

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use tracing::{info, warn};
use utoipa::OpenApi;

use crate::artifact;
use crate::config::{ArtifactPolicy, Config};
use crate::error::ServerError;
use crate::state::AppState;
use crate::upload::{self, ScopedFile};

#[derive(OpenApi)]
#[openapi(paths(compress))]
pub struct CompressApi;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(config: &Config) -> Router<Arc<AppState>> {
    let limit = usize::try_from(config.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/compress", post(compress))
        .layer(DefaultBodyLimit::max(limit))
}

/// Compress an uploaded video (`POST /compress`).
///
/// The single `video` part is written to the upload directory under a fresh
/// id, transcoded with the configured profile into `<id>.<container>`, and
/// returned with `Content-Disposition: attachment`. Any transcoder failure
/// (spawn error, nonzero exit, timeout, empty output) yields a plain-text
/// `500 Compression failed`.
#[utoipa::path(
    post,
    path = "/compress",
    tag = "compress",
    request_body(
        content_type = "multipart/form-data",
        description = "A single file part named `video`"
    ),
    responses(
        (status = 200, description = "Compressed video", body = Vec<u8>, content_type = "video/mp4"),
        (status = 400, description = "Missing, empty or unexpected multipart field"),
        (status = 413, description = "Upload too large"),
        (status = 415, description = "Upload is not a video"),
        (status = 500, description = "Compression failed", body = String, content_type = "text/plain"),
    )
)]
pub async fn compress(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ServerError> {
    let config = &state.config;
    let upload = upload::receive(&mut multipart, &config.upload_dir, config.max_upload_bytes).await?;

    info!(
        upload_id = %upload.id,
        original_name = ?upload.original_name,
        size_bytes = upload.size,
        "upload received"
    );

    let profile = state.transcoder.profile();
    let file_name = profile.output_file_name(&upload.id);
    let output_path = config.output_dir.join(&file_name);
    // Armed from the start so a cancelled request cannot strand a partial file.
    let artifact_file = ScopedFile::new(&output_path);

    if let Err(e) = state
        .transcoder
        .transcode(upload.file.path(), &output_path)
        .await
    {
        if config.retain_failed_uploads {
            let kept = upload.file.disarm();
            warn!(upload_id = %upload.id, path = %kept.display(), "keeping input of failed transcode");
        }
        return Err(e.into());
    }

    let mut guards = vec![upload.file];
    match config.artifact_policy {
        ArtifactPolicy::DeleteAfterSend => guards.push(artifact_file),
        ArtifactPolicy::Retain { .. } => {
            artifact_file.disarm();
        }
    }

    let (len, body) = artifact::guarded_body(&output_path, guards).await?;

    info!(upload_id = %upload.id, artifact = %file_name, size_bytes = len, "sending artifact");

    build_download(body, len, profile.content_type(), &file_name)
}

fn build_download(
    body: Body,
    len: u64,
    content_type: &str,
    file_name: &str,
) -> Result<Response, ServerError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .body(body)
        .map_err(|e| ServerError::Internal(format!("failed to build download response: {e}")))
}
