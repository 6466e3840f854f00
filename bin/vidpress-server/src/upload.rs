//! Receiving the `video` part of a multipart request onto disk.
//!
//! The upload is streamed chunk by chunk into `<upload_dir>/<id>` and never
//! held in memory. The file is owned by a [`ScopedFile`], so every early
//! return (bad field, oversize, client abort) removes what was written.

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ServerError;

/// Name of the only accepted multipart field.
pub const VIDEO_FIELD: &str = "video";

/// A file that is deleted when this value is dropped, unless disarmed.
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
    armed: bool,
}

impl ScopedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop tracking the file; it stays on disk.
    pub fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed scoped file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove scoped file"),
        }
    }
}

/// An upload that has been fully written to disk.
#[derive(Debug)]
pub struct Upload {
    /// Generated identifier; also the stem of the artifact name.
    pub id: String,
    pub file: ScopedFile,
    pub size: u64,
    /// Client-supplied file name, for logging only.
    pub original_name: Option<String>,
}

/// Fresh upload identifier: a hyphenless UUID v4.
pub fn new_upload_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `video/*` or a generic binary type. Parameters after `;` are ignored.
pub fn is_accepted_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("video/") || essence == "application/octet-stream"
}

/// Read the multipart body and persist its single `video` part.
pub async fn receive(
    multipart: &mut Multipart,
    upload_dir: &Path,
    max_bytes: u64,
) -> Result<Upload, ServerError> {
    let mut upload: Option<Upload> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_owned();
        if field_name != VIDEO_FIELD {
            return Err(ServerError::BadRequest(format!(
                "unexpected field '{field_name}'; only '{VIDEO_FIELD}' is accepted"
            )));
        }
        if upload.is_some() {
            return Err(ServerError::BadRequest(format!(
                "only one '{VIDEO_FIELD}' file may be uploaded"
            )));
        }

        if field.file_name().is_none() {
            return Err(ServerError::BadRequest(format!(
                "'{VIDEO_FIELD}' must be a file part"
            )));
        }

        if let Some(content_type) = field.content_type() {
            if !is_accepted_content_type(content_type) {
                return Err(ServerError::UnsupportedMediaType(format!(
                    "content type '{content_type}' is not a video"
                )));
            }
        }

        let id = new_upload_id();
        let original_name = field.file_name().map(str::to_owned);        let file = ScopedFile::new(upload_dir.join(&id));
        let mut out = tokio::fs::File::create(file.path()).await?;
        let mut size = 0u64;

        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size += chunk.len() as u64;
            if size > max_bytes {
                return Err(ServerError::PayloadTooLarge(format!(
                    "upload exceeds the maximum of {max_bytes} bytes"
                )));
            }
            out.write_all(&chunk).await?;
        }
        out.flush().await?;

        if size == 0 {
            return Err(ServerError::BadRequest("uploaded video is empty".into()));
        }

        debug!(
            upload_id = %id,
            original_name = ?original_name,
            size_bytes = size,
            path = %file.path().display(),
            "upload written to disk"
        );

        upload = Some(Upload {
            id,
            file,
            size,
            original_name,
        });
    }

    upload.ok_or_else(|| ServerError::BadRequest(format!("missing '{VIDEO_FIELD}' file field")))
}

fn multipart_error(e: MultipartError) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(e.body_text())
    } else {
        ServerError::BadRequest(format!("failed to read multipart body: {}", e.body_text()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_video_and_octet_stream() {
        assert!(is_accepted_content_type("video/mp4"));
        assert!(is_accepted_content_type("Video/QuickTime"));
        assert!(is_accepted_content_type("application/octet-stream"));
        assert!(is_accepted_content_type("video/webm; codecs=vp9"));
    }

    #[test]
    fn rejects_non_video_types() {
        assert!(!is_accepted_content_type("text/plain"));
        assert!(!is_accepted_content_type("image/png"));
        assert!(!is_accepted_content_type("audio/mpeg"));
        assert!(!is_accepted_content_type(""));
    }

    #[test]
    fn upload_ids_are_unique_and_path_safe() {
        let a = new_upload_id();
        let b = new_upload_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn scoped_file_removes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload");
        std::fs::write(&path, b"bytes").unwrap();

        drop(ScopedFile::new(&path));

        assert!(!path.exists());
    }

    #[test]
    fn disarmed_scoped_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload");
        std::fs::write(&path, b"bytes").unwrap();

        let kept = ScopedFile::new(&path).disarm();

        assert_eq!(kept, path);
        assert!(path.exists());
    }

    #[test]
    fn scoped_file_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        drop(ScopedFile::new(dir.path().join("never-written")));
    }
}
