//! Converted artifacts: streaming them out and cleaning them up.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};

use axum::body::Body;
use futures::Stream;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::upload::ScopedFile;

/// Byte stream that owns the scoped files backing a response.
///
/// The guards fire when the body is dropped, which hyper does once the
/// transfer has completed or the connection has failed.
struct GuardedStream<S> {
    inner: S,
    _guards: Vec<ScopedFile>,
}

impl<S: Stream + Unpin> Stream for GuardedStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Open `path` as a streaming response body; returns its length alongside.
///
/// `guards` are held until the body is dropped.
pub async fn guarded_body(path: &Path, guards: Vec<ScopedFile>) -> std::io::Result<(u64, Body)> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let stream = GuardedStream {
        inner: ReaderStream::new(file),
        _guards: guards,
    };
    Ok((len, Body::from_stream(stream)))
}

/// Remove regular files in `dir` whose modification time is at least `ttl` old.
///
/// Returns how many files were removed.
pub async fn sweep_once(dir: &Path, ttl: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let meta = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < ttl {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!(path = %entry.path().display(), age_secs = age.as_secs(), "swept artifact");
                removed += 1;
            }
            Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to sweep artifact"),
        }
    }

    Ok(removed)
}

/// Periodically sweep `dir` until the runtime shuts down.
pub fn spawn_sweeper(dir: PathBuf, ttl: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweep_once(&dir, ttl).await {
                Ok(0) => {}
                Ok(removed) => info!(dir = %dir.display(), removed, "artifact sweep finished"),
                Err(e) => warn!(dir = %dir.display(), error = %e, "artifact sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn guards_fire_when_body_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        let artifact = dir.path().join("input.mp4");
        std::fs::write(&input, b"raw").unwrap();
        std::fs::write(&artifact, b"compressed").unwrap();

        let (len, body) = guarded_body(
            &artifact,
            vec![ScopedFile::new(&input), ScopedFile::new(&artifact)],
        )
        .await
        .unwrap();

        assert_eq!(len, 10);
        assert!(input.exists());

        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"compressed");
        assert!(!input.exists());
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn missing_artifact_is_io_error_and_guards_still_fire() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        std::fs::write(&input, b"raw").unwrap();

        let result = guarded_body(&dir.path().join("nope.mp4"), vec![ScopedFile::new(&input)]).await;

        assert!(result.is_err());
        assert!(!input.exists());
    }

    #[tokio::test]
    async fn sweep_respects_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("a.mp4");
        std::fs::write(&artifact, b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        assert_eq!(sweep_once(dir.path(), Duration::from_secs(3600)).await.unwrap(), 0);
        assert!(artifact.exists());

        assert_eq!(sweep_once(dir.path(), Duration::ZERO).await.unwrap(), 1);
        assert!(!artifact.exists());
        assert!(dir.path().join("nested").exists());
    }
}
