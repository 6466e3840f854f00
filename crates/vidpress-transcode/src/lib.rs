//! vidpress-transcode – the external transcoder contract.
//!
//! A [`TranscodeProfile`] fixes the encode parameters (bitrate, scaled width,
//! container) and turns an input/output pair into an ffmpeg argument list.
//! [`FfmpegTranscoder`] runs that command as an awaitable child process.
//! Callers depend on the [`Transcoder`] trait so tests can substitute stubs.

mod error;
mod ffmpeg;
mod profile;

use std::path::Path;

use async_trait::async_trait;

pub use error::TranscodeError;
pub use ffmpeg::FfmpegTranscoder;
pub use profile::TranscodeProfile;

/// Re-encodes one file into another.
///
/// Implementations must leave `output` either absent or fully written when
/// they return, and must stop any child work if the returned future is dropped.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;

    /// The profile the transcoder encodes with.
    fn profile(&self) -> &TranscodeProfile;
}
