use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::{TranscodeError, TranscodeProfile, Transcoder};

/// Runs an ffmpeg-compatible binary as a child process.
///
/// The child is spawned with `kill_on_drop`, so dropping the future returned by
/// [`Transcoder::transcode`] (client disconnect, timeout) kills the process.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    profile: TranscodeProfile,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>, profile: TranscodeProfile, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            profile,
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `<program> -version` and return the first line of its output.
    pub async fn probe(&self) -> Result<String, TranscodeError> {
        let output = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| self.spawn_error(source))?;

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_owned())
    }

    fn spawn_error(&self, source: std::io::Error) -> TranscodeError {
        TranscodeError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.profile.args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program.display(), ?cmd, "spawning transcoder");

        let result = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| self.spawn_error(source))?,
            Err(_) => return Err(TranscodeError::TimedOut(self.timeout)),
        };

        if !result.status.success() {
            return Err(TranscodeError::Failed {
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
            _ => Err(TranscodeError::MissingOutput(output.to_path_buf())),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let started = std::time::Instant::now();

        match self.run(input, output).await {
            Ok(()) => {
                info!(
                    input = %input.display(),
                    output = %output.display(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "transcode finished"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    input = %input.display(),
                    error = %e,
                    stderr = %e.stderr_tail(8).unwrap_or_default(),
                    "transcode failed"
                );
                // Leave no half-written artifact behind.
                if let Err(rm) = tokio::fs::remove_file(output).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!(output = %output.display(), error = %rm, "failed to remove partial output");
                    }
                }
                Err(e)
            }
        }
    }

    fn profile(&self) -> &TranscodeProfile {
        &self.profile
    }
}
