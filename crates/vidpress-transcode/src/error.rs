use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The transcoder binary could not be started.
    #[error("failed to spawn transcoder '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The transcoder ran and exited unsuccessfully.
    #[error("transcoder exited with {status}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("transcoder did not finish within {0:?}")]
    TimedOut(Duration),

    /// Exit status was zero but nothing usable was written.
    #[error("transcoder produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// Last lines of captured stderr, if the process got far enough to write any.
    pub fn stderr_tail(&self, lines: usize) -> Option<String> {
        match self {
            TranscodeError::Failed { stderr, .. } if !stderr.is_empty() => {
                let all: Vec<&str> = stderr.lines().collect();
                let start = all.len().saturating_sub(lines);
                Some(all[start..].join("\n"))
            }
            _ => None,
        }
    }
}
