//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use vidpress_transcode::TranscodeProfile;

/// What happens to a converted artifact once it has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactPolicy {
    /// Remove the artifact as soon as the response body is finished or dropped.
    DeleteAfterSend,
    /// Keep artifacts on disk; the sweeper removes those older than `ttl`.
    Retain { ttl: Duration },
}

/// Runtime configuration for vidpress-server.
///
/// Every field has a default so the server starts without any environment
/// variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// Where uploaded inputs are written while a request is in flight.
    pub upload_dir: PathBuf,

    /// Where the transcoder writes artifacts.
    pub output_dir: PathBuf,

    /// Static assets served at `/`.
    pub public_dir: PathBuf,

    /// Path or name of the ffmpeg binary.
    pub ffmpeg_bin: PathBuf,

    pub profile: TranscodeProfile,

    /// Upper bound on a single transcoder run.
    pub transcode_timeout: Duration,

    /// Largest accepted `video` part, in bytes.
    pub max_upload_bytes: u64,

    /// Keep the uploaded input when transcoding fails, for post-mortem.
    pub retain_failed_uploads: bool,

    pub artifact_policy: ArtifactPolicy,

    /// How often the sweeper scans `output_dir` under [`ArtifactPolicy::Retain`].
    pub sweep_interval: Duration,

    /// Comma-separated CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    pub enable_swagger: bool,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("compressed"),
            public_dir: PathBuf::from("public"),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            profile: TranscodeProfile::default(),
            transcode_timeout: Duration::from_secs(600),
            max_upload_bytes: 512 * 1024 * 1024,
            retain_failed_uploads: false,
            artifact_policy: ArtifactPolicy::DeleteAfterSend,
            sweep_interval: Duration::from_secs(300),
            cors_allowed_origins: None,
            enable_swagger: true,
            log_level: "info".to_owned(),
            log_json: false,
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(default)
        };
        let secs = |key: &str| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        let profile = TranscodeProfile {
            video_bitrate: string("VIDPRESS_VIDEO_BITRATE", &defaults.profile.video_bitrate),
            width: parse(&lookup, "VIDPRESS_TARGET_WIDTH", defaults.profile.width),
            container: string("VIDPRESS_CONTAINER", &defaults.profile.container),
        };

        let artifact_policy = match secs("VIDPRESS_ARTIFACT_TTL_SECS") {
            Some(ttl) => ArtifactPolicy::Retain { ttl },
            None => ArtifactPolicy::DeleteAfterSend,
        };

        Self {
            bind_address: string("VIDPRESS_BIND", &defaults.bind_address),
            upload_dir: path("VIDPRESS_UPLOAD_DIR", defaults.upload_dir),
            output_dir: path("VIDPRESS_OUTPUT_DIR", defaults.output_dir),
            public_dir: path("VIDPRESS_PUBLIC_DIR", defaults.public_dir),
            ffmpeg_bin: path("VIDPRESS_FFMPEG_BIN", defaults.ffmpeg_bin),
            profile,
            transcode_timeout: secs("VIDPRESS_TRANSCODE_TIMEOUT_SECS")
                .unwrap_or(defaults.transcode_timeout),
            max_upload_bytes: lookup("VIDPRESS_MAX_UPLOAD_MB")
                .and_then(|v| v.parse::<u64>().ok())
                .and_then(|mb| mb.checked_mul(1024 * 1024))
                .unwrap_or(defaults.max_upload_bytes),
            retain_failed_uploads: flag(
                "VIDPRESS_RETAIN_FAILED_UPLOADS",
                defaults.retain_failed_uploads,
            ),
            artifact_policy,
            // A zero period would stall the sweeper.
            sweep_interval: secs("VIDPRESS_SWEEP_INTERVAL_SECS")
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.sweep_interval),
            cors_allowed_origins: lookup("VIDPRESS_CORS_ORIGINS"),
            enable_swagger: flag("VIDPRESS_ENABLE_SWAGGER", defaults.enable_swagger),
            log_level: string("VIDPRESS_LOG", &defaults.log_level),
            log_json: flag("VIDPRESS_LOG_JSON", defaults.log_json),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse<T: std::str::FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_match_historical_behaviour() {
        let cfg = from_pairs(&[]);
        assert_eq!(cfg.bind_address, "0.0.0.0:3000");
        assert_eq!(cfg.upload_dir, PathBuf::from("uploads"));
        assert_eq!(cfg.output_dir, PathBuf::from("compressed"));
        assert_eq!(cfg.profile, TranscodeProfile::default());
        assert_eq!(cfg.artifact_policy, ArtifactPolicy::DeleteAfterSend);
        assert!(!cfg.retain_failed_uploads);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = from_pairs(&[
            ("VIDPRESS_BIND", "127.0.0.1:8080"),
            ("VIDPRESS_VIDEO_BITRATE", "1200k"),
            ("VIDPRESS_TARGET_WIDTH", "1280"),
            ("VIDPRESS_MAX_UPLOAD_MB", "2"),
            ("VIDPRESS_RETAIN_FAILED_UPLOADS", "true"),
            ("VIDPRESS_ARTIFACT_TTL_SECS", "3600"),
        ]);
        assert_eq!(cfg.bind_address, "127.0.0.1:8080");
        assert_eq!(cfg.profile.video_bitrate, "1200k");
        assert_eq!(cfg.profile.width, 1280);
        assert_eq!(cfg.max_upload_bytes, 2 * 1024 * 1024);
        assert!(cfg.retain_failed_uploads);
        assert_eq!(
            cfg.artifact_policy,
            ArtifactPolicy::Retain { ttl: Duration::from_secs(3600) }
        );
    }

    #[test]
    fn unparsable_numbers_fall_back_to_defaults() {
        let cfg = from_pairs(&[
            ("VIDPRESS_TARGET_WIDTH", "wide"),
            ("VIDPRESS_TRANSCODE_TIMEOUT_SECS", "-1"),
        ]);
        assert_eq!(cfg.profile.width, 640);
        assert_eq!(cfg.transcode_timeout, Duration::from_secs(600));
    }

    #[test]
    fn zero_sweep_interval_falls_back_to_default() {
        let cfg = from_pairs(&[
            ("VIDPRESS_ARTIFACT_TTL_SECS", "60"),
            ("VIDPRESS_SWEEP_INTERVAL_SECS", "0"),
        ]);
        assert_eq!(cfg.sweep_interval, Duration::from_secs(300));

        let cfg = from_pairs(&[("VIDPRESS_SWEEP_INTERVAL_SECS", "15")]);
        assert_eq!(cfg.sweep_interval, Duration::from_secs(15));
    }

    #[test]
    fn overflowing_upload_limit_falls_back_to_default() {
        let huge = u64::MAX.to_string();
        let cfg = from_pairs(&[("VIDPRESS_MAX_UPLOAD_MB", huge.as_str())]);
        assert_eq!(cfg.max_upload_bytes, 512 * 1024 * 1024);
    }
}
