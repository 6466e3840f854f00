use std::ffi::OsString;
use std::path::Path;

/// Fixed encode parameters applied to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeProfile {
    /// Target video bitrate in ffmpeg notation, e.g. `"800k"`.
    pub video_bitrate: String,
    /// Target width in pixels; height follows the aspect ratio, rounded to even.
    pub width: u32,
    /// Output container, also used as the artifact extension.
    pub container: String,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            video_bitrate: "800k".to_owned(),
            width: 640,
            container: "mp4".to_owned(),
        }
    }
}

impl TranscodeProfile {
    /// Arguments for `ffmpeg` (program name excluded).
    ///
    /// `-2` asks the scaler for the nearest even height that keeps the aspect
    /// ratio, which most encoders require.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-b:v".into(),
            self.video_bitrate.clone().into(),
            "-vf".into(),
            self.scale_filter().into(),
            output.as_os_str().to_owned(),
        ]
    }

    pub fn scale_filter(&self) -> String {
        format!("scale={}:-2", self.width)
    }

    /// Artifact file name for an upload id: `<id>.<container>`.
    pub fn output_file_name(&self, id: &str) -> String {
        format!("{id}.{}", self.container)
    }

    pub fn content_type(&self) -> &'static str {
        match self.container.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" => "video/mp4",
            "webm" => "video/webm",
            "mkv" => "video/x-matroska",
            "mov" => "video/quicktime",
            "avi" => "video/x-msvideo",
            _ => "application/octet-stream",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_args_match_command_contract() {
        let profile = TranscodeProfile::default();
        let args = profile.args(Path::new("uploads/abc"), Path::new("compressed/abc.mp4"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-hide_banner",
                "-nostdin",
                "-y",
                "-i",
                "uploads/abc",
                "-b:v",
                "800k",
                "-vf",
                "scale=640:-2",
                "compressed/abc.mp4",
            ]
        );
    }

    #[test]
    fn output_name_uses_container_extension() {
        let profile = TranscodeProfile::default();
        assert_eq!(profile.output_file_name("0f3a"), "0f3a.mp4");

        let webm = TranscodeProfile {
            container: "webm".into(),
            ..TranscodeProfile::default()
        };
        assert_eq!(webm.output_file_name("0f3a"), "0f3a.webm");
        assert_eq!(webm.content_type(), "video/webm");
    }

    #[test]
    fn unknown_container_is_octet_stream() {
        let profile = TranscodeProfile {
            container: "xyz".into(),
            ..TranscodeProfile::default()
        };
        assert_eq!(profile.content_type(), "application/octet-stream");
    }
}
