use std::ffi::OsString;
use std::path::Path;

use super::{ToolError, run};

/// `yt-dlp`, used to download a track as m4a with embedded tags and artwork.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: String,
    ffmpeg: String,
}

impl YtDlp {
    pub fn new(binary: impl Into<String>, ffmpeg: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    fn download_args(&self, url: &str, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-x",
            "--audio-format",
            "m4a",
            "--audio-quality",
            "0",
            "--ffmpeg-location",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(OsString::from(&self.ffmpeg));
        args.extend(
            ["--embed-metadata", "--embed-thumbnail", "--add-metadata", "-o"]
                .into_iter()
                .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        // Everything after `--` is a URL, never an option.
        args.push(OsString::from("--"));
        args.push(OsString::from(url));
        args
    }

    /// Download `url` to `output`.
    pub async fn download(&self, url: &str, output: &Path) -> Result<(), ToolError> {
        let result = run(&self.binary, self.download_args(url, output)).await?;
        let stderr = String::from_utf8_lossy(&result.stderr);
        if !stderr.trim().is_empty() {
            tracing::warn!(stderr = %stderr.trim(), "yt-dlp wrote to stderr");
        }
        Ok(())
    }

    /// Run `yt-dlp -U` and return what it printed.
    pub async fn self_update(&self) -> Result<String, ToolError> {
        let output = run(&self.binary, ["-U"]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
