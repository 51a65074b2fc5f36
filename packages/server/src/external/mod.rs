//! Adapters for the programs and services the server drives: the audio
//! extractor, the image converter, tag reading, track search and mail.

pub mod converter;
pub mod extractor;
pub mod mailer;
pub mod metadata;
pub mod search;

use std::ffi::OsStr;
use std::process::{Output, Stdio};

use thiserror::Error;
use tokio::process::Command;

pub use converter::ImageConverter;
pub use extractor::YtDlp;
pub use mailer::{DisabledMailer, MailError, Mailer, SmtpMailer};
pub use metadata::{TrackTags, read_tags};
pub use search::{SearchProvider, SearchResult};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("tool IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata error: {0}")]
    Metadata(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Run `program` with an argument vector and wait for it.
///
/// A non-zero exit is reported as [`ToolError::Failed`] with the trimmed stderr.
pub(crate) async fn run<I, S>(program: &str, args: I) -> Result<Output, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}
