use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Config(#[from] ConfigParseError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Subprocess(#[from] SubprocessError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

#[derive(Debug, Error)]
#[error("{file}: {key}: {reason}")]
pub struct ConfigParseError {
    pub key: &'static str,
    pub file: String,
    pub reason: ConfigParseReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigParseReason {
    #[error("configuration key not found")]
    KeyNotFound,
    #[error("value is not a plain quoted string on line {line}")]
    NotQuoted { line: usize },
    #[error("unterminated string on line {line}")]
    Unterminated { line: usize },
    #[error("escapes and templates are not supported on line {line}")]
    Unsupported { line: usize },
    #[error("unexpected text after value on line {line}")]
    TrailingText { line: usize },
    #[error("value is empty on line {line}")]
    Empty { line: usize },
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("empty command line")]
    Empty,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {}", describe_code(.code))]
    Failed { program: String, code: Option<i32> },
    #[error("{program} did not finish within {}s and was killed", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
}

#[derive(Debug, Error)]
pub enum FilesystemError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} does not exist (run `prepare` first)", .path.display())]
    MissingWorkspace { path: PathBuf },
    #[error("expected artifact {} was not produced", .path.display())]
    MissingArtifact { path: PathBuf },
}

impl FilesystemError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
