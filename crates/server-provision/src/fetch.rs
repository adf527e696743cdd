use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::USER_AGENT;
use tracing::{debug, warn};

use crate::errors::{FilesystemError, NetworkError, ProvisionError};

pub const DEFAULT_MAX_RETRIES: usize = 3;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(3);
const USER_AGENT_VALUE: &str = concat!("testserver/", env!("CARGO_PKG_VERSION"));

pub struct Fetcher {
    client: Client,
    max_retries: usize,
}

impl Fetcher {
    pub fn new(max_retries: usize) -> Result<Self, NetworkError> {
        // Jar downloads can take minutes on slow links, so only connecting is bounded.
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None)
            .build()
            .map_err(NetworkError::Client)?;

        Ok(Self {
            client,
            max_retries,
        })
    }

    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        let response = self.get_with_retries(url)?;
        let bytes = response.bytes().map_err(|source| NetworkError::Body {
            url: url.to_string(),
            source,
        })?;
        debug!(url, bytes = bytes.len(), "downloaded");
        Ok(bytes.to_vec())
    }

    /// Downloads `url` and replaces `path` with the body. The body is
    /// streamed into `<path>.part`, which is removed again if anything fails,
    /// so `path` only changes once the whole body arrived with a success status.
    pub fn download_to(&self, url: &str, path: &Path) -> Result<u64, ProvisionError> {
        let mut response = self.get_with_retries(url)?;
        let tmp = temp_sibling(path);

        let written = match stream_to(&mut response, url, &tmp) {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_file(&tmp);
                return Err(err);
            }
        };
        if let Err(err) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(FilesystemError::io("replace", path, err).into());
        }

        debug!(url, bytes = written, path = %path.display(), "downloaded");
        Ok(written)
    }

    fn get_with_retries(&self, url: &str) -> Result<Response, NetworkError> {
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;
        loop {
            let outcome = self
                .client
                .get(url)
                .header(USER_AGENT, USER_AGENT_VALUE)
                .send();
            let retry_reason = match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if !retryable_status(status) || attempt >= self.max_retries {
                        return Err(NetworkError::Status {
                            url: url.to_string(),
                            status,
                        });
                    }
                    status.to_string()
                }
                Err(source) => {
                    if !retryable_error(&source) || attempt >= self.max_retries {
                        return Err(NetworkError::Request {
                            url: url.to_string(),
                            source,
                        });
                    }
                    source.to_string()
                }
            };

            attempt += 1;
            warn!(url, attempt, reason = %retry_reason, "download failed, retrying");
            sleep(with_jitter(backoff));
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }
}

fn stream_to(response: &mut Response, url: &str, tmp: &Path) -> Result<u64, ProvisionError> {
    let mut file = File::create(tmp).map_err(|err| FilesystemError::io("create", tmp, err))?;
    let written = response.copy_to(&mut file).map_err(|source| NetworkError::Body {
        url: url.to_string(),
        source,
    })?;
    file.sync_all().map_err(|err| FilesystemError::io("write", tmp, err))?;
    Ok(written)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Timeouts, rate limiting and server-side failures are worth another try;
/// any other status is the final answer.
fn retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500..=599)
}

fn retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Stretches `base` by up to a fifth so parallel runs do not retry in lockstep.
fn with_jitter(base: Duration) -> Duration {
    let spread = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|now| now.subsec_micros() % 200)
        .unwrap_or_default();
    base + base * spread / 1000
}
