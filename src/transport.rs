use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_LENGTH;
use tracing::debug;

use crate::error::{AcquireError, AcquireResult};

const USER_AGENT: &str = concat!("hermes-installer/", env!("CARGO_PKG_VERSION"));
const PUMP_CHUNK: usize = 16 * 1024;

pub const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
/// Connect limit and idle limit between body chunks for artifact downloads.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadResponse {
    pub status: u16,
    pub content_length: Option<u64>,
}

pub struct BodyStream {
    pub content_length: Option<u64>,
    pub reader: Box<dyn Read>,
}

/// Blocking HTTP operations used by the index client.
pub trait Transport {
    fn get_text(&self, url: &str, timeout: Duration) -> AcquireResult<String>;

    fn head(&self, url: &str, timeout: Duration) -> AcquireResult<HeadResponse>;

    /// Opens a body stream. `idle` bounds the wait for each chunk, not the
    /// whole transfer.
    fn stream(&self, url: &str, idle: Duration) -> AcquireResult<BodyStream>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_base: Duration,
    pub statuses: &'static [u16],
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_base: Duration::from_millis(500),
            statuses: &[500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn should_retry_status(&self, status: StatusCode) -> bool {
        self.statuses.contains(&status.as_u16())
    }

    /// Delay before retry number `attempt` (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }

    /// Longest time every attempt plus the backoff between them can take.
    pub fn budget(&self, per_attempt: Duration) -> Duration {
        (0..self.retries).fold(per_attempt * (self.retries + 1), |total, attempt| {
            total + self.delay(attempt)
        })
    }
}

fn send_with_retry(
    retry: &RetryPolicy,
    url: &str,
    build: impl Fn() -> RequestBuilder,
) -> AcquireResult<Response> {
    let mut attempt = 0;
    loop {
        let outcome = build().send();
        let retryable = match &outcome {
            Ok(response) => retry.should_retry_status(response.status()),
            Err(error) => error.is_connect() || error.is_timeout(),
        };

        if !retryable || attempt >= retry.retries {
            return outcome.map_err(|e| AcquireError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            });
        }

        let delay = retry.delay(attempt);
        debug!(url, attempt = attempt + 1, ?delay, "retrying request");
        thread::sleep(delay);
        attempt += 1;
    }
}

fn header_content_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

fn ensure_success(url: &str, response: Response) -> AcquireResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AcquireError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

fn client_error(e: reqwest::Error) -> AcquireError {
    AcquireError::Network {
        url: String::new(),
        reason: format!("failed to initialize HTTP client: {e}"),
    }
}

pub struct HttpTransport {
    client: Client,
    download_client: Client,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new() -> AcquireResult<Self> {
        Self::with_retry(RetryPolicy::default())
    }

    pub fn with_retry(retry: RetryPolicy) -> AcquireResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(client_error)?;
        // Body reads are bounded per chunk by IdleTimeoutReader instead.
        let download_client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(DOWNLOAD_TIMEOUT)
            .timeout(None::<Duration>)
            .build()
            .map_err(client_error)?;

        Ok(Self {
            client,
            download_client,
            retry,
        })
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, url: &str, timeout: Duration) -> AcquireResult<String> {
        let response = send_with_retry(&self.retry, url, || self.client.get(url).timeout(timeout))?;
        let response = ensure_success(url, response)?;
        response.text().map_err(|e| AcquireError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn head(&self, url: &str, timeout: Duration) -> AcquireResult<HeadResponse> {
        let response =
            send_with_retry(&self.retry, url, || self.client.head(url).timeout(timeout))?;
        Ok(HeadResponse {
            status: response.status().as_u16(),
            content_length: header_content_length(&response),
        })
    }

    fn stream(&self, url: &str, idle: Duration) -> AcquireResult<BodyStream> {
        let (head_tx, head_rx) = mpsc::channel();
        let (chunk_tx, chunk_rx) = mpsc::channel();
        let client = self.download_client.clone();
        let retry = self.retry.clone();
        let owned_url = url.to_string();

        thread::Builder::new()
            .name("hermes-download".to_string())
            .spawn(move || {
                let response = send_with_retry(&retry, &owned_url, || client.get(&owned_url))
                    .and_then(|response| ensure_success(&owned_url, response));
                match response {
                    Ok(response) => {
                        if head_tx.send(Ok(header_content_length(&response))).is_ok() {
                            pump(response, &chunk_tx);
                        }
                    }
                    Err(error) => {
                        let _ = head_tx.send(Err(error));
                    }
                }
            })
            .map_err(|e| AcquireError::Network {
                url: url.to_string(),
                reason: format!("failed to start download worker: {e}"),
            })?;

        let wait = self.retry.budget(idle);
        let content_length = match head_rx.recv_timeout(wait) {
            Ok(head) => head?,
            Err(_) => {
                return Err(AcquireError::Network {
                    url: url.to_string(),
                    reason: format!("no response within {wait:?}"),
                });
            }
        };

        Ok(BodyStream {
            content_length,
            reader: Box::new(IdleTimeoutReader::new(chunk_rx, idle)),
        })
    }
}

enum Pumped {
    Data(Vec<u8>),
    Failed(String),
    Done,
}

fn pump(mut body: impl Read, chunks: &Sender<Pumped>) {
    let mut buffer = vec![0u8; PUMP_CHUNK];
    loop {
        let message = match body.read(&mut buffer) {
            Ok(0) => Pumped::Done,
            Ok(read) => Pumped::Data(buffer[..read].to_vec()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Pumped::Failed(e.to_string()),
        };
        let last = !matches!(message, Pumped::Data(_));
        if chunks.send(message).is_err() || last {
            return;
        }
    }
}

/// Reads chunks handed over by the download worker and fails once none has
/// arrived for `idle`.
struct IdleTimeoutReader {
    chunks: Receiver<Pumped>,
    idle: Duration,
    pending: Vec<u8>,
    offset: usize,
    finished: bool,
}

impl IdleTimeoutReader {
    fn new(chunks: Receiver<Pumped>, idle: Duration) -> Self {
        Self {
            chunks,
            idle,
            pending: Vec::new(),
            offset: 0,
            finished: false,
        }
    }
}

impl Read for IdleTimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.offset == self.pending.len() {
            if self.finished {
                return Ok(0);
            }
            match self.chunks.recv_timeout(self.idle) {
                Ok(Pumped::Data(chunk)) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                Ok(Pumped::Done) => self.finished = true,
                Ok(Pumped::Failed(reason)) => return Err(io::Error::other(reason)),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("no data received for {:?}", self.idle),
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "download worker stopped",
                    ));
                }
            }
        }

        let available = &self.pending[self.offset..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.offset += count;
        Ok(count)
    }
}
