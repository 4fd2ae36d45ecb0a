use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::time::Duration;

use crate::error::{AcquireError, AcquireResult};
use crate::report::Reporter;
use crate::transport::{BodyStream, HeadResponse, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Success,
    Highlight,
    Warn,
    Error,
}

#[derive(Default)]
pub struct RecordingReporter {
    pub messages: RefCell<Vec<(Level, String)>>,
}

impl RecordingReporter {
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages
            .borrow()
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }

    fn push(&self, level: Level, message: &str) {
        self.messages.borrow_mut().push((level, message.to_string()));
    }
}

impl Reporter for RecordingReporter {
    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn success(&self, message: &str) {
        self.push(Level::Success, message);
    }

    fn highlight(&self, message: &str) {
        self.push(Level::Highlight, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

#[derive(Debug, Clone)]
pub enum FakeBody {
    Complete(Vec<u8>),
    /// Yields the bytes, then fails the next read.
    BreaksAfter(Vec<u8>),
}

/// In-memory index: unknown GET urls answer 404, unknown HEAD urls answer 404.
#[derive(Default)]
pub struct FakeTransport {
    texts: HashMap<String, String>,
    heads: HashMap<String, u64>,
    bodies: HashMap<String, FakeBody>,
    offline: bool,
    pub requests: RefCell<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, url: &str, body: &str) -> Self {
        self.texts.insert(url.to_string(), body.to_string());
        self
    }

    pub fn with_head(mut self, url: &str, content_length: u64) -> Self {
        self.heads.insert(url.to_string(), content_length);
        self
    }

    /// Registers a downloadable artifact answering both HEAD and GET.
    pub fn with_artifact(mut self, url: &str, body: FakeBody) -> Self {
        let len = match &body {
            FakeBody::Complete(bytes) => bytes.len() as u64,
            FakeBody::BreaksAfter(bytes) => bytes.len() as u64 * 2,
        };
        self.heads.insert(url.to_string(), len);
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    fn record(&self, method: &str, url: &str) -> AcquireResult<()> {
        self.requests.borrow_mut().push(format!("{method} {url}"));
        if self.offline {
            return Err(AcquireError::Network {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

struct BreakingReader {
    data: Cursor<Vec<u8>>,
}

impl Read for BreakingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.data.read(buf)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ));
        }
        Ok(read)
    }
}

impl Transport for FakeTransport {
    fn get_text(&self, url: &str, _timeout: Duration) -> AcquireResult<String> {
        self.record("GET", url)?;
        self.texts.get(url).cloned().ok_or(AcquireError::Status {
            url: url.to_string(),
            status: 404,
        })
    }

    fn head(&self, url: &str, _timeout: Duration) -> AcquireResult<HeadResponse> {
        self.record("HEAD", url)?;
        Ok(match self.heads.get(url) {
            Some(len) => HeadResponse {
                status: 200,
                content_length: Some(*len),
            },
            None => HeadResponse {
                status: 404,
                content_length: None,
            },
        })
    }

    fn stream(&self, url: &str, _timeout: Duration) -> AcquireResult<BodyStream> {
        self.record("GET", url)?;
        let body = self.bodies.get(url).cloned().ok_or(AcquireError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        let content_length = self.heads.get(url).copied();
        let reader: Box<dyn Read> = match body {
            FakeBody::Complete(bytes) => Box::new(Cursor::new(bytes)),
            FakeBody::BreaksAfter(bytes) => Box::new(BreakingReader {
                data: Cursor::new(bytes),
            }),
        };
        Ok(BodyStream {
            content_length,
            reader,
        })
    }
}

pub fn release_json(requires_dist: &[&str]) -> String {
    serde_json::json!({
        "info": { "requires_dist": requires_dist },
        "urls": [],
    })
    .to_string()
}
