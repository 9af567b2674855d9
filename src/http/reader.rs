//! Drives [`HttpRequest::parse`] from an async byte stream.
//!
//! Bytes are read into a growable buffer. After every read the parser is
//! re-invoked until it stops making progress, so several protocol units that
//! arrived in a single read are all drained before the next read. When the
//! buffer is full its capacity doubles, optionally up to a hard cap. The
//! same cap bounds the whole request head and the declared body length.

use async_std::io::{Read, ReadExt};
use thiserror::Error;
use tracing::{debug, trace};

use crate::http::parser::ParseError;
use crate::http::request::{HttpRequest, ParseState};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("I/O error while reading request: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed before any request bytes arrived")]
    ConnectionClosed,

    #[error("connection closed while {state}")]
    Truncated { state: ParseState },

    #[error("request exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Initial buffer capacity of [`RequestReader::default`].
pub const DEFAULT_BUFFER_SIZE: usize = 8;

pub struct RequestReader {
    buf: Vec<u8>,
    filled: usize,
    max_size: Option<usize>,
}

impl RequestReader {
    /// A reader with `initial_capacity` bytes of buffer and no size cap.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            buf: vec![0; initial_capacity.max(1)],
            filled: 0,
            max_size: None,
        }
    }

    /// Caps the buffered bytes, the total size of the request line plus
    /// headers, and the declared `Content-Length`.
    pub fn with_max_size(mut self, limit: usize) -> Self {
        self.max_size = Some(limit.max(1));
        self.buf.truncate(limit.max(1));
        self
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Reads one request from `stream`.
    ///
    /// Bytes following a complete request are left unparsed in the buffer.
    pub async fn read_request<R>(&mut self, stream: &mut R) -> Result<HttpRequest, ReadError>
    where
        R: Read + Unpin + ?Sized,
    {
        let mut req = HttpRequest::new();
        let mut head_size = 0;

        while !req.is_done() {
            if self.filled > 0 || req.state() != ParseState::RequestLine {
                let in_head = req.state() != ParseState::Body;
                let consumed = req.parse(&self.buf[..self.filled])?;
                if consumed > 0 {
                    self.consume(consumed);
                    if in_head {
                        head_size += consumed;
                        self.check_head_size(head_size)?;
                    }
                    self.check_declared_length(&req)?;
                    continue;
                }
                if req.is_done() {
                    break;
                }
            }

            if self.filled == self.buf.len() {
                self.grow()?;
            }

            let n = match stream.read(&mut self.buf[self.filled..]).await {
                Ok(0) => return self.finish(req),
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReadError::Io(e)),
            };
            trace!(read = n, filled = self.filled + n, "read request bytes");
            self.filled += n;
        }

        Ok(req)
    }

    /// End of stream: one last parse over what is buffered.
    fn finish(&mut self, mut req: HttpRequest) -> Result<HttpRequest, ReadError> {
        if self.filled == 0 && req.state() == ParseState::RequestLine {
            return Err(ReadError::ConnectionClosed);
        }

        let consumed = req.parse(&self.buf[..self.filled])?;
        self.consume(consumed);

        if req.is_done() {
            Ok(req)
        } else {
            debug!(state = %req.state(), buffered = self.filled, "stream ended mid-request");
            Err(ReadError::Truncated { state: req.state() })
        }
    }

    fn consume(&mut self, n: usize) {
        self.buf.copy_within(n..self.filled, 0);
        self.filled -= n;
    }

    fn grow(&mut self) -> Result<(), ReadError> {
        let mut new_len = self.buf.len() * 2;
        if let Some(limit) = self.max_size {
            if self.buf.len() >= limit {
                return Err(ReadError::TooLarge { limit });
            }
            new_len = new_len.min(limit);
        }

        trace!(from = self.buf.len(), to = new_len, "growing request buffer");
        self.buf.resize(new_len, 0);
        Ok(())
    }

    fn check_head_size(&self, head_size: usize) -> Result<(), ReadError> {
        match self.max_size {
            Some(limit) if head_size > limit => {
                debug!(head_size, limit, "request head over the size cap");
                Err(ReadError::TooLarge { limit })
            }
            _ => Ok(()),
        }
    }

    fn check_declared_length(&self, req: &HttpRequest) -> Result<(), ReadError> {
        let Some(limit) = self.max_size else {
            return Ok(());
        };
        if req.state() != ParseState::Body {
            return Ok(());
        }
        match req.content_length()? {
            Some(declared) if declared > limit => Err(ReadError::TooLarge { limit }),
            _ => Ok(()),
        }
    }
}

impl Default for RequestReader {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

/// Reads one request with a fresh, uncapped [`RequestReader`].
pub async fn read_request<R>(stream: &mut R) -> Result<HttpRequest, ReadError>
where
    R: Read + Unpin + ?Sized,
{
    RequestReader::default().read_request(stream).await
}
