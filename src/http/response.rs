//! Response serialization.
//!
//! [`ResponseWriter`] enforces the order status line → headers → body →
//! trailers over any async byte sink. An operation called in the wrong state
//! fails with [`WriteError::StateMismatch`] and writes nothing.
//!
//! The free functions [`write_status_line`] and [`write_headers`] bypass the
//! state machine. They are meant for one-shot error replies sent before a
//! request could be parsed.
//!
//! Chunked bodies are assembled by the caller: put `Transfer-Encoding:
//! chunked` in the headers instead of `Content-Length`, send each piece with
//! [`ResponseWriter::write_chunk`], then [`ResponseWriter::write_last_chunk`]
//! and [`ResponseWriter::write_trailers`].

use std::fmt;

use async_std::io::{Write, WriteExt};
use thiserror::Error;

use crate::http::CRLF;
use crate::http::headers::HttpHeaders;
use crate::http::status::HttpStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Init,
    StatusWritten,
    HeadersWritten,
    BodyWritten,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriterState::Init => "init",
            WriterState::StatusWritten => "status line written",
            WriterState::HeadersWritten => "headers written",
            WriterState::BodyWritten => "body written",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    StatusLine,
    Headers,
    Body,
    Trailers,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteOp::StatusLine => "status line",
            WriteOp::Headers => "headers",
            WriteOp::Body => "body",
            WriteOp::Trailers => "trailers",
        };
        f.write_str(s)
    }
}

impl WriterState {
    /// The state after `op`, or `None` if `op` is not allowed now.
    pub fn next(self, op: WriteOp) -> Option<WriterState> {
        use WriteOp::*;
        use WriterState::*;

        match (self, op) {
            (Init, StatusLine) => Some(StatusWritten),
            (StatusWritten, Headers) => Some(HeadersWritten),
            (HeadersWritten | BodyWritten, Body) => Some(BodyWritten),
            (BodyWritten, Trailers) => Some(BodyWritten),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("state mismatch: cannot write {operation} when {state}")]
    StateMismatch {
        operation: WriteOp,
        state: WriterState,
    },

    #[error("unsupported status code {0}")]
    UnsupportedStatus(u16),

    #[error("no Trailer header declares which trailers to write")]
    MissingTrailerDeclaration,

    #[error("could not write to connection: {0}")]
    Io(#[from] std::io::Error),
}

pub struct ResponseWriter<W> {
    sink: W,
    state: WriterState,
}

impl<W> ResponseWriter<W>
where
    W: Write + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriterState::Init,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn begin(&self, operation: WriteOp) -> Result<WriterState, WriteError> {
        self.state.next(operation).ok_or(WriteError::StateMismatch {
            operation,
            state: self.state,
        })
    }

    pub async fn write_status_line(&mut self, code: impl Into<u16>) -> Result<HttpStatus, WriteError> {
        let next = self.begin(WriteOp::StatusLine)?;
        let status = write_status_line(&mut self.sink, code).await?;
        self.state = next;
        Ok(status)
    }

    pub async fn write_headers(&mut self, headers: &HttpHeaders) -> Result<(), WriteError> {
        let next = self.begin(WriteOp::Headers)?;
        write_headers(&mut self.sink, headers).await?;
        self.state = next;
        Ok(())
    }

    /// Writes `body` verbatim. May be called repeatedly to stream a body.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, WriteError> {
        let next = self.begin(WriteOp::Body)?;
        self.sink.write_all(body).await?;
        self.state = next;
        Ok(body.len())
    }

    /// Writes one chunk of a chunked body: `<hex-length>\r\n<data>\r\n`.
    ///
    /// An empty `data` is skipped, since a zero-length chunk ends the body.
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.begin(WriteOp::Body)?;
        if data.is_empty() {
            return Ok(0);
        }
        self.write_body(format!("{:x}{}", data.len(), CRLF).as_bytes())
            .await?;
        self.write_body(data).await?;
        self.write_body(CRLF.as_bytes()).await?;
        Ok(data.len())
    }

    /// Writes the terminating `0\r\n` chunk. The message is finished by
    /// [`write_trailers`](Self::write_trailers), or by a bare `CRLF` body
    /// write when there are no trailers.
    pub async fn write_last_chunk(&mut self) -> Result<(), WriteError> {
        self.write_body(format!("0{}", CRLF).as_bytes()).await?;
        Ok(())
    }

    /// Writes every field named by the `Trailer` header of `headers`, looked
    /// up in that same set, then the blank line that ends the message.
    pub async fn write_trailers(&mut self, headers: &HttpHeaders) -> Result<(), WriteError> {
        let next = self.begin(WriteOp::Trailers)?;
        let declared = headers
            .get("Trailer")
            .ok_or(WriteError::MissingTrailerDeclaration)?;

        let mut trailers = String::new();
        for name in declared.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let value = headers.get(name).unwrap_or_default();
            trailers.push_str(&format!("{}: {}{}", name, value, CRLF));
        }
        trailers.push_str(CRLF);

        self.sink.write_all(trailers.as_bytes()).await?;
        self.state = next;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), WriteError> {
        self.sink.flush().await?;
        Ok(())
    }
}

/// Writes `HTTP/1.1 <code> <reason>\r\n` with no state checks.
pub async fn write_status_line<W>(sink: &mut W, code: impl Into<u16>) -> Result<HttpStatus, WriteError>
where
    W: Write + Unpin + ?Sized,
{
    let code = code.into();
    let status = HttpStatus::from_code(code).ok_or(WriteError::UnsupportedStatus(code))?;
    sink.write_all(format!("{}{}", status.status_line(), CRLF).as_bytes())
        .await?;
    Ok(status)
}

/// Writes every header as `name: value\r\n`, then the blank line, with no
/// state checks.
pub async fn write_headers<W>(sink: &mut W, headers: &HttpHeaders) -> Result<(), WriteError>
where
    W: Write + Unpin + ?Sized,
{
    let mut block = headers.stringify();
    block.push_str(CRLF);
    sink.write_all(block.as_bytes()).await?;
    Ok(())
}

/// `Content-Length`, `Connection: close` and `Content-Type: text/plain`.
pub fn default_headers(content_length: usize) -> HttpHeaders {
    let mut headers = HttpHeaders::new();
    headers.set("Content-Length", &content_length.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}

/// Renders a complete response as text, for logging.
pub fn render_response(
    code: impl Into<u16>,
    headers: &HttpHeaders,
    body: &[u8],
) -> Result<String, WriteError> {
    let code = code.into();
    let status = HttpStatus::from_code(code).ok_or(WriteError::UnsupportedStatus(code))?;

    Ok(format!(
        "{}{}{}{}{}",
        status.status_line(),
        CRLF,
        headers.stringify(),
        CRLF,
        String::from_utf8_lossy(body)
    ))
}
