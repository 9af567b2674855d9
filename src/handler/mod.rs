mod responses;
mod router;
mod static_files;
mod stream;

use std::future::Future;

use async_std::io::{Write, WriteExt};
use thiserror::Error;

use crate::http::request::HttpRequest;
use crate::http::response::{ResponseWriter, WriteError, default_headers, write_headers, write_status_line};
use crate::http::status::HttpStatus;

pub use router::Router;

/// Turns a parsed request into a response.
///
/// The handler owns the whole response: it must drive `w` from the status
/// line through to the body (and trailers, for chunked bodies). The writer
/// only enforces the order of the writes.
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        w: &mut ResponseWriter<W>,
        req: &HttpRequest,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send
    where
        W: Write + Unpin + Send;
}

/// A failure that should be reported to the client as a bare status line,
/// default headers and `message` as a plain-text body.
#[derive(Debug, Error)]
#[error("{status}: {message}")]
pub struct HandlerError {
    pub status: HttpStatus,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: HttpStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(HttpStatus::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(HttpStatus::InternalServerError, message)
    }

    /// Writes the error response straight to `sink`, bypassing any
    /// [`ResponseWriter`] state.
    pub async fn write_to<W>(&self, sink: &mut W) -> Result<(), WriteError>
    where
        W: Write + Unpin + ?Sized,
    {
        write_status_line(sink, self.status).await?;
        write_headers(sink, &default_headers(self.message.len())).await?;
        sink.write_all(self.message.as_bytes()).await?;
        Ok(())
    }
}

impl From<WriteError> for HandlerError {
    fn from(err: WriteError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_std::test]
    async fn test_error_response() {
        let err = HandlerError::bad_request("incomplete request line");
        let mut sink = Vec::new();
        err.write_to(&mut sink).await.unwrap();

        let out = String::from_utf8(sink).unwrap();
        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(out.contains("content-length: 23\r\n"));
        assert!(out.ends_with("\r\n\r\nincomplete request line"));
    }

    #[test]
    fn test_write_error_becomes_internal() {
        let err = HandlerError::from(WriteError::UnsupportedStatus(418));
        assert_eq!(err.status, HttpStatus::InternalServerError);
        assert_eq!(err.message, "unsupported status code 418");
    }
}
