//! Incremental request parser.
//!
//! [`HttpRequest::parse`] is fed whatever bytes are currently buffered and
//! reports how many of them it consumed. The caller drops the consumed prefix
//! and calls again, either straight away or once more bytes have arrived.
//! A return of `Ok(0)` with the state unchanged means "need more data".
//!
//! ```text
//! RequestLine ──▶ Headers ──▶ Body ──▶ Done
//! ```

use thiserror::Error;
use tracing::debug;

use crate::http::headers::{HeaderError, find_crlf};
use crate::http::request::{HttpRequest, ParseState, RequestLine};
use crate::http::{CRLF, HTTP_VERSION};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("incomplete request line")]
    IncompleteRequestLine,

    #[error("request line is not valid UTF-8")]
    InvalidEncoding,

    #[error("invalid HTTP method {0:?}, must be uppercase")]
    InvalidMethod(String),

    #[error("invalid HTTP version format {0:?}")]
    InvalidVersionFormat(String),

    #[error("unsupported HTTP version {0:?}, only 1.1 is allowed")]
    UnsupportedVersion(String),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error("invalid content length value {0:?}")]
    InvalidContentLength(String),

    #[error("body length {actual} greater than declared content length {declared}")]
    BodyTooLong { declared: usize, actual: usize },

    #[error("reading after completion")]
    AlreadyDone,
}

impl HttpRequest {
    /// Advances the parser over `data`, returning the number of bytes consumed.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParseState::RequestLine => {
                let Some((request_line, consumed)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                debug!(
                    method = %request_line.method,
                    target = %request_line.target,
                    "parsed request line"
                );
                self.request_line = request_line;
                self.state = ParseState::Headers;
                Ok(consumed)
            }
            ParseState::Headers => {
                let (consumed, done) = self.headers.parse(data)?;
                if done {
                    debug!(headers = self.headers.len(), "parsed headers");
                    self.state = ParseState::Body;
                }
                Ok(consumed)
            }
            ParseState::Body => {
                let Some(declared) = self.content_length()? else {
                    self.state = ParseState::Done;
                    return Ok(0);
                };

                let actual = self.body.len() + data.len();
                if actual > declared {
                    return Err(ParseError::BodyTooLong { declared, actual });
                }

                self.body.extend_from_slice(data);
                if actual == declared {
                    debug!(body = actual, "parsed body");
                    self.state = ParseState::Done;
                }
                Ok(data.len())
            }
            ParseState::Done => Err(ParseError::AlreadyDone),
        }
    }

    /// The declared `Content-Length`, if the header is present.
    pub fn content_length(&self) -> Result<Option<usize>, ParseError> {
        self.headers
            .get("Content-Length")
            .map(|value| {
                value
                    .parse::<usize>()
                    .map_err(|_| ParseError::InvalidContentLength(value.to_string()))
            })
            .transpose()
    }
}

/// Returns `None` until a full `CRLF`-terminated line is available, otherwise
/// the parsed line and the bytes it occupied including the `CRLF`.
fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(line_end) = find_crlf(data) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&data[..line_end]).map_err(|_| ParseError::InvalidEncoding)?;
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [method, target, version] = parts[..] else {
        return Err(ParseError::IncompleteRequestLine);
    };

    if !method
        .chars()
        .all(|c| !c.is_alphabetic() || c.is_uppercase())
    {
        return Err(ParseError::InvalidMethod(method.to_string()));
    }

    let version = version
        .strip_prefix("HTTP/")
        .ok_or_else(|| ParseError::InvalidVersionFormat(version.to_string()))?;
    if version != HTTP_VERSION {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }

    let request_line = RequestLine {
        method: method.to_string(),
        target: target.to_string(),
        version: version.to_string(),
    };

    Ok(Some((request_line, line_end + CRLF.len())))
}
