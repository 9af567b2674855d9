use std::fmt;

use crate::http::headers::HttpHeaders;

/// `METHOD SP TARGET SP HTTP/1.1`, with the `HTTP/` prefix stripped from the
/// version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: String,
}

/// Progress of [`HttpRequest::parse`](crate::http::request::HttpRequest::parse).
/// Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParseState {
    RequestLine,
    Headers,
    Body,
    Done,
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParseState::RequestLine => "parsing request line",
            ParseState::Headers => "parsing headers",
            ParseState::Body => "parsing body",
            ParseState::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub request_line: RequestLine,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
    pub(crate) state: ParseState,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self {
            request_line: RequestLine::default(),
            headers: HttpHeaders::new(),
            body: Vec::new(),
            state: ParseState::RequestLine,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}
