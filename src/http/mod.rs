//! HTTP/1.1 wire handling: incremental request parsing and ordered response
//! writing over raw byte streams.

pub mod headers;
pub mod parser;
pub mod reader;
pub mod request;
pub mod response;
pub mod status;

/// Line terminator for the request line, field lines and chunk framing.
pub const CRLF: &str = "\r\n";

/// The only protocol version accepted on the request line.
pub const HTTP_VERSION: &str = "1.1";
