//! A minimal HTTP/1.1 engine over raw byte streams.
//!
//! - [`http::headers`]: case-insensitive, comma-joining header set and the
//!   incremental field-line parser
//! - [`http::parser`] / [`http::reader`]: request state machine and the
//!   read loop that feeds it from a stream
//! - [`http::response`]: ordered response writer with chunked trailers
//! - [`net::server`] / [`handler`]: accept loop and demo routes built on top

pub mod config;
pub mod handler;
pub mod http;
pub mod net;

pub use config::ServerConfig;
pub use handler::{Handler, HandlerError, Router};
pub use http::headers::{HeaderError, HttpHeaders};
pub use http::parser::ParseError;
pub use http::reader::{ReadError, RequestReader, read_request};
pub use http::request::{HttpRequest, ParseState, RequestLine};
pub use http::response::{ResponseWriter, WriteError, WriterState};
pub use http::status::HttpStatus;
pub use net::server::{Server, ServerError};
