use std::fmt;

/// Status codes the response writer knows how to put on a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,

    BadRequest = 400,

    InternalServerError = 500,
}

impl HttpStatus {
    pub fn from_code(code: u16) -> Option<HttpStatus> {
        match code {
            200 => Some(HttpStatus::Ok),
            400 => Some(HttpStatus::BadRequest),
            500 => Some(HttpStatus::InternalServerError),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn reason(self) -> &'static str {
        match self {
            HttpStatus::Ok => "OK",
            HttpStatus::BadRequest => "Bad Request",
            HttpStatus::InternalServerError => "Internal Server Error",
        }
    }

    /// `HTTP/1.1 <code> <reason>`, without the trailing `CRLF`.
    pub fn status_line(self) -> String {
        format!("HTTP/1.1 {} {}", self.code(), self.reason())
    }
}

impl From<HttpStatus> for u16 {
    fn from(status: HttpStatus) -> u16 {
        status.code()
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}
