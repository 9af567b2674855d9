use std::time::SystemTime;

use async_std::io::Write;
use tracing::debug;

use crate::handler::HandlerError;
use crate::http::headers::HttpHeaders;
use crate::http::response::{ResponseWriter, default_headers, render_response};
use crate::http::status::HttpStatus;

const OK_PAGE: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>";

const BAD_REQUEST_PAGE: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>";

const INTERNAL_ERROR_PAGE: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>";

pub fn page_for(status: HttpStatus) -> &'static str {
    match status {
        HttpStatus::Ok => OK_PAGE,
        HttpStatus::BadRequest => BAD_REQUEST_PAGE,
        HttpStatus::InternalServerError => INTERNAL_ERROR_PAGE,
    }
}

/// Default headers plus `Server` and `Date`.
pub fn base_headers(content_length: usize, server_name: &str) -> HttpHeaders {
    let mut headers = default_headers(content_length);
    headers.set("Server", server_name);
    headers.set("Date", &httpdate::fmt_http_date(SystemTime::now()));
    headers
}

/// Writes the canned HTML page for `status` as a complete response.
pub async fn html_page<W>(
    w: &mut ResponseWriter<W>,
    status: HttpStatus,
    server_name: &str,
) -> Result<(), HandlerError>
where
    W: Write + Unpin + Send,
{
    let body = page_for(status).as_bytes();
    let mut headers = base_headers(body.len(), server_name);
    headers.replace("Content-Type", "text/html");

    w.write_status_line(status).await?;
    w.write_headers(&headers).await?;
    w.write_body(body).await?;

    if tracing::enabled!(tracing::Level::DEBUG) {
        let rendered = render_response(status, &headers, body)?;
        debug!("response:\n{rendered}");
    }
    Ok(())
}
