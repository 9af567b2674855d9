use async_std::io::Write;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::handler::HandlerError;
use crate::handler::responses::base_headers;
use crate::http::response::ResponseWriter;
use crate::http::status::HttpStatus;

pub const MAX_LINES: usize = 100;

/// Streams `lines` generated lines as a chunked body, one chunk per line,
/// followed by `X-Content-SHA256` and `X-Content-Length` trailers computed
/// over the de-chunked body.
pub async fn serve<W>(
    w: &mut ResponseWriter<W>,
    lines: usize,
    target: &str,
    server_name: &str,
) -> Result<(), HandlerError>
where
    W: Write + Unpin + Send,
{
    let mut headers = base_headers(0, server_name);
    headers.delete("Content-Length");
    headers.set("Transfer-Encoding", "chunked");
    headers.set("Trailer", "X-Content-SHA256");
    headers.set("Trailer", "X-Content-Length");

    w.write_status_line(HttpStatus::Ok).await?;
    w.write_headers(&headers).await?;

    let mut hasher = Sha256::new();
    let mut total = 0;
    for id in 0..lines {
        let line = format!("{{\"id\": {id}, \"url\": \"{target}\"}}\n");
        w.write_chunk(line.as_bytes()).await?;
        hasher.update(line.as_bytes());
        total += line.len();
    }
    w.write_last_chunk().await?;

    headers.set("X-Content-SHA256", &hex::encode(hasher.finalize()));
    headers.set("X-Content-Length", &total.to_string());
    w.write_trailers(&headers).await?;

    debug!(lines, bytes = total, "streamed chunked body");
    Ok(())
}

/// Parses the `<n>` of `/stream/<n>`.
pub fn parse_line_count(raw: &str) -> Result<usize, HandlerError> {
    match raw.parse::<usize>() {
        Ok(n) if (1..=MAX_LINES).contains(&n) => Ok(n),
        _ => Err(HandlerError::bad_request(format!(
            "line count must be between 1 and {MAX_LINES}, got {raw:?}"
        ))),
    }
}
