use std::path::PathBuf;

use async_std::io::Write;
use tracing::debug;

use crate::config::ServerConfig;
use crate::handler::{Handler, HandlerError, responses, static_files, stream};
use crate::http::request::HttpRequest;
use crate::http::response::ResponseWriter;
use crate::http::status::HttpStatus;

/// Demo routes:
///
/// - `/yourproblem`: 400 page
/// - `/myproblem`: 500 page
/// - `/video`: the configured video file
/// - `/static/<path>`: a file under the static root
/// - `/stream/<n>`: `n` lines as a chunked body with checksum trailers
/// - anything else: 200 page
#[derive(Debug, Clone)]
pub struct Router {
    static_root: PathBuf,
    video_path: PathBuf,
    server_name: String,
}

impl Router {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            static_root: config.static_files_root.clone(),
            video_path: config.video_path.clone(),
            server_name: config.server_name.clone(),
        }
    }
}

impl Handler for Router {
    async fn handle<W>(
        &self,
        w: &mut ResponseWriter<W>,
        req: &HttpRequest,
    ) -> Result<(), HandlerError>
    where
        W: Write + Unpin + Send,
    {
        let target = req.target();
        debug!(method = req.method(), target, "routing request");

        if let Some(count) = target.strip_prefix("/stream/") {
            let lines = stream::parse_line_count(count)?;
            return stream::serve(w, lines, target, &self.server_name).await;
        }

        if let Some(path) = target.strip_prefix("/static/") {
            let Some(path) = static_files::resolve(&self.static_root, path) else {
                return Err(HandlerError::bad_request(format!(
                    "invalid static file path {target:?}"
                )));
            };
            return static_files::serve(w, &path, &self.server_name).await;
        }

        match target {
            "/yourproblem" => {
                responses::html_page(w, HttpStatus::BadRequest, &self.server_name).await
            }
            "/myproblem" => {
                responses::html_page(w, HttpStatus::InternalServerError, &self.server_name).await
            }
            "/video" => static_files::serve(w, &self.video_path, &self.server_name).await,
            _ => responses::html_page(w, HttpStatus::Ok, &self.server_name).await,
        }
    }
}
