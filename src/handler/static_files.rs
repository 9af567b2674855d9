use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_std::fs::File;
use async_std::io::{ReadExt, Write};
use tracing::{debug, warn};

use crate::handler::HandlerError;
use crate::handler::responses::{self, base_headers};
use crate::http::response::ResponseWriter;
use crate::http::status::HttpStatus;

const READ_CHUNK: usize = 32 * 1024;

/// Streams the file at `path` with its size as `Content-Length`.
///
/// Failures before the status line is written fall back to the 500 page.
pub async fn serve<W>(
    w: &mut ResponseWriter<W>,
    path: &Path,
    server_name: &str,
) -> Result<(), HandlerError>
where
    W: Write + Unpin + Send,
{
    debug!(path = %path.display(), "serving file");

    let (mut file, size) = match open(path).await {
        Ok(opened) => opened,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot open file");
            return responses::html_page(w, HttpStatus::InternalServerError, server_name).await;
        }
    };

    let Ok(size) = usize::try_from(size) else {
        warn!(path = %path.display(), size, "file too large for this platform");
        return responses::html_page(w, HttpStatus::InternalServerError, server_name).await;
    };

    let mut headers = base_headers(size, server_name);
    headers.replace("Content-Type", guess_mime(path));

    w.write_status_line(HttpStatus::Ok).await?;
    w.write_headers(&headers).await?;

    let mut buffer = vec![0; READ_CHUNK];
    loop {
        let n = match file.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        w.write_body(&buffer[..n]).await?;
    }

    Ok(())
}

async fn open(path: &Path) -> std::io::Result<(File, u64)> {
    let file = File::open(path).await?;
    let size = file.metadata().await?.len();
    Ok((file, size))
}

/// Joins a request path onto `root`, refusing anything that could climb out
/// of it.
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    let mut resolved = root.to_path_buf();

    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if resolved == root {
        return None;
    }
    Some(resolved)
}

fn guess_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("htm") | Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("txt") => "text/plain",
        Some("pdf") => "application/pdf",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let root = Path::new("/srv/static");

        assert_eq!(
            resolve(root, "/css/site.css"),
            Some(PathBuf::from("/srv/static/css/site.css"))
        );
        assert_eq!(
            resolve(root, "./a.txt"),
            Some(PathBuf::from("/srv/static/a.txt"))
        );
        assert_eq!(resolve(root, "/../etc/passwd"), None);
        assert_eq!(resolve(root, "/a/../../b"), None);
        assert_eq!(resolve(root, "/"), None);
        assert_eq!(resolve(root, ""), None);
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("clouds.mp4")), "video/mp4");
        assert_eq!(guess_mime(Path::new("index.HTML")), "application/octet-stream");
        assert_eq!(guess_mime(Path::new("index.html")), "text/html");
        assert_eq!(guess_mime(Path::new("README")), "application/octet-stream");
    }

    #[async_std::test]
    async fn test_serve_missing_file() {
        let mut w = ResponseWriter::new(Vec::new());
        serve(&mut w, Path::new("/definitely/not/here.mp4"), "test")
            .await
            .unwrap();

        let out = String::from_utf8(w.into_inner()).unwrap();
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[async_std::test]
    async fn test_serve_file() {
        let path = std::env::temp_dir().join(format!("wirehttp-serve-{}.txt", std::process::id()));
        let content = "x".repeat(READ_CHUNK + 10);
        std::fs::write(&path, &content).unwrap();

        let mut w = ResponseWriter::new(Vec::new());
        serve(&mut w, &path, "test").await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let out = String::from_utf8(w.into_inner()).unwrap();
        let (head, body) = out.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains(&format!("content-length: {}\r\n", content.len())));
        assert!(head.contains("content-type: text/plain"));
        assert_eq!(body, content);
    }
}
