//! End-to-end tests over real TCP connections.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_std::io::{ReadExt, WriteExt};
use async_std::net::TcpStream;
use async_std::task;

use wirehttp::{Router, Server, ServerConfig};

fn test_config() -> ServerConfig {
    ServerConfig {
        address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        buffer_size: 8,
        max_request_size: 4096,
        ..ServerConfig::default()
    }
}

async fn start() -> Server {
    let config = test_config();
    Server::serve(config.clone(), Router::new(&config))
        .await
        .unwrap()
}

/// Reads until the server closes the connection. A reset after the response
/// (the server closing with request bytes still unread) ends the read too.
async fn read_response(stream: &mut TcpStream) -> String {
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => out.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8(out).unwrap()
}

/// Sends `pieces` with a short pause between each, then reads the response.
async fn exchange(addr: SocketAddr, pieces: &[&str]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    for piece in pieces {
        stream.write_all(piece.as_bytes()).await.unwrap();
        stream.flush().await.unwrap();
        task::sleep(Duration::from_millis(10)).await;
    }
    read_response(&mut stream).await
}

fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().find_map(|line| {
        let (n, v) = line.split_once(": ")?;
        n.eq_ignore_ascii_case(name).then_some(v)
    })
}

#[async_std::test]
async fn test_yourproblem_end_to_end() {
    let server = start().await;
    let out = exchange(
        server.local_addr(),
        &["GET /yourproblem HTTP/1.1\r\nHost: localhost\r\n\r\n"],
    )
    .await;

    let (head, body) = out.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(header(head, "content-length"), Some(body.len().to_string().as_str()));
    assert_eq!(header(head, "content-type"), Some("text/html"));
    assert_eq!(header(head, "connection"), Some("close"));
    assert!(body.contains("Your request honestly kinda sucked."));
}

#[async_std::test]
async fn test_request_split_across_writes() {
    let server = start().await;
    let out = exchange(
        server.local_addr(),
        &[
            "GE",
            "T / HTTP/1.1\r",
            "\nHost: local",
            "host\r\nContent-Length: 5\r\n",
            "\r\nhel",
            "lo",
        ],
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.contains("<h1>Success!</h1>"));
}

#[async_std::test]
async fn test_malformed_request_gets_400_with_reason() {
    let server = start().await;
    let out = exchange(
        server.local_addr(),
        &["GET / HTTP/1.1\r\nHost : localhost\r\n\r\n"],
    )
    .await;

    let (head, body) = out.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(header(head, "content-type"), Some("text/plain"));
    assert_eq!(body, "invalid field-line syntax");
}

#[async_std::test]
async fn test_unsupported_version_gets_400() {
    let server = start().await;
    let out = exchange(server.local_addr(), &["GET / HTTP/2.0\r\n\r\n"]).await;

    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(out.ends_with("unsupported HTTP version \"2.0\", only 1.1 is allowed"));
}

#[async_std::test]
async fn test_truncated_request_gets_400() {
    let server = start().await;
    let addr = server.local_addr();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
        .await
        .unwrap();
    stream.shutdown(std::net::Shutdown::Write).unwrap();

    let out = read_response(&mut stream).await;
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(out.ends_with("connection closed while parsing body"));
}

#[async_std::test]
async fn test_oversized_headers_get_400() {
    let server = start().await;
    // exactly fills the capped buffer once the request line is consumed
    let request = format!("GET / HTTP/1.1\r\nX-Big: {}", "a".repeat(4096 - 7));

    let out = exchange(server.local_addr(), &[request.as_str()]).await;
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(out.ends_with("request exceeds 4096 bytes"));
}

#[async_std::test]
async fn test_chunked_stream_with_trailers() {
    let server = start().await;
    let out = exchange(
        server.local_addr(),
        &["GET /stream/2 HTTP/1.1\r\nHost: localhost\r\n\r\n"],
    )
    .await;

    let (head, rest) = out.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(header(head, "transfer-encoding"), Some("chunked"));
    assert_eq!(
        header(head, "trailer"),
        Some("X-Content-SHA256,X-Content-Length")
    );
    assert!(rest.contains("\r\n0\r\nX-Content-SHA256: "));
    assert!(rest.ends_with("\r\n\r\n"));
}

#[async_std::test]
async fn test_handler_error_before_writing_gets_400() {
    let server = start().await;
    let out = exchange(
        server.local_addr(),
        &["GET /stream/1000 HTTP/1.1\r\nHost: localhost\r\n\r\n"],
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(out.contains("line count must be between 1 and 100"));
}

#[async_std::test]
async fn test_silent_close_gets_no_response() {
    let server = start().await;
    let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
    stream.shutdown(std::net::Shutdown::Write).unwrap();

    assert!(read_response(&mut stream).await.is_empty());
}

#[async_std::test]
async fn test_concurrent_connections() {
    let server = start().await;
    let addr = server.local_addr();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            task::spawn(async move {
                let target = if i % 2 == 0 { "/myproblem" } else { "/" };
                let request = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
                (i, exchange(addr, &[request.as_str()]).await)
            })
        })
        .collect();

    for handle in tasks {
        let (i, out) = handle.await;
        if i % 2 == 0 {
            assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        } else {
            assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        }
    }
}

#[async_std::test]
async fn test_close_stops_accepting() {
    let mut server = start().await;
    let addr = server.local_addr();

    let out = exchange(addr, &["GET / HTTP/1.1\r\n\r\n"]).await;
    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));

    server.close().await.unwrap();
    assert!(server.is_closed());
    assert!(server.close().await.is_err());
    assert!(TcpStream::connect(addr).await.is_err());
}
