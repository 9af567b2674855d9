//! Connection-level glue around the HTTP core.
//!
//! This module only deals with networking concerns:
//! - accepting TCP connections,
//! - handing each connection to its own task,
//! - turning read and handler failures into best-effort error responses.
//!
//! Request parsing and response serialization live in [`crate::http`];
//! response content is produced by a [`Handler`].
//!
//! ## Request handling flow
//!
//! 1. Accept a TCP connection and spawn a task for it
//! 2. Read and incrementally parse one request
//!    (delegated to [`RequestReader`])
//! 3. On any read failure other than an idle close, reply `400` with the
//!    error as body
//! 4. Otherwise run the handler with a fresh [`ResponseWriter`]
//! 5. If the handler fails before writing anything, reply with its error
//! 6. Flush and close the connection
//!
//! Connections are never reused. The only state shared between tasks is the
//! `closed` flag, which lets the accept loop tell a shutdown apart from a
//! real accept error.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_std::future::timeout;
use async_std::io::WriteExt;
use async_std::net::{TcpListener, TcpStream};
use async_std::task::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::handler::{Handler, HandlerError};
use crate::http::reader::{ReadError, RequestReader};
use crate::http::response::{ResponseWriter, WriterState};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to listen at {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server already closed")]
    AlreadyClosed,
}

pub struct Server {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    accept_task: Option<JoinHandle<()>>,
}

struct Connection<H> {
    handler: Arc<H>,
    config: Arc<ServerConfig>,
}

impl<H> Clone for Connection<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl Server {
    /// Binds to the configured address and starts accepting connections in
    /// the background.
    pub async fn serve<H: Handler>(config: ServerConfig, handler: H) -> Result<Server, ServerError> {
        let addr = SocketAddr::new(config.address, config.port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let closed = Arc::new(AtomicBool::new(false));
        let conn = Connection {
            handler: Arc::new(handler),
            config: Arc::new(config),
        };
        let accept_task = task::spawn(Self::listen(listener, conn, Arc::clone(&closed)));

        info!(%local_addr, "server listening");
        Ok(Server {
            local_addr,
            closed,
            accept_task: Some(accept_task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops accepting connections and drops the listener. Connections
    /// already being served run to completion.
    pub async fn close(&mut self) -> Result<(), ServerError> {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ServerError::AlreadyClosed)?;

        if let Some(accept_task) = self.accept_task.take() {
            accept_task.cancel().await;
        }
        info!(local_addr = %self.local_addr, "server closed");
        Ok(())
    }

    /// Serves until `shutdown` resolves, then closes the server.
    pub async fn close_on<F>(&mut self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        shutdown.await;
        info!(local_addr = %self.local_addr, "shutdown requested");
        self.close().await
    }

    async fn listen<H: Handler>(listener: TcpListener, conn: Connection<H>, closed: Arc<AtomicBool>) {
        while !closed.load(Ordering::Acquire) {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!(%peer, "accepted connection");
                    task::spawn(Self::handle_client(stream, peer, conn.clone()));
                }
                Err(err) => {
                    if closed.load(Ordering::Acquire) {
                        return;
                    }
                    warn!(error = %err, "failed to accept connection");
                }
            }
        }
    }

    /// Handles a single client connection.
    /// Reads the HTTP request, runs the handler, and closes the connection.
    async fn handle_client<H: Handler>(mut stream: TcpStream, peer: SocketAddr, conn: Connection<H>) {
        let config = &conn.config;
        let mut reader = RequestReader::new(config.buffer_size).with_max_size(config.max_request_size);

        let req = match timeout(config.read_timeout, reader.read_request(&mut stream)).await {
            Ok(Ok(req)) => req,
            Ok(Err(ReadError::ConnectionClosed)) => {
                debug!(%peer, "connection closed without a request");
                return;
            }
            Ok(Err(ReadError::Io(err))) => {
                warn!(%peer, error = %err, "I/O error while reading request");
                Self::reject(&mut stream, peer, HandlerError::bad_request(err.to_string())).await;
                return;
            }
            Ok(Err(err)) => {
                debug!(%peer, error = %err, "rejecting malformed request");
                Self::reject(&mut stream, peer, HandlerError::bad_request(err.to_string())).await;
                return;
            }
            Err(_) => {
                warn!(%peer, timeout = ?config.read_timeout, "timed out reading request");
                Self::reject(&mut stream, peer, HandlerError::bad_request("timed out reading request"))
                    .await;
                return;
            }
        };

        info!(%peer, method = req.method(), target = req.target(), "handling request");

        let mut writer = ResponseWriter::new(stream);
        let result = timeout(config.write_timeout, conn.handler.handle(&mut writer, &req)).await;

        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err),
            Err(_) => Some(HandlerError::internal("timed out writing response")),
        };

        if let Some(err) = failure {
            if writer.state() == WriterState::Init {
                Self::reject(writer.get_mut(), peer, err).await;
            } else {
                warn!(%peer, state = %writer.state(), error = %err, "response failed after it was started");
            }
        }

        if let Err(err) = writer.flush().await {
            debug!(%peer, error = %err, "failed to flush response");
        }
    }

    /// Best-effort one-shot error response.
    async fn reject(stream: &mut TcpStream, peer: SocketAddr, err: HandlerError) {
        if let Err(write_err) = err.write_to(stream).await {
            warn!(%peer, error = %write_err, "failed to write error response");
            return;
        }
        if let Err(flush_err) = stream.flush().await {
            warn!(%peer, error = %flush_err, "failed to flush error response");
        }
    }
}
