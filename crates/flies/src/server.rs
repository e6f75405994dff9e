//! The listener: binds a socket and processes every accepted connection on its own task.
//!
//! ```no_run
//! use flies::server::Server;
//! use flies::writer::{Output, PrettyWriter};
//!
//! # async fn run() -> Result<(), flies::server::ServerError> {
//! let server = Server::builder()
//!     .address(([127, 0, 0, 1], 8080).into())
//!     .writer(PrettyWriter::new(Output::stdout()))
//!     .bind()
//!     .await?;
//! server.run().await
//! # }
//! ```

use std::fmt;
use std::future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::select;
use tracing::{debug, error, info, warn};

use crate::connection::{CaptureConnection, ConnectionOptions};
use crate::protocol::{ConnectionError, WriteError};
use crate::writer::{DiscardWriter, Output, RequestWriter};

pub const DEFAULT_PORT: u16 = 8080;

/// Pause after a failed accept
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("can't bind {address}: {source}")]
    Bind { address: SocketAddr, source: io::Error },

    #[error("request writer init failed: {source}")]
    Init { source: WriteError },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

pub struct ServerBuilder {
    address: SocketAddr,
    writer: Arc<dyn RequestWriter>,
    options: ConnectionOptions,
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            writer: Arc::new(DiscardWriter),
            options: ConnectionOptions::default(),
        }
    }

    pub fn address(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }

    pub fn writer(mut self, writer: impl RequestWriter + 'static) -> Self {
        self.writer = Arc::new(writer);
        self
    }

    /// Mirrors every connection verbatim to `output` instead of parsing it.
    pub fn raw_output(mut self, output: Output) -> Self {
        self.options.raw_output = Some(output);
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Whether parsed requests get an empty `200 OK` back, enabled by default.
    pub fn acknowledge(mut self, acknowledge: bool) -> Self {
        self.options.acknowledge = acknowledge;
        self
    }

    pub async fn bind(self) -> Result<Server, ServerError> {
        let listener = TcpListener::bind(self.address)
            .await
            .map_err(|source| ServerError::Bind { address: self.address, source })?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, raw = self.options.raw_output.is_some(), "start listening");

        Ok(Server { listener, local_addr, writer: self.writer, options: self.options })
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder").field("address", &self.address).field("options", &self.options).finish()
    }
}

/// A bound listener, ready to accept connections.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    writer: Arc<dyn RequestWriter>,
    options: ConnectionOptions,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until the process ends.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(future::pending()).await
    }

    /// Initializes the writer, then accepts connections until `shutdown` completes.
    ///
    /// A failed accept is logged and the loop goes on after a short pause. Connections already accepted when
    /// `shutdown` completes keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        self.writer.init().await.map_err(|source| ServerError::Init { source })?;

        tokio::pin!(shutdown);
        loop {
            let (tcp_stream, remote_addr) = select! {
                () = &mut shutdown => {
                    info!(address = %self.local_addr, "stop listening");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        accept_failed(&e).await;
                        continue;
                    }
                },
            };

            let writer = Arc::clone(&self.writer);
            let options = self.options.clone();

            tokio::spawn(async move {
                debug!(%remote_addr, "accepted connection");
                let (reader, writer_half) = tcp_stream.into_split();
                let connection = CaptureConnection::new(reader, writer_half, options);
                match connection.process(writer.as_ref()).await {
                    Ok(()) => debug!(%remote_addr, "finished processing, connection closed"),
                    Err(e @ ConnectionError::WriteError { .. }) => {
                        error!(%remote_addr, cause = %e, "failed to write request");
                    }
                    Err(e) => warn!(%remote_addr, cause = %e, "connection closed with error"),
                }
            });
        }
    }
}

/// Errors like `EMFILE` last until other connections close, retrying at once would spin.
async fn accept_failed(e: &io::Error) {
    warn!(cause = %e, delay = ?ACCEPT_ERROR_DELAY, "failed to accept");
    tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server").field("local_addr", &self.local_addr).field("options", &self.options).finish()
    }
}
