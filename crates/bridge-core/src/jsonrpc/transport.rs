//! Byte-stream transport to the SPDK JSON-RPC server.
//!
//! One connection per call: connect, write the whole request, shut down the
//! write half so the server sees end-of-input, then hand the read side back to
//! the caller. There is no retry and no pooling at this layer.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};
use tracing::debug;

/// Readable side of a backend connection, drained by the caller.
pub type ResponseStream = Box<dyn AsyncRead + Send + Unpin>;

/// Where the backend listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendAddress {
    /// `host:port` stream socket.
    Tcp(String),
    /// Unix domain socket path.
    Unix(PathBuf),
}

impl BackendAddress {
    /// Classify an address string.
    ///
    /// Anything of the form `host:port` with a numeric port is TCP; everything
    /// else is taken as a filesystem path.
    pub fn parse(address: &str) -> Self {
        if let Some((host, port)) = address.rsplit_once(':') {
            if !host.is_empty() && !host.contains('/') && port.parse::<u16>().is_ok() {
                return BackendAddress::Tcp(address.to_string());
            }
        }
        BackendAddress::Unix(PathBuf::from(address))
    }
}

impl std::fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendAddress::Tcp(addr) => write!(f, "tcp://{}", addr),
            BackendAddress::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Sends one request payload and returns the stream carrying the reply.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, payload: &[u8]) -> std::io::Result<ResponseStream>;
}

/// [`Transport`] over a Unix or TCP socket.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    address: BackendAddress,
}

impl SocketTransport {
    pub fn new(address: BackendAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &BackendAddress {
        &self.address
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn send(&self, payload: &[u8]) -> std::io::Result<ResponseStream> {
        match &self.address {
            BackendAddress::Tcp(addr) => {
                let mut stream = TcpStream::connect(addr).await?;
                stream.write_all(payload).await?;
                stream.shutdown().await?;
                debug!("Sent {} bytes to {}", payload.len(), self.address);
                Ok(Box::new(stream))
            }
            BackendAddress::Unix(path) => {
                let mut stream = UnixStream::connect(path).await?;
                stream.write_all(payload).await?;
                stream.shutdown().await?;
                debug!("Sent {} bytes to {}", payload.len(), self.address);
                Ok(Box::new(stream))
            }
        }
    }
}
