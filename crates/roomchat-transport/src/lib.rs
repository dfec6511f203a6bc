//! Transport abstraction layer for roomchat.
//!
//! The chat core only needs "a byte stream, possibly already encrypted".
//! This crate provides the [`Transport`] trait that hands out such streams
//! wrapped in a [`Connection`], and a plain [`TcpTransport`] implementation.
//!
//! A TLS acceptor (or any other stream wrapper) plugs in by implementing
//! [`Transport`] with its own `Stream` type; nothing above this layer
//! cares which one is in use.

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{TcpTransport, connect};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An accepted duplex byte stream plus the metadata the server logs with.
///
/// The stream is handed over whole; the connection handler splits it into
/// a read half and a write half.
#[derive(Debug)]
pub struct Connection<S> {
    id: ConnectionId,
    peer: SocketAddr,
    stream: S,
}

impl<S> Connection<S> {
    /// Wraps an already-established stream.
    pub fn new(id: ConnectionId, peer: SocketAddr, stream: S) -> Self {
        Self { id, peer, stream }
    }

    /// Returns the unique identifier for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the remote address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Consumes the connection, returning the underlying stream.
    pub fn into_stream(self) -> S {
        self.stream
    }
}

/// Accepts new incoming connections.
///
/// `accept` returns a `Send` future so a server generic over its transport
/// can still be moved into `tokio::spawn`.
pub trait Transport: Send + 'static {
    /// The byte stream produced for each accepted peer.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Connection<Self::Stream>, TransportError>> + Send;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}
