//! Error types for the client adapter.

use roomchat_protocol::{MessageType, ProtocolError};
use roomchat_transport::TransportError;

/// Errors surfaced to the application driving a [`ChatClient`](crate::ChatClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Could not reach the server.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server sent something that is not a valid frame, or a write
    /// failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server rejected the nickname because another connected client
    /// already uses it.
    #[error("nickname {0:?} is already taken")]
    NicknameTaken(String),

    /// The handshake got a reply other than `ACKNOWLEDGE_CLIENT`.
    #[error("unexpected {0} during handshake")]
    UnexpectedReply(MessageType),

    /// The server closed the connection, or the worker has stopped.
    #[error("connection closed")]
    ConnectionClosed,
}
