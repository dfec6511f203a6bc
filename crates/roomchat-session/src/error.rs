//! Error types for the session layer.

use roomchat_protocol::ClientId;

/// Errors that can occur while registering or looking up clients.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Another connected client already uses this nickname
    /// (case-sensitive comparison).
    #[error("nickname {0:?} is already in use")]
    DuplicateNickname(String),

    /// No connected client has this id.
    #[error("client {0} is not connected")]
    NotFound(ClientId),
}
