//! Error types for the room layer.

use roomchat_protocol::{ClientId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The client lacks the permission this operation needs: not the host
    /// for an invite, or not a member for a post.
    #[error("client {0} is not authorized for room {1}")]
    NotAuthorized(ClientId, RoomId),

    /// A direct chat needs two distinct clients.
    #[error("client {0} cannot open a direct chat with itself")]
    SelfChat(ClientId),
}
