//! Unified error type for roomchat.

use roomchat_client::ClientError;
use roomchat_protocol::ProtocolError;
use roomchat_resource::ResourceError;
use roomchat_room::RoomError;
use roomchat_session::SessionError;
use roomchat_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `roomchat` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A transport-level error (bind, accept, connect).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (framing, payload decoding, socket I/O).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (nickname taken, unknown client).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not found, not authorized).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A resource store error (missing blob, disk failure).
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A client adapter error.
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomchat_protocol::{ClientId, ResourceId, RoomId};

    #[test]
    fn test_from_transport_error() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy");
        let err: ChatError = TransportError::BindFailed(io).into();
        assert!(matches!(err, ChatError::Transport(_)));
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ChatError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: ChatError = SessionError::DuplicateNickname("ann".into()).into();
        assert!(matches!(err, ChatError::Session(_)));
        assert!(err.to_string().contains("ann"));
    }

    #[test]
    fn test_from_room_error() {
        let err: ChatError = RoomError::NotAuthorized(ClientId(1), RoomId(2)).into();
        assert!(matches!(err, ChatError::Room(_)));
    }

    #[test]
    fn test_from_resource_error() {
        let err: ChatError = ResourceError::NotFound(ResourceId(4)).into();
        assert!(matches!(err, ChatError::Resource(_)));
    }

    #[test]
    fn test_from_client_error() {
        let err: ChatError = ClientError::ConnectionClosed.into();
        assert!(matches!(err, ChatError::Client(_)));
    }
}
