//! Client identity: who a registered connection is.

use roomchat_protocol::{ClientId, Message};
use roomchat_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel sender for delivering outbound messages to one client.
///
/// Each registered connection owns a writer task draining the other end,
/// so pushing into this channel never blocks and never touches the socket
/// directly. A send error means the writer is gone (the client is
/// disconnecting) and is safe to ignore during fan-out.
pub type ClientSender = mpsc::UnboundedSender<Message>;

/// The server's record of a client that completed the nickname handshake.
///
/// Created on successful handshake and dropped on disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Server-assigned id, unique for the lifetime of the process.
    pub client_id: ClientId,

    /// Nickname, unique among currently connected clients.
    pub nickname: String,

    /// The transport connection this client is attached to.
    pub connection: ConnectionId,
}
