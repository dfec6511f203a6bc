//! Per-connection handler: nickname handshake and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the client's outbound channel.
//! The flow is:
//!   1. Receive NICKNAME → register, or reject a nickname already in use
//!   2. Send ACKNOWLEDGE_CLIENT → announce the newcomer to everyone else
//!   3. Loop: decode one message → route to rooms or resources → fan out

use std::sync::Arc;
use std::time::Duration;

use roomchat_protocol::{
    ClientId, FIELD_SEPARATOR, FrameReader, FrameWriter, Message, MessageType, ProtocolError,
};
use roomchat_resource::ResourceError;
use roomchat_room::Room;
use roomchat_session::{ClientRegistry, ClientSender, Registration, SessionError};
use roomchat_transport::{Connection, ConnectionId};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ChatError;
use crate::server::{ChatState, ServerState};

/// Drop guard that unregisters a client when its handler exits.
///
/// The normal exit path calls [`release`](Self::release), which removes the
/// client before the handler returns. If the handler panics or is cancelled
/// first, `Drop` spawns the removal instead, since it cannot await the lock.
struct RegistrationGuard {
    client_id: ClientId,
    state: Option<Arc<ServerState>>,
}

impl RegistrationGuard {
    fn new(client_id: ClientId, state: &Arc<ServerState>) -> Self {
        Self {
            client_id,
            state: Some(Arc::clone(state)),
        }
    }

    /// Unregisters the client now.
    async fn release(mut self) {
        if let Some(state) = &self.state {
            unregister(state, self.client_id).await;
        }
        self.state = None;
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            let client_id = self.client_id;
            tokio::spawn(async move {
                unregister(&state, client_id).await;
            });
        }
    }
}

async fn unregister(state: &ServerState, client_id: ClientId) {
    let mut chat = state.chat.lock().await;
    if let Err(e) = chat.clients.remove(client_id) {
        tracing::debug!(%client_id, error = %e, "client already removed");
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S>(
    conn: Connection<S>,
    state: Arc<ServerState>,
) -> Result<(), ChatError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer(), "handling new connection");

    let (read_half, write_half) = tokio::io::split(conn.into_stream());
    let mut reader =
        FrameReader::new(read_half).with_max_payload_len(state.config.max_payload_len);

    // --- Step 1: Handshake ---
    let nickname = receive_nickname(&mut reader, state.config.handshake_timeout()).await?;

    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let mut writer = tokio::spawn(write_loop(FrameWriter::new(write_half), outbound_rx, conn_id));

    let client_id = match register(&state, &nickname, conn_id, &outbound).await {
        Ok(client_id) => client_id,
        Err(e) => {
            let _ = outbound.send(Message::AcknowledgeClient { client_id: None });
            drop(outbound);
            tracing::info!(%conn_id, %nickname, "nickname in use, waiting for peer to close");
            discard_until_closed(&mut reader).await;
            return Err(e.into());
        }
    };

    // --- Step 2: Message loop ---
    let guard = RegistrationGuard::new(client_id, &state);
    let result = serve(&state, client_id, &outbound, &mut reader, &mut writer).await;
    guard.release().await;
    result
}

/// Reads and dispatches messages until the peer leaves, the stream turns
/// bad, or the writer task stops.
async fn serve<R>(
    state: &ServerState,
    client_id: ClientId,
    outbound: &ClientSender,
    reader: &mut FrameReader<R>,
    writer: &mut JoinHandle<()>,
) -> Result<(), ChatError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let read = tokio::select! {
            read = reader.read_message() => read,
            _ = &mut *writer => {
                // The registry still holds a sender, so the writer only
                // finishes early when the socket refused a write.
                tracing::info!(%client_id, "send failed, treating as disconnect");
                return Ok(());
            }
        };

        let message = match read {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::info!(%client_id, "client disconnected");
                return Ok(());
            }
            Err(ProtocolError::UnknownMessageType(tag)) => {
                tracing::debug!(%client_id, tag, "ignoring unknown message type");
                continue;
            }
            Err(e) => {
                tracing::debug!(%client_id, error = %e, "dropping connection");
                return Err(e.into());
            }
        };

        tracing::debug!(%client_id, kind = %message.message_type(), "dispatching");
        dispatch(state, client_id, outbound, message).await;
    }
}

/// Waits for the first frame and requires it to be NICKNAME.
///
/// A nickname holding the field separator could never be sent back out in
/// CLIENT_DISCOVERY, so it is refused like any other malformed handshake.
async fn receive_nickname<R>(
    reader: &mut FrameReader<R>,
    timeout: Option<Duration>,
) -> Result<String, ChatError>
where
    R: AsyncRead + Unpin,
{
    let read = reader.read_message();
    let first = match timeout {
        Some(limit) => tokio::time::timeout(limit, read)
            .await
            .map_err(|_| ProtocolError::InvalidMessage("handshake timed out".into()))?,
        None => read.await,
    }?;

    match first {
        Some(Message::Nickname { nickname }) if nickname.contains(FIELD_SEPARATOR) => {
            Err(ProtocolError::SeparatorInField(MessageType::Nickname).into())
        }
        Some(Message::Nickname { nickname }) => Ok(nickname),
        Some(other) => Err(ProtocolError::InvalidMessage(format!(
            "first message must be NICKNAME, got {}",
            other.message_type()
        ))
        .into()),
        None => Err(ProtocolError::InvalidMessage(
            "connection closed before handshake".into(),
        )
        .into()),
    }
}

/// Registers the client and sends the handshake replies while still
/// holding the chat lock, so the acknowledgement is the first thing the
/// client sees and the discovery notice only reaches earlier clients.
async fn register(
    state: &ServerState,
    nickname: &str,
    conn_id: ConnectionId,
    outbound: &ClientSender,
) -> Result<ClientId, SessionError> {
    let mut chat = state.chat.lock().await;
    let Registration { identity, peers } =
        chat.clients.register(nickname, conn_id, outbound.clone())?;

    let _ = outbound.send(Message::AcknowledgeClient {
        client_id: Some(identity.client_id),
    });

    let notice = Message::ClientDiscovery {
        client_id: identity.client_id,
        nickname: identity.nickname,
    };
    for peer in &peers {
        let _ = peer.send(notice.clone());
    }

    Ok(identity.client_id)
}

/// Reads and throws away frames until the peer hangs up.
async fn discard_until_closed<R>(reader: &mut FrameReader<R>)
where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.read_message().await {
            Ok(Some(_)) | Err(ProtocolError::UnknownMessageType(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }
}

/// Drains one client's outbound channel onto its socket.
///
/// A message that cannot be encoded is skipped; nothing reached the socket
/// for it, so the stream stays in sync. Only an I/O failure ends the loop.
async fn write_loop<W>(
    mut writer: FrameWriter<W>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    conn_id: ConnectionId,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound.recv().await {
        match writer.write_message(&message).await {
            Ok(()) => {}
            Err(ProtocolError::Io(e)) => {
                tracing::warn!(%conn_id, error = %e, "write failed");
                break;
            }
            Err(e) => {
                tracing::warn!(
                    %conn_id,
                    kind = %message.message_type(),
                    error = %e,
                    "skipping unencodable message"
                );
            }
        }
    }
    tracing::debug!(%conn_id, "writer finished");
}

/// Routes one message from a registered client.
///
/// Requests the client is not allowed to make are dropped without a reply.
async fn dispatch(
    state: &ServerState,
    client_id: ClientId,
    outbound: &ClientSender,
    message: Message,
) {
    let kind = message.message_type();
    match message {
        Message::ListClients => {
            let chat = state.chat.lock().await;
            for identity in chat.clients.identities() {
                reply(
                    outbound,
                    Message::ClientDiscovery {
                        client_id: identity.client_id,
                        nickname: identity.nickname.clone(),
                    },
                );
            }
        }

        Message::ListRooms => {
            let chat = state.chat.lock().await;
            for room in chat.rooms.list_visible_rooms(client_id) {
                reply(outbound, room_discovery(&chat.clients, room));
            }
        }

        Message::RoomCreate { host_id, title } => {
            if host_id != client_id {
                tracing::debug!(%client_id, %host_id, "room create for another host ignored");
                return;
            }
            let room_id = {
                let mut chat = state.chat.lock().await;
                chat.rooms.create_room(&title, client_id).room_id()
            };
            reply(outbound, Message::AcknowledgeRoomCreate { room_id });
        }

        Message::RoomInvite {
            room_id,
            client_id: invitee,
        } => {
            let mut chat = state.chat.lock().await;
            let ChatState { clients, rooms } = &mut *chat;

            let room = match rooms.invite(room_id, client_id, invitee) {
                Ok(room) => room,
                Err(e) => {
                    tracing::debug!(%client_id, error = %e, "invite rejected");
                    return;
                }
            };

            if let Some(sender) = clients.sender(invitee) {
                let _ = sender.send(room_discovery(clients, room));
            }
            let membership = Message::RoomMembershipDiscovery {
                room_id,
                member_ids: room.members().collect(),
            };
            for sender in clients.senders_for(room.members()) {
                let _ = sender.send(membership.clone());
            }
        }

        Message::InitiateUserChat { user_id } => {
            let mut chat = state.chat.lock().await;
            let Some(user_nick) = chat.clients.nickname(user_id).map(str::to_string) else {
                tracing::debug!(%client_id, %user_id, "direct chat with unknown client ignored");
                return;
            };
            match chat.rooms.get_or_create_direct_chat(client_id, user_id) {
                Ok(room_id) => reply(
                    outbound,
                    Message::AcknowledgeUserChat {
                        room_id,
                        user_id,
                        user_nick,
                    },
                ),
                Err(e) => tracing::debug!(%client_id, error = %e, "direct chat rejected"),
            }
        }

        Message::RoomMessageSend {
            room_id,
            text,
            timestamp,
            resource_id,
        } => {
            let mut chat = state.chat.lock().await;
            let ChatState { clients, rooms } = &mut *chat;

            let delivery = match rooms.post_message(room_id, client_id, text, timestamp, resource_id)
            {
                Ok(delivery) => delivery,
                Err(e) => {
                    tracing::debug!(%client_id, error = %e, "message rejected");
                    return;
                }
            };

            let broadcast = Message::RoomMessageBroadcast {
                room_id,
                text: delivery.entry.text,
                timestamp: delivery.entry.timestamp,
                user_id: client_id,
                resource_id: delivery.entry.resource_id,
            };
            for sender in clients.senders_for(delivery.recipients) {
                let _ = sender.send(broadcast.clone());
            }
        }

        Message::ListRoomMembers { room_id } => {
            let chat = state.chat.lock().await;
            match chat.rooms.get(room_id) {
                Some(room) if room.is_member(client_id) => reply(
                    outbound,
                    Message::RoomMembershipDiscovery {
                        room_id,
                        member_ids: room.members().collect(),
                    },
                ),
                _ => tracing::debug!(%client_id, %room_id, "member list request ignored"),
            }
        }

        Message::ResourceCreate { data } => {
            let resource_id = match state.resources.create(&data).await {
                Ok(resource_id) => Some(resource_id),
                Err(e) => {
                    tracing::warn!(%client_id, error = %e, "failed to store resource");
                    None
                }
            };
            reply(outbound, Message::AcknowledgeResource { resource_id });
        }

        Message::ResourceFetch { resource_id } => {
            let data = match state.resources.fetch(resource_id).await {
                Ok(data) => data,
                Err(ResourceError::NotFound(_)) => {
                    tracing::debug!(%client_id, %resource_id, "resource not found");
                    Vec::new()
                }
                Err(e) => {
                    tracing::warn!(%client_id, %resource_id, error = %e, "failed to read resource");
                    Vec::new()
                }
            };
            reply(outbound, Message::ResourceTransfer { data });
        }

        Message::Nickname { .. } => {
            tracing::debug!(%client_id, "already registered, NICKNAME ignored");
        }

        // Server-to-client kinds have no meaning when a client sends them.
        Message::AcknowledgeClient { .. }
        | Message::ClientDiscovery { .. }
        | Message::RoomDiscovery { .. }
        | Message::AcknowledgeRoomCreate { .. }
        | Message::AcknowledgeUserChat { .. }
        | Message::RoomMessageBroadcast { .. }
        | Message::AcknowledgeResource { .. }
        | Message::ResourceTransfer { .. }
        | Message::RoomMembershipDiscovery { .. } => {
            tracing::debug!(%client_id, %kind, "ignoring unsupported message");
        }
    }
}

/// Describes a room the way ROOM_DISCOVERY does. A host that has since
/// disconnected is reported with an empty name.
fn room_discovery(clients: &ClientRegistry, room: &Room) -> Message {
    Message::RoomDiscovery {
        room_id: room.room_id(),
        title: room.title().to_string(),
        host_id: room.host(),
        host_name: room
            .host()
            .and_then(|host| clients.nickname(host))
            .unwrap_or_default()
            .to_string(),
    }
}

fn reply(outbound: &ClientSender, message: Message) {
    // A closed channel means the writer is gone; the read side will notice.
    let _ = outbound.send(message);
}
