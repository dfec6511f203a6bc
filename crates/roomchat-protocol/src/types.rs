//! Core protocol types for roomchat's wire format.
//!
//! This module defines every type that travels "on the wire": the id
//! newtypes, the closed [`MessageType`] tag set, and the [`Message`] sum
//! type carrying each tag's typed payload.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A server-assigned identifier for a connected client.
///
/// Newtype wrapper so a `RoomId` can never be passed where a `ClientId`
/// is expected, even though both are `u64` underneath. The wire format
/// reserves `-1` as "invalid identity"; in Rust that case is modelled as
/// `Option<ClientId>` rather than a magic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A unique identifier for a room (group room or direct chat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// Identifier of a stored binary resource (an uploaded image or file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MessageType: the one-byte tag in every frame header
// ---------------------------------------------------------------------------

/// The closed set of message kinds. The discriminant is the wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Nickname = 1,
    AcknowledgeClient = 2,
    ListClients = 3,
    ClientDiscovery = 4,
    ListRooms = 5,
    RoomDiscovery = 6,
    RoomCreate = 7,
    AcknowledgeRoomCreate = 8,
    RoomInvite = 9,
    InitiateUserChat = 10,
    AcknowledgeUserChat = 11,
    RoomMessageSend = 12,
    RoomMessageBroadcast = 13,
    ResourceCreate = 14,
    AcknowledgeResource = 15,
    ResourceFetch = 16,
    ResourceTransfer = 17,
    RoomMembershipDiscovery = 18,
    ListRoomMembers = 19,
}

impl MessageType {
    /// Every defined tag, in wire order.
    pub const ALL: [MessageType; 19] = [
        Self::Nickname,
        Self::AcknowledgeClient,
        Self::ListClients,
        Self::ClientDiscovery,
        Self::ListRooms,
        Self::RoomDiscovery,
        Self::RoomCreate,
        Self::AcknowledgeRoomCreate,
        Self::RoomInvite,
        Self::InitiateUserChat,
        Self::AcknowledgeUserChat,
        Self::RoomMessageSend,
        Self::RoomMessageBroadcast,
        Self::ResourceCreate,
        Self::AcknowledgeResource,
        Self::ResourceFetch,
        Self::ResourceTransfer,
        Self::RoomMembershipDiscovery,
        Self::ListRoomMembers,
    ];

    /// Returns the one-byte wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// The protocol name of this kind, used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Nickname => "NICKNAME",
            Self::AcknowledgeClient => "ACKNOWLEDGE_CLIENT",
            Self::ListClients => "LIST_CLIENTS",
            Self::ClientDiscovery => "CLIENT_DISCOVERY",
            Self::ListRooms => "LIST_ROOMS",
            Self::RoomDiscovery => "ROOM_DISCOVERY",
            Self::RoomCreate => "ROOM_CREATE",
            Self::AcknowledgeRoomCreate => "ACKNOWLEDGE_ROOM_CREATE",
            Self::RoomInvite => "ROOM_INVITE",
            Self::InitiateUserChat => "INITIATE_USER_CHAT",
            Self::AcknowledgeUserChat => "ACKNOWLEDGE_USER_CHAT",
            Self::RoomMessageSend => "ROOM_MESSAGE_SEND",
            Self::RoomMessageBroadcast => "ROOM_MESSAGE_BROADCAST",
            Self::ResourceCreate => "RESOURCE_CREATE",
            Self::AcknowledgeResource => "ACKNOWLEDGE_RESOURCE",
            Self::ResourceFetch => "RESOURCE_FETCH",
            Self::ResourceTransfer => "RESOURCE_TRANSFER",
            Self::RoomMembershipDiscovery => "ROOM_MEMBERSHIP_DISCOVERY",
            Self::ListRoomMembers => "LIST_ROOM_MEMBERS",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        // Tags are dense from 1, so index straight into ALL.
        match tag {
            1..=19 => Ok(Self::ALL[usize::from(tag) - 1]),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Message: one variant per tag
// ---------------------------------------------------------------------------

/// A decoded protocol message.
///
/// This is a tagged union: matching on it is exhaustive, so adding a
/// message kind forces every dispatcher to handle it. Messages are plain
/// immutable values; they are built by a caller (outbound) or by the
/// codec (inbound) and dropped once sent or dispatched.
///
/// Fields that may carry the wire sentinel `-1` are `Option`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Client → Server: first message on every connection.
    Nickname { nickname: String },

    /// Server → Client: the assigned id, or `None` if the nickname is taken.
    AcknowledgeClient { client_id: Option<ClientId> },

    /// Client → Server: "who is online?"
    ListClients,

    /// Server → Client: one connected client.
    ClientDiscovery { client_id: ClientId, nickname: String },

    /// Client → Server: "which rooms can I see?"
    ListRooms,

    /// Server → Client: one room the recipient is a member of.
    RoomDiscovery {
        room_id: RoomId,
        title: String,
        host_id: Option<ClientId>,
        host_name: String,
    },

    /// Client → Server: create a room hosted by `host_id` (must be the sender).
    RoomCreate { host_id: ClientId, title: String },

    /// Server → Client: the room was created.
    AcknowledgeRoomCreate { room_id: RoomId },

    /// Client → Server: host invites `client_id` into `room_id`.
    RoomInvite { room_id: RoomId, client_id: ClientId },

    /// Client → Server: open (or reopen) a direct chat with `user_id`.
    InitiateUserChat { user_id: ClientId },

    /// Server → Client: the direct chat room with `user_id`.
    AcknowledgeUserChat {
        room_id: RoomId,
        user_id: ClientId,
        user_nick: String,
    },

    /// Client → Server: post into a room.
    RoomMessageSend {
        room_id: RoomId,
        text: String,
        timestamp: DateTime<Utc>,
        resource_id: Option<ResourceId>,
    },

    /// Server → Client: a post, fanned out to every room member.
    RoomMessageBroadcast {
        room_id: RoomId,
        text: String,
        timestamp: DateTime<Utc>,
        user_id: ClientId,
        resource_id: Option<ResourceId>,
    },

    /// Client → Server: upload a blob.
    ResourceCreate { data: Vec<u8> },

    /// Server → Client: id of the stored blob, `None` if storing failed.
    AcknowledgeResource { resource_id: Option<ResourceId> },

    /// Client → Server: download a blob.
    ResourceFetch { resource_id: ResourceId },

    /// Server → Client: blob contents. Empty when the id is unknown.
    ResourceTransfer { data: Vec<u8> },

    /// Server → Client: current membership of a room.
    RoomMembershipDiscovery {
        room_id: RoomId,
        member_ids: Vec<ClientId>,
    },

    /// Client → Server: "who is in this room?"
    ListRoomMembers { room_id: RoomId },
}

impl Message {
    /// Returns the wire tag for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Nickname { .. } => MessageType::Nickname,
            Self::AcknowledgeClient { .. } => MessageType::AcknowledgeClient,
            Self::ListClients => MessageType::ListClients,
            Self::ClientDiscovery { .. } => MessageType::ClientDiscovery,
            Self::ListRooms => MessageType::ListRooms,
            Self::RoomDiscovery { .. } => MessageType::RoomDiscovery,
            Self::RoomCreate { .. } => MessageType::RoomCreate,
            Self::AcknowledgeRoomCreate { .. } => {
                MessageType::AcknowledgeRoomCreate
            }
            Self::RoomInvite { .. } => MessageType::RoomInvite,
            Self::InitiateUserChat { .. } => MessageType::InitiateUserChat,
            Self::AcknowledgeUserChat { .. } => MessageType::AcknowledgeUserChat,
            Self::RoomMessageSend { .. } => MessageType::RoomMessageSend,
            Self::RoomMessageBroadcast { .. } => {
                MessageType::RoomMessageBroadcast
            }
            Self::ResourceCreate { .. } => MessageType::ResourceCreate,
            Self::AcknowledgeResource { .. } => MessageType::AcknowledgeResource,
            Self::ResourceFetch { .. } => MessageType::ResourceFetch,
            Self::ResourceTransfer { .. } => MessageType::ResourceTransfer,
            Self::RoomMembershipDiscovery { .. } => {
                MessageType::RoomMembershipDiscovery
            }
            Self::ListRoomMembers { .. } => MessageType::ListRoomMembers,
        }
    }
}
