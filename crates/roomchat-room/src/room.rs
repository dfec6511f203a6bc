//! Room and history entry types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use roomchat_protocol::{ClientId, ResourceId, RoomId};

/// One posted message in a room's history. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEntry {
    /// Who posted it.
    pub author: ClientId,
    /// Message text.
    pub text: String,
    /// Client-supplied send time.
    pub timestamp: DateTime<Utc>,
    /// Attached resource, if any.
    pub resource_id: Option<ResourceId>,
}

/// A chat room: either a hosted group room or a host-less direct chat.
///
/// Invariants:
/// - If `host` is `Some`, the host is in `members`.
/// - A direct chat (`host == None`) has exactly two members, fixed at
///   creation.
/// - `members` only grows; there is no leave or kick.
#[derive(Debug, Clone)]
pub struct Room {
    room_id: RoomId,
    title: String,
    host: Option<ClientId>,
    members: BTreeSet<ClientId>,
    history: Vec<RoomEntry>,
}

impl Room {
    pub(crate) fn hosted(room_id: RoomId, title: String, host: ClientId) -> Self {
        Self {
            room_id,
            title,
            host: Some(host),
            members: BTreeSet::from([host]),
            history: Vec::new(),
        }
    }

    pub(crate) fn direct(room_id: RoomId, title: String, a: ClientId, b: ClientId) -> Self {
        Self {
            room_id,
            title,
            host: None,
            members: BTreeSet::from([a, b]),
            history: Vec::new(),
        }
    }

    /// The room's unique ID.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Display title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The host, or `None` for a direct chat.
    pub fn host(&self) -> Option<ClientId> {
        self.host
    }

    /// Returns `true` for a host-less two-person room.
    pub fn is_direct(&self) -> bool {
        self.host.is_none()
    }

    /// Returns `true` if `client` may read and post in this room.
    pub fn is_member(&self, client: ClientId) -> bool {
        self.members.contains(&client)
    }

    /// Returns `true` if `client` hosts this room.
    pub fn is_host(&self, client: ClientId) -> bool {
        self.host == Some(client)
    }

    /// Members in id order.
    pub fn members(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.members.iter().copied()
    }

    /// Number of members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Posted messages, oldest first.
    pub fn history(&self) -> &[RoomEntry] {
        &self.history
    }

    /// Adds a member. Returns `false` if already present.
    pub(crate) fn add_member(&mut self, client: ClientId) -> bool {
        self.members.insert(client)
    }

    pub(crate) fn push(&mut self, entry: RoomEntry) {
        self.history.push(entry);
    }
}
