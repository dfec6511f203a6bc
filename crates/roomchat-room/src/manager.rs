//! Room registry: creates rooms, authorizes membership changes, records
//! history, and memoizes direct chats per client pair.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use roomchat_protocol::{ClientId, ResourceId, RoomId};

use crate::{Room, RoomEntry, RoomError};

/// Result of a successful [`RoomRegistry::post_message`].
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The entry as appended to history.
    pub entry: RoomEntry,
    /// Every member of the room at the time of posting, and no one else.
    pub recipients: Vec<ClientId>,
}

/// All rooms on the server.
///
/// Like the client registry this is a plain single-threaded structure; the
/// server serializes access through its shared-state lock, which is what
/// makes [`get_or_create_direct_chat`](Self::get_or_create_direct_chat)
/// exactly-once per client pair.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Every room ever created, in id order. Rooms are never destroyed.
    rooms: BTreeMap<RoomId, Room>,

    /// Direct chat per unordered client pair, keyed `(low, high)`.
    direct_chats: HashMap<(ClientId, ClientId), RoomId>,

    /// Shared by group rooms and direct chats.
    next_id: u64,
}

impl RoomRegistry {
    /// Creates an empty registry. The first room gets id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hosted room whose only member is its host.
    pub fn create_room(&mut self, title: &str, host: ClientId) -> &Room {
        let room_id = self.allocate();
        tracing::info!(%room_id, %host, title, "room created");
        self.rooms
            .entry(room_id)
            .or_insert_with(|| Room::hosted(room_id, title.to_string(), host))
    }

    /// Adds `client` to a hosted room on behalf of `requester`.
    ///
    /// Inviting an existing member is a no-op that still succeeds.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room does not exist.
    /// - [`RoomError::NotAuthorized`] if `requester` is not the host. Direct
    ///   chats have no host, so nobody can invite into them.
    pub fn invite(
        &mut self,
        room_id: RoomId,
        requester: ClientId,
        client: ClientId,
    ) -> Result<&Room, RoomError> {
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;

        if !room.is_host(requester) {
            return Err(RoomError::NotAuthorized(requester, room_id));
        }

        if room.add_member(client) {
            tracing::info!(%room_id, %client, "client invited");
        }
        Ok(room)
    }

    /// Returns the direct chat between `a` and `b`, creating it on first
    /// use. Argument order does not matter.
    ///
    /// # Errors
    /// [`RoomError::SelfChat`] if `a == b`.
    pub fn get_or_create_direct_chat(
        &mut self,
        a: ClientId,
        b: ClientId,
    ) -> Result<RoomId, RoomError> {
        if a == b {
            return Err(RoomError::SelfChat(a));
        }
        let key = if a < b { (a, b) } else { (b, a) };

        if let Some(&room_id) = self.direct_chats.get(&key) {
            return Ok(room_id);
        }

        let room_id = self.allocate();
        self.rooms
            .insert(room_id, Room::direct(room_id, String::new(), key.0, key.1));
        self.direct_chats.insert(key, room_id);

        tracing::info!(%room_id, low = %key.0, high = %key.1, "direct chat created");
        Ok(room_id)
    }

    /// Looks up an existing direct chat without creating one.
    pub fn direct_chat_between(&self, a: ClientId, b: ClientId) -> Option<RoomId> {
        let key = if a < b { (a, b) } else { (b, a) };
        self.direct_chats.get(&key).copied()
    }

    /// Appends a message to a room's history.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room does not exist.
    /// - [`RoomError::NotAuthorized`] if `author` is not a member.
    pub fn post_message(
        &mut self,
        room_id: RoomId,
        author: ClientId,
        text: String,
        timestamp: DateTime<Utc>,
        resource_id: Option<ResourceId>,
    ) -> Result<Delivery, RoomError> {
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;

        if !room.is_member(author) {
            return Err(RoomError::NotAuthorized(author, room_id));
        }

        let entry = RoomEntry {
            author,
            text,
            timestamp,
            resource_id,
        };
        room.push(entry.clone());

        Ok(Delivery {
            entry,
            recipients: room.members().collect(),
        })
    }

    /// Hosted rooms `client` belongs to, in id order. Direct chats are
    /// left out; they surface through the user-chat handshake instead.
    pub fn list_visible_rooms(&self, client: ClientId) -> impl Iterator<Item = &Room> {
        self.rooms
            .values()
            .filter(move |r| !r.is_direct() && r.is_member(client))
    }

    /// Looks up a room.
    pub fn get(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.get(&room_id)
    }

    /// Returns the number of rooms, direct chats included.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if no room exists.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn allocate(&mut self) -> RoomId {
        let id = RoomId(self.next_id);
        self.next_id += 1;
        id
    }
}
