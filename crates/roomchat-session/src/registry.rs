//! The client registry: every connected client and how to reach it.
//!
//! This is the connection registry the rest of the server consults to
//! resolve `ClientId → outbound channel` for replies and fan-out, and to
//! enforce nickname uniqueness during the handshake.
//!
//! # Concurrency note
//!
//! `ClientRegistry` is NOT thread-safe by itself; it uses plain maps. The
//! server keeps it inside its single shared-state mutex together with the
//! room registry, so every mutation and every fan-out lookup is serialized
//! by that one lock.

use std::collections::{BTreeMap, HashMap};

use roomchat_protocol::ClientId;
use roomchat_transport::ConnectionId;

use crate::{ClientIdentity, ClientSender, SessionError};

/// A registered client plus its outbound channel.
#[derive(Debug)]
struct Entry {
    identity: ClientIdentity,
    sender: ClientSender,
}

/// The outcome of a successful [`ClientRegistry::register`].
#[derive(Debug)]
pub struct Registration {
    /// The identity that was just inserted.
    pub identity: ClientIdentity,

    /// Senders of every client that was connected *before* this one.
    ///
    /// The new client is not in this list, so broadcasting its discovery
    /// notice to `peers` never echoes back to it.
    pub peers: Vec<ClientSender>,
}

/// Tracks all registered clients.
///
/// ## Lifecycle
///
/// ```text
/// NICKNAME ──→ register() ──→ [registered] ──→ remove() (on disconnect)
///                 │
///                 └─ DuplicateNickname ──→ nothing inserted
/// ```
#[derive(Debug, Default)]
pub struct ClientRegistry {
    /// Registered clients keyed by id. A `BTreeMap` so listings come out
    /// in id (= join) order.
    clients: BTreeMap<ClientId, Entry>,

    /// Index from nickname to owner, kept in sync with `clients`.
    nicknames: HashMap<String, ClientId>,

    /// Next id to hand out. Never reused, even after disconnects.
    next_id: u64,
}

impl ClientRegistry {
    /// Creates an empty registry. The first client gets id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client under `nickname`.
    ///
    /// Allocates the next id, captures the current peers, then inserts the
    /// new client, all in one step.
    ///
    /// # Errors
    /// [`SessionError::DuplicateNickname`] if a connected client already
    /// uses exactly this nickname. No id is consumed in that case.
    pub fn register(
        &mut self,
        nickname: &str,
        connection: ConnectionId,
        sender: ClientSender,
    ) -> Result<Registration, SessionError> {
        if self.nicknames.contains_key(nickname) {
            return Err(SessionError::DuplicateNickname(nickname.to_string()));
        }

        let client_id = ClientId(self.next_id);
        self.next_id += 1;

        let peers = self.clients.values().map(|e| e.sender.clone()).collect();

        let identity = ClientIdentity {
            client_id,
            nickname: nickname.to_string(),
            connection,
        };
        self.nicknames.insert(identity.nickname.clone(), client_id);
        self.clients.insert(
            client_id,
            Entry {
                identity: identity.clone(),
                sender,
            },
        );

        tracing::info!(%client_id, nickname, %connection, "client registered");
        Ok(Registration { identity, peers })
    }

    /// Removes a client, freeing its nickname.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the id is not registered.
    pub fn remove(&mut self, client_id: ClientId) -> Result<ClientIdentity, SessionError> {
        let entry = self
            .clients
            .remove(&client_id)
            .ok_or(SessionError::NotFound(client_id))?;
        self.nicknames.remove(&entry.identity.nickname);

        tracing::info!(%client_id, nickname = %entry.identity.nickname, "client removed");
        Ok(entry.identity)
    }

    /// Looks up a registered client.
    pub fn get(&self, client_id: ClientId) -> Option<&ClientIdentity> {
        self.clients.get(&client_id).map(|e| &e.identity)
    }

    /// Returns the nickname of a registered client.
    pub fn nickname(&self, client_id: ClientId) -> Option<&str> {
        self.get(client_id).map(|i| i.nickname.as_str())
    }

    /// Returns the outbound channel of a registered client.
    pub fn sender(&self, client_id: ClientId) -> Option<&ClientSender> {
        self.clients.get(&client_id).map(|e| &e.sender)
    }

    /// Resolves a set of ids to senders, skipping ids with no live client.
    pub fn senders_for<I>(&self, ids: I) -> Vec<ClientSender>
    where
        I: IntoIterator<Item = ClientId>,
    {
        ids.into_iter()
            .filter_map(|id| self.sender(id).cloned())
            .collect()
    }

    /// Iterates registered identities in id order.
    pub fn identities(&self) -> impl Iterator<Item = &ClientIdentity> {
        self.clients.values().map(|e| &e.identity)
    }

    /// Returns the number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no client is registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
