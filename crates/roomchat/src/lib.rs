//! # roomchat
//!
//! A multi-room chat server with direct messages and file attachments.
//!
//! Clients connect over TCP, register a nickname, and then create rooms,
//! invite each other, open one-to-one chats, post messages, and upload or
//! download binary resources. Every message travels as a length-prefixed
//! frame (see [`roomchat_protocol`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomchat::prelude::*;
//!
//! # async fn start() -> Result<(), ChatError> {
//! let server = ChatServer::builder()
//!     .bind("127.0.0.1:12000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! On the client side, [`ChatClient`](roomchat_client::ChatClient) performs
//! the handshake and bridges the socket to a [`Dispatcher`](roomchat_client::Dispatcher).

mod error;
mod handler;
mod server;

pub use error::ChatError;
pub use server::{ChatServer, ChatServerBuilder, DEFAULT_PORT, ServerConfig, ServerHandle};

pub use roomchat_client as client;
pub use roomchat_protocol as protocol;
pub use roomchat_resource as resource;
pub use roomchat_room as room;
pub use roomchat_session as session;
pub use roomchat_transport as transport;

/// The types most applications need.
pub mod prelude {
    pub use crate::{ChatError, ChatServer, ChatServerBuilder, ServerConfig, ServerHandle};
    pub use roomchat_client::{ChatClient, ClientError, ClientHandle, Dispatcher, Identity};
    pub use roomchat_protocol::{ClientId, Message, MessageType, ResourceId, RoomId};
    pub use roomchat_transport::{TcpTransport, Transport};
}
