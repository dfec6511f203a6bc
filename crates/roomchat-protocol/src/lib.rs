//! Wire protocol for roomchat.
//!
//! This crate defines the "language" that chat clients and the server
//! speak:
//!
//! - **Types** ([`Message`], [`MessageType`], [`ClientId`], [`RoomId`],
//!   [`ResourceId`]): the closed message taxonomy and its typed payloads.
//! - **Payload encoding** (`Message::encode_payload` / `decode_payload`):
//!   separator-joined text fields, decimal ids, RFC 3339 timestamps,
//!   raw blobs.
//! - **Codec** ([`encode`], [`decode`], [`FrameReader`], [`FrameWriter`]):
//!   the 8-byte length/type header and stream framing.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (client identity). It doesn't know about rooms or registries; it only
//! knows how to move messages across a byte stream.
//!
//! ```text
//! Transport (bytes) → Protocol (Message) → Session / Rooms
//! ```

mod codec;
mod error;
mod payload;
mod types;

pub use codec::{
    FrameReader, FrameWriter, HEADER_SIZE, MAX_PAYLOAD_LEN, READ_CHUNK_SIZE,
    decode, decode_header, encode, encode_header, split_header,
};
pub use error::ProtocolError;
pub use payload::{FIELD_SEPARATOR, format_timestamp};
pub use types::{ClientId, Message, MessageType, ResourceId, RoomId};
