//! Room lifecycle and membership for roomchat.
//!
//! A room is either a hosted group room (created by ROOM_CREATE, grown by
//! host invites) or a host-less direct chat between exactly two clients
//! (created lazily by INITIATE_USER_CHAT, at most once per pair).
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms, authorizes invites and posts
//! - [`Room`]: membership set and history
//! - [`RoomEntry`]: one posted message
//! - [`Delivery`]: a posted entry plus who must receive it

mod error;
mod manager;
mod room;

pub use error::RoomError;
pub use manager::{Delivery, RoomRegistry};
pub use room::{Room, RoomEntry};
