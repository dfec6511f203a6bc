//! Binary resource storage for roomchat.
//!
//! Clients upload images and other attachments with `RESOURCE_CREATE` and
//! later reference them by [`ResourceId`](roomchat_protocol::ResourceId)
//! in room messages. This crate owns the on-disk side of that:
//! [`ResourceStore`] writes each blob to its own file and reads it back on
//! `RESOURCE_FETCH`.

mod error;
mod store;

pub use error::ResourceError;
pub use store::ResourceStore;
