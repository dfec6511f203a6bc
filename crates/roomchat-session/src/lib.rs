//! Client session management for roomchat.
//!
//! This crate knows who is connected:
//!
//! 1. **Identity**: what the server records about a client after the
//!    nickname handshake ([`ClientIdentity`]).
//! 2. **Registry**: every live client, its outbound channel, and the
//!    nickname-uniqueness rule ([`ClientRegistry`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (beside)  ← asks the registry which members are reachable
//!     ↕
//! Session Layer (this crate)  ← client identity and outbound channels
//!     ↕
//! Protocol Layer (below)  ← provides ClientId, Message
//! ```

mod error;
mod identity;
mod registry;

pub use error::SessionError;
pub use identity::{ClientIdentity, ClientSender};
pub use registry::{ClientRegistry, Registration};
