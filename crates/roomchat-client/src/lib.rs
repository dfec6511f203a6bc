//! Client-side transport adapter for roomchat.
//!
//! The mirror image of the server's connection handler: performs the
//! nickname handshake, then bridges the socket to application code.
//!
//! ```text
//! application ──enqueue──→ outbound queue ──→ socket
//! application ←─dispatch── worker ←── inbound channel ←── reader task ←── socket
//! ```
//!
//! Two ways to drive it:
//!
//! - Manually: call [`ChatClient::poll`] and [`ChatClient::flush`] from
//!   your own loop.
//! - In the background: [`ChatClient::spawn`] hands the connection to a
//!   worker task that calls a [`Dispatcher`] for each inbound message and
//!   sends whatever is enqueued on the returned [`ClientHandle`].

mod client;
mod dispatch;
mod error;

pub use client::{ChatClient, ClientHandle, Identity, OutboundQueue};
pub use dispatch::Dispatcher;
pub use error::ClientError;
