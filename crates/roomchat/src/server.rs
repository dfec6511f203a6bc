//! `ChatServer` configuration, builder, and accept loop.
//!
//! This is the entry point for running a roomchat server. It ties
//! together all the layers: transport → protocol → session / rooms /
//! resources.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use roomchat_resource::ResourceStore;
use roomchat_room::RoomRegistry;
use roomchat_session::ClientRegistry;
use roomchat_transport::{TcpTransport, Transport};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::ChatError;
use crate::handler::handle_connection;

/// Port the server listens on when none is configured.
pub const DEFAULT_PORT: u16 = 12000;

/// Server settings.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// wants to change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,
    /// Directory uploaded resources are written to.
    pub resource_root: PathBuf,
    /// File extension for stored resources.
    pub resource_extension: String,
    /// Largest frame payload accepted from a client.
    pub max_payload_len: u64,
    /// Seconds a new connection has to send NICKNAME. `0` waits forever.
    pub handshake_timeout_secs: u64,
}

impl ServerConfig {
    /// The handshake deadline, or `None` if disabled.
    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_secs > 0).then(|| Duration::from_secs(self.handshake_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{DEFAULT_PORT}"),
            resource_root: PathBuf::from("res"),
            resource_extension: "bin".to_string(),
            max_payload_len: 16 * 1024 * 1024,
            handshake_timeout_secs: 30,
        }
    }
}

/// Everything guarded by the single chat lock.
///
/// Client registration, room mutation, and fan-out target lookup all go
/// through this one mutex, so a broadcast never sees a room mid-change.
#[derive(Debug, Default)]
pub(crate) struct ChatState {
    pub(crate) clients: ClientRegistry,
    pub(crate) rooms: RoomRegistry,
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The resource
/// store sits outside the lock; it allocates ids atomically on its own.
#[derive(Debug)]
pub(crate) struct ServerState {
    pub(crate) chat: Mutex<ChatState>,
    pub(crate) resources: ResourceStore,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a chat server.
///
/// # Example
///
/// ```rust,no_run
/// use roomchat::prelude::*;
///
/// # async fn start() -> Result<(), ChatError> {
/// let server = ChatServer::builder()
///     .bind("0.0.0.0:12000")
///     .resource_root("/var/lib/roomchat")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChatServerBuilder {
    config: ServerConfig,
}

impl ChatServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a loaded configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the directory resources are stored in.
    pub fn resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.resource_root = root.into();
        self
    }

    /// Sets the file extension for stored resources.
    pub fn resource_extension(mut self, extension: &str) -> Self {
        self.config.resource_extension = extension.to_string();
        self
    }

    /// Sets the largest payload accepted from a client.
    pub fn max_payload_len(mut self, max: u64) -> Self {
        self.config.max_payload_len = max;
        self
    }

    /// Sets how long a connection may take to send NICKNAME.
    /// `Duration::ZERO` disables the deadline.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout_secs = timeout.as_secs();
        self
    }

    /// Binds a TCP listener and opens the resource store.
    pub async fn build(self) -> Result<ChatServer<TcpTransport>, ChatError> {
        let transport = TcpTransport::bind(&self.config.bind_addr).await?;
        self.build_with(transport).await
    }

    /// Builds a server on top of an already-bound transport.
    pub async fn build_with<T: Transport>(self, transport: T) -> Result<ChatServer<T>, ChatError> {
        let resources = ResourceStore::open(
            &self.config.resource_root,
            &self.config.resource_extension,
        )
        .await?;

        let state = Arc::new(ServerState {
            chat: Mutex::new(ChatState::default()),
            resources,
            config: self.config,
        });

        Ok(ChatServer { transport, state })
    }
}

/// A chat server bound to a transport.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ChatServer<T: Transport> {
    transport: T,
    state: Arc<ServerState>,
}

impl ChatServer<TcpTransport> {
    /// Creates a new builder.
    pub fn builder() -> ChatServerBuilder {
        ChatServerBuilder::new()
    }
}

impl<T: Transport> ChatServer<T> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle for inspecting the server while it runs.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// task is cancelled or the process exits.
    pub async fn run(mut self) -> Result<(), ChatError> {
        tracing::info!(
            addr = ?self.transport.local_addr().ok(),
            resources = %self.state.resources.root().display(),
            "chat server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let conn_id = conn.id();
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                %conn_id,
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Read-only view of a running server.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    state: Arc<ServerState>,
}

impl ServerHandle {
    /// Number of registered clients.
    pub async fn client_count(&self) -> usize {
        self.state.chat.lock().await.clients.len()
    }

    /// Number of rooms, direct chats included.
    pub async fn room_count(&self) -> usize {
        self.state.chat.lock().await.rooms.len()
    }

    /// Nicknames of registered clients in id order.
    pub async fn nicknames(&self) -> Vec<String> {
        let chat = self.state.chat.lock().await;
        chat.clients
            .identities()
            .map(|identity| identity.nickname.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:12000");
        assert_eq!(config.resource_root, PathBuf::from("res"));
        assert_eq!(config.handshake_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_handshake_timeout_disables_deadline() {
        let config = ServerConfig {
            handshake_timeout_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.handshake_timeout(), None);
    }

    #[test]
    fn test_builder_overrides_config() {
        let builder = ChatServerBuilder::new()
            .bind("0.0.0.0:9000")
            .resource_extension("dat")
            .max_payload_len(1024)
            .handshake_timeout(Duration::ZERO);
        assert_eq!(builder.config.bind_addr, "0.0.0.0:9000");
        assert_eq!(builder.config.resource_extension, "dat");
        assert_eq!(builder.config.max_payload_len, 1024);
        assert_eq!(builder.config.handshake_timeout(), None);
    }
}
