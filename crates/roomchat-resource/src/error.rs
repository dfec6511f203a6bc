//! Error types for the resource store.

use roomchat_protocol::ResourceId;

/// Errors that can occur while storing or fetching blobs.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// No blob is stored under this id.
    #[error("resource {0} not found")]
    NotFound(ResourceId),

    /// The backing directory could not be read or written.
    #[error("resource storage error: {0}")]
    Io(#[from] std::io::Error),
}
