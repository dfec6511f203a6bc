//! Error types for the protocol layer.
//!
//! Each crate in roomchat defines its own error enum. A `ProtocolError`
//! means the bytes on the wire were wrong (bad frame, bad payload) or the
//! stream underneath failed mid-frame; it never describes chat-level
//! permission problems.

use crate::MessageType;

/// Errors that can occur while framing, encoding, or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The header carried a type tag outside the defined set.
    ///
    /// When produced by [`FrameReader`](crate::FrameReader) the payload has
    /// already been consumed, so the stream is still in sync and the caller
    /// may keep reading.
    #[error("unknown message type tag {0}")]
    UnknownMessageType(u8),

    /// The peer closed the stream in the middle of a frame.
    #[error("truncated message")]
    Truncated,

    /// A payload length exceeds what this side accepts (or the 56-bit
    /// length field can represent).
    #[error("payload of {len} bytes exceeds limit of {max}")]
    PayloadTooLarge { len: u64, max: u64 },

    /// The payload split into the wrong number of fields.
    #[error("{kind} expects {expected} fields, found {found}")]
    FieldCount {
        kind: MessageType,
        expected: usize,
        found: usize,
    },

    /// An integer field did not parse.
    #[error("{kind}: invalid integer {value:?}")]
    InvalidInteger { kind: MessageType, value: String },

    /// A timestamp field did not parse as RFC 3339.
    #[error("{kind}: invalid timestamp {value:?}")]
    InvalidTimestamp { kind: MessageType, value: String },

    /// A text payload was not valid UTF-8.
    #[error("{0}: payload is not valid UTF-8")]
    InvalidUtf8(MessageType),

    /// A text field contains the field separator and cannot be encoded.
    #[error("{0}: field contains the reserved separator character")]
    SeparatorInField(MessageType),

    /// The message is well-formed but violates a protocol rule
    /// (e.g. the first message on a connection is not NICKNAME).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
