//! Frame codec: turns [`Message`]s into length-prefixed frames and back.
//!
//! Every frame starts with an 8-byte big-endian header:
//!
//! ```text
//!  63                                               8 7        0
//! ┌──────────────────────────────────────────────────┬──────────┐
//! │              payload length (56 bits)            │ type tag │
//! └──────────────────────────────────────────────────┴──────────┘
//! ```
//!
//! followed by exactly `length` payload bytes (nothing at all when the
//! length is zero). The pure functions here ([`encode`], [`decode`],
//! [`encode_header`], [`decode_header`]) work on byte slices; the
//! [`FrameReader`] and [`FrameWriter`] wrappers drive them over any tokio
//! byte stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Message, MessageType, ProtocolError};

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Largest length the 56-bit header field can carry.
pub const MAX_PAYLOAD_LEN: u64 = (1 << 56) - 1;

/// Upper bound on a single read from the stream while filling a payload.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Packs a payload length and type tag into a header.
///
/// # Errors
/// [`ProtocolError::PayloadTooLarge`] if `len` does not fit in 56 bits.
pub fn encode_header(
    len: u64,
    kind: MessageType,
) -> Result<[u8; HEADER_SIZE], ProtocolError> {
    if len > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(((len << 8) | u64::from(kind.tag())).to_be_bytes())
}

/// Splits a header into the raw payload length and type tag.
///
/// Never fails; the tag is not validated.
pub fn split_header(header: [u8; HEADER_SIZE]) -> (u64, u8) {
    let raw = u64::from_be_bytes(header);
    (raw >> 8, (raw & 0xff) as u8)
}

/// Unpacks a header into `(payload_length, message_type)`.
///
/// # Errors
/// [`ProtocolError::UnknownMessageType`] for a tag outside the defined set.
pub fn decode_header(
    header: [u8; HEADER_SIZE],
) -> Result<(u64, MessageType), ProtocolError> {
    let (len, tag) = split_header(header);
    Ok((len, MessageType::try_from(tag)?))
}

/// Encodes a message as one complete frame (header plus payload).
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let payload = message.encode_payload()?;
    let header = encode_header(payload.len() as u64, message.message_type())?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes one complete frame from the front of `bytes`.
///
/// Trailing bytes after the frame are ignored.
///
/// # Errors
/// [`ProtocolError::Truncated`] if `bytes` ends before the frame does;
/// otherwise whatever header or payload decoding reports.
pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
    let header: [u8; HEADER_SIZE] = bytes
        .get(..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or(ProtocolError::Truncated)?;
    let (len, kind) = decode_header(header)?;

    let end = usize::try_from(len)
        .ok()
        .and_then(|len| HEADER_SIZE.checked_add(len))
        .ok_or(ProtocolError::Truncated)?;
    let payload = bytes.get(HEADER_SIZE..end).ok_or(ProtocolError::Truncated)?;

    Message::decode_payload(kind, payload)
}

// ---------------------------------------------------------------------------
// FrameReader
// ---------------------------------------------------------------------------

/// Reads whole messages from a byte stream.
///
/// Transport reads may return any number of bytes, so both the header and
/// the payload are accumulated in a loop until complete.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    max_payload_len: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a stream, accepting payloads up to [`MAX_PAYLOAD_LEN`].
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_payload_len: MAX_PAYLOAD_LEN,
        }
    }

    /// Lowers the largest payload this reader will allocate for.
    pub fn with_max_payload_len(mut self, max: u64) -> Self {
        self.max_payload_len = max.min(MAX_PAYLOAD_LEN);
        self
    }

    /// Reads the next message.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly, i.e.
    /// before sending any byte of a new header.
    ///
    /// # Errors
    /// - [`ProtocolError::Truncated`] if the stream ends mid-frame.
    /// - [`ProtocolError::UnknownMessageType`] for an undefined tag. The
    ///   payload has been consumed, so reading may continue.
    /// - Any payload decoding error, or [`ProtocolError::Io`].
    pub async fn read_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        let Some(header) = self.read_header().await? else {
            return Ok(None);
        };
        let (len, tag) = split_header(header);

        if len > self.max_payload_len {
            return Err(ProtocolError::PayloadTooLarge {
                len,
                max: self.max_payload_len,
            });
        }

        let payload = self.read_payload(len).await?;
        let kind = MessageType::try_from(tag)?;
        Message::decode_payload(kind, &payload).map(Some)
    }

    /// Consumes the reader, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    async fn read_header(
        &mut self,
    ) -> Result<Option<[u8; HEADER_SIZE]>, ProtocolError> {
        let mut header = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            let n = self.inner.read(&mut header[filled..]).await?;
            if n == 0 {
                return if filled == 0 {
                    Ok(None)
                } else {
                    Err(ProtocolError::Truncated)
                };
            }
            filled += n;
        }
        Ok(Some(header))
    }

    async fn read_payload(&mut self, len: u64) -> Result<Vec<u8>, ProtocolError> {
        let len = usize::try_from(len).map_err(|_| ProtocolError::PayloadTooLarge {
            len,
            max: usize::MAX as u64,
        })?;

        // Grow with the data rather than trusting the header up front.
        let mut payload = Vec::with_capacity(len.min(READ_CHUNK_SIZE));
        while payload.len() < len {
            let start = payload.len();
            let want = (len - start).min(READ_CHUNK_SIZE);
            payload.resize(start + want, 0);

            let n = self.inner.read(&mut payload[start..]).await?;
            if n == 0 {
                return Err(ProtocolError::Truncated);
            }
            payload.truncate(start + n);
        }
        Ok(payload)
    }
}

// ---------------------------------------------------------------------------
// FrameWriter
// ---------------------------------------------------------------------------

/// Writes whole messages to a byte stream.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wraps a stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Encodes and writes one message, then flushes.
    pub async fn write_message(&mut self, message: &Message) -> Result<(), ProtocolError> {
        let frame = encode(message)?;
        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shuts down the write direction of the stream.
    pub async fn shutdown(&mut self) -> Result<(), ProtocolError> {
        self.inner.shutdown().await?;
        Ok(())
    }

    /// Consumes the writer, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientId, RoomId};

    #[test]
    fn test_header_layout_is_length_then_tag() {
        let header = encode_header(0x0102, MessageType::ListRooms).unwrap();
        assert_eq!(header, [0, 0, 0, 0, 0, 0x01, 0x02, 5]);
    }

    #[test]
    fn test_header_round_trip_boundary_lengths() {
        for len in [0, 1, 4080, MAX_PAYLOAD_LEN] {
            for kind in MessageType::ALL {
                let header = encode_header(len, kind).unwrap();
                assert_eq!(decode_header(header).unwrap(), (len, kind));
            }
        }
    }

    #[test]
    fn test_header_rejects_oversized_length() {
        let err = encode_header(MAX_PAYLOAD_LEN + 1, MessageType::Nickname)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_decode_header_unknown_tag() {
        let header = ((3u64 << 8) | 200).to_be_bytes();
        assert!(matches!(
            decode_header(header),
            Err(ProtocolError::UnknownMessageType(200))
        ));
    }

    #[test]
    fn test_argumentless_message_is_bare_header() {
        let frame = encode(&Message::ListClients).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE);
        assert_eq!(decode(&frame).unwrap(), Message::ListClients);
    }

    #[test]
    fn test_decode_short_buffer_is_truncated() {
        let frame = encode(&Message::ClientDiscovery {
            client_id: ClientId(1),
            nickname: "Bob".into(),
        })
        .unwrap();
        assert!(matches!(
            decode(&frame[..frame.len() - 1]),
            Err(ProtocolError::Truncated)
        ));
        assert!(matches!(decode(&frame[..3]), Err(ProtocolError::Truncated)));
    }

    #[tokio::test]
    async fn test_reader_clean_close_yields_none() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let mut reader = FrameReader::new(server);
        assert!(reader.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reader_partial_header_is_truncated() {
        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(&[0, 0, 0]).await.unwrap();
        drop(client);
        let mut reader = FrameReader::new(server);
        assert!(matches!(
            reader.read_message().await,
            Err(ProtocolError::Truncated)
        ));
    }

    #[tokio::test]
    async fn test_reader_partial_payload_is_truncated() {
        let (mut client, server) = tokio::io::duplex(64);
        let header = encode_header(10, MessageType::Nickname).unwrap();
        client.write_all(&header).await.unwrap();
        client.write_all(b"abc").await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        let err = reader.read_message().await.unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated));
        assert_eq!(err.to_string(), "truncated message");
    }

    #[tokio::test]
    async fn test_reader_reassembles_payload_larger_than_chunk() {
        // A small duplex buffer forces many short reads on the other side.
        let (client, server) = tokio::io::duplex(512);
        let data: Vec<u8> = (0..READ_CHUNK_SIZE * 3 + 17)
            .map(|i| (i % 251) as u8)
            .collect();
        let msg = Message::ResourceCreate { data };

        let expected = msg.clone();
        let writer = tokio::spawn(async move {
            let mut w = FrameWriter::new(client);
            w.write_message(&msg).await.unwrap();
        });

        let mut reader = FrameReader::new(server);
        let got = reader.read_message().await.unwrap().unwrap();
        writer.await.unwrap();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn test_reader_skips_unknown_tag_and_stays_in_sync() {
        let (mut client, server) = tokio::io::duplex(256);
        let bogus = ((4u64 << 8) | 99).to_be_bytes();
        client.write_all(&bogus).await.unwrap();
        client.write_all(b"junk").await.unwrap();
        client
            .write_all(&encode(&Message::AcknowledgeRoomCreate { room_id: RoomId(5) }).unwrap())
            .await
            .unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        assert!(matches!(
            reader.read_message().await,
            Err(ProtocolError::UnknownMessageType(99))
        ));
        assert_eq!(
            reader.read_message().await.unwrap(),
            Some(Message::AcknowledgeRoomCreate { room_id: RoomId(5) })
        );
        assert!(reader.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reader_enforces_payload_limit() {
        let (mut client, server) = tokio::io::duplex(64);
        let header = encode_header(1024, MessageType::ResourceCreate).unwrap();
        client.write_all(&header).await.unwrap();

        let mut reader = FrameReader::new(server).with_max_payload_len(100);
        assert!(matches!(
            reader.read_message().await,
            Err(ProtocolError::PayloadTooLarge { len: 1024, max: 100 })
        ));
    }
}
