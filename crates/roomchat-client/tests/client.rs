//! Client adapter tests against an in-memory fake server.

use std::time::Duration;

use chrono::Utc;
use roomchat_client::{ChatClient, ClientError, Dispatcher};
use roomchat_protocol::{ClientId, FrameReader, FrameWriter, Message, RoomId};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

type ServerReader = FrameReader<ReadHalf<DuplexStream>>;
type ServerWriter = FrameWriter<WriteHalf<DuplexStream>>;

/// Creates a connected pair and returns the server side as framed halves.
fn pipe() -> (DuplexStream, ServerReader, ServerWriter) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (r, w) = tokio::io::split(server);
    (client, FrameReader::new(r), FrameWriter::new(w))
}

/// Runs the server side of a handshake that accepts with `id`.
async fn accept(reader: &mut ServerReader, writer: &mut ServerWriter, id: u64) -> String {
    let Some(Message::Nickname { nickname }) = reader.read_message().await.unwrap() else {
        panic!("expected NICKNAME first");
    };
    writer
        .write_message(&Message::AcknowledgeClient {
            client_id: Some(ClientId(id)),
        })
        .await
        .unwrap();
    nickname
}

async fn handshake_with_id(id: u64) -> (ChatClient<DuplexStream>, ServerReader, ServerWriter) {
    let (stream, mut reader, mut writer) = pipe();
    let server = tokio::spawn(async move {
        accept(&mut reader, &mut writer, id).await;
        (reader, writer)
    });
    let client = ChatClient::handshake(stream, "alice").await.unwrap();
    let (reader, writer) = server.await.unwrap();
    (client, reader, writer)
}

/// Polls until a message arrives or a second passes.
async fn poll_until_message(client: &mut ChatClient<DuplexStream>) -> Message {
    for _ in 0..100 {
        if let Some(message) = client.poll().unwrap() {
            return message;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no message within timeout");
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_handshake_success_records_identity() {
    let (client, _reader, _writer) = handshake_with_id(7).await;

    assert_eq!(client.identity().client_id, ClientId(7));
    assert_eq!(client.identity().nickname, "alice");
}

#[tokio::test]
async fn test_handshake_sentinel_reply_is_nickname_taken() {
    let (stream, mut reader, mut writer) = pipe();
    tokio::spawn(async move {
        reader.read_message().await.unwrap();
        writer
            .write_message(&Message::AcknowledgeClient { client_id: None })
            .await
            .unwrap();
        // Keep the stream open like the real server does.
        tokio::time::sleep(Duration::from_secs(1)).await;
    });

    let result = ChatClient::handshake(stream, "bob").await;

    assert!(matches!(result, Err(ClientError::NicknameTaken(ref n)) if n == "bob"));
}

#[tokio::test]
async fn test_handshake_unexpected_reply_is_rejected() {
    let (stream, mut reader, mut writer) = pipe();
    tokio::spawn(async move {
        reader.read_message().await.unwrap();
        writer.write_message(&Message::ListRooms).await.unwrap();
    });

    let result = ChatClient::handshake(stream, "bob").await;

    assert!(matches!(
        result,
        Err(ClientError::UnexpectedReply(roomchat_protocol::MessageType::ListRooms))
    ));
}

#[tokio::test]
async fn test_handshake_server_hangup_is_connection_closed() {
    let (stream, mut reader, writer) = pipe();
    tokio::spawn(async move {
        reader.read_message().await.unwrap();
        drop(writer);
        drop(reader);
    });

    let result = ChatClient::handshake(stream, "bob").await;

    assert!(matches!(result, Err(ClientError::ConnectionClosed)));
}

// =========================================================================
// poll / enqueue / flush
// =========================================================================

#[tokio::test]
async fn test_poll_is_empty_until_server_sends() {
    let (mut client, _reader, mut writer) = handshake_with_id(0).await;
    assert_eq!(client.poll().unwrap(), None);

    let notice = Message::ClientDiscovery {
        client_id: ClientId(1),
        nickname: "bob".into(),
    };
    writer.write_message(&notice).await.unwrap();

    assert_eq!(poll_until_message(&mut client).await, notice);
    assert_eq!(client.poll().unwrap(), None);
}

#[tokio::test]
async fn test_poll_reports_closed_after_draining() {
    let (mut client, reader, mut writer) = handshake_with_id(0).await;
    writer.write_message(&Message::ListRooms).await.unwrap();
    drop(writer);
    drop(reader);

    assert_eq!(poll_until_message(&mut client).await, Message::ListRooms);

    let mut closed = false;
    for _ in 0..100 {
        match client.poll() {
            Err(ClientError::ConnectionClosed) => {
                closed = true;
                break;
            }
            Ok(None) => tokio::time::sleep(Duration::from_millis(10)).await,
            other => panic!("unexpected poll result: {other:?}"),
        }
    }
    assert!(closed);
}

#[tokio::test]
async fn test_flush_sends_queue_in_order() {
    let (mut client, mut reader, _writer) = handshake_with_id(0).await;
    let queue = client.sender();

    client.enqueue(Message::ListClients);
    queue.send(Message::ListRooms).unwrap();
    assert_eq!(client.flush().await.unwrap(), 2);
    assert_eq!(client.flush().await.unwrap(), 0);

    assert_eq!(reader.read_message().await.unwrap(), Some(Message::ListClients));
    assert_eq!(reader.read_message().await.unwrap(), Some(Message::ListRooms));
}

#[tokio::test]
async fn test_close_flushes_and_ends_stream() {
    let (client, mut reader, _writer) = handshake_with_id(0).await;
    client.enqueue(Message::ListRooms);

    client.close().await.unwrap();

    assert_eq!(reader.read_message().await.unwrap(), Some(Message::ListRooms));
    assert_eq!(reader.read_message().await.unwrap(), None);
}

// =========================================================================
// Background worker
// =========================================================================

#[tokio::test]
async fn test_spawn_dispatches_inbound_and_sends_outbound() {
    let (client, mut reader, mut writer) = handshake_with_id(3).await;
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

    let handle = client.spawn(move |message: Message| {
        let _ = seen_tx.send(message);
    });
    assert_eq!(handle.identity().client_id, ClientId(3));

    let broadcast = Message::RoomMessageBroadcast {
        room_id: RoomId(0),
        text: "hi".into(),
        timestamp: Utc::now(),
        user_id: ClientId(1),
        resource_id: None,
    };
    writer.write_message(&broadcast).await.unwrap();
    assert_eq!(seen_rx.recv().await, Some(broadcast));

    handle.enqueue(Message::ListRooms).unwrap();
    assert_eq!(reader.read_message().await.unwrap(), Some(Message::ListRooms));

    handle.stop().await;
    assert_eq!(reader.read_message().await.unwrap(), None);
}

struct Recorder {
    errors: mpsc::UnboundedSender<String>,
}

impl Dispatcher for Recorder {
    fn dispatch(&mut self, _message: Message) {}

    fn on_error(&mut self, error: ClientError) {
        let _ = self.errors.send(error.to_string());
    }
}

#[tokio::test]
async fn test_spawn_reports_server_hangup_through_on_error() {
    let (client, reader, writer) = handshake_with_id(0).await;
    let (errors, mut errors_rx) = mpsc::unbounded_channel();
    let handle = client.spawn(Recorder { errors });

    drop(writer);
    drop(reader);

    assert_eq!(errors_rx.recv().await.as_deref(), Some("connection closed"));
    for _ in 0..100 {
        if handle.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(handle.is_finished());
    assert!(matches!(
        handle.enqueue(Message::ListRooms),
        Err(ClientError::ConnectionClosed)
    ));
}
