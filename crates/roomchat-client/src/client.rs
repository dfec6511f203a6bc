//! The client connection: handshake, inbound poll, outbound queue, and the
//! background worker that drives a [`Dispatcher`].

use roomchat_protocol::{ClientId, FrameReader, FrameWriter, Message, ProtocolError};
use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{ClientError, Dispatcher};

/// Producer side of a client's outbound queue. Clone it freely; every
/// message pushed here is written by whoever owns the connection.
pub type OutboundQueue = mpsc::UnboundedSender<Message>;

type Inbound = Result<Message, ProtocolError>;

/// Who the server says we are after a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub client_id: ClientId,
    pub nickname: String,
}

/// Aborts the socket reader task when the client goes away, which releases
/// the read half of the stream.
#[derive(Debug)]
struct ReaderTask(JoinHandle<()>);

impl Drop for ReaderTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A registered connection to a chat server.
///
/// A dedicated task reads frames off the socket into an inbound channel,
/// so [`poll`](Self::poll) never waits on the network. Outbound messages
/// go through a multi-producer queue and are only written by
/// [`flush`](Self::flush) or by the worker started with
/// [`spawn`](Self::spawn). Nothing else ever touches the socket.
#[derive(Debug)]
pub struct ChatClient<S> {
    identity: Identity,
    writer: FrameWriter<WriteHalf<S>>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    outbound_tx: OutboundQueue,
    outbound_rx: mpsc::UnboundedReceiver<Message>,
    _reader: ReaderTask,
}

impl ChatClient<TcpStream> {
    /// Connects over plain TCP and registers under `nickname`.
    ///
    /// # Errors
    /// [`ClientError::Transport`] if the server is unreachable, plus
    /// everything [`handshake`](Self::handshake) can return.
    pub async fn connect(address: &str, port: u16, nickname: &str) -> Result<Self, ClientError> {
        let stream = roomchat_transport::connect(address, port).await?;
        Self::handshake(stream, nickname).await
    }
}

impl<S> ChatClient<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Registers under `nickname` over an already-open stream, such as a
    /// TLS-wrapped socket.
    ///
    /// # Errors
    /// - [`ClientError::NicknameTaken`] if the server answered with the
    ///   invalid-id sentinel.
    /// - [`ClientError::UnexpectedReply`] if the first reply was not
    ///   `ACKNOWLEDGE_CLIENT`.
    /// - [`ClientError::ConnectionClosed`] if the server hung up first.
    pub async fn handshake(stream: S, nickname: &str) -> Result<Self, ClientError> {
        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = FrameReader::new(read_half);
        let mut writer = FrameWriter::new(write_half);

        writer
            .write_message(&Message::Nickname {
                nickname: nickname.to_string(),
            })
            .await?;

        let client_id = match reader.read_message().await? {
            Some(Message::AcknowledgeClient {
                client_id: Some(client_id),
            }) => client_id,
            Some(Message::AcknowledgeClient { client_id: None }) => {
                return Err(ClientError::NicknameTaken(nickname.to_string()));
            }
            Some(other) => return Err(ClientError::UnexpectedReply(other.message_type())),
            None => return Err(ClientError::ConnectionClosed),
        };
        tracing::info!(%client_id, nickname, "registered with server");

        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let reader = ReaderTask(tokio::spawn(read_loop(reader, inbound_tx)));

        Ok(Self {
            identity: Identity {
                client_id,
                nickname: nickname.to_string(),
            },
            writer,
            inbound,
            outbound_tx,
            outbound_rx,
            _reader: reader,
        })
    }

    /// Our server-assigned identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Queues a message for the next [`flush`](Self::flush).
    pub fn enqueue(&self, message: Message) {
        // The receiver lives in `self`, so this cannot fail.
        let _ = self.outbound_tx.send(message);
    }

    /// A producer handle onto the outbound queue.
    pub fn sender(&self) -> OutboundQueue {
        self.outbound_tx.clone()
    }

    /// Returns one inbound message if one has arrived. Never blocks.
    ///
    /// # Errors
    /// - [`ClientError::Protocol`] if the server sent a malformed frame.
    ///   The connection is unusable afterwards.
    /// - [`ClientError::ConnectionClosed`] once the server has closed the
    ///   stream and every earlier message has been returned.
    pub fn poll(&mut self) -> Result<Option<Message>, ClientError> {
        match self.inbound.try_recv() {
            Ok(Ok(message)) => Ok(Some(message)),
            Ok(Err(e)) => Err(e.into()),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ClientError::ConnectionClosed),
        }
    }

    /// Writes every queued message. Returns how many were sent.
    pub async fn flush(&mut self) -> Result<usize, ClientError> {
        let mut sent = 0;
        while let Ok(message) = self.outbound_rx.try_recv() {
            self.writer.write_message(&message).await?;
            sent += 1;
        }
        Ok(sent)
    }

    /// Flushes the queue and closes the write direction.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.flush().await?;
        self.writer.shutdown().await?;
        tracing::debug!(client_id = %self.identity.client_id, "client closed");
        Ok(())
    }

    /// Moves the connection into a background worker that hands every
    /// inbound message to `dispatcher` and writes everything enqueued on
    /// the returned handle.
    pub fn spawn<D: Dispatcher>(self, dispatcher: D) -> ClientHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let identity = self.identity.clone();
        let outbound = self.outbound_tx.clone();
        let task = tokio::spawn(self.run(dispatcher, stop_rx));

        ClientHandle {
            identity,
            outbound,
            stop: stop_tx,
            task,
        }
    }

    async fn run<D: Dispatcher>(mut self, mut dispatcher: D, mut stop: watch::Receiver<bool>) {
        let outcome = loop {
            tokio::select! {
                biased;

                // Fires on `stop()` and when the handle is dropped.
                _ = stop.changed() => break Ok(()),

                inbound = self.inbound.recv() => match inbound {
                    Some(Ok(message)) => dispatcher.dispatch(message),
                    Some(Err(e)) => break Err(ClientError::from(e)),
                    None => break Err(ClientError::ConnectionClosed),
                },

                Some(message) = self.outbound_rx.recv() => {
                    if let Err(e) = self.writer.write_message(&message).await {
                        break Err(e.into());
                    }
                    if let Err(e) = self.flush().await {
                        break Err(e);
                    }
                }
            }
        };

        match outcome {
            Ok(()) => {
                if let Err(e) = self.close().await {
                    tracing::debug!(error = %e, "error while closing client");
                }
            }
            Err(e) => dispatcher.on_error(e),
        }
    }
}

/// Control handle for a client running in the background.
///
/// Dropping the handle stops the worker.
#[derive(Debug)]
pub struct ClientHandle {
    identity: Identity,
    outbound: OutboundQueue,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ClientHandle {
    /// Our server-assigned identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Queues a message for the worker to send.
    ///
    /// # Errors
    /// [`ClientError::ConnectionClosed`] if the worker has already exited.
    pub fn enqueue(&self, message: Message) -> Result<(), ClientError> {
        self.outbound
            .send(message)
            .map_err(|_| ClientError::ConnectionClosed)
    }

    /// A producer handle onto the worker's outbound queue.
    pub fn sender(&self) -> OutboundQueue {
        self.outbound.clone()
    }

    /// Returns `true` once the worker has exited for any reason.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the worker to stop and waits for it to exit. Messages still
    /// queued at that point are flushed before the socket is shut down.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "client worker panicked");
        }
    }
}

async fn read_loop<R>(mut reader: FrameReader<R>, inbound: mpsc::UnboundedSender<Inbound>)
where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.read_message().await {
            Ok(Some(message)) => {
                if inbound.send(Ok(message)).is_err() {
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!("server closed the connection");
                break;
            }
            Err(ProtocolError::UnknownMessageType(tag)) => {
                tracing::debug!(tag, "skipping unknown message type");
            }
            Err(e) => {
                let _ = inbound.send(Err(e));
                break;
            }
        }
    }
}

