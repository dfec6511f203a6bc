//! The callback seam between the client worker and the application.

use roomchat_protocol::Message;

use crate::ClientError;

/// Receives everything the background worker reads from the server.
///
/// Implemented for any `FnMut(Message) + Send` closure, so simple callers
/// can pass a closure to [`ChatClient::spawn`](crate::ChatClient::spawn).
pub trait Dispatcher: Send + 'static {
    /// Called once per inbound message, in arrival order.
    fn dispatch(&mut self, message: Message);

    /// Called once when the worker stops because of an error. The worker
    /// does not call `dispatch` again afterwards.
    fn on_error(&mut self, error: ClientError) {
        tracing::warn!(error = %error, "client worker stopped");
    }
}

impl<F> Dispatcher for F
where
    F: FnMut(Message) + Send + 'static,
{
    fn dispatch(&mut self, message: Message) {
        self(message)
    }
}
