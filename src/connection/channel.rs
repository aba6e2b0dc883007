//! Channel mode: the read direction runs as its own task and hands
//! messages to the application through a bounded channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot};

use crate::connection::{Connection, MessageReader, MessageSender};
use crate::error::Result;
use crate::message::{CloseCode, Message};

/// Messages received by a connection running in channel mode.
///
/// Dropping this, or calling [`Incoming::cancel`], stops the read task.
#[derive(Debug)]
pub struct Incoming {
    rx: mpsc::Receiver<Result<Message>>,
    cancel: Option<oneshot::Sender<()>>,
}

impl Incoming {
    /// Next message, or `None` once the read task has stopped. A read error
    /// is delivered once and ends the stream.
    pub async fn recv(&mut self) -> Option<Result<Message>> {
        self.rx.recv().await
    }

    /// Stop the read task. Messages already queued can still be received.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

impl Stream for Incoming {
    type Item = Result<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Move the read direction into a spawned task feeding a channel of
    /// `capacity` messages.
    ///
    /// If the application leaves the channel full for longer than the
    /// delivery timeout, the task fails the connection with 1008 (policy
    /// violation) instead of stalling ping handling indefinitely.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn into_channel(self, capacity: usize) -> (Incoming, MessageSender<S>) {
        let (reader, sender) = self.split();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(read_loop(reader, tx, cancel_rx));
        (
            Incoming {
                rx,
                cancel: Some(cancel_tx),
            },
            sender,
        )
    }
}

async fn read_loop<S>(
    mut reader: MessageReader<S>,
    tx: mpsc::Sender<Result<Message>>,
    mut cancel: oneshot::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let received = tokio::select! {
            _ = &mut cancel => {
                log::debug!("read task cancelled");
                return;
            }
            received = reader.recv() => received,
        };
        let (item, last) = match received {
            Ok(Some(message)) => (Ok(message), false),
            Ok(None) => return,
            Err(err) => (Err(err), true),
        };
        match tx.send_timeout(item, reader.delivery_timeout).await {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                log::warn!(
                    "consumer took no message for {:?}, failing connection",
                    reader.delivery_timeout
                );
                reader.abort(CloseCode::POLICY_VIOLATION.as_u16()).await;
                return;
            }
            Err(SendTimeoutError::Closed(_)) => {
                log::debug!("consumer went away, stopping read task");
                return;
            }
        }
        if last {
            return;
        }
    }
}
