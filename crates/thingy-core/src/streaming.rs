//! Live streams of decoded readings.
//!
//! A [`ReadingStream`] is fed by a background task that listens to one
//! characteristic's notifications, decodes each payload and forwards it as a
//! [`Reading`]. The stream ends quietly when unsubscribed, or with exactly
//! one terminal `Err` when the lower layer fails. It never reconnects.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use thingy_types::{Reading, SensorDescriptor, inspect};

use crate::error::Error;
use crate::traits::GattLink;

/// Result type for stream items.
pub type ReadingResult = std::result::Result<Reading, Error>;

/// Handle on a live stream's listener.
///
/// Cloneable so the owner of the stream and the UI can both release it.
/// Releasing twice is a no-op.
#[derive(Debug, Clone)]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Stop listening. The stream ends without an error.
    pub fn unsubscribe(&self) {
        self.token.cancel();
    }

    /// Whether the listener has been released (explicitly or by disconnect).
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A stream of readings from one characteristic.
///
/// Unbounded: readings queue until consumed. Dropping the stream releases
/// its listener.
pub struct ReadingStream {
    receiver: mpsc::UnboundedReceiver<ReadingResult>,
    handle: tokio::task::JoinHandle<()>,
    subscription: Subscription,
}

impl ReadingStream {
    /// Spawn the listener task.
    ///
    /// `connect` resolves the link lazily inside the task so that creating a
    /// stream never blocks; a connect failure becomes the terminal item.
    pub(crate) fn spawn<F>(connect: F, token: CancellationToken) -> Self
    where
        F: Future<Output = Result<(Arc<dyn GattLink>, SensorDescriptor), Error>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task_token = token.clone();
        let handle = tokio::spawn(run_listener(connect, tx, task_token));

        Self {
            receiver: rx,
            handle,
            subscription: Subscription::new(token),
        }
    }

    /// A handle that can release this stream's listener from elsewhere.
    pub fn subscription(&self) -> Subscription {
        self.subscription.clone()
    }

    /// Release the listener and drop the stream.
    pub fn close(self) {
        self.subscription.unsubscribe();
    }

    /// Check if the background task is still running.
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Check if the stream was released.
    pub fn is_cancelled(&self) -> bool {
        self.subscription.is_closed()
    }

    /// Check if the task ended without being released, i.e. it hit a terminal error.
    pub fn has_unexpectedly_stopped(&self) -> bool {
        self.handle.is_finished() && !self.subscription.is_closed()
    }
}

impl Drop for ReadingStream {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

impl Stream for ReadingStream {
    type Item = ReadingResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

async fn run_listener<F>(
    connect: F,
    tx: mpsc::UnboundedSender<ReadingResult>,
    token: CancellationToken,
) where
    F: Future<Output = Result<(Arc<dyn GattLink>, SensorDescriptor), Error>> + Send,
{
    let (link, descriptor) = match token.run_until_cancelled(connect).await {
        None => {
            debug!("Stream released before the link was ready");
            return;
        }
        Some(Err(e)) => {
            let _ = tx.send(Err(e));
            return;
        }
        Some(Ok(ready)) => ready,
    };

    let kind = descriptor.kind();
    let characteristic = descriptor.characteristic();

    // Not cancellable: a registered listener is released below, even if the
    // stream was unsubscribed while notifications were being enabled.
    let mut notifications = match link.notifications(characteristic).await {
        Err(e) => {
            if !token.is_cancelled() {
                let _ = tx.send(Err(e));
            }
            return;
        }
        Ok(stream) => stream,
    };
    debug!(sensor = %kind, "Listening for notifications");

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(sensor = %kind, "Stream unsubscribed");
                break;
            }
            item = notifications.next() => {
                let payload = match item {
                    Some(Ok(payload)) => payload,
                    Some(Err(e)) => {
                        warn!(sensor = %kind, "Stream terminated: {}", e);
                        let _ = tx.send(Err(e));
                        break;
                    }
                    None => {
                        warn!(sensor = %kind, "Notification source ended");
                        let _ = tx.send(Err(Error::gatt_disconnected()));
                        break;
                    }
                };

                if let Ok(raw) = inspect(kind, &payload) {
                    trace!(sensor = %kind, ?raw, "Payload interpretations");
                }

                match descriptor.decode(&payload) {
                    Ok(value) => {
                        debug!("Reading {} {}", kind, value);
                        if tx.send(Ok(Reading::now(value))).is_err() {
                            debug!("Stream receiver dropped, stopping");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(sensor = %kind, "Dropping stream on undecodable payload: {}", e);
                        let _ = tx.send(Err(e.into()));
                        break;
                    }
                }
            }
        }
    }

    drop(notifications);
    if let Err(e) = link.unsubscribe(characteristic).await {
        debug!(sensor = %kind, "Unsubscribe failed: {}", e);
    }
}
