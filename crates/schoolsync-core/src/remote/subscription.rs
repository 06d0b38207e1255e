// ── Cancellable snapshot subscriptions ──
//
// A Subscription is the consumer half of a live collection feed: a
// stream of full-collection snapshots (or an error) plus a cancellation
// token the producer watches. Dropping or cancelling the Subscription
// tells the producer to unsubscribe.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::RemoteError;
use crate::model::Document;

/// One delivery on a subscription: the full current collection, or the
/// error that ended the feed.
pub type SnapshotEvent = Result<Vec<Document>, RemoteError>;

/// Create a connected producer/consumer pair.
pub fn channel() -> (SubscriptionSink, Subscription) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    (
        SubscriptionSink {
            tx,
            cancel: cancel.clone(),
        },
        Subscription { rx, cancel },
    )
}

/// Consumer half, handed out by [`RemoteStore::subscribe`](super::RemoteStore::subscribe).
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<SnapshotEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    /// A subscription that immediately yields `err` and then ends.
    pub fn failed(err: RemoteError) -> Self {
        let (sink, sub) = channel();
        sink.send(Err(err));
        sub
    }

    /// Next event, or `None` once the producer has gone away.
    pub async fn next_event(&mut self) -> Option<SnapshotEvent> {
        self.rx.recv().await
    }

    /// Ask the producer to stop. Safe to call repeatedly.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that fires when this subscription is cancelled.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Stream for Subscription {
    type Item = SnapshotEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Producer half, held by the remote client for as long as the
/// subscription is live.
#[derive(Debug, Clone)]
pub struct SubscriptionSink {
    tx: mpsc::UnboundedSender<SnapshotEvent>,
    cancel: CancellationToken,
}

impl SubscriptionSink {
    /// Push an event. Returns `false` if the consumer is gone or has
    /// cancelled, in which case the producer should stop.
    pub fn send(&self, event: SnapshotEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(event).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves once the consumer cancels or drops its half.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}
