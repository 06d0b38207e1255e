// ── Reactive entity streams ──
//
// Subscription types the UI layer consumes to render entity stores.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Identified;
use crate::store::Snapshot;

/// A subscription to one entity store.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via [`changed()`](Self::changed) or by converting into a
/// `Stream`.
pub struct EntityStream<T: Identified> {
    current: Snapshot<T>,
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T: Identified> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot as of creation or the last [`changed()`](Self::changed).
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    /// Latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Snapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current snapshot first, then one item per
    /// subsequent change.
    pub fn into_stream(self) -> EntityWatchStream<T> {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct EntityWatchStream<T: Identified> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T: Identified> Stream for EntityWatchStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use crate::model::{Notice, Record};
    use crate::store::EntityStore;

    fn notice(id: &str) -> Notice {
        Notice::from_document(&crate::model::Document::from_value(
            id,
            serde_json::json!({ "title": id }),
        ))
    }

    #[tokio::test]
    async fn changed_yields_new_snapshot() {
        let store = EntityStore::new();
        let mut stream = store.subscribe();
        assert!(stream.current().is_empty());

        store.replace_all(vec![notice("n1")]);
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(stream.current().len(), 1);
    }

    #[tokio::test]
    async fn into_stream_starts_with_current_snapshot() {
        let store = EntityStore::new();
        store.replace_all(vec![notice("n1"), notice("n2")]);
        let mut stream = store.subscribe().into_stream();

        let first = stream.next().await.unwrap();
        assert_eq!(first.len(), 2);

        store.replace_all(vec![]);
        let second = stream.next().await.unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn changed_stays_pending_until_a_publish() {
        let store = EntityStore::new();
        let mut stream = store.subscribe();
        let mut changed = tokio_test::task::spawn(stream.changed());
        tokio_test::assert_pending!(changed.poll());

        store.replace_all(vec![notice("n1")]);
        assert!(changed.is_woken());
        let snap = tokio_test::assert_ready!(changed.poll()).unwrap();
        assert_eq!(snap.len(), 1);
    }

    #[tokio::test]
    async fn changed_returns_none_after_store_dropped() {
        let store: EntityStore<Notice> = EntityStore::new();
        let mut stream = store.subscribe();
        drop(store);
        assert!(stream.changed().await.is_none());
    }
}
