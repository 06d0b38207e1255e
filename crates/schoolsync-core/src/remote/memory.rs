// ── In-process remote store ──
//
// A complete RemoteStore kept in memory: documents, live subscriptions,
// equality queries, and failure injection. Backs the test suite and
// any embedder running without a backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexMap;
use tracing::debug;

use super::subscription::{Subscription, SubscriptionSink, channel};
use super::{CollectionSelector, DocumentPath, RemoteStore, SetOptions};
use crate::error::RemoteError;
use crate::model::{Document, EntityId, Fields};

struct Subscriber {
    selector: CollectionSelector,
    sink: SubscriptionSink,
}

#[derive(Default)]
struct MemoryInner {
    /// collection path -> (document id -> fields), in insertion order.
    collections: DashMap<String, IndexMap<EntityId, Fields>>,
    subscribers: DashMap<u64, Subscriber>,
    next_subscriber: AtomicU64,
    /// Collection paths whose subscriptions and reads fail.
    read_failures: DashMap<String, RemoteError>,
    /// Collection paths whose writes fail.
    write_failures: DashMap<String, RemoteError>,
    unsubscribes: AtomicUsize,
    writes: AtomicUsize,
}

/// Cheaply cloneable in-memory document store.
#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<MemoryInner>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding ──────────────────────────────────────────────────────

    /// Insert or replace documents without going through failure
    /// injection. Documents with an empty id get a generated one.
    /// Subscribers are notified once.
    pub fn seed(&self, collection: &str, docs: impl IntoIterator<Item = Document>) {
        {
            let mut col = self.inner.collections.entry(collection.to_owned()).or_default();
            for doc in docs {
                let id = if doc.id.is_empty() { EntityId::generate() } else { doc.id };
                col.insert(id, doc.fields);
            }
        }
        self.notify(collection);
    }

    /// Current documents of a collection, unfiltered.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.inner
            .collections
            .get(collection)
            .map(|col| {
                col.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn document(&self, path: &DocumentPath) -> Option<Document> {
        let col = self.inner.collections.get(&path.collection)?;
        col.get(&path.id)
            .map(|fields| Document::new(path.id.clone(), fields.clone()))
    }

    // ── Failure injection ────────────────────────────────────────────

    /// Make subscriptions to and reads of `collection` fail with `err`.
    pub fn fail_reads(&self, collection: &str, err: RemoteError) {
        self.inner.read_failures.insert(collection.to_owned(), err);
    }

    /// Make writes to `collection` fail with `err`.
    pub fn fail_writes(&self, collection: &str, err: RemoteError) {
        self.inner.write_failures.insert(collection.to_owned(), err);
    }

    pub fn clear_failures(&self) {
        self.inner.read_failures.clear();
        self.inner.write_failures.clear();
    }

    /// Push `err` to every live subscriber of `collection`, ending their
    /// feeds as a dropped connection would.
    pub fn break_subscriptions(&self, collection: &str, err: &RemoteError) {
        let ids: Vec<u64> = self
            .inner
            .subscribers
            .iter()
            .filter(|s| s.selector.path == collection)
            .map(|s| *s.key())
            .collect();
        for id in ids {
            if let Some((_, sub)) = self.inner.subscribers.remove(&id) {
                sub.sink.send(Err(err.clone()));
            }
        }
    }

    // ── Introspection ────────────────────────────────────────────────

    /// Number of subscriptions currently registered.
    pub fn active_subscriptions(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Number of subscriptions torn down by their consumer.
    pub fn unsubscribe_count(&self) -> usize {
        self.inner.unsubscribes.load(Ordering::SeqCst)
    }

    /// Number of successful `set`/`delete` calls.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn query(&self, selector: &CollectionSelector) -> Vec<Document> {
        self.inner
            .collections
            .get(&selector.path)
            .map(|col| {
                col.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .filter(|doc| selector.matches(doc))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deliver the current contents to every subscriber of `collection`.
    fn notify(&self, collection: &str) {
        let targets: Vec<(u64, CollectionSelector, SubscriptionSink)> = self
            .inner
            .subscribers
            .iter()
            .filter(|s| s.selector.path == collection)
            .map(|s| (*s.key(), s.selector.clone(), s.sink.clone()))
            .collect();

        for (id, selector, sink) in targets {
            if !sink.send(Ok(self.query(&selector))) {
                self.inner.subscribers.remove(&id);
            }
        }
    }

    fn check_write(&self, path: &DocumentPath) -> Result<(), RemoteError> {
        match self.inner.write_failures.get(&path.collection) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    fn subscribe(&self, selector: &CollectionSelector) -> Subscription {
        if let Some(err) = self.inner.read_failures.get(&selector.path) {
            return Subscription::failed(err.clone());
        }

        let (sink, subscription) = channel();
        sink.send(Ok(self.query(selector)));

        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst);
        self.inner.subscribers.insert(
            id,
            Subscriber {
                selector: selector.clone(),
                sink: sink.clone(),
            },
        );

        let inner = Arc::clone(&self.inner);
        let path = selector.path.clone();
        tokio::spawn(async move {
            sink.cancelled().await;
            if inner.subscribers.remove(&id).is_some() {
                inner.unsubscribes.fetch_add(1, Ordering::SeqCst);
                debug!(collection = %path, subscriber = id, "unsubscribed");
            }
        });

        subscription
    }

    async fn get_once(&self, selector: &CollectionSelector) -> Result<Vec<Document>, RemoteError> {
        if let Some(err) = self.inner.read_failures.get(&selector.path) {
            return Err(err.clone());
        }
        Ok(self.query(selector))
    }

    async fn set(
        &self,
        path: &DocumentPath,
        data: Fields,
        options: SetOptions,
    ) -> Result<(), RemoteError> {
        self.check_write(path)?;
        {
            let mut col = self
                .inner
                .collections
                .entry(path.collection.clone())
                .or_default();
            match col.get_mut(&path.id) {
                Some(existing) if options.merge => existing.extend(data),
                Some(existing) => *existing = data,
                None => {
                    col.insert(path.id.clone(), data);
                }
            }
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.notify(&path.collection);
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), RemoteError> {
        self.check_write(path)?;
        let removed = self
            .inner
            .collections
            .get_mut(&path.collection)
            .and_then(|mut col| col.shift_remove(&path.id))
            .is_some();
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        if removed {
            self.notify(&path.collection);
        }
        Ok(())
    }
}
