// ── Listener manager ──
//
// Turns remote collection subscriptions into entity store state. One
// spawned task per subscription, so snapshots of a collection are applied
// in delivery order. Errors never leave a listener task: they become a
// cleared `loading` flag, a log line, and at most one `on_error` call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{self, LocalCache};
use crate::config::SyncConfig;
use crate::error::{CoreError, RemoteError};
use crate::model::{DataSource, Document, Record};
use crate::remote::{CollectionSelector, RemoteStore, Subscription};
use crate::store::{EntityStore, LikedIdSet};

// ── ListenerHandle ──────────────────────────────────────────────────

/// Disposer for one running listener.
///
/// [`dispose`](Self::dispose) may be called any number of times; the
/// remote unsubscribe happens exactly once. Dropping the handle disposes
/// it.
#[derive(Debug)]
pub struct ListenerHandle {
    label: String,
    cancel: CancellationToken,
    disposed: AtomicBool,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    fn new(label: String, cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            label,
            cancel,
            disposed: AtomicBool::new(false),
            task,
        }
    }

    /// Stop listening and release the remote subscription.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        debug!(collection = %self.label, "listener disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// `true` once the listener task has exited, whether by disposal, a
    /// subscription error, or the remote feed closing.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Dispose, then wait for the listener task to exit. Once this
    /// returns the listener never touches its store again.
    pub async fn join(mut self) {
        self.dispose();
        if let Err(e) = (&mut self.task).await {
            warn!(collection = %self.label, error = %e, "listener task ended abnormally");
        }
    }

    /// Selector this listener was started for, as a display string.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ── ListenerManager ─────────────────────────────────────────────────

/// Starts listeners against an injected remote store and local cache.
#[derive(Clone)]
pub struct ListenerManager {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
    config: Arc<SyncConfig>,
}

impl ListenerManager {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        cache: Arc<dyn LocalCache>,
        config: SyncConfig,
    ) -> Self {
        Self {
            remote,
            cache,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Generic listener. `on_records` receives the full current document
    /// set on every snapshot, empty ones included. `on_error` fires at
    /// most once, after which the listener ends without retrying.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen<R, E>(
        &self,
        selector: &CollectionSelector,
        mut on_records: R,
        on_error: E,
    ) -> ListenerHandle
    where
        R: FnMut(Vec<Document>) + Send + 'static,
        E: FnOnce(RemoteError) + Send + 'static,
    {
        let mut subscription = self.remote.subscribe(selector);
        let cancel = subscription.cancellation();
        let label = selector.to_string();

        let task = tokio::spawn({
            let cancel = cancel.clone();
            let label = label.clone();
            async move {
                loop {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        event = subscription.next_event() => match event {
                            Some(Ok(docs)) => on_records(docs),
                            Some(Err(e)) => {
                                warn!(collection = %label, error = %e, "subscription failed");
                                on_error(e);
                                break;
                            }
                            None => {
                                debug!(collection = %label, "subscription closed by remote");
                                break;
                            }
                        }
                    }
                }
            }
        });

        ListenerHandle::new(label, cancel, task)
    }

    /// Keep `store` equal to the remote collection behind `selector`.
    ///
    /// Marks the store loading, publishes a cached placeholder if one
    /// exists and nothing live has arrived, then replaces the store on
    /// every snapshot and refreshes the cache. An empty live snapshot is
    /// swapped for `T::fallback()` when that is non-empty.
    pub fn bind<T: Record>(
        &self,
        store: Arc<EntityStore<T>>,
        selector: &CollectionSelector,
    ) -> ListenerHandle {
        let subscription = self.remote.subscribe(selector);
        let cancel = subscription.cancellation();
        let label = selector.to_string();
        let cache_key = self
            .config
            .cache_enabled
            .then(|| self.config.cache_key(&selector.cache_key()));

        store.set_loading(true);

        let task = tokio::spawn(run_bound(
            subscription,
            cancel.clone(),
            label.clone(),
            store,
            Arc::clone(&self.cache),
            cache_key,
        ));

        ListenerHandle::new(label, cancel, task)
    }

    /// Mirror a liked-ids sub-collection (`users/{uid}/liked*`) into `set`.
    /// Only document ids matter; the documents' fields are ignored.
    pub fn bind_liked(&self, set: Arc<LikedIdSet>, selector: &CollectionSelector) -> ListenerHandle {
        let label = selector.to_string();
        self.listen(
            selector,
            move |docs| set.replace_all(docs.into_iter().map(|d| d.id)),
            move |e| debug!(collection = %label, error = %e, "liked ids unavailable"),
        )
    }

    /// Read `selector` once and map the documents into records.
    pub async fn fetch_once<T: Record>(
        &self,
        selector: &CollectionSelector,
    ) -> Result<Vec<T>, CoreError> {
        let docs = self.remote.get_once(selector).await?;
        debug!(collection = %selector, count = docs.len(), "one-shot fetch");
        Ok(docs.iter().map(T::from_document).collect())
    }
}

// ── Bound listener task ─────────────────────────────────────────────

async fn run_bound<T: Record>(
    mut subscription: Subscription,
    cancel: CancellationToken,
    label: String,
    store: Arc<EntityStore<T>>,
    cache: Arc<dyn LocalCache>,
    cache_key: Option<String>,
) {
    if let Some(key) = cache_key.as_deref() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = publish_placeholder(&store, cache.as_ref(), key, &label, &cancel) => {}
        }
    }

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = subscription.next_event() => match event {
                Some(Ok(docs)) => {
                    let records = apply_live_snapshot(&store, &docs);
                    debug!(collection = %label, count = records.len(), "snapshot applied");
                    if let Some(key) = cache_key.as_deref() {
                        if let Err(e) = cache::store_json(cache.as_ref(), key, &records).await {
                            warn!(collection = %label, error = %e, "failed to write cache snapshot");
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!(collection = %label, error = %e, "subscription failed, keeping last-known data");
                    store.set_loading(false);
                    break;
                }
                None => {
                    debug!(collection = %label, "subscription closed by remote");
                    store.set_loading(false);
                    break;
                }
            }
        }
    }
}

/// Replace the store with a live snapshot (or the fallback dataset when
/// the snapshot is empty) and return what was published.
fn apply_live_snapshot<T: Record>(store: &EntityStore<T>, docs: &[Document]) -> Vec<T> {
    let mut records: Vec<T> = docs.iter().map(T::from_document).collect();
    let mut source = DataSource::Live;
    if records.is_empty() {
        let fallback = T::fallback();
        if !fallback.is_empty() {
            records = fallback;
            source = DataSource::Fallback;
        }
    }
    store.publish(records.clone(), source);
    store.set_loading(false);
    records
}

async fn publish_placeholder<T: Record>(
    store: &EntityStore<T>,
    cache: &dyn LocalCache,
    key: &str,
    label: &str,
    cancel: &CancellationToken,
) {
    match cache::load_json::<Vec<T>>(cache, key).await {
        Ok(Some(records)) => {
            // A live snapshot may have landed while the cache was read.
            if cancel.is_cancelled() || store.source().is_live() {
                return;
            }
            debug!(collection = %label, count = records.len(), "showing cached placeholder");
            store.publish(records, DataSource::Cache);
        }
        Ok(None) => debug!(collection = %label, "no cached snapshot"),
        Err(e) => warn!(collection = %label, error = %e, "ignoring unreadable cache snapshot"),
    }
}
