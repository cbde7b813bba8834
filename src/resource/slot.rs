//! Resource cache slot
//!
//! Holds one [`RemoteCollection`] for the lifetime of a screen and owns the
//! fetch lifecycle for it. At most one fetch is in flight per slot: a
//! `load()` or `refresh()` issued while one is outstanding joins it and
//! resolves with the same status.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::watch;

use super::collection::{FetchStatus, Item, RemoteCollection};
use crate::error::AppError;

/// Produces the full list for a slot; called once per network fetch
pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<T>, AppError>> + Send + Sync>;

type InFlight = Shared<BoxFuture<'static, FetchStatus>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    Load,
    Refresh,
}

struct SlotState<T> {
    collection: RemoteCollection<T>,
    fetched_at: Option<Instant>,
    in_flight: Option<(u64, InFlight)>,
    last_fetch_id: u64,
}

impl<T> SlotState<T> {
    fn new() -> Self {
        Self {
            collection: RemoteCollection::default(),
            fetched_at: None,
            in_flight: None,
            last_fetch_id: 0,
        }
    }

    /// Clear the in-flight handle if it still belongs to `fetch_id`
    fn finish_fetch(&mut self, fetch_id: u64) -> bool {
        match &self.in_flight {
            Some((current, _)) if *current == fetch_id => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    fn is_fresh(&self, freshness: Option<Duration>) -> bool {
        match (self.collection.status, self.fetched_at, freshness) {
            (FetchStatus::Ready, Some(fetched_at), Some(window)) => fetched_at.elapsed() < window,
            _ => false,
        }
    }
}

/// In-memory holder for one logical collection
///
/// Cloning yields another handle to the same slot.
pub struct ResourceSlot<T: Item> {
    name: &'static str,
    fetcher: Fetcher<T>,
    freshness: Option<Duration>,
    state: Arc<Mutex<SlotState<T>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl<T: Item> Clone for ResourceSlot<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            fetcher: self.fetcher.clone(),
            freshness: self.freshness,
            state: self.state.clone(),
            revision: self.revision.clone(),
        }
    }
}

impl<T: Item> ResourceSlot<T> {
    /// Create an empty slot
    ///
    /// # Arguments
    /// * `name` - Label used in logs and metrics (e.g. "posts")
    /// * `freshness` - Window in which `load()` skips the network; `None` always refetches
    /// * `fetcher` - Fetches the full collection
    pub fn new<F>(name: &'static str, freshness: Option<Duration>, fetcher: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<Vec<T>, AppError>> + Send + Sync + 'static,
    {
        let (revision, _) = watch::channel(0);
        Self {
            name,
            fetcher: Arc::new(fetcher),
            freshness,
            state: Arc::new(Mutex::new(SlotState::new())),
            revision: Arc::new(revision),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fetch unless the collection is Ready and still fresh
    ///
    /// Never fails: errors end up in the collection's `status`/`error`
    /// with the previous items kept.
    pub async fn load(&self) -> FetchStatus {
        self.fetch(FetchMode::Load).await
    }

    /// Fetch regardless of freshness
    ///
    /// Reports `Refreshing` while outstanding so the UI can keep showing
    /// the current items; before the first fetch it reports `Loading`.
    pub async fn refresh(&self) -> FetchStatus {
        self.fetch(FetchMode::Refresh).await
    }

    async fn fetch(&self, mode: FetchMode) -> FetchStatus {
        let pending = {
            let mut state = self.state.lock();

            if let Some((_, in_flight)) = state.in_flight.clone() {
                tracing::debug!(slot = self.name, ?mode, "Joining in-flight fetch");
                crate::metrics::COALESCED_FETCHES_TOTAL
                    .with_label_values(&[self.name])
                    .inc();
                in_flight
            } else if mode == FetchMode::Load && state.is_fresh(self.freshness) {
                tracing::debug!(slot = self.name, "Collection is fresh, skipping fetch");
                return state.collection.status;
            } else {
                state.collection.status =
                    if mode == FetchMode::Refresh && state.collection.status != FetchStatus::Idle {
                        FetchStatus::Refreshing
                    } else {
                        FetchStatus::Loading
                    };
                state.last_fetch_id += 1;
                let fetch_id = state.last_fetch_id;
                let in_flight = self.spawn_fetch(fetch_id);
                state.in_flight = Some((fetch_id, in_flight.clone()));
                self.bump();
                in_flight
            }
        };

        pending.await
    }

    /// Start the network fetch on its own task
    ///
    /// Running detached keeps the fetch alive even if every caller stops
    /// awaiting it, so `in_flight` is always cleared.
    fn spawn_fetch(&self, fetch_id: u64) -> InFlight {
        let fetcher = self.fetcher.clone();
        let state = self.state.clone();
        let revision = self.revision.clone();
        let name = self.name;

        let handle = tokio::spawn({
            let state = state.clone();
            let revision = revision.clone();
            async move {
                let result = fetcher().await;

                let status = {
                    let mut state = state.lock();
                    state.finish_fetch(fetch_id);
                    match result {
                        Ok(items) => {
                            state.collection.replace_all(items);
                            state.collection.status = FetchStatus::Ready;
                            state.collection.error = None;
                            state.collection.last_fetched_at = Some(chrono::Utc::now());
                            state.fetched_at = Some(Instant::now());
                            tracing::info!(slot = name, items = state.collection.len(), "Collection fetched");
                        }
                        Err(error) => {
                            state.collection.status = FetchStatus::Error;
                            state.collection.error = Some(error.user_message());
                            tracing::warn!(slot = name, %error, "Collection fetch failed");
                        }
                    }
                    state.collection.status
                };

                crate::metrics::FETCHES_TOTAL
                    .with_label_values(&[name, status.as_str()])
                    .inc();
                revision.send_modify(|rev| *rev += 1);
                status
            }
        });

        async move {
            match handle.await {
                Ok(status) => status,
                Err(join_error) => {
                    tracing::error!(slot = name, error = %join_error, "Fetch task aborted");
                    let mut state = state.lock();
                    // A newer fetch keeps its own handle and status
                    if state.finish_fetch(fetch_id) {
                        state.collection.status = FetchStatus::Error;
                        state.collection.error = Some("Something went wrong.".to_string());
                        revision.send_modify(|rev| *rev += 1);
                    }
                    FetchStatus::Error
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Merge a local change into the item with `id`
    ///
    /// A missing id is not an error: the item may have been dropped by a
    /// concurrent `replace_all`. Returns whether an item was changed.
    pub fn patch(&self, id: &T::Id, change: impl FnOnce(&mut T)) -> bool {
        let patched = self.state.lock().collection.patch(id, change);
        if patched {
            self.bump();
        } else {
            tracing::debug!(slot = self.name, %id, "Patch target not found");
        }
        patched
    }

    /// Replace every item as if a fetch had just succeeded
    pub fn replace_all(&self, items: Vec<T>) {
        {
            let mut state = self.state.lock();
            state.collection.replace_all(items);
            state.collection.status = FetchStatus::Ready;
            state.collection.error = None;
            state.collection.last_fetched_at = Some(chrono::Utc::now());
            state.fetched_at = Some(Instant::now());
        }
        self.bump();
    }

    /// Append an item that is not in the collection yet
    pub fn insert(&self, item: T) -> bool {
        let inserted = self.state.lock().collection.insert(item);
        if inserted {
            self.bump();
        }
        inserted
    }

    /// Swap the item with `id` for an authoritative version
    pub fn replace_item(&self, id: &T::Id, replacement: T) -> bool {
        let replaced = self.state.lock().collection.replace_item(id, replacement);
        if replaced {
            self.bump();
        }
        replaced
    }

    pub fn remove(&self, id: &T::Id) -> Option<T> {
        let removed = self.state.lock().collection.remove(id);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Copy of the current collection
    pub fn snapshot(&self) -> RemoteCollection<T> {
        self.state.lock().collection.clone()
    }

    pub fn status(&self) -> FetchStatus {
        self.state.lock().collection.status
    }

    pub fn get(&self, id: &T::Id) -> Option<T> {
        self.state.lock().collection.get(id).cloned()
    }

    /// Revision counter that changes whenever the collection does
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}
