//! Optimistic mutation applier
//!
//! A user action changes the displayed collection immediately, then the
//! remote call either confirms it (optionally with an authoritative copy of
//! the item) or fails and the local change is undone.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::collection::Item;
use super::slot::ResourceSlot;
use crate::error::AppError;

/// Kind of user action being applied optimistically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Like,
    Follow,
    Send,
    AddToReadlist,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Like => "like",
            MutationKind::Follow => "follow",
            MutationKind::Send => "send",
            MutationKind::AddToReadlist => "add_to_readlist",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation whose remote call has not answered yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation<Id> {
    pub target_id: Id,
    pub kind: MutationKind,
    pub submitted_at: DateTime<Utc>,
}

/// Field-level change that knows how to undo itself
pub trait ItemPatch<T>: Send + Sync {
    fn apply(&self, item: &mut T);

    /// Undo `apply`
    ///
    /// Implementations should leave the item alone if it no longer shows
    /// the applied state (e.g. a refresh already brought server truth).
    fn revert(&self, item: &mut T);

    /// Carry the confirmed change onto the server's copy of the item
    ///
    /// The server copy may leave out the fields this patch set. The default
    /// applies the patch again, so `apply` must not double up on an item
    /// that already shows the change.
    fn reconcile(&self, authoritative: &mut T) {
        self.apply(authoritative);
    }
}

/// Local change applied before the server confirms
pub enum LocalPatch<T> {
    /// Change fields of the item with the target id
    Update(Box<dyn ItemPatch<T>>),
    /// Add a provisional item whose id is the target id
    Insert(T),
}

impl<T> LocalPatch<T> {
    pub fn update(patch: impl ItemPatch<T> + 'static) -> Self {
        LocalPatch::Update(Box::new(patch))
    }
}

/// How an `apply` call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The same (target, kind) was already in flight; nothing happened
    Ignored,
    /// The server accepted the change
    Confirmed,
    /// The server rejected the change and the local state was restored
    RolledBack { notice: String },
}

type PendingKey<Id> = (Id, MutationKind);

/// Applies optimistic mutations to one slot
///
/// Cloning yields another handle sharing the same pending set.
pub struct MutationApplier<T: Item> {
    slot: ResourceSlot<T>,
    pending: Arc<Mutex<HashMap<PendingKey<T::Id>, PendingMutation<T::Id>>>>,
}

impl<T: Item> Clone for MutationApplier<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            pending: self.pending.clone(),
        }
    }
}

/// Removes the pending entry however the apply future ends
struct PendingGuard<Id: Eq + std::hash::Hash> {
    pending: Arc<Mutex<HashMap<PendingKey<Id>, PendingMutation<Id>>>>,
    key: PendingKey<Id>,
}

impl<Id: Eq + std::hash::Hash> Drop for PendingGuard<Id> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.key);
    }
}

impl<T: Item> MutationApplier<T> {
    pub fn new(slot: ResourceSlot<T>) -> Self {
        Self {
            slot,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn slot(&self) -> &ResourceSlot<T> {
        &self.slot
    }

    /// Apply `patch` locally, then run `request` and reconcile
    ///
    /// `request` is not polled when the same (target, kind) is already
    /// pending, so no network call is made for an ignored action. A
    /// successful request may return an authoritative item. It replaces
    /// the optimistic one after the patch is reconciled onto it. A
    /// confirmed insert whose provisional item was dropped by a refresh is
    /// added again.
    pub async fn apply<F>(
        &self,
        target_id: T::Id,
        kind: MutationKind,
        patch: LocalPatch<T>,
        request: F,
    ) -> MutationOutcome
    where
        F: Future<Output = Result<Option<T>, AppError>>,
    {
        let _guard = {
            let mut pending = self.pending.lock();
            let key = (target_id.clone(), kind);
            if pending.contains_key(&key) {
                tracing::debug!(%target_id, %kind, "Mutation already in flight, ignoring");
                crate::metrics::MUTATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "ignored"])
                    .inc();
                return MutationOutcome::Ignored;
            }
            pending.insert(
                key.clone(),
                PendingMutation {
                    target_id: target_id.clone(),
                    kind,
                    submitted_at: Utc::now(),
                },
            );
            PendingGuard {
                pending: self.pending.clone(),
                key,
            }
        };

        match &patch {
            LocalPatch::Update(change) => {
                self.slot.patch(&target_id, |item| change.apply(item));
            }
            LocalPatch::Insert(item) => {
                self.slot.insert(item.clone());
            }
        }

        match request.await {
            Ok(authoritative) => {
                if let Some(mut item) = authoritative {
                    match &patch {
                        LocalPatch::Update(change) => {
                            change.reconcile(&mut item);
                            self.slot.replace_item(&target_id, item);
                        }
                        LocalPatch::Insert(_) => {
                            if !self.slot.replace_item(&target_id, item.clone()) {
                                self.slot.insert(item);
                            }
                        }
                    }
                }
                tracing::debug!(%target_id, %kind, "Mutation confirmed");
                crate::metrics::MUTATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "confirmed"])
                    .inc();
                MutationOutcome::Confirmed
            }
            Err(error) => {
                match &patch {
                    LocalPatch::Update(change) => {
                        self.slot.patch(&target_id, |item| change.revert(item));
                    }
                    LocalPatch::Insert(_) => {
                        self.slot.remove(&target_id);
                    }
                }
                tracing::warn!(%target_id, %kind, %error, "Mutation failed, rolled back");
                crate::metrics::MUTATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "rolled_back"])
                    .inc();
                MutationOutcome::RolledBack {
                    notice: error.user_message(),
                }
            }
        }
    }

    pub fn is_pending(&self, target_id: &T::Id, kind: MutationKind) -> bool {
        self.pending
            .lock()
            .contains_key(&(target_id.clone(), kind))
    }

    pub fn pending(&self) -> Vec<PendingMutation<T::Id>> {
        self.pending.lock().values().cloned().collect()
    }
}
