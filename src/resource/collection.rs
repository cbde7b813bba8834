//! In-memory representation of one fetched list

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};

/// A domain record with a stable identifier
///
/// The identifier is the reconciliation key for optimistic mutations and
/// must be unique within one collection.
pub trait Item: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    fn id(&self) -> &Self::Id;
}

/// Fetch status of a collection
///
/// `Idle → Loading → {Ready, Error}` and `Ready|Error → Refreshing → {Ready, Error}`.
/// No state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Refreshing,
    Error,
    Ready,
}

impl FetchStatus {
    /// A fetch is outstanding
    pub fn is_busy(&self) -> bool {
        matches!(self, FetchStatus::Loading | FetchStatus::Refreshing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Idle => "idle",
            FetchStatus::Loading => "loading",
            FetchStatus::Refreshing => "refreshing",
            FetchStatus::Error => "error",
            FetchStatus::Ready => "ready",
        }
    }
}

/// One fetched list resource plus its fetch status
#[derive(Debug, Clone)]
pub struct RemoteCollection<T> {
    /// Items in server order
    pub items: Vec<T>,
    pub status: FetchStatus,
    /// User-facing message of the last failed fetch
    pub error: Option<String>,
    /// When the last successful fetch completed
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for RemoteCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            status: FetchStatus::Idle,
            error: None,
            last_fetched_at: None,
        }
    }
}

impl<T: Item> RemoteCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn position(&self, id: &T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Replace every item, keeping the first occurrence of a duplicated id
    pub fn replace_all(&mut self, items: Vec<T>) {
        let mut seen = HashSet::with_capacity(items.len());
        let total = items.len();
        self.items = items
            .into_iter()
            .filter(|item| seen.insert(item.id().clone()))
            .collect();

        if self.items.len() != total {
            tracing::warn!(
                dropped = total - self.items.len(),
                "Dropped items with duplicate ids"
            );
        }
    }

    /// Run `change` against the item with `id`
    ///
    /// Returns `false` (and changes nothing) when no such item exists.
    pub fn patch(&mut self, id: &T::Id, change: impl FnOnce(&mut T)) -> bool {
        match self.position(id) {
            Some(index) => {
                change(&mut self.items[index]);
                true
            }
            None => false,
        }
    }

    /// Append an item unless its id is already present
    pub fn insert(&mut self, item: T) -> bool {
        if self.position(item.id()).is_some() {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Swap the item with `id` for `replacement` in place
    ///
    /// The replacement may carry a different id (e.g. a server-assigned id
    /// replacing a provisional one). Refused if that id is already taken by
    /// another item.
    pub fn replace_item(&mut self, id: &T::Id, replacement: T) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        if replacement.id() != id && self.position(replacement.id()).is_some() {
            self.items.remove(index);
            return false;
        }
        self.items[index] = replacement;
        true
    }

    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        self.position(id).map(|index| self.items.remove(index))
    }
}
