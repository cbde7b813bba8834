//! Remote resource building blocks
//!
//! Every screen is assembled from the same four pieces:
//! - [`ResourceSlot`]: one fetched collection with loading/error/refresh state
//! - [`DebouncedQuery`]: search input coalesced into delayed remote calls
//! - [`MutationApplier`]: optimistic local changes reconciled with the server
//! - [`project`]: pure sort/filter of a collection for display

mod collection;
mod mutation;
mod projector;
mod query;
mod slot;

pub use collection::{FetchStatus, Item, RemoteCollection};
pub use mutation::{
    ItemPatch, LocalPatch, MutationApplier, MutationKind, MutationOutcome, PendingMutation,
};
pub use projector::{Pinned, Projection, SortKey, SortOrder, TextFields, TextFilter, project};
pub use query::{DebouncedQuery, QueryEvent, QuerySnapshot, QueryState, SearchFn};
pub use slot::{Fetcher, ResourceSlot};
