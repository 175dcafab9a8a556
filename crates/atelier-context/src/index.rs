//! The retrieval index: snapshot, store, and the indexing workflow.

mod indexer;
mod snapshot;
mod store;

pub use indexer::{IndexObserver, IndexSummary, Indexer};
pub use snapshot::IndexSnapshot;
pub use store::{IndexStatus, IndexStore};
