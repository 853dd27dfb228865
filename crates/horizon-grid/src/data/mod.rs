//! Item source adapters.
//!
//! Everything the engine knows about application data goes through the
//! [`DataSource`] trait. Three implementations are provided:
//!
//! - [`InMemorySource`]: a materialized flat collection
//! - [`CallbackSource`]: fetch (and optionally count) callbacks into the application
//! - [`TreeSource`]: an in-memory tree flattened over its expanded nodes

mod callback;
mod in_memory;
mod query;
mod sort;
mod source;
mod tree;

pub use callback::{CallbackSource, CountCallback, FetchCallback, IndexCallback};
pub use in_memory::InMemorySource;
pub use query::{FilterFn, Query, SortDirection, SortOrder};
pub use sort::{CompareFn, Comparators};
pub use source::{
    DataSource, IdentityFn, Item, ItemCount, ItemId, SharedSource, SourceKind, SourceSignals,
    identity_of,
};
pub use tree::TreeSource;
