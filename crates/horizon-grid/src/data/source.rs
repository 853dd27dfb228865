//! The item source contract.
//!
//! Every source, whether backed by an in-memory collection or by callbacks
//! into an application backend, is normalized to [`DataSource`]: a
//! side-effect-free `fetch` of a slice, a `size` that may be unknown, and an
//! identity function that decides which values are the same logical row.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use horizon_grid_core::Signal;

use super::query::Query;
use crate::error::{GridError, Result};

/// Values that can be served as grid items.
pub trait Item: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Item for T {}

/// Values that can serve as item identities.
pub trait ItemId: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> ItemId for T {}

/// Type alias for an identity function.
pub type IdentityFn<T, I> = Arc<dyn Fn(&T) -> I + Send + Sync>;

/// Number of items a source reports for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCount {
    /// The exact number of items matching the query.
    Exact(usize),
    /// The source cannot count; consumers must grow by probing.
    Unknown,
}

impl ItemCount {
    /// The exact count, if known.
    pub fn exact(self) -> Option<usize> {
        match self {
            Self::Exact(count) => Some(count),
            Self::Unknown => None,
        }
    }
}

/// The kind of a source, which decides what the engine may ask of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Materialized flat collection: exact size, enumerable.
    InMemory,
    /// Callback source with a count callback.
    Sized,
    /// Callback source without a count callback.
    Unsized,
    /// Materialized tree flattened over its expanded nodes.
    Hierarchical,
}

impl SourceKind {
    /// Lazy sources cannot be enumerated without calling back into the application.
    pub fn is_lazy(self) -> bool {
        matches!(self, Self::Sized | Self::Unsized)
    }

    /// Returns `true` for the tree-shaped kind.
    pub fn is_hierarchical(self) -> bool {
        self == Self::Hierarchical
    }
}

/// Invalidation notifications sent by a source to every component bound to it.
pub struct SourceSignals<T> {
    /// The whole data set may have changed (reload, items added or removed).
    pub refresh_all: Signal<()>,
    /// The same items are laid out differently: order, visibility or expansion.
    pub layout_changed: Signal<()>,
    /// One item changed; carries the new instance.
    pub refresh_item: Signal<T>,
}

impl<T: 'static> Default for SourceSignals<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> SourceSignals<T> {
    /// Creates a new set of source signals.
    pub fn new() -> Self {
        Self {
            refresh_all: Signal::new(),
            layout_changed: Signal::new(),
            refresh_item: Signal::new(),
        }
    }
}

/// The uniform item source contract.
///
/// # Contract
///
/// - `fetch` and `size` are idempotent and must not mutate application state.
///   A source may be shared read-only between several components.
/// - `id` must be deterministic: the same logical row must always produce an
///   equal id. A source whose identity changes for a row that is already
///   mapped violates this contract, and the engine's behavior is undefined.
pub trait DataSource<T: Item>: Send + Sync {
    /// Identity type of this source's items.
    type Id: ItemId;

    /// The kind of this source.
    fn kind(&self) -> SourceKind;

    /// Returns at most `query.limit()` items starting at `query.offset()`.
    fn fetch(&self, query: &Query<T>) -> Vec<T>;

    /// Returns the number of items matching the query's filter.
    fn size(&self, query: &Query<T>) -> ItemCount;

    /// Returns the identity of `item`.
    fn id(&self, item: &T) -> Self::Id;

    /// Returns the index of the item with identity `id` under the query's
    /// filter and sort, `Ok(None)` if there is no such item.
    ///
    /// The default reports the capability as unsupported.
    fn index_of(&self, _id: &Self::Id, _query: &Query<T>) -> Result<Option<usize>> {
        Err(GridError::unsupported(
            "index_of",
            format!("{:?} source has no index provider", self.kind()),
        ))
    }

    /// Returns `true` if an item with identity `id` exists, ignoring filters.
    ///
    /// The default reports the capability as unsupported.
    fn contains(&self, _id: &Self::Id) -> Result<bool> {
        Err(GridError::unsupported(
            "contains",
            format!("{:?} source cannot be enumerated", self.kind()),
        ))
    }

    /// The source's invalidation signals.
    fn signals(&self) -> &SourceSignals<T>;

    /// Notifies bound components that all data may have changed.
    fn refresh_all(&self) {
        self.signals().refresh_all.emit(());
    }

    /// Notifies bound components that the index space was rearranged
    /// without changing the data.
    fn layout_changed(&self) {
        self.signals().layout_changed.emit(());
    }

    /// Notifies bound components that `item` changed.
    fn refresh_item(&self, item: T) {
        self.signals().refresh_item.emit(item);
    }
}

/// A shareable, type-erased source handle.
pub type SharedSource<T, I> = Arc<dyn DataSource<T, Id = I>>;

/// Builds an identity function that delegates to `source`.
pub fn identity_of<T: Item, I: ItemId>(source: &SharedSource<T, I>) -> IdentityFn<T, I> {
    let source = source.clone();
    Arc::new(move |item: &T| source.id(item))
}

static_assertions::assert_impl_all!(SharedSource<String, String>: Send, Sync);
