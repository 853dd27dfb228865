//! Callback-backed (lazy) item source.
//!
//! A `CallbackSource` forwards every query to application callbacks, usually
//! a database or a remote service. With a count callback it reports an exact
//! size ([`SourceKind::Sized`]); without one its size is unknown and consumers
//! grow the index space by probing ([`SourceKind::Unsized`]).

use std::sync::Arc;

use horizon_grid_core::logging::targets;

use super::query::Query;
use super::source::{DataSource, IdentityFn, Item, ItemCount, ItemId, SourceKind, SourceSignals};
use crate::error::{GridError, Result};

/// Type alias for a fetch callback.
pub type FetchCallback<T> = Arc<dyn Fn(&Query<T>) -> Vec<T> + Send + Sync>;

/// Type alias for a count callback.
pub type CountCallback<T> = Arc<dyn Fn(&Query<T>) -> usize + Send + Sync>;

/// Type alias for an index provider: maps an identity to its index under a query.
pub type IndexCallback<T, I> = Arc<dyn Fn(&I, &Query<T>) -> Option<usize> + Send + Sync>;

/// An item source defined by callbacks.
///
/// # Example
///
/// ```
/// use horizon_grid::data::{CallbackSource, DataSource, ItemCount, Query, SourceKind};
///
/// let source = CallbackSource::new(|query: &Query<u64>| {
///     (query.offset() as u64..query.end().min(1000) as u64).collect()
/// })
/// .with_count(|_query: &Query<u64>| 1000);
///
/// assert_eq!(source.kind(), SourceKind::Sized);
/// assert_eq!(source.size(&Query::unbounded()), ItemCount::Exact(1000));
/// assert_eq!(source.fetch(&Query::new(10, 3)), vec![10, 11, 12]);
/// ```
pub struct CallbackSource<T, I> {
    fetch: FetchCallback<T>,
    count: Option<CountCallback<T>>,
    index_provider: Option<IndexCallback<T, I>>,
    identity: IdentityFn<T, I>,
    signals: SourceSignals<T>,
}

impl<T: Item + ItemId> CallbackSource<T, T> {
    /// Creates an unknown-size source whose items are their own identity.
    pub fn new<F>(fetch: F) -> Self
    where
        F: Fn(&Query<T>) -> Vec<T> + Send + Sync + 'static,
    {
        Self::with_identity(fetch, T::clone)
    }
}

impl<T: Item, I: ItemId> CallbackSource<T, I> {
    /// Creates an unknown-size source with a custom identity function.
    pub fn with_identity<F, G>(fetch: F, identity: G) -> Self
    where
        F: Fn(&Query<T>) -> Vec<T> + Send + Sync + 'static,
        G: Fn(&T) -> I + Send + Sync + 'static,
    {
        Self {
            fetch: Arc::new(fetch),
            count: None,
            index_provider: None,
            identity: Arc::new(identity),
            signals: SourceSignals::new(),
        }
    }

    /// Adds a count callback, making the source's size exact.
    pub fn with_count<F>(mut self, count: F) -> Self
    where
        F: Fn(&Query<T>) -> usize + Send + Sync + 'static,
    {
        self.count = Some(Arc::new(count));
        self
    }

    /// Adds an index provider, enabling scroll-to-item.
    pub fn with_index_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(&I, &Query<T>) -> Option<usize> + Send + Sync + 'static,
    {
        self.index_provider = Some(Arc::new(provider));
        self
    }

    /// Returns `true` if an index provider is configured.
    pub fn has_index_provider(&self) -> bool {
        self.index_provider.is_some()
    }
}

impl<T: Item, I: ItemId> DataSource<T> for CallbackSource<T, I> {
    type Id = I;

    fn kind(&self) -> SourceKind {
        if self.count.is_some() {
            SourceKind::Sized
        } else {
            SourceKind::Unsized
        }
    }

    fn fetch(&self, query: &Query<T>) -> Vec<T> {
        let mut items = (self.fetch)(query);
        if items.len() > query.limit() {
            tracing::warn!(
                target: targets::SOURCE,
                returned = items.len(),
                limit = query.limit(),
                "fetch callback returned more items than requested, truncating"
            );
            items.truncate(query.limit());
        }
        items
    }

    fn size(&self, query: &Query<T>) -> ItemCount {
        match &self.count {
            Some(count) => ItemCount::Exact(count(query)),
            None => ItemCount::Unknown,
        }
    }

    fn id(&self, item: &T) -> I {
        (self.identity)(item)
    }

    fn index_of(&self, id: &I, query: &Query<T>) -> Result<Option<usize>> {
        match &self.index_provider {
            Some(provider) => Ok(provider(id, query)),
            None => Err(GridError::unsupported(
                "index_of",
                "lazy source has no index provider",
            )),
        }
    }

    fn signals(&self) -> &SourceSignals<T> {
        &self.signals
    }
}
