//! Queries passed to item sources.
//!
//! A [`Query`] carries the requested slice (`offset`, `limit`), the ordered
//! sort specification and an opaque filter predicate. The engine never
//! interprets sort orders or filters itself; it hands them to the source.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Type alias for an opaque filter predicate.
///
/// Returns `true` if the item should be included.
pub type FilterFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Sort direction for one sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One `(field, direction)` pair of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    /// Identifier of the field (column) to sort by.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortOrder {
    /// Ascending order on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending order on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// A request for a slice of items.
pub struct Query<T> {
    offset: usize,
    limit: usize,
    sort: Vec<SortOrder>,
    filter: Option<FilterFn<T>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            offset: self.offset,
            limit: self.limit,
            sort: self.sort.clone(),
            filter: self.filter.clone(),
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("sort", &self.sort)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

impl<T> Query<T> {
    /// Creates a query for `limit` items starting at `offset`.
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            sort: Vec::new(),
            filter: None,
        }
    }

    /// Creates a query covering every item. Used for counting and lookups.
    pub fn unbounded() -> Self {
        Self::new(0, usize::MAX)
    }

    /// Sets the sort orders.
    pub fn with_sort(mut self, sort: Vec<SortOrder>) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the filter predicate.
    pub fn with_filter(mut self, filter: Option<FilterFn<T>>) -> Self {
        self.filter = filter;
        self
    }

    /// Index of the first requested item.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Maximum number of requested items.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Exclusive end of the requested slice, saturating at `usize::MAX`.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }

    /// Sort orders, most significant first.
    pub fn sort_orders(&self) -> &[SortOrder] {
        &self.sort
    }

    /// The filter predicate, if any.
    pub fn filter(&self) -> Option<&FilterFn<T>> {
        self.filter.as_ref()
    }

    /// Returns `true` if `item` passes the filter (or there is none).
    pub fn matches(&self, item: &T) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(item))
    }
}
