//! In-memory item source.
//!
//! `InMemorySource<T, I>` serves a materialized `Vec<T>`. It always knows its
//! exact size, sorts and filters in memory, and can resolve the index of an
//! item by scanning its filtered, sorted view.

use std::sync::Arc;

use parking_lot::RwLock;

use super::query::{FilterFn, Query};
use super::sort::{CompareFn, Comparators};
use super::source::{DataSource, IdentityFn, Item, ItemCount, ItemId, SourceKind, SourceSignals};
use crate::error::Result;

/// An item source backed by an in-memory collection.
///
/// # Example
///
/// ```
/// use horizon_grid::data::{DataSource, InMemorySource, Query, SortOrder};
///
/// let source = InMemorySource::new(vec!["pear".to_string(), "apple".to_string()])
///     .with_comparator("name", |a: &String, b: &String| a.cmp(b));
///
/// let query = Query::new(0, 10).with_sort(vec![SortOrder::asc("name")]);
/// assert_eq!(source.fetch(&query), vec!["apple".to_string(), "pear".to_string()]);
/// ```
pub struct InMemorySource<T, I> {
    items: RwLock<Vec<T>>,
    identity: IdentityFn<T, I>,
    comparators: RwLock<Comparators<T>>,
    /// Provider-level filter, combined with the query's filter.
    filter: RwLock<Option<FilterFn<T>>>,
    signals: SourceSignals<T>,
}

impl<T: Item + ItemId> InMemorySource<T, T> {
    /// Creates a source whose items are their own identity.
    pub fn new(items: Vec<T>) -> Self {
        Self::with_identity(items, T::clone)
    }
}

impl<T: Item, I: ItemId> InMemorySource<T, I> {
    /// Creates a source with a custom identity function (natural keys).
    pub fn with_identity<F>(items: Vec<T>, identity: F) -> Self
    where
        F: Fn(&T) -> I + Send + Sync + 'static,
    {
        Self {
            items: RwLock::new(items),
            identity: Arc::new(identity),
            comparators: RwLock::new(Comparators::default()),
            filter: RwLock::new(None),
            signals: SourceSignals::new(),
        }
    }

    /// Registers the comparator used for sort orders on `field`.
    pub fn with_comparator<F>(self, field: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&T, &T) -> std::cmp::Ordering + Send + Sync + 'static,
    {
        self.comparators.write().insert(field, Arc::new(compare) as CompareFn<T>);
        self
    }

    /// Returns the number of backing items, ignoring filters.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if there are no backing items.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Returns a snapshot of the backing items.
    pub fn items(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// Appends an item.
    pub fn push(&self, item: T) {
        self.items.write().push(item);
        self.signals.refresh_all.emit(());
    }

    /// Inserts an item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&self, index: usize, item: T) {
        self.items.write().insert(index, item);
        self.signals.refresh_all.emit(());
    }

    /// Removes and returns the item at `index`, if any.
    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.items.write();
            (index < items.len()).then(|| items.remove(index))
        };
        if removed.is_some() {
            self.signals.refresh_all.emit(());
        }
        removed
    }

    /// Modifies the item at `index` in place and emits an item refresh.
    ///
    /// Returns `false` if `index` is out of bounds.
    pub fn modify<F>(&self, index: usize, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let updated = {
            let mut items = self.items.write();
            items.get_mut(index).map(|item| {
                f(item);
                item.clone()
            })
        };
        match updated {
            Some(item) => {
                self.signals.refresh_item.emit(item);
                true
            }
            None => false,
        }
    }

    /// Replaces all items.
    pub fn set_items(&self, items: Vec<T>) {
        *self.items.write() = items;
        self.signals.refresh_all.emit(());
    }

    /// Sets the provider-level filter.
    pub fn set_filter<F>(&self, filter: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        *self.filter.write() = Some(Arc::new(filter));
        self.signals.layout_changed.emit(());
    }

    /// Clears the provider-level filter.
    pub fn clear_filter(&self) {
        *self.filter.write() = None;
        self.signals.layout_changed.emit(());
    }

    /// Registers a comparator at runtime.
    pub fn set_comparator<F>(&self, field: impl Into<String>, compare: F)
    where
        F: Fn(&T, &T) -> std::cmp::Ordering + Send + Sync + 'static,
    {
        self.comparators.write().insert(field, Arc::new(compare) as CompareFn<T>);
        self.signals.layout_changed.emit(());
    }

    fn passes(&self, query: &Query<T>, item: &T) -> bool {
        let provider_filter = self.filter.read();
        provider_filter.as_ref().is_none_or(|filter| filter(item)) && query.matches(item)
    }

    /// The filtered, sorted view the query addresses.
    fn materialize(&self, query: &Query<T>) -> Vec<T> {
        let mut view: Vec<T> = self
            .items
            .read()
            .iter()
            .filter(|item| self.passes(query, item))
            .cloned()
            .collect();
        self.comparators.read().sort(query.sort_orders(), &mut view);
        view
    }
}

impl<T: Item, I: ItemId> DataSource<T> for InMemorySource<T, I> {
    type Id = I;

    fn kind(&self) -> SourceKind {
        SourceKind::InMemory
    }

    fn fetch(&self, query: &Query<T>) -> Vec<T> {
        self.materialize(query)
            .into_iter()
            .skip(query.offset())
            .take(query.limit())
            .collect()
    }

    fn size(&self, query: &Query<T>) -> ItemCount {
        let count = self
            .items
            .read()
            .iter()
            .filter(|item| self.passes(query, item))
            .count();
        ItemCount::Exact(count)
    }

    fn id(&self, item: &T) -> I {
        (self.identity)(item)
    }

    fn index_of(&self, id: &I, query: &Query<T>) -> Result<Option<usize>> {
        Ok(self
            .materialize(query)
            .iter()
            .position(|item| (self.identity)(item) == *id))
    }

    fn contains(&self, id: &I) -> Result<bool> {
        Ok(self.items.read().iter().any(|item| (self.identity)(item) == *id))
    }

    fn signals(&self) -> &SourceSignals<T> {
        &self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SortOrder;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        id: u32,
        name: String,
        age: u32,
    }

    fn person(id: u32, name: &str, age: u32) -> Person {
        Person {
            id,
            name: name.into(),
            age,
        }
    }

    fn people() -> InMemorySource<Person, u32> {
        InMemorySource::with_identity(
            vec![
                person(1, "Charlie", 35),
                person(2, "Alice", 30),
                person(3, "Bob", 25),
            ],
            |p: &Person| p.id,
        )
        .with_comparator("name", |a: &Person, b: &Person| a.name.cmp(&b.name))
        .with_comparator("age", |a: &Person, b: &Person| a.age.cmp(&b.age))
    }

    #[test]
    fn test_fetch_slice() {
        let source = people();
        let page = source.fetch(&Query::new(1, 5));
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "Alice");
        assert!(source.fetch(&Query::new(10, 5)).is_empty());
    }

    #[test]
    fn test_sorted_fetch() {
        let source = people();
        let query = Query::new(0, 3).with_sort(vec![SortOrder::asc("name")]);
        let names: Vec<_> = source.fetch(&query).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);

        let query = Query::new(0, 1).with_sort(vec![SortOrder::desc("age")]);
        assert_eq!(source.fetch(&query)[0].name, "Charlie");
    }

    #[test]
    fn test_filtered_size_and_fetch() {
        let source = people();
        let adults: FilterFn<Person> = Arc::new(|p: &Person| p.age >= 30);
        let query = Query::new(0, 10).with_filter(Some(adults));
        assert_eq!(source.size(&query), ItemCount::Exact(2));
        assert_eq!(source.fetch(&query).len(), 2);

        source.set_filter(|p: &Person| p.name != "Alice");
        assert_eq!(source.size(&query), ItemCount::Exact(1));
        assert_eq!(source.size(&Query::unbounded()), ItemCount::Exact(2));
    }

    #[test]
    fn test_index_of_follows_sort() {
        let source = people();
        let query = Query::<Person>::unbounded().with_sort(vec![SortOrder::asc("name")]);
        assert_eq!(source.index_of(&1, &query), Ok(Some(2)));
        assert_eq!(source.index_of(&99, &query), Ok(None));
    }

    #[test]
    fn test_contains_ignores_filter() {
        let source = people();
        source.set_filter(|p: &Person| p.id != 1);
        assert_eq!(source.contains(&1), Ok(true));
        assert_eq!(source.contains(&4), Ok(false));
    }

    #[test]
    fn test_mutations_signal_refresh() {
        let source = people();
        let refreshes = Arc::new(Mutex::new(0));
        let items = Arc::new(Mutex::new(Vec::new()));

        let r = refreshes.clone();
        source.signals().refresh_all.connect(move |_| *r.lock() += 1);
        let i = items.clone();
        source
            .signals()
            .refresh_item
            .connect(move |p: &Person| i.lock().push(p.clone()));

        source.push(person(4, "Dana", 40));
        assert_eq!(source.remove(0).map(|p| p.id), Some(1));
        assert!(source.remove(10).is_none());
        assert!(source.modify(0, |p| p.age += 1));
        assert!(!source.modify(10, |p| p.age += 1));

        assert_eq!(*refreshes.lock(), 2);
        let items = items.lock();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], person(2, "Alice", 31));
    }

    #[test]
    fn test_filter_and_comparator_signal_layout() {
        let source = people();
        let refreshes = Arc::new(Mutex::new(0));
        let layouts = Arc::new(Mutex::new(0));

        let r = refreshes.clone();
        source.signals().refresh_all.connect(move |_| *r.lock() += 1);
        let l = layouts.clone();
        source.signals().layout_changed.connect(move |_| *l.lock() += 1);

        source.set_filter(|p: &Person| p.age > 30);
        source.clear_filter();
        source.set_comparator("id", |a: &Person, b: &Person| a.id.cmp(&b.id));

        assert_eq!(*layouts.lock(), 3);
        assert_eq!(*refreshes.lock(), 0);
    }

    #[test]
    fn test_value_identity() {
        let source = InMemorySource::new(vec!["foo".to_string(), "bar".to_string()]);
        assert_eq!(source.id(&"foo".to_string()), "foo");
        assert_eq!(source.kind(), SourceKind::InMemory);
        assert_eq!(source.len(), 2);
    }
}
