//! Hierarchical in-memory item source.
//!
//! A `TreeSource` holds root items and, per parent identity, a list of
//! children. The index space it exposes is the depth-first flattening of the
//! tree over expanded nodes: a collapsed node contributes only itself. The
//! query filter hides a node together with its whole subtree, and sort
//! orders apply among siblings.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use super::query::Query;
use super::sort::{CompareFn, Comparators};
use super::source::{DataSource, IdentityFn, Item, ItemCount, ItemId, SourceKind, SourceSignals};
use crate::error::{GridError, Result};

struct TreeState<T, I> {
    roots: Vec<T>,
    children: HashMap<I, Vec<T>>,
    expanded: HashSet<I>,
}

/// An in-memory tree flattened over its expanded nodes.
pub struct TreeSource<T, I> {
    state: RwLock<TreeState<T, I>>,
    identity: IdentityFn<T, I>,
    comparators: RwLock<Comparators<T>>,
    signals: SourceSignals<T>,
}

impl<T: Item + ItemId> TreeSource<T, T> {
    /// Creates a tree whose items are their own identity.
    pub fn new(roots: Vec<T>) -> Self {
        Self::with_identity(roots, T::clone)
    }
}

impl<T: Item, I: ItemId> TreeSource<T, I> {
    /// Creates a tree with a custom identity function.
    pub fn with_identity<F>(roots: Vec<T>, identity: F) -> Self
    where
        F: Fn(&T) -> I + Send + Sync + 'static,
    {
        Self {
            state: RwLock::new(TreeState {
                roots,
                children: HashMap::new(),
                expanded: HashSet::new(),
            }),
            identity: Arc::new(identity),
            comparators: RwLock::new(Comparators::default()),
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

    /// Appends a root item.
    pub fn add_root(&self, item: T) {
        self.state.write().roots.push(item);
        self.signals.refresh_all.emit(());
    }

    /// Appends `child` under the node identified by `parent`.
    ///
    /// Returns `NotFound` if no node has that identity.
    pub fn add_child(&self, parent: &I, child: T) -> Result<()> {
        {
            let mut state = self.state.write();
            if !self.contains_in(&state, parent) {
                return Err(GridError::not_found(format!("parent node {parent:?}")));
            }
            state.children.entry(parent.clone()).or_default().push(child);
        }
        self.signals.refresh_all.emit(());
        Ok(())
    }

    /// Returns the direct children of `parent`.
    pub fn children_of(&self, parent: &I) -> Vec<T> {
        self.state
            .read()
            .children
            .get(parent)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `true` if `id` has at least one child.
    pub fn has_children(&self, id: &I) -> bool {
        self.state
            .read()
            .children
            .get(id)
            .is_some_and(|children| !children.is_empty())
    }

    /// Expands a node and signals a layout change. Returns `false` if it was
    /// already expanded.
    pub fn expand(&self, id: &I) -> bool {
        let changed = self.state.write().expanded.insert(id.clone());
        if changed {
            self.signals.layout_changed.emit(());
        }
        changed
    }

    /// Collapses a node. Returns `false` if it was not expanded.
    pub fn collapse(&self, id: &I) -> bool {
        let changed = self.state.write().expanded.remove(id);
        if changed {
            self.signals.layout_changed.emit(());
        }
        changed
    }

    /// Returns `true` if the node is expanded.
    pub fn is_expanded(&self, id: &I) -> bool {
        self.state.read().expanded.contains(id)
    }

    fn contains_in(&self, state: &TreeState<T, I>, id: &I) -> bool {
        let identity = &self.identity;
        state.roots.iter().any(|item| identity(item) == *id)
            || state
                .children
                .values()
                .flatten()
                .any(|item| identity(item) == *id)
    }

    /// Depth-first flattening of the visible nodes.
    fn flatten(&self, query: &Query<T>) -> Vec<T> {
        let state = self.state.read();
        let comparators = self.comparators.read();
        let mut out = Vec::new();
        let mut stack: Vec<T> = self.visible_siblings(&state.roots, &comparators, query);
        stack.reverse();

        while let Some(node) = stack.pop() {
            let id = (self.identity)(&node);
            if state.expanded.contains(&id) {
                if let Some(children) = state.children.get(&id) {
                    let mut visible = self.visible_siblings(children, &comparators, query);
                    visible.reverse();
                    stack.extend(visible);
                }
            }
            out.push(node);
        }
        out
    }

    fn visible_siblings(&self, siblings: &[T], comparators: &Comparators<T>, query: &Query<T>) -> Vec<T> {
        let mut visible: Vec<T> = siblings.iter().filter(|item| query.matches(item)).cloned().collect();
        comparators.sort(query.sort_orders(), &mut visible);
        visible
    }
}

impl<T: Item, I: ItemId> DataSource<T> for TreeSource<T, I> {
    type Id = I;

    fn kind(&self) -> SourceKind {
        SourceKind::Hierarchical
    }

    fn fetch(&self, query: &Query<T>) -> Vec<T> {
        self.flatten(query)
            .into_iter()
            .skip(query.offset())
            .take(query.limit())
            .collect()
    }

    fn size(&self, query: &Query<T>) -> ItemCount {
        ItemCount::Exact(self.flatten(query).len())
    }

    fn id(&self, item: &T) -> I {
        (self.identity)(item)
    }

    fn index_of(&self, id: &I, query: &Query<T>) -> Result<Option<usize>> {
        Ok(self
            .flatten(query)
            .iter()
            .position(|item| (self.identity)(item) == *id))
    }

    fn contains(&self, id: &I) -> Result<bool> {
        Ok(self.contains_in(&self.state.read(), id))
    }

    fn signals(&self) -> &SourceSignals<T> {
        &self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SortOrder;

    fn tree() -> TreeSource<&'static str, &'static str> {
        let tree = TreeSource::new(vec!["b", "a"])
            .with_comparator("name", |x: &&'static str, y: &&'static str| x.cmp(y));
        tree.add_child(&"a", "a2").unwrap();
        tree.add_child(&"a", "a1").unwrap();
        tree.add_child(&"a1", "a1x").unwrap();
        tree.add_child(&"b", "b1").unwrap();
        tree
    }

    #[test]
    fn test_collapsed_tree_shows_roots() {
        let tree = tree();
        assert_eq!(tree.fetch(&Query::unbounded()), vec!["b", "a"]);
        assert_eq!(tree.size(&Query::unbounded()), ItemCount::Exact(2));
        assert_eq!(tree.kind(), SourceKind::Hierarchical);
    }

    #[test]
    fn test_expanded_flattening() {
        let tree = tree();
        assert!(tree.expand(&"a"));
        assert!(!tree.expand(&"a"));
        tree.expand(&"a1");

        let query = Query::unbounded().with_sort(vec![SortOrder::asc("name")]);
        assert_eq!(tree.fetch(&query), vec!["a", "a1", "a1x", "a2", "b"]);
        assert_eq!(tree.index_of(&"a2", &query), Ok(Some(3)));
        assert_eq!(tree.index_of(&"b1", &query), Ok(None));
        let page = Query::new(1, 2).with_sort(vec![SortOrder::asc("name")]);
        assert_eq!(tree.fetch(&page), vec!["a1", "a1x"]);

        assert!(tree.collapse(&"a"));
        assert_eq!(tree.size(&query), ItemCount::Exact(2));
        assert!(tree.is_expanded(&"a1"));
    }

    #[test]
    fn test_expansion_signals_layout_not_refresh() {
        let tree = tree();
        let refreshes = Arc::new(parking_lot::Mutex::new(0));
        let layouts = Arc::new(parking_lot::Mutex::new(0));
        let r = refreshes.clone();
        tree.signals().refresh_all.connect(move |_| *r.lock() += 1);
        let l = layouts.clone();
        tree.signals().layout_changed.connect(move |_| *l.lock() += 1);

        tree.expand(&"a");
        tree.expand(&"a");
        tree.collapse(&"a");
        tree.add_child(&"b", "b2").unwrap();

        assert_eq!(*layouts.lock(), 2);
        assert_eq!(*refreshes.lock(), 1);
    }

    #[test]
    fn test_filter_hides_subtree() {
        let tree = tree();
        tree.expand(&"a");
        tree.expand(&"a1");
        let hide_a1: crate::data::FilterFn<&'static str> = Arc::new(|n: &&'static str| *n != "a1");
        let query = Query::unbounded().with_filter(Some(hide_a1));
        assert_eq!(tree.fetch(&query), vec!["b", "a", "a2"]);
    }

    #[test]
    fn test_contains_searches_collapsed_nodes() {
        let tree = tree();
        assert_eq!(tree.contains(&"a1x"), Ok(true));
        assert_eq!(tree.contains(&"zzz"), Ok(false));
        assert!(tree.has_children(&"a1"));
        assert_eq!(tree.children_of(&"a"), vec!["a2", "a1"]);
    }

    #[test]
    fn test_add_child_to_unknown_parent() {
        let tree = tree();
        assert!(matches!(tree.add_child(&"nope", "x"), Err(GridError::NotFound(_))));
    }
}
