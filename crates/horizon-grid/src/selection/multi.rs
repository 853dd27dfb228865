//! Multi selection.

use indexmap::IndexMap;

use super::event::{EventSource, SelectionEvent};
use super::model::{EventSink, SelectionHandler, net_changes};
use crate::data::{IdentityFn, Item, ItemId};
use crate::error::Result;

/// An insertion-ordered set of selected items, keyed by identity.
pub struct MultiSelection<T, I> {
    selected: IndexMap<I, T>,
    identity: IdentityFn<T, I>,
    sink: EventSink<T>,
}

impl<T: Item, I: ItemId> MultiSelection<T, I> {
    /// Creates an empty multi selection.
    pub fn new(identity: IdentityFn<T, I>, sink: EventSink<T>) -> Self {
        Self {
            selected: IndexMap::new(),
            identity,
            sink,
        }
    }

    /// Selects every item in `items` as one batch.
    pub fn select_all(&mut self, items: Vec<T>, source: EventSource) -> bool {
        self.update_selection(items, Vec::new(), source)
            .unwrap_or(false)
    }

    /// Returns `true` if `id` is selected.
    pub fn contains_id(&self, id: &I) -> bool {
        self.selected.contains_key(id)
    }
}

impl<T: Item, I: ItemId> SelectionHandler<T, I> for MultiSelection<T, I> {
    fn update_selection(&mut self, to_add: Vec<T>, to_remove: Vec<T>, source: EventSource) -> Result<bool> {
        let (add, remove) = net_changes(&self.identity, to_add, to_remove);
        let add: Vec<(I, T)> = add
            .into_iter()
            .filter(|(id, _)| !self.selected.contains_key(id))
            .collect();
        let remove: Vec<I> = remove
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| self.selected.contains_key(id))
            .collect();
        if add.is_empty() && remove.is_empty() {
            return Ok(false);
        }

        let old_selection = self.selected_items();
        let removed = remove
            .iter()
            .filter_map(|id| self.selected.shift_remove(id))
            .collect();
        let added = add.iter().map(|(_, item)| item.clone()).collect();
        self.selected.extend(add);

        self.sink.emit(SelectionEvent {
            added,
            removed,
            old_selection,
            new_selection: self.selected_items(),
            source,
        });
        Ok(true)
    }

    fn is_selected(&self, item: &T) -> bool {
        self.selected.contains_key(&(self.identity)(item))
    }

    fn selected_items(&self) -> Vec<T> {
        self.selected.values().cloned().collect()
    }

    fn set_identity(&mut self, identity: IdentityFn<T, I>) {
        self.selected = std::mem::take(&mut self.selected)
            .into_values()
            .map(|item| (identity(&item), item))
            .collect();
        self.identity = identity;
    }

    fn selected_count(&self) -> usize {
        self.selected.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;

    use horizon_grid_core::Signal;
    use parking_lot::Mutex;

    type Events = Arc<Mutex<Vec<SelectionEvent<String>>>>;

    fn model() -> (MultiSelection<String, String>, Events) {
        let signal = Arc::new(Signal::new());
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let e = events.clone();
        signal.connect(move |event: &SelectionEvent<String>| e.lock().push(event.clone()));
        let sink = EventSink::new(signal, 0, Arc::new(AtomicU64::new(0)));
        (MultiSelection::new(Arc::new(|s: &String| s.clone()), sink), events)
    }

    fn s(value: &str) -> String {
        value.to_string()
    }

    #[test]
    fn test_select_is_idempotent() {
        let (mut model, events) = model();
        assert!(model.select(s("x")));
        assert!(!model.select(s("x")));
        assert!(!model.deselect(&s("y")));
        assert_eq!(events.lock().len(), 1);
        assert_eq!(model.selected_count(), 1);
    }

    #[test]
    fn test_batch_update_is_atomic() {
        let (mut model, events) = model();
        model.select(s("x"));
        model.select(s("z"));
        events.lock().clear();

        let changed = model
            .update_selection(vec![s("x"), s("y")], vec![s("z")], EventSource::Server)
            .unwrap();
        assert!(changed);

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].added, vec![s("y")]);
        assert_eq!(events[0].removed, vec![s("z")]);
        assert_eq!(events[0].old_selection, vec![s("x"), s("z")]);
        assert_eq!(events[0].new_selection, vec![s("x"), s("y")]);
    }

    #[test]
    fn test_overlap_is_net_no_op() {
        let (mut model, events) = model();
        let changed = model
            .update_selection(vec![s("a")], vec![s("a")], EventSource::Client)
            .unwrap();
        assert!(!changed);
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_selection_order_survives_removal() {
        let (mut model, _) = model();
        model.select_all(vec![s("a"), s("b"), s("c")], EventSource::Server);
        model.deselect(&s("b"));
        model.select(s("b"));
        assert_eq!(model.selected_items(), vec![s("a"), s("c"), s("b")]);
        assert!(model.deselect_all(EventSource::Server));
        assert_eq!(model.selected_count(), 0);
    }

    #[test]
    fn test_set_identity_rekeys() {
        let (mut model, _) = model();
        model.select(s("Foo"));
        model.set_identity(Arc::new(|s: &String| s.to_lowercase()));
        assert!(model.is_selected(&s("FOO")));
        assert!(model.contains_id(&s("foo")));
    }
}
