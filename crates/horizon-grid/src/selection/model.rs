//! The selection handler contract and the closed set of selection models.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use horizon_grid_core::Signal;
use horizon_grid_core::logging::targets;

use super::event::{EventSource, SelectionEvent};
use super::multi::MultiSelection;
use super::single::SingleSelection;
use super::SelectionMode;
use crate::data::{IdentityFn, Item, ItemId};
use crate::error::Result;

/// Operations shared by every selection model.
///
/// Mutations return `true` only if the selection changed; only effective
/// changes emit a [`SelectionEvent`].
pub trait SelectionHandler<T: Item, I: ItemId>: Send + Sync {
    /// Atomically adds and removes items.
    ///
    /// An identity present in both lists is a net no-op. Emits at most one event.
    fn update_selection(&mut self, to_add: Vec<T>, to_remove: Vec<T>, source: EventSource) -> Result<bool>;

    /// Returns `true` if an item with `item`'s identity is selected.
    fn is_selected(&self, item: &T) -> bool;

    /// The selected items, in selection order.
    fn selected_items(&self) -> Vec<T>;

    /// Replaces the identity function used for membership.
    fn set_identity(&mut self, identity: IdentityFn<T, I>);

    /// Number of selected items.
    fn selected_count(&self) -> usize {
        self.selected_items().len()
    }

    /// Selects `item` on behalf of the application.
    fn select(&mut self, item: T) -> bool {
        self.update_selection(vec![item], Vec::new(), EventSource::Server)
            .unwrap_or(false)
    }

    /// Deselects `item` on behalf of the application.
    fn deselect(&mut self, item: &T) -> bool {
        self.update_selection(Vec::new(), vec![item.clone()], EventSource::Server)
            .unwrap_or(false)
    }

    /// Selects `item` on behalf of the client.
    fn select_from_client(&mut self, item: T) -> bool {
        self.update_selection(vec![item], Vec::new(), EventSource::Client)
            .unwrap_or(false)
    }

    /// Deselects `item` on behalf of the client.
    fn deselect_from_client(&mut self, item: &T) -> bool {
        self.update_selection(Vec::new(), vec![item.clone()], EventSource::Client)
            .unwrap_or(false)
    }

    /// Clears the selection.
    fn deselect_all(&mut self, source: EventSource) -> bool {
        let selected = self.selected_items();
        self.update_selection(Vec::new(), selected, source)
            .unwrap_or(false)
    }
}

/// Delivers events of one model instance to the host's listeners.
///
/// Every model instance gets a sink tagged with its binding generation.
/// Once the host switches models, the old binding is retired and its sink
/// drops everything it is asked to emit.
pub struct EventSink<T> {
    signal: Arc<Signal<SelectionEvent<T>>>,
    binding: u64,
    active: Arc<AtomicU64>,
}

impl<T> Clone for EventSink<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            binding: self.binding,
            active: self.active.clone(),
        }
    }
}

impl<T: 'static> EventSink<T> {
    /// Creates a sink for `binding`, live while `active` holds that binding.
    pub fn new(signal: Arc<Signal<SelectionEvent<T>>>, binding: u64, active: Arc<AtomicU64>) -> Self {
        Self {
            signal,
            binding,
            active,
        }
    }

    /// A sink that is not connected to any listener.
    pub fn detached() -> Self {
        Self::new(Arc::new(Signal::new()), 0, Arc::new(AtomicU64::new(0)))
    }

    /// The binding generation of this sink.
    pub fn binding(&self) -> u64 {
        self.binding
    }

    /// Returns `true` while the sink's binding is the host's active one.
    pub fn is_current(&self) -> bool {
        self.active.load(Ordering::SeqCst) == self.binding
    }

    /// Emits `event` unless the binding was retired.
    pub fn emit(&self, event: SelectionEvent<T>) {
        if !self.is_current() {
            tracing::debug!(
                target: targets::SELECTION,
                binding = self.binding,
                "dropping event from retired selection binding"
            );
            return;
        }
        self.signal.emit(event);
    }
}

/// The model used when selection is disabled. Every mutation is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSelection;

impl<T: Item, I: ItemId> SelectionHandler<T, I> for NoSelection {
    fn update_selection(&mut self, _to_add: Vec<T>, _to_remove: Vec<T>, _source: EventSource) -> Result<bool> {
        Ok(false)
    }

    fn is_selected(&self, _item: &T) -> bool {
        false
    }

    fn selected_items(&self) -> Vec<T> {
        Vec::new()
    }

    fn set_identity(&mut self, _identity: IdentityFn<T, I>) {}

    fn selected_count(&self) -> usize {
        0
    }
}

/// The active selection model.
pub enum SelectionModel<T: Item, I: ItemId> {
    None(NoSelection),
    Single(SingleSelection<T, I>),
    Multi(MultiSelection<T, I>),
}

impl<T: Item, I: ItemId> SelectionModel<T, I> {
    /// Builds an empty model for `mode`.
    pub fn build(mode: SelectionMode, identity: IdentityFn<T, I>, sink: EventSink<T>) -> Self {
        match mode {
            SelectionMode::None => Self::None(NoSelection),
            SelectionMode::Single => Self::Single(SingleSelection::new(identity, sink)),
            SelectionMode::Multi => Self::Multi(MultiSelection::new(identity, sink)),
        }
    }

    /// The mode of this model.
    pub fn mode(&self) -> SelectionMode {
        match self {
            Self::None(_) => SelectionMode::None,
            Self::Single(_) => SelectionMode::Single,
            Self::Multi(_) => SelectionMode::Multi,
        }
    }

    /// The model as a shared handler.
    pub fn handler(&self) -> &dyn SelectionHandler<T, I> {
        match self {
            Self::None(model) => model,
            Self::Single(model) => model,
            Self::Multi(model) => model,
        }
    }

    /// The model as a mutable shared handler.
    pub fn handler_mut(&mut self) -> &mut dyn SelectionHandler<T, I> {
        match self {
            Self::None(model) => model,
            Self::Single(model) => model,
            Self::Multi(model) => model,
        }
    }

    /// The single-selection model, if active.
    pub fn as_single_mut(&mut self) -> Option<&mut SingleSelection<T, I>> {
        match self {
            Self::Single(model) => Some(model),
            _ => None,
        }
    }
}

/// Splits a batch into net additions and removals by identity.
///
/// Duplicates are collapsed, and identities present in both lists are dropped
/// from both.
pub(crate) fn net_changes<T, I: ItemId>(
    identity: &IdentityFn<T, I>,
    to_add: Vec<T>,
    to_remove: Vec<T>,
) -> (Vec<(I, T)>, Vec<(I, T)>) {
    let add: Vec<(I, T)> = to_add.into_iter().map(|item| (identity(&item), item)).collect();
    let remove: Vec<(I, T)> = to_remove.into_iter().map(|item| (identity(&item), item)).collect();
    let add_ids: HashSet<I> = add.iter().map(|(id, _)| id.clone()).collect();
    let remove_ids: HashSet<I> = remove.iter().map(|(id, _)| id.clone()).collect();

    (
        distinct(add, |id| !remove_ids.contains(id)),
        distinct(remove, |id| !add_ids.contains(id)),
    )
}

fn distinct<T, I: ItemId>(pairs: Vec<(I, T)>, keep: impl Fn(&I) -> bool) -> Vec<(I, T)> {
    let mut seen = HashSet::new();
    pairs
        .into_iter()
        .filter(|(id, _)| keep(id) && seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_net_changes() {
        let identity: IdentityFn<&str, &str> = Arc::new(|s: &&str| *s);
        let (add, remove) = net_changes(&identity, vec!["x", "y", "y", "z"], vec!["z", "w"]);
        assert_eq!(add.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(remove.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec!["w"]);
    }

    #[test]
    fn test_no_selection_is_inert() {
        let mut model = NoSelection;
        let handler: &mut dyn SelectionHandler<u32, u32> = &mut model;
        assert!(!handler.select(1));
        assert!(!handler.is_selected(&1));
        assert_eq!(handler.selected_count(), 0);
    }

    #[test]
    fn test_retired_sink_drops_events() {
        let signal = Arc::new(Signal::new());
        let active = Arc::new(AtomicU64::new(1));
        let received = Arc::new(Mutex::new(0));
        let r = received.clone();
        signal.connect(move |_: &SelectionEvent<u32>| *r.lock() += 1);

        let sink = EventSink::new(signal, 1, active.clone());
        let event = SelectionEvent {
            added: vec![1],
            removed: Vec::new(),
            old_selection: Vec::new(),
            new_selection: vec![1],
            source: EventSource::Server,
        };
        sink.emit(event.clone());
        active.store(2, Ordering::SeqCst);
        assert!(!sink.is_current());
        sink.emit(event);
        assert_eq!(*received.lock(), 1);
    }
}
