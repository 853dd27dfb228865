//! Selection state for a grid.
//!
//! [`Selection`] owns the active [`SelectionModel`] and everything that must
//! outlive a mode switch: the listeners, the selectability predicate, the
//! preservation policy and the "needs push" flag that decides whether the
//! client must be told about the selection.
//!
//! # Server vs. Client Mutations
//!
//! Every mutation has a server entry point (`select`, `deselect`, ...) and a
//! client entry point (`select_from_client`, ...). Server mutations are never
//! gated by the selectability predicate and mark the selection for pushing.
//! Client mutations skip items the predicate rejects and are not echoed
//! back, since the client already shows them.
//!
//! # Mode Switching
//!
//! Switching modes builds a new model under a new binding generation. The
//! previous model is handed back detached: whatever it emits afterwards never
//! reaches the listeners.

mod event;
mod model;
mod multi;
mod single;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use horizon_grid_core::logging::targets;
use horizon_grid_core::{ConnectionId, Signal};
use serde::{Deserialize, Serialize};

use crate::data::{IdentityFn, Item, ItemCount, ItemId, SourceKind};
use crate::error::{GridError, Result};

pub use event::{EventSource, SelectionEvent};
pub use model::{EventSink, NoSelection, SelectionHandler, SelectionModel};
pub use multi::MultiSelection;
pub use single::SingleSelection;

/// Type alias for a selectability predicate.
pub type SelectablePredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Nothing can be selected.
    None,
    /// At most one item is selected (default).
    #[default]
    Single,
    /// Any number of items can be selected.
    Multi,
}

/// What happens to the selection when the underlying data changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectionPreservation {
    /// Clear the selection (default).
    #[default]
    Discard,
    /// Keep selected items whose identity still exists in the data.
    ///
    /// Requires an enumerable source.
    PreserveExistent,
    /// Keep every selected item.
    PreserveAll,
}

/// Visibility policy of the select-all checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectAllVisibility {
    /// Visible in multi mode for in-memory sources only.
    #[default]
    Default,
    /// Visible in multi mode.
    Visible,
    /// Never visible.
    Hidden,
}

/// State of the select-all checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SelectAllState {
    pub checked: bool,
    pub indeterminate: bool,
    pub hidden: bool,
}

impl SelectAllState {
    /// Computes the checkbox state.
    ///
    /// `total` is the filtered item count. Hierarchical sources and sources
    /// of unknown size are never reported as checked, since a complete
    /// selection cannot be verified; any selection makes them indeterminate.
    pub fn compute(
        mode: SelectionMode,
        kind: SourceKind,
        total: ItemCount,
        selected: usize,
        visibility: SelectAllVisibility,
    ) -> Self {
        let hidden = mode != SelectionMode::Multi
            || match visibility {
                SelectAllVisibility::Default => kind != SourceKind::InMemory,
                SelectAllVisibility::Visible => false,
                SelectAllVisibility::Hidden => true,
            };

        let (checked, indeterminate) = match total {
            ItemCount::Exact(total) if !kind.is_hierarchical() => {
                let checked = total > 0 && selected == total;
                (checked, selected > 0 && !checked)
            }
            _ => (false, selected > 0),
        };

        Self {
            checked,
            indeterminate,
            hidden,
        }
    }
}

/// The selection host of a grid.
pub struct Selection<T: Item, I: ItemId> {
    model: SelectionModel<T, I>,
    identity: IdentityFn<T, I>,
    listeners: Arc<Signal<SelectionEvent<T>>>,
    active_binding: Arc<AtomicU64>,
    selectable: Option<SelectablePredicate<T>>,
    preservation: SelectionPreservation,
    deselect_allowed: bool,
    needs_push: bool,
}

impl<T: Item, I: ItemId> Selection<T, I> {
    /// Creates an empty selection in `mode`.
    pub fn new(mode: SelectionMode, identity: IdentityFn<T, I>) -> Self {
        let listeners = Arc::new(Signal::new());
        let active_binding = Arc::new(AtomicU64::new(0));
        let sink = EventSink::new(listeners.clone(), 0, active_binding.clone());
        Self {
            model: SelectionModel::build(mode, identity.clone(), sink),
            identity,
            listeners,
            active_binding,
            selectable: None,
            preservation: SelectionPreservation::default(),
            deselect_allowed: true,
            needs_push: false,
        }
    }

    /// The active mode.
    pub fn mode(&self) -> SelectionMode {
        self.model.mode()
    }

    /// The active model.
    pub fn model(&self) -> &SelectionModel<T, I> {
        &self.model
    }

    /// Switches to a new, empty model for `mode` and returns the detached
    /// previous one.
    pub fn set_mode(&mut self, mode: SelectionMode) -> SelectionModel<T, I> {
        let binding = self.active_binding.fetch_add(1, Ordering::SeqCst) + 1;
        let sink = EventSink::new(self.listeners.clone(), binding, self.active_binding.clone());
        let mut model = SelectionModel::build(mode, self.identity.clone(), sink);
        if let Some(single) = model.as_single_mut() {
            single.set_deselect_allowed(self.deselect_allowed);
        }
        let previous = std::mem::replace(&mut self.model, model);
        if previous.handler().selected_count() > 0 {
            self.needs_push = true;
        }
        tracing::debug!(target: targets::SELECTION, ?mode, binding, "selection model replaced");
        previous
    }

    /// Replaces the identity function, e.g. after a source swap.
    pub fn set_identity(&mut self, identity: IdentityFn<T, I>) {
        self.model.handler_mut().set_identity(identity.clone());
        self.identity = identity;
    }

    /// Registers a selection listener.
    pub fn add_listener<F>(&self, listener: F) -> ConnectionId
    where
        F: Fn(&SelectionEvent<T>) + Send + Sync + 'static,
    {
        self.listeners.connect(listener)
    }

    /// Removes a selection listener.
    pub fn remove_listener(&self, id: ConnectionId) -> bool {
        self.listeners.disconnect(id)
    }

    /// Sets or clears the selectability predicate for client actions.
    pub fn set_selectable(&mut self, predicate: Option<SelectablePredicate<T>>) {
        self.selectable = predicate;
    }

    /// Returns `true` if client actions may change `item`.
    pub fn is_selectable(&self, item: &T) -> bool {
        self.selectable.as_ref().is_none_or(|predicate| predicate(item))
    }

    /// Sets whether the client may clear a single selection.
    pub fn set_deselect_allowed(&mut self, allowed: bool) {
        self.deselect_allowed = allowed;
        if let Some(single) = self.model.as_single_mut() {
            single.set_deselect_allowed(allowed);
        }
    }

    /// The active preservation policy.
    pub fn preservation(&self) -> SelectionPreservation {
        self.preservation
    }

    /// Sets the preservation policy for a source of `kind`.
    ///
    /// `PreserveExistent` needs an enumerable source and is rejected for lazy ones.
    pub fn set_preservation(&mut self, policy: SelectionPreservation, kind: SourceKind) -> Result<()> {
        Self::check_compatible(policy, kind)?;
        self.preservation = policy;
        Ok(())
    }

    /// Checks that a source of `kind` can be bound under the active policy.
    pub fn check_source_kind(&self, kind: SourceKind) -> Result<()> {
        Self::check_compatible(self.preservation, kind)
    }

    fn check_compatible(policy: SelectionPreservation, kind: SourceKind) -> Result<()> {
        if policy == SelectionPreservation::PreserveExistent && kind.is_lazy() {
            return Err(GridError::conflict(format!(
                "PreserveExistent cannot be combined with a lazy ({kind:?}) source"
            )));
        }
        Ok(())
    }

    /// Applies the preservation policy after the data changed.
    ///
    /// `exists` reports whether an item still exists in the new data.
    pub fn apply_preservation<F>(&mut self, exists: F) -> bool
    where
        F: Fn(&T) -> Result<bool>,
    {
        let stale = match self.preservation {
            SelectionPreservation::PreserveAll => return false,
            SelectionPreservation::Discard => self.selected_items(),
            SelectionPreservation::PreserveExistent => self
                .selected_items()
                .into_iter()
                .filter(|item| match exists(item) {
                    Ok(found) => !found,
                    Err(err) => {
                        tracing::warn!(
                            target: targets::SELECTION,
                            %err,
                            "cannot tell whether a selected item still exists, keeping it"
                        );
                        false
                    }
                })
                .collect(),
        };
        if stale.is_empty() {
            return false;
        }
        tracing::debug!(
            target: targets::SELECTION,
            policy = ?self.preservation,
            dropped = stale.len(),
            "applying selection preservation"
        );
        match self.apply(Vec::new(), stale, EventSource::Server) {
            Ok(changed) => changed,
            Err(err) => {
                tracing::warn!(
                    target: targets::SELECTION,
                    %err,
                    "failed to drop items from the selection after a data change"
                );
                false
            }
        }
    }

    fn apply(&mut self, to_add: Vec<T>, to_remove: Vec<T>, source: EventSource) -> Result<bool> {
        let changed = self.model.handler_mut().update_selection(to_add, to_remove, source)?;
        if changed && source == EventSource::Server {
            self.needs_push = true;
        }
        Ok(changed)
    }

    /// Selects `item`. Not gated by the selectability predicate.
    pub fn select(&mut self, item: T) -> bool {
        self.apply(vec![item], Vec::new(), EventSource::Server)
            .unwrap_or(false)
    }

    /// Deselects `item`.
    pub fn deselect(&mut self, item: &T) -> bool {
        self.apply(Vec::new(), vec![item.clone()], EventSource::Server)
            .unwrap_or(false)
    }

    /// Atomically adds and removes items. Emits at most one event.
    pub fn update_selection(&mut self, to_add: Vec<T>, to_remove: Vec<T>) -> Result<bool> {
        self.apply(to_add, to_remove, EventSource::Server)
    }

    /// Selects every item in `items`. Multi mode only.
    pub fn select_all(&mut self, items: Vec<T>) -> Result<bool> {
        self.require_multi("select_all")?;
        self.apply(items, Vec::new(), EventSource::Server)
    }

    /// Clears the selection.
    pub fn deselect_all(&mut self) -> bool {
        let selected = self.selected_items();
        self.apply(Vec::new(), selected, EventSource::Server)
            .unwrap_or(false)
    }

    /// Client select; ignored if the predicate rejects `item`.
    pub fn select_from_client(&mut self, item: T) -> bool {
        if !self.is_selectable(&item) {
            tracing::debug!(target: targets::SELECTION, "client select of unselectable item ignored");
            return false;
        }
        self.apply(vec![item], Vec::new(), EventSource::Client)
            .unwrap_or(false)
    }

    /// Client deselect; ignored if the predicate rejects `item`.
    pub fn deselect_from_client(&mut self, item: &T) -> bool {
        if !self.is_selectable(item) {
            tracing::debug!(target: targets::SELECTION, "client deselect of unselectable item ignored");
            return false;
        }
        self.apply(Vec::new(), vec![item.clone()], EventSource::Client)
            .unwrap_or(false)
    }

    /// Client select-all over `items`, skipping unselectable ones. Multi mode only.
    pub fn client_select_all(&mut self, items: Vec<T>) -> Result<bool> {
        self.require_multi("client_select_all")?;
        let items = items.into_iter().filter(|item| self.is_selectable(item)).collect();
        self.apply(items, Vec::new(), EventSource::Client)
    }

    /// Client deselect-all; unselectable items stay selected.
    pub fn client_deselect_all(&mut self) -> bool {
        let items = self
            .selected_items()
            .into_iter()
            .filter(|item| self.is_selectable(item))
            .collect();
        self.apply(Vec::new(), items, EventSource::Client)
            .unwrap_or(false)
    }

    fn require_multi(&self, operation: &'static str) -> Result<()> {
        if self.mode() == SelectionMode::Multi {
            Ok(())
        } else {
            Err(GridError::unsupported(
                operation,
                format!("not available in {:?} selection mode", self.mode()),
            ))
        }
    }

    /// Returns `true` if `item` is selected, by identity.
    pub fn is_selected(&self, item: &T) -> bool {
        self.model.handler().is_selected(item)
    }

    /// The selected items, in selection order.
    pub fn selected_items(&self) -> Vec<T> {
        self.model.handler().selected_items()
    }

    /// Number of selected items.
    pub fn selected_count(&self) -> usize {
        self.model.handler().selected_count()
    }

    /// Returns `true` if a server-sourced change has not been pushed yet.
    pub fn needs_push(&self) -> bool {
        self.needs_push
    }

    /// Returns and clears the push flag.
    pub fn take_needs_push(&mut self) -> bool {
        std::mem::take(&mut self.needs_push)
    }
}
