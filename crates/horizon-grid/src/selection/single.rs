//! Single selection.

use horizon_grid_core::logging::targets;

use super::event::{EventSource, SelectionEvent};
use super::model::{EventSink, SelectionHandler, net_changes};
use crate::data::{IdentityFn, Item, ItemId};
use crate::error::{GridError, Result};

/// At most one selected item.
///
/// Selecting another item replaces the current one and emits a single
/// combined event.
pub struct SingleSelection<T, I> {
    selected: Option<(I, T)>,
    identity: IdentityFn<T, I>,
    deselect_allowed: bool,
    sink: EventSink<T>,
}

impl<T: Item, I: ItemId> SingleSelection<T, I> {
    /// Creates an empty single selection.
    pub fn new(identity: IdentityFn<T, I>, sink: EventSink<T>) -> Self {
        Self {
            selected: None,
            identity,
            deselect_allowed: true,
            sink,
        }
    }

    /// The selected item.
    pub fn selected_item(&self) -> Option<&T> {
        self.selected.as_ref().map(|(_, item)| item)
    }

    /// Whether the client may clear the selection. Defaults to `true`.
    pub fn is_deselect_allowed(&self) -> bool {
        self.deselect_allowed
    }

    /// Sets whether the client may clear the selection.
    ///
    /// When disallowed, client deselects are ignored; selecting another item
    /// from the client still replaces the selection.
    pub fn set_deselect_allowed(&mut self, allowed: bool) {
        self.deselect_allowed = allowed;
    }

    fn snapshot(selected: &Option<(I, T)>) -> Vec<T> {
        selected.iter().map(|(_, item)| item.clone()).collect()
    }
}

impl<T: Item, I: ItemId> SelectionHandler<T, I> for SingleSelection<T, I> {
    fn update_selection(&mut self, to_add: Vec<T>, to_remove: Vec<T>, source: EventSource) -> Result<bool> {
        let (add, remove) = net_changes(&self.identity, to_add, to_remove);
        if add.len() > 1 {
            return Err(GridError::InvalidArgument(format!(
                "single selection cannot select {} items at once",
                add.len()
            )));
        }
        let current = self.selected.as_ref().map(|(id, _)| id);

        let next = match add.into_iter().next() {
            Some((id, _)) if current == Some(&id) => return Ok(false),
            Some(pair) => Some(pair),
            None => {
                let clears = current.is_some_and(|id| remove.iter().any(|(r, _)| r == id));
                if !clears {
                    return Ok(false);
                }
                if source.is_client() && !self.deselect_allowed {
                    tracing::debug!(target: targets::SELECTION, "client deselect ignored, deselection not allowed");
                    return Ok(false);
                }
                None
            }
        };

        let old_selection = Self::snapshot(&self.selected);
        let removed = old_selection.clone();
        self.selected = next;
        let new_selection = Self::snapshot(&self.selected);
        self.sink.emit(SelectionEvent {
            added: new_selection.clone(),
            removed,
            old_selection,
            new_selection,
            source,
        });
        Ok(true)
    }

    fn is_selected(&self, item: &T) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|(id, _)| *id == (self.identity)(item))
    }

    fn selected_items(&self) -> Vec<T> {
        Self::snapshot(&self.selected)
    }

    fn set_identity(&mut self, identity: IdentityFn<T, I>) {
        if let Some((id, item)) = &mut self.selected {
            *id = identity(item);
        }
        self.identity = identity;
    }

    fn selected_count(&self) -> usize {
        usize::from(self.selected.is_some())
    }
}
