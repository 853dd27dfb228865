//! The grid facade.
//!
//! [`DataGrid`] ties a [`DataCommunicator`] to a [`Selection`] and is the
//! surface both the application and the rendering layer talk to. Client
//! events arrive as key tokens and are resolved to items before they reach
//! the selection or the viewport; unknown keys are ignored.

use std::sync::Arc;

use horizon_grid_core::ConnectionId;
use horizon_grid_core::logging::targets;
use serde::Serialize;

use crate::communicator::{DataCommunicator, DataUpdate, RowData, SizeInfo};
use crate::config::GridConfig;
use crate::data::{
    FilterFn, InMemorySource, Item, ItemCount, ItemId, SharedSource, SortOrder, SourceKind, identity_of,
};
use crate::error::{GridError, Result};
use crate::key_mapper::ItemKey;
use crate::selection::{
    SelectAllState, SelectAllVisibility, Selection, SelectionEvent, SelectionMode, SelectionPreservation,
};
use crate::viewport::ViewportState;

/// Selection state pushed to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionUpdate {
    /// Keys of the selected items that are in the resident window.
    pub selected_keys: Vec<ItemKey>,
    pub select_all: SelectAllState,
}

/// Everything one [`DataGrid::sync`] produced for the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridUpdate {
    pub data: Option<DataUpdate>,
    pub selection: Option<SelectionUpdate>,
}

impl GridUpdate {
    /// Returns `true` if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.selection.is_none()
    }
}

/// A data window with selection, bound to one item source.
///
/// # Example
///
/// ```
/// use horizon_grid::{DataGrid, GridConfig, SelectionMode};
///
/// let config = GridConfig::new().selection_mode(SelectionMode::Multi);
/// let mut grid = DataGrid::from_items(vec!["foo", "bar", "baz"], config).unwrap();
///
/// grid.select_all().unwrap();
/// assert!(grid.select_all_state().checked);
///
/// let update = grid.sync().unwrap();
/// assert_eq!(update.data.unwrap().added.len(), 3);
/// assert_eq!(update.selection.unwrap().selected_keys.len(), 3);
/// ```
pub struct DataGrid<T: Item, I: ItemId> {
    communicator: DataCommunicator<T, I>,
    selection: Selection<T, I>,
    select_all_visibility: SelectAllVisibility,
    last_select_all: Option<SelectAllState>,
}

impl<T: Item + ItemId> DataGrid<T, T> {
    /// Creates a grid over an in-memory collection of self-identifying items.
    pub fn from_items(items: Vec<T>, config: GridConfig) -> Result<Self> {
        Self::new(Arc::new(InMemorySource::new(items)), config)
    }
}

impl<T: Item, I: ItemId> DataGrid<T, I> {
    /// Creates a grid bound to `source`.
    ///
    /// Fails with `ConfigurationConflict` if the configuration is invalid or
    /// its preservation policy does not fit the source.
    pub fn new(source: SharedSource<T, I>, config: GridConfig) -> Result<Self> {
        config.validate()?;
        let mut selection = Selection::new(config.selection_mode, identity_of(&source));
        selection.set_preservation(config.selection_preservation, source.kind())?;
        Ok(Self {
            communicator: DataCommunicator::new(source, &config),
            selection,
            select_all_visibility: config.select_all_visibility,
            last_select_all: None,
        })
    }

    /// The data communicator.
    pub fn communicator(&self) -> &DataCommunicator<T, I> {
        &self.communicator
    }

    /// The selection host.
    pub fn selection(&self) -> &Selection<T, I> {
        &self.selection
    }

    /// Kind of the bound source.
    pub fn source_kind(&self) -> SourceKind {
        self.communicator.source_kind()
    }

    /// Current viewport state.
    pub fn viewport_state(&self) -> ViewportState {
        self.communicator.viewport_state()
    }

    // ------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------

    /// Folds pending invalidations and applies the preservation policy
    /// after a full data change.
    fn absorb(&mut self) {
        self.communicator.absorb_invalidations();
        self.apply_data_reset();
    }

    fn apply_data_reset(&mut self) {
        if !self.communicator.take_data_reset() {
            return;
        }
        let communicator = &self.communicator;
        self.selection
            .apply_preservation(|item| communicator.contains(item));
    }

    /// Runs one synchronization cycle and collects what the client needs.
    pub fn sync(&mut self) -> Result<GridUpdate> {
        self.absorb();
        let data = self.communicator.sync()?;
        self.apply_data_reset();

        let select_all = self.select_all_state();
        let push = self.selection.take_needs_push()
            || data.is_some()
            || self.last_select_all != Some(select_all);
        let selection = if push {
            self.last_select_all = Some(select_all);
            Some(SelectionUpdate {
                selected_keys: self.selected_keys(),
                select_all,
            })
        } else {
            None
        };

        Ok(GridUpdate { data, selection })
    }

    /// Frees keys released by updates up to `update_id`.
    pub fn confirm_update(&mut self, update_id: u64) -> usize {
        self.communicator.confirm_update(update_id)
    }

    /// Keys of the selected items in the resident window.
    pub fn selected_keys(&self) -> Vec<ItemKey> {
        self.selection
            .selected_items()
            .iter()
            .filter_map(|item| self.communicator.resident_key_of(item))
            .collect()
    }

    /// The select-all checkbox state for the current data and selection.
    pub fn select_all_state(&self) -> SelectAllState {
        let kind = self.source_kind();
        let total = match (kind, self.communicator.size()) {
            (SourceKind::Unsized, _) => ItemCount::Unknown,
            (_, Some(SizeInfo::Exact(total))) => ItemCount::Exact(total),
            (_, Some(SizeInfo::Estimated(_))) => ItemCount::Unknown,
            (_, None) => self.communicator.item_count(),
        };
        SelectAllState::compute(
            self.selection.mode(),
            kind,
            total,
            self.selection.selected_count(),
            self.select_all_visibility,
        )
    }

    // ------------------------------------------------------------------
    // Data access
    // ------------------------------------------------------------------

    /// Returns the item at `index`, fetching synchronously outside the window.
    pub fn get_item(&self, index: usize) -> Result<T> {
        self.communicator.get_item(index)
    }

    /// Resolves a client token to its item.
    pub fn resolve_token(&self, token: &str) -> Option<T> {
        ItemKey::from_token(token).and_then(|key| self.communicator.resolve_item(key))
    }

    /// The key of `item`, if it is mapped.
    pub fn key_of(&self, item: &T) -> Option<ItemKey> {
        self.communicator.key_of(item)
    }

    /// Number of items matching the current filter.
    pub fn item_count(&self) -> ItemCount {
        self.communicator.item_count()
    }

    /// Requests the page around `index`.
    pub fn scroll_to_index(&mut self, index: usize) {
        self.communicator.scroll_to_index(index);
    }

    /// Requests the page around `item` and returns its index.
    ///
    /// Fails with `Unsupported` if the source cannot resolve indices, and
    /// with `NotFound` if the item is not in the filtered data.
    pub fn scroll_to_item(&mut self, item: &T) -> Result<usize> {
        let index = self.communicator.resolve_index_of(item)?;
        self.communicator.scroll_to_index(index);
        Ok(index)
    }

    // ------------------------------------------------------------------
    // Data configuration
    // ------------------------------------------------------------------

    /// Binds a new source.
    ///
    /// Rejected with `ConfigurationConflict` if the preservation policy
    /// cannot work with the new source; otherwise the policy is applied to
    /// the current selection immediately.
    pub fn set_source(&mut self, source: SharedSource<T, I>) -> Result<()> {
        self.selection.check_source_kind(source.kind())?;
        self.selection.set_identity(identity_of(&source));
        self.communicator.set_source(source);
        self.absorb();
        Ok(())
    }

    /// Sets the sort orders.
    pub fn set_sort(&mut self, sort: Vec<SortOrder>) {
        self.communicator.set_sort(sort);
        self.absorb();
    }

    /// Sets or clears the filter.
    pub fn set_filter(&mut self, filter: Option<FilterFn<T>>) {
        self.communicator.set_filter(filter);
        self.absorb();
    }

    /// Changes the page size; the window is recomputed on the next sync.
    ///
    /// Fails with `ConfigurationConflict` if the page size is zero or the
    /// resulting window exceeds the maximum fetch size.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        self.communicator.set_page_size(page_size)
    }

    /// Adds a generator of rendered row fields.
    pub fn add_data_generator<F>(&mut self, generator: F)
    where
        F: Fn(&T, &mut RowData) + Send + Sync + 'static,
    {
        self.communicator.add_data_generator(generator);
    }

    /// Signals that all data may have changed.
    pub fn refresh_all(&mut self) {
        self.communicator.refresh_all();
        self.absorb();
    }

    /// Signals that `item` changed.
    pub fn refresh_item(&mut self, item: T) {
        self.communicator.refresh_item(item);
    }

    // ------------------------------------------------------------------
    // Selection configuration
    // ------------------------------------------------------------------

    /// Switches the selection mode. The new model starts empty.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        if self.selection.mode() != mode {
            self.selection.set_mode(mode);
        }
    }

    /// Sets the selection preservation policy.
    pub fn set_preservation(&mut self, policy: SelectionPreservation) -> Result<()> {
        self.selection.set_preservation(policy, self.source_kind())
    }

    /// Restricts which items client actions may select or deselect.
    pub fn set_selectable<F>(&mut self, predicate: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.selection.set_selectable(Some(Arc::new(predicate)));
    }

    /// Removes the selectability predicate.
    pub fn clear_selectable(&mut self) {
        self.selection.set_selectable(None);
    }

    /// Sets whether the client may clear a single selection.
    pub fn set_deselect_allowed(&mut self, allowed: bool) {
        self.selection.set_deselect_allowed(allowed);
    }

    /// Sets the select-all checkbox visibility policy.
    pub fn set_select_all_visibility(&mut self, visibility: SelectAllVisibility) {
        self.select_all_visibility = visibility;
    }

    // ------------------------------------------------------------------
    // Selection (server side)
    // ------------------------------------------------------------------

    /// Registers a selection listener.
    pub fn add_selection_listener<F>(&self, listener: F) -> ConnectionId
    where
        F: Fn(&SelectionEvent<T>) + Send + Sync + 'static,
    {
        self.selection.add_listener(listener)
    }

    /// Removes a selection listener.
    pub fn remove_selection_listener(&self, id: ConnectionId) -> bool {
        self.selection.remove_listener(id)
    }

    /// The selected items, in selection order.
    pub fn selected_items(&self) -> Vec<T> {
        self.selection.selected_items()
    }

    /// Number of selected items.
    pub fn selected_count(&self) -> usize {
        self.selection.selected_count()
    }

    /// Returns `true` if `item` is selected, by identity.
    pub fn is_selected(&self, item: &T) -> bool {
        self.selection.is_selected(item)
    }

    /// Selects `item`.
    pub fn select(&mut self, item: T) -> bool {
        self.selection.select(item)
    }

    /// Deselects `item`.
    pub fn deselect(&mut self, item: &T) -> bool {
        self.selection.deselect(item)
    }

    /// Atomically adds and removes items.
    pub fn update_selection(&mut self, to_add: Vec<T>, to_remove: Vec<T>) -> Result<bool> {
        self.selection.update_selection(to_add, to_remove)
    }

    /// Selects every item matching the current filter.
    ///
    /// Multi mode only. Unsupported for hierarchical sources.
    pub fn select_all(&mut self) -> Result<bool> {
        self.check_select_all("select_all")?;
        let items = self.communicator.fetch_all();
        self.selection.select_all(items)
    }

    /// Clears the selection.
    pub fn deselect_all(&mut self) -> bool {
        self.selection.deselect_all()
    }

    fn check_select_all(&self, operation: &'static str) -> Result<()> {
        if self.source_kind().is_hierarchical() {
            return Err(GridError::unsupported(
                operation,
                "select-all over a hierarchical source is ambiguous",
            ));
        }
        if self.selection.mode() != SelectionMode::Multi {
            return Err(GridError::unsupported(
                operation,
                format!("not available in {:?} selection mode", self.selection.mode()),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Client events
    // ------------------------------------------------------------------

    fn resolve_client_token(&self, token: &str, event: &'static str) -> Option<T> {
        let item = self.resolve_token(token);
        if item.is_none() {
            tracing::debug!(target: targets::GRID, token, event, "ignoring client event for unknown key");
        }
        item
    }

    /// Client selected the row with `token`.
    pub fn client_select(&mut self, token: &str) -> bool {
        match self.resolve_client_token(token, "select") {
            Some(item) => self.selection.select_from_client(item),
            None => false,
        }
    }

    /// Client deselected the row with `token`.
    pub fn client_deselect(&mut self, token: &str) -> bool {
        match self.resolve_client_token(token, "deselect") {
            Some(item) => self.selection.deselect_from_client(&item),
            None => false,
        }
    }

    /// Client checked the select-all checkbox.
    pub fn client_select_all(&mut self) -> bool {
        if let Err(err) = self.check_select_all("client_select_all") {
            tracing::debug!(target: targets::GRID, %err, "ignoring client select-all");
            return false;
        }
        let items = self.communicator.fetch_all();
        self.selection.client_select_all(items).unwrap_or(false)
    }

    /// Client cleared the select-all checkbox.
    pub fn client_deselect_all(&mut self) -> bool {
        self.selection.client_deselect_all()
    }

    /// Client asked for an explicit range.
    ///
    /// Fails with `RangeTooLarge` before anything is fetched if `length`
    /// exceeds the maximum fetch size.
    pub fn client_request_range(&mut self, start: usize, length: usize) -> Result<()> {
        self.communicator.request_range(start, length)
    }
}
