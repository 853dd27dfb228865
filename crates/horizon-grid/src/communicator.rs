//! The data communicator.
//!
//! [`DataCommunicator`] drives one synchronization cycle at a time:
//!
//! 1. fold pending source invalidations into the data generation
//! 2. let the [`ViewportTracker`] compute the range to make resident
//! 3. fetch that slice from the bound [`DataSource`]
//! 4. assign or reuse an [`ItemKey`] for every fetched item
//! 5. diff the new window against the last sent one
//! 6. hand out only the diff as a [`DataUpdate`]
//! 7. replace the sent bookkeeping in the same step
//!
//! A cycle can also be driven in three steps
//! ([`prepare_cycle`](DataCommunicator::prepare_cycle),
//! [`fetch`](DataCommunicator::fetch),
//! [`complete_cycle`](DataCommunicator::complete_cycle)) so that the fetch
//! can run elsewhere. A result whose ticket went stale in between, because
//! the source signalled an invalidation or a newer range was requested, is
//! dropped and the next cycle fetches again.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

use horizon_grid_core::logging::{span_names, targets};
use horizon_grid_core::{ConnectionGuard, PerfSpan};
use parking_lot::Mutex;
use serde::Serialize;

use crate::config::GridConfig;
use crate::data::{FilterFn, Item, ItemCount, ItemId, Query, SharedSource, SortOrder, SourceKind, identity_of};
use crate::error::{GridError, Result};
use crate::key_mapper::{ItemKey, KeyMapper};
use crate::viewport::{FetchTicket, ViewportState, ViewportTracker};

/// Rendered fields of one row, as sent to the client.
pub type RowData = serde_json::Map<String, serde_json::Value>;

/// Type alias for a data generator: writes rendered fields for an item.
pub type DataGenerator<T> = Arc<dyn Fn(&T, &mut RowData) + Send + Sync>;

/// A row entering the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddedRow {
    pub index: usize,
    pub key: ItemKey,
    pub data: RowData,
}

/// A row that stays in the window but must be re-rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedRow {
    pub key: ItemKey,
    pub data: RowData,
}

/// A row that stays in the window at a new index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MovedRow {
    pub index: usize,
    pub key: ItemKey,
}

/// Size of the index space reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SizeInfo {
    Exact(usize),
    /// The source cannot count; this is the current estimate.
    Estimated(usize),
}

impl SizeInfo {
    /// The exact or estimated item count.
    pub fn count(self) -> usize {
        match self {
            Self::Exact(count) | Self::Estimated(count) => count,
        }
    }

    /// Returns `true` if the count is exact.
    pub fn is_exact(self) -> bool {
        matches!(self, Self::Exact(_))
    }
}

/// The diff produced by one synchronization cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataUpdate {
    /// Id the client confirms once the update is applied.
    pub update_id: u64,
    /// Data generation the window was fetched under.
    pub generation: u64,
    /// The resident range after this update.
    pub range: Range<usize>,
    pub size: SizeInfo,
    pub added: Vec<AddedRow>,
    pub removed: Vec<ItemKey>,
    pub updated: Vec<UpdatedRow>,
    pub moved: Vec<MovedRow>,
}

impl DataUpdate {
    /// Returns `true` if no row changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.updated.is_empty()
            && self.moved.is_empty()
    }
}

/// Invalidations folded into the generation by one absorb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// The whole data set may have changed.
    pub full: bool,
    /// The same data was reordered, filtered or re-flattened.
    pub layout: bool,
    /// Number of item-level refreshes.
    pub items: usize,
}

impl Invalidation {
    /// Returns `true` if nothing was invalidated.
    pub fn is_empty(&self) -> bool {
        !self.full && !self.layout && self.items == 0
    }
}

/// Invalidations recorded by the source listeners, applied at cycle boundaries.
struct PendingInvalidation<T> {
    full: bool,
    layout: bool,
    items: Vec<T>,
}

impl<T> PendingInvalidation<T> {
    fn is_empty(&self) -> bool {
        !self.full && !self.layout && self.items.is_empty()
    }
}

impl<T> Default for PendingInvalidation<T> {
    fn default() -> Self {
        Self {
            full: false,
            layout: false,
            items: Vec::new(),
        }
    }
}

/// Keeps the source listeners connected while the source is bound.
struct Subscriptions<T> {
    _refresh_all: ConnectionGuard<()>,
    _layout_changed: ConnectionGuard<()>,
    _refresh_item: ConnectionGuard<T>,
}

/// Upper bound on fetch rounds in one [`DataCommunicator::sync`] call.
///
/// Each round past the first either halves the probed size of a source that
/// cannot count or retries a result that went stale while fetching.
const MAX_SYNC_ROUNDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeState {
    /// Not yet asked since the source was bound.
    Unresolved,
    Definite(usize),
    /// Probing a source that cannot count.
    ///
    /// Items are known to exist below `floor` and known to be absent from
    /// `ceiling` on. `end_reached` makes the estimate exact.
    Estimated {
        estimate: usize,
        floor: usize,
        ceiling: Option<usize>,
        end_reached: bool,
    },
}

impl SizeState {
    fn probing(estimate: usize) -> Self {
        Self::Estimated {
            estimate,
            floor: 0,
            ceiling: None,
            end_reached: false,
        }
    }

    fn exact_at(estimate: usize) -> Self {
        Self::Estimated {
            estimate,
            floor: estimate,
            ceiling: Some(estimate),
            end_reached: true,
        }
    }

    fn total(self) -> Option<usize> {
        match self {
            Self::Unresolved => None,
            Self::Definite(total) => Some(total),
            Self::Estimated { estimate, .. } => Some(estimate),
        }
    }

    fn info(self) -> SizeInfo {
        match self {
            Self::Unresolved => SizeInfo::Estimated(0),
            Self::Definite(total) => SizeInfo::Exact(total),
            Self::Estimated {
                estimate,
                end_reached: true,
                ..
            } => SizeInfo::Exact(estimate),
            Self::Estimated { estimate, .. } => SizeInfo::Estimated(estimate),
        }
    }
}

struct SentRow<I> {
    index: usize,
    key: ItemKey,
    id: I,
    data: RowData,
}

/// Synchronizes a window of a data source with a client.
pub struct DataCommunicator<T: Item, I: ItemId> {
    source: SharedSource<T, I>,
    _subscriptions: Subscriptions<T>,
    pending: Arc<Mutex<PendingInvalidation<T>>>,
    keys: KeyMapper<T, I>,
    viewport: ViewportTracker,
    config: GridConfig,
    generation: u64,
    sort: Vec<SortOrder>,
    filter: Option<FilterFn<T>>,
    generators: Vec<DataGenerator<T>>,
    size: SizeState,
    size_dirty: bool,
    /// Items of the resident range, in index order.
    resident: Vec<T>,
    resident_ids: HashMap<I, usize>,
    sent: Vec<SentRow<I>>,
    /// Re-send every row that stays in the window on the next cycle.
    resend_all: bool,
    /// Ids explicitly refreshed since the last cycle.
    forced: HashSet<I>,
    /// Set by a full invalidation until taken by the owner.
    data_reset: bool,
    next_update_id: u64,
}

impl<T: Item, I: ItemId> DataCommunicator<T, I> {
    /// Binds a communicator to `source`.
    pub fn new(source: SharedSource<T, I>, config: &GridConfig) -> Self {
        let pending = Arc::new(Mutex::new(PendingInvalidation::default()));
        let subscriptions = Self::subscribe(&source, &pending);
        Self {
            keys: KeyMapper::new(identity_of(&source)),
            source,
            _subscriptions: subscriptions,
            pending,
            viewport: ViewportTracker::from_config(config),
            config: config.clone(),
            generation: 0,
            sort: Vec::new(),
            filter: None,
            generators: Vec::new(),
            size: SizeState::Unresolved,
            size_dirty: true,
            resident: Vec::new(),
            resident_ids: HashMap::new(),
            sent: Vec::new(),
            resend_all: false,
            forced: HashSet::new(),
            data_reset: false,
            next_update_id: 1,
        }
    }

    fn subscribe(
        source: &SharedSource<T, I>,
        pending: &Arc<Mutex<PendingInvalidation<T>>>,
    ) -> Subscriptions<T> {
        let on_all = pending.clone();
        let on_layout = pending.clone();
        let on_item = pending.clone();
        Subscriptions {
            _refresh_all: source
                .signals()
                .refresh_all
                .connect_scoped(move |_| on_all.lock().full = true),
            _layout_changed: source
                .signals()
                .layout_changed
                .connect_scoped(move |_| on_layout.lock().layout = true),
            _refresh_item: source
                .signals()
                .refresh_item
                .connect_scoped(move |item: &T| on_item.lock().items.push(item.clone())),
        }
    }

    /// The bound source.
    pub fn source(&self) -> &SharedSource<T, I> {
        &self.source
    }

    /// Kind of the bound source.
    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Current data generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current viewport state.
    pub fn viewport_state(&self) -> ViewportState {
        self.viewport.state()
    }

    /// The range applied by the last completed cycle.
    pub fn resident_range(&self) -> Range<usize> {
        self.viewport.resident_range()
    }

    /// Items of the resident range, in index order.
    pub fn resident_items(&self) -> &[T] {
        &self.resident
    }

    /// Size of the index space as last reported, once a cycle has run.
    pub fn size(&self) -> Option<SizeInfo> {
        match self.size {
            SizeState::Unresolved => None,
            state => Some(state.info()),
        }
    }

    /// Identity of `item` under the bound source.
    pub fn id_of(&self, item: &T) -> I {
        self.source.id(item)
    }

    /// Number of mapped keys not pending release.
    pub fn active_key_count(&self) -> usize {
        self.keys.active_count()
    }

    fn base_query(&self) -> Query<T> {
        Query::unbounded()
            .with_sort(self.sort.clone())
            .with_filter(self.filter.clone())
    }

    fn query_for(&self, range: &Range<usize>) -> Query<T> {
        Query::new(range.start, range.len())
            .with_sort(self.sort.clone())
            .with_filter(self.filter.clone())
    }

    /// Folds pending source invalidations into the data generation.
    pub fn absorb_invalidations(&mut self) -> Invalidation {
        let pending = std::mem::take(&mut *self.pending.lock());
        let invalidation = Invalidation {
            full: pending.full,
            layout: pending.layout,
            items: pending.items.len(),
        };
        if invalidation.is_empty() {
            return invalidation;
        }

        self.generation += 1;
        self.viewport.invalidate();
        for item in &pending.items {
            self.keys.refresh(item);
            self.forced.insert(self.keys.id_of(item));
        }
        if pending.full {
            self.resend_all = true;
            self.data_reset = true;
        }
        if pending.full || pending.layout {
            self.size_dirty = true;
        }
        tracing::debug!(
            target: targets::COMMUNICATOR,
            generation = self.generation,
            full = invalidation.full,
            layout = invalidation.layout,
            items = invalidation.items,
            "data generation bumped"
        );
        invalidation
    }

    /// Returns `true` once after each full invalidation.
    ///
    /// Layout changes (sort, filter, expansion) do not count.
    pub fn take_data_reset(&mut self) -> bool {
        std::mem::take(&mut self.data_reset)
    }

    fn refresh_size(&mut self) {
        if !self.size_dirty {
            return;
        }
        self.size_dirty = false;
        self.size = match (self.source.size(&self.base_query()), self.size) {
            (ItemCount::Exact(total), _) => SizeState::Definite(total),
            (ItemCount::Unknown, SizeState::Definite(total)) => {
                tracing::warn!(
                    target: targets::COMMUNICATOR,
                    last_total = total,
                    "source stopped reporting a definite size, switching to estimated size"
                );
                SizeState::probing(total.max(self.config.unknown_size_estimate))
            }
            (ItemCount::Unknown, SizeState::Estimated { estimate, .. }) => {
                SizeState::probing(estimate.max(self.config.unknown_size_estimate))
            }
            (ItemCount::Unknown, SizeState::Unresolved) => {
                SizeState::probing(self.config.unknown_size_estimate)
            }
        };
    }

    /// Grows the estimate until the requested index is a page away from its end.
    ///
    /// Once a fetch found the end of the data, the estimate only moves
    /// through [`track_probed_size`](Self::track_probed_size).
    fn grow_estimate_for_request(&mut self) {
        let SizeState::Estimated {
            estimate,
            floor,
            ceiling: None,
            end_reached: false,
        } = self.size
        else {
            return;
        };
        let wanted = self
            .viewport
            .current_request()
            .extent()
            .saturating_add(self.viewport.page_size());
        let step = self.config.unknown_size_increase.max(1);
        let mut grown = estimate;
        while grown < wanted {
            grown = grown.saturating_add(step);
        }
        if grown != estimate {
            tracing::debug!(target: targets::COMMUNICATOR, from = estimate, to = grown, "grew size estimate");
            self.size = SizeState::Estimated {
                estimate: grown,
                floor,
                ceiling: None,
                end_reached: false,
            };
        }
    }

    /// Starts a cycle: absorbs invalidations and dispatches the pending range.
    ///
    /// Returns `Ok(None)` when the window is up to date or a fetch is
    /// already pending.
    pub fn prepare_cycle(&mut self) -> Result<Option<FetchTicket>> {
        self.absorb_invalidations();
        if !self.viewport.needs_dispatch() {
            return Ok(None);
        }
        self.refresh_size();
        self.grow_estimate_for_request();
        self.viewport.dispatch(self.size.total(), self.generation)
    }

    /// Fetches the slice a ticket asks for.
    pub fn fetch(&self, ticket: &FetchTicket) -> Vec<T> {
        if ticket.is_empty() {
            return Vec::new();
        }
        self.source.fetch(&self.query_for(&ticket.range))
    }

    /// Applies a fetch result and returns the diff.
    ///
    /// Returns `None` if the ticket went stale; the result is then discarded.
    pub fn complete_cycle(&mut self, ticket: FetchTicket, items: Vec<T>) -> Option<DataUpdate> {
        self.absorb_invalidations();
        if !self.viewport.resolve(&ticket, self.generation) {
            tracing::debug!(
                target: targets::COMMUNICATOR,
                range = ?ticket.range,
                generation = self.generation,
                "discarded stale fetch result"
            );
            return None;
        }

        if !self.track_probed_size(&ticket, items.len()) {
            return None;
        }
        Some(self.apply_window(ticket, items))
    }

    /// Updates the size of a source that cannot count from a fetch result.
    ///
    /// A short page fixes the size. Once a fetch has come back empty, the
    /// estimate is bisected between the last index known to exist and the
    /// first index known to be absent until the request fits or the end is
    /// found. Returns `false` if the window must be fetched again.
    fn track_probed_size(&mut self, ticket: &FetchTicket, fetched: usize) -> bool {
        let SizeState::Estimated {
            estimate,
            floor,
            ceiling,
            end_reached: false,
        } = self.size
        else {
            return true;
        };
        let range = &ticket.range;

        if fetched < ticket.len() {
            if fetched == 0 && range.start > floor {
                let estimate = floor + (range.start - floor).div_ceil(2);
                tracing::debug!(
                    target: targets::COMMUNICATOR,
                    start = range.start,
                    floor,
                    estimate,
                    "fetched past the end, narrowing size estimate"
                );
                self.refetch_with(SizeState::Estimated {
                    estimate,
                    floor,
                    ceiling: Some(range.start),
                    end_reached: false,
                });
                return false;
            }
            self.size = SizeState::exact_at(range.start + fetched);
            return true;
        }

        let floor = floor.max(range.end);
        match ceiling {
            Some(ceiling) if floor >= ceiling => self.size = SizeState::exact_at(ceiling),
            Some(ceiling) if self.viewport.current_request().extent() > range.end => {
                let estimate = floor + (ceiling - floor).div_ceil(2);
                tracing::debug!(
                    target: targets::COMMUNICATOR,
                    floor,
                    ceiling,
                    estimate,
                    "window ends before the requested index, widening size estimate"
                );
                self.refetch_with(SizeState::Estimated {
                    estimate,
                    floor,
                    ceiling: Some(ceiling),
                    end_reached: false,
                });
                return false;
            }
            _ if range.end.saturating_add(self.viewport.page_size()) > estimate => {
                let grown = estimate.saturating_add(self.config.unknown_size_increase);
                self.size = SizeState::Estimated {
                    estimate: ceiling.map_or(grown, |ceiling| grown.min(ceiling)),
                    floor,
                    ceiling,
                    end_reached: false,
                };
            }
            _ => {
                self.size = SizeState::Estimated {
                    estimate,
                    floor,
                    ceiling,
                    end_reached: false,
                }
            }
        }
        true
    }

    /// Drops the window just resolved and schedules a fetch under `size`.
    fn refetch_with(&mut self, size: SizeState) {
        self.size = size;
        self.resident.clear();
        self.resident_ids.clear();
        self.viewport.clear_resident();
        self.viewport.invalidate();
    }

    fn render(&self, item: &T) -> RowData {
        let mut data = RowData::new();
        for generator in &self.generators {
            generator(item, &mut data);
        }
        data
    }

    fn apply_window(&mut self, ticket: FetchTicket, items: Vec<T>) -> DataUpdate {
        let update_id = self.next_update_id;
        self.next_update_id += 1;
        let start = ticket.range.start;

        let previous: HashMap<&I, &SentRow<I>> =
            self.sent.iter().map(|row| (&row.id, row)).collect();

        let mut added = Vec::new();
        let mut updated = Vec::new();
        let mut moved = Vec::new();
        let mut sent = Vec::with_capacity(items.len());
        let mut resident_ids = HashMap::with_capacity(items.len());

        for (offset, item) in items.iter().enumerate() {
            let index = start + offset;
            let id = self.keys.id_of(item);
            if resident_ids.contains_key(&id) {
                tracing::warn!(
                    target: targets::COMMUNICATOR,
                    ?id,
                    index,
                    "duplicate identity in fetched window, skipping row"
                );
                continue;
            }
            let key = self.keys.key_for(item);
            let data = self.render(item);

            match previous.get(&id) {
                Some(&old) if old.key == key => {
                    if self.resend_all || self.forced.contains(&id) || old.data != data {
                        updated.push(UpdatedRow {
                            key,
                            data: data.clone(),
                        });
                    }
                    if old.index != index {
                        moved.push(MovedRow { index, key });
                    }
                }
                _ => added.push(AddedRow {
                    index,
                    key,
                    data: data.clone(),
                }),
            }
            resident_ids.insert(id.clone(), index);
            sent.push(SentRow {
                index,
                key,
                id,
                data,
            });
        }

        let kept: HashSet<ItemKey> = sent.iter().map(|row| row.key).collect();
        let mut removed = Vec::new();
        let mut released = Vec::new();
        for row in &self.sent {
            if !kept.contains(&row.key) {
                removed.push(row.key);
                if !resident_ids.contains_key(&row.id) {
                    released.push(row.id.clone());
                }
            }
        }
        drop(previous);
        for id in &released {
            self.keys.release_deferred(id, update_id);
        }

        self.sent = sent;
        self.resident = items;
        self.resident_ids = resident_ids;
        self.resend_all = false;
        self.forced.clear();

        let update = DataUpdate {
            update_id,
            generation: ticket.generation,
            range: ticket.range,
            size: self.size.info(),
            added,
            removed,
            updated,
            moved,
        };
        tracing::trace!(
            target: targets::COMMUNICATOR,
            update_id,
            added = update.added.len(),
            removed = update.removed.len(),
            updated = update.updated.len(),
            moved = update.moved.len(),
            "window diff built"
        );
        update
    }

    /// Runs one full synchronization cycle.
    ///
    /// A discarded fetch result is fetched again within the same call, so
    /// the window is up to date when this returns.
    pub fn sync(&mut self) -> Result<Option<DataUpdate>> {
        let _span = PerfSpan::new(span_names::SYNC_CYCLE);
        for _ in 0..MAX_SYNC_ROUNDS {
            let Some(ticket) = self.prepare_cycle()? else {
                return Ok(None);
            };
            let items = self.fetch(&ticket);
            if let Some(update) = self.complete_cycle(ticket, items) {
                return Ok(Some(update));
            }
        }
        tracing::warn!(
            target: targets::COMMUNICATOR,
            rounds = MAX_SYNC_ROUNDS,
            "window did not settle, giving up until the next sync"
        );
        Ok(None)
    }

    /// Frees keys released by updates up to `update_id`.
    pub fn confirm_update(&mut self, update_id: u64) -> usize {
        self.keys.reclaim(update_id)
    }

    /// Resolves a key to its item.
    pub fn resolve_item(&self, key: ItemKey) -> Option<T> {
        self.keys.item_for(key).cloned()
    }

    /// The key of `item`, if its identity is mapped.
    pub fn key_of(&self, item: &T) -> Option<ItemKey> {
        self.keys.existing_key(item)
    }

    /// The key of `item`, only if it is in the resident window.
    pub fn resident_key_of(&self, item: &T) -> Option<ItemKey> {
        let id = self.keys.id_of(item);
        if self.resident_ids.contains_key(&id) {
            self.keys.key_of_id(&id)
        } else {
            None
        }
    }

    /// Index of `item` under the current sort and filter.
    ///
    /// Fails with `Unsupported` if the source cannot resolve indices and
    /// with `NotFound` if the item is not in the filtered data.
    pub fn resolve_index_of(&self, item: &T) -> Result<usize> {
        let id = self.id_of(item);
        self.source
            .index_of(&id, &self.base_query())?
            .ok_or_else(|| GridError::not_found(format!("item {id:?}")))
    }

    /// Returns the item at `index`.
    ///
    /// Served from the resident window while it is current, otherwise
    /// fetched synchronously.
    pub fn get_item(&self, index: usize) -> Result<T> {
        let range = self.viewport.resident_range();
        if range.contains(&index)
            && self.window_is_current()
            && let Some(item) = self.resident.get(index - range.start)
        {
            return Ok(item.clone());
        }
        tracing::trace!(target: targets::COMMUNICATOR, index, "get_item outside window, fetching");
        self.source
            .fetch(&self.query_for(&(index..index + 1)))
            .into_iter()
            .next()
            .ok_or_else(|| GridError::not_found(format!("index {index}")))
    }

    fn window_is_current(&self) -> bool {
        self.viewport.state() == ViewportState::Idle && self.pending.lock().is_empty()
    }

    /// Number of items matching the current filter, as reported by the source.
    pub fn item_count(&self) -> ItemCount {
        self.source.size(&self.base_query())
    }

    /// Returns `true` if the source holds an item with `item`'s identity.
    pub fn contains(&self, item: &T) -> Result<bool> {
        self.source.contains(&self.id_of(item))
    }

    /// Fetches every item matching the current filter, in chunks of at most
    /// the maximum fetch size.
    pub fn fetch_all(&self) -> Vec<T> {
        let _span = PerfSpan::new(span_names::FETCH_ALL);
        let chunk = self.viewport.max_fetch_size().max(1);
        let total = self.item_count().exact();
        let mut items = Vec::new();
        loop {
            let offset = items.len();
            let limit = match total {
                Some(total) if offset >= total => break,
                Some(total) => chunk.min(total - offset),
                None => chunk,
            };
            let page = self.source.fetch(&self.query_for(&(offset..offset + limit)));
            let short = page.len() < limit;
            items.extend(page);
            if short {
                break;
            }
        }
        tracing::debug!(target: targets::COMMUNICATOR, count = items.len(), "fetched all items");
        items
    }

    /// Binds a new source. All keys are retired and the window is refetched.
    pub fn set_source(&mut self, source: SharedSource<T, I>) {
        self.keys.retire_all(self.next_update_id);
        self.keys.set_identity(identity_of(&source));
        *self.pending.lock() = PendingInvalidation::default();
        self._subscriptions = Self::subscribe(&source, &self.pending);
        self.source = source;
        self.size = SizeState::Unresolved;
        self.resident.clear();
        self.resident_ids.clear();
        self.viewport.clear_resident();
        self.pending.lock().full = true;
        tracing::debug!(target: targets::COMMUNICATOR, kind = ?self.source.kind(), "source replaced");
    }

    /// Sets the sort orders passed to the source.
    pub fn set_sort(&mut self, sort: Vec<SortOrder>) {
        self.sort = sort;
        self.pending.lock().layout = true;
    }

    /// Sets the filter passed to the source.
    pub fn set_filter(&mut self, filter: Option<FilterFn<T>>) {
        self.filter = filter;
        self.pending.lock().layout = true;
    }

    /// Changes the page size and recomputes the window.
    ///
    /// Fails with `ConfigurationConflict`, leaving the current page size in
    /// place, if the new size is zero or no longer fits the maximum fetch
    /// size.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        let config = self.config.clone().page_size(page_size);
        config.validate()?;
        self.viewport.set_page_size(page_size)?;
        self.config = config;
        tracing::debug!(target: targets::COMMUNICATOR, page_size, "page size changed");
        Ok(())
    }

    /// Current page size.
    pub fn page_size(&self) -> usize {
        self.viewport.page_size()
    }

    /// Adds a data generator; every resident row is re-sent.
    pub fn add_data_generator<F>(&mut self, generator: F)
    where
        F: Fn(&T, &mut RowData) + Send + Sync + 'static,
    {
        self.generators.push(Arc::new(generator));
        self.resend_all = true;
        self.viewport.invalidate();
    }

    /// Signals a full refresh through the source.
    pub fn refresh_all(&self) {
        self.source.refresh_all();
    }

    /// Signals an item refresh through the source.
    pub fn refresh_item(&self, item: T) {
        self.source.refresh_item(item);
    }

    /// Requests the page around `index`.
    pub fn scroll_to_index(&mut self, index: usize) {
        self.viewport.request_focus(index);
    }

    /// Requests an explicit range.
    pub fn request_range(&mut self, start: usize, length: usize) -> Result<()> {
        self.viewport.request_range(start, length)
    }
}
