//! Viewport tracking.
//!
//! The [`ViewportTracker`] turns scroll positions and client range requests
//! into the contiguous index range that must be resident, and guards the
//! fetch that materializes it.
//!
//! # State Machine
//!
//! ```text
//!            request / invalidate          dispatch
//!   Idle ───────────────────────▶ ComputingRange ─────────▶ FetchPending
//!    ▲                                   ▲                     │    │
//!    │             resolve (current)     │  resolve (stale)    │    │ invalidate
//!    └───────────────────────────────────┼─────────────────────┘    ▼
//!                                        └────────────────────── Stale
//! ```
//!
//! Requests that arrive before a dispatch overwrite each other, so only the
//! latest one is ever fetched. A fetch result is applied only if its ticket
//! is still the in-flight ticket, for the current data generation and the
//! latest request.

use std::ops::Range;

use horizon_grid_core::logging::targets;

use crate::config::GridConfig;
use crate::error::{GridError, Result};

/// Lifecycle state of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportState {
    /// The resident range is up to date.
    Idle,
    /// A new range must be computed and fetched.
    ComputingRange,
    /// A fetch was dispatched and has not resolved yet.
    FetchPending,
    /// The data changed while a fetch was pending; its result will be discarded.
    Stale,
}

/// A request for resident data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeRequest {
    /// Make the page around this index resident (scroll, jump, search).
    Focus(usize),
    /// Make exactly this range resident (client range request).
    Explicit { start: usize, length: usize },
}

impl RangeRequest {
    /// One past the largest index the request refers to.
    pub fn extent(self) -> usize {
        match self {
            Self::Focus(index) => index.saturating_add(1),
            Self::Explicit { start, length } => start.saturating_add(length),
        }
    }
}

/// Token for one dispatched fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    /// The index range to fetch.
    pub range: Range<usize>,
    /// Data generation the fetch was dispatched under.
    pub generation: u64,
    /// Sequence number of the request that produced the range.
    pub request: u64,
}

impl FetchTicket {
    /// Number of items the ticket asks for.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Returns `true` for an empty range.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Computes and guards the resident index range.
#[derive(Debug)]
pub struct ViewportTracker {
    page_size: usize,
    prefetch_pages: usize,
    max_fetch_size: usize,
    state: ViewportState,
    /// Request not yet dispatched.
    pending: Option<RangeRequest>,
    /// Last dispatched request, recomputed after an invalidation.
    last_request: Option<RangeRequest>,
    request_seq: u64,
    in_flight: Option<FetchTicket>,
    resident: Range<usize>,
}

impl ViewportTracker {
    /// Creates a tracker. The first dispatch fetches the page at index 0.
    pub fn new(page_size: usize, prefetch_pages: usize, max_fetch_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            prefetch_pages,
            max_fetch_size,
            state: ViewportState::ComputingRange,
            pending: None,
            last_request: None,
            request_seq: 0,
            in_flight: None,
            resident: 0..0,
        }
    }

    /// Creates a tracker from the paging settings of `config`.
    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.page_size, config.prefetch_pages, config.max_fetch_size)
    }

    /// Current state.
    pub fn state(&self) -> ViewportState {
        self.state
    }

    /// The range applied by the last resolved fetch.
    pub fn resident_range(&self) -> Range<usize> {
        self.resident.clone()
    }

    /// Forgets the resident range, e.g. when the source is replaced.
    pub fn clear_resident(&mut self) {
        self.resident = 0..0;
    }

    /// Page size in items.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Maximum number of items per fetch.
    pub fn max_fetch_size(&self) -> usize {
        self.max_fetch_size
    }

    /// The request the next dispatch will compute a range for.
    pub fn current_request(&self) -> RangeRequest {
        self.pending
            .or(self.last_request)
            .unwrap_or(RangeRequest::Focus(0))
    }

    /// Returns `true` if the next dispatch would issue a fetch.
    pub fn needs_dispatch(&self) -> bool {
        matches!(self.state, ViewportState::ComputingRange | ViewportState::Stale)
    }

    /// Requests the page around `index`.
    pub fn request_focus(&mut self, index: usize) {
        self.enqueue(RangeRequest::Focus(index));
    }

    /// Requests an explicit range.
    ///
    /// Fails with `RangeTooLarge` before anything is queued if `length`
    /// exceeds the maximum fetch size.
    pub fn request_range(&mut self, start: usize, length: usize) -> Result<()> {
        if length > self.max_fetch_size {
            return Err(GridError::RangeTooLarge {
                requested: length,
                max: self.max_fetch_size,
            });
        }
        self.enqueue(RangeRequest::Explicit { start, length });
        Ok(())
    }

    /// Changes the page size and recomputes the range.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(GridError::conflict("page size must be at least 1"));
        }
        self.page_size = page_size;
        self.enqueue(self.current_request());
        Ok(())
    }

    fn enqueue(&mut self, request: RangeRequest) {
        if let Some(previous) = self.pending.replace(request) {
            tracing::debug!(
                target: targets::VIEWPORT,
                ?previous,
                ?request,
                "coalesced range request"
            );
        }
        self.request_seq += 1;
        self.state = ViewportState::ComputingRange;
    }

    /// Notes a data generation bump.
    pub fn invalidate(&mut self) {
        self.state = match self.state {
            ViewportState::FetchPending | ViewportState::Stale => ViewportState::Stale,
            ViewportState::Idle | ViewportState::ComputingRange => ViewportState::ComputingRange,
        };
    }

    /// Computes the range for the current request and issues a ticket.
    ///
    /// `total` is the size of the index space when known (exact or
    /// estimated). Returns `Ok(None)` when nothing needs fetching, including
    /// while a fetch for the latest request is still pending.
    pub fn dispatch(&mut self, total: Option<usize>, generation: u64) -> Result<Option<FetchTicket>> {
        if !self.needs_dispatch() {
            if self.state == ViewportState::FetchPending {
                tracing::debug!(target: targets::VIEWPORT, "fetch already pending, not dispatching");
            }
            return Ok(None);
        }

        let request = self.current_request();
        let range = self.range_for(request, total);
        if range.len() > self.max_fetch_size {
            self.pending = None;
            self.state = ViewportState::Idle;
            return Err(GridError::RangeTooLarge {
                requested: range.len(),
                max: self.max_fetch_size,
            });
        }

        let ticket = FetchTicket {
            range,
            generation,
            request: self.request_seq,
        };
        tracing::trace!(target: targets::VIEWPORT, ?ticket, "dispatching fetch");
        self.pending = None;
        self.last_request = Some(request);
        self.in_flight = Some(ticket.clone());
        self.state = ViewportState::FetchPending;
        Ok(Some(ticket))
    }

    /// Resolves a dispatched fetch.
    ///
    /// Returns `true` if the ticket is current and its range is now resident.
    /// A stale ticket is discarded; if it was the in-flight one, the tracker
    /// re-enters `ComputingRange`.
    pub fn resolve(&mut self, ticket: &FetchTicket, generation: u64) -> bool {
        let in_flight = self.in_flight.as_ref() == Some(ticket);
        let current = in_flight
            && self.state == ViewportState::FetchPending
            && ticket.generation == generation
            && ticket.request == self.request_seq;

        if current {
            self.resident = ticket.range.clone();
            self.in_flight = None;
            self.state = ViewportState::Idle;
            return true;
        }

        tracing::debug!(
            target: targets::VIEWPORT,
            ?ticket,
            generation,
            request = self.request_seq,
            "discarding stale fetch result"
        );
        if in_flight {
            self.in_flight = None;
            self.state = ViewportState::ComputingRange;
        }
        false
    }

    /// The range `request` resolves to, clamped to `total` when known.
    pub fn range_for(&self, request: RangeRequest, total: Option<usize>) -> Range<usize> {
        let range = match request {
            RangeRequest::Focus(index) => self.focus_range(index, total),
            RangeRequest::Explicit { start, length } => start..start.saturating_add(length),
        };
        match total {
            Some(total) => {
                let end = range.end.min(total);
                range.start.min(end)..end
            }
            None => range,
        }
    }

    /// The pages touched by a one-page viewport centred on `index`, plus the
    /// prefetch margin on each side.
    fn focus_range(&self, index: usize, total: Option<usize>) -> Range<usize> {
        let index = match total {
            Some(total) => index.min(total.saturating_sub(1)),
            None => index,
        };
        let page = self.page_size;
        let half = page / 2;
        let lo = index.saturating_sub(half);
        let hi = index.saturating_add(page - half);

        let first_page = (lo / page).saturating_sub(self.prefetch_pages);
        let last_page = hi.div_ceil(page).saturating_add(self.prefetch_pages);
        first_page.saturating_mul(page)..last_page.saturating_mul(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ViewportTracker {
        ViewportTracker::new(50, 0, 500)
    }

    #[test]
    fn test_focus_range_straddles_page_boundary() {
        let viewport = tracker();
        assert_eq!(viewport.range_for(RangeRequest::Focus(499), Some(10_000)), 450..550);
        assert_eq!(viewport.range_for(RangeRequest::Focus(0), Some(10_000)), 0..50);
        assert_eq!(viewport.range_for(RangeRequest::Focus(25), None), 0..50);
        assert_eq!(viewport.range_for(RangeRequest::Focus(125), None), 100..150);
    }

    #[test]
    fn test_focus_range_clamps_to_total() {
        let viewport = tracker();
        assert_eq!(viewport.range_for(RangeRequest::Focus(499), Some(520)), 450..520);
        assert_eq!(viewport.range_for(RangeRequest::Focus(10_000), Some(120)), 50..120);
        assert_eq!(viewport.range_for(RangeRequest::Focus(3), Some(0)), 0..0);
    }

    #[test]
    fn test_prefetch_pages() {
        let viewport = ViewportTracker::new(50, 1, 500);
        assert_eq!(viewport.range_for(RangeRequest::Focus(499), None), 400..600);
        assert_eq!(viewport.range_for(RangeRequest::Focus(10), None), 0..100);
    }

    #[test]
    fn test_oversized_request_rejected() {
        let mut viewport = tracker();
        assert_eq!(
            viewport.request_range(0, 501),
            Err(GridError::RangeTooLarge {
                requested: 501,
                max: 500
            })
        );
        assert!(viewport.request_range(0, 500).is_ok());
    }

    #[test]
    fn test_dispatch_and_resolve() {
        let mut viewport = tracker();
        assert_eq!(viewport.state(), ViewportState::ComputingRange);

        let ticket = viewport.dispatch(Some(1000), 0).unwrap().unwrap();
        assert_eq!(ticket.range, 0..50);
        assert_eq!(viewport.state(), ViewportState::FetchPending);
        assert!(viewport.dispatch(Some(1000), 0).unwrap().is_none());

        assert!(viewport.resolve(&ticket, 0));
        assert_eq!(viewport.state(), ViewportState::Idle);
        assert_eq!(viewport.resident_range(), 0..50);
        assert!(viewport.dispatch(Some(1000), 0).unwrap().is_none());
    }

    #[test]
    fn test_generation_bump_discards_result() {
        let mut viewport = tracker();
        viewport.request_focus(499);
        let ticket = viewport.dispatch(Some(1000), 0).unwrap().unwrap();

        viewport.invalidate();
        assert_eq!(viewport.state(), ViewportState::Stale);
        assert!(!viewport.resolve(&ticket, 1));
        assert_eq!(viewport.state(), ViewportState::ComputingRange);
        assert_eq!(viewport.resident_range(), 0..0);

        // The last request is recomputed under the new generation.
        let retry = viewport.dispatch(Some(1000), 1).unwrap().unwrap();
        assert_eq!(retry.range, 450..550);
        assert!(viewport.resolve(&retry, 1));
    }

    #[test]
    fn test_newer_request_supersedes_in_flight() {
        let mut viewport = tracker();
        let first = viewport.dispatch(Some(1000), 0).unwrap().unwrap();
        viewport.request_focus(300);
        viewport.request_focus(700);
        assert!(!viewport.resolve(&first, 0));

        let latest = viewport.dispatch(Some(1000), 0).unwrap().unwrap();
        assert_eq!(latest.range, 650..750);
        assert!(viewport.resolve(&latest, 0));
    }

    #[test]
    fn test_invalidate_idle_recomputes() {
        let mut viewport = tracker();
        let ticket = viewport.dispatch(None, 0).unwrap().unwrap();
        viewport.resolve(&ticket, 0);
        viewport.invalidate();
        assert_eq!(viewport.state(), ViewportState::ComputingRange);
        assert_eq!(viewport.dispatch(None, 1).unwrap().unwrap().range, 0..50);
    }

    #[test]
    fn test_page_size_change_recomputes_last_request() {
        let mut viewport = tracker();
        viewport.request_focus(499);
        let ticket = viewport.dispatch(Some(1000), 0).unwrap().unwrap();
        assert!(viewport.resolve(&ticket, 0));

        assert!(viewport.set_page_size(0).is_err());
        assert_eq!(viewport.page_size(), 50);
        assert_eq!(viewport.state(), ViewportState::Idle);

        viewport.set_page_size(100).unwrap();
        assert_eq!(viewport.state(), ViewportState::ComputingRange);
        assert_eq!(viewport.dispatch(Some(1000), 0).unwrap().unwrap().range, 400..600);
    }

    #[test]
    fn test_clear_resident() {
        let mut viewport = tracker();
        let ticket = viewport.dispatch(Some(1000), 0).unwrap().unwrap();
        viewport.resolve(&ticket, 0);
        viewport.clear_resident();
        assert_eq!(viewport.resident_range(), 0..0);
    }

    #[test]
    fn test_request_extent() {
        assert_eq!(RangeRequest::Focus(9).extent(), 10);
        assert_eq!(RangeRequest::Explicit { start: 5, length: 10 }.extent(), 15);
    }
}
