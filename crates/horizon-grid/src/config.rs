//! Grid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::selection::{SelectAllVisibility, SelectionMode, SelectionPreservation};

/// Paging and selection settings for a [`DataGrid`](crate::DataGrid).
///
/// Missing fields take their defaults when deserialized, so a partial
/// configuration document is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Items per page.
    pub page_size: usize,
    /// Extra pages kept resident on each side of the focal viewport.
    pub prefetch_pages: usize,
    /// Maximum items per single range request.
    pub max_fetch_size: usize,
    /// Initial size assumed for sources that cannot count.
    pub unknown_size_estimate: usize,
    /// Growth step of the size estimate when the window nears its end.
    pub unknown_size_increase: usize,
    /// Initial selection mode.
    pub selection_mode: SelectionMode,
    /// Selection policy applied when the data changes.
    pub selection_preservation: SelectionPreservation,
    /// Visibility policy of the select-all checkbox.
    pub select_all_visibility: SelectAllVisibility,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            prefetch_pages: 0,
            max_fetch_size: 500,
            unknown_size_estimate: 200,
            unknown_size_increase: 200,
            selection_mode: SelectionMode::Single,
            selection_preservation: SelectionPreservation::Discard,
            select_all_visibility: SelectAllVisibility::Default,
        }
    }
}

impl GridConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size.
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Set the number of prefetched pages on each side.
    pub fn prefetch_pages(mut self, pages: usize) -> Self {
        self.prefetch_pages = pages;
        self
    }

    /// Set the maximum fetch size.
    pub fn max_fetch_size(mut self, max: usize) -> Self {
        self.max_fetch_size = max;
        self
    }

    /// Set the initial estimate and growth step for sources that cannot count.
    pub fn unknown_size(mut self, estimate: usize, increase: usize) -> Self {
        self.unknown_size_estimate = estimate;
        self.unknown_size_increase = increase;
        self
    }

    /// Set the initial selection mode.
    pub fn selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    /// Set the selection preservation policy.
    pub fn selection_preservation(mut self, policy: SelectionPreservation) -> Self {
        self.selection_preservation = policy;
        self
    }

    /// Set the select-all visibility policy.
    pub fn select_all_visibility(mut self, visibility: SelectAllVisibility) -> Self {
        self.select_all_visibility = visibility;
        self
    }

    /// The largest range a focus request can resolve to.
    pub fn max_focus_window(&self) -> usize {
        self.prefetch_pages
            .saturating_mul(2)
            .saturating_add(2)
            .saturating_mul(self.page_size)
    }

    /// Checks the settings for conflicts.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(GridError::conflict("page_size must be at least 1"));
        }
        if self.unknown_size_estimate == 0 || self.unknown_size_increase == 0 {
            return Err(GridError::conflict(
                "unknown_size_estimate and unknown_size_increase must be at least 1",
            ));
        }
        let window = self.max_focus_window();
        if window > self.max_fetch_size {
            return Err(GridError::conflict(format!(
                "page_size {} with {} prefetch pages can request {window} items, \
                 more than max_fetch_size {}",
                self.page_size, self.prefetch_pages, self.max_fetch_size
            )));
        }
        Ok(())
    }
}
