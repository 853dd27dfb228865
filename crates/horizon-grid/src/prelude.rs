//! Prelude module for Horizon Grid.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use horizon_grid::prelude::*;
//! ```
//!
//! This provides access to:
//! - The grid facade (`DataGrid`, `GridConfig`, `GridUpdate`)
//! - Item sources (`DataSource`, `InMemorySource`, `CallbackSource`, `TreeSource`)
//! - Selection (`SelectionMode`, `SelectionEvent`, `SelectAllState`)
//! - Errors (`GridError`, `Result`)

// ============================================================================
// Grid
// ============================================================================

pub use crate::config::GridConfig;
pub use crate::grid::{DataGrid, GridUpdate, SelectionUpdate};

// ============================================================================
// Item Sources
// ============================================================================

pub use crate::data::{
    CallbackSource, DataSource, FilterFn, InMemorySource, ItemCount, Query, SharedSource,
    SortDirection, SortOrder, SourceKind, TreeSource,
};

// ============================================================================
// Data Synchronization
// ============================================================================

pub use crate::communicator::{AddedRow, DataUpdate, MovedRow, RowData, SizeInfo, UpdatedRow};
pub use crate::key_mapper::ItemKey;
pub use crate::viewport::ViewportState;

// ============================================================================
// Selection
// ============================================================================

pub use crate::selection::{
    EventSource, SelectAllState, SelectAllVisibility, SelectionEvent, SelectionMode,
    SelectionPreservation,
};

// ============================================================================
// Signals and Errors
// ============================================================================

pub use crate::error::{GridError, Result};
pub use horizon_grid_core::{ConnectionId, Signal};
